use ::hkdf::Hkdf;
use sha2::Sha256;

use crate::error::{Result, RlweError};

use super::{check_seed_length, BufferedPrng, KeyStream, Synchronized};

/// HKDF-SHA256 keystream; the salt counter is the HKDF salt. One expansion
/// yields at most `255 * 32` bytes, which is exactly one buffer.
pub struct HkdfStream {
    key: Vec<u8>,
}

impl KeyStream for HkdfStream {
    const SEED_LENGTH: usize = 32;

    fn new(seed: &[u8]) -> Result<Self> {
        check_seed_length(seed, Self::SEED_LENGTH)?;
        Ok(Self { key: seed.to_vec() })
    }

    fn fill(&self, salt: u64, buffer: &mut [u8]) -> Result<()> {
        let hk = Hkdf::<Sha256>::new(Some(&salt.to_be_bytes()[..]), &self.key);
        hk.expand(&[], buffer)
            .map_err(|e| RlweError::internal(format!("HKDF expansion failed: {}", e)))
    }
}

pub type SingleThreadHkdfPrng = BufferedPrng<HkdfStream>;

pub type HkdfPrng = Synchronized<SingleThreadHkdfPrng>;

#[cfg(test)]
mod tests {
    use super::{HkdfStream, KeyStream};
    use crate::prng::BUFFER_SIZE;

    #[test]
    fn rejects_oversized_buffer() {
        let stream = HkdfStream::new(&[1u8; 32]).unwrap();
        let mut buffer = vec![0u8; BUFFER_SIZE + 1];
        assert!(stream.fill(0, &mut buffer).is_err());
    }

    #[test]
    fn deterministic_per_salt() {
        let stream = HkdfStream::new(&[3u8; 32]).unwrap();
        let mut lhs = vec![0u8; 64];
        let mut rhs = vec![0u8; 64];
        stream.fill(5, &mut lhs).unwrap();
        stream.fill(5, &mut rhs).unwrap();
        assert_eq!(lhs, rhs);
        stream.fill(6, &mut rhs).unwrap();
        assert_ne!(lhs, rhs);
    }
}
