use rand::RngCore;
use rand_chacha::{rand_core::SeedableRng, ChaCha20Rng};

use crate::error::Result;

use super::{check_seed_length, BufferedPrng, KeyStream, Synchronized};

/// ChaCha20 keystream; the salt counter selects the ChaCha stream id.
pub struct ChaChaStream {
    key: [u8; 32],
}

impl KeyStream for ChaChaStream {
    const SEED_LENGTH: usize = 32;

    fn new(seed: &[u8]) -> Result<Self> {
        check_seed_length(seed, Self::SEED_LENGTH)?;
        let mut key = [0u8; 32];
        key.copy_from_slice(seed);
        Ok(Self { key })
    }

    fn fill(&self, salt: u64, buffer: &mut [u8]) -> Result<()> {
        let mut rng = ChaCha20Rng::from_seed(self.key);
        rng.set_stream(salt);
        rng.fill_bytes(buffer);
        Ok(())
    }
}

pub type SingleThreadChaChaPrng = BufferedPrng<ChaChaStream>;

pub type ChaChaPrng = Synchronized<SingleThreadChaChaPrng>;

#[cfg(test)]
mod tests {
    use super::{ChaChaStream, KeyStream};
    use crate::prng::BUFFER_SIZE;

    #[test]
    fn salts_select_independent_blocks() {
        let stream = ChaChaStream::new(&[7u8; 32]).unwrap();
        let mut first = vec![0u8; BUFFER_SIZE];
        let mut again = vec![0u8; BUFFER_SIZE];
        let mut second = vec![0u8; BUFFER_SIZE];
        stream.fill(0, &mut first).unwrap();
        stream.fill(0, &mut again).unwrap();
        stream.fill(1, &mut second).unwrap();
        assert_eq!(first, again);
        assert_ne!(first, second);
    }
}
