pub mod chacha;
pub mod hkdf;

use std::sync::Mutex;

use log::trace;
use rand::{rngs::OsRng, RngCore};
use serde::{Deserialize, Serialize};

use crate::error::{Result, RlweError};

pub use self::{
    chacha::{ChaChaPrng, ChaChaStream, SingleThreadChaChaPrng},
    hkdf::{HkdfPrng, HkdfStream, SingleThreadHkdfPrng},
};

/// Number of bytes produced per salt value before the stream is re-salted.
pub const BUFFER_SIZE: usize = 255 * 32;

/// A cryptographically secure, replayable source of randomness: two
/// instances created from the same seed produce the same stream.
pub trait SecurePrng {
    fn rand8(&mut self) -> Result<u8>;

    fn rand64(&mut self) -> Result<u64> {
        let mut bytes = [0u8; 8];
        for byte in bytes.iter_mut() {
            *byte = self.rand8()?;
        }
        Ok(u64::from_le_bytes(bytes))
    }
}

impl<P: SecurePrng + ?Sized> SecurePrng for &mut P {
    fn rand8(&mut self) -> Result<u8> {
        (**self).rand8()
    }

    fn rand64(&mut self) -> Result<u64> {
        (**self).rand64()
    }
}

impl<P: SecurePrng + ?Sized> SecurePrng for Box<P> {
    fn rand8(&mut self) -> Result<u8> {
        (**self).rand8()
    }

    fn rand64(&mut self) -> Result<u64> {
        (**self).rand64()
    }
}

/// A deterministic keystream, expanded one salt value at a time.
pub trait KeyStream: Sized {
    const SEED_LENGTH: usize;

    fn new(seed: &[u8]) -> Result<Self>;

    fn fill(&self, salt: u64, buffer: &mut [u8]) -> Result<()>;
}

pub fn generate_seed(length: usize) -> Result<Vec<u8>> {
    let mut seed = vec![0u8; length];
    OsRng
        .try_fill_bytes(&mut seed)
        .map_err(|e| RlweError::internal(format!("failed to gather entropy: {}", e)))?;
    Ok(seed)
}

/// Lock-free PRNG for use from a single thread.
pub struct BufferedPrng<S: KeyStream> {
    stream: S,
    buffer: Vec<u8>,
    position: usize,
    salt_counter: u64,
}

impl<S: KeyStream> BufferedPrng<S> {
    pub fn create(seed: &[u8]) -> Result<Self> {
        let stream = S::new(seed)?;
        let mut buffer = vec![0u8; BUFFER_SIZE];
        stream.fill(0, &mut buffer)?;
        Ok(Self {
            stream,
            buffer,
            position: 0,
            salt_counter: 0,
        })
    }

    pub fn generate_seed() -> Result<Vec<u8>> {
        generate_seed(S::SEED_LENGTH)
    }

    pub fn seed_length() -> usize {
        S::SEED_LENGTH
    }

    fn resalt(&mut self) -> Result<()> {
        self.salt_counter = self
            .salt_counter
            .checked_add(1)
            .ok_or_else(|| RlweError::internal("PRNG salt counter exhausted"))?;
        trace!("re-salting PRNG buffer (salt {})", self.salt_counter);
        self.stream.fill(self.salt_counter, &mut self.buffer)?;
        self.position = 0;
        Ok(())
    }
}

impl<S: KeyStream> SecurePrng for BufferedPrng<S> {
    fn rand8(&mut self) -> Result<u8> {
        if self.position == self.buffer.len() {
            self.resalt()?;
        }
        let byte = self.buffer[self.position];
        self.position += 1;
        Ok(byte)
    }

    fn rand64(&mut self) -> Result<u64> {
        if self.buffer.len() - self.position < 8 {
            let mut bytes = [0u8; 8];
            for byte in bytes.iter_mut() {
                *byte = self.rand8()?;
            }
            return Ok(u64::from_le_bytes(bytes));
        }
        let mut bytes = [0u8; 8];
        bytes.copy_from_slice(&self.buffer[self.position..self.position + 8]);
        self.position += 8;
        Ok(u64::from_le_bytes(bytes))
    }
}

/// Wraps a PRNG in a mutex so that one stream can be shared between threads.
/// Draw through a shared reference: `&Synchronized<P>` is itself a `SecurePrng`.
pub struct Synchronized<P> {
    inner: Mutex<P>,
}

impl<P> Synchronized<P> {
    pub fn new(prng: P) -> Self {
        Self {
            inner: Mutex::new(prng),
        }
    }

    fn with<T>(&self, f: impl FnOnce(&mut P) -> Result<T>) -> Result<T> {
        let mut guard = self
            .inner
            .lock()
            .map_err(|_| RlweError::internal("PRNG mutex poisoned"))?;
        f(&mut guard)
    }
}

impl<S: KeyStream> Synchronized<BufferedPrng<S>> {
    pub fn create(seed: &[u8]) -> Result<Self> {
        Ok(Self::new(BufferedPrng::create(seed)?))
    }

    pub fn generate_seed() -> Result<Vec<u8>> {
        BufferedPrng::<S>::generate_seed()
    }

    pub fn seed_length() -> usize {
        S::SEED_LENGTH
    }
}

impl<P: SecurePrng> SecurePrng for &Synchronized<P> {
    fn rand8(&mut self) -> Result<u8> {
        self.with(|prng| prng.rand8())
    }

    fn rand64(&mut self) -> Result<u64> {
        self.with(|prng| prng.rand64())
    }
}

impl<P: SecurePrng> SecurePrng for Synchronized<P> {
    fn rand8(&mut self) -> Result<u8> {
        self.with(|prng| prng.rand8())
    }

    fn rand64(&mut self) -> Result<u64> {
        self.with(|prng| prng.rand64())
    }
}

#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub enum PrngType {
    Hkdf,
    ChaCha,
}

impl PrngType {
    pub fn generate_seed(self) -> Result<Vec<u8>> {
        match self {
            PrngType::Hkdf => SingleThreadHkdfPrng::generate_seed(),
            PrngType::ChaCha => SingleThreadChaChaPrng::generate_seed(),
        }
    }

    pub fn seed_length(self) -> usize {
        match self {
            PrngType::Hkdf => HkdfStream::SEED_LENGTH,
            PrngType::ChaCha => ChaChaStream::SEED_LENGTH,
        }
    }

    /// Creates a single-threaded PRNG of this type.
    pub fn create(self, seed: &[u8]) -> Result<Box<dyn SecurePrng + Send>> {
        Ok(match self {
            PrngType::Hkdf => Box::new(SingleThreadHkdfPrng::create(seed)?),
            PrngType::ChaCha => Box::new(SingleThreadChaChaPrng::create(seed)?),
        })
    }
}

pub(crate) fn check_seed_length(seed: &[u8], expected: usize) -> Result<()> {
    if seed.len() != expected {
        return Err(RlweError::invalid_argument(format!(
            "Cannot create Prng with key of the wrong size. Real key length of {} instead of expected key length of {}.",
            seed.len(),
            expected
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::thread;

    use super::{PrngType, SecurePrng};
    use crate::prng::{ChaChaPrng, HkdfPrng, SingleThreadChaChaPrng, SingleThreadHkdfPrng, BUFFER_SIZE};

    fn draw(prng: &mut impl SecurePrng, count: usize) -> Vec<u64> {
        (0..count).map(|_| prng.rand64().unwrap()).collect()
    }

    #[test]
    fn same_seed_same_stream() {
        for prng_type in [PrngType::Hkdf, PrngType::ChaCha] {
            let seed = prng_type.generate_seed().unwrap();
            let mut lhs = prng_type.create(&seed).unwrap();
            let mut rhs = prng_type.create(&seed).unwrap();
            assert_eq!(draw(&mut lhs, 100), draw(&mut rhs, 100));
        }
    }

    #[test]
    fn different_seeds_differ() {
        for prng_type in [PrngType::Hkdf, PrngType::ChaCha] {
            let mut lhs = prng_type.create(&prng_type.generate_seed().unwrap()).unwrap();
            let mut rhs = prng_type.create(&prng_type.generate_seed().unwrap()).unwrap();
            assert_ne!(draw(&mut lhs, 16), draw(&mut rhs, 16));
        }
    }

    #[test]
    fn wrong_seed_length_is_rejected() {
        assert!(SingleThreadChaChaPrng::create(&[0u8; 7]).is_err());
        assert!(SingleThreadHkdfPrng::create(&[0u8; 33]).is_err());
    }

    #[test]
    fn stream_continues_across_resalt() {
        let seed = SingleThreadChaChaPrng::generate_seed().unwrap();
        let mut lhs = SingleThreadChaChaPrng::create(&seed).unwrap();
        let mut rhs = SingleThreadChaChaPrng::create(&seed).unwrap();
        // Misalign the two streams so that `rand64` straddles the buffer end.
        lhs.rand8().unwrap();
        rhs.rand8().unwrap();
        let lhs_bytes: Vec<u8> = (0..2 * BUFFER_SIZE).map(|_| lhs.rand8().unwrap()).collect();
        let mut rhs_bytes = Vec::new();
        while rhs_bytes.len() < 2 * BUFFER_SIZE {
            rhs_bytes.extend_from_slice(&rhs.rand64().unwrap().to_le_bytes());
        }
        rhs_bytes.truncate(2 * BUFFER_SIZE);
        assert_eq!(lhs_bytes, rhs_bytes);
        // The re-salted buffer is not a repetition of the first one.
        assert_ne!(lhs_bytes[..BUFFER_SIZE], lhs_bytes[BUFFER_SIZE..]);
    }

    #[test]
    fn synchronized_matches_single_threaded() {
        let seed = ChaChaPrng::generate_seed().unwrap();
        let mut single = SingleThreadChaChaPrng::create(&seed).unwrap();
        let shared = ChaChaPrng::create(&seed).unwrap();
        assert_eq!(draw(&mut single, 50), draw(&mut &shared, 50));

        let seed = HkdfPrng::generate_seed().unwrap();
        let mut single = SingleThreadHkdfPrng::create(&seed).unwrap();
        let shared = HkdfPrng::create(&seed).unwrap();
        assert_eq!(draw(&mut single, 50), draw(&mut &shared, 50));
    }

    #[test]
    fn synchronized_is_shared_between_threads() {
        let seed = ChaChaPrng::generate_seed().unwrap();
        let shared = ChaChaPrng::create(&seed).unwrap();
        let mut drawn: Vec<u64> = thread::scope(|scope| {
            let handles: Vec<_> = (0..4)
                .map(|_| {
                    let shared = &shared;
                    scope.spawn(move || draw(&mut &*shared, 1000))
                })
                .collect();
            handles
                .into_iter()
                .flat_map(|handle| handle.join().unwrap())
                .collect()
        });

        // Every value of the stream is handed out exactly once.
        let mut single = SingleThreadChaChaPrng::create(&seed).unwrap();
        let mut expected = draw(&mut single, 4000);
        drawn.sort_unstable();
        expected.sort_unstable();
        assert_eq!(drawn, expected);
    }
}
