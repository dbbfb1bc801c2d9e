use std::fmt::Debug;

use crypto_bigint::{
    modular::runtime_mod::{DynResidue, DynResidueParams},
    Encoding, Integer, NonZero, Uint, Word,
};

/// Fixed-width unsigned integer usable as the backing store of a `ModularInt`.
pub trait GenericUint: Encoding + Integer {
    /// Precomputed Montgomery constants for one modulus.
    type MontgomeryParams: Clone + Copy + Debug + PartialEq + Send + Sync;

    /// Number of bits of the representation.
    fn bit_width() -> usize;
    fn try_from_u128(n: u128) -> Option<Self>;
    fn low_u64(&self) -> u64;
    fn to_f64(&self) -> f64;
    fn bits_vartime(&self) -> usize;
    fn shr_vartime(&self, shift: usize) -> Self;
    fn shl_vartime(&self, shift: usize) -> Self;
    fn wrapping_add(&self, rhs: &Self) -> Self;
    fn wrapping_sub(&self, rhs: &Self) -> Self;
    fn add_mod(&self, rhs: &Self, modulus: &Self) -> Self;
    fn sub_mod(&self, rhs: &Self, modulus: &Self) -> Self;
    fn neg_mod(&self, modulus: &Self) -> Self;

    /// Panics if `rhs` is zero. Callers pass the ciphertext or plaintext
    /// modulus, which `ModulusParams::create` and `ErrorParams::create` keep
    /// non-zero.
    fn rem_vartime(&self, rhs: &Self) -> Self;

    /// Little-endian encoding truncated to `len` bytes.
    fn to_le_bytes_vec(&self, len: usize) -> Vec<u8>;
    fn from_le_bytes_slice(bytes: &[u8]) -> Option<Self>;

    /// `modulus` must be odd.
    fn montgomery_params(modulus: &Self) -> Self::MontgomeryParams;
    fn to_montgomery(&self, params: &Self::MontgomeryParams) -> Self;
    fn from_montgomery(&self, params: &Self::MontgomeryParams) -> Self;
    fn mul_montgomery(&self, rhs: &Self, params: &Self::MontgomeryParams) -> Self;
    /// Inverse of a Montgomery-form value, `None` if it shares a factor with
    /// the modulus.
    fn invert_montgomery(&self, params: &Self::MontgomeryParams) -> Option<Self>;
}

impl<const LIMBS: usize> GenericUint for Uint<LIMBS>
where
    Self: Encoding,
{
    type MontgomeryParams = DynResidueParams<LIMBS>;

    #[inline(always)]
    fn bit_width() -> usize {
        LIMBS * Word::BITS as usize
    }

    fn try_from_u128(n: u128) -> Option<Self> {
        let mut repr = Self::ZERO;
        let mut rest = n;
        for word in repr.as_words_mut().iter_mut() {
            *word = rest as Word;
            rest = rest.checked_shr(Word::BITS).unwrap_or(0);
        }
        if rest != 0 {
            return None;
        }
        Some(repr)
    }

    #[inline(always)]
    fn low_u64(&self) -> u64 {
        let mut result = 0u64;
        for (i, word) in self.as_words().iter().enumerate() {
            let shift = i as u32 * Word::BITS;
            if shift >= u64::BITS {
                break;
            }
            result |= (*word as u64) << shift;
        }
        result
    }

    fn to_f64(&self) -> f64 {
        let radix = 2f64.powi(Word::BITS as i32);
        self.as_words()
            .iter()
            .rev()
            .fold(0f64, |acc, word| acc * radix + *word as f64)
    }

    #[inline(always)]
    fn bits_vartime(&self) -> usize {
        Uint::bits_vartime(self)
    }

    #[inline(always)]
    fn shr_vartime(&self, shift: usize) -> Self {
        if shift >= Self::bit_width() {
            return Self::ZERO;
        }
        Uint::shr_vartime(self, shift)
    }

    #[inline(always)]
    fn shl_vartime(&self, shift: usize) -> Self {
        if shift >= Self::bit_width() {
            return Self::ZERO;
        }
        Uint::shl_vartime(self, shift)
    }

    #[inline(always)]
    fn wrapping_add(&self, rhs: &Self) -> Self {
        Uint::wrapping_add(self, rhs)
    }

    #[inline(always)]
    fn wrapping_sub(&self, rhs: &Self) -> Self {
        Uint::wrapping_sub(self, rhs)
    }

    #[inline(always)]
    fn add_mod(&self, rhs: &Self, modulus: &Self) -> Self {
        Uint::add_mod(self, rhs, modulus)
    }

    #[inline(always)]
    fn sub_mod(&self, rhs: &Self, modulus: &Self) -> Self {
        Uint::sub_mod(self, rhs, modulus)
    }

    #[inline(always)]
    fn neg_mod(&self, modulus: &Self) -> Self {
        Uint::neg_mod(self, modulus)
    }

    #[inline(always)]
    fn rem_vartime(&self, rhs: &Self) -> Self {
        Uint::rem(self, &NonZero::new(*rhs).unwrap())
    }

    fn to_le_bytes_vec(&self, len: usize) -> Vec<u8> {
        let mut bytes = Encoding::to_le_bytes(self).as_ref().to_vec();
        bytes.resize(len, 0);
        bytes
    }

    fn from_le_bytes_slice(bytes: &[u8]) -> Option<Self> {
        let mut repr = Encoding::to_le_bytes(&Self::ZERO);
        let buf = repr.as_mut();
        if bytes.len() > buf.len() {
            return None;
        }
        buf[..bytes.len()].copy_from_slice(bytes);
        Some(Encoding::from_le_bytes(repr))
    }

    #[inline(always)]
    fn montgomery_params(modulus: &Self) -> Self::MontgomeryParams {
        DynResidueParams::new(modulus)
    }

    #[inline(always)]
    fn to_montgomery(&self, params: &Self::MontgomeryParams) -> Self {
        *DynResidue::new(self, *params).as_montgomery()
    }

    #[inline(always)]
    fn from_montgomery(&self, params: &Self::MontgomeryParams) -> Self {
        DynResidue::from_montgomery(*self, *params).retrieve()
    }

    #[inline(always)]
    fn mul_montgomery(&self, rhs: &Self, params: &Self::MontgomeryParams) -> Self {
        let product =
            DynResidue::from_montgomery(*self, *params) * DynResidue::from_montgomery(*rhs, *params);
        *product.as_montgomery()
    }

    fn invert_montgomery(&self, params: &Self::MontgomeryParams) -> Option<Self> {
        let (inverse, invertible) = DynResidue::from_montgomery(*self, *params).invert();
        if bool::from(invertible) {
            Some(*inverse.as_montgomery())
        } else {
            None
        }
    }
}
