use crate::{
    error::{Result, RlweError},
    prng::SecurePrng,
};

use super::{
    generic_uint::GenericUint,
    montgomery::{ModularInt, ModulusParams},
    params::MAX_VARIANCE,
};

/// Samples `num_coeffs` coefficients from the centered binomial distribution
/// of the given variance: each is the difference of the Hamming weights of two
/// `2 * variance`-bit random strings.
pub fn sample_from_error_distribution<U, P>(
    num_coeffs: usize,
    variance: u64,
    prng: &mut P,
    params: &ModulusParams<U>,
) -> Result<Vec<ModularInt<U>>>
where
    U: GenericUint,
    P: SecurePrng + ?Sized,
{
    if variance > MAX_VARIANCE {
        return Err(RlweError::invalid_argument(format!(
            "The variance, {}, must be at most {}.",
            variance, MAX_VARIANCE
        )));
    }
    let mut coeffs = Vec::with_capacity(num_coeffs);
    for _ in 0..num_coeffs {
        let mut coefficient: i64 = 0;
        let mut k = variance << 1;
        while k > 0 {
            if k >= 64 {
                coefficient += prng.rand64()?.count_ones() as i64;
                coefficient -= prng.rand64()?.count_ones() as i64;
                k -= 64;
            } else if k >= 8 {
                coefficient += prng.rand8()?.count_ones() as i64;
                coefficient -= prng.rand8()?.count_ones() as i64;
                k -= 8;
            } else {
                let mask = ((1u16 << k) - 1) as u8;
                coefficient += (prng.rand8()? & mask).count_ones() as i64;
                coefficient -= (prng.rand8()? & mask).count_ones() as i64;
                k = 0;
            }
        }
        coeffs.push(ModularInt::import_i64(coefficient, params));
    }
    Ok(coeffs)
}

/// Samples uniformly from `[0, q)` by rejection.
pub fn sample_uniform<U, P>(prng: &mut P, params: &ModulusParams<U>) -> Result<ModularInt<U>>
where
    U: GenericUint,
    P: SecurePrng + ?Sized,
{
    let num_words = (params.log_modulus + 63) / 64;
    let excess_bits = U::bit_width() - params.log_modulus;
    loop {
        let mut candidate = U::from(prng.rand64()?);
        for _ in 1..num_words {
            candidate = candidate
                .shl_vartime(64)
                .wrapping_add(&U::from(prng.rand64()?));
        }
        let candidate = candidate.shl_vartime(excess_bits).shr_vartime(excess_bits);
        if candidate < params.modulus {
            return ModularInt::import_int(candidate, params);
        }
    }
}
