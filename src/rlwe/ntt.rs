use log::debug;

use crate::error::{Result, RlweError};

use super::{
    generic_uint::GenericUint,
    montgomery::{ModularInt, ModulusParams},
};

/// Upper bound on candidates tried when searching for a primitive `2N`-th root.
const MAX_ROOT_CANDIDATES: u64 = 1 << 16;

/// Precomputed tables of the negacyclic NTT over `Z_q[X]/(X^N + 1)`.
///
/// Forward transforms produce values in bit-reversed order and inverse
/// transforms consume them in that order, so no explicit permutation pass is
/// needed for multiplication.
#[derive(Clone, Debug, PartialEq)]
pub struct NttParameters<U: GenericUint> {
    pub number_coeffs: usize,
    pub log_n: usize,
    /// `psi^bitrev(i)` for a primitive `2N`-th root of unity `psi`.
    psis_bitrev: Vec<ModularInt<U>>,
    psis_inv_bitrev: Vec<ModularInt<U>>,
    n_inv: ModularInt<U>,
    pub bitrevs: Vec<usize>,
}

impl<U: GenericUint> NttParameters<U> {
    pub fn initialize(log_n: usize, params: &ModulusParams<U>) -> Result<Self> {
        if log_n == 0 || log_n + 1 >= params.log_modulus {
            return Err(RlweError::invalid_argument(format!(
                "The log of the ring dimension, {}, must be positive and smaller than {}.",
                log_n,
                params.log_modulus.saturating_sub(1)
            )));
        }
        let n = 1usize << log_n;
        let psi = primitive_root(log_n + 1, params)?;
        let psi_inv = psi.inverse(params)?;
        let bitrevs = bit_reversal(log_n);

        let powers = |root: ModularInt<U>| {
            let mut powers = Vec::with_capacity(n);
            let mut current = ModularInt::one(params);
            for _ in 0..n {
                powers.push(current);
                current.mul_in_place(&root, params);
            }
            bitrevs.iter().map(|&r| powers[r]).collect::<Vec<_>>()
        };
        let psis_bitrev = powers(psi);
        let psis_inv_bitrev = powers(psi_inv);
        let n_inv = ModularInt::import_u64(n as u64, params)?.inverse(params)?;

        debug!(
            "initialized NTT parameters for N = {} and modulus {:?}",
            n, params.modulus
        );
        Ok(Self {
            number_coeffs: n,
            log_n,
            psis_bitrev,
            psis_inv_bitrev,
            n_inv,
            bitrevs,
        })
    }

    /// Forward transform in place (Cooley-Tukey butterflies).
    pub fn forward(&self, coeffs: &mut [ModularInt<U>], params: &ModulusParams<U>) {
        let n = self.number_coeffs;
        debug_assert_eq!(coeffs.len(), n);
        let mut t = n;
        let mut m = 1;
        while m < n {
            t >>= 1;
            for i in 0..m {
                let j1 = 2 * i * t;
                let s = self.psis_bitrev[m + i];
                for j in j1..j1 + t {
                    let u = coeffs[j];
                    let v = coeffs[j + t].mul(&s, params);
                    coeffs[j] = u.add(&v, params);
                    coeffs[j + t] = u.sub(&v, params);
                }
            }
            m <<= 1;
        }
    }

    /// Inverse transform in place (Gentleman-Sande butterflies), including the
    /// final scaling by `N^-1`.
    pub fn inverse(&self, coeffs: &mut [ModularInt<U>], params: &ModulusParams<U>) {
        let n = self.number_coeffs;
        debug_assert_eq!(coeffs.len(), n);
        let mut t = 1;
        let mut m = n;
        while m > 1 {
            let h = m >> 1;
            let mut j1 = 0;
            for i in 0..h {
                let s = self.psis_inv_bitrev[h + i];
                for j in j1..j1 + t {
                    let u = coeffs[j];
                    let v = coeffs[j + t];
                    coeffs[j] = u.add(&v, params);
                    coeffs[j + t] = u.sub(&v, params).mul(&s, params);
                }
                j1 += 2 * t;
            }
            t <<= 1;
            m = h;
        }
        for coeff in coeffs.iter_mut() {
            coeff.mul_in_place(&self.n_inv, params);
        }
    }
}

/// Finds a primitive `2^log_order`-th root of unity, deterministically.
fn primitive_root<U: GenericUint>(
    log_order: usize,
    params: &ModulusParams<U>,
) -> Result<ModularInt<U>> {
    let group_order = params.modulus.wrapping_sub(&U::ONE);
    let cofactor = group_order.shr_vartime(log_order);
    if cofactor.shl_vartime(log_order) != group_order {
        return Err(RlweError::invalid_argument(format!(
            "The modulus {:?} does not support a negacyclic NTT of dimension {}: 2N must divide q - 1.",
            params.modulus,
            1u64 << (log_order - 1)
        )));
    }
    let minus_one = ModularInt::one(params).negate(params);
    for candidate in 2..MAX_ROOT_CANDIDATES {
        let root = ModularInt::import_reduce(U::from(candidate), params).pow_vartime(cofactor, params);
        // `root` has order dividing `2^log_order`; it is primitive exactly
        // when `root^(2^(log_order - 1)) == -1`.
        let mut half = root;
        for _ in 0..log_order - 1 {
            half = half.mul(&half, params);
        }
        if half == minus_one {
            return Ok(root);
        }
    }
    Err(RlweError::invalid_argument(format!(
        "No primitive {}-th root of unity modulo {:?}.",
        1u128 << log_order,
        params.modulus
    )))
}

pub fn bit_reversal(log_n: usize) -> Vec<usize> {
    (0..1usize << log_n)
        .map(|i| {
            if log_n == 0 {
                0
            } else {
                i.reverse_bits() >> (usize::BITS as usize - log_n)
            }
        })
        .collect()
}
