use crate::error::{Result, RlweError};

use super::{
    generic_uint::GenericUint,
    montgomery::{ModularInt, ModulusParams},
    ntt::NttParameters,
    poly::Polynomial,
};

/// Number of base-`2^log_base` digits needed for a `log_modulus`-bit value.
pub fn gadget_size(log_base: usize, log_modulus: usize) -> usize {
    (log_modulus + log_base - 1) / log_base
}

pub(crate) fn check_log_decomposition_modulus(log_base: usize, log_modulus: usize) -> Result<()> {
    if log_base == 0 {
        return Err(RlweError::invalid_argument(format!(
            "Log decomposition modulus, {}, must be positive.",
            log_base
        )));
    }
    if log_base > log_modulus {
        return Err(RlweError::invalid_argument(format!(
            "Log decomposition modulus, {}, must be at most: {}.",
            log_base, log_modulus
        )));
    }
    Ok(())
}

/// Splits every coefficient into `dimension` base-`2^log_base` digits, least
/// significant first. Entry `i` of the result holds digit `i` of all
/// coefficients.
pub fn base_decompose<U: GenericUint>(
    coeffs: &[ModularInt<U>],
    params: &ModulusParams<U>,
    log_base: usize,
    dimension: usize,
) -> Result<Vec<Vec<ModularInt<U>>>> {
    let mut values: Vec<U> = coeffs.iter().map(|c| c.export_int(params)).collect();
    let mut digits = Vec::with_capacity(dimension);
    for _ in 0..dimension {
        let mut plane = Vec::with_capacity(values.len());
        for value in values.iter_mut() {
            let rest = value.shr_vartime(log_base);
            let digit = value.wrapping_sub(&rest.shl_vartime(log_base));
            plane.push(ModularInt::import_int(digit, params)?);
            *value = rest;
        }
        digits.push(plane);
    }
    Ok(digits)
}

/// The gadget vector `(1, T, T^2, ..)` with `T = 2^log_base`, reduced mod `q`.
#[derive(Clone, Debug, PartialEq)]
pub struct Gadget<U: GenericUint> {
    log_base: usize,
    dimension: usize,
    powers: Vec<ModularInt<U>>,
}

impl<U: GenericUint> Gadget<U> {
    pub fn create(log_base: usize, params: &ModulusParams<U>) -> Result<Self> {
        check_log_decomposition_modulus(log_base, params.log_modulus)?;
        let dimension = gadget_size(log_base, params.log_modulus);
        let base = ModularInt::import_reduce(U::ONE.shl_vartime(log_base), params);
        let mut powers = Vec::with_capacity(dimension);
        let mut power = ModularInt::one(params);
        for _ in 0..dimension {
            powers.push(power);
            power.mul_in_place(&base, params);
        }
        Ok(Self {
            log_base,
            dimension,
            powers,
        })
    }

    pub fn log_base(&self) -> usize {
        self.log_base
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    pub fn powers(&self) -> &[ModularInt<U>] {
        &self.powers
    }

    /// Digit planes of an NTT-form polynomial, each converted back to NTT form.
    pub fn decompose(
        &self,
        polynomial: &Polynomial<U>,
        ntt: &NttParameters<U>,
        params: &ModulusParams<U>,
    ) -> Result<Vec<Polynomial<U>>> {
        let coeffs = polynomial.coefficients(ntt, params)?;
        base_decompose(&coeffs, params, self.log_base, self.dimension)?
            .into_iter()
            .map(|plane| Polynomial::from_coefficients(plane).convert_to_ntt(ntt, params))
            .collect()
    }

    /// Accumulates `(sum_i d_i * rows.0[i], sum_i d_i * rows.1[i])` into
    /// `result` for the digits `d_i` of `polynomial`.
    pub fn product_accumulate(
        &self,
        polynomial: &Polynomial<U>,
        rows: (&[Polynomial<U>], &[Polynomial<U>]),
        result: &mut [Polynomial<U>; 2],
        ntt: &NttParameters<U>,
        params: &ModulusParams<U>,
    ) -> Result<()> {
        if rows.0.len() != self.dimension || rows.1.len() != self.dimension {
            return Err(RlweError::invalid_argument(
                "Number of NTT Polynomials does not match expected number of matrix entries.",
            ));
        }
        let digits = self.decompose(polynomial, ntt, params)?;
        for ((digit, b), a) in digits.iter().zip(rows.0).zip(rows.1) {
            result[0].fused_mul_add_in_place(digit, b, params)?;
            result[1].fused_mul_add_in_place(digit, a, params)?;
        }
        Ok(())
    }
}
