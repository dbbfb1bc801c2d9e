use std::fmt::Debug;

use crate::error::{Result, RlweError};

use super::generic_uint::GenericUint;

/// Per-modulus constants shared by every `ModularInt` reduced modulo `modulus`.
#[derive(Clone, Debug, PartialEq)]
pub struct ModulusParams<U: GenericUint> {
    pub modulus: U,
    /// Bit length of `modulus`.
    pub log_modulus: usize,
    montgomery: U::MontgomeryParams,
}

impl<U: GenericUint> ModulusParams<U> {
    pub fn create(modulus: U) -> Result<Self> {
        if modulus.low_u64() & 1 == 0 {
            return Err(RlweError::invalid_argument(format!(
                "The modulus, {:?}, must be odd.",
                modulus
            )));
        }
        let log_modulus = modulus.bits_vartime();
        if log_modulus < 2 {
            return Err(RlweError::invalid_argument(
                "The modulus must be at least three.",
            ));
        }
        if log_modulus > U::bit_width() - 2 {
            return Err(RlweError::invalid_argument(format!(
                "The modulus has {} bits, but the integer type supports at most {} bits.",
                log_modulus,
                U::bit_width() - 2
            )));
        }
        Ok(Self {
            modulus,
            log_modulus,
            montgomery: U::montgomery_params(&modulus),
        })
    }

    pub fn from_u128(modulus: u128) -> Result<Self> {
        let modulus = U::try_from_u128(modulus).ok_or_else(|| {
            RlweError::invalid_argument(format!(
                "The modulus, {}, does not fit into {} bits.",
                modulus,
                U::bit_width()
            ))
        })?;
        Self::create(modulus)
    }

    pub fn modulus_f64(&self) -> f64 {
        self.modulus.to_f64()
    }
}

/// An integer modulo `q` kept in Montgomery form. The modulus is not stored;
/// every operation takes the `ModulusParams` it was imported with.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ModularInt<U: GenericUint>(U);

impl<U: GenericUint> ModularInt<U> {
    /// Fails unless `value < q`.
    pub fn import_int(value: U, params: &ModulusParams<U>) -> Result<Self> {
        if value >= params.modulus {
            return Err(RlweError::invalid_argument(format!(
                "The value {:?} is not reduced modulo {:?}.",
                value, params.modulus
            )));
        }
        Ok(Self(value.to_montgomery(&params.montgomery)))
    }

    pub fn import_u64(value: u64, params: &ModulusParams<U>) -> Result<Self> {
        Self::import_int(U::from(value), params)
    }

    /// Imports an arbitrary integer, reducing it first.
    pub fn import_reduce(value: U, params: &ModulusParams<U>) -> Self {
        Self(value.rem_vartime(&params.modulus).to_montgomery(&params.montgomery))
    }

    pub fn import_i64(value: i64, params: &ModulusParams<U>) -> Self {
        let magnitude = Self::import_reduce(U::from(value.unsigned_abs()), params);
        if value < 0 {
            magnitude.negate(params)
        } else {
            magnitude
        }
    }

    pub fn zero() -> Self {
        Self(U::ZERO)
    }

    pub fn one(params: &ModulusParams<U>) -> Self {
        Self(U::ONE.to_montgomery(&params.montgomery))
    }

    pub fn export_int(&self, params: &ModulusParams<U>) -> U {
        self.0.from_montgomery(&params.montgomery)
    }

    /// The stored Montgomery representation.
    pub fn montgomery_form(&self) -> U {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == U::ZERO
    }

    pub fn add(&self, rhs: &Self, params: &ModulusParams<U>) -> Self {
        Self(self.0.add_mod(&rhs.0, &params.modulus))
    }

    pub fn sub(&self, rhs: &Self, params: &ModulusParams<U>) -> Self {
        Self(self.0.sub_mod(&rhs.0, &params.modulus))
    }

    pub fn mul(&self, rhs: &Self, params: &ModulusParams<U>) -> Self {
        Self(self.0.mul_montgomery(&rhs.0, &params.montgomery))
    }

    pub fn negate(&self, params: &ModulusParams<U>) -> Self {
        Self(self.0.neg_mod(&params.modulus))
    }

    pub fn add_in_place(&mut self, rhs: &Self, params: &ModulusParams<U>) {
        *self = self.add(rhs, params);
    }

    pub fn sub_in_place(&mut self, rhs: &Self, params: &ModulusParams<U>) {
        *self = self.sub(rhs, params);
    }

    pub fn mul_in_place(&mut self, rhs: &Self, params: &ModulusParams<U>) {
        *self = self.mul(rhs, params);
    }

    /// `self += a * b`
    pub fn fused_mul_add_in_place(&mut self, a: &Self, b: &Self, params: &ModulusParams<U>) {
        *self = self.add(&a.mul(b, params), params);
    }

    /// This method is constant-time only with respect to `self`.  Depending on
    /// `exp`, timing can and will vary.
    pub fn pow_vartime(&self, mut exp: U, params: &ModulusParams<U>) -> Self {
        let mut base = *self;
        let mut result = Self::one(params);
        while exp != U::ZERO {
            if exp.low_u64() & 1 == 1 {
                result.mul_in_place(&base, params);
            }
            exp = exp.shr_vartime(1);
            base = base.mul(&base, params);
        }
        result
    }

    pub fn pow_u64_vartime(&self, exp: u64, params: &ModulusParams<U>) -> Self {
        self.pow_vartime(U::from(exp), params)
    }

    /// Multiplicative inverse of a non-zero value coprime to the modulus.
    pub fn inverse(&self, params: &ModulusParams<U>) -> Result<Self> {
        if self.is_zero() {
            return Err(RlweError::invalid_argument("Zero has no inverse."));
        }
        self.0
            .invert_montgomery(&params.montgomery)
            .map(Self)
            .ok_or_else(|| {
                RlweError::invalid_argument(format!(
                    "The value is not invertible modulo {:?}.",
                    params.modulus
                ))
            })
    }
}
