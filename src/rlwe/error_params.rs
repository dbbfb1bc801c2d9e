use crate::error::{Result, RlweError};

use super::{generic_uint::GenericUint, montgomery::ModulusParams, params::MAX_VARIANCE};

/// High-probability bounds on the l-infinity norm of ciphertext noise, as
/// functions of the plaintext modulus `t = 2^log_t + 1`, the error variance
/// and the ring dimension.
#[derive(Clone, Debug, PartialEq)]
pub struct ErrorParams {
    b_plaintext: f64,
    b_encryption: f64,
    b_scale: f64,
    log_modulus: usize,
    t: f64,
    dimension: usize,
    sigma: f64,
}

impl ErrorParams {
    pub fn create(log_t: usize, variance: u64, log_modulus: usize, dimension: usize) -> Result<Self> {
        validate_log_t(log_t, log_modulus)?;
        if variance > MAX_VARIANCE {
            return Err(RlweError::invalid_argument(format!(
                "The variance, {}, must be at most {}.",
                variance, MAX_VARIANCE
            )));
        }

        let t = 2f64.powi(log_t as i32) + 1.0;
        let sigma = (variance as f64).sqrt();
        let n = dimension as f64;
        Ok(Self {
            b_plaintext: t * (3.0 * n).sqrt(),
            b_encryption: t * n.sqrt() * (3f64.sqrt() + 6.0 * sigma),
            b_scale: t * ((3.0 * n).sqrt() + 8.0 * n * (1.0 / 3f64).sqrt()),
            log_modulus,
            t,
            dimension,
            sigma,
        })
    }

    /// Bound on a plaintext polynomial with coefficients below `t`.
    pub fn b_plaintext(&self) -> f64 {
        self.b_plaintext
    }

    /// Bound on the noise of a fresh encryption.
    pub fn b_encryption(&self) -> f64 {
        self.b_encryption
    }

    /// Bound on the rounding noise of modulus switching.
    pub fn b_scale(&self) -> f64 {
        self.b_scale
    }

    pub fn t(&self) -> f64 {
        self.t
    }

    /// Noise added by key switching `num_components` ciphertext components
    /// with a gadget of base `2^log_decomposition_modulus`.
    pub fn b_relinearize(&self, num_components: usize, log_decomposition_modulus: usize) -> f64 {
        let num_digits =
            (log_decomposition_modulus + self.log_modulus - 1) / log_decomposition_modulus;
        let decomposition_modulus = 2f64.powi(log_decomposition_modulus as i32);
        (8.0 / 3f64.sqrt())
            * self.t
            * num_digits as f64
            * self.sigma
            * self.dimension as f64
            * decomposition_modulus
            * num_components as f64
    }

    /// Noise added by key switching through an auxiliary modulus `p`.
    pub fn b_aux_mod_relinearize<U: GenericUint>(
        &self,
        num_components: usize,
        aux_params: &ModulusParams<U>,
    ) -> f64 {
        let p = aux_params.modulus_f64();
        let f = 2f64.powi(self.log_modulus as i32) / p;
        let n = self.dimension as f64;
        self.t * 6.0 * self.sigma * (n * f * num_components as f64 + n.sqrt())
    }

    /// Noise of a public-key encryption with the given dimension and variance.
    pub fn b_publickey_encryption(&self, dimension: usize, variance: u64) -> Result<f64> {
        if variance == 0 {
            return Err(RlweError::invalid_argument(format!(
                "The variance, {}, must be positive.",
                variance
            )));
        }
        let sigma = (variance as f64).sqrt();
        let n = dimension as f64;
        Ok(self.t * (n.sqrt() * (6.0 * sigma + 3f64.sqrt()) + 72.0 * n * variance as f64))
    }
}

pub(crate) fn validate_log_t(log_t: usize, log_modulus: usize) -> Result<()> {
    if log_t + 1 >= log_modulus {
        return Err(RlweError::invalid_argument(format!(
            "The value log_t, {}, must be smaller than log_modulus - 1, {}.",
            log_t,
            log_modulus.saturating_sub(1)
        )));
    }
    if log_t == 0 {
        return Err(RlweError::invalid_argument(format!(
            "The value log_t, {}, must be positive.",
            log_t
        )));
    }
    Ok(())
}
