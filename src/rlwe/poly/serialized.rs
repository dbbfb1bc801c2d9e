use serde::{Deserialize, Serialize};

use crate::{
    error::{Result, RlweError},
    rlwe::{
        generic_uint::GenericUint,
        montgomery::{ModularInt, ModulusParams},
    },
};

use super::Polynomial;

/// Wire form of an NTT-form polynomial: every value is written as
/// `ceil(log_q / 8)` little-endian bytes.
#[derive(Clone, Debug, Deserialize, PartialEq, Eq, Serialize)]
pub struct SerializedPolynomial {
    pub num_coeffs: u32,
    pub coeffs: Vec<u8>,
}

fn bytes_per_coeff<U: GenericUint>(params: &ModulusParams<U>) -> usize {
    (params.log_modulus + 7) / 8
}

impl<U: GenericUint> Polynomial<U> {
    pub fn serialize(&self, params: &ModulusParams<U>) -> Result<SerializedPolynomial> {
        if !self.is_ntt {
            return Err(RlweError::invalid_argument(
                "Only polynomials in NTT form can be serialized.",
            ));
        }
        let num_coeffs = u32::try_from(self.coeffs.len()).map_err(|_| {
            RlweError::invalid_argument("Polynomial has too many coefficients to serialize.")
        })?;
        let width = bytes_per_coeff(params);
        let mut coeffs = Vec::with_capacity(self.coeffs.len() * width);
        for coeff in self.coeffs.iter() {
            coeffs.extend(coeff.export_int(params).to_le_bytes_vec(width));
        }
        Ok(SerializedPolynomial { num_coeffs, coeffs })
    }

    pub fn deserialize(serialized: &SerializedPolynomial, params: &ModulusParams<U>) -> Result<Self> {
        let width = bytes_per_coeff(params);
        let num_coeffs = serialized.num_coeffs as usize;
        if serialized.coeffs.len() != num_coeffs * width {
            return Err(RlweError::invalid_argument(format!(
                "Serialized polynomial has {} bytes, expected {} for {} coefficients.",
                serialized.coeffs.len(),
                num_coeffs * width,
                num_coeffs
            )));
        }
        let values = serialized
            .coeffs
            .chunks(width)
            .map(|chunk| {
                let value = U::from_le_bytes_slice(chunk).ok_or_else(|| {
                    RlweError::invalid_argument("Serialized coefficient is too wide.")
                })?;
                ModularInt::import_int(value, params)
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self::from_ntt_values(values))
    }
}
