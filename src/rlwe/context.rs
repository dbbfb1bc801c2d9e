use std::{fs::File, io::BufReader, io::Read, path::Path};

use log::debug;
use serde::{Deserialize, Serialize};

use crate::error::{Result, RlweError};

use super::{
    error_params::ErrorParams,
    generic_uint::GenericUint,
    montgomery::{ModularInt, ModulusParams},
    ntt::NttParameters,
    poly::Polynomial,
};

/// The parameter tuple a `Context` is built from.
#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Eq, Serialize)]
pub struct ContextParameters {
    pub modulus: u128,
    pub log_n: usize,
    pub log_t: usize,
    pub variance: u64,
}

impl ContextParameters {
    pub fn from_json_reader(reader: impl Read) -> Result<Self> {
        serde_json::from_reader(reader)
            .map_err(|e| RlweError::invalid_argument(format!("invalid context parameters: {}", e)))
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| {
            RlweError::invalid_argument(format!("cannot open {}: {}", path.display(), e))
        })?;
        Self::from_json_reader(BufReader::new(file))
    }
}

/// Immutable bundle of modulus, NTT and noise parameters. Keys, ciphertexts
/// and key-switching keys borrow the context they were created under.
#[derive(Debug)]
pub struct Context<U: GenericUint> {
    parameters: ContextParameters,
    modulus_params: ModulusParams<U>,
    ntt_params: NttParameters<U>,
    error_params: ErrorParams,
    plaintext_modulus: U,
}

impl<U: GenericUint> Context<U> {
    pub fn create(parameters: ContextParameters) -> Result<Self> {
        let modulus_params = ModulusParams::from_u128(parameters.modulus)?;
        let ntt_params = NttParameters::initialize(parameters.log_n, &modulus_params)?;
        let error_params = ErrorParams::create(
            parameters.log_t,
            parameters.variance,
            modulus_params.log_modulus,
            ntt_params.number_coeffs,
        )?;
        let plaintext_modulus = U::ONE.shl_vartime(parameters.log_t).wrapping_add(&U::ONE);
        debug!(
            "created context: log_q = {}, N = {}, log_t = {}, variance = {}",
            modulus_params.log_modulus, ntt_params.number_coeffs, parameters.log_t, parameters.variance
        );
        Ok(Self {
            parameters,
            modulus_params,
            ntt_params,
            error_params,
            plaintext_modulus,
        })
    }

    pub fn parameters(&self) -> &ContextParameters {
        &self.parameters
    }

    pub fn modulus_params(&self) -> &ModulusParams<U> {
        &self.modulus_params
    }

    pub fn ntt_params(&self) -> &NttParameters<U> {
        &self.ntt_params
    }

    pub fn error_params(&self) -> &ErrorParams {
        &self.error_params
    }

    pub fn modulus(&self) -> U {
        self.modulus_params.modulus
    }

    pub fn log_modulus(&self) -> usize {
        self.modulus_params.log_modulus
    }

    pub fn n(&self) -> usize {
        self.ntt_params.number_coeffs
    }

    pub fn log_n(&self) -> usize {
        self.parameters.log_n
    }

    pub fn log_t(&self) -> usize {
        self.parameters.log_t
    }

    /// The plaintext modulus `t = 2^log_t + 1`.
    pub fn t(&self) -> U {
        self.plaintext_modulus
    }

    pub fn variance(&self) -> u64 {
        self.parameters.variance
    }

    /// Lifts a vector of `N` plaintext values below `t` into an NTT-form
    /// polynomial ready for encryption.
    pub fn encode_plaintext(&self, values: &[U]) -> Result<Polynomial<U>> {
        if values.len() != self.n() {
            return Err(RlweError::invalid_argument(format!(
                "Plaintext has {} values, expected {}.",
                values.len(),
                self.n()
            )));
        }
        if let Some(value) = values.iter().find(|value| **value >= self.plaintext_modulus) {
            return Err(RlweError::invalid_argument(format!(
                "Plaintext value {:?} is not smaller than the plaintext modulus {:?}.",
                value, self.plaintext_modulus
            )));
        }
        Polynomial::from_plaintext(values, &self.ntt_params, &self.modulus_params)
    }

    pub(crate) fn same_as(&self, other: &Self) -> bool {
        std::ptr::eq(self, other)
    }

    pub(crate) fn import(&self, value: U) -> Result<ModularInt<U>> {
        ModularInt::import_int(value, &self.modulus_params)
    }
}

#[cfg(test)]
mod tests {
    use crypto_bigint::{U128, U64};

    use super::{Context, ContextParameters};
    use crate::rlwe::params::{AGGREGATION_PARAMETERS, MODULUS_25, MODULUS_80, TOY_PARAMETERS};

    #[test]
    fn create_toy_context() {
        let context = Context::<U64>::create(TOY_PARAMETERS).unwrap();
        assert_eq!(context.n(), 1024);
        assert_eq!(context.log_modulus(), 59);
        assert_eq!(context.t(), U64::from_u64(2049));
        assert_eq!(context.error_params().t(), 2049.0);
    }

    #[test]
    fn create_wide_context() {
        let context = Context::<U128>::create(AGGREGATION_PARAMETERS).unwrap();
        assert_eq!(context.n(), 2048);
        assert_eq!(context.log_modulus(), 80);
        assert!(Context::<U64>::create(AGGREGATION_PARAMETERS).is_err());
    }

    #[test]
    fn invalid_parameters_are_rejected() {
        let too_large_n = ContextParameters {
            modulus: MODULUS_25,
            log_n: 10,
            ..TOY_PARAMETERS
        };
        assert!(Context::<U64>::create(too_large_n).is_err());
        let bad_log_t = ContextParameters {
            log_t: 79,
            ..AGGREGATION_PARAMETERS
        };
        let err = Context::<U128>::create(bad_log_t).unwrap_err();
        assert!(err.to_string().contains("must be smaller than log_modulus - 1, 79."));
        let bad_variance = ContextParameters {
            modulus: MODULUS_80,
            variance: 1000,
            ..AGGREGATION_PARAMETERS
        };
        assert!(Context::<U128>::create(bad_variance).is_err());
    }

    #[test]
    fn parameters_from_json() {
        let json = r#"{"modulus": 332366567264636929, "log_n": 10, "log_t": 11, "variance": 8}"#;
        let parameters = ContextParameters::from_json_reader(json.as_bytes()).unwrap();
        assert_eq!(parameters, TOY_PARAMETERS);
        assert!(ContextParameters::from_json_reader(&b"{\"modulus\": 1}"[..]).is_err());
    }

    #[test]
    fn encode_plaintext_validates_input() {
        let context = Context::<U64>::create(TOY_PARAMETERS).unwrap();
        let mut values = vec![U64::from_u64(5); context.n()];
        assert!(context.encode_plaintext(&values).is_ok());
        values[3] = U64::from_u64(2049);
        assert!(context.encode_plaintext(&values).is_err());
        assert!(context.encode_plaintext(&values[1..]).is_err());
    }
}
