use log::debug;
use serde::{Deserialize, Serialize};

use crate::{
    error::{Result, RlweError},
    prng::PrngType,
};

use super::{
    context::Context,
    gadget::{check_log_decomposition_modulus, gadget_size, Gadget},
    generic_uint::GenericUint,
    poly::{check_substitution_power, Polynomial, SerializedPolynomial},
    sampling::sample_from_error_distribution,
    SymmetricRlweCiphertext, SymmetricRlweKey,
};

/// Switches a ciphertext substituted by `X -> X^substitution_power` back to
/// the canonical key. Column `i` is `(u_i * s + t * e_i + s(X^p) * T^i, -u_i)`.
#[derive(Clone, Debug)]
pub struct GaloisKey<'a, U: GenericUint> {
    key_bs: Vec<Polynomial<U>>,
    key_as: Vec<Polynomial<U>>,
    gadget: Gadget<U>,
    substitution_power: usize,
    prng_seed: Vec<u8>,
    prng_type: PrngType,
    context: &'a Context<U>,
}

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct SerializedGaloisKey {
    pub log_decomposition_modulus: u64,
    pub power_of_s: u64,
    pub prng_seed: Vec<u8>,
    pub prng_type: PrngType,
    pub key_bs: Vec<SerializedPolynomial>,
}

impl<'a, U: GenericUint> GaloisKey<'a, U> {
    pub fn create(
        key: &SymmetricRlweKey<'a, U>,
        prng_type: PrngType,
        substitution_power: usize,
        log_decomposition_modulus: usize,
    ) -> Result<Self> {
        let context = key.context();
        let params = key.modulus_params();
        let ntt = key.ntt_params();
        check_log_decomposition_modulus(log_decomposition_modulus, params.log_modulus)?;
        let gadget = Gadget::create(log_decomposition_modulus, params)?;
        let substituted = key.substitute(substitution_power)?;

        let prng_seed = prng_type.generate_seed()?;
        let mut prng = prng_type.create(&prng_seed)?;
        let mut prng_encryption = prng_type.create(&prng_type.generate_seed()?)?;

        let mut key_bs = Vec::with_capacity(gadget.dimension());
        let mut key_as = Vec::with_capacity(gadget.dimension());
        for power in gadget.powers() {
            let u = Polynomial::sample_uniform(key.len(), &mut prng, params)?;
            let error = sample_from_error_distribution(
                key.len(),
                key.variance(),
                &mut prng_encryption,
                params,
            )?;
            let mut b = Polynomial::from_coefficients(error).convert_to_ntt(ntt, params)?;
            b.mul_scalar_in_place(key.t_mod(), params);
            b.fused_mul_add_in_place(&u, key.key(), params)?;
            b.add_in_place(&substituted.key().mul_scalar(power, params), params)?;
            key_bs.push(b);
            key_as.push(u.negate(params));
        }
        debug!(
            "created galois key: substitution power {}, dimension {}",
            substitution_power,
            gadget.dimension()
        );
        Ok(Self {
            key_bs,
            key_as,
            gadget,
            substitution_power,
            prng_seed,
            prng_type,
            context,
        })
    }

    pub fn apply_to(
        &self,
        ciphertext: &SymmetricRlweCiphertext<'a, U>,
    ) -> Result<SymmetricRlweCiphertext<'a, U>> {
        if ciphertext.power_of_s() != self.substitution_power {
            return Err(RlweError::invalid_argument(format!(
                "Ciphertext PowerOfS: {} doesn't match the key substitution power: {}",
                ciphertext.power_of_s(),
                self.substitution_power
            )));
        }
        if ciphertext.len() > 2 {
            return Err(RlweError::invalid_argument(
                "GaloisKey not large enough for ciphertext.",
            ));
        }
        if !self.context.same_as(ciphertext.context()) {
            return Err(RlweError::invalid_argument(
                "Key and ciphertext were created under different contexts.",
            ));
        }
        let params = self.context.modulus_params();
        let n = self.context.n();
        let mut result = [ciphertext.component(0)?.clone(), Polynomial::zero(n)];
        self.gadget.product_accumulate(
            ciphertext.component(1)?,
            (&self.key_bs[..], &self.key_as[..]),
            &mut result,
            self.context.ntt_params(),
            params,
        )?;
        let [c0, c1] = result;
        let error = ciphertext.error()
            + self
                .context
                .error_params()
                .b_relinearize(1, self.gadget.log_base());
        SymmetricRlweCiphertext::new(vec![c0, c1], 1, error, self.context)
    }

    pub fn serialize(&self) -> Result<SerializedGaloisKey> {
        let params = self.context.modulus_params();
        Ok(SerializedGaloisKey {
            log_decomposition_modulus: self.gadget.log_base() as u64,
            power_of_s: self.substitution_power as u64,
            prng_seed: self.prng_seed.clone(),
            prng_type: self.prng_type,
            key_bs: self
                .key_bs
                .iter()
                .map(|b| b.serialize(params))
                .collect::<Result<Vec<_>>>()?,
        })
    }

    pub fn deserialize(serialized: &SerializedGaloisKey, context: &'a Context<U>) -> Result<Self> {
        let params = context.modulus_params();
        let log_decomposition_modulus = serialized.log_decomposition_modulus as usize;
        check_log_decomposition_modulus(log_decomposition_modulus, params.log_modulus)?;
        if serialized.key_bs.len() != gadget_size(log_decomposition_modulus, params.log_modulus) {
            return Err(RlweError::invalid_argument(
                "Number of NTT Polynomials does not match expected number of matrix entries.",
            ));
        }
        let substitution_power = serialized.power_of_s as usize;
        check_substitution_power(substitution_power, context.n())?;
        let gadget = Gadget::create(log_decomposition_modulus, params)?;

        let mut prng = serialized.prng_type.create(&serialized.prng_seed)?;
        let mut key_bs = Vec::with_capacity(gadget.dimension());
        let mut key_as = Vec::with_capacity(gadget.dimension());
        for b in serialized.key_bs.iter() {
            let b = Polynomial::deserialize(b, params)?;
            key_as.push(Polynomial::sample_uniform(b.len(), &mut prng, params)?.negate(params));
            key_bs.push(b);
        }
        Ok(Self {
            key_bs,
            key_as,
            gadget,
            substitution_power,
            prng_seed: serialized.prng_seed.clone(),
            prng_type: serialized.prng_type,
            context,
        })
    }

    pub fn dimension(&self) -> usize {
        self.gadget.dimension()
    }

    pub fn log_decomposition_modulus(&self) -> usize {
        self.gadget.log_base()
    }

    pub fn substitution_power(&self) -> usize {
        self.substitution_power
    }
}

#[cfg(test)]
mod tests {
    use crypto_bigint::U64;
    use rand::Rng;

    use super::{GaloisKey, SerializedGaloisKey};
    use crate::{
        prng::{PrngType, SingleThreadChaChaPrng},
        rlwe::{
            context::{Context, ContextParameters},
            decrypt, encrypt,
            params::{MODULUS_29, TOY_PARAMETERS},
            remove_error,
            wire::WireFormat,
            SymmetricRlweCiphertext, SymmetricRlweKey,
        },
    };

    const LOG_DECOMPOSITION_MODULUS: usize = 2;
    const LARGE_LOG_DECOMPOSITION_MODULUS: usize = 31;
    const PRNG_TYPES: [PrngType; 2] = [PrngType::Hkdf, PrngType::ChaCha];

    fn context() -> Context<U64> {
        Context::create(ContextParameters {
            log_t: 1,
            ..TOY_PARAMETERS
        })
        .unwrap()
    }

    fn sample_key(context: &Context<U64>) -> SymmetricRlweKey<U64> {
        let mut prng =
            SingleThreadChaChaPrng::create(&SingleThreadChaChaPrng::generate_seed().unwrap()).unwrap();
        SymmetricRlweKey::sample(context, &mut prng).unwrap()
    }

    fn sample_plaintext(context: &Context<U64>) -> Vec<U64> {
        let mut rng = rand::thread_rng();
        (0..context.n())
            .map(|_| U64::from_u64(rng.gen_range(0..3)))
            .collect()
    }

    fn encrypt_plaintext<'a>(
        key: &SymmetricRlweKey<'a, U64>,
        plaintext: &[U64],
    ) -> SymmetricRlweCiphertext<'a, U64> {
        let mut prng =
            SingleThreadChaChaPrng::create(&SingleThreadChaChaPrng::generate_seed().unwrap()).unwrap();
        let encoded = key.context().encode_plaintext(plaintext).unwrap();
        encrypt(key, &encoded, &mut prng).unwrap()
    }

    /// Decryption of `plaintext` after substituting `X -> X^power`.
    fn substituted(context: &Context<U64>, plaintext: &[U64], power: usize) -> Vec<U64> {
        let params = context.modulus_params();
        let expected = context
            .encode_plaintext(plaintext)
            .unwrap()
            .substitute(power, context.ntt_params(), params)
            .unwrap()
            .inverse_ntt(context.ntt_params(), params)
            .unwrap();
        remove_error(expected.coeffs(), params, &context.t())
    }

    #[test]
    fn key_switched_ciphertext_decrypts() {
        let context = context();
        for prng_type in PRNG_TYPES {
            for log_decomposition_modulus in [LOG_DECOMPOSITION_MODULUS, LARGE_LOG_DECOMPOSITION_MODULUS] {
                let key = sample_key(&context);
                let galois_key = GaloisKey::create(&key, prng_type, 3, log_decomposition_modulus).unwrap();
                let plaintext = sample_plaintext(&context);
                let ciphertext = encrypt_plaintext(&key, &plaintext).substitute(3).unwrap();
                assert_eq!(ciphertext.power_of_s(), 3);

                let switched = galois_key.apply_to(&ciphertext).unwrap();
                assert_eq!(switched.power_of_s(), 1);
                assert_eq!(
                    switched.error(),
                    ciphertext.error()
                        + context
                            .error_params()
                            .b_relinearize(1, log_decomposition_modulus)
                );
                assert_eq!(decrypt(&key, &switched).unwrap(), substituted(&context, &plaintext, 3));
            }
        }
    }

    #[test]
    fn composing_substitutions() {
        let context = context();
        let key = sample_key(&context);
        let galois_key = GaloisKey::create(&key, PrngType::Hkdf, 3, LOG_DECOMPOSITION_MODULUS).unwrap();
        let plaintext = sample_plaintext(&context);

        let ciphertext = encrypt_plaintext(&key, &plaintext);
        let power_3 = galois_key.apply_to(&ciphertext.substitute(3).unwrap()).unwrap();
        let power_9 = galois_key.apply_to(&power_3.substitute(3).unwrap()).unwrap();
        assert_eq!(power_9.power_of_s(), 1);
        assert_eq!(decrypt(&key, &power_9).unwrap(), substituted(&context, &plaintext, 9));

        let galois_key_9 = GaloisKey::create(&key, PrngType::Hkdf, 9, LOG_DECOMPOSITION_MODULUS).unwrap();
        let direct = galois_key_9.apply_to(&ciphertext.substitute(9).unwrap()).unwrap();
        assert_eq!(direct.power_of_s(), 1);
        assert!(direct.error() < power_9.error());
        assert_eq!(decrypt(&key, &direct).unwrap(), decrypt(&key, &power_9).unwrap());
    }

    #[test]
    fn power_of_s_does_not_match_substitution_power() {
        let context = context();
        let key = sample_key(&context);
        let galois_key =
            GaloisKey::create(&key, PrngType::ChaCha, 3, LARGE_LOG_DECOMPOSITION_MODULUS).unwrap();
        let ciphertext = encrypt_plaintext(&key, &sample_plaintext(&context))
            .substitute(5)
            .unwrap();
        let err = galois_key.apply_to(&ciphertext).unwrap_err();
        assert!(err
            .to_string()
            .contains("Ciphertext PowerOfS: 5 doesn't match the key substitution power: 3"));
    }

    #[test]
    fn ciphertext_with_too_many_components() {
        let context = context();
        let key = sample_key(&context);
        let galois_key =
            GaloisKey::create(&key, PrngType::Hkdf, 3, LARGE_LOG_DECOMPOSITION_MODULUS).unwrap();
        let ciphertext = encrypt_plaintext(&key, &sample_plaintext(&context))
            .substitute(3)
            .unwrap();
        let product = ciphertext.mul(&ciphertext).unwrap();
        let err = galois_key.apply_to(&product).unwrap_err();
        assert!(err.to_string().contains("not large enough"));
    }

    #[test]
    fn invalid_parameters() {
        let context = context();
        let key = sample_key(&context);
        assert!(GaloisKey::create(&key, PrngType::Hkdf, 4, 2).is_err());
        assert!(GaloisKey::create(&key, PrngType::Hkdf, 2 * context.n() + 1, 2).is_err());
        let err = GaloisKey::create(&key, PrngType::Hkdf, 3, 0).unwrap_err();
        assert!(err.to_string().contains("must be positive"));
    }

    #[test]
    fn deserialized_key_switches() {
        let context = context();
        for prng_type in PRNG_TYPES {
            let key = sample_key(&context);
            let galois_key =
                GaloisKey::create(&key, prng_type, 3, LARGE_LOG_DECOMPOSITION_MODULUS).unwrap();
            let bytes = galois_key.serialize().unwrap().to_bytes().unwrap();
            let deserialized =
                GaloisKey::deserialize(&SerializedGaloisKey::from_bytes(&bytes).unwrap(), &context)
                    .unwrap();
            assert_eq!(deserialized.key_as, galois_key.key_as);
            assert_eq!(deserialized.substitution_power(), 3);
            assert_eq!(deserialized.dimension(), galois_key.dimension());

            let plaintext = sample_plaintext(&context);
            let ciphertext = encrypt_plaintext(&key, &plaintext).substitute(3).unwrap();
            let decrypted = decrypt(&key, &galois_key.apply_to(&ciphertext).unwrap()).unwrap();
            let deserialized_decrypted =
                decrypt(&key, &deserialized.apply_to(&ciphertext).unwrap()).unwrap();
            assert_eq!(deserialized_decrypted, substituted(&context, &plaintext, 3));
            assert_eq!(deserialized_decrypted, decrypted);
        }
    }

    #[test]
    fn deserialization_fails_with_incorrect_modulus() {
        let context = context();
        let context29 = Context::<U64>::create(ContextParameters {
            modulus: MODULUS_29,
            ..TOY_PARAMETERS
        })
        .unwrap();
        let key = sample_key(&context);
        let galois_key =
            GaloisKey::create(&key, PrngType::Hkdf, 3, LARGE_LOG_DECOMPOSITION_MODULUS).unwrap();
        let serialized = galois_key.serialize().unwrap();
        let err = GaloisKey::deserialize(&serialized, &context29).unwrap_err();
        assert!(err.to_string().contains(&format!(
            "Log decomposition modulus, {}, must be at most: {}.",
            LARGE_LOG_DECOMPOSITION_MODULUS,
            context29.log_modulus()
        )));
    }

    #[test]
    fn deserialization_validates_entries() {
        let context = context();
        let key = sample_key(&context);
        let galois_key =
            GaloisKey::create(&key, PrngType::ChaCha, 3, LARGE_LOG_DECOMPOSITION_MODULUS).unwrap();
        let serialized = galois_key.serialize().unwrap();

        let mut missing_entry = serialized.clone();
        missing_entry.key_bs.pop();
        let err = GaloisKey::deserialize(&missing_entry, &context).unwrap_err();
        assert!(err
            .to_string()
            .contains("Number of NTT Polynomials does not match expected number of matrix entries."));

        let mut even_power = serialized.clone();
        even_power.power_of_s = 2;
        assert!(GaloisKey::deserialize(&even_power, &context).is_err());

        let mut zero_log_decomposition = serialized;
        zero_log_decomposition.log_decomposition_modulus = 0;
        let err = GaloisKey::deserialize(&zero_log_decomposition, &context).unwrap_err();
        assert!(err.to_string().contains("must be positive"));
    }

    #[test]
    fn serializations_of_identical_keys_are_equal() {
        let context = context();
        let key = sample_key(&context);
        let galois_key =
            GaloisKey::create(&key, PrngType::Hkdf, 3, LARGE_LOG_DECOMPOSITION_MODULUS).unwrap();
        let copy = galois_key.clone();
        assert_eq!(galois_key.serialize().unwrap(), copy.serialize().unwrap());
    }
}
