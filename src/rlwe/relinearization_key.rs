use log::debug;
use serde::{Deserialize, Serialize};

use crate::{
    error::{Result, RlweError},
    prng::{PrngType, SecurePrng},
};

use super::{
    context::Context,
    gadget::{check_log_decomposition_modulus, gadget_size, Gadget},
    generic_uint::GenericUint,
    poly::{check_substitution_power, Polynomial, SerializedPolynomial},
    sampling::sample_from_error_distribution,
    SymmetricRlweCiphertext, SymmetricRlweKey,
};

/// Key-switching matrix for one power `s'^j` of the source key: column `i`
/// encrypts `T^i * s'^j` under the target key `s`. Only `b` is serialized;
/// `a` is regenerated from the key's PRNG seed.
#[derive(Clone, Debug, PartialEq)]
struct KeyPart<U: GenericUint> {
    b: Vec<Polynomial<U>>,
    a: Vec<Polynomial<U>>,
}

/// Converts a ciphertext decryptable under `(1, s', s'^2, ..)` with
/// `s' = s(X^substitution_power)` into one decryptable under `(1, s)`.
#[derive(Clone, Debug)]
pub struct RelinearizationKey<'a, U: GenericUint> {
    gadget: Gadget<U>,
    num_parts: usize,
    substitution_power: usize,
    parts: Vec<KeyPart<U>>,
    prng_seed: Vec<u8>,
    prng_type: PrngType,
    context: &'a Context<U>,
}

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct SerializedRelinearizationKey {
    pub log_decomposition_modulus: u64,
    pub num_parts: u64,
    pub prng_seed: Vec<u8>,
    pub prng_type: PrngType,
    pub power_of_s: u64,
    pub c: Vec<SerializedPolynomial>,
}

/// With power 1 the source and target keys coincide, so both `c0` and `c1`
/// pass through unchanged.
fn first_key_index(substitution_power: usize) -> usize {
    if substitution_power == 1 {
        2
    } else {
        1
    }
}

impl<'a, U: GenericUint> RelinearizationKey<'a, U> {
    pub fn create(
        key: &SymmetricRlweKey<'a, U>,
        prng_type: PrngType,
        num_parts: usize,
        log_decomposition_modulus: usize,
        substitution_power: usize,
    ) -> Result<Self> {
        let identical = substitution_power == 1;
        let expected_num_parts = if identical { 3 } else { 2 };
        if num_parts < expected_num_parts {
            return Err(RlweError::invalid_argument(format!(
                "Num parts: {} must be at least {}",
                num_parts,
                if identical { "three." } else { "two." }
            )));
        }
        let context = key.context();
        let params = key.modulus_params();
        check_log_decomposition_modulus(log_decomposition_modulus, params.log_modulus)?;
        let gadget = Gadget::create(log_decomposition_modulus, params)?;

        let key_base = key.substitute(substitution_power)?;
        let mut key_power = key_base.key().clone();

        let prng_seed = prng_type.generate_seed()?;
        let mut prng = prng_type.create(&prng_seed)?;
        let mut prng_encryption = prng_type.create(&prng_type.generate_seed()?)?;

        let first = first_key_index(substitution_power);
        let mut parts = Vec::with_capacity(num_parts - first);
        for i in first..num_parts {
            if i != 1 {
                key_power.mul_in_place(key_base.key(), params)?;
            }
            parts.push(Self::create_part(
                &key_power,
                key,
                &gadget,
                &mut prng,
                &mut prng_encryption,
            )?);
        }
        debug!(
            "created relinearization key: {} parts, dimension {}, substitution power {}",
            num_parts,
            gadget.dimension(),
            substitution_power
        );
        Ok(Self {
            gadget,
            num_parts,
            substitution_power,
            parts,
            prng_seed,
            prng_type,
            context,
        })
    }

    /// Column `i` is `(t * e_i - s * r_i + T^i * key_power, r_i)`.
    fn create_part<P, E>(
        key_power: &Polynomial<U>,
        key: &SymmetricRlweKey<'a, U>,
        gadget: &Gadget<U>,
        prng: &mut P,
        prng_encryption: &mut E,
    ) -> Result<KeyPart<U>>
    where
        P: SecurePrng + ?Sized,
        E: SecurePrng + ?Sized,
    {
        let params = key.modulus_params();
        let ntt = key.ntt_params();
        let mut b = Vec::with_capacity(gadget.dimension());
        let mut a = Vec::with_capacity(gadget.dimension());
        for power in gadget.powers() {
            let r = Polynomial::sample_uniform(key.len(), prng, params)?;
            let mut r_top = r.mul(key.key(), params)?;
            r_top.negate_in_place(params);

            let error =
                sample_from_error_distribution(key.len(), key.variance(), prng_encryption, params)?;
            let mut column = Polynomial::from_coefficients(error).convert_to_ntt(ntt, params)?;
            column.mul_scalar_in_place(key.t_mod(), params);
            column.add_in_place(&r_top, params)?;
            column.add_in_place(&key_power.mul_scalar(power, params), params)?;
            b.push(column);
            a.push(r);
        }
        Ok(KeyPart { b, a })
    }

    pub fn apply_to(
        &self,
        ciphertext: &SymmetricRlweCiphertext<'a, U>,
    ) -> Result<SymmetricRlweCiphertext<'a, U>> {
        if ciphertext.len() > self.num_parts {
            return Err(RlweError::invalid_argument(
                "RelinearizationKey not large enough for ciphertext.",
            ));
        }
        if ciphertext.power_of_s() != self.substitution_power {
            return Err(RlweError::invalid_argument(format!(
                "Ciphertext PowerOfS: {} doesn't match the key substitution power: {}",
                ciphertext.power_of_s(),
                self.substitution_power
            )));
        }
        if !self.context.same_as(ciphertext.context()) {
            return Err(RlweError::invalid_argument(
                "Key and ciphertext were created under different contexts.",
            ));
        }
        let params = self.context.modulus_params();
        let ntt = self.context.ntt_params();
        let n = self.context.n();

        let first = first_key_index(self.substitution_power);
        let mut result = [Polynomial::zero(n), Polynomial::zero(n)];
        for (component, part) in ciphertext.components().iter().skip(first).zip(&self.parts) {
            self.gadget
                .product_accumulate(component, (&part.b[..], &part.a[..]), &mut result, ntt, params)?;
        }
        result[0].add_in_place(ciphertext.component(0)?, params)?;
        if first == 2 {
            result[1].add_in_place(ciphertext.component(1)?, params)?;
        }

        let [c0, c1] = result;
        let error = ciphertext.error()
            + self
                .context
                .error_params()
                .b_relinearize(self.parts.len(), self.gadget.log_base());
        SymmetricRlweCiphertext::new(vec![c0, c1], 1, error, self.context)
    }

    pub fn serialize(&self) -> Result<SerializedRelinearizationKey> {
        let params = self.context.modulus_params();
        let c = self
            .parts
            .iter()
            .flat_map(|part| part.b.iter())
            .map(|b| b.serialize(params))
            .collect::<Result<Vec<_>>>()?;
        Ok(SerializedRelinearizationKey {
            log_decomposition_modulus: self.gadget.log_base() as u64,
            num_parts: self.num_parts as u64,
            prng_seed: self.prng_seed.clone(),
            prng_type: self.prng_type,
            power_of_s: self.substitution_power as u64,
            c,
        })
    }

    pub fn deserialize(
        serialized: &SerializedRelinearizationKey,
        context: &'a Context<U>,
    ) -> Result<Self> {
        let substitution_power = serialized.power_of_s as usize;
        let identical = substitution_power == 1;
        let first = first_key_index(substitution_power);
        let num_parts = serialized.num_parts as usize;
        if num_parts <= first {
            return Err(RlweError::invalid_argument(format!(
                "The number of parts, {}, must be greater than {}",
                num_parts,
                if identical { "two." } else { "one." }
            )));
        }
        let num_key_parts = num_parts - first;
        if serialized.c.len() % num_key_parts != 0 {
            return Err(RlweError::invalid_argument(format!(
                "The length of serialized, {}, must be divisible by the number of parts minus {} {}.",
                serialized.c.len(),
                if identical { "two," } else { "one," },
                num_key_parts
            )));
        }
        let params = context.modulus_params();
        let log_decomposition_modulus = serialized.log_decomposition_modulus as usize;
        check_log_decomposition_modulus(log_decomposition_modulus, params.log_modulus)?;
        let dimension = serialized.c.len() / num_key_parts;
        if dimension != gadget_size(log_decomposition_modulus, params.log_modulus) {
            return Err(RlweError::invalid_argument(
                "Number of NTT Polynomials does not match expected number of matrix entries.",
            ));
        }
        check_substitution_power(substitution_power, context.n())?;
        let gadget = Gadget::create(log_decomposition_modulus, params)?;

        let mut prng = serialized.prng_type.create(&serialized.prng_seed)?;
        let parts = serialized
            .c
            .chunks(dimension)
            .map(|chunk| -> Result<KeyPart<U>> {
                let mut b = Vec::with_capacity(dimension);
                let mut a = Vec::with_capacity(dimension);
                for polynomial in chunk {
                    let column = Polynomial::deserialize(polynomial, params)?;
                    a.push(Polynomial::sample_uniform(column.len(), &mut prng, params)?);
                    b.push(column);
                }
                Ok(KeyPart { b, a })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self {
            gadget,
            num_parts,
            substitution_power,
            parts,
            prng_seed: serialized.prng_seed.clone(),
            prng_type: serialized.prng_type,
            context,
        })
    }

    pub fn num_parts(&self) -> usize {
        self.num_parts
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
