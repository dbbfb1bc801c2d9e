pub mod context;
pub mod error_params;
pub mod gadget;
pub mod galois_key;
pub mod generic_uint;
pub mod montgomery;
pub mod ntt;
pub mod params;
pub mod poly;
pub mod relinearization_key;
pub mod sampling;
pub mod wire;

use std::{collections::HashMap, sync::Mutex};

use log::trace;
use serde::{Deserialize, Serialize};

use crate::{
    error::{Result, RlweError},
    prng::SecurePrng,
};

use self::{
    context::Context,
    error_params::{validate_log_t, ErrorParams},
    generic_uint::GenericUint,
    montgomery::{ModularInt, ModulusParams},
    ntt::NttParameters,
    poly::{check_substitution_power, Polynomial, SerializedPolynomial},
    sampling::sample_from_error_distribution,
};

/// Secret key `s` of the symmetric scheme, stored in NTT form.
#[derive(Debug)]
pub struct SymmetricRlweKey<'a, U: GenericUint> {
    key: Polynomial<U>,
    variance: u64,
    log_t: usize,
    power_of_s: usize,
    t_mod: ModularInt<U>,
    context: &'a Context<U>,
    // Memoized `s(X^power)` for substitution powers requested so far.
    substitutions: Mutex<HashMap<usize, Polynomial<U>>>,
}

#[derive(Clone, Debug)]
pub struct SymmetricRlweCiphertext<'a, U: GenericUint> {
    components: Vec<Polynomial<U>>,
    power_of_s: usize,
    error: f64,
    context: &'a Context<U>,
}

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct SerializedSymmetricRlweCiphertext {
    pub c: Vec<SerializedPolynomial>,
    pub power_of_s: u64,
    pub error: f64,
}

impl<'a, U: GenericUint> Clone for SymmetricRlweKey<'a, U> {
    fn clone(&self) -> Self {
        Self {
            key: self.key.clone(),
            variance: self.variance,
            log_t: self.log_t,
            power_of_s: self.power_of_s,
            t_mod: self.t_mod,
            context: self.context,
            substitutions: Mutex::new(HashMap::new()),
        }
    }
}

impl<'a, U: GenericUint> PartialEq for SymmetricRlweKey<'a, U> {
    fn eq(&self, other: &Self) -> bool {
        self.context.same_as(other.context)
            && self.key == other.key
            && self.variance == other.variance
            && self.log_t == other.log_t
            && self.power_of_s == other.power_of_s
    }
}

impl<'a, U: GenericUint> SymmetricRlweKey<'a, U> {
    /// Samples a key with the variance and plaintext modulus of `context`.
    pub fn sample<P>(context: &'a Context<U>, prng: &mut P) -> Result<Self>
    where
        P: SecurePrng + ?Sized,
    {
        Self::sample_with(context, context.variance(), context.log_t(), prng)
    }

    pub fn sample_with<P>(
        context: &'a Context<U>,
        variance: u64,
        log_t: usize,
        prng: &mut P,
    ) -> Result<Self>
    where
        P: SecurePrng + ?Sized,
    {
        validate_log_t(log_t, context.log_modulus())?;
        let params = context.modulus_params();
        let coeffs = sample_from_error_distribution(context.n(), variance, prng, params)?;
        let key = Polynomial::from_coefficients(coeffs).convert_to_ntt(context.ntt_params(), params)?;
        Self::from_polynomial(context, key, variance, log_t)
    }

    /// Builds a key from NTT-form values, as exported by `export_coefficients`.
    pub fn create_key(context: &'a Context<U>, values: &[U]) -> Result<Self> {
        if values.len() != context.n() {
            return Err(RlweError::invalid_argument(format!(
                "Key has {} coefficients, expected {}.",
                values.len(),
                context.n()
            )));
        }
        let values = values
            .iter()
            .map(|value| context.import(*value))
            .collect::<Result<Vec<_>>>()?;
        Self::from_polynomial(
            context,
            Polynomial::from_ntt_values(values),
            context.variance(),
            context.log_t(),
        )
    }

    pub fn from_polynomial(
        context: &'a Context<U>,
        key: Polynomial<U>,
        variance: u64,
        log_t: usize,
    ) -> Result<Self> {
        validate_log_t(log_t, context.log_modulus())?;
        if !key.is_ntt() || key.len() != context.n() {
            return Err(RlweError::invalid_argument(
                "Key must be an NTT-form polynomial of the context's dimension.",
            ));
        }
        let t = U::ONE.shl_vartime(log_t).wrapping_add(&U::ONE);
        Ok(Self {
            key,
            variance,
            log_t,
            power_of_s: 1,
            t_mod: context.import(t)?,
            context,
            substitutions: Mutex::new(HashMap::new()),
        })
    }

    fn check_compatible(&self, other: &Self) -> Result<()> {
        if !self.context.same_as(other.context) {
            return Err(RlweError::invalid_argument(
                "Keys were created under different contexts.",
            ));
        }
        if self.log_t != other.log_t || self.variance != other.variance {
            return Err(RlweError::invalid_argument(format!(
                "Keys have different parameters: log_t {} and {}, variance {} and {}.",
                self.log_t, other.log_t, self.variance, other.variance
            )));
        }
        if self.power_of_s != other.power_of_s {
            return Err(RlweError::invalid_argument(format!(
                "Keys have different substitution powers: {} and {}.",
                self.power_of_s, other.power_of_s
            )));
        }
        Ok(())
    }

    /// The key `s + s'`. Ciphertexts combined with `add_first_component_in_place`
    /// decrypt under the sum of their keys.
    pub fn add(&self, other: &Self) -> Result<Self> {
        self.check_compatible(other)?;
        let key = self.key.add(&other.key, self.modulus_params())?;
        Ok(self.with_key(key, self.power_of_s))
    }

    pub fn sub(&self, other: &Self) -> Result<Self> {
        self.check_compatible(other)?;
        let key = self.key.sub(&other.key, self.modulus_params())?;
        Ok(self.with_key(key, self.power_of_s))
    }

    /// The key `s(X^power)`, tagged with the composed substitution power.
    pub fn substitute(&self, power: usize) -> Result<Self> {
        let n = self.len();
        check_substitution_power(power, n)?;
        let cached = self
            .substitutions
            .lock()
            .ok()
            .and_then(|cache| cache.get(&power).cloned());
        let key = match cached {
            Some(key) => key,
            None => {
                let key = self
                    .key
                    .substitute(power, self.ntt_params(), self.modulus_params())?;
                if let Ok(mut cache) = self.substitutions.lock() {
                    cache.insert(power, key.clone());
                }
                key
            }
        };
        Ok(self.with_key(key, self.power_of_s % (2 * n) * power % (2 * n)))
    }

    fn with_key(&self, key: Polynomial<U>, power_of_s: usize) -> Self {
        Self {
            key,
            variance: self.variance,
            log_t: self.log_t,
            power_of_s,
            t_mod: self.t_mod,
            context: self.context,
            substitutions: Mutex::new(HashMap::new()),
        }
    }

    /// NTT-form values of `s`, as plain integers below `q`.
    pub fn export_coefficients(&self) -> Vec<U> {
        let params = self.modulus_params();
        self.key.coeffs().iter().map(|c| c.export_int(params)).collect()
    }

    pub fn key(&self) -> &Polynomial<U> {
        &self.key
    }

    pub fn len(&self) -> usize {
        self.key.len()
    }

    pub fn is_empty(&self) -> bool {
        self.key.is_empty()
    }

    pub fn variance(&self) -> u64 {
        self.variance
    }

    pub fn log_t(&self) -> usize {
        self.log_t
    }

    pub fn power_of_s(&self) -> usize {
        self.power_of_s
    }

    /// `t = 2^log_t + 1`.
    pub fn plaintext_modulus(&self) -> U {
        U::ONE.shl_vartime(self.log_t).wrapping_add(&U::ONE)
    }

    pub fn context(&self) -> &'a Context<U> {
        self.context
    }

    pub fn modulus_params(&self) -> &'a ModulusParams<U> {
        self.context.modulus_params()
    }

    pub fn ntt_params(&self) -> &'a NttParameters<U> {
        self.context.ntt_params()
    }

    pub(crate) fn t_mod(&self) -> &ModularInt<U> {
        &self.t_mod
    }
}

impl<'a, U: GenericUint> SymmetricRlweCiphertext<'a, U> {
    pub fn new(
        components: Vec<Polynomial<U>>,
        power_of_s: usize,
        error: f64,
        context: &'a Context<U>,
    ) -> Result<Self> {
        if components.len() < 2 {
            return Err(RlweError::invalid_argument(format!(
                "A ciphertext needs at least two components, got {}.",
                components.len()
            )));
        }
        if components
            .iter()
            .any(|c| !c.is_ntt() || c.len() != context.n())
        {
            return Err(RlweError::invalid_argument(
                "Ciphertext components must be NTT-form polynomials of the context's dimension.",
            ));
        }
        Ok(Self {
            components,
            power_of_s,
            error,
            context,
        })
    }

    pub fn len(&self) -> usize {
        self.components.len()
    }

    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }

    pub fn component(&self, index: usize) -> Result<&Polynomial<U>> {
        self.components.get(index).ok_or_else(|| {
            RlweError::invalid_argument(format!(
                "Index {} is out of range for a ciphertext of length {}.",
                index,
                self.components.len()
            ))
        })
    }

    pub fn components(&self) -> &[Polynomial<U>] {
        &self.components
    }

    pub fn power_of_s(&self) -> usize {
        self.power_of_s
    }

    pub fn error(&self) -> f64 {
        self.error
    }

    pub fn set_error(&mut self, error: f64) {
        self.error = error;
    }

    pub fn context(&self) -> &'a Context<U> {
        self.context
    }

    pub fn error_params(&self) -> &'a ErrorParams {
        self.context.error_params()
    }

    fn modulus_params(&self) -> &'a ModulusParams<U> {
        self.context.modulus_params()
    }

    fn check_compatible(&self, other: &Self) -> Result<()> {
        if !self.context.same_as(other.context) {
            return Err(RlweError::invalid_argument(
                "Ciphertexts were created under different contexts.",
            ));
        }
        if self.power_of_s != other.power_of_s {
            return Err(RlweError::invalid_argument(
                "Ciphertexts must be encrypted with the same key power.",
            ));
        }
        Ok(())
    }

    /// Component-wise sum; a shorter ciphertext is padded with zeros.
    pub fn add_in_place(&mut self, other: &Self) -> Result<()> {
        self.check_compatible(other)?;
        let params = self.modulus_params();
        let n = self.context.n();
        if self.components.len() < other.components.len() {
            self.components.resize(other.components.len(), Polynomial::zero(n));
        }
        for (lhs, rhs) in self.components.iter_mut().zip(other.components.iter()) {
            lhs.add_in_place(rhs, params)?;
        }
        self.error += other.error;
        Ok(())
    }

    pub fn add(&self, other: &Self) -> Result<Self> {
        let mut sum = self.clone();
        sum.add_in_place(other)?;
        Ok(sum)
    }

    pub fn sub_in_place(&mut self, other: &Self) -> Result<()> {
        self.check_compatible(other)?;
        let params = self.modulus_params();
        let n = self.context.n();
        if self.components.len() < other.components.len() {
            self.components.resize(other.components.len(), Polynomial::zero(n));
        }
        for (lhs, rhs) in self.components.iter_mut().zip(other.components.iter()) {
            lhs.sub_in_place(rhs, params)?;
        }
        self.error += other.error;
        Ok(())
    }

    pub fn sub(&self, other: &Self) -> Result<Self> {
        let mut difference = self.clone();
        difference.sub_in_place(other)?;
        Ok(difference)
    }

    /// Adds only the first component of `other`. Used to aggregate ciphertexts
    /// that share the same `c1 = a` under different keys: the result decrypts
    /// under the sum of the keys.
    pub fn add_first_component_in_place(&mut self, other: &Self) -> Result<()> {
        self.check_compatible(other)?;
        let params = self.modulus_params();
        self.components[0].add_in_place(&other.components[0], params)?;
        self.error += other.error;
        Ok(())
    }

    /// Multiplies every component by a public NTT-form plaintext polynomial.
    pub fn absorb_in_place(&mut self, plaintext: &Polynomial<U>) -> Result<()> {
        let params = self.modulus_params();
        for component in self.components.iter_mut() {
            component.mul_in_place(plaintext, params)?;
        }
        self.error *= self.context.error_params().b_plaintext();
        Ok(())
    }

    pub fn absorb(&self, plaintext: &Polynomial<U>) -> Result<Self> {
        let mut product = self.clone();
        product.absorb_in_place(plaintext)?;
        Ok(product)
    }

    pub fn absorb_scalar_in_place(&mut self, scalar: &ModularInt<U>) {
        let params = self.modulus_params();
        for component in self.components.iter_mut() {
            component.mul_scalar_in_place(scalar, params);
        }
        self.error *= scalar.export_int(params).to_f64();
    }

    pub fn absorb_scalar(&self, scalar: &ModularInt<U>) -> Self {
        let mut product = self.clone();
        product.absorb_scalar_in_place(scalar);
        product
    }

    /// Ciphertext product; the result has `len() + other.len() - 1` components
    /// and decrypts under the powers of `s` up to that length.
    pub fn mul(&self, other: &Self) -> Result<Self> {
        self.check_compatible(other)?;
        let params = self.modulus_params();
        let n = self.context.n();
        let mut components = vec![Polynomial::zero(n); self.len() + other.len() - 1];
        for (i, lhs) in self.components.iter().enumerate() {
            for (j, rhs) in other.components.iter().enumerate() {
                components[i + j].fused_mul_add_in_place(lhs, rhs, params)?;
            }
        }
        Ok(Self {
            components,
            power_of_s: self.power_of_s,
            error: self.error * other.error,
            context: self.context,
        })
    }

    pub fn negate(&self) -> Self {
        let params = self.modulus_params();
        Self {
            components: self.components.iter().map(|c| c.negate(params)).collect(),
            power_of_s: self.power_of_s,
            error: self.error,
            context: self.context,
        }
    }

    /// Applies `X -> X^power` to every component. The result decrypts under
    /// `s(X^power)`; it does not grow the noise.
    pub fn substitute(&self, power: usize) -> Result<Self> {
        let n = self.context.n();
        check_substitution_power(power, n)?;
        let components = self
            .components
            .iter()
            .map(|c| c.substitute(power, self.context.ntt_params(), self.modulus_params()))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self {
            components,
            power_of_s: self.power_of_s % (2 * n) * power % (2 * n),
            error: self.error,
            context: self.context,
        })
    }

    pub fn serialize(&self) -> Result<SerializedSymmetricRlweCiphertext> {
        let params = self.modulus_params();
        Ok(SerializedSymmetricRlweCiphertext {
            c: self
                .components
                .iter()
                .map(|c| c.serialize(params))
                .collect::<Result<Vec<_>>>()?,
            power_of_s: self.power_of_s as u64,
            error: self.error,
        })
    }

    pub fn deserialize(
        serialized: &SerializedSymmetricRlweCiphertext,
        context: &'a Context<U>,
    ) -> Result<Self> {
        let components = serialized
            .c
            .iter()
            .map(|c| Polynomial::deserialize(c, context.modulus_params()))
            .collect::<Result<Vec<_>>>()?;
        let power_of_s = usize::try_from(serialized.power_of_s)
            .ok()
            .filter(|power| power % 2 == 1 && *power < 2 * context.n())
            .ok_or_else(|| {
                RlweError::invalid_argument(format!(
                    "Ciphertext PowerOfS, {}, must be an odd integer less than 2*n.",
                    serialized.power_of_s
                ))
            })?;
        Self::new(components, power_of_s, serialized.error, context)
    }
}

fn check_plaintext<U: GenericUint>(key: &SymmetricRlweKey<'_, U>, plaintext: &Polynomial<U>) -> Result<()> {
    if !plaintext.is_ntt() || plaintext.len() != key.len() {
        return Err(RlweError::invalid_argument(
            "Plaintext must be an NTT-form polynomial of the key's dimension.",
        ));
    }
    Ok(())
}

/// `c0 = -(a * s) + t * e + m`
fn encrypt_first_component<U, P>(
    key: &SymmetricRlweKey<'_, U>,
    plaintext: &Polynomial<U>,
    a: &Polynomial<U>,
    prng: &mut P,
) -> Result<Polynomial<U>>
where
    U: GenericUint,
    P: SecurePrng + ?Sized,
{
    check_plaintext(key, plaintext)?;
    let params = key.modulus_params();
    let error = sample_from_error_distribution(key.len(), key.variance(), prng, params)?;
    let mut error = Polynomial::from_coefficients(error).convert_to_ntt(key.ntt_params(), params)?;
    error.mul_scalar_in_place(key.t_mod(), params);

    let mut c0 = a.mul(key.key(), params)?;
    c0.negate_in_place(params);
    c0.add_in_place(&error, params)?;
    c0.add_in_place(plaintext, params)?;
    Ok(c0)
}

pub fn encrypt<'a, U, P>(
    key: &SymmetricRlweKey<'a, U>,
    plaintext: &Polynomial<U>,
    prng: &mut P,
) -> Result<SymmetricRlweCiphertext<'a, U>>
where
    U: GenericUint,
    P: SecurePrng + ?Sized,
{
    let a = Polynomial::sample_uniform(key.len(), prng, key.modulus_params())?;
    encrypt_with_a(key, plaintext, a, prng)
}

/// Encrypts with a caller-supplied uniformly random `a`, which becomes `c1`.
pub fn encrypt_with_a<'a, U, P>(
    key: &SymmetricRlweKey<'a, U>,
    plaintext: &Polynomial<U>,
    a: Polynomial<U>,
    prng: &mut P,
) -> Result<SymmetricRlweCiphertext<'a, U>>
where
    U: GenericUint,
    P: SecurePrng + ?Sized,
{
    if !a.is_ntt() || a.len() != key.len() {
        return Err(RlweError::invalid_argument(
            "The random polynomial a must be an NTT-form polynomial of the key's dimension.",
        ));
    }
    let c0 = encrypt_first_component(key, plaintext, &a, prng)?;
    Ok(SymmetricRlweCiphertext {
        components: vec![c0, a],
        power_of_s: key.power_of_s(),
        error: key.context().error_params().b_encryption(),
        context: key.context(),
    })
}

/// Compressed encryption: only `c0` of each ciphertext is returned, the `a`
/// polynomials are drawn from `prng` and can be regenerated from its seed by
/// `expand_from_prng`. Errors are drawn from `prng_encryption`.
pub fn encrypt_with_prng<U, P, E>(
    key: &SymmetricRlweKey<'_, U>,
    plaintexts: &[Polynomial<U>],
    prng: &mut P,
    prng_encryption: &mut E,
) -> Result<Vec<Polynomial<U>>>
where
    U: GenericUint,
    P: SecurePrng + ?Sized,
    E: SecurePrng + ?Sized,
{
    plaintexts
        .iter()
        .map(|plaintext| {
            let a = Polynomial::sample_uniform(key.len(), prng, key.modulus_params())?;
            encrypt_first_component(key, plaintext, &a, prng_encryption)
        })
        .collect()
}

pub fn expand_from_prng<'a, U, P>(
    c0s: Vec<Polynomial<U>>,
    context: &'a Context<U>,
    prng: &mut P,
) -> Result<Vec<SymmetricRlweCiphertext<'a, U>>>
where
    U: GenericUint,
    P: SecurePrng + ?Sized,
{
    c0s.into_iter()
        .map(|c0| {
            let a = Polynomial::sample_uniform(context.n(), prng, context.modulus_params())?;
            SymmetricRlweCiphertext::new(
                vec![c0, a],
                1,
                context.error_params().b_encryption(),
                context,
            )
        })
        .collect()
}

/// Recovers the plaintext values below `t`. The result is only correct while
/// `ciphertext.error()` stays below `q / (2t)`; this is not checked.
pub fn decrypt<U: GenericUint>(
    key: &SymmetricRlweKey<'_, U>,
    ciphertext: &SymmetricRlweCiphertext<'_, U>,
) -> Result<Vec<U>> {
    if !key.context().same_as(ciphertext.context()) {
        return Err(RlweError::invalid_argument(
            "Key and ciphertext were created under different contexts.",
        ));
    }
    if key.power_of_s() != ciphertext.power_of_s() {
        return Err(RlweError::invalid_argument(format!(
            "Ciphertext PowerOfS: {} doesn't match the key power: {}",
            ciphertext.power_of_s(),
            key.power_of_s()
        )));
    }
    let params = key.modulus_params();
    let mut message = ciphertext.components[0].clone();
    let mut key_power = key.key().clone();
    for (i, component) in ciphertext.components.iter().enumerate().skip(1) {
        if i > 1 {
            key_power.mul_in_place(key.key(), params)?;
        }
        message.fused_mul_add_in_place(component, &key_power, params)?;
    }
    let message = message.inverse_ntt(key.ntt_params(), params)?;
    trace!("decrypted ciphertext of length {}", ciphertext.len());
    Ok(remove_error(message.coeffs(), params, &key.plaintext_modulus()))
}

/// Like `decrypt`, but refuses to decrypt when the tracked noise bound no
/// longer guarantees a correct result.
pub fn decrypt_checked<U: GenericUint>(
    key: &SymmetricRlweKey<'_, U>,
    ciphertext: &SymmetricRlweCiphertext<'_, U>,
) -> Result<Vec<U>> {
    let threshold = key.modulus_params().modulus_f64() / (2.0 * key.plaintext_modulus().to_f64());
    if ciphertext.error() >= threshold {
        return Err(RlweError::NoiseBoundExceeded {
            bound: ciphertext.error(),
            threshold,
        });
    }
    decrypt(key, ciphertext)
}

/// Maps each coefficient to its representative in `(-q/2, q/2]` and reduces
/// that modulo `t`.
pub fn remove_error<U: GenericUint>(
    coeffs: &[ModularInt<U>],
    params: &ModulusParams<U>,
    t: &U,
) -> Vec<U> {
    let half_modulus = params.modulus.shr_vartime(1);
    coeffs
        .iter()
        .map(|coeff| {
            let value = coeff.export_int(params);
            if value > half_modulus {
                let magnitude = params.modulus.wrapping_sub(&value).rem_vartime(t);
                if magnitude == U::ZERO {
                    U::ZERO
                } else {
                    t.wrapping_sub(&magnitude)
                }
            } else {
                value.rem_vartime(t)
            }
        })
        .collect()
}
