mod serialized;

pub use self::serialized::SerializedPolynomial;

use crate::{
    error::{Result, RlweError},
    prng::SecurePrng,
};

use super::{
    generic_uint::GenericUint,
    montgomery::{ModularInt, ModulusParams},
    ntt::NttParameters,
    sampling::sample_uniform,
};

/// An element of `Z_q[X]/(X^N + 1)`, either as coefficients or as NTT values.
///
/// The modulus is not stored; callers pass the `ModulusParams` (and, for
/// transforms, the `NttParameters`) of the context the polynomial belongs to.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Polynomial<U: GenericUint> {
    coeffs: Vec<ModularInt<U>>,
    is_ntt: bool,
}

impl<U: GenericUint> Polynomial<U> {
    /// The zero polynomial in NTT form.
    pub fn zero(num_coeffs: usize) -> Self {
        Self {
            coeffs: vec![ModularInt::zero(); num_coeffs],
            is_ntt: true,
        }
    }

    pub fn from_coefficients(coeffs: Vec<ModularInt<U>>) -> Self {
        Self {
            coeffs,
            is_ntt: false,
        }
    }

    pub fn from_ntt_values(values: Vec<ModularInt<U>>) -> Self {
        Self {
            coeffs: values,
            is_ntt: true,
        }
    }

    /// Imports plain integers as coefficients and transforms them.
    pub fn from_plaintext(
        values: &[U],
        ntt: &NttParameters<U>,
        params: &ModulusParams<U>,
    ) -> Result<Self> {
        let coeffs = values
            .iter()
            .map(|value| ModularInt::import_int(*value, params))
            .collect::<Result<Vec<_>>>()?;
        Self::from_coefficients(coeffs).convert_to_ntt(ntt, params)
    }

    pub fn len(&self) -> usize {
        self.coeffs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.coeffs.is_empty()
    }

    pub fn is_ntt(&self) -> bool {
        self.is_ntt
    }

    pub fn coeffs(&self) -> &[ModularInt<U>] {
        &self.coeffs
    }

    pub fn convert_to_ntt(mut self, ntt: &NttParameters<U>, params: &ModulusParams<U>) -> Result<Self> {
        if self.is_ntt {
            return Err(RlweError::invalid_argument(
                "Polynomial is already in NTT form.",
            ));
        }
        self.check_dimension(ntt)?;
        ntt.forward(&mut self.coeffs, params);
        self.is_ntt = true;
        Ok(self)
    }

    pub fn inverse_ntt(mut self, ntt: &NttParameters<U>, params: &ModulusParams<U>) -> Result<Self> {
        if !self.is_ntt {
            return Err(RlweError::invalid_argument(
                "Polynomial is not in NTT form.",
            ));
        }
        self.check_dimension(ntt)?;
        ntt.inverse(&mut self.coeffs, params);
        self.is_ntt = false;
        Ok(self)
    }

    /// Coefficients of this polynomial, transforming back if necessary.
    pub fn coefficients(&self, ntt: &NttParameters<U>, params: &ModulusParams<U>) -> Result<Vec<ModularInt<U>>> {
        if self.is_ntt {
            Ok(self.clone().inverse_ntt(ntt, params)?.coeffs)
        } else {
            Ok(self.coeffs.clone())
        }
    }

    fn check_dimension(&self, ntt: &NttParameters<U>) -> Result<()> {
        if self.coeffs.len() != ntt.number_coeffs {
            return Err(RlweError::invalid_argument(format!(
                "Polynomial has {} coefficients, but the NTT parameters expect {}.",
                self.coeffs.len(),
                ntt.number_coeffs
            )));
        }
        Ok(())
    }

    fn check_compatible(&self, other: &Self) -> Result<()> {
        if self.coeffs.len() != other.coeffs.len() {
            return Err(RlweError::invalid_argument(format!(
                "Polynomials have different lengths: {} and {}.",
                self.coeffs.len(),
                other.coeffs.len()
            )));
        }
        if self.is_ntt != other.is_ntt {
            return Err(RlweError::invalid_argument(
                "Polynomials are in different domains.",
            ));
        }
        Ok(())
    }

    pub fn add_in_place(&mut self, other: &Self, params: &ModulusParams<U>) -> Result<()> {
        self.check_compatible(other)?;
        for (lhs, rhs) in self.coeffs.iter_mut().zip(other.coeffs.iter()) {
            lhs.add_in_place(rhs, params);
        }
        Ok(())
    }

    pub fn add(&self, other: &Self, params: &ModulusParams<U>) -> Result<Self> {
        let mut sum = self.clone();
        sum.add_in_place(other, params)?;
        Ok(sum)
    }

    pub fn sub_in_place(&mut self, other: &Self, params: &ModulusParams<U>) -> Result<()> {
        self.check_compatible(other)?;
        for (lhs, rhs) in self.coeffs.iter_mut().zip(other.coeffs.iter()) {
            lhs.sub_in_place(rhs, params);
        }
        Ok(())
    }

    pub fn sub(&self, other: &Self, params: &ModulusParams<U>) -> Result<Self> {
        let mut difference = self.clone();
        difference.sub_in_place(other, params)?;
        Ok(difference)
    }

    pub fn negate_in_place(&mut self, params: &ModulusParams<U>) {
        for coeff in self.coeffs.iter_mut() {
            *coeff = coeff.negate(params);
        }
    }

    pub fn negate(&self, params: &ModulusParams<U>) -> Self {
        let mut negated = self.clone();
        negated.negate_in_place(params);
        negated
    }

    /// Ring multiplication; both operands must be in NTT form.
    pub fn mul_in_place(&mut self, other: &Self, params: &ModulusParams<U>) -> Result<()> {
        self.check_compatible(other)?;
        if !self.is_ntt {
            return Err(RlweError::invalid_argument(
                "Polynomials must be in NTT form to be multiplied.",
            ));
        }
        for (lhs, rhs) in self.coeffs.iter_mut().zip(other.coeffs.iter()) {
            lhs.mul_in_place(rhs, params);
        }
        Ok(())
    }

    pub fn mul(&self, other: &Self, params: &ModulusParams<U>) -> Result<Self> {
        let mut product = self.clone();
        product.mul_in_place(other, params)?;
        Ok(product)
    }

    /// `self += a * b`
    pub fn fused_mul_add_in_place(&mut self, a: &Self, b: &Self, params: &ModulusParams<U>) -> Result<()> {
        self.check_compatible(a)?;
        self.check_compatible(b)?;
        if !self.is_ntt {
            return Err(RlweError::invalid_argument(
                "Polynomials must be in NTT form to be multiplied.",
            ));
        }
        for ((dst, lhs), rhs) in self.coeffs.iter_mut().zip(a.coeffs.iter()).zip(b.coeffs.iter()) {
            dst.fused_mul_add_in_place(lhs, rhs, params);
        }
        Ok(())
    }

    pub fn mul_scalar_in_place(&mut self, scalar: &ModularInt<U>, params: &ModulusParams<U>) {
        for coeff in self.coeffs.iter_mut() {
            coeff.mul_in_place(scalar, params);
        }
    }

    pub fn mul_scalar(&self, scalar: &ModularInt<U>, params: &ModulusParams<U>) -> Self {
        let mut product = self.clone();
        product.mul_scalar_in_place(scalar, params);
        product
    }

    /// Applies the automorphism `X -> X^power`. `power` must be odd and smaller
    /// than `2N`. The result is in the same domain as `self`.
    pub fn substitute(
        &self,
        power: usize,
        ntt: &NttParameters<U>,
        params: &ModulusParams<U>,
    ) -> Result<Self> {
        let n = self.coeffs.len();
        check_substitution_power(power, n)?;
        let coeffs = self.coefficients(ntt, params)?;
        let mut substituted = vec![ModularInt::zero(); n];
        for (i, coeff) in coeffs.iter().enumerate() {
            let index = i * power % (2 * n);
            if index < n {
                substituted[index] = *coeff;
            } else {
                substituted[index - n] = coeff.negate(params);
            }
        }
        let result = Self::from_coefficients(substituted);
        if self.is_ntt {
            result.convert_to_ntt(ntt, params)
        } else {
            Ok(result)
        }
    }

    /// A uniformly random polynomial, drawn directly in NTT form.
    pub fn sample_uniform<P>(num_coeffs: usize, prng: &mut P, params: &ModulusParams<U>) -> Result<Self>
    where
        P: SecurePrng + ?Sized,
    {
        let values = (0..num_coeffs)
            .map(|_| sample_uniform(prng, params))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self::from_ntt_values(values))
    }
}

pub fn check_substitution_power(power: usize, num_coeffs: usize) -> Result<()> {
    if power % 2 == 0 || power >= 2 * num_coeffs {
        return Err(RlweError::invalid_argument(format!(
            "Substitution power must be a non-negative odd integer less than 2*n, got {}.",
            power
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use crypto_bigint::U64;
    use rand::Rng;

    use super::Polynomial;
    use crate::{
        prng::SingleThreadHkdfPrng,
        rlwe::{
            generic_uint::GenericUint,
            montgomery::{ModularInt, ModulusParams},
            ntt::NttParameters,
            params::MODULUS_59,
        },
    };

    const LOG_N: usize = 6;

    fn setup() -> (ModulusParams<U64>, NttParameters<U64>) {
        let params = ModulusParams::from_u128(MODULUS_59).unwrap();
        let ntt = NttParameters::initialize(LOG_N, &params).unwrap();
        (params, ntt)
    }

    fn random_coefficients(params: &ModulusParams<U64>) -> Polynomial<U64> {
        let mut rng = rand::thread_rng();
        Polynomial::from_coefficients(
            (0..1 << LOG_N)
                .map(|_| ModularInt::import_u64(rng.gen_range(0..1 << 40), params).unwrap())
                .collect(),
        )
    }

    #[test]
    fn ntt_roundtrip() {
        let (params, ntt) = setup();
        let poly = random_coefficients(&params);
        let transformed = poly.clone().convert_to_ntt(&ntt, &params).unwrap();
        assert!(transformed.is_ntt());
        assert!(transformed.clone().convert_to_ntt(&ntt, &params).is_err());
        assert_eq!(transformed.inverse_ntt(&ntt, &params).unwrap(), poly);
        assert!(poly.clone().inverse_ntt(&ntt, &params).is_err());
    }

    #[test]
    fn mismatched_operands_are_rejected() {
        let (params, ntt) = setup();
        let coeffs = random_coefficients(&params);
        let transformed = coeffs.clone().convert_to_ntt(&ntt, &params).unwrap();
        assert!(coeffs.add(&transformed, &params).is_err());
        assert!(coeffs.mul(&coeffs, &params).is_err());
        assert!(transformed.add(&Polynomial::zero(8), &params).is_err());
        assert!(Polynomial::zero(8).convert_to_ntt(&ntt, &params).is_err());
    }

    #[test]
    fn arithmetic_is_linear_in_both_domains() {
        let (params, ntt) = setup();
        let a = random_coefficients(&params);
        let b = random_coefficients(&params);
        let sum = a.add(&b, &params).unwrap();
        let a_ntt = a.clone().convert_to_ntt(&ntt, &params).unwrap();
        let b_ntt = b.clone().convert_to_ntt(&ntt, &params).unwrap();
        let sum_ntt = a_ntt.add(&b_ntt, &params).unwrap();
        assert_eq!(sum_ntt.inverse_ntt(&ntt, &params).unwrap(), sum);

        let difference = sum.sub(&b, &params).unwrap();
        assert_eq!(difference, a);
        assert_eq!(a.add(&a.negate(&params), &params).unwrap(), Polynomial::from_coefficients(vec![ModularInt::zero(); 1 << LOG_N]));
    }

    #[test]
    fn fused_mul_add_matches_separate_operations() {
        let (params, ntt) = setup();
        let a = random_coefficients(&params).convert_to_ntt(&ntt, &params).unwrap();
        let b = random_coefficients(&params).convert_to_ntt(&ntt, &params).unwrap();
        let c = random_coefficients(&params).convert_to_ntt(&ntt, &params).unwrap();
        let mut fused = c.clone();
        fused.fused_mul_add_in_place(&a, &b, &params).unwrap();
        assert_eq!(fused, c.add(&a.mul(&b, &params).unwrap(), &params).unwrap());
    }

    #[test]
    fn multiplication_by_x_is_negacyclic_shift() {
        let (params, ntt) = setup();
        let n = 1 << LOG_N;
        let a = random_coefficients(&params);
        let mut x = vec![ModularInt::zero(); n];
        x[1] = ModularInt::one(&params);
        let x = Polynomial::from_coefficients(x).convert_to_ntt(&ntt, &params).unwrap();
        let product = a
            .clone()
            .convert_to_ntt(&ntt, &params)
            .unwrap()
            .mul(&x, &params)
            .unwrap()
            .inverse_ntt(&ntt, &params)
            .unwrap();
        assert_eq!(product.coeffs()[0], a.coeffs()[n - 1].negate(&params));
        for i in 1..n {
            assert_eq!(product.coeffs()[i], a.coeffs()[i - 1]);
        }
    }

    #[test]
    fn substitution() {
        let (params, ntt) = setup();
        let n = 1 << LOG_N;
        // X -> X^3 sends X^(n/2) to X^(3n/2) = -X^(n/2) and X^(n-1) to X^(3n-3) = X^(n-3).
        let mut coeffs = vec![ModularInt::zero(); n];
        coeffs[n / 2] = ModularInt::one(&params);
        coeffs[n - 1] = ModularInt::one(&params);
        let poly = Polynomial::from_coefficients(coeffs);
        let substituted = poly.substitute(3, &ntt, &params).unwrap();
        assert_eq!(substituted.coeffs()[n / 2], ModularInt::one(&params).negate(&params));
        assert_eq!(substituted.coeffs()[n - 3], ModularInt::one(&params));

        // Substitution commutes with the transform and composes multiplicatively.
        let a = random_coefficients(&params);
        let a_ntt = a.clone().convert_to_ntt(&ntt, &params).unwrap();
        let twice = a_ntt
            .substitute(5, &ntt, &params)
            .unwrap()
            .substitute(5, &ntt, &params)
            .unwrap();
        assert!(twice.is_ntt());
        assert_eq!(twice.inverse_ntt(&ntt, &params).unwrap(), a.substitute(25, &ntt, &params).unwrap());

        assert!(a.substitute(2, &ntt, &params).is_err());
        assert!(a.substitute(2 * n + 1, &ntt, &params).is_err());
        assert_eq!(a.substitute(1, &ntt, &params).unwrap(), a);
    }

    #[test]
    fn uniform_sampling_is_reduced_and_ntt() {
        let (params, _) = setup();
        let mut prng = SingleThreadHkdfPrng::create(&[1u8; 32]).unwrap();
        let poly = Polynomial::sample_uniform(1 << LOG_N, &mut prng, &params).unwrap();
        assert!(poly.is_ntt());
        for coeff in poly.coeffs() {
            assert!(coeff.export_int(&params) < params.modulus);
            assert!(coeff.export_int(&params).low_u64() < MODULUS_59 as u64);
        }
    }
}
