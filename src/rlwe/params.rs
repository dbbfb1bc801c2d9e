use super::context::ContextParameters;

// NTT-friendly primes: `q - 1` is divisible by `2^k` for the listed `k`, so
// they support ring dimensions up to `2^(k - 1)`.

/// 26-bit prime, `k = 9`.
pub const MODULUS_25: u128 = 33556993;
/// 30-bit prime, `k = 15`.
pub const MODULUS_29: u128 = 536903681;
/// 59-bit prime, `k = 12`.
pub const MODULUS_59: u128 = 332366567264636929;
/// 80-bit prime, `k = 12`.
pub const MODULUS_80: u128 = 646119422561999443726337;

/// Ceiling on the error variance accepted by the centered-binomial sampler.
pub const MAX_VARIANCE: u64 = 256;

/// Small parameters for unit tests.
pub const TOY_PARAMETERS: ContextParameters = ContextParameters {
    modulus: MODULUS_59,
    log_n: 10,
    log_t: 11,
    variance: 8,
};

/// Secure-aggregation parameters (80-bit modulus, `N = 2048`, `t = 2^11 + 1`).
pub const AGGREGATION_PARAMETERS: ContextParameters = ContextParameters {
    modulus: MODULUS_80,
    log_n: 11,
    log_t: 11,
    variance: 8,
};
