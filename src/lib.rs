pub mod error;
pub mod prng;
pub mod rlwe;

pub use error::{Result, RlweError};

pub mod examples {
    use std::time::Instant;

    use crypto_bigint::U128;
    use log::{debug, info};
    use rand::Rng;

    use crate::{
        error::{Result, RlweError},
        prng::{SingleThreadChaChaPrng, SingleThreadHkdfPrng},
        rlwe::{
            context::{Context, ContextParameters},
            decrypt_checked, encrypt_with_a,
            generic_uint::GenericUint,
            poly::Polynomial,
            SymmetricRlweCiphertext, SymmetricRlweKey,
        },
    };

    /// Simulates one round of secure aggregation: every client encrypts a
    /// random vector against a shared `a`, the server sums the first
    /// components, and the sum is decrypted under the sum of the client keys.
    /// Returns the decrypted sum after checking it against the plaintext sum.
    pub fn aggregate(parameters: ContextParameters, num_clients: usize) -> Result<Vec<U128>> {
        if num_clients == 0 {
            return Err(RlweError::invalid_argument("At least one client is required."));
        }
        let context = Context::<U128>::create(parameters)?;
        let params = context.modulus_params();
        let t = context.t();
        let public_seed = SingleThreadChaChaPrng::generate_seed()?;

        let now = Instant::now();
        let clients = std::thread::scope(|scope| {
            let handles: Vec<_> = (0..num_clients)
                .map(|_| {
                    let (context, public_seed) = (&context, &public_seed);
                    scope.spawn(move || -> Result<_> {
                        let mut prng =
                            SingleThreadHkdfPrng::create(&SingleThreadHkdfPrng::generate_seed()?)?;
                        let key = SymmetricRlweKey::sample(context, &mut prng)?;
                        let mut rng = rand::thread_rng();
                        let values: Vec<U128> = (0..context.n())
                            .map(|_| U128::from_u64(rng.gen_range(0..t.low_u64())))
                            .collect();
                        let mut public_prng = SingleThreadChaChaPrng::create(public_seed)?;
                        let a = Polynomial::sample_uniform(context.n(), &mut public_prng, params)?;
                        let ciphertext =
                            encrypt_with_a(&key, &context.encode_plaintext(&values)?, a, &mut prng)?;
                        Ok((key, values, ciphertext))
                    })
                })
                .collect();
            handles
                .into_iter()
                .map(|handle| {
                    handle
                        .join()
                        .map_err(|_| RlweError::internal("client thread panicked"))?
                })
                .collect::<Result<Vec<_>>>()
        })?;
        info!(
            "{} clients encrypted {} values each in {} ms",
            num_clients,
            context.n(),
            now.elapsed().as_millis()
        );

        let now = Instant::now();
        let mut clients = clients.into_iter();
        let (mut key_sum, mut expected, mut aggregate): (
            SymmetricRlweKey<U128>,
            Vec<U128>,
            SymmetricRlweCiphertext<U128>,
        ) = clients
            .next()
            .ok_or_else(|| RlweError::internal("no client results"))?;
        for (key, values, ciphertext) in clients {
            aggregate.add_first_component_in_place(&ciphertext)?;
            key_sum = key_sum.add(&key)?;
            for (sum, value) in expected.iter_mut().zip(values) {
                *sum = sum.wrapping_add(&value).rem_vartime(&t);
            }
        }
        debug!("aggregate noise bound: {}", aggregate.error());

        let decrypted = decrypt_checked(&key_sum, &aggregate)?;
        info!("aggregated and decrypted in {} ms", now.elapsed().as_millis());
        if decrypted != expected {
            return Err(RlweError::internal(
                "decrypted aggregate does not match the plaintext sum",
            ));
        }
        Ok(decrypted)
    }

    #[cfg(test)]
    mod tests {
        use crate::rlwe::{context::ContextParameters, params::AGGREGATION_PARAMETERS};

        #[test]
        fn aggregate_small_round() {
            let parameters = ContextParameters {
                log_n: 8,
                ..AGGREGATION_PARAMETERS
            };
            let sum = super::aggregate(parameters, 5).unwrap();
            assert_eq!(sum.len(), 256);
        }

        #[test]
        fn aggregate_needs_clients() {
            assert!(super::aggregate(AGGREGATION_PARAMETERS, 0).is_err());
        }
    }
}
