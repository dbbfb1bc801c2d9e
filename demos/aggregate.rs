use clap::Parser;
use log::{error, info};
use rlwe_sa::{
    examples,
    rlwe::{context::ContextParameters, params::AGGREGATION_PARAMETERS},
};

#[derive(Clone, Debug, Parser)]
struct Args {
    /// JSON file with `modulus`, `log_n`, `log_t` and `variance`; overrides the other flags.
    #[arg(long)]
    config: Option<String>,

    #[arg(long, default_value_t = AGGREGATION_PARAMETERS.log_n)]
    log_n: usize,

    #[arg(long, default_value_t = AGGREGATION_PARAMETERS.log_t)]
    log_t: usize,

    #[arg(long, default_value_t = AGGREGATION_PARAMETERS.variance)]
    variance: u64,

    #[arg(long, default_value_t = 10)]
    clients: usize,
}

fn main() {
    env_logger::init();
    let args = Args::parse();
    let parameters = match &args.config {
        Some(path) => match ContextParameters::from_json_file(path) {
            Ok(parameters) => parameters,
            Err(e) => {
                error!("{}", e);
                std::process::exit(1);
            }
        },
        None => ContextParameters {
            log_n: args.log_n,
            log_t: args.log_t,
            variance: args.variance,
            ..AGGREGATION_PARAMETERS
        },
    };
    info!("running aggregation with {:?}", parameters);
    match examples::aggregate(parameters, args.clients) {
        Ok(sum) => println!(
            "aggregated {} clients: {} values, first values {:?}",
            args.clients,
            sum.len(),
            &sum[..sum.len().min(4)]
        ),
        Err(e) => {
            error!("aggregation failed: {}", e);
            std::process::exit(1);
        }
    }
}
