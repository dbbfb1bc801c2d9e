#[derive(Clone, Debug, PartialEq, derive_more::Display, derive_more::Error)]
pub enum RlweError {
    #[display(fmt = "invalid argument: {}", message)]
    InvalidArgument { message: String },
    #[display(fmt = "internal cryptographic error: {}", message)]
    InternalCryptographic { message: String },
    #[display(
        fmt = "noise bound {} is not below the decryption threshold {}",
        bound,
        threshold
    )]
    NoiseBoundExceeded { bound: f64, threshold: f64 },
}

impl RlweError {
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::InternalCryptographic {
            message: message.into(),
        }
    }
}

impl From<bincode::Error> for RlweError {
    fn from(err: bincode::Error) -> Self {
        Self::invalid_argument(format!("malformed serialization: {}", err))
    }
}

pub type Result<T> = std::result::Result<T, RlweError>;
