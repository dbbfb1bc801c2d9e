use serde::{de::DeserializeOwned, Serialize};

use crate::error::Result;

/// Byte encoding of the `Serialized*` layouts.
pub trait WireFormat: Serialize + DeserializeOwned {
    fn to_bytes(&self) -> Result<Vec<u8>> {
        Ok(bincode::serialize(self)?)
    }

    fn from_bytes(bytes: &[u8]) -> Result<Self> {
        Ok(bincode::deserialize(bytes)?)
    }
}

impl WireFormat for super::poly::SerializedPolynomial {}
impl WireFormat for super::SerializedSymmetricRlweCiphertext {}
impl WireFormat for super::relinearization_key::SerializedRelinearizationKey {}
impl WireFormat for super::galois_key::SerializedGaloisKey {}
