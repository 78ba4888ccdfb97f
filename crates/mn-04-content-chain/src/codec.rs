//! Row serialization helpers. Decode failures surface as store corruption,
//! never as panics: the row bytes came from disk, not from our invariants.

use mn_01_staged_store::StoreError;
use serde::de::DeserializeOwned;
use serde::Serialize;

pub(crate) fn encode<T: Serialize>(what: &str, value: &T) -> Result<Vec<u8>, StoreError> {
    bincode::serialize(value)
        .map_err(|e| StoreError::corruption(format!("encoding {}: {}", what, e)))
}

pub(crate) fn decode<T: DeserializeOwned>(what: &str, bytes: &[u8]) -> Result<T, StoreError> {
    bincode::deserialize(bytes)
        .map_err(|e| StoreError::corruption(format!("decoding {}: {}", what, e)))
}
