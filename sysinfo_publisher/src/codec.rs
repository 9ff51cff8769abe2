//! JSON encoding of snapshots. Stateless; the output for a given snapshot is
//! always the same bytes.

use crate::error::SerializationError;
use crate::types::Snapshot;

pub fn to_json(snapshot: &Snapshot) -> Result<String, SerializationError> {
    Ok(serde_json::to_string(snapshot)?)
}

pub fn from_json(body: &str) -> Result<Snapshot, SerializationError> {
    Ok(serde_json::from_str(body)?)
}
