//! Environment lookup for the broker address.
//!
//! `AMQP_ADDR` may hold a full AMQP URI or just a host (optionally with a
//! port). It is read on every publish, not cached.

use crate::error::PublishError;

pub const AMQP_ADDR_VAR: &str = "AMQP_ADDR";

/// Read `AMQP_ADDR` and turn it into a connectable URI.
pub fn broker_uri() -> Result<String, PublishError> {
    let raw = std::env::var(AMQP_ADDR_VAR).ok();
    resolve_uri(raw.as_deref())
}

pub fn resolve_uri(raw: Option<&str>) -> Result<String, PublishError> {
    let addr = raw.map(str::trim).unwrap_or_default();
    if addr.is_empty() {
        return Err(PublishError::MissingAddress);
    }
    if addr.contains("://") {
        Ok(addr.to_string())
    } else {
        Ok(format!("amqp://{addr}"))
    }
}

/// Hide credentials in a URI before it goes into logs or errors.
pub fn redacted(uri: &str) -> String {
    let (scheme, rest) = match uri.split_once("://") {
        Some(parts) => parts,
        None => return uri.to_string(),
    };
    let authority_end = rest.find('/').unwrap_or(rest.len());
    match rest[..authority_end].rfind('@') {
        Some(at) => format!("{scheme}://***@{}", &rest[at + 1..]),
        None => uri.to_string(),
    }
}
