//! Error taxonomy for the publish loop. Nothing here is retried.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SamplingError {
    #[error("host introspection is not supported on this platform")]
    Unsupported,
    #[error("sysinfo refresh panicked: {0}")]
    Refresh(String),
    #[error("no processors reported by the host")]
    NoProcessors,
    #[error("total memory reported as zero")]
    NoMemory,
    #[error("system clock is before the unix epoch")]
    Clock,
}

#[derive(Debug, Error)]
#[error("snapshot JSON error: {0}")]
pub struct SerializationError(#[from] pub serde_json::Error);

#[derive(Debug, Error)]
pub enum PublishError {
    #[error("AMQP_ADDR is not set")]
    MissingAddress,
    #[error("failed to connect to broker at {addr}: {source}")]
    Connect {
        addr: String,
        #[source]
        source: lapin::Error,
    },
    #[error("failed to open channel: {0}")]
    Channel(#[source] lapin::Error),
    #[error("failed to declare queue {queue}: {source}")]
    Declare {
        queue: String,
        #[source]
        source: lapin::Error,
    },
    #[error("failed to publish to {queue}: {source}")]
    Publish {
        queue: String,
        #[source]
        source: lapin::Error,
    },
}

#[derive(Debug, Error)]
pub enum AgentError {
    #[error(transparent)]
    Sampling(#[from] SamplingError),
    #[error(transparent)]
    Serialization(#[from] SerializationError),
    #[error(transparent)]
    Publish(#[from] PublishError),
}
