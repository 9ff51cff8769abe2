//! Library surface for sysinfo_publisher: sample host CPU and memory, encode
//! the snapshot as JSON and publish it to an AMQP queue.

pub mod agent;
pub mod codec;
pub mod config;
pub mod error;
pub mod publisher;
pub mod sampler;
pub mod types;

pub use error::{AgentError, PublishError, SamplingError, SerializationError};
pub use types::Snapshot;
