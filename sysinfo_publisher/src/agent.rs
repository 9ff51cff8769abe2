//! Publish loop: sample, encode, publish, sleep, repeat. The first error
//! ends the loop; nothing is retried.

use std::convert::Infallible;

use tokio::time::{sleep, Duration};
use tracing::{debug, error};

use crate::codec;
use crate::error::AgentError;
use crate::publisher::Publisher;
use crate::sampler::Sampler;
use crate::types::Snapshot;

pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(3);

/// One pass through the pipeline. Returns the snapshot that was sent.
pub async fn run_once<S, P>(sampler: &mut S, publisher: &mut P) -> Result<Snapshot, AgentError>
where
    S: Sampler,
    P: Publisher,
{
    let snapshot = sampler.sample()?;
    let body = codec::to_json(&snapshot)?;
    publisher.publish(&body).await?;
    Ok(snapshot)
}

/// Run forever. Only returns when a pass fails.
pub async fn run<S, P>(
    mut sampler: S,
    mut publisher: P,
    interval: Duration,
) -> Result<Infallible, AgentError>
where
    S: Sampler,
    P: Publisher,
{
    loop {
        match run_once(&mut sampler, &mut publisher).await {
            Ok(snapshot) => debug!(timestamp = snapshot.timestamp, "snapshot published"),
            Err(e) => {
                error!("publish loop stopped: {e}");
                return Err(e);
            }
        }
        sleep(interval).await;
    }
}
