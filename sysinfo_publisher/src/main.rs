//! sysinfo_publisher: every few seconds, sample the host and publish a JSON
//! snapshot to `system_info_queue` on the broker named by `AMQP_ADDR`.

use std::io::IsTerminal;

use sysinfo_publisher::agent::{self, DEFAULT_INTERVAL};
use sysinfo_publisher::publisher::{AmqpPublisher, QUEUE_NAME};
use sysinfo_publisher::sampler::SysinfoSampler;
use tracing::info;
use tracing_subscriber::EnvFilter;

fn main() -> anyhow::Result<()> {
    // stdout carries the "Sent to ..." lines; logs go to stderr
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .with_ansi(std::io::stderr().is_terminal())
        .init();

    info!(queue = QUEUE_NAME, interval = ?DEFAULT_INTERVAL, "starting sysinfo publisher");

    // blocks for the cpu baseline, so it runs before the runtime exists
    let sampler = SysinfoSampler::new()?;
    let publisher = AmqpPublisher::default();

    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    match rt.block_on(agent::run(sampler, publisher, DEFAULT_INTERVAL)) {
        Ok(never) => match never {},
        Err(e) => Err(e.into()),
    }
}
