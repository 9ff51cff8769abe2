//! Broker transport. Each publish opens its own connection and channel and
//! closes both before returning, whether the publish worked or not.

use std::future::Future;

use lapin::options::{BasicPublishOptions, QueueDeclareOptions};
use lapin::types::FieldTable;
use lapin::{BasicProperties, Channel, Connection, ConnectionProperties};
use tracing::{debug, warn};

use crate::config;
use crate::error::PublishError;

pub const QUEUE_NAME: &str = "system_info_queue";

// AMQP reply code for a normal close
const REPLY_SUCCESS: u16 = 200;

/// Delivers one serialized snapshot.
pub trait Publisher {
    fn publish(&mut self, body: &str) -> impl Future<Output = Result<(), PublishError>> + Send;
}

#[derive(Debug, Clone)]
pub struct AmqpPublisher {
    queue: String,
}

impl Default for AmqpPublisher {
    fn default() -> Self {
        Self::new(QUEUE_NAME)
    }
}

impl AmqpPublisher {
    pub fn new(queue: impl Into<String>) -> Self {
        Self {
            queue: queue.into(),
        }
    }

    pub fn queue(&self) -> &str {
        &self.queue
    }

    /// Declare the queue on its own connection. Safe to repeat.
    pub async fn ensure_queue(&self) -> Result<(), PublishError> {
        self.with_channel(|channel| async move { self.declare(&channel).await })
            .await
    }

    async fn declare(&self, channel: &Channel) -> Result<(), PublishError> {
        // non-durable, non-exclusive, no auto-delete
        let options = QueueDeclareOptions::default();
        channel
            .queue_declare(&self.queue, options, FieldTable::default())
            .await
            .map_err(|source| PublishError::Declare {
                queue: self.queue.clone(),
                source,
            })?;
        debug!(queue = %self.queue, "queue declared");
        Ok(())
    }

    async fn send(&self, channel: &Channel, body: &str) -> Result<(), PublishError> {
        let publish_err = |source: lapin::Error| PublishError::Publish {
            queue: self.queue.clone(),
            source,
        };
        // default exchange, routed by queue name, no properties
        let confirm = channel
            .basic_publish(
                "",
                &self.queue,
                BasicPublishOptions::default(),
                body.as_bytes(),
                BasicProperties::default(),
            )
            .await
            .map_err(publish_err)?;
        // no confirm mode: resolves as soon as the frame is handed off
        confirm.await.map_err(publish_err)?;
        Ok(())
    }

    /// Open a connection and a channel, run `f`, then close the channel and
    /// the connection on every path. Close failures are logged, never
    /// returned in place of the result of `f`.
    async fn with_channel<T, F, Fut>(&self, f: F) -> Result<T, PublishError>
    where
        F: FnOnce(Channel) -> Fut,
        Fut: Future<Output = Result<T, PublishError>>,
    {
        let uri = config::broker_uri()?;
        self.with_channel_at(&uri, f).await
    }

    async fn with_channel_at<T, F, Fut>(&self, uri: &str, f: F) -> Result<T, PublishError>
    where
        F: FnOnce(Channel) -> Fut,
        Fut: Future<Output = Result<T, PublishError>>,
    {
        debug!(addr = %config::redacted(uri), "connecting to broker");
        let conn = Connection::connect(uri, connection_properties())
            .await
            .map_err(|source| PublishError::Connect {
                addr: config::redacted(uri),
                source,
            })?;

        closing(&conn, async {
            let channel = conn.create_channel().await.map_err(PublishError::Channel)?;
            closing(&channel, f(channel.clone())).await
        })
        .await
    }
}

// Run lapin's background work on the caller's tokio runtime instead of its
// own executor threads.
fn connection_properties() -> ConnectionProperties {
    ConnectionProperties::default()
        .with_executor(tokio_executor_trait::Tokio::current())
        .with_reactor(tokio_reactor_trait::Tokio)
}

/// A broker handle that has to be closed when its scope ends.
trait Closable {
    const KIND: &'static str;
    type Error: std::fmt::Display;

    fn close_scope(&self) -> impl Future<Output = Result<(), Self::Error>> + Send;
}

impl Closable for Connection {
    const KIND: &'static str = "connection";
    type Error = lapin::Error;

    fn close_scope(&self) -> impl Future<Output = Result<(), Self::Error>> + Send {
        self.close(REPLY_SUCCESS, "OK")
    }
}

impl Closable for Channel {
    const KIND: &'static str = "channel";
    type Error = lapin::Error;

    fn close_scope(&self) -> impl Future<Output = Result<(), Self::Error>> + Send {
        self.close(REPLY_SUCCESS, "OK")
    }
}

/// Await `work`, then close `handle` whatever the outcome. A failed close is
/// logged and never replaces the result of `work`.
async fn closing<H, T, W>(handle: &H, work: W) -> Result<T, PublishError>
where
    H: Closable,
    W: Future<Output = Result<T, PublishError>>,
{
    let out = work.await;
    if let Err(e) = handle.close_scope().await {
        warn!("{} close failed: {e}", H::KIND);
    }
    out
}

impl Publisher for AmqpPublisher {
    async fn publish(&mut self, body: &str) -> Result<(), PublishError> {
        let this = &*self;
        this.with_channel(|channel| async move {
            this.declare(&channel).await?;
            this.send(&channel, body).await
        })
        .await?;
        println!("Sent to {}: {}", self.queue, body);
        Ok(())
    }
}
