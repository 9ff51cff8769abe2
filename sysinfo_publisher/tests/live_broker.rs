use lapin::options::{BasicGetOptions, QueueDeclareOptions, QueueDeleteOptions, QueuePurgeOptions};
use lapin::types::FieldTable;
use lapin::{Connection, ConnectionProperties};
use sysinfo_publisher::agent::run_once;
use sysinfo_publisher::publisher::{AmqpPublisher, Publisher};
use sysinfo_publisher::sampler::Sampler;
use sysinfo_publisher::{codec, PublishError, SamplingError, Snapshot};

// Integration checks: only run when SYSINFO_PUBLISHER_AMQP points at a live broker.
// Example: SYSINFO_PUBLISHER_AMQP=amqp://127.0.0.1:5672 cargo test -p sysinfo_publisher --test live_broker -- --nocapture
const CHECK_QUEUE: &str = "system_info_queue_check";
const DURABLE_QUEUE: &str = "system_info_queue_durable_check";

const EXPECTED_BODY: &str =
    r#"{"total_cpu":12.0,"used_cpu":3.5,"used_memory":4096,"total_memory":16384,"timestamp":1700000000}"#;

struct Fixed;

impl Sampler for Fixed {
    fn sample(&mut self) -> Result<Snapshot, SamplingError> {
        Ok(Snapshot {
            total_cpu: 12.0,
            used_cpu: 3.5,
            used_memory: 4096,
            total_memory: 16384,
            timestamp: 1_700_000_000,
        })
    }
}

// Gate the tests to avoid CI failures when no broker is running.
fn broker_addr(test: &str) -> Option<String> {
    match std::env::var("SYSINFO_PUBLISHER_AMQP") {
        Ok(v) if !v.is_empty() => {
            // every test sets the same value, so concurrent writes agree
            std::env::set_var("AMQP_ADDR", &v);
            Some(v)
        }
        _ => {
            eprintln!(
                "skipping {test}: set SYSINFO_PUBLISHER_AMQP=amqp://host:port to run this integration test"
            );
            None
        }
    }
}

#[tokio::test]
async fn declare_twice_then_publish_exact_body() {
    let Some(addr) = broker_addr("declare_twice_then_publish_exact_body") else {
        return;
    };

    // declaring twice with the same parameters is a no-op
    let default = AmqpPublisher::default();
    default.ensure_queue().await.expect("first declare");
    default.ensure_queue().await.expect("second declare");

    let mut checked = AmqpPublisher::new(CHECK_QUEUE);
    checked.ensure_queue().await.expect("declare check queue");

    let conn = Connection::connect(&addr, ConnectionProperties::default())
        .await
        .expect("connect");
    let channel = conn.create_channel().await.expect("channel");
    channel
        .queue_purge(CHECK_QUEUE, QueuePurgeOptions::default())
        .await
        .expect("purge");

    let sent = run_once(&mut Fixed, &mut checked).await.expect("publish");

    // give the broker a moment to route the message
    let mut got = None;
    for _ in 0..20 {
        got = channel
            .basic_get(CHECK_QUEUE, BasicGetOptions { no_ack: true })
            .await
            .expect("basic_get");
        if got.is_some() {
            break;
        }
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
    }
    let msg = got.expect("message on check queue");
    let body = String::from_utf8(msg.delivery.data.clone()).expect("utf8 body");
    assert_eq!(body, EXPECTED_BODY);
    assert_eq!(codec::from_json(&body).unwrap(), sent);

    let _ = channel.close(200, "OK").await;
    let _ = conn.close(200, "OK").await;
}

#[tokio::test]
async fn declare_mismatch_fails_and_next_publish_still_works() {
    let Some(addr) = broker_addr("declare_mismatch_fails_and_next_publish_still_works") else {
        return;
    };

    // pre-declare as durable so our non-durable declare is refused
    let conn = Connection::connect(&addr, ConnectionProperties::default())
        .await
        .expect("connect");
    let channel = conn.create_channel().await.expect("channel");
    channel
        .queue_declare(
            DURABLE_QUEUE,
            QueueDeclareOptions {
                durable: true,
                ..QueueDeclareOptions::default()
            },
            FieldTable::default(),
        )
        .await
        .expect("durable declare");

    let mut mismatched = AmqpPublisher::new(DURABLE_QUEUE);
    let err = mismatched.publish(EXPECTED_BODY).await.unwrap_err();
    match err {
        PublishError::Declare { queue, .. } => assert_eq!(queue, DURABLE_QUEUE),
        other => panic!("expected declare failure, got {other:?}"),
    }

    // the failed publish released its connection; a fresh one works
    let mut checked = AmqpPublisher::new(CHECK_QUEUE);
    checked
        .publish(EXPECTED_BODY)
        .await
        .expect("publish after failed declare");

    channel
        .queue_delete(DURABLE_QUEUE, QueueDeleteOptions::default())
        .await
        .expect("delete durable queue");
    let _ = channel.close(200, "OK").await;
    let _ = conn.close(200, "OK").await;
}
