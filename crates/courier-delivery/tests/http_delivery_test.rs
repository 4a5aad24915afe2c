//! End-to-end delivery over HTTP against a mock destination.
//!
//! Uses the real clock with millisecond delays.

use std::{sync::Arc, time::Duration};

use anyhow::Result;
use courier_core::DeliveryEvent;
use courier_delivery::{RetryScheduler, SchedulerConfig};
use courier_testing::{NotificationBuilder, RecordingEventHandler};
use wiremock::{matchers, Mock, MockServer, ResponseTemplate};

fn fast_config() -> SchedulerConfig {
    SchedulerConfig {
        initial_delay_time: Duration::from_millis(10),
        max_delay_time: Duration::from_millis(100),
        exponential_backoff_factor: 2.0,
        max_url_failure: 1,
        response_timeout: Duration::from_millis(500),
    }
}

#[tokio::test]
async fn transient_server_errors_are_retried_until_delivered() -> Result<()> {
    let server = MockServer::start().await;
    Mock::given(matchers::method("POST"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(2)
        .with_priority(1)
        .mount(&server)
        .await;
    Mock::given(matchers::method("POST"))
        .and(matchers::body_json(serde_json::json!({
            "id": "42",
            "event": "order.shipped",
            "name": "Erin"
        })))
        .respond_with(ResponseTemplate::new(202))
        .expect(1)
        .mount(&server)
        .await;

    let events = Arc::new(RecordingEventHandler::new());
    let mut scheduler =
        RetryScheduler::with_http_client(fast_config())?.with_event_handler(events.clone());

    let notification = NotificationBuilder::new()
        .destination(format!("{}/hooks", server.uri()))
        .sequence_id("42")
        .name("Erin")
        .event_type("order.shipped")
        .build();
    scheduler.process([notification]).await;

    assert_eq!(server.received_requests().await.map_or(0, |requests| requests.len()), 3);
    assert_eq!(events.delivered_count().await, 1);

    let delivered = events.events().await.into_iter().find_map(|event| match event {
        DeliveryEvent::Delivered(e) => Some(e),
        _ => None,
    });
    let delivered = delivered.ok_or_else(|| anyhow::anyhow!("no delivered event"))?;
    assert_eq!(delivered.status_code, 202);
    assert_eq!(delivered.attempt_number, 3);
    Ok(())
}

#[tokio::test]
async fn unreachable_destination_is_abandoned_then_skipped() -> Result<()> {
    let listener = std::net::TcpListener::bind("127.0.0.1:0")?;
    let url = format!("http://127.0.0.1:{}/hook", listener.local_addr()?.port());
    drop(listener);

    let events = Arc::new(RecordingEventHandler::new());
    let mut scheduler =
        RetryScheduler::with_http_client(fast_config())?.with_event_handler(events.clone());

    let batch = (0..3u64)
        .map(|id| NotificationBuilder::new().destination(url.as_str()).sequence_id(id).build());
    scheduler.process(batch).await;

    let stats = scheduler.stats();
    assert_eq!(stats.abandoned, 1);
    assert_eq!(stats.delivered, 0);
    assert_eq!(stats.completed(), 3);
    assert!(stats.skipped >= 1);
    Ok(())
}

#[tokio::test]
async fn slow_destination_times_out_and_is_retried() -> Result<()> {
    let server = MockServer::start().await;
    Mock::given(matchers::method("POST"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(5)))
        .up_to_n_times(1)
        .with_priority(1)
        .mount(&server)
        .await;
    Mock::given(matchers::method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let config = SchedulerConfig { response_timeout: Duration::from_millis(100), ..fast_config() };
    let events = Arc::new(RecordingEventHandler::new());
    let mut scheduler =
        RetryScheduler::with_http_client(config)?.with_event_handler(events.clone());

    scheduler.process([NotificationBuilder::new().destination(server.uri()).build()]).await;

    assert_eq!(scheduler.stats().attempts, 2);
    assert_eq!(events.delivered_count().await, 1);

    let retry = events.events().await.into_iter().find_map(|event| match event {
        DeliveryEvent::RetryScheduled(e) => Some(e),
        _ => None,
    });
    let retry = retry.ok_or_else(|| anyhow::anyhow!("no retry event"))?;
    assert_eq!(retry.error_message, "request timeout after 100ms");
    Ok(())
}
