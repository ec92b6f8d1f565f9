//! Ordering and fan-out guarantees for inbound events.

#[path = "../support/fake_transport.rs"]
mod fake_transport;

use asclepion_core::live::TransportMessage;
use asclepion_core::{LiveClient, LiveEvent, LiveEventKind, SessionConfig};
use fake_transport::FakeConnector;
use std::sync::{Arc, Mutex};
use std::time::Duration;

async fn wait_until(mut check: impl FnMut() -> bool) {
    tokio::time::timeout(Duration::from_secs(2), async {
        while !check() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("condition not reached in time");
}

fn push_text(transport: &fake_transport::FakeTransport, payload: &str) {
    transport
        .inbound
        .unbounded_send(Ok(TransportMessage::Text(payload.to_string())))
        .expect("push frame");
}

#[tokio::test]
async fn events_are_delivered_in_wire_arrival_order() {
    let (connector, transport) = FakeConnector::single();
    let client = LiveClient::new(connector, "wss://example.test/live");

    let order: Arc<Mutex<Vec<&'static str>>> = Arc::new(Mutex::new(Vec::new()));
    for kind in [
        LiveEventKind::Content,
        LiveEventKind::ToolCall,
        LiveEventKind::TurnComplete,
        LiveEventKind::Interrupted,
    ] {
        let log = order.clone();
        let _ = client.subscribe(kind, move |event| {
            let tag = match event {
                LiveEvent::Content(_) => "content",
                LiveEvent::ToolCall(_) => "tool_call",
                LiveEvent::TurnComplete => "turn_complete",
                LiveEvent::Interrupted => "interrupted",
                _ => "other",
            };
            log.lock().expect("order lock").push(tag);
        });
    }

    client
        .connect(&SessionConfig::new("models/gemini-2.0-flash-exp"))
        .await
        .expect("connect");

    push_text(
        &transport,
        r#"{"serverContent":{"modelTurn":{"parts":[{"text":"first"}]}}}"#,
    );
    push_text(
        &transport,
        r#"{"toolCall":{"functionCalls":[{"id":"1","name":"render_chart","args":{}}]}}"#,
    );
    push_text(&transport, r#"{"serverContent":{"turnComplete":true}}"#);
    push_text(&transport, r#"{"serverContent":{"interrupted":true}}"#);

    wait_until(|| order.lock().expect("order lock").len() == 4).await;
    assert_eq!(
        *order.lock().expect("order lock"),
        vec!["content", "tool_call", "turn_complete", "interrupted"]
    );
}

#[tokio::test]
async fn binary_frames_parse_like_text_frames() {
    let (connector, transport) = FakeConnector::single();
    let client = LiveClient::new(connector, "wss://example.test/live");

    let calls: Arc<Mutex<Vec<LiveEvent>>> = Arc::new(Mutex::new(Vec::new()));
    let sink = calls.clone();
    let _ = client.subscribe(LiveEventKind::ToolCall, move |event| {
        sink.lock().expect("lock").push(event.clone());
    });

    client
        .connect(&SessionConfig::new("models/gemini-2.0-flash-exp"))
        .await
        .expect("connect");

    let payload =
        br#"{"toolCall":{"functionCalls":[{"id":"9","name":"search_patient","args":{}}]}}"#;
    transport
        .inbound
        .unbounded_send(Ok(TransportMessage::Binary(payload.to_vec())))
        .expect("push binary frame");

    wait_until(|| !calls.lock().expect("lock").is_empty()).await;
    match &calls.lock().expect("lock")[0] {
        LiveEvent::ToolCall(batch) => {
            assert_eq!(batch.function_calls[0].id, "9");
            assert_eq!(batch.function_calls[0].name, "search_patient");
        }
        other => panic!("unexpected event {other:?}"),
    }
}

#[tokio::test]
async fn content_precedes_turn_complete_within_one_message() {
    let (connector, transport) = FakeConnector::single();
    let client = LiveClient::new(connector, "wss://example.test/live");

    let order: Arc<Mutex<Vec<&'static str>>> = Arc::new(Mutex::new(Vec::new()));
    for kind in [LiveEventKind::Content, LiveEventKind::TurnComplete] {
        let log = order.clone();
        let _ = client.subscribe(kind, move |event| {
            let tag = match event {
                LiveEvent::Content(_) => "content",
                LiveEvent::TurnComplete => "turn_complete",
                _ => "other",
            };
            log.lock().expect("order lock").push(tag);
        });
    }

    client
        .connect(&SessionConfig::new("models/gemini-2.0-flash-exp"))
        .await
        .expect("connect");
    push_text(
        &transport,
        r#"{"serverContent":{"modelTurn":{"parts":[{"text":"done"}]},"turnComplete":true}}"#,
    );

    wait_until(|| order.lock().expect("order lock").len() == 2).await;
    assert_eq!(
        *order.lock().expect("order lock"),
        vec!["content", "turn_complete"]
    );
}

#[tokio::test]
async fn late_subscribers_do_not_see_earlier_events() {
    let (connector, transport) = FakeConnector::single();
    let client = LiveClient::new(connector, "wss://example.test/live");

    let early: Arc<Mutex<Vec<LiveEvent>>> = Arc::new(Mutex::new(Vec::new()));
    let sink = early.clone();
    let _ = client.subscribe(LiveEventKind::TurnComplete, move |event| {
        sink.lock().expect("lock").push(event.clone());
    });

    client
        .connect(&SessionConfig::new("models/gemini-2.0-flash-exp"))
        .await
        .expect("connect");
    push_text(&transport, r#"{"serverContent":{"turnComplete":true}}"#);
    wait_until(|| !early.lock().expect("lock").is_empty()).await;

    // Registered after the event above was already delivered.
    let late: Arc<Mutex<Vec<LiveEvent>>> = Arc::new(Mutex::new(Vec::new()));
    let sink = late.clone();
    let _ = client.subscribe(LiveEventKind::TurnComplete, move |event| {
        sink.lock().expect("lock").push(event.clone());
    });

    push_text(&transport, r#"{"serverContent":{"turnComplete":true}}"#);
    wait_until(|| early.lock().expect("lock").len() == 2).await;

    assert_eq!(late.lock().expect("lock").len(), 1);
}

#[tokio::test]
async fn unsubscribed_listener_is_skipped() {
    let (connector, transport) = FakeConnector::single();
    let client = LiveClient::new(connector, "wss://example.test/live");

    let seen: Arc<Mutex<Vec<LiveEvent>>> = Arc::new(Mutex::new(Vec::new()));
    let sink = seen.clone();
    let handle = client.subscribe(LiveEventKind::TurnComplete, move |event| {
        sink.lock().expect("lock").push(event.clone());
    });

    let kept: Arc<Mutex<Vec<LiveEvent>>> = Arc::new(Mutex::new(Vec::new()));
    let sink = kept.clone();
    let _ = client.subscribe(LiveEventKind::TurnComplete, move |event| {
        sink.lock().expect("lock").push(event.clone());
    });

    client
        .connect(&SessionConfig::new("models/gemini-2.0-flash-exp"))
        .await
        .expect("connect");

    handle.unsubscribe();
    push_text(&transport, r#"{"serverContent":{"turnComplete":true}}"#);
    wait_until(|| !kept.lock().expect("lock").is_empty()).await;

    assert!(seen.lock().expect("lock").is_empty());
}
