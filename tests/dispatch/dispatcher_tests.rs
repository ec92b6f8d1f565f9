//! End-to-end dispatcher behavior against stubbed credential and records
//! backends.

use asclepion_core::infrastructure::{
    BearerToken, CallOutcome, ClinicalApi, EhrError, NewPatient, PatientQuery, TokenError,
    TokenProvider,
};
use asclepion_core::{
    FunctionCall, FunctionResponse, ResponseChannel, ToolDispatcher, ToolRegistry,
};
use asclepion_core::live::LiveError;
use async_trait::async_trait;
use serde_json::{Value, json};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;

struct StubTokens {
    fail: bool,
    fetches: AtomicUsize,
}

impl StubTokens {
    fn working() -> Arc<Self> {
        Arc::new(Self {
            fail: false,
            fetches: AtomicUsize::new(0),
        })
    }

    fn failing() -> Arc<Self> {
        Arc::new(Self {
            fail: true,
            fetches: AtomicUsize::new(0),
        })
    }
}

#[async_trait]
impl TokenProvider for StubTokens {
    async fn fetch_token(&self) -> Result<BearerToken, TokenError> {
        let count = self.fetches.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(TokenError::Rejected {
                status: 503,
                body: "identity provider offline".to_string(),
            });
        }
        Ok(BearerToken {
            access_token: format!("tok-{}", count + 1),
            expires_in: Some(300),
        })
    }
}

#[derive(Debug, Clone)]
enum RecordedCall {
    Create { token: String, patient: NewPatientSnapshot },
    Search { token: String, pairs: Vec<(&'static str, String)> },
}

#[derive(Debug, Clone)]
struct NewPatientSnapshot {
    given_name: Option<String>,
    family_name: Option<String>,
    gender: Option<String>,
}

struct RecordingClinical {
    outcome: CallOutcome,
    calls: Mutex<Vec<RecordedCall>>,
}

impl RecordingClinical {
    fn returning(outcome: CallOutcome) -> Arc<Self> {
        Arc::new(Self {
            outcome,
            calls: Mutex::new(Vec::new()),
        })
    }

    fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().expect("calls lock").clone()
    }
}

#[async_trait]
impl ClinicalApi for RecordingClinical {
    async fn create_patient(
        &self,
        token: &str,
        patient: &NewPatient,
    ) -> Result<CallOutcome, EhrError> {
        self.calls.lock().expect("calls lock").push(RecordedCall::Create {
            token: token.to_string(),
            patient: NewPatientSnapshot {
                given_name: patient.given_name.clone(),
                family_name: patient.family_name.clone(),
                gender: patient.gender.clone(),
            },
        });
        Ok(self.outcome.clone())
    }

    async fn search_patients(
        &self,
        token: &str,
        query: &PatientQuery,
    ) -> Result<CallOutcome, EhrError> {
        self.calls.lock().expect("calls lock").push(RecordedCall::Search {
            token: token.to_string(),
            pairs: query.to_query_pairs(),
        });
        Ok(self.outcome.clone())
    }
}

#[derive(Default)]
struct CapturingChannel {
    delivered: Mutex<Vec<FunctionResponse>>,
}

impl CapturingChannel {
    fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    fn responses(&self) -> Vec<FunctionResponse> {
        self.delivered.lock().expect("responses lock").clone()
    }

    async fn wait_for(&self, count: usize) {
        tokio::time::timeout(Duration::from_secs(2), async {
            while self.delivered.lock().expect("responses lock").len() < count {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("responses not delivered in time");
    }
}

#[async_trait]
impl ResponseChannel for CapturingChannel {
    async fn deliver(&self, responses: Vec<FunctionResponse>) -> Result<(), LiveError> {
        self.delivered
            .lock()
            .expect("responses lock")
            .extend(responses);
        Ok(())
    }
}

/// Channel standing in for a session that has already closed.
struct ClosedChannel {
    attempts: AtomicUsize,
}

impl ClosedChannel {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            attempts: AtomicUsize::new(0),
        })
    }

    async fn wait_for_attempts(&self, count: usize) {
        tokio::time::timeout(Duration::from_secs(2), async {
            while self.attempts.load(Ordering::SeqCst) < count {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("deliveries not attempted in time");
    }
}

#[async_trait]
impl ResponseChannel for ClosedChannel {
    async fn deliver(&self, _responses: Vec<FunctionResponse>) -> Result<(), LiveError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        Err(LiveError::invalid_state(
            "send_tool_response",
            asclepion_core::SessionState::Closed,
        ))
    }
}

fn dispatcher(
    tokens: Arc<StubTokens>,
    clinical: Arc<RecordingClinical>,
    responses: Arc<CapturingChannel>,
) -> Arc<ToolDispatcher> {
    Arc::new(ToolDispatcher::new(
        Arc::new(ToolRegistry::standard()),
        tokens,
        clinical,
        responses,
    ))
}

fn call(id: &str, name: &str, args: Value) -> FunctionCall {
    FunctionCall {
        id: id.to_string(),
        name: name.to_string(),
        args,
    }
}

#[tokio::test]
async fn render_chart_forwards_the_graph_and_succeeds() {
    let responses = CapturingChannel::new();
    let clinical = RecordingClinical::returning(CallOutcome {
        success: true,
        data: Value::Null,
    });
    let (chart_tx, mut chart_rx) = mpsc::unbounded_channel();
    let dispatcher = Arc::new(
        ToolDispatcher::new(
            Arc::new(ToolRegistry::standard()),
            StubTokens::working(),
            clinical,
            responses.clone(),
        )
        .with_chart_sink(chart_tx),
    );

    dispatcher
        .dispatch(vec![call(
            "1",
            "render_chart",
            json!({"json_graph": "{\"mark\":\"bar\"}"}),
        )])
        .await;

    responses.wait_for(1).await;
    assert_eq!(chart_rx.recv().await.as_deref(), Some("{\"mark\":\"bar\"}"));
    assert_eq!(
        serde_json::to_value(&responses.responses()[0]).expect("serialize"),
        json!({"id": "1", "response": {"output": {"success": true, "data": null}}})
    );
}

#[tokio::test]
async fn unknown_tool_fails_without_blocking_siblings() {
    let responses = CapturingChannel::new();
    let clinical = RecordingClinical::returning(CallOutcome {
        success: true,
        data: Value::Null,
    });
    let dispatcher = dispatcher(StubTokens::working(), clinical, responses.clone());

    dispatcher
        .dispatch(vec![
            call("1", "defragment_database", json!({})),
            call("2", "search_patient", json!({"familyName": "Smith"})),
        ])
        .await;

    responses.wait_for(2).await;
    let mut delivered = responses.responses();
    delivered.sort_by(|a, b| a.id.cmp(&b.id));

    assert_eq!(delivered[0].response["output"]["success"], json!(false));
    assert!(
        delivered[0].response["output"]["error"]
            .as_str()
            .expect("error text")
            .contains("unknown tool 'defragment_database'")
    );
    assert_eq!(delivered[1].response["output"]["success"], json!(true));
}

#[tokio::test]
async fn token_failure_short_circuits_before_any_records_call() {
    let responses = CapturingChannel::new();
    let clinical = RecordingClinical::returning(CallOutcome {
        success: true,
        data: Value::Null,
    });
    let dispatcher = dispatcher(StubTokens::failing(), clinical.clone(), responses.clone());

    dispatcher
        .dispatch(vec![call(
            "7",
            "create_patient",
            json!({"givenName": "Ada", "familyName": "Lovelace"}),
        )])
        .await;

    responses.wait_for(1).await;
    let output = &responses.responses()[0].response["output"];
    assert_eq!(output["success"], json!(false));
    assert!(
        output["error"]
            .as_str()
            .expect("error text")
            .contains("identity provider offline")
    );
    assert!(clinical.calls().is_empty());
}

#[tokio::test]
async fn create_patient_passes_token_and_demographics() {
    let responses = CapturingChannel::new();
    let clinical = RecordingClinical::returning(CallOutcome {
        success: true,
        data: Value::Null,
    });
    let dispatcher = dispatcher(StubTokens::working(), clinical.clone(), responses.clone());

    dispatcher
        .dispatch(vec![call(
            "42",
            "create_patient",
            json!({
                "givenName": "Ada",
                "familyName": "Lovelace",
                "telecom": "555-0100",
                "gender": "female",
            }),
        )])
        .await;

    responses.wait_for(1).await;
    assert_eq!(
        serde_json::to_value(&responses.responses()[0]).expect("serialize"),
        json!({"id": "42", "response": {"output": {"success": true, "data": null}}})
    );

    let calls = clinical.calls();
    assert_eq!(calls.len(), 1);
    match &calls[0] {
        RecordedCall::Create { token, patient } => {
            assert_eq!(token, "tok-1");
            assert_eq!(patient.given_name.as_deref(), Some("Ada"));
            assert_eq!(patient.family_name.as_deref(), Some("Lovelace"));
            assert_eq!(patient.gender.as_deref(), Some("female"));
        }
        other => panic!("unexpected call {other:?}"),
    }
}

#[tokio::test]
async fn upstream_rejection_is_reported_not_raised() {
    let responses = CapturingChannel::new();
    let clinical = RecordingClinical::returning(CallOutcome {
        success: false,
        data: json!({"error": "bad request"}),
    });
    let dispatcher = dispatcher(StubTokens::working(), clinical, responses.clone());

    dispatcher
        .dispatch(vec![call("9", "create_patient", json!({"givenName": "Ada"}))])
        .await;

    responses.wait_for(1).await;
    assert_eq!(
        responses.responses()[0].response["output"],
        json!({"success": false, "data": {"error": "bad request"}})
    );
}

#[tokio::test]
async fn search_sends_only_supplied_filters() {
    let responses = CapturingChannel::new();
    let clinical = RecordingClinical::returning(CallOutcome {
        success: true,
        data: json!({"resourceType": "Bundle", "total": 0}),
    });
    let dispatcher = dispatcher(StubTokens::working(), clinical.clone(), responses.clone());

    dispatcher
        .dispatch(vec![call("3", "search_patient", json!({"familyName": "Smith"}))])
        .await;

    responses.wait_for(1).await;
    match &clinical.calls()[0] {
        RecordedCall::Search { pairs, .. } => {
            assert_eq!(pairs, &vec![("family", "Smith".to_string())]);
        }
        other => panic!("unexpected call {other:?}"),
    }
}

#[tokio::test]
async fn delivery_failure_after_close_is_swallowed() {
    let channel = ClosedChannel::new();
    let clinical = RecordingClinical::returning(CallOutcome {
        success: true,
        data: Value::Null,
    });
    let dispatcher = Arc::new(ToolDispatcher::new(
        Arc::new(ToolRegistry::standard()),
        StubTokens::working(),
        clinical.clone(),
        channel.clone(),
    ));

    dispatcher
        .dispatch(vec![
            call("1", "search_patient", json!({})),
            call("2", "search_patient", json!({"familyName": "Smith"})),
        ])
        .await;

    // Both calls run to completion and attempt delivery; the failures are
    // logged, not raised.
    channel.wait_for_attempts(2).await;
    assert_eq!(clinical.calls().len(), 2);
}

#[tokio::test]
async fn every_records_call_fetches_a_fresh_token() {
    let responses = CapturingChannel::new();
    let tokens = StubTokens::working();
    let clinical = RecordingClinical::returning(CallOutcome {
        success: true,
        data: Value::Null,
    });
    let dispatcher = dispatcher(tokens.clone(), clinical.clone(), responses.clone());

    dispatcher
        .clone()
        .dispatch(vec![call("a", "search_patient", json!({}))])
        .await;
    responses.wait_for(1).await;
    dispatcher
        .dispatch(vec![call("b", "search_patient", json!({}))])
        .await;
    responses.wait_for(2).await;

    assert_eq!(tokens.fetches.load(Ordering::SeqCst), 2);
    let seen: Vec<String> = clinical
        .calls()
        .iter()
        .map(|recorded| match recorded {
            RecordedCall::Search { token, .. } | RecordedCall::Create { token, .. } => token.clone(),
        })
        .collect();
    assert_eq!(seen, vec!["tok-1".to_string(), "tok-2".to_string()]);
}
