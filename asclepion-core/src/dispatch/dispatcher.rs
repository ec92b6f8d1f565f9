//! Executes tool calls against the clinical records backend.
//!
//! Every call in a batch runs on its own task, so a slow or failing
//! sibling never delays the others. Each completed call is answered
//! individually, tagged with its originating call id.

use crate::dispatch::registry::{CREATE_PATIENT, RENDER_CHART, SEARCH_PATIENT, ToolRegistry};
use crate::domain::events::{LiveEvent, LiveEventKind};
use crate::domain::tool::{FunctionCall, FunctionResponse};
use crate::infrastructure::ehr::{ClinicalApi, NewPatient, PatientQuery};
use crate::infrastructure::token::TokenProvider;
use crate::live::client::LiveClient;
use crate::live::emitter::Subscription;
use crate::live::error::LiveError;
use async_trait::async_trait;
use serde_json::{Value, json};
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, info, warn};

/// Outbound path for finished tool responses.
///
/// [`LiveClient`] is the production implementation; tests substitute a
/// recording stub.
#[async_trait]
pub trait ResponseChannel: Send + Sync {
    async fn deliver(&self, responses: Vec<FunctionResponse>) -> Result<(), LiveError>;
}

#[async_trait]
impl ResponseChannel for LiveClient {
    async fn deliver(&self, responses: Vec<FunctionResponse>) -> Result<(), LiveError> {
        self.send_tool_response(responses).await
    }
}

/// Routes incoming tool calls to their handlers.
pub struct ToolDispatcher {
    registry: Arc<ToolRegistry>,
    tokens: Arc<dyn TokenProvider>,
    clinical: Arc<dyn ClinicalApi>,
    responses: Arc<dyn ResponseChannel>,
    charts: Option<UnboundedSender<String>>,
}

impl ToolDispatcher {
    pub fn new(
        registry: Arc<ToolRegistry>,
        tokens: Arc<dyn TokenProvider>,
        clinical: Arc<dyn ClinicalApi>,
        responses: Arc<dyn ResponseChannel>,
    ) -> Self {
        Self {
            registry,
            tokens,
            clinical,
            responses,
            charts: None,
        }
    }

    /// Sends each `render_chart` payload to `sink` instead of dropping it.
    pub fn with_chart_sink(mut self, sink: UnboundedSender<String>) -> Self {
        self.charts = Some(sink);
        self
    }

    /// Subscribes the dispatcher to a client's tool-call events.
    ///
    /// Consume the returned subscription to detach it again.
    pub fn attach(self: &Arc<Self>, client: &LiveClient) -> Subscription {
        let dispatcher = Arc::clone(self);
        client.subscribe(LiveEventKind::ToolCall, move |event| {
            if let LiveEvent::ToolCall(batch) = event {
                let calls = batch.function_calls.clone();
                tokio::spawn(Arc::clone(&dispatcher).dispatch(calls));
            }
        })
    }

    /// Runs a batch of calls, one task per call.
    pub async fn dispatch(self: Arc<Self>, calls: Vec<FunctionCall>) {
        for call in calls {
            let dispatcher = Arc::clone(&self);
            tokio::spawn(async move {
                dispatcher.handle_call(call).await;
            });
        }
    }

    async fn handle_call(&self, call: FunctionCall) {
        info!(id = call.id.as_str(), tool = call.name.as_str(), "tool call");
        let output = self.run(&call).await;
        let response = FunctionResponse {
            id: call.id.clone(),
            response: json!({ "output": output }),
        };
        if let Err(err) = self.responses.deliver(vec![response]).await {
            warn!(id = call.id.as_str(), %err, "tool response not delivered");
        }
    }

    async fn run(&self, call: &FunctionCall) -> Value {
        if self.registry.get(&call.name).is_none() {
            return failure_output(format!("unknown tool '{}'", call.name));
        }

        match call.name.as_str() {
            RENDER_CHART => self.run_render_chart(&call.args),
            CREATE_PATIENT => self.run_create_patient(&call.args).await,
            SEARCH_PATIENT => self.run_search_patient(&call.args).await,
            other => failure_output(format!("tool '{other}' has no handler")),
        }
    }

    fn run_render_chart(&self, args: &Value) -> Value {
        let Some(graph) = args.get("json_graph").and_then(Value::as_str) else {
            return failure_output("render_chart requires a json_graph string argument");
        };
        match &self.charts {
            Some(sink) => {
                if sink.send(graph.to_string()).is_err() {
                    debug!("chart sink dropped, discarding graph");
                }
            }
            None => debug!("no chart sink attached, discarding graph"),
        }
        success_output(Value::Null)
    }

    async fn run_create_patient(&self, args: &Value) -> Value {
        let patient: NewPatient =
            serde_json::from_value(args.clone()).unwrap_or_default();
        let token = match self.tokens.fetch_token().await {
            Ok(token) => token,
            Err(err) => return failure_output(err.to_string()),
        };
        match self
            .clinical
            .create_patient(&token.access_token, &patient)
            .await
        {
            Ok(outcome) => json!({ "success": outcome.success, "data": outcome.data }),
            Err(err) => failure_output(err.to_string()),
        }
    }

    async fn run_search_patient(&self, args: &Value) -> Value {
        let query: PatientQuery = serde_json::from_value(args.clone()).unwrap_or_default();
        let token = match self.tokens.fetch_token().await {
            Ok(token) => token,
            Err(err) => return failure_output(err.to_string()),
        };
        match self
            .clinical
            .search_patients(&token.access_token, &query)
            .await
        {
            Ok(outcome) => json!({ "success": outcome.success, "data": outcome.data }),
            Err(err) => failure_output(err.to_string()),
        }
    }
}

fn success_output(data: Value) -> Value {
    json!({ "success": true, "data": data })
}

fn failure_output(message: impl Into<String>) -> Value {
    json!({ "success": false, "error": message.into() })
}
