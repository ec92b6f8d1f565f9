//! Tool declarations and the call/response pair exchanged with the agent.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// A named capability the agent may invoke.
///
/// Constructed once at startup and shared read-only across sessions; the
/// parameter schema is advisory and is presented to the agent at session
/// setup, not enforced against incoming calls.
#[derive(Debug, Clone, Serialize)]
pub struct ToolDeclaration {
    pub name: String,
    pub description: String,
    pub parameters: ParameterSchema,
}

impl ToolDeclaration {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            parameters: ParameterSchema::object(),
        }
    }

    pub fn with_parameter(mut self, name: impl Into<String>, spec: ParameterSpec) -> Self {
        self.parameters.properties.insert(name.into(), spec);
        self
    }

    pub fn with_required(mut self, names: &[&str]) -> Self {
        self.parameters.required = names.iter().map(|n| n.to_string()).collect();
        self
    }
}

/// Object schema describing a tool's parameters.
#[derive(Debug, Clone, Serialize)]
pub struct ParameterSchema {
    #[serde(rename = "type")]
    pub schema_type: String,
    pub properties: BTreeMap<String, ParameterSpec>,
    pub required: Vec<String>,
}

impl ParameterSchema {
    pub fn object() -> Self {
        Self {
            schema_type: "OBJECT".to_string(),
            properties: BTreeMap::new(),
            required: Vec::new(),
        }
    }
}

/// Schema entry for a single parameter.
#[derive(Debug, Clone, Serialize)]
pub struct ParameterSpec {
    #[serde(rename = "type")]
    pub value_type: String,
    pub description: String,
    #[serde(rename = "enum", skip_serializing_if = "Option::is_none")]
    pub allowed_values: Option<Vec<String>>,
}

impl ParameterSpec {
    pub fn string(description: impl Into<String>) -> Self {
        Self {
            value_type: "STRING".to_string(),
            description: description.into(),
            allowed_values: None,
        }
    }

    pub fn with_allowed_values(mut self, values: &[&str]) -> Self {
        self.allowed_values = Some(values.iter().map(|v| v.to_string()).collect());
        self
    }
}

/// One invocation of a tool requested by the agent.
///
/// Arguments are passed through as received; validation, if any, is the
/// dispatcher's responsibility.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionCall {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub args: Value,
}

/// The reply for one tool call, tagged with the call's own id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionResponse {
    pub id: String,
    pub response: Value,
}
