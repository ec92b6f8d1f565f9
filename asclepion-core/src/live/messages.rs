//! Wire-level message shapes for the live session protocol.
//!
//! Client to service: a `setup` envelope first, then `clientContent`,
//! `realtimeInput`, and `toolResponse` envelopes. Service to client:
//! `setupComplete`, `serverContent`, and `toolCall`, tagged by which field
//! is present. All field names are camelCase on the wire.

use crate::domain::session::SessionConfig;
use crate::domain::tool::{FunctionCall, FunctionResponse, ToolDeclaration};
use serde::{Deserialize, Serialize};
use serde_json::Value;

// ── Client → service ────────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub(crate) struct SetupEnvelope {
    pub setup: Setup,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Setup {
    pub model: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub generation_config: Option<GenerationConfig>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system_instruction: Option<Content>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tools: Vec<ToolSpec>,
}

impl Setup {
    pub fn from_session_config(config: &SessionConfig) -> Self {
        let mut tools = Vec::new();
        if config.enable_search {
            tools.push(ToolSpec::google_search());
        }
        if !config.tools.is_empty() {
            tools.push(ToolSpec::functions(config.tools.clone()));
        }

        Self {
            model: config.model.clone(),
            generation_config: Some(GenerationConfig::for_modality(
                &config.response_modality,
                config.voice.as_deref(),
            )),
            system_instruction: config
                .system_instruction
                .as_deref()
                .map(Content::system_text),
            tools,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConfig {
    pub response_modalities: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub speech_config: Option<SpeechConfig>,
}

impl GenerationConfig {
    pub fn for_modality(modality: &str, voice: Option<&str>) -> Self {
        Self {
            response_modalities: modality.to_string(),
            speech_config: voice.map(|name| SpeechConfig {
                voice_config: VoiceConfig {
                    prebuilt_voice_config: PrebuiltVoiceConfig {
                        voice_name: name.to_string(),
                    },
                },
            }),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SpeechConfig {
    pub voice_config: VoiceConfig,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VoiceConfig {
    pub prebuilt_voice_config: PrebuiltVoiceConfig,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PrebuiltVoiceConfig {
    pub voice_name: String,
}

/// One entry of the setup `tools` list: either the service's built-in
/// search or a batch of function declarations.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolSpec {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub google_search: Option<Value>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub function_declarations: Vec<ToolDeclaration>,
}

impl ToolSpec {
    pub fn google_search() -> Self {
        Self {
            google_search: Some(Value::Object(Default::default())),
            function_declarations: Vec::new(),
        }
    }

    pub fn functions(declarations: Vec<ToolDeclaration>) -> Self {
        Self {
            google_search: None,
            function_declarations: declarations,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ClientContentEnvelope {
    pub client_content: ClientContent,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientContent {
    pub turns: Vec<Content>,
    pub turn_complete: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct RealtimeInputEnvelope {
    pub realtime_input: RealtimeInput,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RealtimeInput {
    pub media_chunks: Vec<Blob>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ToolResponseEnvelope {
    pub tool_response: ToolResponsePayload,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolResponsePayload {
    pub function_responses: Vec<FunctionResponse>,
}

// ── Shared content shapes ───────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Content {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    pub parts: Vec<Part>,
}

impl Content {
    pub fn user_text(text: impl Into<String>) -> Self {
        Self {
            role: Some("user".to_string()),
            parts: vec![Part::text(text)],
        }
    }

    fn system_text(text: &str) -> Self {
        Self {
            role: None,
            parts: vec![Part::text(text)],
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Part {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inline_data: Option<Blob>,
}

impl Part {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            inline_data: None,
        }
    }
}

/// Inline binary payload, base64 on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Blob {
    pub mime_type: String,
    pub data: String,
}

// ── Service → client ────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ServerMessage {
    #[serde(default)]
    pub setup_complete: Option<Value>,
    #[serde(default)]
    pub server_content: Option<ServerContent>,
    #[serde(default)]
    pub tool_call: Option<ToolCallEvent>,
}

/// One content chunk of the agent's turn, possibly carrying turn markers.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerContent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_turn: Option<Content>,
    #[serde(default)]
    pub turn_complete: bool,
    #[serde(default)]
    pub interrupted: bool,
}

/// A batch of tool invocations requested in a single inbound message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolCallEvent {
    pub function_calls: Vec<FunctionCall>,
}
