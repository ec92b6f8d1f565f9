//! Session configuration, fixed for the lifetime of one connection.

use super::tool::ToolDeclaration;
use crate::config::AppConfig;

/// Everything the live service needs to set up a session.
///
/// Immutable once a session is opened; changing any field requires closing
/// and reopening the session.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub model: String,
    pub response_modality: String,
    pub voice: Option<String>,
    pub system_instruction: Option<String>,
    pub tools: Vec<ToolDeclaration>,
    /// Also offer the service's built-in web search tool.
    pub enable_search: bool,
}

impl SessionConfig {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            response_modality: crate::constants::DEFAULT_RESPONSE_MODALITY.to_string(),
            voice: None,
            system_instruction: None,
            tools: Vec::new(),
            enable_search: false,
        }
    }

    pub fn from_app_config(config: &AppConfig, tools: Vec<ToolDeclaration>) -> Self {
        Self {
            model: config.model.clone(),
            response_modality: config.response_modality.clone(),
            voice: config.voice.clone(),
            system_instruction: config.system_instruction.clone(),
            tools,
            enable_search: config.enable_search,
        }
    }

    pub fn with_system_instruction(mut self, instruction: impl Into<String>) -> Self {
        self.system_instruction = Some(instruction.into());
        self
    }

    pub fn with_tools(mut self, tools: Vec<ToolDeclaration>) -> Self {
        self.tools = tools;
        self
    }

    pub fn with_voice(mut self, voice: impl Into<String>) -> Self {
        self.voice = Some(voice.into());
        self
    }
}
