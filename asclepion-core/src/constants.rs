//! Shared defaults for endpoints and session options.

/// WebSocket endpoint of the live agent service.
pub const DEFAULT_LIVE_ENDPOINT: &str = "wss://generativelanguage.googleapis.com/ws/google.ai.generativelanguage.v1beta.GenerativeService.BidiGenerateContent";

/// Environment variable holding the live service API key.
pub const API_KEY_ENV: &str = "LIVE_API_KEY";

/// Response modality requested when the config does not override it.
pub const DEFAULT_RESPONSE_MODALITY: &str = "audio";

/// Prebuilt voice used for audio responses when none is configured.
pub const DEFAULT_VOICE: &str = "Charon";

/// Request timeout applied to every outbound HTTP call, in seconds.
pub const HTTP_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Connect timeout applied to every outbound HTTP call, in seconds.
pub const HTTP_CONNECT_TIMEOUT_SECS: u64 = 10;
