pub mod ehr;
pub mod token;

pub use ehr::{CallOutcome, ClinicalApi, EhrClient, EhrError, NewPatient, PatientQuery};
pub use token::{BearerToken, HttpTokenProvider, TokenError, TokenProvider};

use crate::constants::{HTTP_CONNECT_TIMEOUT_SECS, HTTP_REQUEST_TIMEOUT_SECS};
use std::time::Duration;
use tracing::warn;

/// HTTP client with the project-wide timeouts applied.
pub(crate) fn http_client() -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(HTTP_REQUEST_TIMEOUT_SECS))
        .connect_timeout(Duration::from_secs(HTTP_CONNECT_TIMEOUT_SECS))
        .build()
        .unwrap_or_else(|err| {
            warn!(%err, "failed to build HTTP client, using defaults");
            reqwest::Client::new()
        })
}
