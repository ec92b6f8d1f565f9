//! HTTP client for the clinical-records Patient collection.

use super::resources::{NewPatient, PatientQuery};
use async_trait::async_trait;
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, info};

const FHIR_JSON: &str = "application/fhir+json";

/// What the records API said, without interpretation.
///
/// Non-2xx statuses are captured here rather than raised; only failures to
/// reach the API at all become an [`EhrError`].
#[derive(Debug, Clone, PartialEq)]
pub struct CallOutcome {
    pub success: bool,
    pub data: Value,
}

#[derive(Debug, Error)]
pub enum EhrError {
    #[error("clinical records request failed: {0}")]
    Network(#[from] reqwest::Error),
}

/// The two Patient operations used by the dispatcher.
#[async_trait]
pub trait ClinicalApi: Send + Sync {
    async fn create_patient(
        &self,
        token: &str,
        patient: &NewPatient,
    ) -> Result<CallOutcome, EhrError>;

    async fn search_patients(
        &self,
        token: &str,
        query: &PatientQuery,
    ) -> Result<CallOutcome, EhrError>;
}

pub struct EhrClient {
    http: reqwest::Client,
    base_url: String,
}

impl EhrClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            http: crate::infrastructure::http_client(),
            base_url: base_url.into(),
        }
    }

    fn patient_url(&self) -> String {
        format!("{}/Patient", self.base_url.trim_end_matches('/'))
    }

    async fn capture(response: reqwest::Response) -> CallOutcome {
        let status = response.status();
        // A missing or non-JSON body is tolerated on any status.
        let data = response.json::<Value>().await.unwrap_or(Value::Null);
        CallOutcome {
            success: status.is_success(),
            data,
        }
    }
}

#[async_trait]
impl ClinicalApi for EhrClient {
    async fn create_patient(
        &self,
        token: &str,
        patient: &NewPatient,
    ) -> Result<CallOutcome, EhrError> {
        let body = patient.to_resource();
        debug!(url = self.patient_url().as_str(), "creating patient record");

        let response = self
            .http
            .post(self.patient_url())
            .bearer_auth(token)
            .header(CONTENT_TYPE, FHIR_JSON)
            .json(&body)
            .send()
            .await?;

        info!(status = response.status().as_u16(), "patient create finished");
        Ok(Self::capture(response).await)
    }

    async fn search_patients(
        &self,
        token: &str,
        query: &PatientQuery,
    ) -> Result<CallOutcome, EhrError> {
        let response = self
            .http
            .get(self.patient_url())
            .bearer_auth(token)
            .header(ACCEPT, FHIR_JSON)
            .query(&query.to_query_pairs())
            .send()
            .await?;

        info!(status = response.status().as_u16(), "patient search finished");
        Ok(Self::capture(response).await)
    }
}
