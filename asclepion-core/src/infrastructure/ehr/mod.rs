//! Clinical-records (FHIR R4) integration.
//!
//! The records system is a black-box HTTP service with a fixed resource
//! model; only the Patient create and search operations are used here.

pub mod client;
pub mod resources;

pub use client::{CallOutcome, ClinicalApi, EhrClient, EhrError};
pub use resources::{NewPatient, PatientQuery};
