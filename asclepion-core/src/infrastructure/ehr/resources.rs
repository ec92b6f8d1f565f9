//! Patient resource construction and search parameters.

use serde::Deserialize;
use serde_json::{Map, Value, json};

/// Arguments for a patient create, as supplied by the agent.
///
/// All fields are optional on purpose: the declared schema is advisory and
/// absent values are forwarded as absent rather than rejected.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewPatient {
    pub given_name: Option<String>,
    pub family_name: Option<String>,
    pub telecom: Option<String>,
    pub gender: Option<String>,
    pub birth_date: Option<String>,
}

impl NewPatient {
    /// Builds the FHIR Patient resource body for the create call.
    ///
    /// Unsupplied fields are omitted from the JSON entirely, matching how
    /// the records API expects partially-populated resources.
    pub fn to_resource(&self) -> Value {
        let mut name = Map::new();
        name.insert("use".into(), json!("usual"));
        if let Some(family) = &self.family_name {
            name.insert("family".into(), json!(family));
        }
        if let Some(given) = &self.given_name {
            name.insert("given".into(), json!([given]));
        }

        let mut resource = Map::new();
        resource.insert("resourceType".into(), json!("Patient"));
        resource.insert(
            "identifier".into(),
            json!([{
                "use": "usual",
                "system": "urn:oid:2.16.840.1.113883.4.1",
                "value": "000-00-0000",
            }]),
        );
        resource.insert("active".into(), json!("true"));
        resource.insert("name".into(), json!([Value::Object(name)]));
        if let Some(telecom) = &self.telecom {
            resource.insert(
                "telecom".into(),
                json!([{"system": "phone", "value": telecom, "use": "home"}]),
            );
        }
        if let Some(gender) = &self.gender {
            resource.insert("gender".into(), json!(gender));
        }
        if let Some(birth_date) = &self.birth_date {
            resource.insert("birthDate".into(), json!(birth_date));
        }
        resource.insert("address".into(), json!([]));
        resource.insert("maritalStatus".into(), json!({"text": ""}));
        resource.insert("generalPractitioner".into(), json!([]));
        resource.insert("extension".into(), json!([]));

        Value::Object(resource)
    }
}

/// Demographic filters for a patient search; every field is optional.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PatientQuery {
    pub given_name: Option<String>,
    pub family_name: Option<String>,
    pub birth_date: Option<String>,
    pub gender: Option<String>,
    pub telecom: Option<String>,
}

impl PatientQuery {
    /// Query-string pairs for the supplied filters only; omitted filters
    /// produce no key at all.
    pub fn to_query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::new();
        if let Some(given) = &self.given_name {
            pairs.push(("given", given.clone()));
        }
        if let Some(family) = &self.family_name {
            pairs.push(("family", family.clone()));
        }
        if let Some(birth_date) = &self.birth_date {
            pairs.push(("birthdate", birth_date.clone()));
        }
        if let Some(gender) = &self.gender {
            pairs.push(("gender", gender.clone()));
        }
        if let Some(telecom) = &self.telecom {
            pairs.push(("telecom", telecom.clone()));
        }
        pairs
    }
}
