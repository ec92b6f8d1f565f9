//! Static tool declarations shared read-only by every session.

use crate::domain::tool::{ParameterSpec, ToolDeclaration};
use std::collections::HashMap;

pub const RENDER_CHART: &str = "render_chart";
pub const CREATE_PATIENT: &str = "create_patient";
pub const SEARCH_PATIENT: &str = "search_patient";

const GENDER_VALUES: &[&str] = &["male", "female", "other", "unknown"];

/// Immutable lookup of the tools offered to the agent.
///
/// Constructed once at startup and injected wherever it is needed; never
/// mutated afterwards.
pub struct ToolRegistry {
    declarations: Vec<ToolDeclaration>,
    index: HashMap<String, usize>,
}

impl ToolRegistry {
    pub fn new(declarations: Vec<ToolDeclaration>) -> Self {
        let index = declarations
            .iter()
            .enumerate()
            .map(|(position, declaration)| (declaration.name.clone(), position))
            .collect();
        Self {
            declarations,
            index,
        }
    }

    /// Registry with the full clinical tool set.
    pub fn standard() -> Self {
        Self::new(vec![
            render_chart_declaration(),
            create_patient_declaration(),
            search_patient_declaration(),
        ])
    }

    pub fn get(&self, name: &str) -> Option<&ToolDeclaration> {
        self.index
            .get(name)
            .map(|position| &self.declarations[*position])
    }

    pub fn declarations(&self) -> &[ToolDeclaration] {
        &self.declarations
    }
}

pub fn render_chart_declaration() -> ToolDeclaration {
    ToolDeclaration::new(RENDER_CHART, "Displays a chart described in JSON format.")
        .with_parameter(
            "json_graph",
            ParameterSpec::string(
                "JSON STRING representation of the chart to render. Must be a string, not a json object",
            ),
        )
        .with_required(&["json_graph"])
}

pub fn create_patient_declaration() -> ToolDeclaration {
    ToolDeclaration::new(
        CREATE_PATIENT,
        "Creates a patient in the clinical records system",
    )
    .with_parameter(
        "givenName",
        ParameterSpec::string("Patient's given (first) name"),
    )
    .with_parameter(
        "familyName",
        ParameterSpec::string("Patient's family (last) name"),
    )
    .with_parameter(
        "telecom",
        ParameterSpec::string("Patient's telecom info (e.g. phone number)"),
    )
    .with_parameter(
        "gender",
        ParameterSpec::string("Patient's gender (male, female, other, unknown)")
            .with_allowed_values(GENDER_VALUES),
    )
    .with_parameter(
        "birthDate",
        ParameterSpec::string("Patient's birth date (YYYY-MM-DD) if needed"),
    )
    .with_required(&["givenName", "familyName", "telecom", "gender"])
}

pub fn search_patient_declaration() -> ToolDeclaration {
    ToolDeclaration::new(
        SEARCH_PATIENT,
        "Searches for patients in the clinical records system based on demographics.",
    )
    .with_parameter(
        "givenName",
        ParameterSpec::string("Patient's given (first) name"),
    )
    .with_parameter(
        "familyName",
        ParameterSpec::string("Patient's family (last) name"),
    )
    .with_parameter(
        "birthDate",
        ParameterSpec::string("YYYY-MM-DD format birth date"),
    )
    .with_parameter(
        "gender",
        ParameterSpec::string("Legal sex or 'gender' search parameter (male, female, other, unknown)")
            .with_allowed_values(GENDER_VALUES),
    )
    .with_parameter(
        "telecom",
        ParameterSpec::string("Patient's phone number to match on"),
    )
}
