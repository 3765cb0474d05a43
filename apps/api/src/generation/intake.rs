//! Intake validation - bounds-checks collected interview fields and gates
//! generation on the core required set.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::errors::AppError;

/// Maximum length of any collected field value.
pub const MAX_FIELD_LEN: usize = 2000;

/// Fields that must be present and non-empty before generation may run.
pub const CORE_FIELDS: &[&str] = &["Goal", "Audience", "Inputs", "Output_Format", "Constraints"];

/// Optional enrichment fields collected by the extended interview profile.
pub const EXTENDED_FIELDS: &[&str] = &[
    "Style",
    "Guardrails",
    "Business_Context",
    "Brand_Voice",
    "Success_Metrics",
];

/// The field set an interview drives toward. Generation itself gates only on
/// [`CORE_FIELDS`]; the profile decides when the interview reports "ready".
#[derive(Debug, Clone)]
pub struct FieldProfile {
    fields: Vec<&'static str>,
}

impl FieldProfile {
    /// The five-field minimum profile.
    pub fn core() -> Self {
        Self {
            fields: CORE_FIELDS.to_vec(),
        }
    }

    /// The full ten-field enterprise profile.
    pub fn extended() -> Self {
        let mut fields = CORE_FIELDS.to_vec();
        fields.extend_from_slice(EXTENDED_FIELDS);
        Self { fields }
    }

    /// Resolves a profile by name; anything other than "core" selects extended.
    pub fn from_name(name: &str) -> Self {
        if name.eq_ignore_ascii_case("core") {
            Self::core()
        } else {
            Self::extended()
        }
    }

    pub fn fields(&self) -> &[&'static str] {
        &self.fields
    }
}

/// Validated intake fields, trimmed and bounds-checked. Consumed read-only by
/// the pipeline; echoed back in responses and persisted in `features`.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(transparent)]
pub struct IntakeRecord {
    fields: BTreeMap<String, String>,
}

impl IntakeRecord {
    /// Validates every collected value: trims whitespace and rejects values
    /// over [`MAX_FIELD_LEN`] chars.
    pub fn from_collected(collected: &BTreeMap<String, String>) -> Result<Self, AppError> {
        let mut fields = BTreeMap::new();
        for (name, value) in collected {
            if value.len() > MAX_FIELD_LEN {
                return Err(AppError::Validation(format!(
                    "{name} exceeds {MAX_FIELD_LEN} chars"
                )));
            }
            fields.insert(name.clone(), value.trim().to_string());
        }
        Ok(Self { fields })
    }

    /// Returns the field value if present and non-empty.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.fields
            .get(name)
            .map(String::as_str)
            .filter(|v| !v.is_empty())
    }

    /// Returns the field value, or the given default when absent or empty.
    pub fn field_or<'a>(&'a self, name: &str, default: &'a str) -> &'a str {
        self.get(name).unwrap_or(default)
    }

    /// Profile fields not yet collected, in profile order.
    pub fn missing(&self, profile: &FieldProfile) -> Vec<String> {
        profile
            .fields()
            .iter()
            .filter(|field| self.get(field).is_none())
            .map(|field| field.to_string())
            .collect()
    }

    /// Ensures every core field is present and non-empty.
    pub fn require_core(&self) -> Result<(), AppError> {
        for field in CORE_FIELDS {
            if self.get(field).is_none() {
                return Err(AppError::Validation(format!("{field} is required")));
            }
        }
        Ok(())
    }
}
