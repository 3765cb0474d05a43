//! Tolerant artifact parsing - extracts the JSON object from free-form model
//! output and falls back to a structurally complete empty artifact rather than
//! failing the pipeline. Parse failures never cross this boundary.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::warn;

use crate::generation::evidence::Citation;
use crate::llm_client::strip_json_fences;

/// The structured synthesis output. Inner shapes are model-controlled, so the
/// metaprompt/datasets/compliance payloads stay as raw JSON values; serde
/// defaults keep partial model output parseable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratedArtifact {
    #[serde(default = "empty_metaprompt")]
    pub metaprompt: Value,
    #[serde(default = "empty_object")]
    pub datasets: Value,
    #[serde(default = "empty_object")]
    pub compliance: Value,
    #[serde(default)]
    pub citations: Vec<Citation>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
}

fn empty_object() -> Value {
    json!({})
}

/// A metaprompt skeleton with every required key present and empty-valued.
fn empty_metaprompt() -> Value {
    json!({
        "version": "1.0.0",
        "persona": {},
        "goals": [],
        "policies": {},
        "datasets": [],
        "tools": [],
        "output_contract": {},
        "self_checks": []
    })
}

/// The artifact substituted when synthesis output cannot be parsed.
pub fn fallback_artifact() -> GeneratedArtifact {
    GeneratedArtifact {
        metaprompt: empty_metaprompt(),
        datasets: empty_object(),
        compliance: empty_object(),
        citations: Vec::new(),
        confidence: Some(0.5),
    }
}

/// Extracts the largest brace-delimited substring, tolerating surrounding
/// prose and code fences.
pub fn extract_json(text: &str) -> Option<&str> {
    let text = strip_json_fences(text);
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (end > start).then(|| &text[start..=end])
}

/// Strict parse of the extracted JSON; `None` when no artifact can be read.
pub fn try_parse_artifact(raw: &str) -> Option<GeneratedArtifact> {
    extract_json(raw).and_then(|json| serde_json::from_str(json).ok())
}

/// Parses the synthesis output, substituting the fallback artifact on failure.
pub fn parse_artifact(raw: &str) -> GeneratedArtifact {
    match try_parse_artifact(raw) {
        Some(artifact) => artifact,
        None => {
            warn!("Synthesis output was not parseable JSON; substituting fallback artifact");
            fallback_artifact()
        }
    }
}

/// Appends the retrieval-derived citations to whatever the model emitted.
/// Append, never replace: model citations are kept in front.
pub fn merge_citations(artifact: &mut GeneratedArtifact, retrieved: &[Citation]) {
    artifact.citations.extend_from_slice(retrieved);
}
