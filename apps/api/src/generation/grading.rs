//! Rubric grading - invokes the grading model against the serialized artifact
//! and computes the weighted composite score.
//!
//! The weight table is fixed and shared by grade and re-grade calls; grading
//! output that fails to parse falls back to a neutral default vector instead
//! of failing the request.

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::errors::AppError;
use crate::generation::prompts::GRADING_SYSTEM;
use crate::generation::validator::{extract_json, GeneratedArtifact};
use crate::llm_client::{LlmClient, GRADING_MODEL};

/// Rubric dimension weights. Must sum to 1.0.
pub const W_INTENT_ACCURACY: f64 = 0.30;
pub const W_TASK_COMPLETION: f64 = 0.25;
pub const W_POLICY_ADHERENCE: f64 = 0.20;
pub const W_TONE_FIT: f64 = 0.15;
pub const W_FORMAT_COMPLIANCE: f64 = 0.10;

/// Dimensions scoring below this are named as refinement targets.
pub const WEAK_DIMENSION_FLOOR: f64 = 0.80;

/// One grading pass: the five rubric dimensions plus the grader's own
/// confidence. Field names match the grading model's JSON exactly.
/// Always replaced as a whole unit, never partially updated.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoreVector {
    #[serde(rename = "IntentAccuracy")]
    pub intent_accuracy: f64,
    #[serde(rename = "TaskCompletion")]
    pub task_completion: f64,
    #[serde(rename = "PolicyAdherence")]
    pub policy_adherence: f64,
    #[serde(rename = "ToneFit")]
    pub tone_fit: f64,
    #[serde(rename = "FormatCompliance")]
    pub format_compliance: f64,
    #[serde(default = "default_confidence")]
    pub confidence: f64,
}

fn default_confidence() -> f64 {
    0.85
}

impl Default for ScoreVector {
    /// Neutral fallback used when grading output cannot be parsed.
    fn default() -> Self {
        Self {
            intent_accuracy: 0.85,
            task_completion: 0.85,
            policy_adherence: 0.85,
            tone_fit: 0.80,
            format_compliance: 0.90,
            confidence: 0.85,
        }
    }
}

impl ScoreVector {
    /// Weighted composite over the fixed rubric weights.
    pub fn composite(&self) -> f64 {
        self.intent_accuracy * W_INTENT_ACCURACY
            + self.task_completion * W_TASK_COMPLETION
            + self.policy_adherence * W_POLICY_ADHERENCE
            + self.tone_fit * W_TONE_FIT
            + self.format_compliance * W_FORMAT_COMPLIANCE
    }

    /// Rubric dimensions below [`WEAK_DIMENSION_FLOOR`], in rubric order.
    /// The grader's confidence is not a rubric dimension and never appears.
    pub fn weak_dimensions(&self) -> Vec<&'static str> {
        let dims = [
            ("IntentAccuracy", self.intent_accuracy),
            ("TaskCompletion", self.task_completion),
            ("PolicyAdherence", self.policy_adherence),
            ("ToneFit", self.tone_fit),
            ("FormatCompliance", self.format_compliance),
        ];
        dims.into_iter()
            .filter(|(_, value)| *value < WEAK_DIMENSION_FLOOR)
            .map(|(name, _)| name)
            .collect()
    }
}

/// A score vector plus its derived composite, as persisted and returned.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FinalScores {
    #[serde(flatten)]
    pub vector: ScoreVector,
    pub composite: f64,
}

impl From<ScoreVector> for FinalScores {
    fn from(vector: ScoreVector) -> Self {
        Self {
            composite: vector.composite(),
            vector,
        }
    }
}

/// Grades the artifact. HTTP failures propagate; unparseable grading output
/// falls back to the neutral default vector.
pub async fn grade(llm: &LlmClient, artifact: &GeneratedArtifact) -> Result<ScoreVector, AppError> {
    let serialized = serde_json::to_string_pretty(artifact)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("Failed to serialize artifact: {e}")))?;
    let prompt = format!("Grade this:\n\n{serialized}");

    let text = llm.complete(GRADING_MODEL, GRADING_SYSTEM, &prompt).await?;
    Ok(parse_scores(&text))
}

/// Parses a grading reply, substituting the neutral default on failure.
pub fn parse_scores(text: &str) -> ScoreVector {
    match extract_json(text).and_then(|json| serde_json::from_str(json).ok()) {
        Some(scores) => scores,
        None => {
            warn!("Grading output was not parseable JSON; substituting neutral default scores");
            ScoreVector::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-9;

    fn vector(values: [f64; 5]) -> ScoreVector {
        ScoreVector {
            intent_accuracy: values[0],
            task_completion: values[1],
            policy_adherence: values[2],
            tone_fit: values[3],
            format_compliance: values[4],
            confidence: 0.85,
        }
    }

    #[test]
    fn test_weights_sum_to_one() {
        let sum = W_INTENT_ACCURACY
            + W_TASK_COMPLETION
            + W_POLICY_ADHERENCE
            + W_TONE_FIT
            + W_FORMAT_COMPLIANCE;
        assert!((sum - 1.0).abs() < EPS);
    }

    #[test]
    fn test_composite_of_uniform_vector_equals_the_value() {
        let scores = vector([0.7; 5]);
        assert!((scores.composite() - 0.7).abs() < EPS);
    }

    #[test]
    fn test_composite_is_a_convex_combination() {
        let samples = [
            [0.9, 0.85, 0.9, 0.8, 0.95],
            [0.1, 0.99, 0.5, 0.4, 0.7],
            [0.0, 0.0, 1.0, 1.0, 0.5],
        ];
        for values in samples {
            let scores = vector(values);
            let min = values.iter().cloned().fold(f64::INFINITY, f64::min);
            let max = values.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
            let composite = scores.composite();
            assert!(composite >= min - EPS && composite <= max + EPS);
        }
    }

    #[test]
    fn test_composite_weighting_is_exact() {
        let scores = vector([0.9, 0.85, 0.9, 0.8, 0.95]);
        let expected = 0.9 * 0.30 + 0.85 * 0.25 + 0.9 * 0.20 + 0.8 * 0.15 + 0.95 * 0.10;
        assert!((scores.composite() - expected).abs() < EPS);
    }

    #[test]
    fn test_default_vector_is_the_documented_neutral_fallback() {
        let scores = ScoreVector::default();
        assert!((scores.intent_accuracy - 0.85).abs() < EPS);
        assert!((scores.task_completion - 0.85).abs() < EPS);
        assert!((scores.policy_adherence - 0.85).abs() < EPS);
        assert!((scores.tone_fit - 0.80).abs() < EPS);
        assert!((scores.format_compliance - 0.90).abs() < EPS);
        assert!((scores.confidence - 0.85).abs() < EPS);
        assert!((scores.composite() - 0.8475).abs() < EPS);
    }

    #[test]
    fn test_parse_scores_reads_model_json() {
        let text = r#"{"IntentAccuracy":0.9,"TaskCompletion":0.85,"PolicyAdherence":0.9,"ToneFit":0.8,"FormatCompliance":0.95,"confidence":0.88}"#;
        let scores = parse_scores(text);
        assert!((scores.intent_accuracy - 0.9).abs() < EPS);
        assert!((scores.confidence - 0.88).abs() < EPS);
    }

    #[test]
    fn test_parse_scores_defaults_confidence_when_absent() {
        let text = r#"{"IntentAccuracy":0.9,"TaskCompletion":0.85,"PolicyAdherence":0.9,"ToneFit":0.8,"FormatCompliance":0.95}"#;
        let scores = parse_scores(text);
        assert!((scores.confidence - 0.85).abs() < EPS);
    }

    #[test]
    fn test_parse_scores_falls_back_on_garbage() {
        let scores = parse_scores("the grade is: pretty good");
        assert_eq!(scores, ScoreVector::default());
    }

    #[test]
    fn test_parse_scores_falls_back_on_missing_dimension() {
        let text = r#"{"IntentAccuracy":0.9,"TaskCompletion":0.85}"#;
        assert_eq!(parse_scores(text), ScoreVector::default());
    }

    #[test]
    fn test_weak_dimensions_exclude_confidence_and_keep_order() {
        let mut scores = vector([0.9, 0.7, 0.9, 0.5, 0.9]);
        scores.confidence = 0.1;
        assert_eq!(scores.weak_dimensions(), vec!["TaskCompletion", "ToneFit"]);
    }

    #[test]
    fn test_final_scores_carry_composite() {
        let finals: FinalScores = vector([0.8; 5]).into();
        assert!((finals.composite - 0.8).abs() < EPS);
        let json = serde_json::to_value(finals).unwrap();
        assert!(json.get("IntentAccuracy").is_some());
        assert!(json.get("composite").is_some());
    }
}
