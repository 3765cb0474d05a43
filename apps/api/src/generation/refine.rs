//! Refinement controller - gates a single refinement + re-grade pass on the
//! composite score.
//!
//! Bands: composite >= 0.75 ships immediately; [0.60, 0.75) earns exactly one
//! refinement invocation targeting the weakest dimensions, accepted only when
//! the re-graded composite improves by at least 0.02; below 0.60 the artifact
//! ships anyway with the condition flagged for downstream escalation. The
//! refinement pass never loops.

use tracing::{info, warn};

use crate::errors::AppError;
use crate::generation::evidence::Citation;
use crate::generation::grading::{grade, FinalScores};
use crate::generation::prompts::{REFINEMENT_PROMPT_TEMPLATE, SYNTHESIS_SYSTEM};
use crate::generation::validator::{merge_citations, try_parse_artifact, GeneratedArtifact};
use crate::llm_client::{LlmClient, SYNTHESIS_MODEL};

/// Composite floor below which refinement is not attempted.
pub const REFINE_MIN: f64 = 0.60;
/// Composite at or above which refinement is skipped entirely.
pub const SKIP_REFINE_IF_OVER: f64 = 0.75;
/// Minimum composite improvement required to accept a refinement.
pub const MIN_UPLIFT: f64 = 0.02;

/// Gating decision for one graded artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Gate {
    Shipped,
    NeedsRefinement,
    BelowFloor,
}

pub fn gate(composite: f64) -> Gate {
    if composite >= SKIP_REFINE_IF_OVER {
        Gate::Shipped
    } else if composite >= REFINE_MIN {
        Gate::NeedsRefinement
    } else {
        Gate::BelowFloor
    }
}

/// Whether a re-graded composite clears the acceptance bar.
pub fn accept_refinement(original: f64, refined: f64) -> bool {
    refined >= original + MIN_UPLIFT
}

/// What leaves the controller: exactly one final artifact and score vector.
#[derive(Debug, Clone)]
pub struct RefinementOutcome {
    pub artifact: GeneratedArtifact,
    pub scores: FinalScores,
    /// True only when a refinement was attempted AND accepted.
    pub refined: bool,
    /// True when the composite fell below the refinement floor; the artifact
    /// ships regardless, but the condition stays observable.
    pub below_floor: bool,
}

/// Runs the gating decision and at most one refinement + re-grade pass.
pub async fn control(
    llm: &LlmClient,
    artifact: GeneratedArtifact,
    scores: FinalScores,
    retrieved: &[Citation],
) -> Result<RefinementOutcome, AppError> {
    match gate(scores.composite) {
        Gate::Shipped => Ok(RefinementOutcome {
            artifact,
            scores,
            refined: false,
            below_floor: false,
        }),
        Gate::BelowFloor => {
            warn!(
                "Composite {:.2} below refinement floor {REFINE_MIN}; shipping flagged artifact",
                scores.composite
            );
            Ok(RefinementOutcome {
                artifact,
                scores,
                refined: false,
                below_floor: true,
            })
        }
        Gate::NeedsRefinement => refine_once(llm, artifact, scores, retrieved).await,
    }
}

/// One refinement invocation. An unparseable refinement reply counts as a
/// rejected refinement and leaves the original artifact and scores untouched.
async fn refine_once(
    llm: &LlmClient,
    artifact: GeneratedArtifact,
    scores: FinalScores,
    retrieved: &[Citation],
) -> Result<RefinementOutcome, AppError> {
    info!(
        "Composite {:.2} inside refinement band; attempting one refinement pass",
        scores.composite
    );

    let prompt = build_refinement_prompt(&artifact, &scores)?;
    let reply = llm.complete(SYNTHESIS_MODEL, SYNTHESIS_SYSTEM, &prompt).await?;

    let Some(mut refined) = try_parse_artifact(&reply) else {
        warn!("Refinement output was not parseable JSON; keeping original artifact");
        return Ok(RefinementOutcome {
            artifact,
            scores,
            refined: false,
            below_floor: false,
        });
    };

    merge_citations(&mut refined, retrieved);

    let regraded: FinalScores = grade(llm, &refined).await?.into();

    if accept_refinement(scores.composite, regraded.composite) {
        info!(
            "Refinement accepted: composite {:.2} -> {:.2}",
            scores.composite, regraded.composite
        );
        Ok(RefinementOutcome {
            artifact: refined,
            scores: regraded,
            refined: true,
            below_floor: false,
        })
    } else {
        info!(
            "Refinement uplift {:.3} below minimum {MIN_UPLIFT}; keeping original artifact",
            regraded.composite - scores.composite
        );
        Ok(RefinementOutcome {
            artifact,
            scores,
            refined: false,
            below_floor: false,
        })
    }
}

fn build_refinement_prompt(
    artifact: &GeneratedArtifact,
    scores: &FinalScores,
) -> Result<String, AppError> {
    let artifact_json = serde_json::to_string_pretty(artifact)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("Failed to serialize artifact: {e}")))?;
    let scores_json = serde_json::to_string(scores)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("Failed to serialize scores: {e}")))?;

    Ok(REFINEMENT_PROMPT_TEMPLATE
        .replace("{composite}", &format!("{:.2}", scores.composite))
        .replace("{weak_dimensions}", &scores.vector.weak_dimensions().join(", "))
        .replace("{artifact}", &artifact_json)
        .replace("{scores}", &scores_json))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generation::grading::ScoreVector;

    #[test]
    fn test_gate_ships_at_or_above_skip_threshold() {
        assert_eq!(gate(0.75), Gate::Shipped);
        assert_eq!(gate(0.90), Gate::Shipped);
    }

    #[test]
    fn test_gate_refines_inside_band() {
        assert_eq!(gate(0.60), Gate::NeedsRefinement);
        assert_eq!(gate(0.70), Gate::NeedsRefinement);
        assert_eq!(gate(0.7499), Gate::NeedsRefinement);
    }

    #[test]
    fn test_gate_flags_below_floor() {
        assert_eq!(gate(0.5999), Gate::BelowFloor);
        assert_eq!(gate(0.0), Gate::BelowFloor);
    }

    #[test]
    fn test_accept_requires_minimum_uplift() {
        assert!(!accept_refinement(0.70, 0.705));
        assert!(!accept_refinement(0.70, 0.70));
        assert!(!accept_refinement(0.70, 0.65));
        assert!(accept_refinement(0.70, 0.72));
        assert!(accept_refinement(0.70, 0.90));
    }

    #[test]
    fn test_refinement_prompt_names_weak_dimensions() {
        let vector = ScoreVector {
            intent_accuracy: 0.9,
            task_completion: 0.7,
            policy_adherence: 0.9,
            tone_fit: 0.6,
            format_compliance: 0.9,
            confidence: 0.85,
        };
        let scores: FinalScores = vector.into();
        let artifact = crate::generation::validator::fallback_artifact();
        let prompt = build_refinement_prompt(&artifact, &scores).unwrap();
        assert!(prompt.contains("TaskCompletion, ToneFit"));
        assert!(prompt.contains(&format!("{:.2}", scores.composite)));
    }
}
