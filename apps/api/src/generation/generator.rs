//! Pipeline orchestration - runs the nine stages of a generation request.
//!
//! Flow: hybrid retrieval -> fusion + rerank -> evidence assembly -> synthesis
//! draft -> validation + citation merge -> grading -> refinement gate (0 or 1
//! pass) -> persistence -> response shaping.
//!
//! Stages are strictly sequential; each invocation owns its own candidate map,
//! evidence buffer, and score vector. Per-stage wall-clock durations are
//! recorded and surfaced, never enforced as hard deadlines.

use std::time::Instant;

use serde::Serialize;
use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;

use crate::embeddings::EmbeddingsClient;
use crate::errors::AppError;
use crate::generation::evidence::assemble;
use crate::generation::fusion::{fuse, rerank, HYBRID_LAMBDA, RERANK_TOP};
use crate::generation::grading::{grade, FinalScores};
use crate::generation::intake::IntakeRecord;
use crate::generation::persist::{store_record, RecordDraft};
use crate::generation::prompts::{SYNTHESIS_PROMPT_TEMPLATE, SYNTHESIS_SYSTEM};
use crate::generation::refine::{control, gate, Gate};
use crate::generation::retrieval::{retrieve, EvidenceStore};
use crate::generation::validator::{merge_citations, parse_artifact, GeneratedArtifact};
use crate::llm_client::{LlmClient, SYNTHESIS_MODEL};

/// Version tag stamped into every persisted record.
pub const PIPELINE_VERSION: &str = "1.0.0";

/// Per-stage wall-clock durations for one generation run.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct LatencyMetrics {
    pub retrieve_ms: u64,
    pub rerank_ms: u64,
    pub draft_ms: u64,
    pub validate_ms: u64,
    pub grade_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refine_ms: Option<u64>,
    pub total_ms: u64,
}

/// Everything a successful run produces, ready for response shaping.
#[derive(Debug, Clone)]
pub struct PipelineOutcome {
    pub record_id: Uuid,
    pub artifact: GeneratedArtifact,
    pub scores: FinalScores,
    pub confidence: f64,
    pub latency: LatencyMetrics,
    pub kb_chunks_used: usize,
    pub historical_used: usize,
}

/// Runs the full generation pipeline for one validated intake record and
/// persists the result. Persistence failure fails the whole request: an
/// artifact without a retrievable record must not be served.
#[allow(clippy::too_many_arguments)]
pub async fn run_pipeline(
    pool: &PgPool,
    llm: &LlmClient,
    embedder: Option<&EmbeddingsClient>,
    store: &dyn EvidenceStore,
    project_id: Uuid,
    conversation_id: Uuid,
    user_message: &str,
    intake: &IntakeRecord,
) -> Result<PipelineOutcome, AppError> {
    intake.require_core()?;

    let run_started = Instant::now();
    let mut latency = LatencyMetrics::default();

    // Stage 1: hybrid retrieval (degrades, never fails)
    info!("Starting hybrid retrieval for project {project_id}");
    let stage = Instant::now();
    let evidence = retrieve(store, embedder, intake, project_id).await;
    latency.retrieve_ms = stage.elapsed().as_millis() as u64;

    // Stage 2: fusion + rerank
    let stage = Instant::now();
    let fused = fuse(&evidence.dense, &evidence.sparse, HYBRID_LAMBDA);
    let reranked = rerank(fused, RERANK_TOP);
    latency.rerank_ms = stage.elapsed().as_millis() as u64;

    // Stage 3: evidence assembly
    let assembled = assemble(&reranked, &evidence.historical);
    info!(
        "Evidence assembled: kb_chunks={}, historical={}",
        reranked.len(),
        evidence.historical.len()
    );

    // Stage 4: synthesis draft
    let stage = Instant::now();
    let prompt = build_synthesis_prompt(intake, &assembled.text);
    let raw = llm.complete(SYNTHESIS_MODEL, SYNTHESIS_SYSTEM, &prompt).await?;
    latency.draft_ms = stage.elapsed().as_millis() as u64;

    // Stage 5: validation + citation merge
    let stage = Instant::now();
    let mut artifact = parse_artifact(&raw);
    merge_citations(&mut artifact, &assembled.citations);
    latency.validate_ms = stage.elapsed().as_millis() as u64;

    // Stage 6: grading
    let stage = Instant::now();
    let scores: FinalScores = grade(llm, &artifact).await?.into();
    latency.grade_ms = stage.elapsed().as_millis() as u64;
    info!("Initial composite score: {:.2}", scores.composite);

    // Stage 7: refinement gate (0 or 1 pass)
    let decision = gate(scores.composite);
    let stage = Instant::now();
    let outcome = control(llm, artifact, scores, &assembled.citations).await?;
    if decision == Gate::NeedsRefinement {
        latency.refine_ms = Some(stage.elapsed().as_millis() as u64);
    }

    latency.total_ms = run_started.elapsed().as_millis() as u64;

    // Stage 8: persist exactly one immutable record
    let confidence = outcome
        .artifact
        .confidence
        .unwrap_or(outcome.scores.vector.confidence);
    let record_id = store_record(
        pool,
        RecordDraft {
            project_id,
            conversation_id,
            prompt_text: user_message,
            artifact: &outcome.artifact,
            scores: &outcome.scores,
            collected: intake,
            kb_chunks_used: reranked.len(),
            historical_used: evidence.historical.len(),
            latency: &latency,
            below_floor: outcome.below_floor,
        },
    )
    .await?;

    info!(
        "Generation complete: record={record_id}, composite={:.2}, refined={}",
        outcome.scores.composite, outcome.refined
    );

    Ok(PipelineOutcome {
        record_id,
        artifact: outcome.artifact,
        scores: outcome.scores,
        confidence,
        latency,
        kb_chunks_used: reranked.len(),
        historical_used: evidence.historical.len(),
    })
}

/// Fills the synthesis template with intake fields and the evidence block.
/// Optional fields carry documented prompt defaults.
fn build_synthesis_prompt(intake: &IntakeRecord, evidence: &str) -> String {
    SYNTHESIS_PROMPT_TEMPLATE
        .replace("{goal}", intake.field_or("Goal", ""))
        .replace("{audience}", intake.field_or("Audience", ""))
        .replace("{inputs}", intake.field_or("Inputs", ""))
        .replace("{output_format}", intake.field_or("Output_Format", ""))
        .replace("{constraints}", intake.field_or("Constraints", ""))
        .replace("{style}", intake.field_or("Style", "Professional"))
        .replace("{guardrails}", intake.field_or("Guardrails", "Standard safety"))
        .replace(
            "{business_context}",
            intake.field_or("Business_Context", "Not specified"),
        )
        .replace(
            "{brand_voice}",
            intake.field_or("Brand_Voice", "Professional, helpful"),
        )
        .replace(
            "{success_metrics}",
            intake.field_or("Success_Metrics", "User satisfaction"),
        )
        .replace("{evidence}", evidence)
}
