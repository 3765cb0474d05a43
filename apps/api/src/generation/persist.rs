//! Persistence adapter - writes the final artifact, scores, citations, and
//! run metadata as one immutable record. Insert failure is fatal to the
//! request; no partial rows are left behind.

use serde_json::json;
use sqlx::PgPool;
use uuid::Uuid;

use crate::errors::AppError;
use crate::generation::generator::{LatencyMetrics, PIPELINE_VERSION};
use crate::generation::grading::FinalScores;
use crate::generation::intake::IntakeRecord;
use crate::generation::validator::GeneratedArtifact;
use crate::llm_client::{GRADING_MODEL, SYNTHESIS_MODEL};

/// Everything one record insert needs.
pub struct RecordDraft<'a> {
    pub project_id: Uuid,
    pub conversation_id: Uuid,
    pub prompt_text: &'a str,
    pub artifact: &'a GeneratedArtifact,
    pub scores: &'a FinalScores,
    pub collected: &'a IntakeRecord,
    pub kb_chunks_used: usize,
    pub historical_used: usize,
    pub latency: &'a LatencyMetrics,
    pub below_floor: bool,
}

/// Inserts exactly one prompt record and returns its id.
pub async fn store_record(pool: &PgPool, draft: RecordDraft<'_>) -> Result<Uuid, AppError> {
    let synthesized_prompt = serde_json::to_string_pretty(&draft.artifact.metaprompt)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("Failed to serialize metaprompt: {e}")))?;

    let metadata = json!({
        "datasets": draft.artifact.datasets,
        "compliance": draft.artifact.compliance,
        "citations": draft.artifact.citations,
        "collected_fields": draft.collected,
        "kb_chunks_used": draft.kb_chunks_used,
        "historical_prompts_used": draft.historical_used,
        "latency_metrics": draft.latency,
        "pipeline_version": PIPELINE_VERSION,
        "models_used": { "synthesis": SYNTHESIS_MODEL, "grading": GRADING_MODEL },
        "below_floor": draft.below_floor,
    });

    let scores = serde_json::to_value(draft.scores)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("Failed to serialize scores: {e}")))?;
    let features = serde_json::to_value(draft.collected)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("Failed to serialize intake: {e}")))?;

    let prompt_text = if draft.prompt_text.trim().is_empty() {
        "Generated from interview"
    } else {
        draft.prompt_text
    };

    let (record_id,): (Uuid,) = sqlx::query_as(
        r#"
        INSERT INTO prompt_records
            (project_id, conversation_id, prompt_text, synthesized_prompt,
             metadata, scores, total_score, features)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        RETURNING id
        "#,
    )
    .bind(draft.project_id)
    .bind(draft.conversation_id)
    .bind(prompt_text)
    .bind(&synthesized_prompt)
    .bind(&metadata)
    .bind(&scores)
    .bind(draft.scores.composite)
    .bind(&features)
    .fetch_one(pool)
    .await?;

    Ok(record_id)
}
