//! Axum handler for the single action-dispatch endpoint.
//!
//! `generate` fails closed: the caller must own both the project and the
//! conversation before the pipeline runs.

use std::collections::BTreeMap;

use axum::{
    extract::State,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::PgPool;
use uuid::Uuid;

use crate::errors::AppError;
use crate::generation::evidence::Citation;
use crate::generation::generator::{run_pipeline, LatencyMetrics, PipelineOutcome};
use crate::generation::grading::FinalScores;
use crate::generation::intake::IntakeRecord;
use crate::interview::run_interview;
use crate::models::record::PromptRecordRow;
use crate::state::AppState;

const HISTORY_LIMIT: i64 = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    Interview,
    Generate,
    GetHistory,
}

/// Request body for POST /api/v1/architect. `user_id` is the verified caller
/// identity forwarded by the upstream auth layer.
#[derive(Debug, Deserialize)]
pub struct ArchitectRequest {
    pub action: Action,
    pub user_id: Uuid,
    pub session_id: Option<Uuid>,
    pub project_id: Option<Uuid>,
    pub conversation_id: Option<Uuid>,
    #[serde(default)]
    pub user_message: String,
    #[serde(default)]
    pub collected: BTreeMap<String, String>,
}

#[derive(Debug, Serialize)]
pub struct References {
    pub kb_chunks: usize,
    pub historical_prompts: usize,
}

#[derive(Debug, Serialize)]
pub struct GenerateResponse {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub metaprompt: Value,
    pub datasets: Value,
    pub compliance: Value,
    pub citations: Vec<Citation>,
    pub scores: FinalScores,
    pub confidence: f64,
    pub latency_metrics: LatencyMetrics,
    pub id: Uuid,
    pub collected: IntakeRecord,
    pub references: References,
}

impl GenerateResponse {
    fn from_outcome(outcome: PipelineOutcome, collected: IntakeRecord) -> Self {
        Self {
            kind: "generated",
            metaprompt: outcome.artifact.metaprompt,
            datasets: outcome.artifact.datasets,
            compliance: outcome.artifact.compliance,
            citations: outcome.artifact.citations,
            scores: outcome.scores,
            confidence: outcome.confidence,
            latency_metrics: outcome.latency,
            id: outcome.record_id,
            collected,
            references: References {
                kb_chunks: outcome.kb_chunks_used,
                historical_prompts: outcome.historical_used,
            },
        }
    }
}

#[derive(Debug, Serialize)]
pub struct HistoryResponse {
    pub prompts: Vec<PromptRecordRow>,
}

/// POST /api/v1/architect
///
/// Single dispatch endpoint for the interview, generation, and history
/// actions of the prompt architect.
pub async fn handle_architect(
    State(state): State<AppState>,
    Json(request): Json<ArchitectRequest>,
) -> Result<Response, AppError> {
    let intake = IntakeRecord::from_collected(&request.collected)?;

    match request.action {
        Action::Interview => {
            let session_id = request
                .session_id
                .ok_or_else(|| AppError::Validation("session_id required".to_string()))?;
            let reply = run_interview(
                &state.db,
                &state.llm,
                session_id,
                &request.user_message,
                &intake,
                &state.profile,
            )
            .await?;
            Ok(Json(reply).into_response())
        }
        Action::Generate => {
            let project_id = request
                .project_id
                .ok_or_else(|| AppError::Validation("project_id required".to_string()))?;
            let conversation_id = request
                .conversation_id
                .ok_or_else(|| AppError::Validation("conversation_id required".to_string()))?;

            verify_project_ownership(&state.db, project_id, request.user_id).await?;
            verify_conversation_ownership(&state.db, conversation_id, request.user_id).await?;

            let outcome = run_pipeline(
                &state.db,
                &state.llm,
                state.embeddings.as_ref(),
                state.evidence.as_ref(),
                project_id,
                conversation_id,
                &request.user_message,
                &intake,
            )
            .await?;

            Ok(Json(GenerateResponse::from_outcome(outcome, intake)).into_response())
        }
        Action::GetHistory => {
            let project_id = request
                .project_id
                .ok_or_else(|| AppError::Validation("project_id required".to_string()))?;
            verify_project_ownership(&state.db, project_id, request.user_id).await?;

            let prompts = fetch_history(&state.db, project_id).await?;
            Ok(Json(HistoryResponse { prompts }).into_response())
        }
    }
}

/// Ownership checks fail closed: a missing row is Forbidden, not NotFound,
/// so existence is not leaked to non-owners.
async fn verify_project_ownership(
    pool: &PgPool,
    project_id: Uuid,
    user_id: Uuid,
) -> Result<(), AppError> {
    let row: Option<(Uuid,)> =
        sqlx::query_as("SELECT id FROM projects WHERE id = $1 AND user_id = $2")
            .bind(project_id)
            .bind(user_id)
            .fetch_optional(pool)
            .await?;
    row.map(|_| ()).ok_or(AppError::Forbidden)
}

async fn verify_conversation_ownership(
    pool: &PgPool,
    conversation_id: Uuid,
    user_id: Uuid,
) -> Result<(), AppError> {
    let row: Option<(Uuid,)> =
        sqlx::query_as("SELECT id FROM conversations WHERE id = $1 AND user_id = $2")
            .bind(conversation_id)
            .bind(user_id)
            .fetch_optional(pool)
            .await?;
    row.map(|_| ()).ok_or(AppError::Forbidden)
}

async fn fetch_history(pool: &PgPool, project_id: Uuid) -> Result<Vec<PromptRecordRow>, AppError> {
    let prompts = sqlx::query_as::<_, PromptRecordRow>(
        r#"
        SELECT id, project_id, conversation_id, prompt_text, synthesized_prompt,
               metadata, scores, total_score, features, created_at
        FROM prompt_records
        WHERE project_id = $1
        ORDER BY created_at DESC
        LIMIT $2
        "#,
    )
    .bind(project_id)
    .bind(HISTORY_LIMIT)
    .fetch_all(pool)
    .await?;
    Ok(prompts)
}
