use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::FromRow;
use uuid::Uuid;

/// One persisted generation run. Write-once: later regenerations insert new
/// rows, existing rows are never updated.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct PromptRecordRow {
    pub id: Uuid,
    pub project_id: Uuid,
    pub conversation_id: Option<Uuid>,
    pub prompt_text: String,
    pub synthesized_prompt: String,
    pub metadata: Value,
    pub scores: Value,
    pub total_score: f64,
    pub features: Value,
    pub created_at: DateTime<Utc>,
}
