use std::sync::Arc;

use sqlx::PgPool;

use crate::embeddings::EmbeddingsClient;
use crate::generation::intake::FieldProfile;
use crate::generation::retrieval::EvidenceStore;
use crate::llm_client::LlmClient;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    pub llm: LlmClient,
    /// Absent when no embeddings key is configured; retrieval degrades to sparse-only.
    pub embeddings: Option<EmbeddingsClient>,
    /// Pluggable evidence store. Default: PgEvidenceStore over kb_chunks/prompt_records.
    pub evidence: Arc<dyn EvidenceStore>,
    /// Field set the interview drives toward. Selected via INTERVIEW_PROFILE env.
    pub profile: FieldProfile,
}
