//! Evidence store client - hybrid (dense + sparse) retrieval over the
//! knowledge base plus high-scoring historical artifacts.
//!
//! Failure policy: dense-path failures (missing embedder, embedding call,
//! vector search) degrade to sparse-only; sparse or historical failures yield
//! empty sets. Retrieval never fails the pipeline - generation proceeds with
//! whatever evidence exists, including none.

use anyhow::Result;
use async_trait::async_trait;
use sqlx::{FromRow, PgPool};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::embeddings::EmbeddingsClient;
use crate::generation::intake::IntakeRecord;

/// Candidate cap per retrieval arm.
pub const K_RETRIEVE: i64 = 12;
/// Minimum cosine similarity for dense matches.
pub const MATCH_THRESHOLD: f64 = 0.5;
/// Fixed similarity assigned to keyword matches.
pub const SPARSE_SIMILARITY: f32 = 0.6;
/// Historical artifacts must score at least this to serve as few-shot evidence.
pub const HISTORICAL_FLOOR: f64 = 0.75;
pub const HISTORICAL_LIMIT: i64 = 3;

/// Which retrieval arm produced a candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    Dense,
    Sparse,
}

/// One retrieved knowledge-base unit with its raw similarity in [0,1].
#[derive(Debug, Clone)]
pub struct EvidenceCandidate {
    pub id: Uuid,
    pub text: String,
    pub source_name: Option<String>,
    pub origin: Origin,
    pub similarity: f32,
}

/// A previously persisted high-scoring artifact, used only as few-shot evidence.
#[derive(Debug, Clone)]
pub struct HistoricalArtifact {
    pub id: Uuid,
    pub synthesized_prompt: String,
    pub total_score: f64,
}

/// Everything one retrieval pass produced.
#[derive(Debug, Clone, Default)]
pub struct RetrievedEvidence {
    pub dense: Vec<EvidenceCandidate>,
    pub sparse: Vec<EvidenceCandidate>,
    pub historical: Vec<HistoricalArtifact>,
}

/// The evidence store boundary. Carried in `AppState` as `Arc<dyn EvidenceStore>`
/// so tests and alternative backends can swap in without touching the pipeline.
#[async_trait]
pub trait EvidenceStore: Send + Sync {
    /// Embedding-similarity search above `threshold`, scoped to one project.
    async fn dense_search(
        &self,
        embedding: &[f32],
        project_id: Uuid,
        threshold: f64,
        limit: i64,
    ) -> Result<Vec<EvidenceCandidate>>;

    /// Keyword full-text search, scoped to one project.
    async fn sparse_search(
        &self,
        terms: &[String],
        project_id: Uuid,
        limit: i64,
    ) -> Result<Vec<EvidenceCandidate>>;

    /// Top historical artifacts scoring at least `floor`, best first.
    async fn historical(
        &self,
        project_id: Uuid,
        floor: f64,
        limit: i64,
    ) -> Result<Vec<HistoricalArtifact>>;
}

// ────────────────────────────────────────────────────────────────────────────
// Postgres implementation
// ────────────────────────────────────────────────────────────────────────────

#[derive(FromRow)]
struct DenseRow {
    id: Uuid,
    text: String,
    source_name: Option<String>,
    similarity: f64,
}

#[derive(FromRow)]
struct SparseRow {
    id: Uuid,
    text: String,
    source_name: Option<String>,
}

#[derive(FromRow)]
struct HistoricalRow {
    id: Uuid,
    synthesized_prompt: String,
    total_score: f64,
}

pub struct PgEvidenceStore {
    pool: PgPool,
}

impl PgEvidenceStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl EvidenceStore for PgEvidenceStore {
    async fn dense_search(
        &self,
        embedding: &[f32],
        project_id: Uuid,
        threshold: f64,
        limit: i64,
    ) -> Result<Vec<EvidenceCandidate>> {
        let rows: Vec<DenseRow> = sqlx::query_as(
            "SELECT id, text, source_name, similarity FROM match_kb_chunks($1, $2, $3, $4)",
        )
        .bind(embedding)
        .bind(threshold)
        .bind(limit)
        .bind(project_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| EvidenceCandidate {
                id: row.id,
                text: row.text,
                source_name: row.source_name,
                origin: Origin::Dense,
                similarity: row.similarity as f32,
            })
            .collect())
    }

    async fn sparse_search(
        &self,
        terms: &[String],
        project_id: Uuid,
        limit: i64,
    ) -> Result<Vec<EvidenceCandidate>> {
        let query = terms.join(" ");
        let rows: Vec<SparseRow> = sqlx::query_as(
            r#"
            SELECT id, text, source_name
            FROM kb_chunks
            WHERE project_id = $1
              AND to_tsvector('english', text) @@ plainto_tsquery('english', $2)
            LIMIT $3
            "#,
        )
        .bind(project_id)
        .bind(&query)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| EvidenceCandidate {
                id: row.id,
                text: row.text,
                source_name: row.source_name,
                origin: Origin::Sparse,
                similarity: SPARSE_SIMILARITY,
            })
            .collect())
    }

    async fn historical(
        &self,
        project_id: Uuid,
        floor: f64,
        limit: i64,
    ) -> Result<Vec<HistoricalArtifact>> {
        let rows: Vec<HistoricalRow> = sqlx::query_as(
            r#"
            SELECT id, synthesized_prompt, total_score
            FROM prompt_records
            WHERE project_id = $1 AND total_score >= $2
            ORDER BY total_score DESC
            LIMIT $3
            "#,
        )
        .bind(project_id)
        .bind(floor)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| HistoricalArtifact {
                id: row.id,
                synthesized_prompt: row.synthesized_prompt,
                total_score: row.total_score,
            })
            .collect())
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Query derivation + retrieval pass
// ────────────────────────────────────────────────────────────────────────────

/// Builds the retrieval query from the intent-bearing intake fields.
pub fn search_terms(intake: &IntakeRecord) -> String {
    format!(
        "{} {} {}",
        intake.field_or("Goal", ""),
        intake.field_or("Audience", ""),
        intake.field_or("Output_Format", "")
    )
    .to_lowercase()
}

/// Splits a query into keyword terms, dropping short stopword-length tokens.
pub fn keyword_terms(query: &str) -> Vec<String> {
    query
        .split_whitespace()
        .filter(|term| term.len() > 3)
        .map(str::to_string)
        .collect()
}

/// Runs one full retrieval pass. Dense and sparse lookups are independent and
/// issued concurrently; each arm degrades to empty on failure.
pub async fn retrieve(
    store: &dyn EvidenceStore,
    embedder: Option<&EmbeddingsClient>,
    intake: &IntakeRecord,
    project_id: Uuid,
) -> RetrievedEvidence {
    let query = search_terms(intake);

    let dense_lookup = async {
        let Some(embedder) = embedder else {
            debug!("No embeddings client configured; skipping dense retrieval");
            return Vec::new();
        };
        let embedding = match embedder.embed(&query).await {
            Ok(v) => v,
            Err(e) => {
                warn!("Embedding failed, degrading to sparse-only retrieval: {e:#}");
                return Vec::new();
            }
        };
        match store
            .dense_search(&embedding, project_id, MATCH_THRESHOLD, K_RETRIEVE)
            .await
        {
            Ok(candidates) => candidates,
            Err(e) => {
                warn!("Dense search failed, degrading to sparse-only retrieval: {e:#}");
                Vec::new()
            }
        }
    };

    let sparse_lookup = async {
        let terms = keyword_terms(&query);
        if terms.is_empty() {
            return Vec::new();
        }
        match store.sparse_search(&terms, project_id, K_RETRIEVE).await {
            Ok(candidates) => candidates,
            Err(e) => {
                warn!("Keyword search failed, continuing without sparse evidence: {e:#}");
                Vec::new()
            }
        }
    };

    let (dense, sparse) = tokio::join!(dense_lookup, sparse_lookup);

    let historical = match store
        .historical(project_id, HISTORICAL_FLOOR, HISTORICAL_LIMIT)
        .await
    {
        Ok(artifacts) => artifacts,
        Err(e) => {
            warn!("Historical lookup failed, continuing without few-shot evidence: {e:#}");
            Vec::new()
        }
    };

    RetrievedEvidence {
        dense,
        sparse,
        historical,
    }
}
