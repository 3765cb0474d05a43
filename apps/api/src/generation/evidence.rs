//! Evidence assembly - formats reranked chunks and historical artifacts into
//! the prompt evidence block, building the parallel citation list in lockstep.
//!
//! The text and the citation list stay in 1:1 positional correspondence: one
//! citation per entry written into the block, in the order written. Duplicate
//! citations are allowed; no dedup pass runs here.

use std::fmt::Write;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::generation::fusion::FusedCandidate;
use crate::generation::retrieval::HistoricalArtifact;

/// Historical artifact bodies are truncated to this many chars in the block.
pub const HISTORY_SNIPPET_CHARS: usize = 400;

const CITATION_VERSION: &str = "1.0";

/// A provenance record linking an artifact back to one evidence unit.
/// Immutable once created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Citation {
    #[serde(default)]
    pub uri: String,
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub hash: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

impl Citation {
    pub fn for_chunk(chunk: &FusedCandidate) -> Self {
        Self {
            uri: format!("kb://chunk/{}", chunk.id),
            version: CITATION_VERSION.to_string(),
            hash: short_hash(chunk.id),
            source: chunk.source_name.clone(),
        }
    }

    pub fn for_artifact(artifact: &HistoricalArtifact) -> Self {
        Self {
            uri: format!("prompt://record/{}", artifact.id),
            version: CITATION_VERSION.to_string(),
            hash: short_hash(artifact.id),
            source: Some("historical_prompt".to_string()),
        }
    }
}

/// Short deterministic fingerprint: the leading 8 hex chars of the id.
fn short_hash(id: Uuid) -> String {
    id.to_string().chars().take(8).collect()
}

/// The assembled evidence block and its positionally parallel citations.
#[derive(Debug, Clone, Default)]
pub struct AssembledEvidence {
    pub text: String,
    pub citations: Vec<Citation>,
}

/// Formats reranked chunks and historical artifacts into one bounded evidence
/// block, deriving one citation per included entry.
pub fn assemble(chunks: &[FusedCandidate], historical: &[HistoricalArtifact]) -> AssembledEvidence {
    let mut text = String::from(
        "\n=======================\nRETRIEVED EVIDENCE\n=======================\n",
    );
    let mut citations = Vec::with_capacity(chunks.len() + historical.len());

    if !chunks.is_empty() {
        text.push_str("\nKNOWLEDGE BASE (top chunks by hybrid retrieval + re-ranking):\n\n");
        for (i, chunk) in chunks.iter().enumerate() {
            let label = chunk.source_name.as_deref().unwrap_or("KB");
            let _ = writeln!(
                text,
                "[{}] {} (score: {:.2})\n{}\n",
                i + 1,
                label,
                chunk.score,
                chunk.text
            );
            citations.push(Citation::for_chunk(chunk));
        }
    }

    if !historical.is_empty() {
        text.push_str("\nHIGH-PERFORMING HISTORICAL PROMPTS:\n\n");
        for (i, artifact) in historical.iter().enumerate() {
            let _ = writeln!(
                text,
                "[Example {}] Score: {:.2}\n{}...\n",
                i + 1,
                artifact.total_score,
                snippet(&artifact.synthesized_prompt, HISTORY_SNIPPET_CHARS)
            );
            citations.push(Citation::for_artifact(artifact));
        }
    }

    AssembledEvidence { text, citations }
}

/// First `max_chars` chars of `text`, respecting char boundaries.
fn snippet(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((byte_index, _)) => &text[..byte_index],
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunk(n: u128, source: Option<&str>, body: &str, score: f32) -> FusedCandidate {
        FusedCandidate {
            id: Uuid::from_u128(n),
            text: body.to_string(),
            source_name: source.map(str::to_string),
            score,
        }
    }

    fn artifact(n: u128, body: &str, score: f64) -> HistoricalArtifact {
        HistoricalArtifact {
            id: Uuid::from_u128(n),
            synthesized_prompt: body.to_string(),
            total_score: score,
        }
    }

    #[test]
    fn test_citations_parallel_included_entries_in_order() {
        let chunks = vec![
            chunk(1, Some("best_practices"), "alpha", 0.7),
            chunk(2, None, "beta", 0.6),
        ];
        let historical = vec![artifact(3, "old prompt", 0.82)];

        let assembled = assemble(&chunks, &historical);
        assert_eq!(assembled.citations.len(), 3);
        assert_eq!(
            assembled.citations[0].uri,
            format!("kb://chunk/{}", Uuid::from_u128(1))
        );
        assert_eq!(
            assembled.citations[1].uri,
            format!("kb://chunk/{}", Uuid::from_u128(2))
        );
        assert_eq!(
            assembled.citations[2].uri,
            format!("prompt://record/{}", Uuid::from_u128(3))
        );
    }

    #[test]
    fn test_chunk_citation_fields() {
        let citation = Citation::for_chunk(&chunk(1, Some("best_practices"), "alpha", 0.7));
        assert_eq!(citation.version, "1.0");
        assert_eq!(citation.hash.len(), 8);
        assert_eq!(citation.source.as_deref(), Some("best_practices"));
        assert!(citation.uri.starts_with("kb://chunk/"));
    }

    #[test]
    fn test_artifact_citation_is_tagged_historical() {
        let citation = Citation::for_artifact(&artifact(9, "body", 0.9));
        assert_eq!(citation.source.as_deref(), Some("historical_prompt"));
        assert!(citation.uri.starts_with("prompt://record/"));
    }

    #[test]
    fn test_hash_is_prefix_of_id() {
        let id = Uuid::from_u128(0xabcdef0123456789abcdef0123456789);
        let citation = Citation::for_chunk(&chunk(
            0xabcdef0123456789abcdef0123456789,
            None,
            "x",
            0.5,
        ));
        assert!(id.to_string().starts_with(&citation.hash));
    }

    #[test]
    fn test_historical_bodies_are_truncated() {
        let long_body = "y".repeat(2000);
        let assembled = assemble(&[], &[artifact(1, &long_body, 0.8)]);
        // Block holds at most the snippet, not the full body.
        assert!(!assembled.text.contains(&long_body));
        assert!(assembled.text.contains(&"y".repeat(HISTORY_SNIPPET_CHARS)));
    }

    #[test]
    fn test_snippet_respects_char_boundaries() {
        let text = "héllo wörld".repeat(100);
        let cut = snippet(&text, HISTORY_SNIPPET_CHARS);
        assert_eq!(cut.chars().count(), HISTORY_SNIPPET_CHARS);
    }

    #[test]
    fn test_zero_evidence_yields_header_only_and_no_citations() {
        let assembled = assemble(&[], &[]);
        assert!(assembled.citations.is_empty());
        assert!(assembled.text.contains("RETRIEVED EVIDENCE"));
        assert!(!assembled.text.contains("KNOWLEDGE BASE"));
        assert!(!assembled.text.contains("HISTORICAL"));
    }

    #[test]
    fn test_chunk_without_source_uses_kb_label() {
        let assembled = assemble(&[chunk(1, None, "alpha", 0.5)], &[]);
        assert!(assembled.text.contains("[1] KB (score: 0.50)"));
    }
}
