// Metaprompt generation pipeline.
// Implements: hybrid retrieval, score fusion + rerank, evidence assembly,
// synthesis, tolerant validation, rubric grading, gated refinement, persistence.
// All model calls go through llm_client - no direct gateway calls here.

pub mod evidence;
pub mod fusion;
pub mod generator;
pub mod grading;
pub mod handlers;
pub mod intake;
pub mod persist;
pub mod prompts;
pub mod refine;
pub mod retrieval;
pub mod validator;
