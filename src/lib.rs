//! kokkai-rag - RAG workflow engine over National Diet proceedings
//!
//! Answers natural-language questions over a corpus of Diet speeches:
//!
//! - **retrieval**: hybrid BM25 + character-overlap search with weighted
//!   reciprocal-rank fusion
//! - **grading**: binary relevance verdicts with explainable reasons
//! - **rewrite**: bounded deterministic query expansion
//! - **hitl**: human-in-the-loop gate for sensitive or low-confidence
//!   requests
//! - **generation**: grounded answer synthesis via Ollama with graceful
//!   fallback
//! - **workflow**: the finite-state orchestrator tying it all together

// Core pipeline
pub mod config;
pub mod errors;
pub mod corpus;
pub mod retrieval;
pub mod grading;
pub mod rewrite;
pub mod hitl;
pub mod generation;
pub mod workflow;

// Re-export commonly used types
pub use errors::{RagError, Result};

// Boundary and ambient layers
pub mod api;
pub mod telemetry;
pub mod server;
pub mod fetch;
pub mod doctor;
pub mod cli;
