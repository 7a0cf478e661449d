//! Request and response models for the workflow boundary
//!
//! Mirrors the JSON contract served over HTTP: a length-bounded query, a
//! bounded result cap and a role list in; the answer, scored evidence,
//! review status, timing and the ordered step log out.

use serde::{Deserialize, Serialize};

use crate::errors::{RagError, Result};
use crate::hitl::HitlReview;
use crate::retrieval::RetrievedDocument;

/// Maximum query length in characters
pub const MAX_QUERY_CHARS: usize = 500;

/// Bounds for the result cap
pub const MAX_RESULTS_RANGE: std::ops::RangeInclusive<usize> = 1..=20;

fn default_max_results() -> usize {
    5
}

fn default_user_roles() -> Vec<String> {
    vec!["public".to_string()]
}

/// A workflow run request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExperimentRequest {
    /// Search query
    pub query: String,

    /// Maximum number of documents to retrieve
    #[serde(default = "default_max_results")]
    pub max_results: usize,

    /// Caller roles for permission-aware retrieval
    #[serde(default = "default_user_roles")]
    pub user_roles: Vec<String>,
}

impl ExperimentRequest {
    /// Create a request with default result cap and roles
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            max_results: default_max_results(),
            user_roles: default_user_roles(),
        }
    }

    /// Validate field bounds, reporting the offending field by name
    pub fn validate(&self) -> Result<()> {
        let query_chars = self.query.chars().count();
        if query_chars == 0 {
            return Err(RagError::InvalidRequest(
                "query: must not be empty".to_string(),
            ));
        }
        if query_chars > MAX_QUERY_CHARS {
            return Err(RagError::InvalidRequest(format!(
                "query: at most {} characters, got {}",
                MAX_QUERY_CHARS, query_chars
            )));
        }
        if !MAX_RESULTS_RANGE.contains(&self.max_results) {
            return Err(RagError::InvalidRequest(format!(
                "max_results: must be in {}..={}, got {}",
                MAX_RESULTS_RANGE.start(),
                MAX_RESULTS_RANGE.end(),
                self.max_results
            )));
        }
        Ok(())
    }
}

/// A completed workflow run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExperimentResponse {
    /// Generated answer, or a fixed pending/no-evidence message
    pub answer: String,

    /// Evidence documents backing the answer
    pub sources: Vec<RetrievedDocument>,

    /// Whether human review is required before the answer is trusted
    pub requires_review: bool,

    /// Review details when review is required
    pub hitl_review: Option<HitlReview>,

    /// Processing time in milliseconds
    pub processing_time_ms: f64,

    /// Request identifier
    pub request_id: String,

    /// Ordered log of workflow steps taken
    pub workflow_steps: Vec<String>,
}
