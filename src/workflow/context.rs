//! Per-request workflow context
//!
//! One instance exists per request; it is exclusively owned and mutated
//! by the orchestrator and the node functions it calls, never shared
//! across requests. The step log is append-only and starts with the
//! fixed start marker.

use crate::grading::GradedDocument;
use crate::hitl::HitlReview;
use crate::retrieval::RetrievedDocument;

/// Step log entry marking workflow start
pub const START_STEP: &str = "start";

/// Mutable state threaded through one workflow run
#[derive(Debug, Clone)]
pub struct WorkflowContext {
    /// Original query as submitted by the caller
    pub query: String,

    /// Current rewritten query; empty when no rewrite happened yet
    pub rewritten_query: String,

    /// Result-count cap for retrieval
    pub max_results: usize,

    /// Caller roles (accepted, not enforced)
    pub user_roles: Vec<String>,

    /// Documents from the most recent retrieval pass
    pub retrieved_docs: Vec<RetrievedDocument>,

    /// Grading verdicts from the most recent grading pass
    pub graded_docs: Vec<GradedDocument>,

    /// Relevant subset of the most recent grading pass
    pub relevant_docs: Vec<RetrievedDocument>,

    /// Accumulating answer text
    pub answer: String,

    /// Whether human review is required
    pub requires_review: bool,

    /// Review record, at most one per request
    pub hitl_review: Option<HitlReview>,

    /// Append-only ordered log of executed steps
    pub workflow_steps: Vec<String>,

    /// Number of rewrites performed so far
    pub retry_count: u32,

    /// Request identifier
    pub request_id: String,
}

impl WorkflowContext {
    /// Create the context for a new request; the step log opens with the
    /// start marker
    pub fn new(
        query: impl Into<String>,
        max_results: usize,
        user_roles: Vec<String>,
        request_id: impl Into<String>,
    ) -> Self {
        Self {
            query: query.into(),
            rewritten_query: String::new(),
            max_results,
            user_roles,
            retrieved_docs: Vec::new(),
            graded_docs: Vec::new(),
            relevant_docs: Vec::new(),
            answer: String::new(),
            requires_review: false,
            hitl_review: None,
            workflow_steps: vec![START_STEP.to_string()],
            retry_count: 0,
            request_id: request_id.into(),
        }
    }

    /// The query retrieval and grading should use: the rewrite when one
    /// exists, the original otherwise
    pub fn active_query(&self) -> &str {
        if self.rewritten_query.is_empty() {
            &self.query
        } else {
            &self.rewritten_query
        }
    }

    /// Append a step tag to the log
    pub fn record_step(&mut self, step: impl Into<String>) {
        self.workflow_steps.push(step.into());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_context_starts_with_start_marker() {
        let ctx = WorkflowContext::new("教育", 5, vec!["public".to_string()], "req-1");
        assert_eq!(ctx.workflow_steps, vec!["start".to_string()]);
        assert_eq!(ctx.retry_count, 0);
        assert!(!ctx.requires_review);
    }

    #[test]
    fn test_active_query_prefers_rewrite() {
        let mut ctx = WorkflowContext::new("教育", 5, Vec::new(), "req-1");
        assert_eq!(ctx.active_query(), "教育");
        ctx.rewritten_query = "教育 国会".to_string();
        assert_eq!(ctx.active_query(), "教育 国会");
    }

    #[test]
    fn test_record_step_appends_in_order() {
        let mut ctx = WorkflowContext::new("教育", 5, Vec::new(), "req-1");
        ctx.record_step("retrieve:3_docs");
        ctx.record_step("grade:2_relevant");
        assert_eq!(
            ctx.workflow_steps,
            vec!["start", "retrieve:3_docs", "grade:2_relevant"]
        );
    }
}
