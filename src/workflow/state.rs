//! Workflow state machine
//!
//! Deterministic finite state machine over the retrieval-and-decision
//! pipeline:
//! - Safety: no invalid states reachable
//! - Liveness: every run reaches Done (the rewrite loop is bounded)
//! - Determinism: unique next state per event

use serde::{Deserialize, Serialize};

use crate::errors::{RagError, Result};

/// Workflow pipeline states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WorkflowState {
    /// Initial state - request accepted
    Start,

    /// Retrieving documents via hybrid search
    Retrieve,

    /// Grading retrieved documents for relevance
    Grade,

    /// Rewriting the query after insufficient evidence
    Rewrite,

    /// Deciding whether human review is required
    HitlCheck,

    /// Synthesizing the answer from approved evidence
    Generate,

    /// Held for human review; synthesis skipped
    HitlPending,

    /// Final state (terminal)
    Done,
}

/// Events that trigger state transitions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StateEvent {
    /// Request processing started
    Begin,

    /// Retrieval finished
    DocsRetrieved,

    /// Too few relevant documents and retries remain
    InsufficientEvidence,

    /// Query rewritten for another retrieval attempt
    QueryRewritten,

    /// Evidence is as good as it will get
    EvidenceSettled,

    /// Human review required
    ReviewRequired,

    /// No review required
    ReviewCleared,

    /// Final answer (or pending message) is in place
    AnswerReady,
}

impl WorkflowState {
    /// Check if this is a terminal state
    pub fn is_terminal(&self) -> bool {
        matches!(self, WorkflowState::Done)
    }

    /// Attempt state transition with validation
    ///
    /// Valid transitions:
    /// 1. Start       → Retrieve     (on: Begin)
    /// 2. Retrieve    → Grade        (on: DocsRetrieved)
    /// 3. Grade       → Rewrite      (on: InsufficientEvidence)
    /// 4. Grade       → HitlCheck    (on: EvidenceSettled)
    /// 5. Rewrite     → Retrieve     (on: QueryRewritten)
    /// 6. HitlCheck   → Generate     (on: ReviewCleared)
    /// 7. HitlCheck   → HitlPending  (on: ReviewRequired)
    /// 8. Generate    → Done         (on: AnswerReady)
    /// 9. HitlPending → Done         (on: AnswerReady)
    /// 10. Done       → Done         (terminal state)
    pub fn transition(&self, event: StateEvent) -> Result<WorkflowState> {
        use StateEvent::*;
        use WorkflowState::*;

        let next_state = match (self, event) {
            (Start, Begin) => Retrieve,

            (Retrieve, DocsRetrieved) => Grade,

            (Grade, InsufficientEvidence) => Rewrite,
            (Grade, EvidenceSettled) => HitlCheck,

            (Rewrite, QueryRewritten) => Retrieve,

            (HitlCheck, ReviewCleared) => Generate,
            (HitlCheck, ReviewRequired) => HitlPending,

            (Generate, AnswerReady) => Done,
            (HitlPending, AnswerReady) => Done,

            // Terminal state (self-loop)
            (Done, _) => Done,

            (from, event) => {
                return Err(RagError::InvalidTransition {
                    from: format!("{:?}", from),
                    to: format!("(via {:?})", event),
                    reason: format!("No valid transition from {:?} on {:?}", from, event),
                });
            }
        };

        Ok(next_state)
    }

    /// Get all valid events from this state
    pub fn valid_events(&self) -> Vec<StateEvent> {
        use StateEvent::*;
        use WorkflowState::*;

        match self {
            Start => vec![Begin],
            Retrieve => vec![DocsRetrieved],
            Grade => vec![InsufficientEvidence, EvidenceSettled],
            Rewrite => vec![QueryRewritten],
            HitlCheck => vec![ReviewCleared, ReviewRequired],
            Generate => vec![AnswerReady],
            HitlPending => vec![AnswerReady],
            Done => vec![],
        }
    }

    /// Human-readable state name
    pub fn display_name(&self) -> &'static str {
        match self {
            WorkflowState::Start => "Starting",
            WorkflowState::Retrieve => "Retrieving Documents",
            WorkflowState::Grade => "Grading Relevance",
            WorkflowState::Rewrite => "Rewriting Query",
            WorkflowState::HitlCheck => "Checking Review Gate",
            WorkflowState::Generate => "Generating Answer",
            WorkflowState::HitlPending => "Awaiting Human Review",
            WorkflowState::Done => "Completed",
        }
    }
}
