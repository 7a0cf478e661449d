//! Telemetry event sink for the workflow engine
//!
//! Collects discrete named events emitted by the orchestrator and its
//! components, with aggregate statistics. Process-level structured logs
//! go through `tracing`; this collector is the in-process view used by
//! the CLI summary and tests.

use std::sync::{Arc, Mutex};
use std::time::Instant;

/// Workflow telemetry event types
#[derive(Debug, Clone)]
pub enum WorkflowEvent {
    RequestStarted {
        request_id: String,
        timestamp: Instant,
    },
    StateTransition {
        from: String,
        to: String,
        timestamp: Instant,
    },
    RewriteAttempt {
        attempt: u32,
        timestamp: Instant,
    },
    ReviewRequired {
        reason: String,
        timestamp: Instant,
    },
    RequestCompleted {
        request_id: String,
        duration_ms: f64,
        requires_review: bool,
        timestamp: Instant,
    },
    RequestFailed {
        request_id: String,
        error: String,
        timestamp: Instant,
    },
}

/// Aggregate telemetry statistics
#[derive(Debug, Clone, Default)]
pub struct TelemetryStats {
    pub requests_started: usize,
    pub requests_completed: usize,
    pub requests_failed: usize,
    pub state_transitions: usize,
    pub rewrite_attempts: usize,
    pub reviews_required: usize,
}

/// Telemetry collector
#[derive(Clone)]
pub struct TelemetryCollector {
    events: Arc<Mutex<Vec<WorkflowEvent>>>,
    stats: Arc<Mutex<TelemetryStats>>,
    start_time: Instant,
}

impl TelemetryCollector {
    /// Create a new telemetry collector
    pub fn new() -> Self {
        Self {
            events: Arc::new(Mutex::new(Vec::new())),
            stats: Arc::new(Mutex::new(TelemetryStats::default())),
            start_time: Instant::now(),
        }
    }

    /// Record an event
    pub fn record(&self, event: WorkflowEvent) {
        {
            let mut stats = match self.stats.lock() {
                Ok(guard) => guard,
                Err(poisoned) => poisoned.into_inner(),
            };
            match &event {
                WorkflowEvent::RequestStarted { .. } => {
                    stats.requests_started += 1;
                }
                WorkflowEvent::StateTransition { .. } => {
                    stats.state_transitions += 1;
                }
                WorkflowEvent::RewriteAttempt { .. } => {
                    stats.rewrite_attempts += 1;
                }
                WorkflowEvent::ReviewRequired { .. } => {
                    stats.reviews_required += 1;
                }
                WorkflowEvent::RequestCompleted { .. } => {
                    stats.requests_completed += 1;
                }
                WorkflowEvent::RequestFailed { .. } => {
                    stats.requests_failed += 1;
                }
            }
        }

        let mut events = match self.events.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        events.push(event);
    }

    /// Get current statistics
    pub fn get_stats(&self) -> TelemetryStats {
        match self.stats.lock() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// Get elapsed time since the collector was created
    pub fn elapsed(&self) -> std::time::Duration {
        self.start_time.elapsed()
    }

    /// Get event count
    pub fn event_count(&self) -> usize {
        match self.events.lock() {
            Ok(guard) => guard.len(),
            Err(poisoned) => poisoned.into_inner().len(),
        }
    }

    /// Get recent events (last n)
    pub fn recent_events(&self, n: usize) -> Vec<WorkflowEvent> {
        let events = match self.events.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        let start = events.len().saturating_sub(n);
        events[start..].to_vec()
    }
}

impl Default for TelemetryCollector {
    fn default() -> Self {
        Self::new()
    }
}
