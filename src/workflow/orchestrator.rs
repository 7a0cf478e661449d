//! Workflow orchestrator - main coordinator
//!
//! Drives the state machine over the pipeline nodes:
//! Retrieve → Grade → {Rewrite → Retrieve → Grade}* → HitlCheck →
//! {Generate | HitlPending} → Done. Owns the per-request context,
//! enforces the rewrite bound and produces the final response.

use std::sync::Arc;
use std::time::Instant;

use uuid::Uuid;

use crate::api::{ExperimentRequest, ExperimentResponse};
use crate::config::WorkflowConfig;
use crate::corpus::Document;
use crate::errors::{RagError, Result};
use crate::generation::{AnswerSynthesizer, LlmProvider};
use crate::grading::RelevanceGrader;
use crate::hitl::HitlGate;
use crate::retrieval::HybridRetriever;
use crate::rewrite::QueryRewriter;
use crate::telemetry::{TelemetryCollector, WorkflowEvent};
use crate::workflow::context::WorkflowContext;
use crate::workflow::state::{StateEvent, WorkflowState};

/// Fixed answer while a request awaits human review
pub const PENDING_REVIEW_MESSAGE: &str =
    "この質問は人間によるレビューが必要です。しばらくお待ちください。";

/// Raw retrieved documents returned as evidence when nothing graded
/// relevant
const FALLBACK_EVIDENCE_LIMIT: usize = 3;

/// Main workflow orchestrator
///
/// Immutable after construction; each `run` owns its context exclusively,
/// so one orchestrator serves concurrent requests.
pub struct WorkflowOrchestrator {
    retriever: HybridRetriever,
    grader: RelevanceGrader,
    rewriter: QueryRewriter,
    gate: HitlGate,
    synthesizer: AnswerSynthesizer,
    config: WorkflowConfig,
    telemetry: TelemetryCollector,
}

impl WorkflowOrchestrator {
    /// Create an orchestrator over a corpus snapshot and LLM provider
    pub fn new(
        documents: Vec<Document>,
        provider: Arc<dyn LlmProvider>,
        config: WorkflowConfig,
    ) -> Self {
        Self::with_telemetry(documents, provider, config, TelemetryCollector::new())
    }

    /// Create an orchestrator sharing an external telemetry collector
    pub fn with_telemetry(
        documents: Vec<Document>,
        provider: Arc<dyn LlmProvider>,
        config: WorkflowConfig,
        telemetry: TelemetryCollector,
    ) -> Self {
        Self {
            retriever: HybridRetriever::new(documents, config.clone()),
            grader: RelevanceGrader::new(config.clone()),
            rewriter: QueryRewriter::new(&config),
            gate: HitlGate::new(config.clone()),
            synthesizer: AnswerSynthesizer::new(provider, config.clone()),
            config,
            telemetry,
        }
    }

    /// Telemetry collector in use
    pub fn telemetry(&self) -> &TelemetryCollector {
        &self.telemetry
    }

    /// Number of documents in the corpus snapshot
    pub fn document_count(&self) -> usize {
        self.retriever.document_count()
    }

    /// Run the full workflow for one request
    ///
    /// Internal errors abort the request after logging elapsed time; no
    /// partial result is returned.
    pub async fn run(
        &self,
        request: &ExperimentRequest,
        request_id: Option<String>,
    ) -> Result<ExperimentResponse> {
        let req_id = request_id.unwrap_or_else(|| Uuid::new_v4().to_string());
        let start = Instant::now();

        self.telemetry.record(WorkflowEvent::RequestStarted {
            request_id: req_id.clone(),
            timestamp: Instant::now(),
        });
        tracing::info!(
            event = "experiment_start",
            request_id = %req_id,
            query = %request.query.chars().take(50).collect::<String>(),
            max_results = request.max_results,
        );

        let mut ctx = WorkflowContext::new(
            request.query.clone(),
            request.max_results,
            request.user_roles.clone(),
            req_id.clone(),
        );

        match self.execute(&mut ctx).await {
            Ok(()) => {
                let elapsed_ms = round2(start.elapsed().as_secs_f64() * 1000.0);

                self.telemetry.record(WorkflowEvent::RequestCompleted {
                    request_id: req_id.clone(),
                    duration_ms: elapsed_ms,
                    requires_review: ctx.requires_review,
                    timestamp: Instant::now(),
                });
                tracing::info!(
                    event = "experiment_complete",
                    request_id = %req_id,
                    duration_ms = elapsed_ms,
                    relevant_docs = ctx.relevant_docs.len(),
                    requires_review = ctx.requires_review,
                    workflow_steps = ?ctx.workflow_steps,
                );

                let sources = if ctx.relevant_docs.is_empty() {
                    ctx.retrieved_docs
                        .iter()
                        .take(FALLBACK_EVIDENCE_LIMIT)
                        .cloned()
                        .collect()
                } else {
                    ctx.relevant_docs.clone()
                };

                Ok(ExperimentResponse {
                    answer: ctx.answer,
                    sources,
                    requires_review: ctx.requires_review,
                    hitl_review: ctx.hitl_review,
                    processing_time_ms: elapsed_ms,
                    request_id: req_id,
                    workflow_steps: ctx.workflow_steps,
                })
            }
            Err(e) => {
                let elapsed_ms = round2(start.elapsed().as_secs_f64() * 1000.0);

                self.telemetry.record(WorkflowEvent::RequestFailed {
                    request_id: req_id.clone(),
                    error: e.to_string(),
                    timestamp: Instant::now(),
                });
                tracing::error!(
                    event = "experiment_error",
                    request_id = %req_id,
                    duration_ms = elapsed_ms,
                    error = %e,
                );
                Err(e)
            }
        }
    }

    /// Drive the state machine to completion
    async fn execute(&self, ctx: &mut WorkflowContext) -> Result<()> {
        let mut state = self.advance(WorkflowState::Start, StateEvent::Begin)?;

        while !state.is_terminal() {
            state = match state {
                WorkflowState::Retrieve => {
                    self.node_retrieve(ctx);
                    self.advance(state, StateEvent::DocsRetrieved)?
                }
                WorkflowState::Grade => {
                    self.node_grade(ctx);
                    if self.should_rewrite(ctx) {
                        self.advance(state, StateEvent::InsufficientEvidence)?
                    } else {
                        self.advance(state, StateEvent::EvidenceSettled)?
                    }
                }
                WorkflowState::Rewrite => {
                    self.node_rewrite(ctx);
                    self.advance(state, StateEvent::QueryRewritten)?
                }
                WorkflowState::HitlCheck => {
                    self.node_check_hitl(ctx);
                    if ctx.requires_review {
                        self.advance(state, StateEvent::ReviewRequired)?
                    } else {
                        self.advance(state, StateEvent::ReviewCleared)?
                    }
                }
                WorkflowState::Generate => {
                    self.node_generate(ctx).await;
                    self.advance(state, StateEvent::AnswerReady)?
                }
                WorkflowState::HitlPending => {
                    self.node_hitl_pending(ctx);
                    self.advance(state, StateEvent::AnswerReady)?
                }
                WorkflowState::Start | WorkflowState::Done => {
                    return Err(RagError::Workflow(format!(
                        "unexpected state in execution loop: {:?}",
                        state
                    )));
                }
            };
        }

        Ok(())
    }

    /// Apply one transition, recording it in telemetry
    fn advance(&self, state: WorkflowState, event: StateEvent) -> Result<WorkflowState> {
        let next = state.transition(event)?;
        self.telemetry.record(WorkflowEvent::StateTransition {
            from: format!("{:?}", state),
            to: format!("{:?}", next),
            timestamp: Instant::now(),
        });
        Ok(next)
    }

    fn node_retrieve(&self, ctx: &mut WorkflowContext) {
        let docs =
            self.retriever
                .retrieve(ctx.active_query(), ctx.max_results, &ctx.user_roles);
        ctx.record_step(format!("retrieve:{}_docs", docs.len()));
        ctx.retrieved_docs = docs;
    }

    fn node_grade(&self, ctx: &mut WorkflowContext) {
        let outcome = self.grader.grade(ctx.active_query(), &ctx.retrieved_docs);
        ctx.record_step(format!("grade:{}_relevant", outcome.relevant.len()));
        ctx.graded_docs = outcome.graded;
        ctx.relevant_docs = outcome.relevant;
    }

    fn should_rewrite(&self, ctx: &WorkflowContext) -> bool {
        ctx.relevant_docs.len() < self.config.confidence_threshold
            && ctx.retry_count < self.config.max_rewrite_retries
    }

    fn node_rewrite(&self, ctx: &mut WorkflowContext) {
        ctx.rewritten_query = self.rewriter.rewrite(&ctx.query, ctx.retry_count);
        ctx.retry_count += 1;
        ctx.record_step(format!("rewrite:{}", ctx.retry_count));
        self.telemetry.record(WorkflowEvent::RewriteAttempt {
            attempt: ctx.retry_count,
            timestamp: Instant::now(),
        });
    }

    fn node_check_hitl(&self, ctx: &mut WorkflowContext) {
        match self.gate.evaluate(&ctx.query, ctx.relevant_docs.len()) {
            Some(review) => {
                ctx.record_step(format!("hitl:{}", review.reason.as_str()));
                self.telemetry.record(WorkflowEvent::ReviewRequired {
                    reason: review.reason.as_str().to_string(),
                    timestamp: Instant::now(),
                });
                ctx.requires_review = true;
                ctx.hitl_review = Some(review);
            }
            None => {
                ctx.requires_review = false;
                ctx.hitl_review = None;
                ctx.record_step("hitl:skip");
            }
        }
    }

    async fn node_generate(&self, ctx: &mut WorkflowContext) {
        let synthesis = self
            .synthesizer
            .synthesize(&ctx.query, &ctx.relevant_docs, &ctx.retrieved_docs)
            .await;
        ctx.record_step(if synthesis.used_evidence {
            "generate:ok"
        } else {
            "generate:no_docs"
        });
        ctx.answer = synthesis.answer;
    }

    fn node_hitl_pending(&self, ctx: &mut WorkflowContext) {
        ctx.answer = PENDING_REVIEW_MESSAGE.to_string();
        ctx.record_step("hitl_pending");
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generation::FixedResponder;
    use crate::hitl::ReviewReason;

    fn doc(id: &str, speaker: &str, text: &str) -> Document {
        Document {
            speech_id: id.to_string(),
            speaker: speaker.to_string(),
            date: "2024-02-01".to_string(),
            text: text.to_string(),
            house: "衆議院".to_string(),
            meeting: "本会議".to_string(),
        }
    }

    fn education_corpus() -> Vec<Document> {
        vec![
            doc("1", "山田太郎", "教育 政策 の改革について議論します。学校 教育 の充実が重要です。"),
            doc("2", "佐藤花子", "教育 政策 における予算配分を見直すべきです。"),
            doc("3", "鈴木一郎", "教育 政策 と学校施設の整備について質問します。"),
            doc("4", "田中次郎", "農業支援の施策について発言します。"),
            doc("5", "高橋三郎", "社会保障制度について懸念を表明します。"),
        ]
    }

    fn orchestrator_with(
        documents: Vec<Document>,
        provider: Arc<FixedResponder>,
    ) -> WorkflowOrchestrator {
        WorkflowOrchestrator::new(documents, provider, WorkflowConfig::default())
    }

    #[tokio::test]
    async fn test_happy_path_generates_answer() {
        let provider = Arc::new(FixedResponder::new("教育政策に関する回答です。"));
        let orch = orchestrator_with(education_corpus(), provider.clone());

        let response = orch
            .run(&ExperimentRequest::new("教育 政策"), None)
            .await
            .unwrap();

        assert!(!response.requires_review);
        assert!(response.hitl_review.is_none());
        assert_eq!(response.answer, "教育政策に関する回答です。");
        assert_eq!(provider.call_count(), 1);
        assert_eq!(response.workflow_steps[0], "start");
        assert!(response.workflow_steps.contains(&"hitl:skip".to_string()));
        assert!(response.workflow_steps.contains(&"generate:ok".to_string()));
        assert!(!response
            .workflow_steps
            .iter()
            .any(|s| s.starts_with("rewrite")));
    }

    #[tokio::test]
    async fn test_sensitive_query_short_circuits_generation() {
        let provider = Arc::new(FixedResponder::new("呼ばれないはず"));
        let orch = orchestrator_with(education_corpus(), provider.clone());

        let response = orch
            .run(&ExperimentRequest::new("議員の給与と教育 政策"), None)
            .await
            .unwrap();

        assert!(response.requires_review);
        let review = response.hitl_review.unwrap();
        assert_eq!(review.reason, ReviewReason::SensitiveTopic);
        assert!(review.sensitive_keywords.contains(&"給与".to_string()));
        assert_eq!(response.answer, PENDING_REVIEW_MESSAGE);
        assert_eq!(provider.call_count(), 0);
        assert!(response
            .workflow_steps
            .contains(&"hitl:sensitive_topic".to_string()));
        assert!(response
            .workflow_steps
            .contains(&"hitl_pending".to_string()));
    }

    #[tokio::test]
    async fn test_rewrite_loop_bounded_at_max_retries() {
        let provider = Arc::new(FixedResponder::new("answer"));
        // Corpus with nothing relevant to the query keywords.
        let orch = orchestrator_with(
            vec![doc("1", "話者", "全く別の話題であります")],
            provider.clone(),
        );

        let response = orch
            .run(&ExperimentRequest::new("量子計算機の進展"), None)
            .await
            .unwrap();

        let rewrites: Vec<&String> = response
            .workflow_steps
            .iter()
            .filter(|s| s.starts_with("rewrite:"))
            .collect();
        assert_eq!(rewrites.len(), 2);
        assert_eq!(rewrites[0], "rewrite:1");
        assert_eq!(rewrites[1], "rewrite:2");
        assert!(response
            .workflow_steps
            .contains(&"hitl:low_confidence".to_string()));
    }

    #[tokio::test]
    async fn test_empty_corpus_runs_to_pending_review() {
        let provider = Arc::new(FixedResponder::new("answer"));
        let orch = orchestrator_with(Vec::new(), provider.clone());

        let response = orch
            .run(&ExperimentRequest::new("教育政策について"), None)
            .await
            .unwrap();

        assert_eq!(
            response.workflow_steps,
            vec![
                "start",
                "retrieve:0_docs",
                "grade:0_relevant",
                "rewrite:1",
                "retrieve:0_docs",
                "grade:0_relevant",
                "rewrite:2",
                "retrieve:0_docs",
                "grade:0_relevant",
                "hitl:low_confidence",
                "hitl_pending",
            ]
        );
        assert_eq!(response.answer, PENDING_REVIEW_MESSAGE);
        assert!(response.sources.is_empty());
        assert_eq!(provider.call_count(), 0);
    }

    #[tokio::test]
    async fn test_supplied_request_id_is_echoed() {
        let provider = Arc::new(FixedResponder::new("answer"));
        let orch = orchestrator_with(education_corpus(), provider);

        let response = orch
            .run(
                &ExperimentRequest::new("教育 政策"),
                Some("req-42".to_string()),
            )
            .await
            .unwrap();
        assert_eq!(response.request_id, "req-42");
    }

    #[tokio::test]
    async fn test_sources_fall_back_to_top_retrieved() {
        let provider = Arc::new(FixedResponder::new("answer"));
        // A grading config nothing can satisfy, so relevant stays empty
        // while retrieval still returns documents.
        let config = WorkflowConfig {
            grade_score_floor: 2.0,
            grade_keyword_overlap: 100,
            ..Default::default()
        };
        let corpus: Vec<Document> = (0..5)
            .map(|i| doc(&i.to_string(), "話者", "別件の議事内容であります"))
            .collect();
        let orch = WorkflowOrchestrator::new(corpus, provider, config);

        let response = orch
            .run(&ExperimentRequest::new("量子計算機の進展"), None)
            .await
            .unwrap();
        assert_eq!(response.sources.len(), 3);
        assert!(response.requires_review);
    }

    #[tokio::test]
    async fn test_telemetry_records_lifecycle() {
        let provider = Arc::new(FixedResponder::new("answer"));
        let orch = orchestrator_with(education_corpus(), provider);

        orch.run(&ExperimentRequest::new("教育 政策"), None)
            .await
            .unwrap();

        let stats = orch.telemetry().get_stats();
        assert_eq!(stats.requests_started, 1);
        assert_eq!(stats.requests_completed, 1);
        assert_eq!(stats.requests_failed, 0);
        assert!(stats.state_transitions >= 5);
    }
}
