//! Grounded answer synthesis
//!
//! Builds a context block from the strongest evidence and asks the
//! provider to answer strictly from the supplied excerpts. Provider
//! failure degrades to a fixed fallback text; generation failure is
//! never fatal to a request.

use std::sync::Arc;

use crate::config::WorkflowConfig;
use crate::generation::provider::LlmProvider;
use crate::retrieval::RetrievedDocument;

/// Fixed reply when no evidence exists at all
pub const NO_EVIDENCE_MESSAGE: &str = "関連する国会議事録が見つかりませんでした。";

/// Fixed reply when the provider is unreachable or errors
pub const GENERATION_FALLBACK_MESSAGE: &str =
    "[Ollama unavailable] Relevant content found in corpus for query.";

/// Evidence documents included in the context block
const CONTEXT_DOC_LIMIT: usize = 3;

/// Grounding instruction: answer only from the supplied excerpts
const SYSTEM_PROMPT: &str = "あなたは国会議事録を専門とする AI アシスタントです。\
提供された議事録の抜粋に基づいて、質問に対して正確かつ簡潔に回答してください。\
提供された文書に記載がない情報は含めないでください。";

/// Result of one synthesis call
#[derive(Debug, Clone)]
pub struct Synthesis {
    pub answer: String,
    /// False when the no-evidence message was returned without a
    /// provider call
    pub used_evidence: bool,
}

/// Produces a grounded answer from graded evidence
pub struct AnswerSynthesizer {
    provider: Arc<dyn LlmProvider>,
    config: WorkflowConfig,
}

impl AnswerSynthesizer {
    /// Create a synthesizer backed by the given provider
    pub fn new(provider: Arc<dyn LlmProvider>, config: WorkflowConfig) -> Self {
        Self { provider, config }
    }

    /// Synthesize an answer from relevant documents, falling back to raw
    /// retrieved documents when nothing graded relevant
    pub async fn synthesize(
        &self,
        query: &str,
        relevant: &[RetrievedDocument],
        retrieved: &[RetrievedDocument],
    ) -> Synthesis {
        let evidence = if relevant.is_empty() { retrieved } else { relevant };

        if evidence.is_empty() {
            return Synthesis {
                answer: NO_EVIDENCE_MESSAGE.to_string(),
                used_evidence: false,
            };
        }

        let context = Self::build_context(evidence);
        let user_prompt = format!("質問: {}\n\n参考文書:\n{}\n\n回答:", query, context);

        let answer = match self.provider.generate(&user_prompt, SYSTEM_PROMPT).await {
            Ok(text) => text,
            Err(e) => {
                tracing::warn!(event = "generation_fallback", error = %e);
                GENERATION_FALLBACK_MESSAGE.to_string()
            }
        };

        Synthesis {
            answer: self.truncate_answer(answer),
            used_evidence: true,
        }
    }

    fn build_context(evidence: &[RetrievedDocument]) -> String {
        evidence
            .iter()
            .take(CONTEXT_DOC_LIMIT)
            .enumerate()
            .map(|(i, doc)| {
                format!(
                    "[文書{}] 発言者: {}, 日付: {}\n{}",
                    i + 1,
                    doc.speaker,
                    doc.date,
                    doc.content
                )
            })
            .collect::<Vec<_>>()
            .join("\n\n")
    }

    fn truncate_answer(&self, answer: String) -> String {
        let limit = self.config.answer_truncate_chars;
        if answer.chars().count() > limit {
            let truncated: String = answer.chars().take(limit).collect();
            format!("{}...", truncated)
        } else {
            answer
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generation::provider::FixedResponder;

    fn retrieved(id: &str, speaker: &str, content: &str) -> RetrievedDocument {
        RetrievedDocument {
            speech_id: id.to_string(),
            speaker: speaker.to_string(),
            date: "2024-02-01".to_string(),
            content: content.to_string(),
            score: 0.8,
            house: String::new(),
            meeting: String::new(),
        }
    }

    fn synthesizer(provider: Arc<FixedResponder>) -> AnswerSynthesizer {
        AnswerSynthesizer::new(provider, WorkflowConfig::default())
    }

    #[tokio::test]
    async fn test_no_evidence_skips_provider() {
        let provider = Arc::new(FixedResponder::new("answer"));
        let synth = synthesizer(provider.clone());

        let result = synth.synthesize("質問", &[], &[]).await;
        assert_eq!(result.answer, NO_EVIDENCE_MESSAGE);
        assert!(!result.used_evidence);
        assert_eq!(provider.call_count(), 0);
    }

    #[tokio::test]
    async fn test_falls_back_to_retrieved_when_no_relevant() {
        let provider = Arc::new(FixedResponder::new("回答"));
        let synth = synthesizer(provider.clone());

        let retrieved_docs = vec![retrieved("1", "山田", "教育政策の内容")];
        let result = synth.synthesize("質問", &[], &retrieved_docs).await;
        assert_eq!(result.answer, "回答");
        assert_eq!(provider.call_count(), 1);
    }

    #[tokio::test]
    async fn test_context_contains_top_three_only() {
        let provider = Arc::new(FixedResponder::new("回答"));
        let synth = synthesizer(provider.clone());

        let docs: Vec<RetrievedDocument> = (1..=5)
            .map(|i| retrieved(&i.to_string(), &format!("話者{}", i), "内容"))
            .collect();
        synth.synthesize("質問", &docs, &[]).await;

        let prompt = provider.prompts().pop().unwrap();
        assert!(prompt.contains("[文書1] 発言者: 話者1"));
        assert!(prompt.contains("[文書3] 発言者: 話者3"));
        assert!(!prompt.contains("[文書4]"));
        assert!(prompt.starts_with("質問: 質問"));
    }

    #[tokio::test]
    async fn test_provider_failure_degrades_to_fallback() {
        let provider = Arc::new(FixedResponder::failing("connection refused"));
        let synth = synthesizer(provider.clone());

        let docs = vec![retrieved("1", "山田", "内容")];
        let result = synth.synthesize("質問", &docs, &[]).await;
        assert_eq!(result.answer, GENERATION_FALLBACK_MESSAGE);
        assert!(result.used_evidence);
    }

    #[tokio::test]
    async fn test_long_answer_truncated_with_ellipsis() {
        let provider = Arc::new(FixedResponder::new("あ".repeat(1500)));
        let synth = synthesizer(provider.clone());

        let docs = vec![retrieved("1", "山田", "内容")];
        let result = synth.synthesize("質問", &docs, &[]).await;
        assert_eq!(result.answer.chars().count(), 1000 + 3);
        assert!(result.answer.ends_with("..."));
    }
}
