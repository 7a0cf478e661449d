//! Human-in-the-loop review gate
//!
//! Pure decision over the original query text and the settled relevant
//! document count. Sensitive-topic detection takes priority over low
//! confidence when both conditions hold.

use serde::{Deserialize, Serialize};

use crate::config::WorkflowConfig;

/// Why a request was held for human review
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewReason {
    LowConfidence,
    SensitiveTopic,
}

impl ReviewReason {
    /// Wire/step-log form of the reason
    pub fn as_str(&self) -> &'static str {
        match self {
            ReviewReason::LowConfidence => "low_confidence",
            ReviewReason::SensitiveTopic => "sensitive_topic",
        }
    }
}

/// Review record produced when a request requires human review
///
/// Produced at most once per request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HitlReview {
    pub reason: ReviewReason,
    pub query: String,
    pub relevant_doc_count: usize,
    pub sensitive_keywords: Vec<String>,
}

/// Decides whether an answer may be released without human review
pub struct HitlGate {
    config: WorkflowConfig,
}

impl HitlGate {
    /// Create a gate with the given workflow configuration
    pub fn new(config: WorkflowConfig) -> Self {
        Self { config }
    }

    /// Evaluate the gate; `Some` means review is required
    ///
    /// Evaluated against the ORIGINAL query, never a rewrite: the user
    /// asked the original question, and rewrites are internal retrieval
    /// aids that must not mask a sensitive topic.
    pub fn evaluate(&self, original_query: &str, relevant_count: usize) -> Option<HitlReview> {
        let found_sensitive: Vec<String> = self
            .config
            .sensitive_keywords
            .iter()
            .filter(|kw| original_query.contains(kw.as_str()))
            .cloned()
            .collect();

        let sensitive_topic = !found_sensitive.is_empty();
        let low_confidence = relevant_count < self.config.confidence_threshold;

        if !sensitive_topic && !low_confidence {
            return None;
        }

        let reason = if sensitive_topic {
            ReviewReason::SensitiveTopic
        } else {
            ReviewReason::LowConfidence
        };

        Some(HitlReview {
            reason,
            query: original_query.to_string(),
            relevant_doc_count: relevant_count,
            sensitive_keywords: found_sensitive,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gate() -> HitlGate {
        HitlGate::new(WorkflowConfig::default())
    }

    #[test]
    fn test_no_review_when_confident_and_clean() {
        assert!(gate().evaluate("教育政策について", 3).is_none());
    }

    #[test]
    fn test_low_confidence_triggers_review() {
        let review = gate().evaluate("教育政策について", 1).unwrap();
        assert_eq!(review.reason, ReviewReason::LowConfidence);
        assert_eq!(review.relevant_doc_count, 1);
        assert!(review.sensitive_keywords.is_empty());
    }

    #[test]
    fn test_sensitive_term_triggers_review_regardless_of_count() {
        let review = gate().evaluate("議員の給与について", 10).unwrap();
        assert_eq!(review.reason, ReviewReason::SensitiveTopic);
        assert_eq!(review.sensitive_keywords, vec!["給与".to_string()]);
    }

    #[test]
    fn test_sensitive_takes_priority_over_low_confidence() {
        let review = gate().evaluate("機密予算の詳細", 0).unwrap();
        assert_eq!(review.reason, ReviewReason::SensitiveTopic);
        assert!(review.sensitive_keywords.contains(&"機密".to_string()));
        assert!(review.sensitive_keywords.contains(&"予算".to_string()));
    }

    #[test]
    fn test_threshold_boundary() {
        // Exactly at the threshold is confident enough.
        assert!(gate().evaluate("教育について", 2).is_none());
        assert!(gate().evaluate("教育について", 1).is_some());
    }

    #[test]
    fn test_reason_serializes_snake_case() {
        let json = serde_json::to_string(&ReviewReason::SensitiveTopic).unwrap();
        assert_eq!(json, "\"sensitive_topic\"");
        let json = serde_json::to_string(&ReviewReason::LowConfidence).unwrap();
        assert_eq!(json, "\"low_confidence\"");
    }
}
