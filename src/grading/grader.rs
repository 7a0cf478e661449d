//! Binary relevance grader with explainable reasons
//!
//! Keyword-overlap grading: a document is relevant when it shares at least
//! two extracted keywords with the active query, or when its retrieval
//! score clears a fixed confidence floor that lets a single very strong
//! match substitute for overlap. Grading never fails and never drops a
//! document from the graded list.

use std::collections::HashSet;
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::config::WorkflowConfig;
use crate::retrieval::RetrievedDocument;

/// Word/ideograph runs: kana, kanji and word characters
static KEYWORD_RE: OnceLock<Regex> = OnceLock::new();

fn keyword_re() -> &'static Regex {
    KEYWORD_RE.get_or_init(|| {
        Regex::new(r"[\x{3040}-\x{9fff}\w]+").expect("keyword pattern is valid")
    })
}

/// A retrieved document paired with its relevance verdict
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GradedDocument {
    pub document: RetrievedDocument,
    pub is_relevant: bool,
    pub grade_reason: String,
}

/// Result of one grading pass
///
/// `relevant` is always a subset (by identity) of the documents behind
/// `graded`, in the same order.
#[derive(Debug, Clone, Default)]
pub struct GradeOutcome {
    pub graded: Vec<GradedDocument>,
    pub relevant: Vec<RetrievedDocument>,
}

/// Classifies retrieved documents as relevant or irrelevant
pub struct RelevanceGrader {
    config: WorkflowConfig,
}

impl RelevanceGrader {
    /// Create a grader with the given workflow configuration
    pub fn new(config: WorkflowConfig) -> Self {
        Self { config }
    }

    /// Grade every retrieved document against the active query
    ///
    /// Produces one GradedDocument per input document, preserving input
    /// order, plus the filtered relevant-only list.
    pub fn grade(&self, query: &str, documents: &[RetrievedDocument]) -> GradeOutcome {
        let query_keywords = extract_keywords(query);

        let mut graded = Vec::with_capacity(documents.len());
        let mut relevant = Vec::new();

        for doc in documents {
            let content_keywords = extract_keywords(&doc.content);
            let overlap = query_keywords.intersection(&content_keywords).count();
            let is_relevant = overlap >= self.config.grade_keyword_overlap
                || doc.score >= self.config.grade_score_floor;

            graded.push(GradedDocument {
                document: doc.clone(),
                is_relevant,
                grade_reason: format!(
                    "keyword_overlap={}, score={:.3}",
                    overlap, doc.score
                ),
            });
            if is_relevant {
                relevant.push(doc.clone());
            }
        }

        GradeOutcome { graded, relevant }
    }
}

/// Extract the normalized keyword set from text
fn extract_keywords(text: &str) -> HashSet<String> {
    keyword_re()
        .find_iter(text)
        .map(|m| m.as_str().to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn retrieved(id: &str, content: &str, score: f64) -> RetrievedDocument {
        RetrievedDocument {
            speech_id: id.to_string(),
            speaker: "話者".to_string(),
            date: "2024-02-01".to_string(),
            content: content.to_string(),
            score,
            house: String::new(),
            meeting: String::new(),
        }
    }

    #[test]
    fn test_keyword_extraction_japanese_runs() {
        let keywords = extract_keywords("教育 政策について");
        assert!(keywords.contains("教育"));
        assert!(keywords.contains("政策について"));
    }

    #[test]
    fn test_overlap_of_two_is_relevant() {
        let grader = RelevanceGrader::new(WorkflowConfig::default());
        let docs = vec![retrieved("1", "教育 と 政策 の議論", 0.1)];
        let outcome = grader.grade("教育 政策", &docs);
        assert!(outcome.graded[0].is_relevant);
        assert_eq!(outcome.relevant.len(), 1);
    }

    #[test]
    fn test_high_score_substitutes_for_overlap() {
        let grader = RelevanceGrader::new(WorkflowConfig::default());
        let docs = vec![retrieved("1", "無関係な内容", 0.9)];
        let outcome = grader.grade("教育 政策", &docs);
        assert!(outcome.graded[0].is_relevant);
    }

    #[test]
    fn test_low_overlap_low_score_is_irrelevant_but_kept() {
        let grader = RelevanceGrader::new(WorkflowConfig::default());
        let docs = vec![retrieved("1", "無関係な内容", 0.1)];
        let outcome = grader.grade("教育 政策", &docs);
        assert_eq!(outcome.graded.len(), 1);
        assert!(!outcome.graded[0].is_relevant);
        assert!(outcome.relevant.is_empty());
    }

    #[test]
    fn test_relevant_is_subset_of_graded() {
        let grader = RelevanceGrader::new(WorkflowConfig::default());
        let docs = vec![
            retrieved("1", "教育 政策 審議", 0.5),
            retrieved("2", "無関係", 0.05),
            retrieved("3", "教育 政策", 0.2),
        ];
        let outcome = grader.grade("教育 政策", &docs);
        assert_eq!(outcome.graded.len(), 3);
        let graded_ids: Vec<&str> = outcome
            .graded
            .iter()
            .filter(|g| g.is_relevant)
            .map(|g| g.document.speech_id.as_str())
            .collect();
        let relevant_ids: Vec<&str> =
            outcome.relevant.iter().map(|d| d.speech_id.as_str()).collect();
        assert_eq!(graded_ids, relevant_ids);
    }

    #[test]
    fn test_grade_reason_format() {
        let grader = RelevanceGrader::new(WorkflowConfig::default());
        let docs = vec![retrieved("1", "教育 政策", 0.25)];
        let outcome = grader.grade("教育 政策", &docs);
        assert_eq!(outcome.graded[0].grade_reason, "keyword_overlap=2, score=0.250");
    }

    #[test]
    fn test_empty_input_grades_empty() {
        let grader = RelevanceGrader::new(WorkflowConfig::default());
        let outcome = grader.grade("教育", &[]);
        assert!(outcome.graded.is_empty());
        assert!(outcome.relevant.is_empty());
    }

    #[test]
    fn test_preserves_input_order() {
        let grader = RelevanceGrader::new(WorkflowConfig::default());
        let docs = vec![
            retrieved("b", "教育 政策", 0.5),
            retrieved("a", "教育 政策", 0.4),
        ];
        let outcome = grader.grade("教育 政策", &docs);
        assert_eq!(outcome.graded[0].document.speech_id, "b");
        assert_eq!(outcome.graded[1].document.speech_id, "a");
    }
}
