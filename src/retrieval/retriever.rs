//! Hybrid retriever with weighted reciprocal-rank fusion
//!
//! Combines the BM25 lexical signal with an approximate dense signal.
//! The dense score is a character-overlap heuristic standing in for
//! embedding similarity; its exact behavior is load-bearing and must be
//! preserved when swapping in a real model.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::config::WorkflowConfig;
use crate::corpus::Document;
use crate::retrieval::index::{tokenize, DocumentIndex};

/// A document projection returned by retrieval
///
/// Carries a normalized relevance score in [0,1] and content truncated for
/// downstream context budgets. Created per retrieval call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievedDocument {
    pub speech_id: String,
    pub speaker: String,
    pub date: String,
    pub content: String,
    pub score: f64,
    pub house: String,
    pub meeting: String,
}

/// Hybrid BM25 + RRF retriever over an immutable corpus snapshot
///
/// The index is built once at construction and is safe for concurrent
/// read-only use across requests.
pub struct HybridRetriever {
    documents: Vec<Document>,
    index: DocumentIndex,
    config: WorkflowConfig,
}

impl HybridRetriever {
    /// Build a retriever over the given corpus snapshot
    pub fn new(documents: Vec<Document>, config: WorkflowConfig) -> Self {
        let index = DocumentIndex::build(&documents);
        Self {
            documents,
            index,
            config,
        }
    }

    /// Number of documents in the corpus snapshot
    pub fn document_count(&self) -> usize {
        self.documents.len()
    }

    /// Retrieve the top-k documents by fused relevance
    ///
    /// `user_roles` is accepted for permission-scoped filtering but not
    /// currently enforced; all documents are searchable.
    ///
    /// Output contract: at most `top_k` documents, sorted by descending
    /// score, every score in [0,1]. An empty corpus yields an empty
    /// result, never an error.
    pub fn retrieve(
        &self,
        query: &str,
        top_k: usize,
        _user_roles: &[String],
    ) -> Vec<RetrievedDocument> {
        if self.documents.is_empty() || self.index.is_empty() {
            return Vec::new();
        }

        let query_tokens = tokenize(query);
        let lexical = self.index.scores(&query_tokens);

        let query_chars: HashSet<char> = query.chars().collect();
        let dense: Vec<f64> = self
            .documents
            .iter()
            .map(|doc| Self::dense_score(&query_chars, doc))
            .collect();

        let lexical_ranked = rank_descending(&lexical);
        let dense_ranked = rank_descending(&dense);

        // Weighted RRF; ranks are 0-indexed before the +1 offset, so the
        // best document in each list contributes weight/(K+1).
        let mut fused = vec![0.0; self.documents.len()];
        for (rank, &idx) in lexical_ranked.iter().enumerate() {
            fused[idx] +=
                self.config.bm25_weight / (self.config.rrf_k + rank as f64 + 1.0);
        }
        for (rank, &idx) in dense_ranked.iter().enumerate() {
            fused[idx] +=
                self.config.dense_weight / (self.config.rrf_k + rank as f64 + 1.0);
        }

        let mut order = rank_descending(&fused);
        order.truncate(top_k);

        let mut max_score = order
            .iter()
            .map(|&i| fused[i])
            .fold(0.0_f64, f64::max);
        if max_score == 0.0 {
            max_score = 1.0;
        }

        order
            .into_iter()
            .map(|i| self.project(i, fused[i] / max_score))
            .collect()
    }

    /// Approximate dense similarity via character-overlap ratio
    ///
    /// |query chars ∩ document chars| / |query chars|; 0.0 for an empty
    /// query.
    fn dense_score(query_chars: &HashSet<char>, doc: &Document) -> f64 {
        if query_chars.is_empty() {
            return 0.0;
        }
        let content_chars: HashSet<char> = doc.overlap_text().chars().collect();
        let overlap = query_chars.intersection(&content_chars).count();
        overlap as f64 / query_chars.len() as f64
    }

    fn project(&self, idx: usize, score: f64) -> RetrievedDocument {
        let doc = &self.documents[idx];
        RetrievedDocument {
            speech_id: doc.speech_id.clone(),
            speaker: doc.speaker.clone(),
            date: doc.date.clone(),
            content: doc
                .text
                .chars()
                .take(self.config.content_truncate_chars)
                .collect(),
            score: score.clamp(0.0, 1.0),
            house: doc.house.clone(),
            meeting: doc.meeting.clone(),
        }
    }
}

/// Indices sorted by descending score; ties resolve by ascending index so
/// retrieval is reproducible for identical inputs.
fn rank_descending(scores: &[f64]) -> Vec<usize> {
    let mut indices: Vec<usize> = (0..scores.len()).collect();
    indices.sort_by(|&a, &b| {
        scores[b]
            .partial_cmp(&scores[a])
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(a.cmp(&b))
    });
    indices
}

#[cfg(test)]
mod tests {
    use super::*;

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

    fn sample_corpus() -> Vec<Document> {
        vec![
            doc("1", "山田太郎", "教育政策の改革について議論を行いたいと思います。学校教育の充実が重要です。"),
            doc("2", "佐藤花子", "予算委員会では防衛費の増額について審議しました。"),
            doc("3", "鈴木一郎", "教育予算の配分と学校施設の整備状況について質問いたします。"),
            doc("4", "田中次郎", "農業政策の支援策について発言いたします。"),
            doc("5", "高橋三郎", "社会保障制度の持続可能性について懸念を表明します。"),
        ]
    }

    #[test]
    fn test_retrieve_respects_top_k() {
        let retriever = HybridRetriever::new(sample_corpus(), WorkflowConfig::default());
        let results = retriever.retrieve("教育 政策", 3, &["public".to_string()]);
        assert!(results.len() <= 3);
        assert!(!results.is_empty());
    }

    #[test]
    fn test_retrieve_scores_normalized() {
        let retriever = HybridRetriever::new(sample_corpus(), WorkflowConfig::default());
        let results = retriever.retrieve("予算 委員会", 5, &[]);
        for doc in &results {
            assert!((0.0..=1.0).contains(&doc.score));
        }
        // Top result carries the maximum normalized score.
        assert_eq!(results[0].score, 1.0);
    }

    #[test]
    fn test_retrieve_sorted_descending() {
        let retriever = HybridRetriever::new(sample_corpus(), WorkflowConfig::default());
        let results = retriever.retrieve("教育", 5, &[]);
        for pair in results.windows(2) {
            assert!(pair[0].score >= pair[1].score);
        }
    }

    #[test]
    fn test_retrieve_empty_corpus() {
        let retriever = HybridRetriever::new(Vec::new(), WorkflowConfig::default());
        assert!(retriever.retrieve("テスト", 5, &[]).is_empty());
    }

    #[test]
    fn test_retrieve_empty_query_returns_zero_scores() {
        let retriever = HybridRetriever::new(sample_corpus(), WorkflowConfig::default());
        let results = retriever.retrieve("", 5, &[]);
        assert_eq!(results.len(), 5);
        for doc in &results {
            assert_eq!(doc.score, 0.0);
        }
    }

    #[test]
    fn test_education_query_ranks_education_docs_first() {
        let retriever = HybridRetriever::new(sample_corpus(), WorkflowConfig::default());
        let results = retriever.retrieve("教育 学校 政策", 2, &[]);
        assert!(results[0].content.contains("教育"));
    }

    #[test]
    fn test_content_truncated() {
        let long_text = "あ".repeat(800);
        let retriever = HybridRetriever::new(
            vec![doc("1", "話者", &long_text)],
            WorkflowConfig::default(),
        );
        let results = retriever.retrieve("あ", 1, &[]);
        assert_eq!(results[0].content.chars().count(), 500);
    }

    #[test]
    fn test_tie_order_deterministic() {
        // Identical documents fuse to identical scores; corpus order wins.
        let docs = vec![doc("a", "x", "同一内容"), doc("b", "x", "同一内容")];
        let retriever = HybridRetriever::new(docs, WorkflowConfig::default());
        let first = retriever.retrieve("同一", 2, &[]);
        let second = retriever.retrieve("同一", 2, &[]);
        assert_eq!(first[0].speech_id, "a");
        assert_eq!(second[0].speech_id, "a");
    }

    #[test]
    fn test_roles_do_not_filter() {
        let retriever = HybridRetriever::new(sample_corpus(), WorkflowConfig::default());
        let with_role = retriever.retrieve("教育", 5, &["public".to_string()]);
        let without = retriever.retrieve("教育", 5, &[]);
        assert_eq!(with_role.len(), without.len());
    }
}
