//! In-memory BM25 index over character/bigram tokens
//!
//! Proceedings text has no reliable whitespace word boundaries, so the
//! token space is individual characters plus adjacent character bigrams.
//! The same tokenizer runs at index time and at query time; mixing
//! tokenizers would silently break scoring.

use std::collections::HashMap;

use crate::corpus::Document;

/// BM25 term-frequency saturation parameter
pub const BM25_K1: f64 = 1.5;

/// BM25 length-normalization parameter
pub const BM25_B: f64 = 0.75;

/// Tokenize text into individual characters plus adjacent bigrams
pub fn tokenize(text: &str) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    let mut tokens: Vec<String> = Vec::with_capacity(chars.len() * 2);
    for c in &chars {
        tokens.push(c.to_string());
    }
    for pair in chars.windows(2) {
        tokens.push(pair.iter().collect());
    }
    tokens
}

/// Lexical index over the corpus, built once at construction
///
/// Serves one BM25 score per indexed document for a tokenized query.
/// An empty corpus produces a valid index that returns empty score
/// vectors.
#[derive(Debug, Clone)]
pub struct DocumentIndex {
    term_freqs: Vec<HashMap<String, usize>>,
    doc_freq: HashMap<String, usize>,
    doc_len: Vec<usize>,
    avg_doc_len: f64,
    k1: f64,
    b: f64,
}

impl DocumentIndex {
    /// Build the index from the corpus snapshot
    ///
    /// Each document is indexed over its speech text concatenated with the
    /// speaker name.
    pub fn build(documents: &[Document]) -> Self {
        let mut term_freqs = Vec::with_capacity(documents.len());
        let mut doc_freq: HashMap<String, usize> = HashMap::new();
        let mut doc_len = Vec::with_capacity(documents.len());

        for doc in documents {
            let tokens = tokenize(&doc.index_text());
            doc_len.push(tokens.len());

            let mut tf: HashMap<String, usize> = HashMap::new();
            for token in tokens {
                *tf.entry(token).or_insert(0) += 1;
            }
            for term in tf.keys() {
                *doc_freq.entry(term.clone()).or_insert(0) += 1;
            }
            term_freqs.push(tf);
        }

        let avg_doc_len = if doc_len.is_empty() {
            0.0
        } else {
            doc_len.iter().sum::<usize>() as f64 / doc_len.len() as f64
        };

        Self {
            term_freqs,
            doc_freq,
            doc_len,
            avg_doc_len,
            k1: BM25_K1,
            b: BM25_B,
        }
    }

    /// Number of indexed documents
    pub fn len(&self) -> usize {
        self.term_freqs.len()
    }

    /// Whether the index holds no documents
    pub fn is_empty(&self) -> bool {
        self.term_freqs.is_empty()
    }

    /// BM25 score per document for the given query tokens
    ///
    /// Returns one score per indexed document in corpus order; higher is
    /// better. No side effects.
    pub fn scores(&self, query_tokens: &[String]) -> Vec<f64> {
        let n = self.term_freqs.len();
        let mut scores = vec![0.0; n];
        if n == 0 {
            return scores;
        }

        for term in query_tokens {
            let Some(&df) = self.doc_freq.get(term) else {
                continue;
            };
            let idf =
                (1.0 + (n as f64 - df as f64 + 0.5) / (df as f64 + 0.5)).ln();

            for (i, tf_map) in self.term_freqs.iter().enumerate() {
                if let Some(&tf) = tf_map.get(term) {
                    let tf = tf as f64;
                    let norm = 1.0 - self.b
                        + self.b * self.doc_len[i] as f64 / self.avg_doc_len;
                    scores[i] += idf * tf * (self.k1 + 1.0) / (tf + self.k1 * norm);
                }
            }
        }

        scores
    }
}
