//! Deterministic query rewriter
//!
//! When retrieval produced too little evidence, the rewriter appends one
//! term from a fixed cycle of domain expansion terms to the original
//! query. The term is indexed by the retry counter, so rewriting is
//! deterministic and exhaustible; it never inspects document content.

use crate::config::WorkflowConfig;

/// Expands queries with fixed domain terms, cycled by retry count
pub struct QueryRewriter {
    expansions: Vec<String>,
}

impl QueryRewriter {
    /// Create a rewriter from the configured expansion terms
    pub fn new(config: &WorkflowConfig) -> Self {
        Self {
            expansions: config.expansion_terms.clone(),
        }
    }

    /// Produce the rewritten query for the given retry count
    ///
    /// Always expands the ORIGINAL query, not a previous rewrite; the
    /// expansion term is `expansions[retry_count % len]`.
    pub fn rewrite(&self, original_query: &str, retry_count: u32) -> String {
        if self.expansions.is_empty() {
            return original_query.to_string();
        }
        let expansion =
            &self.expansions[retry_count as usize % self.expansions.len()];
        format!("{} {}", original_query, expansion)
    }

    /// The configured expansion cycle
    pub fn expansions(&self) -> &[String] {
        &self.expansions
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rewrite_appends_first_expansion() {
        let rewriter = QueryRewriter::new(&WorkflowConfig::default());
        assert_eq!(rewriter.rewrite("教育政策", 0), "教育政策 国会");
    }

    #[test]
    fn test_rewrite_cycles_deterministically() {
        let rewriter = QueryRewriter::new(&WorkflowConfig::default());
        let terms = rewriter.expansions().to_vec();
        for retry in 0..(terms.len() as u32 * 2) {
            let expected = format!(
                "質問 {}",
                terms[retry as usize % terms.len()]
            );
            assert_eq!(rewriter.rewrite("質問", retry), expected);
        }
    }

    #[test]
    fn test_rewrite_uses_original_not_previous_rewrite() {
        let rewriter = QueryRewriter::new(&WorkflowConfig::default());
        let first = rewriter.rewrite("教育", 0);
        let second = rewriter.rewrite("教育", 1);
        assert_eq!(first, "教育 国会");
        assert_eq!(second, "教育 議会");
        assert!(!second.contains("国会"));
    }

    #[test]
    fn test_empty_expansion_list_is_identity() {
        let config = WorkflowConfig {
            expansion_terms: Vec::new(),
            ..Default::default()
        };
        let rewriter = QueryRewriter::new(&config);
        assert_eq!(rewriter.rewrite("教育", 3), "教育");
    }
}
