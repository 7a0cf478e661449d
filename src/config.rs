//! Workflow configuration
//!
//! All fixed weights, thresholds and term lists used by the retrieval and
//! decision components live here as one immutable value, passed into each
//! component at construction. The defaults are the reference parameters;
//! a TOML file under `~/.kokkai-rag/` can override them.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

/// Configuration for the retrieval-and-decision workflow
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowConfig {
    /// Rank-fusion constant shared by both RRF terms
    pub rrf_k: f64,
    /// Weight of the BM25 lexical signal in rank fusion
    pub bm25_weight: f64,
    /// Weight of the dense (character-overlap) signal in rank fusion
    pub dense_weight: f64,
    /// Minimum keyword intersection for a document to grade as relevant
    pub grade_keyword_overlap: usize,
    /// Retrieval score at or above which a document grades as relevant
    /// regardless of keyword overlap
    pub grade_score_floor: f64,
    /// HITL activates when fewer relevant documents than this are found
    pub confidence_threshold: usize,
    /// Maximum query rewrite attempts per request
    pub max_rewrite_retries: u32,
    /// Default number of documents to retrieve
    pub default_top_k: usize,
    /// Retrieved document content is truncated to this many characters
    pub content_truncate_chars: usize,
    /// Generated answers are truncated to this many characters
    pub answer_truncate_chars: usize,
    /// Queries containing any of these terms require human review
    pub sensitive_keywords: Vec<String>,
    /// Expansion terms cycled through by the query rewriter
    pub expansion_terms: Vec<String>,
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            rrf_k: 60.0,
            bm25_weight: 0.3,
            dense_weight: 0.7,
            grade_keyword_overlap: 2,
            grade_score_floor: 0.3,
            confidence_threshold: 2,
            max_rewrite_retries: 2,
            default_top_k: 5,
            content_truncate_chars: 500,
            answer_truncate_chars: 1000,
            sensitive_keywords: [
                "給与",
                "人事",
                "機密",
                "予算",
                "秘密",
                "内部",
                "極秘",
                "個人情報",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            expansion_terms: ["国会", "議会", "審議", "委員会", "法案"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

impl WorkflowConfig {
    /// Load configuration from file, creating the default if it doesn't exist
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;

        if !config_path.exists() {
            let config = WorkflowConfig::default();
            config.save()?;
            return Ok(config);
        }

        let contents = fs::read_to_string(&config_path)
            .context("Failed to read config file")?;

        let config: WorkflowConfig = toml::from_str(&contents)
            .context("Failed to parse config file")?;

        Ok(config)
    }

    /// Save configuration to file
    pub fn save(&self) -> Result<()> {
        let config_path = Self::config_path()?;

        if let Some(parent) = config_path.parent() {
            fs::create_dir_all(parent)
                .context("Failed to create config directory")?;
        }

        let toml_string = toml::to_string_pretty(self)
            .context("Failed to serialize config")?;

        fs::write(&config_path, toml_string)
            .context("Failed to write config file")?;

        Ok(())
    }

    /// Get the configuration file path
    pub fn config_path() -> Result<PathBuf> {
        let home = dirs::home_dir()
            .context("Could not determine home directory")?;

        Ok(home.join(".kokkai-rag").join("config.toml"))
    }
}
