//! Corpus loader with per-file failure recovery
//!
//! Reads cached API batches from `<data>/corpus/*.json` in sorted order and
//! falls back to the bundled sample file when the corpus yields nothing.
//! Unreadable or malformed files are skipped with a warning; an empty
//! result is a valid outcome, not an error.

use std::fs;
use std::path::{Path, PathBuf};

use crate::corpus::document::{Document, SpeechEnvelope};
use crate::errors::Result;

/// Loads speech documents from the local data directory
#[derive(Debug, Clone)]
pub struct CorpusLoader {
    data_dir: PathBuf,
}

impl CorpusLoader {
    /// Create a loader rooted at the given data directory
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }

    /// Path to the corpus batch directory
    pub fn corpus_dir(&self) -> PathBuf {
        self.data_dir.join("corpus")
    }

    /// Path to the fallback sample file
    pub fn sample_path(&self) -> PathBuf {
        self.data_dir.join("sample").join("kokkai_sample.json")
    }

    /// Load all available documents
    ///
    /// Tries the corpus directory first, then the sample file. Per-source
    /// failures are recoverable and logged, never raised.
    pub fn load(&self) -> Vec<Document> {
        let mut documents = self.load_corpus_dir();

        if documents.is_empty() {
            let sample = self.sample_path();
            if sample.exists() {
                match Self::load_file(&sample) {
                    Ok(docs) => documents = docs,
                    Err(e) => {
                        tracing::warn!(
                            event = "corpus_sample_load_failed",
                            file = %sample.display(),
                            error = %e,
                        );
                    }
                }
            }
        }

        documents
    }

    fn load_corpus_dir(&self) -> Vec<Document> {
        let dir = self.corpus_dir();
        if !dir.exists() {
            return Vec::new();
        }

        let mut paths: Vec<PathBuf> = match fs::read_dir(&dir) {
            Ok(entries) => entries
                .filter_map(|e| e.ok())
                .map(|e| e.path())
                .filter(|p| p.extension().is_some_and(|ext| ext == "json"))
                .collect(),
            Err(e) => {
                tracing::warn!(
                    event = "corpus_dir_unreadable",
                    dir = %dir.display(),
                    error = %e,
                );
                return Vec::new();
            }
        };
        paths.sort();

        let mut documents = Vec::new();
        for path in paths {
            match Self::load_file(&path) {
                Ok(docs) => documents.extend(docs),
                Err(e) => {
                    tracing::warn!(
                        event = "corpus_file_load_failed",
                        file = %path.display(),
                        error = %e,
                    );
                }
            }
        }
        documents
    }

    fn load_file(path: &Path) -> Result<Vec<Document>> {
        let contents = fs::read_to_string(path)?;
        let envelope: SpeechEnvelope = serde_json::from_str(&contents)?;
        Ok(envelope.speech_record)
    }
}
