//! Corpus provider: document model and filesystem loader
//!
//! Wraps the speech records served by the National Diet proceedings API
//! (kokkai.ndl.go.jp) and loads locally cached batches from disk.

pub mod document;
pub mod loader;

pub use document::{Document, SpeechEnvelope};
pub use loader::CorpusLoader;
