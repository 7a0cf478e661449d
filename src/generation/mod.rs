//! Grounded answer generation via an external language-model provider

pub mod provider;
pub mod synthesizer;

pub use provider::{FixedResponder, LlmProvider, OllamaProvider};
pub use synthesizer::{AnswerSynthesizer, Synthesis};
