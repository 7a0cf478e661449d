//! Relevance grading for retrieved documents

pub mod grader;

pub use grader::{GradeOutcome, GradedDocument, RelevanceGrader};
