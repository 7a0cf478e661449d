//! Request/response boundary types

pub mod types;

pub use types::{ExperimentRequest, ExperimentResponse};
