//! Hybrid retrieval: BM25 lexical index + dense-overlap approximation,
//! combined with weighted reciprocal-rank fusion.

pub mod index;
pub mod retriever;

pub use index::{tokenize, DocumentIndex};
pub use retriever::{HybridRetriever, RetrievedDocument};
