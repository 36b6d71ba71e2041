//! Semantic job matching
//! Embeddings, the flat vector index, the record table and the matcher on top

pub mod embeddings;
pub mod index;
pub mod records;
pub mod matcher;

pub use matcher::JobMatcher;
pub use records::{JobRecord, JobRow};
