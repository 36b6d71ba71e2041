//! Exporting finished (or abandoned) interviews

pub mod formatter;
pub mod summary;

pub use formatter::{save_summary_to_file, suggest_filename, SummaryRenderer};
pub use summary::SessionSummary;
