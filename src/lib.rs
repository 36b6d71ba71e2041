//! NCO interview agent library
//!
//! Matches free-text resumes against a fixed occupational index and drives an
//! adaptive, one-question-at-a-time skills interview through a language model.

pub mod cli;
pub mod config;
pub mod error;
pub mod input;
pub mod interview;
pub mod llm;
pub mod output;
pub mod processing;

pub use config::Config;
pub use error::{InterviewError, Result};
