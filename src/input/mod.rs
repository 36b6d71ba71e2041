//! Resume input handling
//! Detects the resume format, extracts its text and pulls out the declared skills

pub mod file_detector;
pub mod text_extractor;
pub mod manager;
pub mod skills;

pub use manager::InputManager;
pub use skills::{extract_skills, SkillSet};
