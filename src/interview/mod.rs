//! Adaptive interview: session state, oracle decisions and the controller

pub mod controller;
pub mod decision;
pub mod session;

pub use controller::InterviewController;
pub use decision::{parse_decision, Decision};
pub use session::{InterviewSession, SessionState, Turn};
