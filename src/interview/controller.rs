//! Turn-by-turn interview control

use crate::error::{InterviewError, Result};
use crate::interview::decision::{parse_decision, Decision};
use crate::interview::session::InterviewSession;
use crate::llm::prompts::{PromptParams, PromptTemplates};
use crate::llm::DecisionOracle;
use log::{debug, info, warn};
use std::time::Instant;

/// Asks the oracle what to do next and applies the answer to a session.
///
/// The controller keeps no per-candidate state, so one instance can run any
/// number of sessions one after another.
pub struct InterviewController<O: DecisionOracle> {
    oracle: O,
    templates: PromptTemplates,
}

impl<O: DecisionOracle> InterviewController<O> {
    pub fn new(oracle: O) -> Self {
        Self::with_templates(oracle, PromptTemplates::default())
    }

    pub fn with_templates(oracle: O, templates: PromptTemplates) -> Self {
        Self { oracle, templates }
    }

    pub fn oracle(&self) -> &O {
        &self.oracle
    }

    /// Decide the next turn.
    ///
    /// On `Ask` the question is appended to the history; on `Stop` the session
    /// is closed. Any error leaves the session exactly as it was, so the call
    /// can be retried.
    pub async fn decide_next(&mut self, session: &mut InterviewSession) -> Result<Decision> {
        if session.is_done() {
            return Err(InterviewError::SessionClosed);
        }

        let params = PromptParams::from_session(session);
        let system = self.templates.render_system();
        let user = self.templates.render_next_question(&params);

        let start = Instant::now();
        let raw = self.oracle.respond(&system, &user).await?;
        debug!(
            "{} replied in {:.2?}: {}",
            self.oracle.describe(),
            start.elapsed(),
            raw.trim()
        );

        let decision = parse_decision(&raw)?;

        match &decision {
            Decision::Ask { skill, question } => {
                if session.was_probed(skill) {
                    warn!("Oracle asked about '{}' again", skill);
                }
                info!("Probing skill '{}'", skill);
                session.record_question(skill.clone(), question.clone());
            }
            Decision::Stop => {
                info!(
                    "Interview finished after {} question(s)",
                    session.question_count()
                );
                session.finish();
            }
        }

        Ok(decision)
    }
}
