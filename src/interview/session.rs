//! Per-candidate interview session state

use crate::input::skills::SkillSet;
use crate::processing::records::JobRecord;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strsim::normalized_levenshtein;

/// Skills closer than this are treated as the same skill when checking repeats.
const SAME_SKILL_SIMILARITY: f64 = 0.85;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionState {
    Active,
    Done,
}

/// One entry in the interview transcript.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Turn {
    SkillProbed { skill: String, question: String },
    Answer { text: String },
}

/// Everything the controller needs to know about one candidate's interview.
///
/// History is append-only. Starting over means building a new session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InterviewSession {
    job: JobRecord,
    skills: SkillSet,
    history: Vec<Turn>,
    state: SessionState,
    started_at: DateTime<Utc>,
}

impl InterviewSession {
    pub fn new(job: JobRecord, skills: SkillSet) -> Self {
        Self {
            job,
            skills,
            history: Vec::new(),
            state: SessionState::Active,
            started_at: Utc::now(),
        }
    }

    pub fn job(&self) -> &JobRecord {
        &self.job
    }

    pub fn skills(&self) -> &SkillSet {
        &self.skills
    }

    pub fn history(&self) -> &[Turn] {
        &self.history
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn is_active(&self) -> bool {
        self.state == SessionState::Active
    }

    pub fn is_done(&self) -> bool {
        self.state == SessionState::Done
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    /// Skills probed so far, in the order they were asked.
    pub fn asked_skills(&self) -> Vec<&str> {
        self.history
            .iter()
            .filter_map(|turn| match turn {
                Turn::SkillProbed { skill, .. } => Some(skill.as_str()),
                Turn::Answer { .. } => None,
            })
            .collect()
    }

    /// The most recent question, if any.
    pub fn last_question(&self) -> Option<&str> {
        self.history.iter().rev().find_map(|turn| match turn {
            Turn::SkillProbed { question, .. } => Some(question.as_str()),
            Turn::Answer { .. } => None,
        })
    }

    pub fn question_count(&self) -> usize {
        self.history
            .iter()
            .filter(|turn| matches!(turn, Turn::SkillProbed { .. }))
            .count()
    }

    /// Whether `skill` (or a near spelling of it) has already been probed.
    pub fn was_probed(&self, skill: &str) -> bool {
        let wanted = skill.trim().to_lowercase();
        self.asked_skills()
            .iter()
            .any(|asked| normalized_levenshtein(&asked.to_lowercase(), &wanted) >= SAME_SKILL_SIMILARITY)
    }

    /// Record the candidate's reply to the last question.
    pub fn record_answer(&mut self, text: impl Into<String>) {
        self.history.push(Turn::Answer { text: text.into() });
    }

    pub(crate) fn record_question(&mut self, skill: String, question: String) {
        self.history.push(Turn::SkillProbed { skill, question });
    }

    pub(crate) fn finish(&mut self) {
        self.state = SessionState::Done;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_job() -> JobRecord {
        JobRecord {
            code: "2512.0100".to_string(),
            title: "Software Developer".to_string(),
            description: "Researches, designs and writes software".to_string(),
            score: 0.82,
        }
    }

    #[test]
    fn test_new_session_is_active_and_empty() {
        let session = InterviewSession::new(sample_job(), SkillSet::new(["Rust", "SQL"]));
        assert!(session.is_active());
        assert!(session.history().is_empty());
        assert_eq!(session.skills().len(), 2);
        assert_eq!(session.last_question(), None);
    }

    #[test]
    fn test_history_grows_in_order() {
        let mut session = InterviewSession::new(sample_job(), SkillSet::new(["Rust", "SQL"]));
        session.record_question("Rust".to_string(), "What is ownership?".to_string());
        session.record_answer("Each value has one owner.");
        session.record_question("SQL".to_string(), "Explain a join.".to_string());

        assert_eq!(session.history().len(), 3);
        assert_eq!(session.asked_skills(), vec!["Rust", "SQL"]);
        assert_eq!(session.question_count(), 2);
        assert_eq!(session.last_question(), Some("Explain a join."));
        assert_eq!(
            session.history()[1],
            Turn::Answer {
                text: "Each value has one owner.".to_string()
            }
        );
    }

    #[test]
    fn test_was_probed_tolerates_spelling() {
        let mut session = InterviewSession::new(sample_job(), SkillSet::default());
        session.record_question("PostgreSQL".to_string(), "Q".to_string());

        assert!(session.was_probed("postgresql"));
        assert!(session.was_probed("Postgre SQL"));
        assert!(!session.was_probed("Python"));
    }

    #[test]
    fn test_finish_is_terminal() {
        let mut session = InterviewSession::new(sample_job(), SkillSet::default());
        session.finish();
        assert!(session.is_done());
        assert_eq!(session.state(), SessionState::Done);
    }
}
