//! Read-only projection of an interview session for export

use crate::interview::session::{InterviewSession, SessionState, Turn};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobSummary {
    pub code: String,
    pub title: String,
    pub description: String,
    pub match_score: f32,
}

/// A question and the candidate's reply, if one was given.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Exchange {
    pub number: usize,
    pub skill: String,
    pub question: String,
    pub answer: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionSummary {
    pub job: JobSummary,
    pub status: SessionState,
    pub resume_skills: Vec<String>,
    pub skills_evaluated: Vec<String>,
    pub exchanges: Vec<Exchange>,
    pub oracle: Option<String>,
    pub started_at: DateTime<Utc>,
    pub generated_at: DateTime<Utc>,
}

impl SessionSummary {
    pub fn from_session(session: &InterviewSession) -> Self {
        let job = session.job();

        let mut skills_evaluated: Vec<String> = Vec::new();
        for skill in session.asked_skills() {
            if !skills_evaluated.iter().any(|s| s.eq_ignore_ascii_case(skill)) {
                skills_evaluated.push(skill.to_string());
            }
        }

        Self {
            job: JobSummary {
                code: job.code.clone(),
                title: job.title.clone(),
                description: job.description.clone(),
                match_score: job.score,
            },
            status: session.state(),
            resume_skills: session.skills().as_slice().to_vec(),
            skills_evaluated,
            exchanges: pair_turns(session.history()),
            oracle: None,
            started_at: session.started_at(),
            generated_at: Utc::now(),
        }
    }

    pub fn with_oracle(mut self, oracle: impl Into<String>) -> Self {
        self.oracle = Some(oracle.into());
        self
    }

    pub fn is_complete(&self) -> bool {
        self.status == SessionState::Done
    }

    pub fn answered_count(&self) -> usize {
        self.exchanges.iter().filter(|e| e.answer.is_some()).count()
    }
}

/// Group the flat transcript into question/answer pairs, preserving order.
fn pair_turns(history: &[Turn]) -> Vec<Exchange> {
    let mut exchanges: Vec<Exchange> = Vec::new();

    for turn in history {
        match turn {
            Turn::SkillProbed { skill, question } => exchanges.push(Exchange {
                number: exchanges.len() + 1,
                skill: skill.clone(),
                question: question.clone(),
                answer: None,
            }),
            Turn::Answer { text } => match exchanges.last_mut() {
                Some(Exchange { answer: Some(existing), .. }) => {
                    existing.push('\n');
                    existing.push_str(text);
                }
                Some(last) => last.answer = Some(text.clone()),
                None => exchanges.push(Exchange {
                    number: 1,
                    skill: String::new(),
                    question: String::new(),
                    answer: Some(text.clone()),
                }),
            },
        }
    }

    exchanges
}
