//! Prompt templates for the interview oracle

use crate::interview::session::{InterviewSession, Turn};
use serde::{Deserialize, Serialize};

/// System and turn templates
#[derive(Debug, Clone)]
pub struct PromptTemplates {
    pub system: String,
    pub next_question: String,
}

impl Default for PromptTemplates {
    fn default() -> Self {
        Self {
            system: SYSTEM_TEMPLATE.to_string(),
            next_question: NEXT_QUESTION_TEMPLATE.to_string(),
        }
    }
}

/// Parameters for prompt template substitution
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromptParams {
    pub job_title: String,
    pub job_code: String,
    pub job_description: String,
    pub skills: Vec<String>,
    pub asked_skills: Vec<String>,
    pub transcript: Vec<Turn>,
}

impl PromptParams {
    pub fn from_session(session: &InterviewSession) -> Self {
        let job = session.job();
        Self {
            job_title: job.title.clone(),
            job_code: job.code.clone(),
            job_description: job.description.clone(),
            skills: session.skills().as_slice().to_vec(),
            asked_skills: session.asked_skills().into_iter().map(str::to_string).collect(),
            transcript: session.history().to_vec(),
        }
    }
}

fn bullet_list(items: &[String]) -> String {
    if items.is_empty() {
        "(none)".to_string()
    } else {
        items
            .iter()
            .map(|item| format!("- {}", item))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

fn render_transcript(turns: &[Turn]) -> String {
    if turns.is_empty() {
        return "(no questions asked yet)".to_string();
    }

    let mut question_number = 0;
    turns
        .iter()
        .map(|turn| match turn {
            Turn::SkillProbed { skill, question } => {
                question_number += 1;
                format!("Q{} [{}]: {}", question_number, skill, question)
            }
            Turn::Answer { text } => format!("Candidate: {}", text),
        })
        .collect::<Vec<_>>()
        .join("\n")
}

impl PromptTemplates {
    pub fn render_system(&self) -> String {
        self.system.clone()
    }

    /// Context for choosing the next question.
    pub fn render_next_question(&self, params: &PromptParams) -> String {
        self.next_question
            .replace("{title}", &params.job_title)
            .replace("{code}", &params.job_code)
            .replace("{description}", &params.job_description)
            .replace("{skills}", &bullet_list(&params.skills))
            .replace("{asked}", &bullet_list(&params.asked_skills))
            .replace("{transcript}", &render_transcript(&params.transcript))
    }
}

const SYSTEM_TEMPLATE: &str = "You are a strict interview agent. Respond only in JSON.";

const NEXT_QUESTION_TEMPLATE: &str = r#"You are an interview agent.

JOB ROLE (from government NCO data):
Title: {title}
NCO Code: {code}
Description: {description}

Candidate resume skills:
{skills}

Skills already evaluated:
{asked}

Interview so far:
{transcript}

Task:
- Decide the NEXT interview question
- Focus on skills required for the job
- Prefer skills not yet evaluated
- Ask exactly one question about one skill
- If sufficient confidence is achieved, stop

Respond ONLY in JSON:
{
  "action": "ask" or "stop",
  "skill": "<skill>",
  "question": "<question>"
}"#;
