//! Integration tests for the interview agent

use nco_interview::config::OutputFormat;
use nco_interview::error::{InterviewError, Result};
use nco_interview::input::manager::InputManager;
use nco_interview::interview::{Decision, InterviewController, InterviewSession, Turn};
use nco_interview::llm::DecisionOracle;
use nco_interview::output::{SessionSummary, SummaryRenderer};
use nco_interview::processing::embeddings::Embedder;
use nco_interview::processing::index::VectorIndex;
use nco_interview::processing::records::JobRecordStore;
use nco_interview::processing::JobMatcher;
use std::collections::VecDeque;
use std::path::Path;
use tempfile::TempDir;

/// Counts occurrences of a few domain words.
struct VocabularyEmbedder;

const VOCABULARY: [&str; 8] = ["software", "code", "web", "sql", "patients", "tax", "wiring", "database"];

impl Embedder for VocabularyEmbedder {
    fn embed(&self, text: &str) -> Vec<f32> {
        let text = text.to_lowercase();
        VOCABULARY.iter().map(|w| text.matches(w).count() as f32).collect()
    }

    fn name(&self) -> &str {
        "vocabulary"
    }
}

struct ScriptedOracle {
    replies: VecDeque<String>,
}

impl DecisionOracle for ScriptedOracle {
    async fn respond(&mut self, _system: &str, _user: &str) -> Result<String> {
        self.replies
            .pop_front()
            .ok_or_else(|| InterviewError::Oracle("no scripted reply left".to_string()))
    }

    fn describe(&self) -> String {
        "scripted".to_string()
    }
}

fn fixture_matcher() -> JobMatcher<VocabularyEmbedder> {
    let store = JobRecordStore::load(Path::new("tests/fixtures/job_records.json")).unwrap();
    let index = VectorIndex::build(&VocabularyEmbedder, store.rows(), None).unwrap();
    JobMatcher::from_parts(VocabularyEmbedder, index, store).unwrap()
}

#[tokio::test]
async fn test_text_extraction_from_txt() {
    let mut manager = InputManager::new();
    let path = Path::new("tests/fixtures/sample_resume.txt");

    let text = manager.extract_text(path).await.unwrap();
    assert!(text.contains("John Doe"));
    assert!(text.contains("Software Engineer"));
    assert!(text.contains("React"));
    assert!(text.contains("Node.js"));
}

#[tokio::test]
async fn test_text_extraction_from_markdown() {
    let mut manager = InputManager::new();
    let path = Path::new("tests/fixtures/sample_resume.md");

    let text = manager.extract_text(path).await.unwrap();
    assert!(text.contains("John Doe"));
    assert!(text.contains("Software Engineer"));
    assert!(text.contains("React"));
    assert!(!text.contains("**"));
    assert!(!text.contains("##"));
}

#[tokio::test]
async fn test_skills_from_both_formats_agree() {
    let mut manager = InputManager::new();
    let from_txt = manager.load_skills(Path::new("tests/fixtures/sample_resume.txt")).await.unwrap();
    let from_md = manager.load_skills(Path::new("tests/fixtures/sample_resume.md")).await.unwrap();

    assert_eq!(
        from_txt.as_slice(),
        &["JavaScript", "React", "Node.js", "PostgreSQL", "Docker"]
    );
    assert_eq!(from_md.as_slice(), &["JavaScript", "React", "Node.js", "PostgreSQL"]);
    assert_eq!(manager.cache_size(), 2);
}

#[tokio::test]
async fn test_caching_functionality() {
    let mut manager = InputManager::new();
    let path = Path::new("tests/fixtures/sample_resume.txt");

    let text1 = manager.extract_text(path).await.unwrap();
    assert_eq!(manager.cache_size(), 1);

    let text2 = manager.extract_text(path).await.unwrap();
    assert_eq!(text1, text2);
    assert_eq!(manager.cache_size(), 1);

    manager.clear_cache();
    assert_eq!(manager.cache_size(), 0);

    let mut uncached = InputManager::new().with_cache(false);
    uncached.extract_text(path).await.unwrap();
    assert_eq!(uncached.cache_size(), 0);
}

#[tokio::test]
async fn test_unsupported_and_missing_files() {
    let mut manager = InputManager::new();
    assert!(manager.extract_text(Path::new("tests/fixtures/unsupported.xyz")).await.is_err());
    assert!(manager.extract_text(Path::new("tests/fixtures/nonexistent.txt")).await.is_err());
}

#[test]
fn test_search_over_fixture_records() {
    let matcher = fixture_matcher();
    assert_eq!(matcher.len(), 5);

    let results = matcher.search("web software code", 3).unwrap();
    assert_eq!(results.len(), 3);
    assert_eq!(results[0].code, "2512.0100");
    assert!(results.windows(2).all(|w| w[0].score >= w[1].score));

    let sql = matcher.search("SQL database", 1).unwrap();
    assert_eq!(sql[0].title, "Database Designer");
}

#[test]
fn test_csv_records_match_json_records() {
    let from_csv = JobRecordStore::load(Path::new("tests/fixtures/job_records.csv")).unwrap();
    let from_json = JobRecordStore::load(Path::new("tests/fixtures/job_records.json")).unwrap();

    assert_eq!(from_csv.rows(), from_json.rows());
    assert_eq!(from_csv.rows()[0].code, "2512.0100");

    let index = VectorIndex::build(&VocabularyEmbedder, from_csv.rows(), None).unwrap();
    let matcher = JobMatcher::from_parts(VocabularyEmbedder, index, from_csv).unwrap();
    assert_eq!(matcher.search("patients", 1).unwrap()[0].code, "2221.0100");
}

#[test]
fn test_saved_index_serves_identical_results() {
    let dir = TempDir::new().unwrap();
    let store = JobRecordStore::load(Path::new("tests/fixtures/job_records.json")).unwrap();
    let index = VectorIndex::build(&VocabularyEmbedder, store.rows(), None).unwrap();

    index.save(&dir.path().join("job_index.safetensors"), "vocabulary").unwrap();
    store.save(&dir.path().join("job_records.json")).unwrap();

    let reloaded = JobMatcher::from_parts(
        VocabularyEmbedder,
        VectorIndex::load(&dir.path().join("job_index.safetensors")).unwrap(),
        JobRecordStore::load(&dir.path().join("job_records.json")).unwrap(),
    )
    .unwrap();

    let original = fixture_matcher();
    assert_eq!(
        reloaded.search("tax", 5).unwrap(),
        original.search("tax", 5).unwrap()
    );
}

#[tokio::test]
async fn test_full_interview_flow() {
    let skills = InputManager::new()
        .load_skills(Path::new("tests/fixtures/sample_resume.txt"))
        .await
        .unwrap();

    let job = fixture_matcher().search("software code for the web", 1).unwrap().remove(0);
    assert_eq!(job.title, "Software Developer");

    let oracle = ScriptedOracle {
        replies: VecDeque::from(vec![
            r#"{"action":"ask","skill":"React","question":"How do you manage state in a large React app?"}"#.to_string(),
            "Here you go:\n```json\n{\"action\":\"ask\",\"skill\":\"PostgreSQL\",\"question\":\"How would you index a slow query?\"}\n```".to_string(),
            r#"{"action":"stop"}"#.to_string(),
        ]),
    };
    let mut controller = InterviewController::new(oracle);
    let mut session = InterviewSession::new(job, skills);

    let mut answers = vec!["Redux for shared state, local state elsewhere.", "EXPLAIN first, then a composite index."].into_iter();
    loop {
        match controller.decide_next(&mut session).await.unwrap() {
            Decision::Ask { .. } => session.record_answer(answers.next().unwrap()),
            Decision::Stop => break,
        }
    }

    assert!(session.is_done());
    assert_eq!(session.asked_skills(), vec!["React", "PostgreSQL"]);
    assert_eq!(
        session.history()[3],
        Turn::Answer {
            text: "EXPLAIN first, then a composite index.".to_string()
        }
    );
    assert!(matches!(
        controller.decide_next(&mut session).await,
        Err(InterviewError::SessionClosed)
    ));

    let summary = SessionSummary::from_session(&session).with_oracle(controller.oracle().describe());
    let markdown = SummaryRenderer::new(false).render(&summary, OutputFormat::Markdown).unwrap();
    assert!(markdown.contains("Software Developer"));
    assert!(markdown.contains("### Q2 (PostgreSQL)"));
    assert!(markdown.contains("| Interviewer | scripted |"));
}
