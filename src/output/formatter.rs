//! Session summary formatters: console text, markdown and JSON

use crate::config::OutputFormat;
use crate::error::{InterviewError, Result};
use crate::interview::session::SessionState;
use crate::output::summary::SessionSummary;
use askama::Template;
use colored::{Color, Colorize};
use std::path::Path;

pub trait SummaryFormatter {
    fn format_summary(&self, summary: &SessionSummary) -> Result<String>;
    fn supports_format(&self) -> OutputFormat;
}

/// Console formatter with optional colors
pub struct TextFormatter {
    use_colors: bool,
}

pub struct MarkdownFormatter;

pub struct JsonFormatter {
    pretty: bool,
}

/// Picks the formatter for a requested output format
pub struct SummaryRenderer {
    text_formatter: TextFormatter,
    markdown_formatter: MarkdownFormatter,
    json_formatter: JsonFormatter,
}

struct ExchangeRow {
    number: usize,
    skill: String,
    question: String,
    answer: String,
    has_answer: bool,
}

#[derive(Template)]
#[template(
    source = r#"# Interview Summary: {{ title }}

| Field | Value |
|---|---|
| NCO code | {{ code }} |
| Match score | {{ score }} |
| Status | {{ status }} |
| Started | {{ started_at }} |
{% if has_oracle %}| Interviewer | {{ oracle }} |
{% endif %}
{% if has_description %}> {{ description }}
{% endif %}
## Resume Skills

{% for skill in resume_skills %}- {{ skill }}
{% endfor %}
## Skills Evaluated

{% if skills_evaluated.is_empty() %}_No skills were probed._
{% else %}{% for skill in skills_evaluated %}- {{ skill }}
{% endfor %}{% endif %}
## Transcript
{% for row in rows %}
### Q{{ row.number }}{% if !row.skill.is_empty() %} ({{ row.skill }}){% endif %}

**Question:** {{ row.question }}

{% if row.has_answer %}**Answer:** {{ row.answer }}{% else %}_No answer recorded._{% endif %}
{% endfor %}
---
_Generated {{ generated_at }}_
"#,
    ext = "md"
)]
struct MarkdownTemplate {
    title: String,
    code: String,
    score: String,
    status: String,
    started_at: String,
    generated_at: String,
    description: String,
    has_description: bool,
    oracle: String,
    has_oracle: bool,
    resume_skills: Vec<String>,
    skills_evaluated: Vec<String>,
    rows: Vec<ExchangeRow>,
}

fn status_label(status: SessionState) -> &'static str {
    match status {
        SessionState::Active => "ended early",
        SessionState::Done => "completed",
    }
}

fn timestamp(time: &chrono::DateTime<chrono::Utc>) -> String {
    time.format("%Y-%m-%d %H:%M:%S UTC").to_string()
}

impl TextFormatter {
    pub fn new(use_colors: bool) -> Self {
        Self { use_colors }
    }

    fn colorize(&self, text: &str, color: Color) -> String {
        if self.use_colors {
            text.color(color).to_string()
        } else {
            text.to_string()
        }
    }

    fn header(&self, text: &str) -> String {
        if self.use_colors {
            format!("\n{}\n", text.bold().underline())
        } else {
            format!("\n{}\n{}\n", text, "-".repeat(text.chars().count()))
        }
    }
}

impl SummaryFormatter for TextFormatter {
    fn format_summary(&self, summary: &SessionSummary) -> Result<String> {
        let mut output = String::new();

        output.push_str(&self.header(&format!("INTERVIEW SUMMARY: {}", summary.job.title)));
        output.push_str(&format!(
            "NCO code: {} | match score: {:.3}\n",
            summary.job.code, summary.job.match_score
        ));
        let status_color = if summary.is_complete() { Color::Green } else { Color::Yellow };
        output.push_str(&format!(
            "Status: {} | started {}\n",
            self.colorize(status_label(summary.status), status_color),
            timestamp(&summary.started_at)
        ));
        if let Some(oracle) = &summary.oracle {
            output.push_str(&format!("Interviewer: {}\n", oracle));
        }

        output.push_str(&self.header("Skills Evaluated"));
        if summary.skills_evaluated.is_empty() {
            output.push_str("  (none)\n");
        }
        for skill in &summary.skills_evaluated {
            output.push_str(&format!("  • {}\n", self.colorize(skill, Color::Cyan)));
        }

        let untouched: Vec<&String> = summary
            .resume_skills
            .iter()
            .filter(|s| !summary.skills_evaluated.iter().any(|e| e.eq_ignore_ascii_case(s)))
            .collect();
        if !untouched.is_empty() {
            output.push_str(&format!(
                "  Not probed: {}\n",
                untouched.iter().map(|s| s.as_str()).collect::<Vec<_>>().join(", ")
            ));
        }

        output.push_str(&self.header("Transcript"));
        if summary.exchanges.is_empty() {
            output.push_str("  No questions were asked.\n");
        }
        for exchange in &summary.exchanges {
            let label = if exchange.skill.is_empty() {
                format!("Q{}", exchange.number)
            } else {
                format!("Q{} [{}]", exchange.number, exchange.skill)
            };
            output.push_str(&format!("{} {}\n", self.colorize(&label, Color::Blue), exchange.question));
            match &exchange.answer {
                Some(answer) => output.push_str(&format!("   > {}\n", answer)),
                None => output.push_str(&format!("   > {}\n", self.colorize("(no answer)", Color::BrightBlack))),
            }
        }

        output.push_str(&format!("\nGenerated {}\n", timestamp(&summary.generated_at)));
        Ok(output)
    }

    fn supports_format(&self) -> OutputFormat {
        OutputFormat::Text
    }
}

impl MarkdownFormatter {
    fn template_data(summary: &SessionSummary) -> MarkdownTemplate {
        MarkdownTemplate {
            title: summary.job.title.clone(),
            code: summary.job.code.clone(),
            score: format!("{:.3}", summary.job.match_score),
            status: status_label(summary.status).to_string(),
            started_at: timestamp(&summary.started_at),
            generated_at: timestamp(&summary.generated_at),
            description: summary.job.description.clone(),
            has_description: !summary.job.description.is_empty(),
            oracle: summary.oracle.clone().unwrap_or_default(),
            has_oracle: summary.oracle.is_some(),
            resume_skills: summary.resume_skills.clone(),
            skills_evaluated: summary.skills_evaluated.clone(),
            rows: summary
                .exchanges
                .iter()
                .map(|e| ExchangeRow {
                    number: e.number,
                    skill: e.skill.clone(),
                    question: e.question.clone(),
                    answer: e.answer.clone().unwrap_or_default(),
                    has_answer: e.answer.is_some(),
                })
                .collect(),
        }
    }
}

impl SummaryFormatter for MarkdownFormatter {
    fn format_summary(&self, summary: &SessionSummary) -> Result<String> {
        Self::template_data(summary)
            .render()
            .map_err(|e| InterviewError::OutputFormatting(format!("Markdown template failed: {}", e)))
    }

    fn supports_format(&self) -> OutputFormat {
        OutputFormat::Markdown
    }
}

impl JsonFormatter {
    pub fn new(pretty: bool) -> Self {
        Self { pretty }
    }
}

impl SummaryFormatter for JsonFormatter {
    fn format_summary(&self, summary: &SessionSummary) -> Result<String> {
        let json = if self.pretty {
            serde_json::to_string_pretty(summary)?
        } else {
            serde_json::to_string(summary)?
        };
        Ok(json)
    }

    fn supports_format(&self) -> OutputFormat {
        OutputFormat::Json
    }
}

impl SummaryRenderer {
    pub fn new(use_colors: bool) -> Self {
        Self {
            text_formatter: TextFormatter::new(use_colors),
            markdown_formatter: MarkdownFormatter,
            json_formatter: JsonFormatter::new(true),
        }
    }

    pub fn render(&self, summary: &SessionSummary, format: OutputFormat) -> Result<String> {
        match format {
            OutputFormat::Text => self.text_formatter.format_summary(summary),
            OutputFormat::Markdown => self.markdown_formatter.format_summary(summary),
            OutputFormat::Json => self.json_formatter.format_summary(summary),
        }
    }
}

impl Default for SummaryRenderer {
    fn default() -> Self {
        Self::new(true)
    }
}

pub fn save_summary_to_file(content: &str, file_path: &Path) -> Result<()> {
    if let Some(parent) = file_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    std::fs::write(file_path, content)?;
    Ok(())
}

/// Default file name for a saved summary, e.g. `interview_2512_0100_20240101_120000.md`.
pub fn suggest_filename(format: OutputFormat, job_code: &str) -> String {
    let code: String = job_code
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect();
    let stamp = chrono::Utc::now().format("%Y%m%d_%H%M%S");

    let extension = match format {
        OutputFormat::Text => "txt",
        OutputFormat::Markdown => "md",
        OutputFormat::Json => "json",
    };
    format!("interview_{}_{}.{}", code, stamp, extension)
}
