//! Text extraction from resume file formats

use crate::error::{InterviewError, Result};
use pulldown_cmark::{html, Parser};
use regex::Regex;
use std::path::Path;
use tokio::fs;

pub trait TextExtractor {
    fn extract(&self, path: &Path) -> impl std::future::Future<Output = Result<String>> + Send;
}

pub struct PdfExtractor;

impl TextExtractor for PdfExtractor {
    async fn extract(&self, path: &Path) -> Result<String> {
        let bytes = fs::read(path).await?;

        let text = pdf_extract::extract_text_from_mem(&bytes).map_err(|e| {
            InterviewError::PdfExtraction(format!("Failed to extract text from PDF '{}': {}", path.display(), e))
        })?;
        Ok(text)
    }
}

pub struct PlainTextExtractor;

impl TextExtractor for PlainTextExtractor {
    async fn extract(&self, path: &Path) -> Result<String> {
        Ok(fs::read_to_string(path).await?)
    }
}

pub struct MarkdownExtractor;

impl TextExtractor for MarkdownExtractor {
    async fn extract(&self, path: &Path) -> Result<String> {
        let markdown_content = fs::read_to_string(path).await?;
        self.render(&markdown_content)
    }
}

impl MarkdownExtractor {
    /// Render markdown to plain text. List items keep a `- ` bullet so the
    /// skill extractor sees the same shape as a plain-text resume.
    pub fn render(&self, markdown: &str) -> Result<String> {
        let parser = Parser::new(markdown);
        let mut html_output = String::new();
        html::push_html(&mut html_output, parser);

        self.html_to_text(&html_output)
    }

    fn html_to_text(&self, html: &str) -> Result<String> {
        let item_re = Regex::new(r"<li>\s*(?:<p>)?")
            .map_err(|e| InterviewError::InvalidInput(e.to_string()))?;
        let tag_re = Regex::new(r"<[^>]*>")
            .map_err(|e| InterviewError::InvalidInput(e.to_string()))?;

        let text = item_re.replace_all(html, "- ");
        let text = text
            .replace("</li>", "\n")
            .replace("<br>", "\n")
            .replace("<br />", "\n")
            .replace("</p>", "\n\n");

        let clean_text = tag_re.replace_all(&text, "");
        let clean_text = clean_text
            .replace("&nbsp;", " ")
            .replace("&lt;", "<")
            .replace("&gt;", ">")
            .replace("&quot;", "\"")
            .replace("&#39;", "'")
            .replace("&amp;", "&");

        let lines: Vec<&str> = clean_text
            .lines()
            .map(|line| line.trim())
            .filter(|line| !line.is_empty())
            .collect();

        Ok(lines.join("\n"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_markdown_lists_keep_bullets() {
        let text = MarkdownExtractor
            .render("# Jane Roe\n\n## Skills\n\n- Rust\n- **SQL** &amp; reporting\n\n## Education\n\nBSc")
            .unwrap();

        assert!(text.contains("Jane Roe"));
        assert!(text.contains("\nSkills\n"));
        assert!(text.contains("- Rust"));
        assert!(text.contains("- SQL & reporting"));
        assert!(!text.contains("**"));
        assert!(!text.contains("##"));
    }

    #[test]
    fn test_loose_list_items_stay_on_one_line() {
        let text = MarkdownExtractor.render("- Python\n\n- Docker\n").unwrap();
        assert_eq!(text, "- Python\n- Docker");
    }
}
