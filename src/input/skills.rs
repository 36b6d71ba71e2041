//! Skill extraction from resume text

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::OnceLock;

/// Ordered, de-duplicated skills declared by a candidate.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SkillSet(Vec<String>);

impl SkillSet {
    /// Build a set, trimming entries and dropping blanks and case-insensitive repeats.
    pub fn new<I, S>(skills: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut seen = HashSet::new();
        let skills = skills
            .into_iter()
            .map(|s| s.as_ref().trim().to_string())
            .filter(|s| !s.is_empty())
            .filter(|s| seen.insert(s.to_lowercase()))
            .collect();
        Self(skills)
    }

    pub fn as_slice(&self) -> &[String] {
        &self.0
    }

    pub fn iter(&self) -> impl Iterator<Item = &String> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn contains(&self, skill: &str) -> bool {
        self.0.iter().any(|s| s.eq_ignore_ascii_case(skill.trim()))
    }

    /// Skills joined into a single search query.
    pub fn as_query(&self) -> String {
        self.0.join(", ")
    }
}

impl<S: AsRef<str>> FromIterator<S> for SkillSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self::new(iter)
    }
}

fn skills_header() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"(?i)^#*\s*(?:technical\s+|core\s+|key\s+)?skills\b(?:\s*(?:&|and|/)\s*[a-z]+(?:\s+[a-z]+)?)?\s*(?::\s*(.*))?$",
        )
        .expect("skills header pattern is valid")
    })
}

fn section_header() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"(?i)^#*\s*(?:projects|education|(?:work\s+|professional\s+)?experience|certifications|achievements|summary)\b",
        )
        .expect("section header pattern is valid")
    })
}

/// Split on commas outside brackets, so `Python (Pandas, NumPy)` stays whole.
fn split_inline(line: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;

    for (i, c) in line.char_indices() {
        match c {
            '(' | '[' => depth += 1,
            ')' | ']' => depth = depth.saturating_sub(1),
            ',' if depth == 0 => {
                parts.push(&line[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    parts.push(&line[start..]);

    parts.into_iter().map(str::trim).filter(|s| !s.is_empty()).collect()
}

/// Pull the skills section out of a resume.
///
/// The section starts at the first `Skills` header and runs until the next
/// known section header. Bullet lines are taken whole; other lines are split
/// on commas.
pub fn extract_skills(text: &str) -> SkillSet {
    let mut lines = text.lines().map(str::trim);
    let mut found = Vec::new();

    let inline = loop {
        match lines.next() {
            Some(line) => {
                if let Some(caps) = skills_header().captures(line) {
                    break caps.get(1).map(|m| m.as_str().to_string()).unwrap_or_default();
                }
            }
            None => return SkillSet::default(),
        }
    };

    found.extend(split_inline(&inline).into_iter().map(str::to_string));

    for line in lines {
        if section_header().is_match(line) {
            break;
        }
        if let Some(item) = line
            .strip_prefix("- ")
            .or_else(|| line.strip_prefix("* "))
            .or_else(|| line.strip_prefix('•'))
        {
            found.push(item.trim().to_string());
        } else {
            found.extend(split_inline(line).into_iter().map(str::to_string));
        }
    }

    SkillSet::new(found)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bulleted_skills_section() {
        let resume = "John Doe\nSoftware Engineer\n\nSkills:\n- Python\n- SQL\n- Docker\n\nProjects:\n- Built a CRM";
        let skills = extract_skills(resume);
        assert_eq!(skills.as_slice(), &["Python", "SQL", "Docker"]);
    }

    #[test]
    fn test_section_runs_to_end_of_text() {
        let skills = extract_skills("Skills:\n- Rust\n- Kubernetes");
        assert_eq!(skills.as_slice(), &["Rust", "Kubernetes"]);
    }

    #[test]
    fn test_inline_and_comma_separated_skills() {
        let resume = "Technical Skills: Rust, Go\nPostgreSQL, Redis\nEducation:\nBSc";
        let skills = extract_skills(resume);
        assert_eq!(skills.as_slice(), &["Rust", "Go", "PostgreSQL", "Redis"]);
    }

    #[test]
    fn test_markdown_header_and_bullet_styles() {
        let resume = "## Skills\n* Excel\n• Tableau\n- excel\n## Work Experience\n- Analyst";
        let skills = extract_skills(resume);
        assert_eq!(skills.as_slice(), &["Excel", "Tableau"]);
    }

    #[test]
    fn test_header_words_are_not_skills() {
        let resume = "Skills & Tools\n- Rust\n- Git\nEducation\n- BSc";
        assert_eq!(extract_skills(resume).as_slice(), &["Rust", "Git"]);

        let resume = "## Skills and Technologies\nKubernetes, Terraform";
        assert_eq!(extract_skills(resume).as_slice(), &["Kubernetes", "Terraform"]);

        let resume = "Skills & Tools: Git, Jira";
        assert_eq!(extract_skills(resume).as_slice(), &["Git", "Jira"]);
    }

    #[test]
    fn test_prose_mentioning_skills_is_not_a_header() {
        let resume = "Skills are best shown through projects.\nSkills:\n- Go";
        assert_eq!(extract_skills(resume).as_slice(), &["Go"]);
    }

    #[test]
    fn test_commas_inside_brackets_stay_in_one_skill() {
        let resume = "Skills: Python (Pandas, NumPy), SQL\nCloud [AWS, GCP], Docker";
        assert_eq!(
            extract_skills(resume).as_slice(),
            &["Python (Pandas, NumPy)", "SQL", "Cloud [AWS, GCP]", "Docker"]
        );
        assert_eq!(split_inline("a), b"), vec!["a)", "b"]);
    }

    #[test]
    fn test_missing_section_yields_empty_set() {
        assert!(extract_skills("Jane Roe\nExperience:\n- Teacher").is_empty());
    }

    #[test]
    fn test_skill_set_helpers() {
        let skills = SkillSet::new(["SQL", " Python ", "", "sql"]);
        assert_eq!(skills.len(), 2);
        assert!(skills.contains("python"));
        assert_eq!(skills.as_query(), "SQL, Python");
    }
}
