//! Job record table that sits alongside the vector index

use crate::error::{InterviewError, Result};
use log::info;
use serde::{Deserialize, Deserializer, Serialize};
use std::path::Path;

/// One row of the occupational classification table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobRow {
    #[serde(alias = "NCO_Code", deserialize_with = "string_or_number")]
    pub code: String,
    #[serde(alias = "Title", deserialize_with = "string_or_null")]
    pub title: String,
    #[serde(alias = "Description", default, deserialize_with = "string_or_null")]
    pub description: String,
}

impl JobRow {
    /// Text that gets embedded for this row when the index is built.
    pub fn embedding_text(&self) -> String {
        if self.description.is_empty() {
            self.title.clone()
        } else {
            format!("{}. {}", self.title, self.description)
        }
    }
}

/// A job returned by a search, scored against the query that found it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobRecord {
    pub code: String,
    pub title: String,
    pub description: String,
    pub score: f32,
}

impl JobRecord {
    pub fn from_row(row: &JobRow, score: f32) -> Self {
        Self {
            code: row.code.clone(),
            title: row.title.clone(),
            description: row.description.clone(),
            score,
        }
    }
}

fn string_or_null<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

fn string_or_number<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::String(s) => Ok(s),
        serde_json::Value::Number(n) if !n.is_f64() => Ok(n.to_string()),
        serde_json::Value::Number(n) => Err(serde::de::Error::custom(format!(
            "job code {} must be quoted as a string to keep its digits",
            n
        ))),
        other => Err(serde::de::Error::custom(format!(
            "expected a string or number job code, found {}",
            other
        ))),
    }
}

/// A row as it appears in a CSV export. Codes stay raw text so `2512.0100`
/// keeps its trailing zeros.
#[derive(Debug, Deserialize)]
struct CsvJobRow {
    #[serde(alias = "NCO_Code")]
    code: String,
    #[serde(alias = "Title")]
    title: String,
    #[serde(alias = "Description", default)]
    description: Option<String>,
}

impl From<CsvJobRow> for JobRow {
    fn from(row: CsvJobRow) -> Self {
        Self {
            code: row.code.trim().to_string(),
            title: row.title,
            description: row.description.unwrap_or_default(),
        }
    }
}

/// Rows addressed by their position in the index.
#[derive(Debug, Clone, Default)]
pub struct JobRecordStore {
    rows: Vec<JobRow>,
}

impl JobRecordStore {
    pub fn new(rows: Vec<JobRow>) -> Self {
        Self { rows }
    }

    /// Load a record table. `.csv` files are read as a headed CSV export,
    /// anything else as a JSON array of rows.
    pub fn load(path: &Path) -> Result<Self> {
        let unavailable = |e: &dyn std::fmt::Display| {
            InterviewError::index_unavailable("records", format!("{}: {}", path.display(), e))
        };

        let is_csv = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("csv"));

        let rows: Vec<JobRow> = if is_csv {
            let mut reader = csv::Reader::from_path(path).map_err(|e| unavailable(&e))?;
            reader
                .deserialize::<CsvJobRow>()
                .map(|row| row.map(JobRow::from))
                .collect::<std::result::Result<Vec<_>, csv::Error>>()
                .map_err(|e| unavailable(&e))?
        } else {
            let content = std::fs::read_to_string(path).map_err(|e| unavailable(&e))?;
            serde_json::from_str(&content).map_err(|e| unavailable(&e))?
        };

        info!("Loaded {} job records from {}", rows.len(), path.display());
        Ok(Self { rows })
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let content = serde_json::to_string_pretty(&self.rows)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn get(&self, position: usize) -> Option<&JobRow> {
        self.rows.get(position)
    }

    pub fn rows(&self) -> &[JobRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_rows_accept_nco_column_names() {
        let json = r#"[
            {"NCO_Code": "2512.0100", "Title": "Software Developer", "Description": "Designs software"},
            {"NCO_Code": 7411, "Title": "Electrician", "Description": null},
            {"code": "3313.0200", "title": "Accountant"}
        ]"#;
        let rows: Vec<JobRow> = serde_json::from_str(json).unwrap();

        assert_eq!(rows[0].code, "2512.0100");
        assert_eq!(rows[1].code, "7411");
        assert_eq!(rows[1].description, "");
        assert_eq!(rows[2].title, "Accountant");
        assert_eq!(rows[2].embedding_text(), "Accountant");
        assert_eq!(rows[0].embedding_text(), "Software Developer. Designs software");
    }

    #[test]
    fn test_fractional_numeric_code_is_rejected() {
        let json = r#"[{"NCO_Code": 2512.0100, "Title": "Software Developer"}]"#;
        let err = serde_json::from_str::<Vec<JobRow>>(json).unwrap_err();
        assert!(err.to_string().contains("must be quoted as a string"));

        let dir = TempDir::new().unwrap();
        let path = dir.path().join("records.json");
        std::fs::write(&path, json).unwrap();
        let err = JobRecordStore::load(&path).unwrap_err();
        assert!(matches!(err, InterviewError::IndexUnavailable { ref asset, .. } if asset == "records"));
    }

    #[test]
    fn test_csv_export_keeps_code_digits() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nco.CSV");
        std::fs::write(
            &path,
            "Unnamed: 0,NCO_Code,Title,Description\n\
             0,2512.0100,Software Developer,\"Designs, writes and tests software\"\n\
             1,7411.0100,Electrician,\n",
        )
        .unwrap();

        let store = JobRecordStore::load(&path).unwrap();
        assert_eq!(store.len(), 2);
        assert_eq!(store.rows()[0].code, "2512.0100");
        assert_eq!(store.rows()[0].description, "Designs, writes and tests software");
        assert_eq!(store.rows()[1].code, "7411.0100");
        assert_eq!(store.rows()[1].embedding_text(), "Electrician");
    }

    #[test]
    fn test_csv_without_code_column_is_index_unavailable() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("broken.csv");
        std::fs::write(&path, "Title,Description\nNurse,Cares for patients\n").unwrap();

        let err = JobRecordStore::load(&path).unwrap_err();
        assert!(matches!(err, InterviewError::IndexUnavailable { ref asset, .. } if asset == "records"));
    }

    #[test]
    fn test_missing_records_file_is_index_unavailable() {
        let err = JobRecordStore::load(Path::new("/nonexistent/job_records.json")).unwrap_err();
        assert!(matches!(err, InterviewError::IndexUnavailable { ref asset, .. } if asset == "records"));
    }

    #[test]
    fn test_save_and_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("records.json");
        let store = JobRecordStore::new(vec![JobRow {
            code: "2166.0100".to_string(),
            title: "Graphic Designer".to_string(),
            description: "Creates visual concepts".to_string(),
        }]);

        store.save(&path).unwrap();
        let loaded = JobRecordStore::load(&path).unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded.get(0), store.get(0));
        assert!(loaded.get(1).is_none());
    }
}
