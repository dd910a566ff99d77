//! Data models for the survey report generator.
//!
//! This module contains the core data structures that flow through the
//! pipeline: the loaded survey table, per-question frequency distributions,
//! and the renderable artifacts that end up in the final document.

use std::fmt;

/// An in-memory survey export: named columns over ordered rows.
///
/// Cells are already normalized to text; `None` marks a missing response.
/// The column set is fixed once the table is constructed.
#[derive(Debug, Clone)]
pub struct SurveyTable {
    headers: Vec<String>,
    rows: Vec<Vec<Option<String>>>,
}

impl SurveyTable {
    /// Create a table from headers and normalized rows.
    ///
    /// Rows shorter than the header count are padded with missing cells so
    /// column lookups never go out of bounds.
    pub fn new(headers: Vec<String>, mut rows: Vec<Vec<Option<String>>>) -> Self {
        for row in &mut rows {
            row.resize(headers.len(), None);
        }
        Self { headers, rows }
    }

    /// All column names, in sheet order.
    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    /// Number of data rows (excluding the header row).
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Column names that identify survey questions, sorted lexicographically.
    pub fn question_columns(&self, prefix: &str) -> Vec<String> {
        let mut columns: Vec<String> = self
            .headers
            .iter()
            .filter(|h| h.starts_with(prefix))
            .cloned()
            .collect();
        columns.sort();
        columns
    }

    /// Non-missing values of a column, in row order.
    ///
    /// Returns `None` when the column does not exist at all; an existing but
    /// fully-empty column yields an empty vector.
    pub fn column_values(&self, name: &str) -> Option<Vec<&str>> {
        let index = self.headers.iter().position(|h| h == name)?;
        Some(
            self.rows
                .iter()
                .filter_map(|row| row[index].as_deref())
                .collect(),
        )
    }
}

/// Frequency distribution of one question's responses.
///
/// Entries are kept in discovery order (first row in which each distinct
/// value appeared); display ordering is derived on demand.
#[derive(Debug, Clone)]
pub struct FrequencyDistribution {
    question: String,
    entries: Vec<(String, u64)>,
    total: u64,
}

impl FrequencyDistribution {
    /// Build a distribution from already-counted entries in discovery order.
    pub fn new(question: String, entries: Vec<(String, u64)>) -> Self {
        let total = entries.iter().map(|(_, count)| count).sum();
        Self {
            question,
            entries,
            total,
        }
    }

    /// The question column this distribution was derived from.
    pub fn question(&self) -> &str {
        &self.question
    }

    /// Number of non-missing responses.
    pub fn total_responses(&self) -> u64 {
        self.total
    }

    /// Number of distinct response values.
    pub fn distinct_count(&self) -> usize {
        self.entries.len()
    }

    /// Entries in discovery order.
    pub fn entries(&self) -> &[(String, u64)] {
        &self.entries
    }

    /// Entries sorted by descending count.
    ///
    /// The sort is stable, so ties keep their discovery order.
    pub fn sorted_entries(&self) -> Vec<(&str, u64)> {
        let mut sorted: Vec<(&str, u64)> = self
            .entries
            .iter()
            .map(|(value, count)| (value.as_str(), *count))
            .collect();
        sorted.sort_by_key(|(_, count)| std::cmp::Reverse(*count));
        sorted
    }

    /// Percentage of the distribution total represented by `count`.
    pub fn percentage(&self, count: u64) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            (count as f64 / self.total as f64) * 100.0
        }
    }
}

impl fmt::Display for FrequencyDistribution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {} responses, {} distinct",
            self.question,
            self.total,
            self.entries.len()
        )
    }
}

/// One row of a rendered frequency table.
#[derive(Debug, Clone)]
pub struct TableRowData {
    pub response: String,
    pub count: u64,
    /// Percentage of the distribution total, one decimal place.
    pub percentage: f64,
}

/// A data table artifact: response/count/percentage rows in display order.
#[derive(Debug, Clone)]
pub struct TableArtifact {
    pub rows: Vec<TableRowData>,
}

/// A rendered bar chart, held as PNG bytes after the transient image file
/// has been cleaned up.
#[derive(Debug, Clone)]
pub struct ChartArtifact {
    pub png: Vec<u8>,
    pub width_px: u32,
    pub height_px: u32,
}

/// The renderable unit embedded into the document for one question.
#[derive(Debug, Clone)]
pub enum Artifact {
    Table(TableArtifact),
    Chart(ChartArtifact),
}

impl Artifact {
    /// Short human name, used in progress output.
    pub fn kind(&self) -> &'static str {
        match self {
            Artifact::Table(_) => "table",
            Artifact::Chart(_) => "chart",
        }
    }
}

/// One assembled document section: heading, artifact, narrative.
#[derive(Debug, Clone)]
pub struct ReportSection {
    pub question: String,
    pub total_responses: u64,
    pub artifact: Artifact,
    pub analysis: String,
}

/// End-of-run statistics printed in the console summary.
#[derive(Debug, Clone, Default)]
pub struct RunSummary {
    /// Sections written to the document.
    pub sections: usize,
    /// Questions skipped (empty column or render failure).
    pub skipped: usize,
    /// Requests issued to the text-generation service.
    pub requests: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_table() -> SurveyTable {
        SurveyTable::new(
            vec![
                "Timestamp".to_string(),
                "Questao 12".to_string(),
                "Questao 11".to_string(),
            ],
            vec![
                vec![
                    Some("t1".to_string()),
                    Some("2022".to_string()),
                    Some("A".to_string()),
                ],
                vec![Some("t2".to_string()), None, Some("B".to_string())],
                vec![Some("t3".to_string()), Some("2023".to_string()), None],
            ],
        )
    }

    #[test]
    fn test_question_columns_sorted() {
        let table = make_table();
        let columns = table.question_columns("Questao");
        assert_eq!(columns, vec!["Questao 11", "Questao 12"]);
    }

    #[test]
    fn test_column_values_drops_missing() {
        let table = make_table();
        let values = table.column_values("Questao 12").unwrap();
        assert_eq!(values, vec!["2022", "2023"]);
    }

    #[test]
    fn test_column_values_absent_column() {
        let table = make_table();
        assert!(table.column_values("Questao 99").is_none());
    }

    #[test]
    fn test_short_rows_are_padded() {
        let table = SurveyTable::new(
            vec!["Questao 1".to_string(), "Questao 2".to_string()],
            vec![vec![Some("A".to_string())]],
        );
        assert_eq!(table.column_values("Questao 2").unwrap().len(), 0);
    }

    #[test]
    fn test_distribution_totals() {
        let dist = FrequencyDistribution::new(
            "Questao 11".to_string(),
            vec![("A".to_string(), 3), ("B".to_string(), 2)],
        );
        assert_eq!(dist.total_responses(), 5);
        assert_eq!(dist.distinct_count(), 2);
        assert_eq!(dist.percentage(3), 60.0);
    }

    #[test]
    fn test_sorted_entries_stable_on_ties() {
        let dist = FrequencyDistribution::new(
            "Questao 11".to_string(),
            vec![
                ("first".to_string(), 2),
                ("second".to_string(), 2),
                ("third".to_string(), 5),
            ],
        );
        let sorted = dist.sorted_entries();
        assert_eq!(sorted[0].0, "third");
        // Tied counts keep discovery order.
        assert_eq!(sorted[1].0, "first");
        assert_eq!(sorted[2].0, "second");
    }

    #[test]
    fn test_percentage_of_empty_distribution() {
        let dist = FrequencyDistribution::new("Questao 11".to_string(), vec![]);
        assert_eq!(dist.percentage(0), 0.0);
    }
}
