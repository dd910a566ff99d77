//! Frequency counting for question columns.
//!
//! This module produces the per-question distribution the renderer and
//! enricher work from. A question with no usable data is not an error: it
//! yields `None` and the caller skips it.

use crate::models::{FrequencyDistribution, SurveyTable};
use std::collections::HashMap;

/// Aggregate one question column into a frequency distribution.
///
/// Missing cells are dropped before counting. Returns `None` when the
/// column is absent from the table or contains no non-missing values; the
/// caller logs and moves on to the next question.
pub fn aggregate_question(table: &SurveyTable, column: &str) -> Option<FrequencyDistribution> {
    let values = table.column_values(column)?;
    if values.is_empty() {
        return None;
    }

    // Count while preserving the order each distinct value was first seen,
    // so tied counts stay deterministic in the sorted view.
    let mut counts: HashMap<&str, u64> = HashMap::new();
    let mut discovery: Vec<&str> = Vec::new();

    for value in values {
        let entry = counts.entry(value).or_insert(0);
        if *entry == 0 {
            discovery.push(value);
        }
        *entry += 1;
    }

    let entries: Vec<(String, u64)> = discovery
        .into_iter()
        .map(|value| (value.to_string(), counts[value]))
        .collect();

    Some(FrequencyDistribution::new(column.to_string(), entries))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table_with_column(values: Vec<Option<&str>>) -> SurveyTable {
        SurveyTable::new(
            vec!["Questao 11".to_string()],
            values
                .into_iter()
                .map(|v| vec![v.map(String::from)])
                .collect(),
        )
    }

    #[test]
    fn test_aggregate_counts_and_order() {
        // 12 rows, 10 non-missing: the end-to-end scenario distribution.
        let table = table_with_column(vec![
            Some("A"),
            Some("A"),
            Some("A"),
            Some("B"),
            Some("B"),
            Some("C"),
            Some("C"),
            Some("C"),
            Some("C"),
            Some("D"),
            None,
            None,
        ]);

        let dist = aggregate_question(&table, "Questao 11").unwrap();
        assert_eq!(dist.total_responses(), 10);
        assert_eq!(dist.distinct_count(), 4);

        let sorted = dist.sorted_entries();
        assert_eq!(sorted[0], ("C", 4));
        assert_eq!(sorted[1], ("A", 3));
        assert_eq!(sorted[2], ("B", 2));
        assert_eq!(sorted[3], ("D", 1));

        let percentages: Vec<f64> = sorted
            .iter()
            .map(|(_, count)| dist.percentage(*count))
            .collect();
        assert_eq!(percentages, vec![40.0, 30.0, 20.0, 10.0]);
    }

    #[test]
    fn test_percentages_sum_to_hundred() {
        let table = table_with_column(vec![
            Some("x"),
            Some("y"),
            Some("y"),
            Some("z"),
            Some("z"),
            Some("z"),
            Some("w"),
        ]);

        let dist = aggregate_question(&table, "Questao 11").unwrap();
        let sum: f64 = dist
            .sorted_entries()
            .iter()
            .map(|(_, count)| dist.percentage(*count))
            .sum();
        assert!((sum - 100.0).abs() < 0.1);
    }

    #[test]
    fn test_all_missing_column_is_skipped() {
        let table = table_with_column(vec![None, None, None]);
        assert!(aggregate_question(&table, "Questao 11").is_none());
    }

    #[test]
    fn test_absent_column_is_skipped() {
        let table = table_with_column(vec![Some("A")]);
        assert!(aggregate_question(&table, "Questao 42").is_none());
    }

    #[test]
    fn test_tied_counts_keep_first_seen_order() {
        let table = table_with_column(vec![Some("late"), Some("early"), Some("late"), Some("early")]);
        let dist = aggregate_question(&table, "Questao 11").unwrap();
        let sorted = dist.sorted_entries();
        assert_eq!(sorted[0].0, "late");
        assert_eq!(sorted[1].0, "early");
    }
}
