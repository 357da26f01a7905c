//! De-duplication, grouping and ordering of output rows.

use std::cmp::Ordering;
use std::collections::{BTreeSet, HashMap, HashSet};
use std::hash::Hash;

use crate::status::ErrorRow;

/// Rows that can be collapsed into one when they share a grouping key.
pub trait Groupable: Sized {
    /// Collapse a non-empty group, given in first-seen order, into one row.
    fn combine(key: &str, group: Vec<Self>) -> Self;
}

/// Remove exact duplicates, keeping the first occurrence of each record.
pub fn dedupe<T: Clone + Eq + Hash>(records: Vec<T>) -> Vec<T> {
    let mut seen = HashSet::new();
    records
        .into_iter()
        .filter(|record| seen.insert(record.clone()))
        .collect()
}

/// Collapse records sharing `key_fn` into one per key, ordered by key with
/// [`numeric_aware_cmp`].
pub fn group_by_key<T, F>(records: Vec<T>, key_fn: F) -> Vec<T>
where
    T: Groupable,
    F: Fn(&T) -> String,
{
    let mut index: HashMap<String, usize> = HashMap::new();
    let mut groups: Vec<(String, Vec<T>)> = Vec::new();
    for record in records {
        let key = key_fn(&record);
        match index.get(&key) {
            Some(&i) => groups[i].1.push(record),
            None => {
                index.insert(key.clone(), groups.len());
                groups.push((key, vec![record]));
            }
        }
    }

    groups.sort_by(|(a, _), (b, _)| numeric_aware_cmp(a, b));
    groups
        .into_iter()
        .map(|(key, group)| T::combine(&key, group))
        .collect()
}

/// Compare two strings, ordering numbers numerically before any non-numeric
/// value; non-numeric values compare lexically.
pub fn numeric_aware_cmp(a: &str, b: &str) -> Ordering {
    match (as_number(a), as_number(b)) {
        (Some(x), Some(y)) => x.partial_cmp(&y).unwrap_or(Ordering::Equal),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => a.cmp(b),
    }
}

fn as_number(s: &str) -> Option<f64> {
    s.trim().parse::<f64>().ok().filter(|n| n.is_finite())
}

/// Distinct non-empty values: numbers in numeric order, then the rest
/// lexically.
pub fn smart_sort<I>(values: I) -> Vec<String>
where
    I: IntoIterator<Item = String>,
{
    let unique: BTreeSet<String> = values.into_iter().filter(|v| !v.is_empty()).collect();
    let mut sorted: Vec<String> = unique.into_iter().collect();
    sorted.sort_by(|a, b| numeric_aware_cmp(a, b).then_with(|| a.cmp(b)));
    sorted
}

/// Order error rows by status (numbers first), then code, then description.
pub fn sort_error_rows(rows: &mut [ErrorRow]) {
    rows.sort_by(|a, b| {
        numeric_aware_cmp(&a.status, &b.status)
            .then_with(|| a.status.cmp(&b.status))
            .then_with(|| a.error_code.cmp(&b.error_code))
            .then_with(|| a.description.cmp(&b.description))
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(status: &str, code: &str, description: &str) -> ErrorRow {
        ErrorRow {
            status: status.into(),
            error_code: code.into(),
            description: description.into(),
            enum_values: String::new(),
        }
    }

    #[test]
    fn dedupe_keeps_first_seen_order() {
        let out = dedupe(vec!["b", "a", "b", "c", "a"]);
        assert_eq!(out, ["b", "a", "c"]);
    }

    #[test]
    fn numbers_sort_before_words() {
        let mut keys = vec!["default", "500", "4XX", "200", "404"];
        keys.sort_by(|a, b| numeric_aware_cmp(a, b));
        assert_eq!(keys, ["200", "404", "500", "4XX", "default"]);
    }

    #[test]
    fn numeric_comparison_is_not_lexical() {
        assert_eq!(numeric_aware_cmp("9", "10"), Ordering::Less);
        assert_eq!(numeric_aware_cmp("abc", "abd"), Ordering::Less);
    }

    #[test]
    fn smart_sort_dedupes_and_drops_empty() {
        let values = ["B", "10", "", "2", "A", "10"].map(String::from);
        assert_eq!(smart_sort(values), ["2", "10", "A", "B"]);
    }

    #[test]
    fn grouping_collapses_codes_per_status() {
        let rows = vec![
            row("500", "INTERNAL", "boom"),
            row("404", "NOT_FOUND", "missing"),
            row("404", "GONE", "deleted"),
        ];
        let grouped = group_by_key(rows, |r| r.status.clone());
        assert_eq!(grouped.len(), 2);
        assert_eq!(grouped[0].status, "404");
        assert_eq!(grouped[0].error_code, "GONE, NOT_FOUND");
        assert_eq!(grouped[0].description, "deleted; missing");
        assert_eq!(grouped[1].status, "500");
    }

    #[test]
    fn error_rows_sorted_by_status_then_code() {
        let mut rows = vec![
            row("default", "", "Unexpected"),
            row("404", "B", "x"),
            row("200", "", "Success"),
            row("404", "A", "y"),
        ];
        sort_error_rows(&mut rows);
        let keys: Vec<(&str, &str)> = rows
            .iter()
            .map(|r| (r.status.as_str(), r.error_code.as_str()))
            .collect();
        assert_eq!(keys, [("200", ""), ("404", "A"), ("404", "B"), ("default", "")]);
    }
}
