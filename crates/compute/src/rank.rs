//! Ordering and leaderboard helpers for MetricRows.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Ascending,
    #[default]
    Descending,
}

/// Read a numeric field of any serializable row by its serialized name.
pub fn field_value<T: Serialize>(row: &T, field: &str) -> Option<f64> {
    serde_json::to_value(row).ok()?.get(field)?.as_f64()
}

fn compare_keys(a: Option<f64>, b: Option<f64>, order: SortOrder) -> Ordering {
    match (a, b) {
        (Some(x), Some(y)) => match order {
            SortOrder::Ascending => x.total_cmp(&y),
            SortOrder::Descending => y.total_cmp(&x),
        },
        // Rows without the field go last in either order.
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// Stable sort of rows by a numeric field (camelCase name).
pub fn sort_by_field<T: Serialize>(rows: Vec<T>, field: &str, order: SortOrder) -> Vec<T> {
    let mut keyed: Vec<(Option<f64>, T)> = rows
        .into_iter()
        .map(|r| (field_value(&r, field), r))
        .collect();
    keyed.sort_by(|(a, _), (b, _)| compare_keys(*a, *b, order));
    keyed.into_iter().map(|(_, r)| r).collect()
}

/// Value-descending sort with the group key as tie-breaker.
pub(crate) fn sort_desc_by<T, V, K>(rows: &mut [T], value: V, key: K)
where
    V: Fn(&T) -> f64,
    K: Fn(&T) -> &str,
{
    rows.sort_by(|a, b| value(b).total_cmp(&value(a)).then_with(|| key(a).cmp(key(b))));
}

/// Chronological keys, newest first.
pub(crate) fn sort_recent_first<T, K>(rows: &mut [T], key: K)
where
    K: Fn(&T) -> &str,
{
    rows.sort_by(|a, b| key(b).cmp(key(a)));
}

/// First `n` rows of an already-ranked list.
pub fn top_n<T: Clone>(rows: &[T], n: usize) -> Vec<T> {
    rows.iter().take(n).cloned().collect()
}

/// Last `n` rows of the same ranked list, read from the tail.
pub fn bottom_n<T: Clone>(rows: &[T], n: usize) -> Vec<T> {
    rows[rows.len().saturating_sub(n)..].to_vec()
}

/// Explicit ascending re-sort by `field`, then the first `n`.
pub fn bottom_n_ascending<T: Serialize + Clone>(rows: &[T], field: &str, n: usize) -> Vec<T> {
    sort_by_field(rows.to_vec(), field, SortOrder::Ascending)
        .into_iter()
        .take(n)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq, Serialize)]
    #[serde(rename_all = "camelCase")]
    struct Row {
        name: &'static str,
        total_revenue: f64,
        fill_rate: f64,
    }

    fn rows() -> Vec<Row> {
        vec![
            Row { name: "a", total_revenue: 300.0, fill_rate: 10.0 },
            Row { name: "b", total_revenue: 100.0, fill_rate: 90.0 },
            Row { name: "c", total_revenue: 200.0, fill_rate: 50.0 },
            Row { name: "d", total_revenue: 50.0, fill_rate: 70.0 },
        ]
    }

    fn names(rows: &[Row]) -> Vec<&'static str> {
        rows.iter().map(|r| r.name).collect()
    }

    #[test]
    fn sorts_by_any_numeric_field() {
        let by_rev = sort_by_field(rows(), "totalRevenue", SortOrder::Descending);
        assert_eq!(names(&by_rev), vec!["a", "c", "b", "d"]);

        let by_fill = sort_by_field(rows(), "fillRate", SortOrder::Ascending);
        assert_eq!(names(&by_fill), vec!["a", "c", "d", "b"]);
    }

    #[test]
    fn unknown_field_keeps_order() {
        let same = sort_by_field(rows(), "nope", SortOrder::Descending);
        assert_eq!(names(&same), vec!["a", "b", "c", "d"]);
    }

    #[test]
    fn bottom_reads_tail_of_descending_list() {
        let ranked = sort_by_field(rows(), "totalRevenue", SortOrder::Descending);
        assert_eq!(names(&top_n(&ranked, 2)), vec!["a", "c"]);
        // Tail keeps descending order.
        assert_eq!(names(&bottom_n(&ranked, 2)), vec!["b", "d"]);
        assert_eq!(bottom_n(&ranked, 10).len(), 4);
    }

    #[test]
    fn needs_improvement_re_sorts_ascending() {
        let ranked = sort_by_field(rows(), "totalRevenue", SortOrder::Descending);
        let worst = bottom_n_ascending(&ranked, "totalRevenue", 2);
        assert_eq!(names(&worst), vec!["d", "b"]);
    }

    #[test]
    fn desc_ties_break_on_key() {
        let mut r = vec![("z", 1.0), ("a", 1.0), ("m", 2.0)];
        sort_desc_by(&mut r, |x| x.1, |x| x.0);
        assert_eq!(r, vec![("m", 2.0), ("a", 1.0), ("z", 1.0)]);
    }
}
