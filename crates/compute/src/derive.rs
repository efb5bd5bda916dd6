//! Derived metrics: guarded ratios, averages and period-over-period change.
//!
//! Every division here returns `0.0` instead of `NaN` or infinity when the
//! denominator is zero, so an empty or degenerate group renders as zeros.

use std::collections::HashMap;

use serde::Serialize;

use studio_core::PeriodKey;

pub fn ratio(numerator: f64, denominator: f64) -> f64 {
    if denominator == 0.0 {
        return 0.0;
    }
    let r = numerator / denominator;
    if r.is_finite() {
        r
    } else {
        0.0
    }
}

/// `numerator / denominator * 100`, zero-guarded.
pub fn percentage(numerator: f64, denominator: f64) -> f64 {
    ratio(numerator, denominator) * 100.0
}

pub fn average(sum: f64, count: f64) -> f64 {
    ratio(sum, count)
}

/// `((current - previous) / previous) * 100`; a zero previous value is no change.
pub fn percent_change(current: f64, previous: f64) -> f64 {
    if previous == 0.0 {
        return 0.0;
    }
    percentage(current - previous, previous)
}

pub fn round2(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}

/// A value with its month-over-month and year-over-year change.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PeriodDelta {
    pub period: String,
    pub value: f64,
    pub mom_change: f64,
    pub yoy_change: f64,
}

/// Attach MoM/YoY change to period-keyed rows.
///
/// Rows are sorted by period key ascending. The MoM baseline is the
/// preceding row in that order, which is not necessarily the previous
/// calendar month when months are missing. The YoY baseline is the row for
/// the same month one year earlier, if present. Output is most recent first.
pub fn with_period_deltas<T, P, V>(mut rows: Vec<T>, period: P, value: V) -> Vec<(T, f64, f64)>
where
    P: Fn(&T) -> &str,
    V: Fn(&T) -> f64,
{
    rows.sort_by(|a, b| period(a).cmp(period(b)));

    let by_period: HashMap<String, f64> = rows
        .iter()
        .map(|r| (period(r).to_string(), value(r)))
        .collect();

    let mut out = Vec::with_capacity(rows.len());
    let mut previous: Option<f64> = None;
    for row in rows {
        let current = value(&row);
        let mom = previous.map_or(0.0, |p| percent_change(current, p));
        let yoy = period(&row)
            .parse::<PeriodKey>()
            .ok()
            .and_then(|k| by_period.get(&k.previous_year().to_string()))
            .map_or(0.0, |p| percent_change(current, *p));
        previous = Some(current);
        out.push((row, mom, yoy));
    }

    out.reverse();
    out
}

/// [`with_period_deltas`] over a bare `(period, value)` series.
pub fn period_deltas(series: &[(String, f64)]) -> Vec<PeriodDelta> {
    with_period_deltas(series.to_vec(), |(p, _)| p.as_str(), |(_, v)| *v)
        .into_iter()
        .map(|((period, value), mom, yoy)| PeriodDelta {
            period,
            value,
            mom_change: round2(mom),
            yoy_change: round2(yoy),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_denominators_are_zero() {
        assert_eq!(ratio(5.0, 0.0), 0.0);
        assert_eq!(percentage(5.0, 0.0), 0.0);
        assert_eq!(average(0.0, 0.0), 0.0);
        assert!(!percentage(1.0, 0.0).is_nan());
    }

    #[test]
    fn non_finite_results_are_zero() {
        assert_eq!(ratio(f64::INFINITY, 1.0), 0.0);
        assert_eq!(ratio(f64::NAN, 2.0), 0.0);
    }

    #[test]
    fn percent_change_guards_zero_previous() {
        assert_eq!(percent_change(500.0, 0.0), 0.0);
        assert_eq!(percent_change(150.0, 100.0), 50.0);
        assert_eq!(percent_change(50.0, 100.0), -50.0);
    }

    #[test]
    fn rounding() {
        assert_eq!(round2(33.33333), 33.33);
        assert_eq!(round2(66.666), 66.67);
    }

    #[test]
    fn deltas_use_sorted_adjacency_not_input_order() {
        let series = vec![
            ("2024-03".to_string(), 300.0),
            ("2024-01".to_string(), 100.0),
            ("2024-02".to_string(), 200.0),
        ];
        let out = period_deltas(&series);
        let periods: Vec<&str> = out.iter().map(|d| d.period.as_str()).collect();
        assert_eq!(periods, vec!["2024-03", "2024-02", "2024-01"]);
        assert_eq!(out[0].mom_change, 50.0);
        assert_eq!(out[1].mom_change, 100.0);
        assert_eq!(out[2].mom_change, 0.0);
    }

    #[test]
    fn gap_months_compare_against_previous_present_period() {
        let series = vec![("2024-01".to_string(), 100.0), ("2024-04".to_string(), 120.0)];
        let out = period_deltas(&series);
        assert_eq!(out[0].period, "2024-04");
        assert_eq!(out[0].mom_change, 20.0);
    }

    #[test]
    fn zero_previous_period_yields_zero_change() {
        let series = vec![("2024-02".to_string(), 0.0), ("2024-03".to_string(), 500.0)];
        let out = period_deltas(&series);
        assert_eq!(out[0].value, 500.0);
        assert_eq!(out[0].mom_change, 0.0);
        assert!(out[0].mom_change.is_finite());
    }

    #[test]
    fn year_over_year_uses_same_month_last_year() {
        let series = vec![
            ("2023-03".to_string(), 200.0),
            ("2024-02".to_string(), 100.0),
            ("2024-03".to_string(), 300.0),
        ];
        let out = period_deltas(&series);
        assert_eq!(out[0].period, "2024-03");
        assert_eq!(out[0].yoy_change, 50.0);
        assert_eq!(out[0].mom_change, 200.0);
        // No 2023-02 row.
        assert_eq!(out[1].yoy_change, 0.0);
    }
}
