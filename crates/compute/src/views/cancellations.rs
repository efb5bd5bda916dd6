use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use studio_core::{CancellationRecord, Dimension, Identity, Measure, Record};

use crate::aggregate::{group_fold, group_tally};
use crate::derive::{average, percentage, round2};
use crate::key::{extract_key, GroupSpec};
use crate::rank::{sort_desc_by, sort_recent_first};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LateCancellationRow {
    pub key: String,
    pub cancellations: u64,
    pub unique_members: usize,
    pub avg_per_member: f64,
    pub new_member_cancellations: u64,
    /// Share of all grouped cancellations, percent.
    pub share: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RepeatCancellerRow {
    pub member: String,
    pub name: String,
    pub cancellations: u64,
    pub distinct_classes: usize,
    /// Latest cancellation date (`YYYY-MM-DD`), if any date parsed.
    pub most_recent: Option<String>,
}

pub fn late_cancellations_by<'a, I>(records: I, spec: &GroupSpec) -> Vec<LateCancellationRow>
where
    I: IntoIterator<Item = &'a CancellationRecord>,
{
    let grouped = group_tally(
        records,
        spec,
        &[Measure::LateCancelled, Measure::NewCustomers],
        &[Identity::Member],
    );
    let total: u64 = grouped.iter().map(|(_, t)| t.count).sum();

    let mut rows: Vec<LateCancellationRow> = grouped
        .into_iter()
        .map(|(key, t)| {
            let members = t.unique(Identity::Member);
            LateCancellationRow {
                key,
                cancellations: t.count,
                unique_members: members,
                avg_per_member: average(t.count as f64, members as f64),
                new_member_cancellations: t.sum(Measure::NewCustomers) as u64,
                share: round2(percentage(t.count as f64, total as f64)),
            }
        })
        .collect();

    if spec.is_date_keyed() {
        sort_recent_first(&mut rows, |r| r.key.as_str());
    } else {
        sort_desc_by(&mut rows, |r| r.cancellations as f64, |r| r.key.as_str());
    }
    rows
}

#[derive(Debug, Default)]
struct MemberAcc {
    name: Option<String>,
    count: u64,
    classes: HashSet<String>,
    latest: Option<chrono::NaiveDateTime>,
}

/// Members with at least `min_cancellations` late cancellations, most first.
pub fn repeat_cancellers<'a, I>(records: I, min_cancellations: usize) -> Vec<RepeatCancellerRow>
where
    I: IntoIterator<Item = &'a CancellationRecord>,
{
    let member_spec = GroupSpec::field(Dimension::Member);
    let class_spec = GroupSpec::field(Dimension::ClassFormat);

    let grouped = group_fold(
        records,
        |c: &CancellationRecord| extract_key(c, &member_spec),
        |acc: &mut MemberAcc, c: &CancellationRecord| {
            acc.count += 1;
            if acc.name.is_none() {
                acc.name = display_name(c);
            }
            if let Some(class) = extract_key(c, &class_spec) {
                acc.classes.insert(class);
            }
            if let Some(dt) = c.date() {
                acc.latest = Some(acc.latest.map_or(dt, |l| l.max(dt)));
            }
        },
    );

    let mut rows: Vec<RepeatCancellerRow> = grouped
        .into_iter()
        .filter(|(member, acc)| {
            member != studio_core::UNKNOWN && acc.count >= min_cancellations as u64
        })
        .map(|(member, acc)| RepeatCancellerRow {
            name: acc.name.unwrap_or_else(|| member.clone()),
            member,
            cancellations: acc.count,
            distinct_classes: acc.classes.len(),
            most_recent: acc.latest.map(|d| d.format("%Y-%m-%d").to_string()),
        })
        .collect();

    sort_desc_by(&mut rows, |r| r.cancellations as f64, |r| r.member.as_str());
    rows
}

fn display_name(c: &CancellationRecord) -> Option<String> {
    let parts: Vec<&str> = [&c.first_name, &c.last_name]
        .into_iter()
        .filter_map(|p| p.as_deref().map(str::trim).filter(|s| !s.is_empty()))
        .collect();
    (!parts.is_empty()).then(|| parts.join(" "))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cancel(
        member: &str,
        first: &str,
        class: &str,
        date: &str,
        is_new: bool,
    ) -> CancellationRecord {
        CancellationRecord {
            member_id: Some(member.to_string()),
            first_name: Some(first.to_string()),
            last_name: Some("K".to_string()),
            cleaned_class: Some(class.to_string()),
            location: Some("Bandra West".to_string()),
            date_ist: Some(date.to_string()),
            is_new: Some(if is_new { "Yes" } else { "No" }.to_string()),
            ..Default::default()
        }
    }

    fn sample() -> Vec<CancellationRecord> {
        vec![
            cancel("m1", "Asha", "Barre 57", "2024-03-01", true),
            cancel("m1", "Asha", "PowerCycle", "2024-03-09", true),
            cancel("m1", "Asha", "Barre 57", "05/04/2024", true),
            cancel("m2", "Ravi", "Barre 57", "2024-04-02", false),
        ]
    }

    #[test]
    fn by_class_counts_and_shares() {
        let rows = late_cancellations_by(&sample(), &GroupSpec::field(Dimension::ClassFormat));
        assert_eq!(rows[0].key, "Barre 57");
        assert_eq!(rows[0].cancellations, 3);
        assert_eq!(rows[0].unique_members, 2);
        assert_eq!(rows[0].avg_per_member, 1.5);
        assert_eq!(rows[0].new_member_cancellations, 2);
        assert_eq!(rows[0].share, 75.0);
        assert_eq!(rows[1].share, 25.0);
    }

    #[test]
    fn monthly_recent_first() {
        let rows = late_cancellations_by(&sample(), &GroupSpec::field(Dimension::Month));
        let keys: Vec<&str> = rows.iter().map(|r| r.key.as_str()).collect();
        assert_eq!(keys, vec!["2024-04", "2024-03"]);
        assert_eq!(rows[0].cancellations, 2);
    }

    #[test]
    fn repeat_cancellers_threshold() {
        let rows = repeat_cancellers(&sample(), 3);
        assert_eq!(rows.len(), 1);
        let asha = &rows[0];
        assert_eq!(asha.member, "m1");
        assert_eq!(asha.name, "Asha K");
        assert_eq!(asha.cancellations, 3);
        assert_eq!(asha.distinct_classes, 2);
        assert_eq!(asha.most_recent.as_deref(), Some("2024-04-05"));
    }

    #[test]
    fn anonymous_cancellations_are_not_repeat_cancellers() {
        let anon = vec![CancellationRecord::default(); 5];
        assert!(repeat_cancellers(&anon, 1).is_empty());
    }

    #[test]
    fn email_only_members_agree_with_repeat_cancellers() {
        let by_email = CancellationRecord {
            email: Some("a@x.in".to_string()),
            date_ist: Some("2024-06-03".to_string()),
            ..Default::default()
        };
        let records = vec![by_email; 3];

        let rows = late_cancellations_by(&records, &GroupSpec::field(Dimension::Month));
        assert_eq!(rows[0].cancellations, 3);
        assert_eq!(rows[0].unique_members, 1);
        assert_eq!(rows[0].avg_per_member, 3.0);

        let repeat = repeat_cancellers(&records, 3);
        assert_eq!(repeat.len(), 1);
        assert_eq!(repeat[0].member, "a@x.in");
    }
}
