//! Single-pass group-by + fold.
//!
//! Every view follows the same shape: extract a key per record, fold the
//! record into that key's accumulator, then derive rates from the finished
//! accumulators. [`group_fold`] is the pass; [`Tally`] is the general
//! purpose accumulator for views that only need counts, sums and unique ids.

use std::collections::{BTreeMap, HashSet};

use indexmap::IndexMap;
use tracing::debug;

use studio_core::{Identity, Measure, Record};

use crate::key::{extract_key, GroupSpec};

/// Accumulators keyed by group, in first-seen order.
#[derive(Debug, Clone)]
pub struct Grouped<A> {
    pub groups: IndexMap<String, A>,
    /// Records whose key could not be extracted (malformed dates).
    pub skipped: usize,
}

impl<A> Grouped<A> {
    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    pub fn get(&self, key: &str) -> Option<&A> {
        self.groups.get(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &A)> {
        self.groups.iter()
    }
}

impl<A> IntoIterator for Grouped<A> {
    type Item = (String, A);
    type IntoIter = indexmap::map::IntoIter<String, A>;

    fn into_iter(self) -> Self::IntoIter {
        self.groups.into_iter()
    }
}

/// Fold records into per-key accumulators in one pass.
///
/// A fresh `A::default()` is created on first sight of a key. Records for
/// which `key` returns `None` are counted in [`Grouped::skipped`].
pub fn group_fold<'a, R, A, I, K, F>(records: I, key: K, mut fold: F) -> Grouped<A>
where
    R: 'a + ?Sized,
    I: IntoIterator<Item = &'a R>,
    A: Default,
    K: Fn(&R) -> Option<String>,
    F: FnMut(&mut A, &R),
{
    let mut groups: IndexMap<String, A> = IndexMap::new();
    let mut skipped = 0usize;

    for record in records {
        match key(record) {
            Some(k) => fold(groups.entry(k).or_default(), record),
            None => skipped += 1,
        }
    }

    if skipped > 0 {
        debug!(skipped, groups = groups.len(), "records without a group key skipped");
    }

    Grouped { groups, skipped }
}

/// Counts, measure sums and identity sets for one group.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Tally {
    pub count: u64,
    sums: BTreeMap<Measure, f64>,
    uniques: BTreeMap<Identity, HashSet<String>>,
}

impl Tally {
    pub fn add<R: Record + ?Sized>(
        &mut self,
        record: &R,
        measures: &[Measure],
        identities: &[Identity],
    ) {
        self.count += 1;
        for m in measures {
            *self.sums.entry(*m).or_default() += record.measure(*m);
        }
        for id in identities {
            if let Some(v) = record.identity(*id) {
                self.uniques.entry(*id).or_default().insert(v.to_owned());
            }
        }
    }

    pub fn sum(&self, measure: Measure) -> f64 {
        self.sums.get(&measure).copied().unwrap_or(0.0)
    }

    pub fn unique(&self, id: Identity) -> usize {
        self.uniques.get(&id).map_or(0, HashSet::len)
    }
}

/// The generic "group-by + fold" utility: group by `spec`, tally each group.
pub fn group_tally<'a, R, I>(
    records: I,
    spec: &GroupSpec,
    measures: &[Measure],
    identities: &[Identity],
) -> Grouped<Tally>
where
    R: Record + 'a + ?Sized,
    I: IntoIterator<Item = &'a R>,
{
    group_fold(
        records,
        |r: &R| extract_key(r, spec),
        |t: &mut Tally, r: &R| t.add(r, measures, identities),
    )
}
