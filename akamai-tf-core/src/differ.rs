//! Differ - Compare a desired collection with the current one by natural key
//!
//! Vendor APIs that replace a whole collection per call (hostnames on a
//! property version, for example) still need a client-side diff to decide
//! whether a call is required and to report what it will change.

use std::collections::BTreeMap;
use std::fmt;

/// Result of comparing one keyed entry
#[derive(Debug, Clone, PartialEq)]
pub enum Diff<T> {
    /// Entry does not exist -> needs creation
    Create(T),
    /// Entry exists with differences -> needs update
    Update { from: T, to: T },
    /// Entry exists with no differences -> no action needed
    NoChange(T),
    /// Entry exists but is not desired -> needs deletion
    Delete(T),
}

impl<T> Diff<T> {
    /// Returns whether this Diff involves a change
    pub fn is_change(&self) -> bool {
        !matches!(self, Diff::NoChange(_))
    }
}

/// Compare `desired` against `current`, pairing entries by `key`
///
/// Output order: desired entries in their given order, then deletions in the
/// order they appear in `current`. Duplicate keys keep the last entry.
pub fn diff_by_key<T, K, F>(current: &[T], desired: &[T], key: F) -> Vec<Diff<T>>
where
    T: Clone + PartialEq,
    K: Ord,
    F: Fn(&T) -> K,
{
    let current_by_key: BTreeMap<K, &T> = current.iter().map(|c| (key(c), c)).collect();
    let desired_keys: BTreeMap<K, ()> = desired.iter().map(|d| (key(d), ())).collect();

    let mut diffs = Vec::with_capacity(desired.len());
    for wanted in desired {
        let d = match current_by_key.get(&key(wanted)) {
            None => Diff::Create(wanted.clone()),
            Some(existing) if *existing == wanted => Diff::NoChange(wanted.clone()),
            Some(existing) => Diff::Update {
                from: (*existing).clone(),
                to: wanted.clone(),
            },
        };
        diffs.push(d);
    }

    for existing in current {
        if !desired_keys.contains_key(&key(existing)) {
            diffs.push(Diff::Delete(existing.clone()));
        }
    }

    diffs
}

/// Counts of changes in a diff, for display
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DiffSummary {
    pub create: usize,
    pub update: usize,
    pub delete: usize,
}

impl DiffSummary {
    pub fn of<T>(diffs: &[Diff<T>]) -> Self {
        let mut summary = Self::default();
        for d in diffs {
            match d {
                Diff::Create(_) => summary.create += 1,
                Diff::Update { .. } => summary.update += 1,
                Diff::Delete(_) => summary.delete += 1,
                Diff::NoChange(_) => {}
            }
        }
        summary
    }

    pub fn is_empty(&self) -> bool {
        self.create == 0 && self.update == 0 && self.delete == 0
    }
}

impl fmt::Display for DiffSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} to add, {} to change, {} to remove",
            self.create, self.update, self.delete
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    struct Entry {
        name: &'static str,
        target: &'static str,
    }

    fn entry(name: &'static str, target: &'static str) -> Entry {
        Entry { name, target }
    }

    #[test]
    fn diff_create_update_delete() {
        let current = vec![entry("a", "x"), entry("b", "y"), entry("c", "z")];
        let desired = vec![entry("b", "y2"), entry("a", "x"), entry("d", "w")];

        let diffs = diff_by_key(&current, &desired, |e| e.name);

        assert_eq!(
            diffs,
            vec![
                Diff::Update {
                    from: entry("b", "y"),
                    to: entry("b", "y2")
                },
                Diff::NoChange(entry("a", "x")),
                Diff::Create(entry("d", "w")),
                Diff::Delete(entry("c", "z")),
            ]
        );
        let summary = DiffSummary::of(&diffs);
        assert_eq!(summary.to_string(), "1 to add, 1 to change, 1 to remove");
    }

    #[test]
    fn identical_collections_have_no_changes() {
        let current = vec![entry("a", "x"), entry("b", "y")];
        let diffs = diff_by_key(&current, &current.clone(), |e| e.name);
        assert!(diffs.iter().all(|d| !d.is_change()));
        assert!(DiffSummary::of(&diffs).is_empty());
    }
}
