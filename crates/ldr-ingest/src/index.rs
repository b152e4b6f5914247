use std::collections::HashMap;

use ldr_schemas::{EmissionStatus, LedgerRow, NormalizedKey};

/// Matched ledger rows grouped by key, in stream order.
///
/// Only keys from the candidate set ever get an entry. Consumed by
/// [`crate::finalize`]; there is no way back from a [`FinalizedIndex`].
#[derive(Debug, Default)]
pub struct KeyIndex {
    groups: HashMap<NormalizedKey, Vec<LedgerRow>>,
    rows: u64,
}

impl KeyIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a row to its key's group, creating the group on first sight.
    pub fn push(&mut self, key: NormalizedKey, row: LedgerRow) {
        self.groups.entry(key).or_default().push(row);
        self.rows += 1;
    }

    pub fn get(&self, key: &str) -> Option<&[LedgerRow]> {
        self.groups.get(key).map(Vec::as_slice)
    }

    /// Number of distinct keys.
    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    pub fn total_rows(&self) -> u64 {
        self.rows
    }

    pub fn keys(&self) -> impl Iterator<Item = &NormalizedKey> {
        self.groups.keys()
    }

    pub(crate) fn into_groups(self) -> HashMap<NormalizedKey, Vec<LedgerRow>> {
        self.groups
    }
}

/// One key's rows after ordering and derived-field assignment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyGroup {
    rows: Vec<LedgerRow>,
    first_issue: Option<usize>,
    certified: Option<usize>,
}

impl KeyGroup {
    pub(crate) fn new(rows: Vec<LedgerRow>) -> Self {
        let first_issue = rows
            .iter()
            .position(|r| r.emission == Some(EmissionStatus::FirstIssue));
        let certified = rows.iter().position(|r| r.certified);
        Self {
            rows,
            first_issue,
            certified,
        }
    }

    /// Rows in derived order.
    pub fn rows(&self) -> &[LedgerRow] {
        &self.rows
    }

    pub fn first_issue(&self) -> Option<&LedgerRow> {
        self.first_issue.map(|i| &self.rows[i])
    }

    pub fn certified(&self) -> Option<&LedgerRow> {
        self.certified.map(|i| &self.rows[i])
    }

    /// The `FirstIssue` row, else the first row in order.
    pub fn representative(&self) -> Option<&LedgerRow> {
        self.first_issue().or_else(|| self.rows.first())
    }

    pub fn is_issued(&self) -> bool {
        self.first_issue.is_some()
    }
}

/// Read-only index with derived fields computed. Reconciliation accepts
/// nothing else.
#[derive(Debug, Default)]
pub struct FinalizedIndex {
    groups: HashMap<NormalizedKey, KeyGroup>,
    rows: u64,
}

impl FinalizedIndex {
    pub(crate) fn new(groups: HashMap<NormalizedKey, KeyGroup>, rows: u64) -> Self {
        Self { groups, rows }
    }

    pub fn get(&self, key: &str) -> Option<&KeyGroup> {
        self.groups.get(key)
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    pub fn total_rows(&self) -> u64 {
        self.rows
    }

    pub fn keys(&self) -> impl Iterator<Item = &NormalizedKey> {
        self.groups.keys()
    }

    pub fn certified_groups(&self) -> usize {
        self.groups.values().filter(|g| g.certified.is_some()).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(s: &str) -> NormalizedKey {
        NormalizedKey::from_raw(s).unwrap()
    }

    fn row(n: u64, rev: &str) -> LedgerRow {
        LedgerRow {
            row_number: n,
            key: "K".to_string(),
            revision: rev.to_string(),
            ..LedgerRow::default()
        }
    }

    #[test]
    fn push_keeps_stream_order_per_key() {
        let mut idx = KeyIndex::new();
        idx.push(key("a"), row(1, "B"));
        idx.push(key("b"), row(2, "0"));
        idx.push(key("a"), row(3, "A"));

        assert_eq!(idx.len(), 2);
        assert_eq!(idx.total_rows(), 3);
        let a: Vec<u64> = idx.get("A").unwrap().iter().map(|r| r.row_number).collect();
        assert_eq!(a, vec![1, 3]);
        assert!(idx.get("C").is_none());
    }

    #[test]
    fn representative_prefers_first_issue() {
        let mut rows = vec![row(1, "-1"), row(2, "A")];
        rows[0].emission = Some(EmissionStatus::Initial);
        rows[1].emission = Some(EmissionStatus::FirstIssue);
        let g = KeyGroup::new(rows);
        assert!(g.is_issued());
        assert_eq!(g.representative().unwrap().row_number, 2);

        let mut rows = vec![row(5, "-1")];
        rows[0].emission = Some(EmissionStatus::Initial);
        let g = KeyGroup::new(rows);
        assert!(!g.is_issued());
        assert_eq!(g.representative().unwrap().row_number, 5);
    }
}
