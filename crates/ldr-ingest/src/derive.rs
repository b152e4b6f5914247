//! Derived fields per key group: revision ordering, emission status and the
//! certification flag.
//!
//! Runs once at end-of-stream. Input rows arrive in stream order; output rows
//! are in revision order with `emission` and `certified` filled in.

use std::collections::HashMap;

use ldr_config::CodesConfig;
use ldr_schemas::{normalize_key, EmissionStatus, LedgerRow};
use tracing::info;

use crate::index::{FinalizedIndex, KeyGroup, KeyIndex};

/// Order assigned to revisions that are neither `-1`, a letter nor a number.
pub const UNORDERED_REVISION: u64 = u64::MAX;

const BASELINE_REVISION: &str = "-1";

/// Sort position of a revision string.
///
/// `-1` → 0, `A`..`Z` → 1..26, non-negative integer `n` → 27 + n, anything
/// else → [`UNORDERED_REVISION`].
pub fn revision_order(revision: &str) -> u64 {
    let rev = revision.trim();
    if rev == BASELINE_REVISION {
        return 0;
    }
    if let [b] = rev.as_bytes() {
        if b.is_ascii_uppercase() {
            return u64::from(b - b'A') + 1;
        }
    }
    match parse_non_negative(rev) {
        Some(n) => n.saturating_add(27),
        None => UNORDERED_REVISION,
    }
}

fn parse_non_negative(rev: &str) -> Option<u64> {
    if rev.is_empty() || !rev.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    // Digit strings too long for u64 still order after every letter.
    Some(rev.parse::<u64>().unwrap_or(u64::MAX - 1))
}

/// Sort a group by normalized key, then revision order. Stable: equal
/// entries keep stream order.
///
/// Within one group the normalized key is constant, so spellings such as
/// `ld-001` and `LD-001` never split the revision sequence.
pub fn order_group(rows: &mut [LedgerRow]) {
    rows.sort_by_cached_key(|r| (normalize_key(&r.key), revision_order(&r.revision)));
}

/// Assign emission status over an ordered group.
///
/// `-1` rows are `Initial`; the first other row is `FirstIssue`; the rest are
/// `Revision`.
pub fn assign_emission(rows: &mut [LedgerRow]) {
    let mut issued = false;
    for row in rows.iter_mut() {
        row.emission = Some(if row.revision.trim() == BASELINE_REVISION {
            EmissionStatus::Initial
        } else if !issued {
            issued = true;
            EmissionStatus::FirstIssue
        } else {
            EmissionStatus::Revision
        });
    }
}

/// Flag the first row (in order) that is a numeric revision, not of the
/// excluded emission type, and carries the approved disposition. At most one
/// row per group is flagged; the scan stops at the first hit.
pub fn assign_certification(rows: &mut [LedgerRow], codes: &CodesConfig) {
    for row in rows.iter_mut() {
        row.certified = false;
    }
    if let Some(row) = rows.iter_mut().find(|r| qualifies_for_certification(r, codes)) {
        row.certified = true;
    }
}

fn qualifies_for_certification(row: &LedgerRow, codes: &CodesConfig) -> bool {
    let rev = row.revision.trim();
    rev != BASELINE_REVISION
        && parse_non_negative(rev).is_some()
        && !row
            .emission_type
            .trim()
            .eq_ignore_ascii_case(codes.excluded_emission_type.trim())
        && row
            .disposition
            .trim()
            .eq_ignore_ascii_case(codes.approved_disposition.trim())
}

/// Order every group and compute its derived fields.
pub fn finalize(index: KeyIndex, codes: &CodesConfig) -> FinalizedIndex {
    let rows = index.total_rows();
    let groups: HashMap<_, _> = index
        .into_groups()
        .into_iter()
        .map(|(key, mut group)| {
            order_group(&mut group);
            assign_emission(&mut group);
            assign_certification(&mut group, codes);
            (key, KeyGroup::new(group))
        })
        .collect();

    let finalized = FinalizedIndex::new(groups, rows);
    info!(
        keys = finalized.len(),
        rows,
        certified = finalized.certified_groups(),
        "key index finalized"
    );
    finalized
}
