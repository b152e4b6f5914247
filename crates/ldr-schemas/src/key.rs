//! Vale-number canonicalisation.
//!
//! Every key that takes part in matching goes through [`normalize_key`]: the
//! primary ledgers' keys when the candidate set is built, the management
//! ledger's keys during the scan, and the primary keys again during
//! aggregation. Two code paths that normalise differently never match, so there
//! is exactly one implementation and it lives here.

use std::borrow::Borrow;
use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::PrimaryRow;

// ---------------------------------------------------------------------------
// Normalisation
// ---------------------------------------------------------------------------

/// Canonicalise a raw identifier for equality matching.
///
/// In order: drop byte-order marks, zero-width and control characters; fold
/// non-breaking spaces into spaces and drop all whitespace; uppercase; map every
/// dash-like code point (including `_`) to ASCII `-`; collapse runs of `-`;
/// strip leading and trailing `-`.
///
/// Returns an empty string when nothing survives. The empty string is never a
/// valid key; use [`NormalizedKey::from_raw`] to get that check for free.
pub fn normalize_key(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());

    for c in raw.chars() {
        if is_invisible(c) {
            continue;
        }
        let c = if is_non_breaking_space(c) { ' ' } else { c };
        if c.is_whitespace() {
            continue;
        }
        if is_dash_like(c) {
            // Leading dashes never get pushed; runs collapse to one.
            if !out.is_empty() && !out.ends_with('-') {
                out.push('-');
            }
            continue;
        }
        out.extend(c.to_uppercase());
    }

    while out.ends_with('-') {
        out.pop();
    }
    out
}

fn is_invisible(c: char) -> bool {
    matches!(
        c,
        '\u{FEFF}' // BOM / zero-width no-break space
            | '\u{200B}'
            | '\u{200C}'
            | '\u{200D}'
            | '\u{2060}'
            | '\u{00AD}' // soft hyphen renders as nothing
    ) || (c.is_control() && !c.is_whitespace())
}

fn is_non_breaking_space(c: char) -> bool {
    matches!(c, '\u{00A0}' | '\u{2007}' | '\u{202F}')
}

fn is_dash_like(c: char) -> bool {
    matches!(
        c,
        '-' | '_'
            | '\u{2010}' // hyphen
            | '\u{2011}' // non-breaking hyphen
            | '\u{2012}' // figure dash
            | '\u{2013}' // en dash
            | '\u{2014}' // em dash
            | '\u{2015}' // horizontal bar
            | '\u{2212}' // minus sign
            | '\u{FE58}'
            | '\u{FE63}'
            | '\u{FF0D}'
            | '\u{FF3F}' // fullwidth low line
    )
}

// ---------------------------------------------------------------------------
// NormalizedKey
// ---------------------------------------------------------------------------

/// A non-empty, normalised vale number.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NormalizedKey(String);

impl NormalizedKey {
    /// Normalise `raw`; `None` when the result is empty.
    pub fn from_raw(raw: &str) -> Option<Self> {
        let s = normalize_key(raw);
        if s.is_empty() {
            None
        } else {
            Some(Self(s))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl Borrow<str> for NormalizedKey {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NormalizedKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ---------------------------------------------------------------------------
// CandidateKeySet
// ---------------------------------------------------------------------------

/// Keys worth retaining from the management ledger.
///
/// Built once before the scan and read-only afterwards; the scan uses it as
/// an admission filter.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CandidateKeySet {
    keys: HashSet<NormalizedKey>,
}

impl CandidateKeySet {
    /// Build from raw identifiers; blanks are dropped.
    pub fn from_raw_keys<I, S>(raw: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let keys = raw
            .into_iter()
            .filter_map(|s| NormalizedKey::from_raw(s.as_ref()))
            .collect();
        Self { keys }
    }

    /// Build from the validated primary rows. Rows the validator rejected are
    /// left out.
    pub fn from_primary_rows(rows: &[PrimaryRow]) -> Self {
        Self::from_raw_keys(rows.iter().filter(|r| r.is_valid()).map(|r| r.key.as_str()))
    }

    /// O(1) membership test on an already-normalised key.
    pub fn contains(&self, normalized: &str) -> bool {
        self.keys.contains(normalized)
    }

    /// The stored key equal to `normalized`, for cloning into the index.
    pub fn get(&self, normalized: &str) -> Option<&NormalizedKey> {
        self.keys.get(normalized)
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &NormalizedKey> {
        self.keys.iter()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
