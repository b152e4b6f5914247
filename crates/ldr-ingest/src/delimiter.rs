//! Delimiter sniffing for ledger exports.

/// Candidates in tie-break order.
pub const CANDIDATES: [u8; 4] = [b';', b',', b'\t', b'|'];

/// Pick the delimiter from the first non-empty line of `sample`.
///
/// Counts each candidate outside double quotes; the highest count wins, ties
/// go to the earlier candidate. Falls back to `,` when none occurs.
pub fn sniff_delimiter(sample: &[u8]) -> u8 {
    let line = sample
        .split(|b| *b == b'\n')
        .map(|l| l.strip_suffix(b"\r").unwrap_or(l))
        .find(|l| !l.iter().all(u8::is_ascii_whitespace))
        .unwrap_or(&[]);

    let mut counts = [0usize; CANDIDATES.len()];
    let mut in_quotes = false;
    for b in line {
        if *b == b'"' {
            in_quotes = !in_quotes;
            continue;
        }
        if in_quotes {
            continue;
        }
        if let Some(i) = CANDIDATES.iter().position(|c| c == b) {
            counts[i] += 1;
        }
    }

    let mut best = None;
    for (i, n) in counts.iter().enumerate() {
        if *n == 0 {
            continue;
        }
        match best {
            Some((_, m)) if m >= *n => {}
            _ => best = Some((i, *n)),
        }
    }
    best.map(|(i, _)| CANDIDATES[i]).unwrap_or(b',')
}

/// Printable name for logs and scan metadata.
pub fn delimiter_name(d: u8) -> &'static str {
    match d {
        b';' => "semicolon",
        b',' => "comma",
        b'\t' => "tab",
        b'|' => "pipe",
        _ => "other",
    }
}
