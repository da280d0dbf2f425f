use std::collections::{BTreeSet, HashMap};

use super::model::MatchedPair;

// ---------------------------------------------------------------------------
// Canonical IDs
// ---------------------------------------------------------------------------

const PDF_SUFFIX: &str = ".pdf";

/// Map a path or label to its short histogram ID.
///
/// `"  /ATLAS/2019/d01-x01-y01.pdf.pdf "` becomes `"d01-x01-y01"`: trim
/// whitespace, keep the last `/` or `\` segment, strip trailing `.pdf`.
///
/// The steps repeat until nothing changes, so every `.pdf` suffix goes:
/// `"c.pdf.pdf.pdf"` becomes `"c"`, not `"c.pdf"`. Stopping after two
/// strips would let a second call change the ID again.
pub fn canonical_id(label: &str) -> String {
    let mut current = label;
    loop {
        let mut next = current.trim();
        if let Some(pos) = next.rfind(|c: char| c == '/' || c == '\\') {
            next = &next[pos + 1..];
        }
        if let Some(stem) = next.strip_suffix(PDF_SUFFIX) {
            next = stem;
        }
        if next == current {
            return next.to_string();
        }
        current = next;
    }
}

/// Canonicalize every label into a set.
pub fn canonical_set<I, S>(labels: I) -> BTreeSet<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    labels
        .into_iter()
        .map(|l| canonical_id(l.as_ref()))
        .collect()
}

// ---------------------------------------------------------------------------
// Union-for-filtering
// ---------------------------------------------------------------------------

pub fn union(a: &BTreeSet<String>, b: &BTreeSet<String>) -> BTreeSet<String> {
    a.union(b).cloned().collect()
}

/// Canonical key of a record: its first whitespace-delimited token, or `""`
/// for a line of blanks.
pub fn record_key(line: &str) -> String {
    canonical_id(line.split_whitespace().next().unwrap_or_default())
}

/// Records retained by [`filter_records`], borrowed verbatim from the input.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterOutcome<'a> {
    pub kept: Vec<&'a str>,
    /// Non-empty records seen.
    pub total: usize,
}

impl FilterOutcome<'_> {
    pub fn kept_count(&self) -> usize {
        self.kept.len()
    }
}

/// Keep the records whose canonical key is in `keep`, preserving order.
/// Empty lines are skipped; a line holding only blanks still counts.
pub fn filter_records<'a, I>(records: I, keep: &BTreeSet<String>) -> FilterOutcome<'a>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut outcome = FilterOutcome::default();
    for line in records {
        if line.is_empty() {
            continue;
        }
        outcome.total += 1;
        if keep.contains(&record_key(line)) {
            outcome.kept.push(line);
        }
    }
    outcome
}

// ---------------------------------------------------------------------------
// Index-aligned matching
// ---------------------------------------------------------------------------

/// Pair every A row with the B row of the same canonical ID.
///
/// Duplicate IDs in B resolve to the last occurrence. A rows without a
/// counterpart are skipped.
pub fn match_by_id<A, B>(a_labels: &[A], b_labels: &[B]) -> Vec<MatchedPair>
where
    A: AsRef<str>,
    B: AsRef<str>,
{
    let b_index: HashMap<String, usize> = b_labels
        .iter()
        .enumerate()
        .map(|(j, label)| (canonical_id(label.as_ref()), j))
        .collect();

    a_labels
        .iter()
        .enumerate()
        .filter_map(|(i, label)| {
            let id = canonical_id(label.as_ref());
            match b_index.get(&id) {
                Some(&j) => Some(MatchedPair {
                    id,
                    a_index: i,
                    b_index: j,
                }),
                None => {
                    log::debug!("no counterpart for '{id}' (row {i}), skipping");
                    None
                }
            }
        })
        .collect()
}
