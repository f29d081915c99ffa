//! The elimination primitive.
//!
//! Deduction works by removing every already-attributed identity from a
//! candidate set: if exactly one candidate survives, it must belong to the
//! slot under analysis. Anything else is "no unique answer" and the caller
//! moves on.

use std::collections::BTreeSet;

/// Returns the sole candidate not already attributed to some slot.
///
/// Computes `candidates − known` and returns its single element if and only
/// if the difference has cardinality one. Pure set difference plus a
/// cardinality check; no I/O, no side effects.
///
/// Fixed by contract:
/// - both sets empty → `None`
/// - `known ⊇ candidates` → empty difference → `None`
/// - exactly one unattributed candidate → `Some`, regardless of absolute sizes
///
/// # Examples
///
/// ```
/// use std::collections::BTreeSet;
/// use matchup::eliminate;
///
/// let known: BTreeSet<String> = ["a".into()].into();
/// let candidates: BTreeSet<String> = ["a".into(), "b".into()].into();
/// assert_eq!(eliminate(&known, &candidates), Some("b"));
/// ```
#[must_use]
pub fn eliminate<'a>(
    known: &BTreeSet<String>,
    candidates: &'a BTreeSet<String>,
) -> Option<&'a str> {
    let mut sole = None;
    for candidate in candidates {
        if known.contains(candidate) {
            continue;
        }
        if sole.is_some() {
            // Second survivor: underdetermined.
            return None;
        }
        sole = Some(candidate.as_str());
    }
    sole
}
