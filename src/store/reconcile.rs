//! Order-preserving set algebra over id lists, used to compute membership
//! deltas. Every function is total.

use std::collections::HashSet;

/// Drops empty strings and repeated ids, keeping the first occurrence.
pub fn unique(ids: &[String]) -> Vec<String> {
    let mut seen = HashSet::with_capacity(ids.len());
    ids.iter()
        .filter(|id| !id.is_empty() && seen.insert(id.as_str()))
        .cloned()
        .collect()
}

/// Elements of `a` that are not in `b`, in `a`'s order. Empty strings are
/// dropped.
pub fn diff(a: &[String], b: &[String]) -> Vec<String> {
    let exclude: HashSet<&str> = b.iter().map(String::as_str).collect();
    a.iter()
        .filter(|id| !id.is_empty() && !exclude.contains(id.as_str()))
        .cloned()
        .collect()
}

/// Elements of `a` that are also in `b`, in `a`'s order.
pub fn intersect(a: &[String], b: &[String]) -> Vec<String> {
    let keep: HashSet<&str> = b.iter().map(String::as_str).collect();
    a.iter()
        .filter(|id| keep.contains(id.as_str()))
        .cloned()
        .collect()
}
