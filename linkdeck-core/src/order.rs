//! Ordering and id-set helpers over URL arrays.
//!
//! Position values are only sort keys. They may collide under concurrent
//! writers, so every sort here is stable and every reorder rewrites the
//! whole affected set.

use crate::{UrlId, UrlItem};
use std::collections::HashSet;

/// Position for a newly added item: `max(position) + 1`, or 0 when empty.
pub fn next_position(urls: &[UrlItem]) -> i64 {
    urls.iter()
        .map(|u| u.position)
        .max()
        .map(|max| max + 1)
        .unwrap_or(0)
}

/// Stable sort by position; items with equal positions keep array order.
pub fn sort_by_position(urls: &mut [UrlItem]) {
    urls.sort_by_key(|u| u.position);
}

/// Rewrite every position to its array index.
pub fn reassign_positions(urls: &mut [UrlItem]) {
    for (index, item) in urls.iter_mut().enumerate() {
        item.position = index as i64;
    }
}

/// Ids in array order.
pub fn id_sequence(urls: &[UrlItem]) -> Vec<UrlId> {
    urls.iter().map(|u| u.id).collect()
}

/// Ids as a set.
pub fn id_set(urls: &[UrlItem]) -> HashSet<UrlId> {
    urls.iter().map(|u| u.id).collect()
}

/// True when both arrays hold exactly the same ids, ignoring order.
///
/// Size is compared on the raw arrays, so an array holding a duplicate id
/// never matches one that does not.
pub fn same_id_set(a: &[UrlItem], b: &[UrlItem]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    id_set(a) == id_set(b)
}
