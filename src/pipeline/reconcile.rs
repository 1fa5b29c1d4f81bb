//! Checkpoint reconciliation.
//!
//! Decides which fetched posts are genuinely new relative to the persisted
//! checkpoint and flips them into delivery order.

use crate::models::Post;

/// Select the posts that are new relative to `last_seen`.
///
/// `recent` is newest first, as extracted from a profile page. The returned
/// posts are oldest first, ready for in-order delivery.
///
/// Policy:
/// - no checkpoint yet: only the single newest post counts, so a fresh
///   deployment does not replay the visible history;
/// - checkpoint found at position `k`: everything before it is new;
/// - checkpoint absent from the window: the whole window counts as new.
pub fn select_new(recent: &[Post], last_seen: Option<&str>) -> Vec<Post> {
    if recent.is_empty() {
        return Vec::new();
    }

    let new_slice = match last_seen {
        None => &recent[..1],
        Some(id) => match recent.iter().position(|post| post.id == id) {
            Some(k) => &recent[..k],
            None => recent,
        },
    };

    let mut selected = new_slice.to_vec();
    selected.reverse();
    selected
}
