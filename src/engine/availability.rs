use crate::model::*;

use super::conflict::find_conflict;

// ── Availability ─────────────────────────────────────────────────

/// `true` iff no booking, live hold or external block overlaps `stay`.
pub fn is_free_at(listing: &ListingState, stay: &Stay, now: Ms) -> bool {
    find_conflict(listing, stay, now).is_none()
}

/// Merged ranges inside `window` that are blocked at `now`.
pub fn blocked_ranges(listing: &ListingState, window: &Stay, now: Ms) -> Vec<Stay> {
    let mut blocked: Vec<Stay> = listing
        .overlapping(window)
        .filter(|interval| interval.is_active(now))
        .filter_map(|interval| interval.stay.clamp(window))
        .collect();
    blocked.sort_by_key(|s| s.start);
    merge_overlapping(&blocked)
}

/// Merge sorted overlapping/adjacent ranges into disjoint ranges.
pub fn merge_overlapping(sorted: &[Stay]) -> Vec<Stay> {
    let mut merged: Vec<Stay> = Vec::new();
    for &stay in sorted {
        if let Some(last) = merged.last_mut()
            && stay.start <= last.end {
                last.end = last.end.max(stay.end);
                continue;
            }
        merged.push(stay);
    }
    merged
}
