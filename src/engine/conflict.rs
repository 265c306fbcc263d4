use crate::limits::*;
use crate::model::*;

use super::EngineError;

pub(crate) fn validate_stay(stay: &Stay) -> Result<(), EngineError> {
    if stay.nights() > MAX_STAY_NIGHTS {
        return Err(EngineError::LimitExceeded("stay too long"));
    }
    Ok(())
}

pub(crate) fn validate_hold_minutes(minutes: i64) -> Result<(), EngineError> {
    if minutes <= 0 || minutes > MAX_HOLD_MINUTES {
        return Err(EngineError::LimitExceeded("hold ttl out of range"));
    }
    Ok(())
}

/// First interval that blocks `stay` at `now`. Expired holds never block,
/// whether or not the sweep has removed them yet.
pub(crate) fn find_conflict<'a>(
    ls: &'a ListingState,
    stay: &Stay,
    now: Ms,
) -> Option<&'a Interval> {
    ls.overlapping(stay).find(|interval| interval.is_active(now))
}

pub(crate) fn check_no_conflict(
    ls: &ListingState,
    stay: &Stay,
    now: Ms,
) -> Result<(), EngineError> {
    match find_conflict(ls, stay, now) {
        Some(interval) => Err(EngineError::Unavailable {
            listing_id: ls.listing_id.clone(),
            conflict: interval.id,
        }),
        None => Ok(()),
    }
}

pub(crate) fn check_capacity(ls: &ListingState) -> Result<(), EngineError> {
    if ls.intervals.len() >= MAX_INTERVALS_PER_LISTING {
        return Err(EngineError::LimitExceeded("too many intervals on listing"));
    }
    Ok(())
}
