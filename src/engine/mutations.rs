use tracing::{debug, warn};
use ulid::Ulid;

use crate::model::*;
use crate::observability;

use super::conflict::{
    check_capacity, check_no_conflict, find_conflict, validate_hold_minutes, validate_stay,
};
use super::{Engine, EngineError};

impl Engine {
    /// Seed a read-only block imported from another calendar.
    pub async fn add_external_block(
        &self,
        listing_id: &str,
        stay: Stay,
        source: &str,
    ) -> Result<ExternalBlock, EngineError> {
        validate_stay(&stay)?;
        let ls = self.require_listing_state(listing_id)?;
        let mut guard = ls.write().await;
        check_capacity(&guard)?;

        let block = ExternalBlock {
            id: Ulid::new(),
            listing_id: listing_id.to_string(),
            start: stay.start,
            end: stay.end,
            source: source.to_string(),
        };
        guard.insert_interval(Interval {
            id: block.id,
            stay,
            kind: IntervalKind::External { source: block.source.clone() },
        });
        Ok(block)
    }

    /// Append a hold without looking at availability. Callers that need the
    /// non-overlap guarantee use [`Engine::place_hold`].
    pub async fn create_hold(
        &self,
        listing_id: &str,
        stay: Stay,
        minutes: i64,
    ) -> Result<Hold, EngineError> {
        validate_stay(&stay)?;
        validate_hold_minutes(minutes)?;
        let ls = self.require_listing_state(listing_id)?;
        let mut guard = ls.write().await;
        check_capacity(&guard)?;
        Ok(self.apply_hold(&mut guard, stay, minutes))
    }

    /// Check availability and hold the stay as one step under the listing lock.
    pub async fn place_hold(
        &self,
        listing_id: &str,
        stay: Stay,
        minutes: i64,
    ) -> Result<Hold, EngineError> {
        validate_stay(&stay)?;
        validate_hold_minutes(minutes)?;
        let ls = self.require_listing_state(listing_id)?;
        let mut guard = ls.write().await;
        check_capacity(&guard)?;

        if let Err(e) = check_no_conflict(&guard, &stay, self.now_ms()) {
            metrics::counter!(observability::HOLDS_REJECTED_TOTAL).increment(1);
            return Err(e);
        }
        Ok(self.apply_hold(&mut guard, stay, minutes))
    }

    /// Remove and return the hold. A second call with the same id yields `None`,
    /// as do ids that were swept or never existed.
    pub async fn consume_hold(&self, id: Ulid) -> Option<Hold> {
        let (listing_id, mut guard) = self.resolve_hold_write(&id).await.ok()?;
        let interval = guard.remove_hold(id)?;
        self.hold_to_listing.remove(&id);
        interval.to_hold(&listing_id)
    }

    /// Append a confirmed booking without looking at availability.
    pub async fn confirm_booking(
        &self,
        listing_id: &str,
        stay: Stay,
    ) -> Result<Booking, EngineError> {
        validate_stay(&stay)?;
        let ls = self.require_listing_state(listing_id)?;
        let mut guard = ls.write().await;
        check_capacity(&guard)?;
        Ok(self.apply_booking(&mut guard, stay))
    }

    /// Consume the hold, re-check the stay and confirm it, all under one
    /// listing lock. A missing hold or a conflict drops the booking; no
    /// compensation is attempted here.
    pub async fn settle_checkout(
        &self,
        hold_id: Ulid,
        listing_id: &str,
        stay: Stay,
    ) -> Result<Settlement, EngineError> {
        validate_stay(&stay)?;
        let ls = self.require_listing_state(listing_id)?;
        let mut guard = ls.write().await;

        let Some(interval) = guard.remove_hold(hold_id) else {
            metrics::counter!(observability::SETTLEMENTS_DROPPED_TOTAL, "reason" => "hold_missing")
                .increment(1);
            return Ok(Settlement::HoldMissing);
        };
        self.hold_to_listing.remove(&hold_id);
        let hold = interval
            .to_hold(listing_id)
            .ok_or(EngineError::HoldNotFound(hold_id))?;

        if let Some(blocker) = find_conflict(&guard, &stay, self.now_ms()) {
            warn!(
                "conflict after payment: hold {hold_id} on {listing_id} [{}, {}) overlaps {}",
                stay.start, stay.end, blocker.id
            );
            metrics::counter!(observability::SETTLEMENTS_DROPPED_TOTAL, "reason" => "conflict")
                .increment(1);
            return Ok(Settlement::Conflict { hold, with: blocker.id });
        }

        Ok(Settlement::Confirmed(self.apply_booking(&mut guard, stay)))
    }

    /// Drop every hold whose expiry has passed. Returns how many were removed.
    pub async fn sweep_expired_holds(&self) -> usize {
        let now = self.now_ms();
        let listings: Vec<_> = self.state.iter().map(|e| e.value().clone()).collect();
        let mut removed = 0;
        for ls in listings {
            let mut guard = ls.write().await;
            for interval in guard.drain_expired_holds(now) {
                self.hold_to_listing.remove(&interval.id);
                debug!("expired hold {} on {}", interval.id, guard.listing_id);
                removed += 1;
            }
        }
        if removed > 0 {
            metrics::counter!(observability::HOLDS_EXPIRED_TOTAL).increment(removed as u64);
        }
        removed
    }

    fn apply_hold(&self, ls: &mut ListingState, stay: Stay, minutes: i64) -> Hold {
        let now = self.now_ms();
        let hold = Hold {
            id: Ulid::new(),
            listing_id: ls.listing_id.clone(),
            start: stay.start,
            end: stay.end,
            created_at: now,
            expires_at: now + minutes * MINUTE_MS,
        };
        self.hold_to_listing.insert(hold.id, ls.listing_id.clone());
        ls.insert_interval(Interval {
            id: hold.id,
            stay,
            kind: IntervalKind::Hold {
                created_at: hold.created_at,
                expires_at: hold.expires_at,
            },
        });
        metrics::counter!(observability::HOLDS_PLACED_TOTAL).increment(1);
        hold
    }

    fn apply_booking(&self, ls: &mut ListingState, stay: Stay) -> Booking {
        let booking = Booking {
            id: Ulid::new(),
            listing_id: ls.listing_id.clone(),
            start: stay.start,
            end: stay.end,
            status: BookingStatus::Confirmed,
            created_at: self.now_ms(),
        };
        ls.insert_interval(Interval {
            id: booking.id,
            stay,
            kind: IntervalKind::Booking { created_at: booking.created_at },
        });
        metrics::counter!(observability::BOOKINGS_CONFIRMED_TOTAL).increment(1);
        booking
    }
}
