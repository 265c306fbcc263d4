use ulid::Ulid;

use crate::limits::*;
use crate::model::*;
use crate::observability;

use super::availability::{blocked_ranges, is_free_at};
use super::{Engine, EngineError};

impl Engine {
    /// Pure query. A listing with no state has nothing blocking it.
    pub async fn is_free(&self, listing_id: &str, stay: Stay) -> bool {
        metrics::counter!(observability::AVAILABILITY_CHECKS_TOTAL).increment(1);
        let ls = match self.get_listing_state(listing_id) {
            Some(ls) => ls,
            None => return true,
        };
        let guard = ls.read().await;
        is_free_at(&guard, &stay, self.now_ms())
    }

    pub async fn blocked_ranges(
        &self,
        listing_id: &str,
        window: Stay,
    ) -> Result<Vec<Stay>, EngineError> {
        if window.nights() > MAX_CALENDAR_WINDOW_DAYS {
            return Err(EngineError::LimitExceeded("calendar window too wide"));
        }
        let ls = self.require_listing_state(listing_id)?;
        let guard = ls.read().await;
        Ok(blocked_ranges(&guard, &window, self.now_ms()))
    }

    pub async fn get_bookings(&self, listing_id: &str) -> Result<Vec<Booking>, EngineError> {
        let ls = match self.get_listing_state(listing_id) {
            Some(ls) => ls,
            None => return Ok(vec![]),
        };
        let guard = ls.read().await;
        Ok(guard
            .intervals
            .iter()
            .filter_map(|i| i.to_booking(listing_id))
            .collect())
    }

    /// All holds still stored, including expired ones the sweep has not reached.
    pub async fn get_holds(&self, listing_id: &str) -> Result<Vec<Hold>, EngineError> {
        let ls = match self.get_listing_state(listing_id) {
            Some(ls) => ls,
            None => return Ok(vec![]),
        };
        let guard = ls.read().await;
        Ok(guard
            .intervals
            .iter()
            .filter_map(|i| i.to_hold(listing_id))
            .collect())
    }

    pub async fn get_external_blocks(
        &self,
        listing_id: &str,
    ) -> Result<Vec<ExternalBlock>, EngineError> {
        let ls = match self.get_listing_state(listing_id) {
            Some(ls) => ls,
            None => return Ok(vec![]),
        };
        let guard = ls.read().await;
        Ok(guard
            .intervals
            .iter()
            .filter_map(|i| i.to_external_block(listing_id))
            .collect())
    }

    /// The hold with `id` if it exists and has not expired.
    pub async fn get_live_hold(&self, id: Ulid) -> Option<Hold> {
        let listing_id = self.get_listing_for_hold(&id)?;
        let ls = self.get_listing_state(&listing_id)?;
        let guard = ls.read().await;
        let now = self.now_ms();
        guard
            .intervals
            .iter()
            .find(|i| i.id == id && i.is_active(now))
            .and_then(|i| i.to_hold(&listing_id))
    }
}
