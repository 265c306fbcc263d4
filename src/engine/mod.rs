mod availability;
mod conflict;
mod error;
mod mutations;
mod queries;
#[cfg(test)]
mod tests;

pub use availability::{blocked_ranges, is_free_at, merge_overlapping};
pub use error::EngineError;

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{OwnedRwLockWriteGuard, RwLock};
use ulid::Ulid;

use crate::clock::{Clock, SystemClock};
use crate::model::*;

pub type SharedListingState = Arc<RwLock<ListingState>>;

/// In-memory availability store. Each listing's calendar sits behind its own
/// lock; every check-then-act sequence runs under that listing's write lock.
pub struct Engine {
    pub state: DashMap<String, SharedListingState>,
    /// Catalog order; the first listing is the default.
    listings: Vec<Listing>,
    /// Reverse lookup: hold id → listing id
    pub(super) hold_to_listing: DashMap<Ulid, String>,
    clock: Arc<dyn Clock>,
}

impl Engine {
    pub fn new(listings: Vec<Listing>, clock: Arc<dyn Clock>) -> Self {
        let state = DashMap::new();
        for listing in &listings {
            let ls = ListingState::new(listing.id.clone());
            state.insert(listing.id.clone(), Arc::new(RwLock::new(ls)));
        }
        Self {
            state,
            listings,
            hold_to_listing: DashMap::new(),
            clock,
        }
    }

    pub fn with_system_clock(listings: Vec<Listing>) -> Self {
        Self::new(listings, Arc::new(SystemClock))
    }

    pub fn now_ms(&self) -> Ms {
        self.clock.now_ms()
    }

    pub fn clock(&self) -> &dyn Clock {
        self.clock.as_ref()
    }

    pub fn listings(&self) -> &[Listing] {
        &self.listings
    }

    pub fn listing(&self, id: &str) -> Option<&Listing> {
        self.listings.iter().find(|l| l.id == id)
    }

    pub fn default_listing(&self) -> Option<&Listing> {
        self.listings.first()
    }

    pub fn get_listing_state(&self, id: &str) -> Option<SharedListingState> {
        self.state.get(id).map(|e| e.value().clone())
    }

    pub fn get_listing_for_hold(&self, hold_id: &Ulid) -> Option<String> {
        self.hold_to_listing.get(hold_id).map(|e| e.value().clone())
    }

    pub(super) fn require_listing_state(
        &self,
        id: &str,
    ) -> Result<SharedListingState, EngineError> {
        self.get_listing_state(id)
            .ok_or_else(|| EngineError::UnknownListing(id.to_string()))
    }

    /// Lookup hold → listing, get listing, acquire write lock.
    pub(super) async fn resolve_hold_write(
        &self,
        hold_id: &Ulid,
    ) -> Result<(String, OwnedRwLockWriteGuard<ListingState>), EngineError> {
        let listing_id = self
            .get_listing_for_hold(hold_id)
            .ok_or(EngineError::HoldNotFound(*hold_id))?;
        let ls = self.require_listing_state(&listing_id)?;
        let guard = ls.write_owned().await;
        Ok((listing_id, guard))
    }
}
