use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use ulid::Ulid;

/// Unix milliseconds, used for hold expiry and record timestamps.
pub type Ms = i64;

pub const MINUTE_MS: Ms = 60_000;

/// Half-open range of nights `[start, end)`. `end` is the check-out day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Stay {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl Stay {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        debug_assert!(start < end, "Stay start must be before end");
        Self { start, end }
    }

    /// `None` unless `start < end`.
    pub fn try_new(start: NaiveDate, end: NaiveDate) -> Option<Self> {
        (start < end).then_some(Self { start, end })
    }

    pub fn nights(&self) -> i64 {
        (self.end - self.start).num_days()
    }

    pub fn overlaps(&self, other: &Stay) -> bool {
        self.start < other.end && self.end > other.start
    }

    /// Intersection with `window`, if any nights remain.
    pub fn clamp(&self, window: &Stay) -> Option<Stay> {
        Stay::try_new(self.start.max(window.start), self.end.min(window.end))
    }
}

/// What an interval on a listing's calendar represents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IntervalKind {
    /// Permanent, paid reservation.
    Booking { created_at: Ms },
    /// Temporary reservation; stops blocking once `expires_at` has passed.
    Hold { created_at: Ms, expires_at: Ms },
    /// Range reserved on an externally owned calendar.
    External { source: String },
}

/// A single interval on a listing. Bookings, holds and external blocks share one sorted list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Interval {
    pub id: Ulid,
    pub stay: Stay,
    pub kind: IntervalKind,
}

impl Interval {
    /// Whether the interval blocks availability at `now`.
    pub fn is_active(&self, now: Ms) -> bool {
        match self.kind {
            IntervalKind::Hold { expires_at, .. } => expires_at > now,
            IntervalKind::Booking { .. } | IntervalKind::External { .. } => true,
        }
    }

    pub fn is_hold(&self) -> bool {
        matches!(self.kind, IntervalKind::Hold { .. })
    }
}

/// Static listing definition. Prices are in minor currency units.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Listing {
    pub id: String,
    pub title: String,
    pub timezone: String,
    pub nightly_price: u64,
    pub cleaning_fee: u64,
}

#[derive(Debug, Clone)]
pub struct ListingState {
    pub listing_id: String,
    /// Bookings, holds and external blocks, sorted by `stay.start`.
    pub intervals: Vec<Interval>,
}

impl ListingState {
    pub fn new(listing_id: String) -> Self {
        Self {
            listing_id,
            intervals: Vec::new(),
        }
    }

    /// Insert interval maintaining sort order by stay.start.
    pub fn insert_interval(&mut self, interval: Interval) {
        let pos = self
            .intervals
            .partition_point(|i| i.stay.start <= interval.stay.start);
        self.intervals.insert(pos, interval);
    }

    /// Remove the hold with `id`; other interval kinds are left alone.
    pub fn remove_hold(&mut self, id: Ulid) -> Option<Interval> {
        let pos = self.intervals.iter().position(|i| i.id == id && i.is_hold())?;
        Some(self.intervals.remove(pos))
    }

    /// Return only intervals whose stay overlaps the query.
    /// Everything starting on or after `query.end` is skipped by binary search.
    pub fn overlapping(&self, query: &Stay) -> impl Iterator<Item = &Interval> {
        let right_bound = self
            .intervals
            .partition_point(|i| i.stay.start < query.end);
        self.intervals[..right_bound]
            .iter()
            .filter(move |i| i.stay.end > query.start)
    }

    /// Drop every hold with `expires_at <= now`. Returns the removed holds.
    pub fn drain_expired_holds(&mut self, now: Ms) -> Vec<Interval> {
        let (expired, kept): (Vec<_>, Vec<_>) = std::mem::take(&mut self.intervals)
            .into_iter()
            .partition(|i| i.is_hold() && !i.is_active(now));
        self.intervals = kept;
        expired
    }
}

// ── Records handed to callers ────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BookingStatus {
    Confirmed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Booking {
    pub id: Ulid,
    pub listing_id: String,
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub status: BookingStatus,
    pub created_at: Ms,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Hold {
    pub id: Ulid,
    pub listing_id: String,
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub created_at: Ms,
    pub expires_at: Ms,
}

impl Hold {
    pub fn stay(&self) -> Stay {
        Stay::new(self.start, self.end)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExternalBlock {
    pub id: Ulid,
    pub listing_id: String,
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub source: String,
}

impl Interval {
    pub fn to_booking(&self, listing_id: &str) -> Option<Booking> {
        match self.kind {
            IntervalKind::Booking { created_at } => Some(Booking {
                id: self.id,
                listing_id: listing_id.to_string(),
                start: self.stay.start,
                end: self.stay.end,
                status: BookingStatus::Confirmed,
                created_at,
            }),
            _ => None,
        }
    }

    pub fn to_hold(&self, listing_id: &str) -> Option<Hold> {
        match self.kind {
            IntervalKind::Hold { created_at, expires_at } => Some(Hold {
                id: self.id,
                listing_id: listing_id.to_string(),
                start: self.stay.start,
                end: self.stay.end,
                created_at,
                expires_at,
            }),
            _ => None,
        }
    }

    pub fn to_external_block(&self, listing_id: &str) -> Option<ExternalBlock> {
        match &self.kind {
            IntervalKind::External { source } => Some(ExternalBlock {
                id: self.id,
                listing_id: listing_id.to_string(),
                start: self.stay.start,
                end: self.stay.end,
                source: source.clone(),
            }),
            _ => None,
        }
    }
}

/// Outcome of settling a paid checkout against its hold.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Settlement {
    Confirmed(Booking),
    /// Hold already consumed, swept after expiry, or never existed.
    HoldMissing,
    /// Hold consumed but the stay overlaps `with`; nothing was booked.
    Conflict { hold: Hold, with: Ulid },
}
