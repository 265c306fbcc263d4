//! Hard caps on caller-supplied sizes.

/// Longest stay a single hold or booking may cover.
pub const MAX_STAY_NIGHTS: i64 = 365;

/// Longest hold a caller may request.
pub const MAX_HOLD_MINUTES: i64 = 24 * 60;

/// Bookings + holds + external blocks kept for one listing.
pub const MAX_INTERVALS_PER_LISTING: usize = 100_000;

/// Widest window accepted by the blocked-ranges query.
pub const MAX_CALENDAR_WINDOW_DAYS: i64 = 2 * 366;
