use chrono::{Days, NaiveDate};

use crate::model::{Listing, Stay};

/// Source tag for the seeded blocks standing in for an imported iCal feed.
pub const MOCK_ICAL_SOURCE: &str = "mock-ical";

/// Listings served by this process.
pub fn default_listings() -> Vec<Listing> {
    vec![Listing {
        id: "cedar-ridge".to_string(),
        title: "Cedar Ridge Retreat".to_string(),
        timezone: "America/Los_Angeles".to_string(),
        nightly_price: 25_000,
        cleaning_fee: 9_500,
    }]
}

/// Two blocks relative to `today`: nights +5..+8 and +12..+14.
pub fn mock_external_blocks(today: NaiveDate) -> Vec<Stay> {
    [(5, 8), (12, 14)]
        .into_iter()
        .filter_map(|(a, b)| {
            let start = today.checked_add_days(Days::new(a))?;
            let end = today.checked_add_days(Days::new(b))?;
            Stay::try_new(start, end)
        })
        .collect()
}
