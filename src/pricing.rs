use serde::Serialize;

use crate::model::{Listing, Stay};

/// Price of a stay in minor currency units.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Quote {
    pub nights: u64,
    pub nightly_price: u64,
    pub cleaning_fee: u64,
    pub amount: u64,
}

/// `nightly_price * nights + cleaning_fee`, charging at least one night.
pub fn quote(listing: &Listing, stay: &Stay) -> Quote {
    let nights = stay.nights().max(1) as u64;
    Quote {
        nights,
        nightly_price: listing.nightly_price,
        cleaning_fee: listing.cleaning_fee,
        amount: listing.nightly_price * nights + listing.cleaning_fee,
    }
}

impl Quote {
    /// Checkout line-item name.
    pub fn line_item_name(&self, listing: &Listing, stay: &Stay) -> String {
        format!("{} — {} to {}", listing.title, stay.start, stay.end)
    }

    pub fn line_item_description(&self) -> String {
        format!("{} night(s) + cleaning", self.nights)
    }
}
