//! iCalendar export of confirmed bookings, for import into channel calendars.

use chrono::{DateTime, NaiveDate};

use crate::model::{Booking, BookingStatus, Ms};

pub const CONTENT_TYPE: &str = "text/calendar; charset=utf-8";

/// Identity stamped into `PRODID` and event `UID`s.
#[derive(Debug, Clone)]
pub struct CalendarIdentity {
    pub brand: String,
    pub domain: String,
}

fn ics_date(d: NaiveDate) -> String {
    d.format("%Y%m%d").to_string()
}

fn ics_timestamp(now: Ms) -> String {
    DateTime::from_timestamp_millis(now)
        .unwrap_or_default()
        .format("%Y%m%dT%H%M%SZ")
        .to_string()
}

/// One `VEVENT` per confirmed booking of `listing_id`, CRLF-separated.
pub fn render(
    identity: &CalendarIdentity,
    listing_id: &str,
    bookings: &[Booking],
    now: Ms,
) -> String {
    let stamp = ics_timestamp(now);
    let mut lines = vec![
        "BEGIN:VCALENDAR".to_string(),
        "VERSION:2.0".to_string(),
        format!("PRODID:-//{}//DirectBooking//EN", identity.brand),
    ];
    for b in bookings
        .iter()
        .filter(|b| b.listing_id == listing_id && b.status == BookingStatus::Confirmed)
    {
        lines.push("BEGIN:VEVENT".to_string());
        lines.push(format!("UID:booking-{}@{}", b.id, identity.domain));
        lines.push(format!("DTSTAMP:{stamp}"));
        lines.push(format!("DTSTART;VALUE=DATE:{}", ics_date(b.start)));
        lines.push(format!("DTEND;VALUE=DATE:{}", ics_date(b.end)));
        lines.push(format!("SUMMARY:Direct booking - {listing_id}"));
        lines.push("END:VEVENT".to_string());
    }
    lines.push("END:VCALENDAR".to_string());
    lines.join("\r\n")
}
