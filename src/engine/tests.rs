use std::sync::Arc;

use chrono::NaiveDate;
use tokio_test::{assert_err, assert_ok};
use ulid::Ulid;

use super::*;
use crate::catalog::default_listings;
use crate::clock::ManualClock;
use crate::limits::*;

const LISTING: &str = "cedar-ridge";
const T0: Ms = 1_762_171_200_000; // 2025-11-03T12:00:00Z

fn d(s: &str) -> NaiveDate {
    s.parse().unwrap()
}

fn stay(a: &str, b: &str) -> Stay {
    Stay::new(d(a), d(b))
}

fn test_engine() -> (Engine, Arc<ManualClock>) {
    let clock = Arc::new(ManualClock::new(T0));
    (Engine::new(default_listings(), clock.clone()), clock)
}

// ── Availability ─────────────────────────────────────────

#[tokio::test]
async fn empty_listing_is_free() {
    let (engine, _) = test_engine();
    assert!(engine.is_free(LISTING, stay("2025-11-03", "2025-11-06")).await);
}

#[tokio::test]
async fn unknown_listing_is_free() {
    let (engine, _) = test_engine();
    assert!(engine.is_free("nowhere", stay("2025-11-03", "2025-11-06")).await);
}

#[tokio::test]
async fn hold_blocks_same_range_not_adjacent() {
    let (engine, _) = test_engine();
    assert_ok!(engine.create_hold(LISTING, stay("2025-11-03", "2025-11-06"), 10).await);

    assert!(!engine.is_free(LISTING, stay("2025-11-03", "2025-11-06")).await);
    assert!(!engine.is_free(LISTING, stay("2025-11-05", "2025-11-07")).await);
    assert!(engine.is_free(LISTING, stay("2025-11-06", "2025-11-08")).await);
    assert!(engine.is_free(LISTING, stay("2025-11-01", "2025-11-03")).await);
}

#[tokio::test]
async fn external_block_blocks() {
    let (engine, _) = test_engine();
    let block = engine
        .add_external_block(LISTING, stay("2025-11-10", "2025-11-13"), "mock-ical")
        .await
        .unwrap();
    assert_eq!(block.source, "mock-ical");

    assert!(!engine.is_free(LISTING, stay("2025-11-12", "2025-11-15")).await);
    assert!(engine.is_free(LISTING, stay("2025-11-13", "2025-11-15")).await);
    assert_eq!(engine.get_external_blocks(LISTING).await.unwrap(), vec![block]);
}

#[tokio::test]
async fn expired_hold_ignored_before_sweep() {
    let (engine, clock) = test_engine();
    let hold = engine
        .create_hold(LISTING, stay("2025-11-03", "2025-11-06"), 10)
        .await
        .unwrap();
    assert_eq!(hold.expires_at, T0 + 10 * MINUTE_MS);

    clock.advance(10 * MINUTE_MS - 1);
    assert!(!engine.is_free(LISTING, stay("2025-11-03", "2025-11-06")).await);

    clock.advance(1);
    assert!(engine.is_free(LISTING, stay("2025-11-03", "2025-11-06")).await);
    // still stored until the sweep runs
    assert_eq!(engine.get_holds(LISTING).await.unwrap().len(), 1);
    assert!(engine.get_live_hold(hold.id).await.is_none());
}

#[tokio::test]
async fn blocked_ranges_window() {
    let (engine, _) = test_engine();
    assert_ok!(engine.confirm_booking(LISTING, stay("2025-11-03", "2025-11-06")).await);
    assert_ok!(engine.create_hold(LISTING, stay("2025-11-06", "2025-11-08"), 10).await);
    assert_ok!(
        engine
            .add_external_block(LISTING, stay("2025-11-20", "2025-11-25"), "mock-ical")
            .await
    );

    let ranges = engine
        .blocked_ranges(LISTING, stay("2025-11-01", "2025-11-22"))
        .await
        .unwrap();
    assert_eq!(
        ranges,
        vec![stay("2025-11-03", "2025-11-08"), stay("2025-11-20", "2025-11-22")]
    );
}

#[tokio::test]
async fn blocked_ranges_rejects_wide_window() {
    let (engine, _) = test_engine();
    let end = d("2025-01-01") + chrono::Days::new(MAX_CALENDAR_WINDOW_DAYS as u64 + 1);
    let result = engine
        .blocked_ranges(LISTING, Stay::new(d("2025-01-01"), end))
        .await;
    assert!(matches!(result, Err(EngineError::LimitExceeded(_))));
}

#[tokio::test]
async fn blocked_ranges_unknown_listing() {
    let (engine, _) = test_engine();
    let result = engine.blocked_ranges("nowhere", stay("2025-11-01", "2025-11-02")).await;
    assert_eq!(result, Err(EngineError::UnknownListing("nowhere".into())));
}

// ── Holds ────────────────────────────────────────────────

#[tokio::test]
async fn create_hold_does_not_recheck() {
    let (engine, _) = test_engine();
    assert_ok!(engine.create_hold(LISTING, stay("2025-11-03", "2025-11-06"), 10).await);
    assert_ok!(engine.create_hold(LISTING, stay("2025-11-04", "2025-11-07"), 10).await);
    assert_eq!(engine.get_holds(LISTING).await.unwrap().len(), 2);
}

#[tokio::test]
async fn place_hold_rejects_overlap() {
    let (engine, _) = test_engine();
    let first = engine
        .place_hold(LISTING, stay("2025-11-03", "2025-11-06"), 10)
        .await
        .unwrap();
    let second = engine
        .place_hold(LISTING, stay("2025-11-04", "2025-11-07"), 10)
        .await;
    assert_eq!(
        second,
        Err(EngineError::Unavailable {
            listing_id: LISTING.into(),
            conflict: first.id,
        })
    );
    assert_ok!(engine.place_hold(LISTING, stay("2025-11-06", "2025-11-08"), 10).await);
}

#[tokio::test]
async fn place_hold_over_expired_hold() {
    let (engine, clock) = test_engine();
    assert_ok!(engine.place_hold(LISTING, stay("2025-11-03", "2025-11-06"), 10).await);
    clock.advance(11 * MINUTE_MS);
    assert_ok!(engine.place_hold(LISTING, stay("2025-11-03", "2025-11-06"), 10).await);
}

#[tokio::test]
async fn concurrent_place_hold_admits_one() {
    let (engine, _) = test_engine();
    let engine = Arc::new(engine);
    let mut handles = Vec::new();
    for _ in 0..32 {
        let engine = engine.clone();
        handles.push(tokio::spawn(async move {
            engine
                .place_hold(LISTING, stay("2025-11-03", "2025-11-06"), 10)
                .await
                .is_ok()
        }));
    }
    let mut admitted = 0;
    for h in handles {
        if h.await.unwrap() {
            admitted += 1;
        }
    }
    assert_eq!(admitted, 1);
}

#[tokio::test]
async fn hold_unknown_listing() {
    let (engine, _) = test_engine();
    let result = engine.place_hold("nowhere", stay("2025-11-03", "2025-11-06"), 10).await;
    assert!(matches!(result, Err(EngineError::UnknownListing(_))));
}

#[tokio::test]
async fn hold_ttl_limits() {
    let (engine, _) = test_engine();
    let s = stay("2025-11-03", "2025-11-06");
    assert_err!(engine.create_hold(LISTING, s, 0).await);
    assert_err!(engine.create_hold(LISTING, s, MAX_HOLD_MINUTES + 1).await);
    assert_ok!(engine.create_hold(LISTING, s, MAX_HOLD_MINUTES).await);
}

#[tokio::test]
async fn stay_length_limit() {
    let (engine, _) = test_engine();
    let end = d("2025-01-01") + chrono::Days::new(MAX_STAY_NIGHTS as u64 + 1);
    let result = engine.confirm_booking(LISTING, Stay::new(d("2025-01-01"), end)).await;
    assert_eq!(result, Err(EngineError::LimitExceeded("stay too long")));
}

#[tokio::test]
async fn consume_hold_once() {
    let (engine, _) = test_engine();
    let hold = engine
        .create_hold(LISTING, stay("2025-11-03", "2025-11-06"), 10)
        .await
        .unwrap();

    assert_eq!(engine.consume_hold(hold.id).await, Some(hold.clone()));
    assert_eq!(engine.consume_hold(hold.id).await, None);
    assert!(engine.is_free(LISTING, stay("2025-11-03", "2025-11-06")).await);
}

#[tokio::test]
async fn consume_unknown_hold() {
    let (engine, _) = test_engine();
    assert_eq!(engine.consume_hold(Ulid::new()).await, None);
}

#[tokio::test]
async fn concurrent_consume_yields_once() {
    let (engine, _) = test_engine();
    let engine = Arc::new(engine);
    let hold = engine
        .create_hold(LISTING, stay("2025-11-03", "2025-11-06"), 10)
        .await
        .unwrap();

    let mut handles = Vec::new();
    for _ in 0..16 {
        let engine = engine.clone();
        let id = hold.id;
        handles.push(tokio::spawn(async move { engine.consume_hold(id).await }));
    }
    let mut got = 0;
    for h in handles {
        if h.await.unwrap().is_some() {
            got += 1;
        }
    }
    assert_eq!(got, 1);
}

// ── Sweep ────────────────────────────────────────────────

#[tokio::test]
async fn sweep_removes_only_expired() {
    let (engine, clock) = test_engine();
    let short = engine
        .create_hold(LISTING, stay("2025-11-03", "2025-11-06"), 5)
        .await
        .unwrap();
    let long = engine
        .create_hold(LISTING, stay("2025-11-10", "2025-11-12"), 30)
        .await
        .unwrap();
    assert_ok!(engine.confirm_booking(LISTING, stay("2025-11-20", "2025-11-22")).await);

    assert_eq!(engine.sweep_expired_holds().await, 0);

    clock.advance(5 * MINUTE_MS);
    assert_eq!(engine.sweep_expired_holds().await, 1);

    let holds = engine.get_holds(LISTING).await.unwrap();
    assert_eq!(holds, vec![long]);
    assert_eq!(engine.get_bookings(LISTING).await.unwrap().len(), 1);
    assert!(engine.get_listing_for_hold(&short.id).is_none());
    assert_eq!(engine.consume_hold(short.id).await, None);
}

// ── Bookings ─────────────────────────────────────────────

#[tokio::test]
async fn hold_consume_confirm_blocks_via_booking() {
    let (engine, _) = test_engine();
    let s = stay("2025-11-03", "2025-11-06");
    let hold = engine.create_hold(LISTING, s, 10).await.unwrap();
    assert!(engine.consume_hold(hold.id).await.is_some());
    assert!(engine.is_free(LISTING, s).await);

    let booking = engine.confirm_booking(LISTING, s).await.unwrap();
    assert_eq!(booking.status, BookingStatus::Confirmed);
    assert_eq!(booking.created_at, T0);
    assert!(!engine.is_free(LISTING, s).await);
    assert!(engine.get_holds(LISTING).await.unwrap().is_empty());
    assert_eq!(engine.get_bookings(LISTING).await.unwrap(), vec![booking]);
}

#[tokio::test]
async fn booking_survives_sweep() {
    let (engine, clock) = test_engine();
    let s = stay("2025-11-03", "2025-11-06");
    assert_ok!(engine.confirm_booking(LISTING, s).await);
    clock.advance(365 * 24 * 60 * MINUTE_MS);
    engine.sweep_expired_holds().await;
    assert!(!engine.is_free(LISTING, s).await);
}

// ── Settlement ───────────────────────────────────────────

#[tokio::test]
async fn settle_confirms() {
    let (engine, _) = test_engine();
    let s = stay("2025-11-03", "2025-11-06");
    let hold = engine.place_hold(LISTING, s, 10).await.unwrap();

    let booking = match engine.settle_checkout(hold.id, LISTING, s).await.unwrap() {
        Settlement::Confirmed(booking) => booking,
        unexpected => panic!("expected confirmation, got {unexpected:?}"),
    };
    assert_eq!((booking.start, booking.end), (s.start, s.end));
    assert!(engine.get_holds(LISTING).await.unwrap().is_empty());
    assert!(!engine.is_free(LISTING, s).await);
}

#[tokio::test]
async fn settle_twice_drops_second() {
    let (engine, _) = test_engine();
    let s = stay("2025-11-03", "2025-11-06");
    let hold = engine.place_hold(LISTING, s, 10).await.unwrap();

    assert!(matches!(
        engine.settle_checkout(hold.id, LISTING, s).await,
        Ok(Settlement::Confirmed(_))
    ));
    assert_eq!(
        engine.settle_checkout(hold.id, LISTING, s).await,
        Ok(Settlement::HoldMissing)
    );
    assert_eq!(engine.get_bookings(LISTING).await.unwrap().len(), 1);
}

#[tokio::test]
async fn settle_after_sweep_is_missing() {
    let (engine, clock) = test_engine();
    let s = stay("2025-11-03", "2025-11-06");
    let hold = engine.place_hold(LISTING, s, 10).await.unwrap();
    clock.advance(10 * MINUTE_MS);
    engine.sweep_expired_holds().await;

    assert_eq!(
        engine.settle_checkout(hold.id, LISTING, s).await,
        Ok(Settlement::HoldMissing)
    );
    assert!(engine.get_bookings(LISTING).await.unwrap().is_empty());
}

#[tokio::test]
async fn settle_expired_but_unswept_hold_still_confirms_when_free() {
    let (engine, clock) = test_engine();
    let s = stay("2025-11-03", "2025-11-06");
    let hold = engine.place_hold(LISTING, s, 10).await.unwrap();
    clock.advance(15 * MINUTE_MS);

    assert!(matches!(
        engine.settle_checkout(hold.id, LISTING, s).await,
        Ok(Settlement::Confirmed(_))
    ));
}

#[tokio::test]
async fn settle_conflict_drops_booking() {
    let (engine, clock) = test_engine();
    let s = stay("2025-11-03", "2025-11-06");
    let hold = engine.place_hold(LISTING, s, 10).await.unwrap();

    // hold lapses, someone else books the same nights, then the late payment lands
    clock.advance(11 * MINUTE_MS);
    let other = engine.place_hold(LISTING, stay("2025-11-05", "2025-11-07"), 10).await.unwrap();

    let settlement = engine.settle_checkout(hold.id, LISTING, s).await.unwrap();
    match settlement {
        Settlement::Conflict { hold: consumed, with } => {
            assert_eq!(consumed.id, hold.id);
            assert_eq!(with, other.id);
        }
        unexpected => panic!("expected conflict, got {unexpected:?}"),
    }
    assert!(engine.get_bookings(LISTING).await.unwrap().is_empty());
    // the late hold was consumed all the same
    assert_eq!(engine.consume_hold(hold.id).await, None);
}

#[tokio::test]
async fn settle_hold_from_other_listing_is_missing() {
    let mut listings = default_listings();
    let mut second = listings[0].clone();
    second.id = "pine-hollow".into();
    listings.push(second);
    let engine = Engine::new(listings, Arc::new(ManualClock::new(T0)));

    let s = stay("2025-11-03", "2025-11-06");
    let hold = engine.place_hold("pine-hollow", s, 10).await.unwrap();
    assert_eq!(
        engine.settle_checkout(hold.id, LISTING, s).await,
        Ok(Settlement::HoldMissing)
    );
    // untouched on its own listing
    assert!(engine.get_live_hold(hold.id).await.is_some());
}

#[tokio::test]
async fn listings_are_independent() {
    let mut listings = default_listings();
    let mut second = listings[0].clone();
    second.id = "pine-hollow".into();
    listings.push(second);
    let engine = Engine::new(listings, Arc::new(ManualClock::new(T0)));

    let s = stay("2025-11-03", "2025-11-06");
    assert_ok!(engine.place_hold(LISTING, s, 10).await);
    assert!(engine.is_free("pine-hollow", s).await);
    assert_ok!(engine.place_hold("pine-hollow", s, 10).await);
    assert_eq!(engine.default_listing().map(|l| l.id.as_str()), Some(LISTING));
}
