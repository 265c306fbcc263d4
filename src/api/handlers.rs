use axum::{
    extract::{Path, Query, State},
    http::{header, HeaderMap},
    response::IntoResponse,
    Json,
};
use bytes::Bytes;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{info, warn};
use ulid::Ulid;

use super::{ApiError, AppState, JsonBody};
use crate::calendar;
use crate::model::*;
use crate::observability;
use crate::payment::{CheckoutMetadata, CheckoutRequest, LineItem, WebhookEvent, SIGNATURE_HEADER};
use crate::pricing;

fn parse_date(raw: &str) -> Result<NaiveDate, ApiError> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map_err(|_| ApiError::BadRequest(format!("invalid date {raw:?}, expected YYYY-MM-DD")))
}

fn parse_stay(start: Option<&str>, end: Option<&str>) -> Result<Stay, ApiError> {
    let (Some(start), Some(end)) = (start, end) else {
        return Err(ApiError::BadRequest("start and end YYYY-MM-DD required".into()));
    };
    Stay::try_new(parse_date(start)?, parse_date(end)?)
        .ok_or_else(|| ApiError::BadRequest("end must be after start".into()))
}

impl AppState {
    /// Requested listing, falling back to the first one in the catalog.
    fn listing_or_default(&self, requested: Option<String>) -> Result<String, ApiError> {
        requested
            .filter(|l| !l.is_empty())
            .or_else(|| self.engine.default_listing().map(|l| l.id.clone()))
            .ok_or_else(|| ApiError::NotFound("no listings configured".into()))
    }
}

pub async fn health() -> impl IntoResponse {
    Json(json!({ "ok": true }))
}

// ── Availability ────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct AvailabilityQuery {
    listing: Option<String>,
    start: Option<String>,
    end: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct AvailabilityResponse {
    listing: String,
    start: NaiveDate,
    end: NaiveDate,
    available: bool,
}

pub async fn availability(
    State(state): State<AppState>,
    Query(q): Query<AvailabilityQuery>,
) -> Result<Json<AvailabilityResponse>, ApiError> {
    let stay = parse_stay(q.start.as_deref(), q.end.as_deref())?;
    let listing = state.listing_or_default(q.listing)?;
    let available = state.engine.is_free(&listing, stay).await;
    Ok(Json(AvailabilityResponse {
        listing,
        start: stay.start,
        end: stay.end,
        available,
    }))
}

#[derive(Debug, Deserialize)]
pub struct BlockedQuery {
    from: Option<String>,
    to: Option<String>,
}

pub async fn blocked(
    State(state): State<AppState>,
    Path(listing): Path<String>,
    Query(q): Query<BlockedQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let window = parse_stay(q.from.as_deref(), q.to.as_deref())?;
    let blocked = state.engine.blocked_ranges(&listing, window).await?;
    Ok(Json(json!({ "listing": listing, "blocked": blocked })))
}

// ── Hold ────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct HoldBody {
    listing: Option<String>,
    start: Option<String>,
    end: Option<String>,
}

pub async fn hold(
    State(state): State<AppState>,
    JsonBody(body): JsonBody<HoldBody>,
) -> Result<impl IntoResponse, ApiError> {
    let stay = parse_stay(body.start.as_deref(), body.end.as_deref())?;
    let listing = state.listing_or_default(body.listing)?;
    let hold = state
        .engine
        .place_hold(&listing, stay, state.settings.hold_minutes)
        .await?;
    info!("hold {} placed on {listing} [{}, {})", hold.id, hold.start, hold.end);
    Ok(Json(json!({ "hold": hold })))
}

// ── Checkout ────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutBody {
    listing: Option<String>,
    start: Option<String>,
    end: Option<String>,
    hold_id: Option<String>,
}

pub async fn checkout(
    State(state): State<AppState>,
    JsonBody(body): JsonBody<CheckoutBody>,
) -> Result<impl IntoResponse, ApiError> {
    let (Some(start), Some(end), Some(hold_id)) = (body.start, body.end, body.hold_id) else {
        return Err(ApiError::BadRequest("start, end, holdId required".into()));
    };
    let stay = parse_stay(Some(&start), Some(&end))?;
    let hold_id: Ulid = hold_id
        .parse()
        .map_err(|_| ApiError::BadRequest(format!("invalid holdId {hold_id:?}")))?;
    let listing_id = state.listing_or_default(body.listing)?;
    let listing = state
        .engine
        .listing(&listing_id)
        .ok_or_else(|| ApiError::NotFound(format!("unknown listing: {listing_id}")))?;

    let hold = state
        .engine
        .get_live_hold(hold_id)
        .await
        .ok_or_else(|| ApiError::NotFound(format!("hold not found or expired: {hold_id}")))?;
    if hold.listing_id != listing.id || hold.stay() != stay {
        return Err(ApiError::BadRequest("hold does not cover the requested dates".into()));
    }

    let quote = pricing::quote(listing, &stay);
    let settings = &state.settings;
    let request = CheckoutRequest {
        currency: settings.currency.clone(),
        line_item: LineItem {
            name: quote.line_item_name(listing, &stay),
            description: quote.line_item_description(),
            unit_amount: quote.amount,
            quantity: 1,
        },
        success_url: format!("{}/?success=1", settings.site_url),
        cancel_url: format!("{}/?canceled=1", settings.site_url),
        metadata: CheckoutMetadata {
            listing_id: listing.id.clone(),
            start: stay.start,
            end: stay.end,
            hold_id,
        },
    };
    let session = state.gateway.create_checkout_session(request).await?;
    info!("checkout {} for hold {hold_id}: {} cents", session.id, quote.amount);
    Ok(Json(json!({ "url": session.url })))
}

// ── Payment webhook ─────────────────────────────────────────────

pub async fn payment_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<impl IntoResponse, ApiError> {
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok());
    let event = match state.gateway.parse_webhook(&body, signature) {
        Ok(event) => event,
        Err(e) => {
            warn!("webhook rejected: {e}");
            metrics::counter!(observability::WEBHOOKS_REJECTED_TOTAL).increment(1);
            return Err(e.into());
        }
    };

    match event {
        WebhookEvent::CheckoutCompleted { session_id, metadata } => {
            settle(&state, &session_id, metadata).await;
        }
        WebhookEvent::Ignored { kind } => {
            tracing::debug!("ignoring webhook event {kind}");
        }
    }
    Ok(Json(json!({ "received": true })))
}

/// The provider already has the money; failures here are logged, never
/// bounced back, so the provider does not redeliver.
async fn settle(state: &AppState, session_id: &str, metadata: CheckoutMetadata) {
    let Some(stay) = Stay::try_new(metadata.start, metadata.end) else {
        warn!("checkout {session_id} carries an empty stay; nothing booked");
        return;
    };
    match state
        .engine
        .settle_checkout(metadata.hold_id, &metadata.listing_id, stay)
        .await
    {
        Ok(Settlement::Confirmed(booking)) => {
            info!(
                "booking {} confirmed on {} [{}, {}) via {session_id}",
                booking.id, booking.listing_id, booking.start, booking.end
            );
        }
        Ok(Settlement::HoldMissing) => {
            warn!(
                "checkout {session_id} paid but hold {} is gone; nothing booked",
                metadata.hold_id
            );
        }
        Ok(Settlement::Conflict { with, .. }) => {
            warn!("checkout {session_id} paid but dates now taken by {with}; nothing booked");
        }
        Err(e) => {
            warn!("checkout {session_id} could not be settled: {e}");
        }
    }
}

// ── Calendar export ─────────────────────────────────────────────

pub async fn calendar(
    State(state): State<AppState>,
    Path(file): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let listing = file
        .strip_suffix(".ics")
        .ok_or_else(|| ApiError::NotFound(format!("no calendar at {file}")))?;
    if state.engine.listing(listing).is_none() {
        return Err(ApiError::NotFound(format!("unknown listing: {listing}")));
    }
    let bookings = state.engine.get_bookings(listing).await?;
    let body = calendar::render(
        &state.settings.calendar,
        listing,
        &bookings,
        state.engine.now_ms(),
    );
    Ok((
        [
            (header::CONTENT_TYPE, calendar::CONTENT_TYPE),
            (header::CONTENT_DISPOSITION, "attachment; filename=\"calendar.ics\""),
        ],
        body,
    ))
}
