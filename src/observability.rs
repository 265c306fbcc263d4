use std::net::SocketAddr;

// ── Booking-flow counters ───────────────────────────────────────

/// Counter: availability queries answered.
pub const AVAILABILITY_CHECKS_TOTAL: &str = "directbook_availability_checks_total";

/// Counter: holds written to a calendar.
pub const HOLDS_PLACED_TOTAL: &str = "directbook_holds_placed_total";

/// Counter: hold requests refused because the dates were taken.
pub const HOLDS_REJECTED_TOTAL: &str = "directbook_holds_rejected_total";

/// Counter: holds removed by the expiry sweep.
pub const HOLDS_EXPIRED_TOTAL: &str = "directbook_holds_expired_total";

/// Counter: bookings confirmed.
pub const BOOKINGS_CONFIRMED_TOTAL: &str = "directbook_bookings_confirmed_total";

/// Counter: paid checkouts that did not become bookings. Labels: reason.
pub const SETTLEMENTS_DROPPED_TOTAL: &str = "directbook_settlements_dropped_total";

// ── HTTP ────────────────────────────────────────────────────────

/// Counter: webhook deliveries that failed authentication or decoding.
pub const WEBHOOKS_REJECTED_TOTAL: &str = "directbook_webhooks_rejected_total";

/// Install Prometheus metrics exporter on the given port. No-op if port is None.
pub fn init(port: Option<u16>) -> Result<(), metrics_exporter_prometheus::BuildError> {
    let Some(port) = port else { return Ok(()) };
    let addr: SocketAddr = ([0, 0, 0, 0], port).into();
    metrics_exporter_prometheus::PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()?;
    tracing::info!("metrics endpoint: http://0.0.0.0:{port}/metrics");
    Ok(())
}
