use std::time::Duration;

use crate::limits::MAX_HOLD_MINUTES;

/// Process settings, read once from `DIRECTBOOK_*` environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    pub bind: String,
    pub port: u16,
    /// Public origin of the booking site; checkout redirects land here.
    pub site_url: String,
    pub hold_minutes: i64,
    pub sweep_interval: Duration,
    pub metrics_port: Option<u16>,
    /// The payment webhook route is mounted only when this is set.
    pub webhook_secret: Option<String>,
    pub currency: String,
    pub calendar_domain: String,
    pub calendar_brand: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0".into(),
            port: 3001,
            site_url: "http://localhost:5173".into(),
            hold_minutes: 10,
            sweep_interval: Duration::from_secs(60),
            metrics_port: None,
            webhook_secret: None,
            currency: "usd".into(),
            calendar_domain: "directbook.local".into(),
            calendar_brand: "DirectBook".into(),
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup. Unparseable or out-of-range numbers fall
    /// back to defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let d = Self::default();
        let var = |name: &str| lookup(&format!("DIRECTBOOK_{name}")).filter(|v| !v.is_empty());
        Self {
            bind: var("BIND").unwrap_or(d.bind),
            port: var("PORT").and_then(|s| s.parse().ok()).unwrap_or(d.port),
            site_url: var("SITE_URL").unwrap_or(d.site_url),
            hold_minutes: var("HOLD_MINUTES")
                .and_then(|s| s.parse().ok())
                .filter(|m| (1..=MAX_HOLD_MINUTES).contains(m))
                .unwrap_or(d.hold_minutes),
            sweep_interval: var("SWEEP_INTERVAL_SECS")
                .and_then(|s| s.parse().ok())
                .filter(|secs| *secs > 0)
                .map(Duration::from_secs)
                .unwrap_or(d.sweep_interval),
            metrics_port: var("METRICS_PORT").and_then(|s| s.parse().ok()),
            webhook_secret: var("WEBHOOK_SECRET"),
            currency: var("CURRENCY").unwrap_or(d.currency),
            calendar_domain: var("CALENDAR_DOMAIN").unwrap_or(d.calendar_domain),
            calendar_brand: var("CALENDAR_BRAND").unwrap_or(d.calendar_brand),
        }
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.bind, self.port)
    }
}
