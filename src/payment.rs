use async_trait::async_trait;
use chrono::NaiveDate;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use ulid::Ulid;

pub const CHECKOUT_COMPLETED: &str = "checkout.session.completed";

/// Header carrying the webhook signature.
pub const SIGNATURE_HEADER: &str = "x-payment-signature";

/// What the provider hands back on every webhook so the booking can be
/// reconstructed without local session state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutMetadata {
    pub listing_id: String,
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub hold_id: Ulid,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LineItem {
    pub name: String,
    pub description: String,
    pub unit_amount: u64,
    pub quantity: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutRequest {
    pub currency: String,
    pub line_item: LineItem,
    pub success_url: String,
    pub cancel_url: String,
    pub metadata: CheckoutMetadata,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CheckoutSession {
    pub id: String,
    /// Hosted page the guest is redirected to.
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WebhookEvent {
    CheckoutCompleted {
        session_id: String,
        metadata: CheckoutMetadata,
    },
    /// Any event type this service does not act on.
    Ignored { kind: String },
}

#[derive(Debug)]
pub enum GatewayError {
    /// Webhook signature missing or wrong.
    Unauthenticated,
    Malformed(String),
    /// Provider refused or could not be reached.
    Provider(String),
}

impl std::fmt::Display for GatewayError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GatewayError::Unauthenticated => write!(f, "webhook signature verification failed"),
            GatewayError::Malformed(e) => write!(f, "malformed webhook payload: {e}"),
            GatewayError::Provider(e) => write!(f, "payment provider error: {e}"),
        }
    }
}

impl std::error::Error for GatewayError {}

/// Hosted-checkout payment provider.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn create_checkout_session(
        &self,
        request: CheckoutRequest,
    ) -> Result<CheckoutSession, GatewayError>;

    /// Authenticate a raw webhook body and decode it.
    fn parse_webhook(
        &self,
        payload: &[u8],
        signature: Option<&str>,
    ) -> Result<WebhookEvent, GatewayError>;
}

// ── Wire envelope ───────────────────────────────────────────────

#[derive(Debug, Serialize, Deserialize)]
struct EventEnvelope {
    #[serde(rename = "type")]
    kind: String,
    data: EventData,
}

#[derive(Debug, Serialize, Deserialize)]
struct EventData {
    object: serde_json::Value,
}

#[derive(Debug, Serialize, Deserialize)]
struct SessionObject {
    id: String,
    metadata: Option<CheckoutMetadata>,
}

pub fn decode_event(payload: &[u8]) -> Result<WebhookEvent, GatewayError> {
    let envelope: EventEnvelope =
        serde_json::from_slice(payload).map_err(|e| GatewayError::Malformed(e.to_string()))?;
    if envelope.kind != CHECKOUT_COMPLETED {
        return Ok(WebhookEvent::Ignored { kind: envelope.kind });
    }
    let session: SessionObject = serde_json::from_value(envelope.data.object)
        .map_err(|e| GatewayError::Malformed(e.to_string()))?;
    let metadata = session
        .metadata
        .ok_or_else(|| GatewayError::Malformed("checkout session without metadata".into()))?;
    Ok(WebhookEvent::CheckoutCompleted {
        session_id: session.id,
        metadata,
    })
}

/// Build the body a provider would deliver for a completed session.
pub fn encode_completed_event(
    session_id: &str,
    metadata: &CheckoutMetadata,
) -> Result<Vec<u8>, GatewayError> {
    let object = serde_json::to_value(SessionObject {
        id: session_id.to_string(),
        metadata: Some(metadata.clone()),
    })
    .map_err(|e| GatewayError::Malformed(e.to_string()))?;
    serde_json::to_vec(&EventEnvelope {
        kind: CHECKOUT_COMPLETED.to_string(),
        data: EventData { object },
    })
    .map_err(|e| GatewayError::Malformed(e.to_string()))
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    a.len() == b.len() && a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

// ── Test mode ───────────────────────────────────────────────────

/// In-process gateway: sessions are kept in memory and webhooks are
/// authenticated by a shared secret sent verbatim in the signature header.
/// A session is forgotten once its completed event has been accepted;
/// sessions that are never paid stay until restart.
pub struct TestModeGateway {
    checkout_base_url: String,
    webhook_secret: Option<String>,
    sessions: DashMap<String, CheckoutRequest>,
}

impl TestModeGateway {
    pub fn new(site_url: &str, webhook_secret: Option<String>) -> Self {
        Self {
            checkout_base_url: format!("{}/test-checkout", site_url.trim_end_matches('/')),
            webhook_secret,
            sessions: DashMap::new(),
        }
    }

    pub fn session(&self, id: &str) -> Option<CheckoutRequest> {
        self.sessions.get(id).map(|e| e.value().clone())
    }

    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }

    /// Payload for completing session `id`, as the provider would post it.
    pub fn completed_event(&self, id: &str) -> Option<Vec<u8>> {
        let request = self.session(id)?;
        encode_completed_event(id, &request.metadata).ok()
    }
}

#[async_trait]
impl PaymentGateway for TestModeGateway {
    async fn create_checkout_session(
        &self,
        request: CheckoutRequest,
    ) -> Result<CheckoutSession, GatewayError> {
        if request.line_item.unit_amount == 0 {
            return Err(GatewayError::Provider("amount must be positive".into()));
        }
        let id = format!("cs_test_{}", Ulid::new());
        let url = format!("{}/{id}", self.checkout_base_url);
        self.sessions.insert(id.clone(), request);
        Ok(CheckoutSession { id, url })
    }

    fn parse_webhook(
        &self,
        payload: &[u8],
        signature: Option<&str>,
    ) -> Result<WebhookEvent, GatewayError> {
        let (Some(secret), Some(signature)) = (self.webhook_secret.as_deref(), signature) else {
            return Err(GatewayError::Unauthenticated);
        };
        if !constant_time_eq(secret.as_bytes(), signature.as_bytes()) {
            return Err(GatewayError::Unauthenticated);
        }
        let event = decode_event(payload)?;
        if let WebhookEvent::CheckoutCompleted { session_id, .. } = &event {
            self.sessions.remove(session_id);
        }
        Ok(event)
    }
}
