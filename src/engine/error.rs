use ulid::Ulid;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    UnknownListing(String),
    /// Requested stay overlaps an active booking, hold or external block.
    Unavailable { listing_id: String, conflict: Ulid },
    HoldNotFound(Ulid),
    LimitExceeded(&'static str),
}

impl std::fmt::Display for EngineError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EngineError::UnknownListing(id) => write!(f, "unknown listing: {id}"),
            EngineError::Unavailable { listing_id, conflict } => {
                write!(f, "dates unavailable on {listing_id}: conflicts with {conflict}")
            }
            EngineError::HoldNotFound(id) => write!(f, "hold not found: {id}"),
            EngineError::LimitExceeded(msg) => write!(f, "limit exceeded: {msg}"),
        }
    }
}

impl std::error::Error for EngineError {}
