//! Error taxonomy shared across the FleetLens crates.

use thiserror::Error;

/// Result alias used throughout the core and connector crates.
pub type LensResult<T> = Result<T, LensError>;

/// Errors surfaced by identity resolution, membership aggregation,
/// assignment resolution, and group mutations.
///
/// Per-item failures inside a fan-out (one policy's assignment fetch, one
/// group's mutation) are caught and recorded against that item; they never
/// appear as a `LensError` from the batch operation. Listing fetches,
/// membership-map builds, and identity resolution propagate these directly.
/// Nothing in this crate retries a failed call.
#[derive(Error, Debug, Clone)]
pub enum LensError {
    /// Transport-level failure: connect, timeout, TLS.
    #[error("network error: {0}")]
    Network(String),

    /// Non-2xx response from the management API.
    #[error("HTTP {status}: {body}")]
    Http { status: u16, body: String },

    /// Response body could not be interpreted: malformed JSON, a report
    /// missing required columns, or an undecodable script payload.
    #[error("decode error: {0}")]
    Decode(String),

    /// An identity or group lookup came back empty or malformed, or no
    /// captured credential is available.
    #[error("resolution failed: {0}")]
    Resolution(String),

    /// An add/remove membership call failed for a specific group.
    #[error("mutation failed for group {group}: {reason}")]
    Mutation { group: String, reason: String },

    /// Invalid client or CLI configuration.
    #[error("configuration error: {0}")]
    Config(String),
}

impl LensError {
    /// Builds an [`LensError::Http`], truncating oversized bodies so error
    /// messages stay displayable. The cut lands on a char boundary; bodies
    /// are localized and may hold multibyte text.
    pub fn http(status: u16, body: impl Into<String>) -> Self {
        let mut body = body.into();
        if body.len() > 500 {
            let mut cut = 500;
            while !body.is_char_boundary(cut) {
                cut -= 1;
            }
            body.truncate(cut);
            body.push_str("...");
        }
        LensError::Http { status, body }
    }

    /// True for responses that indicate the resource does not exist.
    pub fn is_not_found(&self) -> bool {
        matches!(self, LensError::Http { status: 404, .. })
    }
}
