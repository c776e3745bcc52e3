//! # fl-graph
//!
//! Microsoft Graph connector for FleetLens. Implements the
//! [`fl_core::ManagementApi`] seam: HTTP plumbing, captured-credential
//! sourcing, wire-format decoding, and endpoint construction.

pub mod client;
pub mod config;
pub mod credentials;
pub mod http;
pub mod secure_string;
pub mod wire;

pub use client::GraphClient;
pub use config::{GraphConfig, RateLimitConfig};
pub use credentials::{CredentialProvider, CAPTURE_KEY};
pub use secure_string::SecureString;
