//! Bearer credential sourcing.
//!
//! The usual setup has a browser-side collaborator persisting the console's
//! `Authorization` header into a small JSON store; this module re-reads that
//! store before every request so a refreshed capture takes effect without a
//! restart. A static token covers scripted use.

use std::fs;
use std::path::PathBuf;

use tracing::debug;

use fl_core::{LensError, LensResult};

use crate::secure_string::SecureString;

/// Key the capture collaborator stores the token under.
pub const CAPTURE_KEY: &str = "msGraphToken";

/// Where the connector gets its bearer token from.
#[derive(Debug, Clone)]
pub enum CredentialProvider {
    /// A fixed token, from a flag or the environment.
    Static(SecureString),
    /// A JSON key-value store written by the capture collaborator, re-read
    /// on every call.
    CaptureFile(PathBuf),
}

impl CredentialProvider {
    pub fn static_token(token: impl Into<SecureString>) -> Self {
        Self::Static(token.into())
    }

    pub fn capture_file(path: impl Into<PathBuf>) -> Self {
        Self::CaptureFile(path.into())
    }

    /// The current bearer token, without the `Bearer ` prefix.
    ///
    /// Captured values are stored as the raw `Authorization` header, so a
    /// leading `Bearer ` is tolerated and stripped.
    pub fn bearer_token(&self) -> LensResult<SecureString> {
        let raw = match self {
            CredentialProvider::Static(token) => token.expose_secret().to_string(),
            CredentialProvider::CaptureFile(path) => {
                let contents = fs::read_to_string(path).map_err(|err| {
                    debug!(path = %path.display(), error = %err, "capture store unreadable");
                    LensError::Resolution("no credential captured".to_string())
                })?;
                let store: serde_json::Value =
                    serde_json::from_str(&contents).map_err(|err| {
                        LensError::Decode(format!("capture store is not valid JSON: {err}"))
                    })?;
                store
                    .get(CAPTURE_KEY)
                    .and_then(|v| v.as_str())
                    .unwrap_or_default()
                    .to_string()
            }
        };
        let token = raw
            .trim()
            .strip_prefix("Bearer ")
            .unwrap_or(raw.trim())
            .trim();
        if token.is_empty() {
            return Err(LensError::Resolution("no credential captured".to_string()));
        }
        Ok(SecureString::from(token))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_store(name: &str, contents: &str) -> PathBuf {
        let path = std::env::temp_dir().join(format!("fl-graph-cred-{}-{name}", std::process::id()));
        let mut file = fs::File::create(&path).expect("create store");
        file.write_all(contents.as_bytes()).expect("write store");
        path
    }

    #[test]
    fn static_token_passes_through() {
        let provider = CredentialProvider::static_token("eyJraWQi");
        assert_eq!(provider.bearer_token().expect("token").expose_secret(), "eyJraWQi");
    }

    #[test]
    fn bearer_prefix_is_stripped() {
        let provider = CredentialProvider::static_token("Bearer eyJraWQi");
        assert_eq!(provider.bearer_token().expect("token").expose_secret(), "eyJraWQi");
    }

    #[test]
    fn capture_file_is_read_per_call() {
        let path = write_store("reread", r#"{"msGraphToken": "Bearer first"}"#);
        let provider = CredentialProvider::capture_file(&path);
        assert_eq!(provider.bearer_token().expect("token").expose_secret(), "first");

        fs::write(&path, r#"{"msGraphToken": "Bearer second"}"#).expect("rewrite");
        assert_eq!(provider.bearer_token().expect("token").expose_secret(), "second");
        fs::remove_file(&path).ok();
    }

    #[test]
    fn missing_store_and_missing_key_resolve_to_no_credential() {
        let provider = CredentialProvider::capture_file("/nonexistent/fl-graph-store.json");
        assert!(matches!(
            provider.bearer_token().unwrap_err(),
            LensError::Resolution(ref reason) if reason == "no credential captured"
        ));

        let path = write_store("nokey", r#"{"other": "value"}"#);
        let provider = CredentialProvider::capture_file(&path);
        assert!(matches!(
            provider.bearer_token().unwrap_err(),
            LensError::Resolution(_)
        ));
        fs::remove_file(&path).ok();
    }

    #[test]
    fn malformed_store_is_a_decode_error() {
        let path = write_store("bad", "not json");
        let provider = CredentialProvider::capture_file(&path);
        assert!(matches!(provider.bearer_token().unwrap_err(), LensError::Decode(_)));
        fs::remove_file(&path).ok();
    }
}
