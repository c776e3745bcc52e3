//! Zeroizing wrapper for the captured bearer token.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use zeroize::Zeroizing;

/// A credential string whose memory is cleared on drop.
///
/// Debug and Display are redacted so the token cannot leak through logs or
/// error messages; callers must go through [`SecureString::expose_secret`].
#[derive(Clone)]
pub struct SecureString(Zeroizing<String>);

impl SecureString {
    pub fn new(value: String) -> Self {
        Self(Zeroizing::new(value))
    }

    /// Exposes the secret. Avoid copying the returned slice; copies are not
    /// zeroized.
    pub fn expose_secret(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<String> for SecureString {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

impl From<&str> for SecureString {
    fn from(value: &str) -> Self {
        Self::new(value.to_string())
    }
}

impl fmt::Debug for SecureString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SecureString([REDACTED])")
    }
}

impl fmt::Display for SecureString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[REDACTED]")
    }
}

impl PartialEq for SecureString {
    fn eq(&self, other: &Self) -> bool {
        use subtle::ConstantTimeEq;
        self.0.as_bytes().ct_eq(other.0.as_bytes()).into()
    }
}

impl Eq for SecureString {}

impl Serialize for SecureString {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for SecureString {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        String::deserialize(deserializer).map(SecureString::new)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debug_and_display_are_redacted() {
        let token = SecureString::from("eyJ0eXAiOiJKV1Qi");
        assert!(!format!("{token:?}").contains("eyJ0"));
        assert!(!format!("{token}").contains("eyJ0"));
    }

    #[test]
    fn equality_compares_contents() {
        assert_eq!(SecureString::from("abc"), SecureString::from("abc"));
        assert_ne!(SecureString::from("abc"), SecureString::from("abd"));
    }

    #[test]
    fn serde_round_trips_the_value() {
        let token = SecureString::from("stored-token");
        let json = serde_json::to_string(&token).expect("serialize");
        assert!(json.contains("stored-token"));
        let back: SecureString = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(back, token);
    }
}
