//! Ops Manager API key pair.

use std::fmt;

/// Programmatic API key used for digest authentication.
#[derive(Clone)]
pub struct Credentials {
    /// Public key (digest username).
    pub public_key: String,
    /// Private key (digest password).
    pub private_key: String,
}

impl Credentials {
    /// Create credentials from a public/private key pair.
    #[must_use]
    pub fn new(public_key: impl Into<String>, private_key: impl Into<String>) -> Self {
        Self {
            public_key: public_key.into(),
            private_key: private_key.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("public_key", &self.public_key)
            .field("private_key", &"<redacted>")
            .finish()
    }
}
