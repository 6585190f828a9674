//! Passwords in memory.
//!
//! A [`Secret`] is zeroized on drop and prints as `Secret([REDACTED])`, so a
//! password captured in a request can be logged with `?` safely.

use std::fmt;

use secrecy::{ExposeSecret, SecretString};

pub struct Secret(SecretString);

impl Secret {
    pub fn new(password: impl Into<String>) -> Self {
        Self(SecretString::from(password.into()))
    }

    /// The password itself. Only the archiver command line should need this.
    #[inline]
    pub fn expose_secret(&self) -> &str {
        self.0.expose_secret()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.0.expose_secret().is_empty()
    }

    /// Whether `other` holds the same password.
    pub fn same_as(&self, other: &Self) -> bool {
        self.expose_secret() == other.expose_secret()
    }
}

impl From<String> for Secret {
    fn from(password: String) -> Self {
        Self::new(password)
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Secret([REDACTED])")
    }
}
