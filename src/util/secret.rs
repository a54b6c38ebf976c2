//! Redacting wrapper for master passwords.

use std::fmt;

/// A password that never shows up in logs or debug output.
///
/// `Debug` and `Display` print `[REDACTED]`; the value is only reachable
/// through [`expose_secret`](Self::expose_secret). The buffer is cleared on
/// drop (best effort only, copies made elsewhere are not tracked).
#[derive(Clone)]
pub struct SecretString(String);

impl SecretString {
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    #[inline]
    pub fn expose_secret(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for SecretString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[REDACTED]")
    }
}

impl fmt::Display for SecretString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[REDACTED]")
    }
}

impl Drop for SecretString {
    fn drop(&mut self) {
        self.0.clear();
        self.0.shrink_to_fit();
    }
}
