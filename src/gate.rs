//! Access gate: shared-secret check that fronts the whole pipeline.
//!
//! The gate must pass before the retrieval index is built and before any
//! generation call is issued; a wrong secret halts the session with zero
//! backend invocations, so no document content leaks and no API quota is
//! spent on an unauthenticated request.
//!
//! The secret is a compile-time constant. This is a known-weak design point
//! carried over from the product: the gate keeps casual users out of a
//! shared demo deployment, nothing more.

use sha2::{Digest, Sha256};
use tracing::{debug, warn};

use crate::error::{Error, Result};

/// The shared access secret.
pub const ACCESS_SECRET: &str = "nomads2025";

/// Shared-secret access gate.
pub struct AccessGate {
    secret_digest: [u8; 32],
}

impl AccessGate {
    /// Create a gate for the given secret.
    pub fn new(secret: &str) -> Self {
        Self {
            secret_digest: digest(secret),
        }
    }

    /// Create the gate for the built-in secret.
    pub fn with_default_secret() -> Self {
        Self::new(ACCESS_SECRET)
    }

    /// Check the submitted secret. Digest comparison keeps the check
    /// independent of where the candidate string first differs.
    pub fn check(&self, submitted: &str) -> bool {
        let candidate = digest(submitted);
        // Fixed-length digest compare; no early exit on the secret bytes.
        let mut diff = 0u8;
        for (a, b) in self.secret_digest.iter().zip(candidate.iter()) {
            diff |= a ^ b;
        }
        diff == 0
    }

    /// Check the submitted secret, converting a mismatch into the error
    /// taxonomy so callers can halt the pipeline uniformly.
    pub fn verify(&self, submitted: &str) -> Result<()> {
        if self.check(submitted) {
            debug!(gate = %self.fingerprint(), "Access granted");
            Ok(())
        } else {
            warn!(gate = %self.fingerprint(), "Access denied");
            Err(Error::AccessDenied)
        }
    }

    /// Short digest fingerprint for log lines; never reveals the secret.
    pub fn fingerprint(&self) -> String {
        hex::encode(&self.secret_digest[..4])
    }
}

fn digest(input: &str) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(input.as_bytes());
    hasher.finalize().into()
}

// ─────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_correct_secret_passes() {
        let gate = AccessGate::new("letmein");
        assert!(gate.check("letmein"));
        assert!(gate.verify("letmein").is_ok());
    }

    #[test]
    fn test_wrong_secret_fails() {
        let gate = AccessGate::new("letmein");
        assert!(!gate.check("letmeout"));
        assert!(!gate.check(""));
        assert!(!gate.check("letmein "));
        assert!(matches!(gate.verify("nope"), Err(Error::AccessDenied)));
    }

    #[test]
    fn test_default_secret() {
        let gate = AccessGate::with_default_secret();
        assert!(gate.check(ACCESS_SECRET));
        assert!(!gate.check("password"));
    }

    #[test]
    fn test_fingerprint_is_not_the_secret() {
        let gate = AccessGate::new("hunter2");
        let fp = gate.fingerprint();
        assert_eq!(fp.len(), 8);
        assert!(!fp.contains("hunter2"));
    }
}
