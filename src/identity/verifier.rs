//! Anti-abuse verifier gating code delivery.
//!
//! Every send attempt gets a fresh [`Verifier`]. A verifier is consumed by
//! the attempt that created it and dropped when the attempt fails, so a
//! retry never reuses a stale challenge.

use std::fmt::Write;
use std::sync::{Mutex, PoisonError};

use rand::Rng;

use super::ProviderError;

/// One send attempt's anti-abuse challenge.
#[derive(Debug, PartialEq, Eq)]
pub struct Verifier {
    nonce: String,
}

impl Verifier {
    /// New verifier with a random 16-byte hex nonce.
    #[must_use]
    pub fn fresh() -> Self {
        let bytes: [u8; 16] = rand::rng().random();
        let mut nonce = String::with_capacity(32);
        for b in bytes {
            let _ = write!(nonce, "{b:02x}");
        }
        Self { nonce }
    }

    #[must_use]
    pub fn nonce(&self) -> &str {
        &self.nonce
    }
}

/// Produces the token the provider expects alongside a send request.
#[async_trait::async_trait]
pub trait VerifierSource: Send + Sync {
    async fn solve(&self, verifier: &Verifier) -> Result<String, ProviderError>;
}

/// Token obtained out of band (e.g. pasted from a browser challenge or a
/// provider test token). The token answers one send attempt only; a later
/// attempt needs a new one. Absent token means code delivery is unavailable.
#[derive(Debug, Default)]
pub struct StaticVerifier {
    token: Mutex<Option<String>>,
    configured: bool,
}

impl StaticVerifier {
    #[must_use]
    pub fn new(token: Option<String>) -> Self {
        let token = token.filter(|t| !t.trim().is_empty());
        Self { configured: token.is_some(), token: Mutex::new(token) }
    }
}

#[async_trait::async_trait]
impl VerifierSource for StaticVerifier {
    async fn solve(&self, _verifier: &Verifier) -> Result<String, ProviderError> {
        if !self.configured {
            return Err(ProviderError::NotConfigured("anti-abuse verifier token"));
        }
        self.token
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
            .ok_or_else(|| ProviderError::VerifierRejected("verifier token already used".to_owned()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_verifiers_differ() {
        let a = Verifier::fresh();
        let b = Verifier::fresh();
        assert_eq!(a.nonce().len(), 32);
        assert!(a.nonce().chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(a, b);
    }

    #[tokio::test]
    async fn static_verifier_requires_token() {
        let missing = StaticVerifier::new(Some("  ".into()));
        assert!(matches!(
            missing.solve(&Verifier::fresh()).await,
            Err(ProviderError::NotConfigured(_))
        ));

        let present = StaticVerifier::new(Some("tok".into()));
        assert_eq!(present.solve(&Verifier::fresh()).await.unwrap(), "tok");
    }

    #[tokio::test]
    async fn static_token_answers_one_attempt() {
        let verifier = StaticVerifier::new(Some("tok".into()));
        verifier.solve(&Verifier::fresh()).await.unwrap();

        assert!(matches!(
            verifier.solve(&Verifier::fresh()).await,
            Err(ProviderError::VerifierRejected(_))
        ));
    }
}
