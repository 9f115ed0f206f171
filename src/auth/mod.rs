//! Credential re-resolution.
//!
//! When the provider rejects a credential with 401 the client asks a
//! [`CredentialResolver`] for a fresh one. Where the credential comes from
//! (environment, keychain, token endpoint) is the resolver's business.

use crate::error::LlmError;
use async_trait::async_trait;
use secrecy::SecretString;

/// Supplies the current credential on demand.
#[async_trait]
pub trait CredentialResolver: Send + Sync {
    /// Returns a credential suitable for `x-api-key` or, when prefixed with
    /// `Bearer `, for the `Authorization` header.
    async fn resolve(&self) -> Result<SecretString, LlmError>;
}

/// A simple static resolver useful for tests and basic scenarios where
/// the credential is managed externally.
pub struct StaticCredential {
    credential: SecretString,
}

impl StaticCredential {
    pub fn new(credential: impl Into<String>) -> Self {
        Self {
            credential: SecretString::from(credential.into()),
        }
    }
}

#[async_trait]
impl CredentialResolver for StaticCredential {
    async fn resolve(&self) -> Result<SecretString, LlmError> {
        Ok(self.credential.clone())
    }
}
