//! Identity capability consumed by the remote client.
//!
//! The identity provider itself (login, logout, token refresh) lives outside
//! this crate. Front-ends hand the core an [`IdentityProvider`] implementation.

use std::fmt;
use std::future::Future;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::util::normalize_text_option;

const DEFAULT_READY_ATTEMPTS: u32 = 10;
const DEFAULT_READY_INTERVAL_MS: u64 = 500;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthUser {
    pub id: String,
    pub email: Option<String>,
    pub name: Option<String>,
}

impl AuthUser {
    /// Name shown in the UI, falling back to the email address.
    pub fn display_name(&self) -> &str {
        self.name
            .as_deref()
            .or(self.email.as_deref())
            .unwrap_or(&self.id)
    }
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Not signed in. Log in again to sync your journal.")]
    NotAuthenticated,
    #[error("Identity provider was not ready after {attempts} attempts")]
    NotReady { attempts: u32 },
    #[error("Access token unavailable: {0}")]
    TokenUnavailable(String),
    #[error("Secure storage error: {0}")]
    SecureStorage(String),
}

pub type AuthResult<T> = Result<T, AuthError>;

/// Capability for obtaining the signed-in user and a bearer token.
pub trait IdentityProvider: Send + Sync {
    /// Whether the provider finished initialising. Hosts whose identity
    /// client loads asynchronously return `false` until it is usable.
    fn is_ready(&self) -> bool {
        true
    }

    fn is_authenticated(&self) -> impl Future<Output = bool> + Send;

    fn get_token(&self) -> impl Future<Output = AuthResult<String>> + Send;

    fn get_user(&self) -> impl Future<Output = AuthResult<Option<AuthUser>>> + Send;
}

/// Bounded retry schedule for waiting on identity readiness.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    #[serde(with = "duration_millis")]
    pub interval: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_READY_ATTEMPTS,
            interval: Duration::from_millis(DEFAULT_READY_INTERVAL_MS),
        }
    }
}

/// Wait until the identity provider reports ready.
///
/// Polls up to `policy.max_attempts` times, sleeping `policy.interval` between
/// attempts, then fails with [`AuthError::NotReady`].
pub async fn await_ready<P: IdentityProvider>(provider: &P, policy: RetryPolicy) -> AuthResult<()> {
    let attempts = policy.max_attempts.max(1);
    for attempt in 1..=attempts {
        if provider.is_ready() {
            if attempt > 1 {
                tracing::debug!("Identity provider ready after {attempt} attempts");
            }
            return Ok(());
        }
        if attempt < attempts {
            tokio::time::sleep(policy.interval).await;
        }
    }

    tracing::warn!("Identity provider not ready after {attempts} attempts");
    Err(AuthError::NotReady { attempts })
}

/// Identity backed by a fixed bearer token, e.g. from the environment or a
/// keychain entry.
#[derive(Clone, Default)]
pub struct StaticTokenProvider {
    token: Option<String>,
    user: Option<AuthUser>,
}

impl StaticTokenProvider {
    pub fn new(token: Option<String>) -> Self {
        Self {
            token: normalize_text_option(token),
            user: None,
        }
    }

    #[must_use]
    pub fn with_user(mut self, user: AuthUser) -> Self {
        self.user = Some(user);
        self
    }
}

impl fmt::Debug for StaticTokenProvider {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("StaticTokenProvider")
            .field("token", &self.token.as_ref().map(|_| "[REDACTED]"))
            .field("user", &self.user)
            .finish()
    }
}

impl IdentityProvider for StaticTokenProvider {
    async fn is_authenticated(&self) -> bool {
        self.token.is_some()
    }

    async fn get_token(&self) -> AuthResult<String> {
        self.token.clone().ok_or(AuthError::NotAuthenticated)
    }

    async fn get_user(&self) -> AuthResult<Option<AuthUser>> {
        if self.token.is_none() {
            return Ok(None);
        }
        Ok(self.user.clone())
    }
}

mod duration_millis {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(u64::try_from(value.as_millis()).unwrap_or(u64::MAX))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}
