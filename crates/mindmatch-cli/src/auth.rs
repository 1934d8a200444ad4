//! Access token storage with secure keychain persistence.

#[cfg(test)]
use std::collections::HashMap;
#[cfg(test)]
use std::sync::{Mutex, OnceLock};

#[cfg(not(test))]
use keyring::Entry;

use mindmatch_core::auth::{AuthError, AuthResult, StaticTokenProvider};
use mindmatch_core::util::normalize_text_option;

pub const ENV_ACCESS_TOKEN: &str = "MINDMATCH_ACCESS_TOKEN";

#[cfg(not(test))]
const KEYRING_SERVICE_NAME: &str = "mindmatch-cli";
const KEYRING_USERNAME: &str = "access_token";

/// Where the active token was found
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenSource {
    Environment,
    Keychain,
}

impl TokenSource {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Environment => ENV_ACCESS_TOKEN,
            Self::Keychain => "system keychain",
        }
    }
}

#[derive(Clone)]
pub struct TokenStore {
    username: String,
}

impl Default for TokenStore {
    fn default() -> Self {
        Self::new(KEYRING_USERNAME)
    }
}

impl TokenStore {
    pub fn new(username: impl Into<String>) -> Self {
        Self {
            username: username.into(),
        }
    }

    #[cfg(test)]
    fn test_store() -> &'static Mutex<HashMap<String, String>> {
        static STORE: OnceLock<Mutex<HashMap<String, String>>> = OnceLock::new();
        STORE.get_or_init(|| Mutex::new(HashMap::new()))
    }

    #[cfg(not(test))]
    fn entry(&self) -> AuthResult<Entry> {
        Entry::new(KEYRING_SERVICE_NAME, &self.username)
            .map_err(|error| AuthError::SecureStorage(error.to_string()))
    }

    #[cfg(not(test))]
    pub fn load(&self) -> AuthResult<Option<String>> {
        match self.entry()?.get_password() {
            Ok(token) => Ok(normalize_text_option(Some(token))),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(error) => Err(AuthError::SecureStorage(error.to_string())),
        }
    }

    #[cfg(test)]
    pub fn load(&self) -> AuthResult<Option<String>> {
        let guard = Self::test_store()
            .lock()
            .map_err(|error| AuthError::SecureStorage(error.to_string()))?;
        Ok(normalize_text_option(guard.get(&self.username).cloned()))
    }

    #[cfg(not(test))]
    pub fn save(&self, token: &str) -> AuthResult<()> {
        self.entry()?
            .set_password(token)
            .map_err(|error| AuthError::SecureStorage(error.to_string()))
    }

    #[cfg(test)]
    pub fn save(&self, token: &str) -> AuthResult<()> {
        let mut guard = Self::test_store()
            .lock()
            .map_err(|error| AuthError::SecureStorage(error.to_string()))?;
        guard.insert(self.username.clone(), token.to_string());
        Ok(())
    }

    #[cfg(not(test))]
    pub fn clear(&self) -> AuthResult<()> {
        match self.entry()?.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(error) => Err(AuthError::SecureStorage(error.to_string())),
        }
    }

    #[cfg(test)]
    pub fn clear(&self) -> AuthResult<()> {
        let mut guard = Self::test_store()
            .lock()
            .map_err(|error| AuthError::SecureStorage(error.to_string()))?;
        guard.remove(&self.username);
        Ok(())
    }

    /// Resolve the token, preferring the environment over the keychain.
    pub fn resolve<F>(&self, lookup: F) -> AuthResult<Option<(String, TokenSource)>>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(token) = normalize_text_option(lookup(ENV_ACCESS_TOKEN)) {
            return Ok(Some((token, TokenSource::Environment)));
        }
        Ok(self.load()?.map(|token| (token, TokenSource::Keychain)))
    }

    /// Identity for the remote client. A keychain failure degrades to
    /// signed out so local writes keep working.
    pub fn identity(&self) -> StaticTokenProvider {
        match self.resolve(|key| std::env::var(key).ok()) {
            Ok(token) => StaticTokenProvider::new(token.map(|(token, _)| token)),
            Err(error) => {
                tracing::warn!("Could not read stored access token: {error}");
                StaticTokenProvider::new(None)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn save_load_and_clear_round_trip() {
        let store = TokenStore::new("round_trip");
        assert_eq!(store.load().unwrap(), None);

        store.save("tok-123").unwrap();
        assert_eq!(store.load().unwrap().as_deref(), Some("tok-123"));

        store.clear().unwrap();
        assert_eq!(store.load().unwrap(), None);
        store.clear().unwrap();
    }

    #[test]
    fn environment_token_wins_over_keychain() {
        let store = TokenStore::new("env_precedence");
        store.save("from-keychain").unwrap();

        let resolved = store
            .resolve(|key| (key == ENV_ACCESS_TOKEN).then(|| " from-env ".to_string()))
            .unwrap();
        assert_eq!(
            resolved,
            Some(("from-env".to_string(), TokenSource::Environment))
        );

        let resolved = store.resolve(|_| Some("   ".to_string())).unwrap();
        assert_eq!(
            resolved,
            Some(("from-keychain".to_string(), TokenSource::Keychain))
        );
    }

    #[test]
    fn missing_token_resolves_to_none() {
        let store = TokenStore::new("missing");
        assert_eq!(store.resolve(|_| None).unwrap(), None);
    }
}
