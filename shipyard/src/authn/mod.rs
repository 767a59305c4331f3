//! API authentication
//!
//! A request is authenticated by the shared API key or by a session token
//! issued by the dashboard. Sessions live in the shared store under
//! `session:<token>`; this service only checks that the marker exists.

use std::sync::Arc;

use axum::http::{header, HeaderMap};
use secrecy::{ExposeSecret, SecretString};
use tracing::{debug, warn};

use crate::errors::ShipyardError;
use crate::http::client::API_KEY_HEADER;
use crate::store::{keys, Store};
use crate::utils::constant_time_eq;

/// Name of the session cookie
pub const SESSION_COOKIE: &str = "session";

/// Checks API credentials
#[derive(Clone)]
pub struct Authenticator {
    store: Arc<dyn Store>,
    api_key: Option<SecretString>,
}

impl Authenticator {
    /// An empty key counts as no key, so an empty header can never match
    pub fn new(store: Arc<dyn Store>, api_key: Option<SecretString>) -> Self {
        let api_key = api_key.filter(|key| !key.expose_secret().is_empty());
        Self { store, api_key }
    }

    /// Accept the request if it carries a valid key or a live session
    pub async fn authenticate(&self, headers: &HeaderMap) -> Result<(), ShipyardError> {
        if let Some(presented) = headers.get(API_KEY_HEADER) {
            return match &self.api_key {
                Some(key)
                    if constant_time_eq(
                        presented.as_bytes(),
                        key.expose_secret().as_bytes(),
                    ) =>
                {
                    Ok(())
                }
                _ => {
                    warn!("Rejected request with invalid API key");
                    Err(ShipyardError::Unauthorized)
                }
            };
        }

        let Some(token) = session_token(headers) else {
            debug!("Request carries no credentials");
            return Err(ShipyardError::Unauthorized);
        };

        match self.store.value_get(&keys::session(&token)).await? {
            Some(_) => Ok(()),
            None => {
                warn!("Rejected request with unknown session");
                Err(ShipyardError::Unauthorized)
            }
        }
    }
}

/// Session token from `Authorization: Bearer` or the session cookie
fn session_token(headers: &HeaderMap) -> Option<String> {
    let bearer = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty());
    if let Some(token) = bearer {
        return Some(token.to_string());
    }

    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == SESSION_COOKIE)
        .map(|(_, value)| value.trim().to_string())
        .filter(|t| !t.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use axum::http::HeaderValue;

    fn authenticator() -> (Authenticator, MemoryStore) {
        let store = MemoryStore::new();
        store.insert_value("session:abc", "1");
        let auth = Authenticator::new(
            Arc::new(store.clone()),
            Some(SecretString::from("key-123".to_string())),
        );
        (auth, store)
    }

    fn headers(name: header::HeaderName, value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(name, HeaderValue::from_str(value).unwrap());
        headers
    }

    #[tokio::test]
    async fn test_api_key() {
        let (auth, _) = authenticator();
        let key = header::HeaderName::from_static(API_KEY_HEADER);
        assert!(auth.authenticate(&headers(key.clone(), "key-123")).await.is_ok());
        assert!(auth.authenticate(&headers(key, "key-124")).await.is_err());
    }

    #[tokio::test]
    async fn test_session_token_sources() {
        let (auth, _) = authenticator();
        assert!(auth
            .authenticate(&headers(header::AUTHORIZATION, "Bearer abc"))
            .await
            .is_ok());
        assert!(auth
            .authenticate(&headers(header::COOKIE, "theme=dark; session=abc"))
            .await
            .is_ok());
        assert!(auth
            .authenticate(&headers(header::COOKIE, "session=nope"))
            .await
            .is_err());
        assert!(auth.authenticate(&HeaderMap::new()).await.is_err());
    }

    #[tokio::test]
    async fn test_no_configured_key_rejects_key_header() {
        let auth = Authenticator::new(Arc::new(MemoryStore::new()), None);
        let key = header::HeaderName::from_static(API_KEY_HEADER);
        assert!(auth.authenticate(&headers(key, "")).await.is_err());
    }

    #[tokio::test]
    async fn test_empty_configured_key_rejects_empty_header() {
        let auth = Authenticator::new(
            Arc::new(MemoryStore::new()),
            Some(SecretString::from(String::new())),
        );
        let key = header::HeaderName::from_static(API_KEY_HEADER);
        assert!(auth.authenticate(&headers(key, "")).await.is_err());
    }
}
