//! Authenticated REST client.
//!
//! ARCHITECTURE
//! ============
//! Every call reads the access token from the credential store at send time
//! and attaches it as a bearer header. A 401 triggers at most one
//! refresh-and-retry cycle for that call; the retry flag is local to the call,
//! so concurrent calls that all hit 401 each refresh on their own.
//!
//! ERROR HANDLING
//! ==============
//! When the refresh token is missing or the refresh call fails, the client
//! clears every stored credential and broadcasts
//! [`AuthSignal::SessionExpired`]. A missing refresh token returns the
//! original 401 to the caller; a failed refresh returns
//! [`ApiError::SessionExpired`]. The client never decides what the
//! application does next; whoever owns the session listens for the signal.

use std::sync::Arc;

use reqwest::Method;
use reqwest::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE, HeaderValue};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio::sync::broadcast;
use wire::{RefreshRequest, RefreshResponse};

use super::endpoints;
use super::error::ApiError;
use crate::config::ClientConfig;
use crate::storage::{AUTH_TOKEN_KEY, CredentialStore, REFRESH_TOKEN_KEY, clear_credentials};

const SIGNAL_CAPACITY: usize = 16;

/// Out-of-band notifications from the HTTP layer to the session owner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthSignal {
    /// Credentials were rejected and could not be refreshed; storage is cleared.
    SessionExpired,
}

enum RefreshOutcome {
    Renewed(String),
    /// No refresh token is stored.
    Unavailable,
    /// The refresh endpoint rejected the token or replied with garbage.
    Failed,
}

#[derive(Clone)]
pub struct ApiClient {
    inner: Arc<ApiClientInner>,
}

struct ApiClientInner {
    http: reqwest::Client,
    base_url: String,
    store: Arc<dyn CredentialStore>,
    signals: broadcast::Sender<AuthSignal>,
}

impl ApiClient {
    /// Build a client for `config.base_url` backed by `store`.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying HTTP client cannot be constructed.
    pub fn new(config: &ClientConfig, store: Arc<dyn CredentialStore>) -> Result<Self, ApiError> {
        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .connect_timeout(config.connect_timeout)
            .default_headers(headers)
            .build()?;
        let (signals, _) = broadcast::channel(SIGNAL_CAPACITY);
        Ok(Self {
            inner: Arc::new(ApiClientInner {
                http,
                base_url: config.base_url.trim_end_matches('/').to_owned(),
                store,
                signals,
            }),
        })
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.inner.base_url
    }

    #[must_use]
    pub fn store(&self) -> &Arc<dyn CredentialStore> {
        &self.inner.store
    }

    /// Receive [`AuthSignal`]s raised after this call.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<AuthSignal> {
        self.inner.signals.subscribe()
    }

    /// `GET path`.
    ///
    /// # Errors
    ///
    /// See [`ApiClient::request`].
    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        self.request::<T, ()>(Method::GET, path, None).await
    }

    /// `POST path` with a JSON body.
    ///
    /// # Errors
    ///
    /// See [`ApiClient::request`].
    pub async fn post<T, B>(&self, path: &str, body: &B) -> Result<T, ApiError>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        self.request(Method::POST, path, Some(body)).await
    }

    /// `PUT path` with a JSON body.
    ///
    /// # Errors
    ///
    /// See [`ApiClient::request`].
    pub async fn put<T, B>(&self, path: &str, body: &B) -> Result<T, ApiError>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        self.request(Method::PUT, path, Some(body)).await
    }

    /// `PATCH path` with a JSON body.
    ///
    /// # Errors
    ///
    /// See [`ApiClient::request`].
    pub async fn patch<T, B>(&self, path: &str, body: &B) -> Result<T, ApiError>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        self.request(Method::PATCH, path, Some(body)).await
    }

    /// `DELETE path`.
    ///
    /// # Errors
    ///
    /// See [`ApiClient::request`].
    pub async fn delete<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        self.request::<T, ()>(Method::DELETE, path, None).await
    }

    /// Issue one logical request, refreshing the access token at most once.
    ///
    /// # Errors
    ///
    /// - [`ApiError::Transport`] when no response was received.
    /// - [`ApiError::Status`] for non-2xx replies, including a 401 on the retried request.
    /// - [`ApiError::SessionExpired`] when a 401 could not be recovered.
    /// - [`ApiError::InvalidResponse`] when a 2xx body does not decode as `T`.
    pub async fn request<T, B>(&self, method: Method, path: &str, body: Option<&B>) -> Result<T, ApiError>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let mut retried = false;
        let mut fresh_token: Option<String> = None;
        loop {
            let token = match fresh_token.take() {
                Some(token) => Some(token),
                None => self.inner.store.get(AUTH_TOKEN_KEY)?,
            };
            tracing::debug!(%method, path, retried, "api request");
            let (status, text) = self.send(method.clone(), path, body, token.as_deref()).await?;

            if status == 401 && !retried {
                retried = true;
                match self.refresh_access_token().await {
                    RefreshOutcome::Renewed(token) => {
                        fresh_token = Some(token);
                        continue;
                    }
                    // Nothing to refresh with: the caller sees the original rejection.
                    RefreshOutcome::Unavailable => {
                        self.sign_out();
                        return Err(ApiError::from_status(status, &text));
                    }
                    RefreshOutcome::Failed => return Err(self.sign_out()),
                }
            }
            if !(200..300).contains(&status) {
                tracing::debug!(%method, path, status, "api request failed");
                return Err(ApiError::from_status(status, &text));
            }
            return decode_body(&text);
        }
    }

    async fn send<B>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
        token: Option<&str>,
    ) -> Result<(u16, String), ApiError>
    where
        B: Serialize + ?Sized,
    {
        let mut builder = self.inner.http.request(method, self.url(path));
        if let Some(token) = token {
            builder = builder.header(AUTHORIZATION, format!("Bearer {token}"));
        }
        if let Some(body) = body {
            builder = builder.header(CONTENT_TYPE, "application/json").json(body);
        }
        let response = builder.send().await?;
        let status = response.status().as_u16();
        let text = response.text().await?;
        Ok((status, text))
    }

    /// Exchange the stored refresh token for a new access token and store it.
    async fn refresh_access_token(&self) -> RefreshOutcome {
        let refresh_token = match self.inner.store.get(REFRESH_TOKEN_KEY) {
            Ok(Some(token)) if !token.is_empty() => token,
            Ok(_) => {
                tracing::warn!("access token rejected and no refresh token stored");
                return RefreshOutcome::Unavailable;
            }
            Err(e) => {
                tracing::warn!(error = %e, "refresh token unreadable");
                return RefreshOutcome::Unavailable;
            }
        };

        match self.call_refresh(&refresh_token).await {
            Ok(access_token) => {
                if let Err(e) = self.inner.store.set(AUTH_TOKEN_KEY, &access_token) {
                    // The retry still carries the new token; later calls will refresh again.
                    tracing::warn!(error = %e, "refreshed access token could not be stored");
                }
                tracing::debug!("access token refreshed");
                RefreshOutcome::Renewed(access_token)
            }
            Err(e) => {
                tracing::warn!(error = %e, "token refresh failed");
                RefreshOutcome::Failed
            }
        }
    }

    async fn call_refresh(&self, refresh_token: &str) -> Result<String, ApiError> {
        let body = RefreshRequest { refresh_token: refresh_token.to_owned() };
        let (status, text) = self.send(Method::POST, endpoints::AUTH_REFRESH, Some(&body), None).await?;
        if !(200..300).contains(&status) {
            return Err(ApiError::from_status(status, &text));
        }
        let parsed: RefreshResponse = decode_body(&text)?;
        if parsed.access_token.is_empty() {
            return Err(ApiError::InvalidResponse("refresh returned an empty access token".to_owned()));
        }
        Ok(parsed.access_token)
    }

    fn sign_out(&self) -> ApiError {
        if let Err(e) = clear_credentials(self.inner.store.as_ref()) {
            tracing::warn!(error = %e, "credential cleanup incomplete after sign-out");
        }
        // No receivers simply means nobody is tracking the session.
        let _ = self.inner.signals.send(AuthSignal::SessionExpired);
        ApiError::SessionExpired
    }

    fn url(&self, path: &str) -> String {
        if path.starts_with('/') {
            format!("{}{path}", self.inner.base_url)
        } else {
            format!("{}/{path}", self.inner.base_url)
        }
    }
}

/// Decode a 2xx body. An empty body decodes as JSON `null` so `()` and
/// `Option<T>` responses work for endpoints that reply with no content.
fn decode_body<T: DeserializeOwned>(text: &str) -> Result<T, ApiError> {
    let result = if text.trim().is_empty() {
        serde_json::from_value(serde_json::Value::Null)
    } else {
        serde_json::from_str(text)
    };
    result.map_err(|e| ApiError::InvalidResponse(e.to_string()))
}

#[cfg(test)]
#[path = "api_test.rs"]
mod api_test;
