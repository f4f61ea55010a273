//! HTTP match source talking to the game platform gateway.
//!
//! Login exchanges the configured credentials for a session token, which
//! is cached and reused until the gateway rejects it:
//!
//! - `POST {base}/session` with `{ "email", "password" }` → `{ "token" }`
//! - `GET {base}/players/{username}/matches` (bearer) → `{ "matches": [...] }`

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use super::{MatchSource, RawMatch};
use crate::credentials::GameCredentials;
use crate::error::{Direction, SyncError};

#[derive(Debug, Serialize)]
struct LoginRequest<'a> {
    email: &'a str,
    password: &'a str,
}

#[derive(Debug, Deserialize)]
struct LoginResponse {
    token: String,
}

#[derive(Debug, Deserialize)]
struct MatchesResponse {
    matches: Vec<RawMatch>,
}

/// [`MatchSource`] backed by the platform's HTTP gateway.
#[derive(Debug)]
pub struct HttpMatchSource {
    client: reqwest::Client,
    base_url: String,
    credentials: GameCredentials,
    session: Mutex<Option<String>>,
}

impl HttpMatchSource {
    /// Creates a source for the gateway at `base_url`.
    #[must_use]
    pub fn new(client: reqwest::Client, base_url: &str, credentials: GameCredentials) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            credentials,
            session: Mutex::new(None),
        }
    }

    async fn login(&self) -> Result<String, SyncError> {
        let response = self
            .client
            .post(format!("{}/session", self.base_url))
            .json(&LoginRequest {
                email: &self.credentials.email,
                password: &self.credentials.password,
            })
            .send()
            .await
            .map_err(|e| SyncError::from_reqwest(Direction::Fetch, &e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SyncError::from_http_status(Direction::Fetch, status.as_u16(), body));
        }
        let login: LoginResponse = response
            .json()
            .await
            .map_err(|e| SyncError::from_reqwest(Direction::Fetch, &e))?;
        tracing::info!(username = %self.credentials.username, "game platform login successful");
        Ok(login.token)
    }

    async fn token(&self) -> Result<String, SyncError> {
        let mut session = self.session.lock().await;
        if let Some(token) = session.as_ref() {
            return Ok(token.clone());
        }
        let token = self.login().await?;
        *session = Some(token.clone());
        Ok(token)
    }

    async fn get_matches(
        &self,
        username: &str,
        token: &str,
    ) -> Result<reqwest::Response, SyncError> {
        self.client
            .get(format!("{}/players/{username}/matches", self.base_url))
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| SyncError::from_reqwest(Direction::Fetch, &e))
    }
}

#[async_trait]
impl MatchSource for HttpMatchSource {
    async fn list_matches(&self, username: &str) -> Result<Vec<RawMatch>, SyncError> {
        let token = self.token().await?;
        let mut response = self.get_matches(username, &token).await?;

        // Sessions expire; log in again once before giving up.
        if response.status() == StatusCode::UNAUTHORIZED {
            tracing::debug!("game session rejected, logging in again");
            *self.session.lock().await = None;
            let token = self.token().await?;
            response = self.get_matches(username, &token).await?;
        }

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SyncError::from_http_status(Direction::Fetch, status.as_u16(), body));
        }
        let body: MatchesResponse = response
            .json()
            .await
            .map_err(|e| SyncError::from_reqwest(Direction::Fetch, &e))?;
        Ok(body.matches)
    }
}
