//! Auth session shared by every request of one catalog client

use crate::config::CatalogConfig;
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::future::Future;
use tokio::sync::Mutex;

/// Access/refresh token pair as returned by the token endpoint
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenPair {
    /// Bearer token attached to catalog requests
    pub access_token: String,
    /// Token used to obtain a new access token
    #[serde(default)]
    pub refresh_token: Option<String>,
    /// Lifetime of the access token in seconds
    #[serde(default)]
    pub expires_in: Option<u64>,
}

/// Token to send with one request, tagged with the session generation it
/// was read from.
#[derive(Clone, Debug)]
pub(crate) struct Credentials {
    pub access_token: Option<String>,
    pub generation: u64,
}

#[derive(Debug)]
struct SessionState {
    token_pair: Option<TokenPair>,
    invalidated: bool,
    // bumped on every successful refresh
    generation: u64,
}

/// Current token pair plus invalidation flag.
///
/// All reads and writes go through one async mutex, and a refresh runs while
/// holding it, so at most one refresh is in flight per session and every
/// request queued behind it reads the refreshed token.
#[derive(Debug)]
pub struct AuthSession {
    state: Mutex<SessionState>,
}

impl AuthSession {
    /// Create a session from an optional pre-provisioned token pair
    pub fn new(token_pair: Option<TokenPair>) -> Self {
        Self::with_state(token_pair, false)
    }

    fn with_state(token_pair: Option<TokenPair>, invalidated: bool) -> Self {
        Self {
            state: Mutex::new(SessionState {
                token_pair,
                invalidated,
                generation: 0,
            }),
        }
    }

    /// Build a session from the catalog configuration.
    ///
    /// A refresh token without an access token yields an already invalidated
    /// session, so the first request refreshes before it is sent.
    pub fn from_config(config: &CatalogConfig) -> Self {
        match (&config.access_token, &config.refresh_token) {
            (Some(access), refresh) => Self::new(Some(TokenPair {
                access_token: access.clone(),
                refresh_token: refresh.clone(),
                expires_in: None,
            })),
            (None, Some(refresh)) => Self::with_state(
                Some(TokenPair {
                    access_token: String::new(),
                    refresh_token: Some(refresh.clone()),
                    expires_in: None,
                }),
                true,
            ),
            (None, None) => Self::new(None),
        }
    }

    /// Whether the last request was rejected and no refresh has succeeded since
    pub async fn is_invalidated(&self) -> bool {
        self.state.lock().await.invalidated
    }

    /// Current access token, if any
    pub async fn access_token(&self) -> Option<String> {
        self.state
            .lock()
            .await
            .token_pair
            .as_ref()
            .map(|pair| pair.access_token.clone())
    }

    /// Number of successful refreshes so far
    pub async fn generation(&self) -> u64 {
        self.state.lock().await.generation
    }

    /// Mark the session invalid after an unauthorized response.
    ///
    /// Only takes effect if no refresh happened since the rejected request
    /// read its token; otherwise the caller simply retries with the newer
    /// token. Returns whether the flag was set by this call.
    pub async fn invalidate(&self, observed_generation: u64) -> bool {
        let mut state = self.state.lock().await;
        if state.generation != observed_generation || state.invalidated {
            return false;
        }
        state.invalidated = true;
        tracing::debug!(generation = state.generation, "auth session invalidated");
        true
    }

    /// Return the credentials to send, refreshing first when invalidated.
    ///
    /// `refresh` receives the current refresh token and is awaited under the
    /// session lock.
    pub(crate) async fn check<F, Fut>(&self, refresh: F) -> Result<Credentials>
    where
        F: FnOnce(String) -> Fut,
        Fut: Future<Output = Result<TokenPair>>,
    {
        let mut state = self.state.lock().await;

        if state.invalidated {
            let refresh_token = state
                .token_pair
                .as_ref()
                .and_then(|pair| pair.refresh_token.clone())
                .ok_or_else(|| Error::Auth {
                    status: 401,
                    message: "session rejected and no refresh token is available".to_string(),
                })?;

            let mut refreshed = refresh(refresh_token.clone()).await?;
            if refreshed.refresh_token.is_none() {
                refreshed.refresh_token = Some(refresh_token);
            }

            state.token_pair = Some(refreshed);
            state.invalidated = false;
            state.generation += 1;
            tracing::info!(generation = state.generation, "catalog access token refreshed");
        }

        Ok(Credentials {
            access_token: state
                .token_pair
                .as_ref()
                .map(|pair| pair.access_token.clone()),
            generation: state.generation,
        })
    }
}
