//! Authenticated catalog API client

use super::TrackResolver;
use super::auth::{AuthSession, TokenPair};
use crate::config::CatalogConfig;
use crate::error::{DownloadError, Error, Result};
use crate::types::{DownloadInfo, Store};
use reqwest::header::{self, HeaderMap, HeaderValue};
use reqwest::{Method, StatusCode};

/// Token endpoint; never retried on 401
pub const TOKEN_ENDPOINT: &str = "/auth/o/token/";
/// Authorization endpoint; never retried on 401
pub const AUTH_ENDPOINT: &str = "/auth/o/authorize/";
/// Login endpoint; never retried on 401
pub const LOGIN_ENDPOINT: &str = "/auth/login/";

const BROWSER_ACCEPT: &str = "text/html,application/xhtml+xml,application/xml;q=0.9,image/avif,image/webp,image/apng,*/*;q=0.8,application/signed-exchange;v=b3;q=0.7";
const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/123.0.0.0 Safari/537.36";

/// Request body encoding
#[derive(Clone, Debug)]
pub enum Payload {
    /// `application/json`
    Json(serde_json::Value),
    /// `application/x-www-form-urlencoded`
    Form(Vec<(String, String)>),
}

fn is_auth_endpoint(endpoint: &str) -> bool {
    endpoint == TOKEN_ENDPOINT || endpoint == AUTH_ENDPOINT || endpoint == LOGIN_ENDPOINT
}

fn browser_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(header::ACCEPT, HeaderValue::from_static(BROWSER_ACCEPT));
    headers.insert(
        header::ACCEPT_LANGUAGE,
        HeaderValue::from_static("en-US,en;q=0.9"),
    );
    headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("max-age=0"));
    headers.insert(
        header::USER_AGENT,
        HeaderValue::from_static(BROWSER_USER_AGENT),
    );
    headers
}

fn encode(component: &str) -> String {
    url::form_urlencoded::byte_serialize(component.as_bytes()).collect()
}

/// Turn a non-success response into [`Error::Upstream`]
async fn upstream_error(response: reqwest::Response) -> Error {
    let code = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();
    let mut message = format!("request failed with status code: {}", code);
    if !body.is_empty() {
        message.push_str(&format!(", response body: {}", body));
    }
    Error::Upstream { code, message }
}

/// Client for the catalog API.
///
/// Redirects are never followed: a `302` is a successful answer whose
/// `Location` the caller consumes.
pub struct CatalogClient {
    http: reqwest::Client,
    beatport_base_url: String,
    beatsource_base_url: String,
    client_id: Option<String>,
    auth: AuthSession,
}

impl CatalogClient {
    /// Build a client from the catalog configuration.
    ///
    /// `pool_size` bounds idle connections kept per host.
    pub fn new(config: &CatalogConfig, pool_size: usize) -> Result<Self> {
        let mut builder = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .redirect(reqwest::redirect::Policy::none())
            .default_headers(browser_headers())
            .pool_max_idle_per_host(pool_size);

        if let Some(proxy_url) = config.proxy_url.as_deref().filter(|p| !p.is_empty()) {
            let proxy = reqwest::Proxy::all(proxy_url).map_err(|e| Error::Config {
                message: format!("invalid proxy URL '{}': {}", proxy_url, e),
                key: Some("catalog.proxy_url".to_string()),
            })?;
            builder = builder.proxy(proxy);
        }

        Ok(Self {
            http: builder.build()?,
            beatport_base_url: config.beatport_base_url.trim_end_matches('/').to_string(),
            beatsource_base_url: config.beatsource_base_url.trim_end_matches('/').to_string(),
            client_id: config.client_id.clone(),
            auth: AuthSession::from_config(config),
        })
    }

    /// The session this client authenticates with
    pub fn auth(&self) -> &AuthSession {
        &self.auth
    }

    fn base_url(&self, store: Store) -> &str {
        match store {
            Store::Beatport => &self.beatport_base_url,
            Store::Beatsource => &self.beatsource_base_url,
        }
    }

    /// Send a single request without any auth handling
    async fn send(
        &self,
        store: Store,
        method: Method,
        endpoint: &str,
        payload: Option<&Payload>,
        bearer: Option<&str>,
    ) -> Result<reqwest::Response> {
        let url = format!("{}{}", self.base_url(store), endpoint);
        let mut request = self.http.request(method, &url);

        match payload {
            Some(Payload::Json(body)) => request = request.json(body),
            Some(Payload::Form(fields)) => request = request.form(fields),
            None => {}
        }
        if let Some(token) = bearer.filter(|t| !t.is_empty()) {
            request = request.bearer_auth(token);
        }

        Ok(request.send().await?)
    }

    /// Exchange a refresh token for a new token pair
    async fn refresh_tokens(&self, store: Store, refresh_token: String) -> Result<TokenPair> {
        let mut form = vec![
            ("grant_type".to_string(), "refresh_token".to_string()),
            ("refresh_token".to_string(), refresh_token),
        ];
        if let Some(client_id) = &self.client_id {
            form.push(("client_id".to_string(), client_id.clone()));
        }

        let response = self
            .send(
                store,
                Method::POST,
                TOKEN_ENDPOINT,
                Some(&Payload::Form(form)),
                None,
            )
            .await?;

        if !response.status().is_success() {
            let (status, message) = match upstream_error(response).await {
                Error::Upstream { code, message } => (code, message),
                other => (401, other.to_string()),
            };
            return Err(Error::Auth {
                status,
                message: format!("token refresh failed: {}", message),
            });
        }

        Ok(response.json::<TokenPair>().await?)
    }

    /// Perform one authenticated request.
    ///
    /// `200` and `302` are success. A `401` on a non-auth endpoint
    /// invalidates the session and retries exactly once after the refresh; a
    /// second `401` is returned as [`Error::Auth`]. Any other status becomes
    /// [`Error::Upstream`].
    pub async fn fetch(
        &self,
        store: Store,
        method: Method,
        endpoint: &str,
        payload: Option<Payload>,
    ) -> Result<reqwest::Response> {
        let authenticated = !is_auth_endpoint(endpoint);
        let mut retried = false;

        loop {
            let credentials = if authenticated {
                Some(
                    self.auth
                        .check(|refresh_token| self.refresh_tokens(store, refresh_token))
                        .await?,
                )
            } else {
                None
            };
            let bearer = credentials
                .as_ref()
                .and_then(|c| c.access_token.as_deref());

            let response = self
                .send(store, method.clone(), endpoint, payload.as_ref(), bearer)
                .await?;
            let status = response.status();

            if status == StatusCode::OK || status == StatusCode::FOUND {
                return Ok(response);
            }

            if status == StatusCode::UNAUTHORIZED
                && let Some(credentials) = &credentials
            {
                if retried {
                    let message = match upstream_error(response).await {
                        Error::Upstream { message, .. } => message,
                        other => other.to_string(),
                    };
                    return Err(Error::Auth {
                        status: status.as_u16(),
                        message: format!("rejected after token refresh: {}", message),
                    });
                }

                tracing::debug!(endpoint, "catalog rejected token, refreshing and retrying once");
                self.auth.invalidate(credentials.generation).await;
                retried = true;
                continue;
            }

            return Err(upstream_error(response).await);
        }
    }
}

#[async_trait::async_trait]
impl TrackResolver for CatalogClient {
    async fn resolve(&self, store: Store, track_id: &str, quality: &str) -> Result<DownloadInfo> {
        let endpoint = format!(
            "/catalog/tracks/{}/download/?quality={}",
            encode(track_id),
            encode(quality)
        );
        let response = self.fetch(store, Method::GET, &endpoint, None).await?;

        let info = if response.status() == StatusCode::FOUND {
            let location = response
                .headers()
                .get(header::LOCATION)
                .and_then(|value| value.to_str().ok())
                .unwrap_or_default()
                .to_string();
            DownloadInfo {
                location,
                content_length: None,
            }
        } else {
            response.json::<DownloadInfo>().await?
        };

        if info.location.trim().is_empty() {
            return Err(DownloadError::EmptyLocation {
                track_id: track_id.to_string(),
            }
            .into());
        }

        tracing::debug!(track_id, store = %store, "track resolved");
        Ok(info)
    }
}
