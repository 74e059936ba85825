//! REST client with transparent credential refresh.

use crate::session::{Credentials, Identity, SessionStore};
use crate::{Error, Result};
use gamba_types::{AuthResponse, Tokens, User};
use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use tokio::sync::Mutex;
use tracing::{debug, warn};
use url::Url;

/// Client for the GAMBA platform API.
///
/// Cheap to clone; clones share the HTTP connection pool, the session store,
/// and the refresh gate, so concurrent callers coordinate on one refresh.
#[derive(Clone)]
pub struct Client {
    pub(crate) http: reqwest::Client,
    pub base_url: Url,
    pub(crate) store: SessionStore,
    refresh_gate: std::sync::Arc<Mutex<()>>,
}

impl Client {
    /// Create a client for the API rooted at `base_url`
    /// (e.g. `http://localhost:8080/api`).
    pub fn new(base_url: &str, store: SessionStore) -> Result<Self> {
        let mut base_url = Url::parse(base_url)?;
        let scheme = base_url.scheme();
        if scheme != "http" && scheme != "https" {
            return Err(Error::InvalidScheme(scheme.to_string()));
        }
        // Joins are relative, so the root must keep its trailing slash.
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }
        Ok(Self {
            http: reqwest::Client::new(),
            base_url,
            store: store.clone(),
            refresh_gate: std::sync::Arc::new(Mutex::new(())),
        })
    }

    /// The identity claimed by the current access token, if any.
    pub fn identity(&self) -> Option<Identity> {
        self.store.current_identity()
    }

    pub fn session(&self) -> &SessionStore {
        &self.store
    }

    // ---- auth ----

    /// `POST /auth/login`: obtain and install a credential pair.
    pub async fn login(&self, username: &str, password: &str) -> Result<AuthResponse> {
        let response: AuthResponse = self
            .anonymous(
                Method::POST,
                "auth/login",
                Some(json!({ "username": username, "password": password })),
            )
            .await?;
        self.store.set(response.tokens.clone().into());
        Ok(response)
    }

    /// `POST /auth/register`: create an account and install its credentials.
    pub async fn register(&self, username: &str, password: &str) -> Result<AuthResponse> {
        let response: AuthResponse = self
            .anonymous(
                Method::POST,
                "auth/register",
                Some(json!({ "username": username, "password": password })),
            )
            .await?;
        self.store.set(response.tokens.clone().into());
        Ok(response)
    }

    /// Client-side logout: drop the session. The server keeps no connection
    /// state beyond the realtime channel, which callers close separately.
    pub fn logout(&self) {
        self.store.clear();
    }

    // ---- users ----

    /// `GET /users/me`: the current user, including balance and role.
    pub async fn me(&self) -> Result<User> {
        self.get("users/me").await
    }

    /// `GET /users/search?q=`: username substring search.
    pub async fn search_users(&self, query: &str) -> Result<Vec<User>> {
        self.get_with_query("users/search", &[("q", query)]).await
    }

    // ---- request plumbing ----

    pub(crate) async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        self.request(Method::GET, path, None, None).await
    }

    pub(crate) async fn get_with_query<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<T> {
        self.request(Method::GET, path, Some(query), None).await
    }

    pub(crate) async fn post<T: DeserializeOwned>(&self, path: &str, body: Value) -> Result<T> {
        self.request(Method::POST, path, None, Some(body)).await
    }

    pub(crate) async fn post_empty(&self, path: &str, body: Option<Value>) -> Result<()> {
        let response = self.authorized(&Method::POST, path, None, body.as_ref()).await?;
        Self::expect_success(response).await
    }

    pub(crate) async fn put<T: DeserializeOwned>(&self, path: &str, body: Value) -> Result<T> {
        self.request(Method::PUT, path, None, Some(body)).await
    }

    pub(crate) async fn delete(&self, path: &str) -> Result<()> {
        let response = self.authorized(&Method::DELETE, path, None, None).await?;
        Self::expect_success(response).await
    }

    async fn request<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        query: Option<&[(&str, &str)]>,
        body: Option<Value>,
    ) -> Result<T> {
        let response = self.authorized(&method, path, query, body.as_ref()).await?;
        Self::parse(response).await
    }

    /// Issue an authenticated request. On a 401 the credential pair is
    /// refreshed once and the request replayed once; a second 401 surfaces
    /// as a plain API error.
    async fn authorized(
        &self,
        method: &Method,
        path: &str,
        query: Option<&[(&str, &str)]>,
        body: Option<&Value>,
    ) -> Result<reqwest::Response> {
        let url = self.base_url.join(path)?;
        let mut refreshed = false;
        loop {
            let Some(token) = self.store.access_token() else {
                return Err(Error::Unauthenticated);
            };
            let mut request = self.http.request(method.clone(), url.clone()).bearer_auth(token);
            if let Some(query) = query {
                request = request.query(query);
            }
            if let Some(body) = body {
                request = request.json(body);
            }
            let response = request.send().await?;
            if response.status() == StatusCode::UNAUTHORIZED && !refreshed {
                debug!(%url, "unauthorized, attempting credential refresh");
                self.refresh_session().await?;
                refreshed = true;
                continue;
            }
            return Ok(response);
        }
    }

    /// Unauthenticated call (login, register, refresh).
    async fn anonymous<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
    ) -> Result<T> {
        let url = self.base_url.join(path)?;
        let mut request = self.http.request(method, url);
        if let Some(body) = &body {
            request = request.json(body);
        }
        Self::parse(request.send().await?).await
    }

    /// Exchange the refresh token for a new credential pair.
    ///
    /// Concurrent 401s serialize here: the gate admits one exchange at a
    /// time, and a waiter that finds the access token already rotated by the
    /// caller ahead of it skips its own exchange and replays directly. A
    /// rejected exchange tears the whole session down.
    async fn refresh_session(&self) -> Result<()> {
        let stale = self.store.access_token();
        let _gate = self.refresh_gate.lock().await;
        if self.store.access_token() != stale {
            debug!("credentials already rotated by a concurrent refresh");
            return Ok(());
        }
        let Some(refresh_token) = self.store.refresh_token() else {
            self.store.clear();
            return Err(Error::SessionExpired);
        };

        let url = self.base_url.join("auth/refresh")?;
        let response = self
            .http
            .post(url)
            .json(&json!({ "refresh_token": refresh_token }))
            .send()
            .await?;
        if !response.status().is_success() {
            // The refresh credential is no longer good; nothing recoverable
            // remains of this session.
            warn!(status = %response.status(), "refresh rejected, clearing session");
            self.store.clear();
            return Err(Error::SessionExpired);
        }
        let tokens: Tokens = response.json().await?;
        self.store.set(Credentials::from(tokens));
        debug!("credentials refreshed");
        Ok(())
    }

    async fn parse<T: DeserializeOwned>(response: reqwest::Response) -> Result<T> {
        let status = response.status();
        if status.is_success() {
            return Ok(response.json().await?);
        }
        Err(Self::api_error(status, response).await)
    }

    async fn expect_success(response: reqwest::Response) -> Result<()> {
        let status = response.status();
        if status.is_success() {
            return Ok(());
        }
        Err(Self::api_error(status, response).await)
    }

    /// Surface the server's error message verbatim where one is present,
    /// with a generic fallback otherwise.
    async fn api_error(status: StatusCode, response: reqwest::Response) -> Error {
        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<Value>(&body)
            .ok()
            .and_then(|value| {
                value
                    .get("error")
                    .or_else(|| value.get("message"))
                    .and_then(Value::as_str)
                    .map(str::to_string)
            })
            .unwrap_or_else(|| "request failed".to_string());
        Error::Api { status, message }
    }
}
