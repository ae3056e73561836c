//! Dashboard backend client.
//!
//! Only the session-related calls live here: `POST /login` to obtain a sealed
//! credential and authenticated reads that carry it as a bearer token.

use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use reqwest::{StatusCode, Url};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{info, warn};

use crate::error::{AppError, AppResult};
use crate::identity::{Identity, SessionResolver};

pub const DEFAULT_LOGIN_ERROR: &str = "Error al iniciar sesión. Verifica tus credenciales.";

#[derive(Debug, Serialize)]
struct LoginBody<'a> {
    dni: &'a str,
    password: &'a str,
}

#[derive(Debug, Deserialize)]
struct LoginReply {
    token: String,
}

#[derive(Debug, Default, Deserialize)]
struct ErrorReply {
    #[serde(default)]
    error: Option<String>,
}

#[derive(Clone)]
pub struct ApiClient {
    base: String,
    http: reqwest::Client,
}

impl ApiClient {
    pub fn new(base_url: &str) -> AppResult<Self> {
        Url::parse(base_url)
            .map_err(|e| AppError::config("invalid_api_url".to_string(), format!("{}: {}", base_url, e)))?;
        let http = reqwest::Client::builder().cookie_store(true).build()?;
        Ok(Self { base: base_url.trim_end_matches('/').to_string(), http })
    }

    pub fn base_url(&self) -> &str { &self.base }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base, path.trim_start_matches('/'))
    }

    async fn error_from(resp: reqwest::Response, fallback: &str) -> AppError {
        let status = resp.status().as_u16();
        let reply: ErrorReply = resp.json().await.unwrap_or_default();
        AppError::from_status(status, reply.error.unwrap_or_else(|| fallback.to_string()))
    }

    /// Exchange DNI and password for the sealed credential blob.
    pub async fn login(&self, dni: &str, password: &str) -> AppResult<String> {
        let resp = self
            .http
            .post(self.url("/login"))
            .json(&LoginBody { dni, password })
            .send()
            .await?;
        if !resp.status().is_success() {
            let err = Self::error_from(resp, DEFAULT_LOGIN_ERROR).await;
            warn!(target: "api", "api.login failed dni={} status={}", dni, err.http_status());
            return Err(err);
        }
        let reply: LoginReply = resp.json().await?;
        Ok(reply.token)
    }

    /// Log in and persist the credential through the resolver.
    pub async fn sign_in(&self, resolver: &SessionResolver, dni: &str, password: &str) -> AppResult<Identity> {
        let blob = self.login(dni, password).await?;
        let identity = resolver
            .sign_in(&blob)
            .map_err(|e| AppError::auth("invalid_credential".to_string(), e.to_string()))?;
        info!(target: "api", "api.sign_in user={} role={}", identity.id, identity.role);
        Ok(identity)
    }

    /// Headers for an authenticated call; empty when no credential is stored.
    pub fn auth_headers(&self, resolver: &SessionResolver) -> HeaderMap {
        let mut headers = HeaderMap::new();
        if let Some(blob) = resolver.stored_credential() {
            if let Ok(v) = HeaderValue::from_str(&format!("Bearer {}", blob)) {
                headers.insert(AUTHORIZATION, v);
            }
        }
        headers
    }

    /// GET a JSON resource with the stored credential. A 401 ends the session;
    /// a 403 comes back as `AppError::Forbidden` and keeps it.
    pub async fn get_json(&self, resolver: &SessionResolver, path: &str) -> AppResult<Value> {
        let resp = self
            .http
            .get(self.url(path))
            .headers(self.auth_headers(resolver))
            .send()
            .await?;
        if resp.status() == StatusCode::UNAUTHORIZED {
            info!(target: "api", "api.get path={} rejected credential; logging out", path);
            resolver.logout();
        }
        if !resp.status().is_success() {
            return Err(Self::error_from(resp, "request failed").await);
        }
        Ok(resp.json().await?)
    }

    pub async fn profile(&self, resolver: &SessionResolver) -> AppResult<Value> {
        self.get_json(resolver, "/users/profile").await
    }
}
