//! Credential handling for Portainer calls.
//!
//! Two modes, fixed at startup: a static API key (sent as `X-API-Key`,
//! never expires) or username/password (exchanged for a JWT via
//! `POST /api/auth`, sent as `Authorization: Bearer`, renewed before the
//! estimated expiry or when a call comes back 401).

use std::sync::Arc;
use std::time::Duration as StdDuration;

use chrono::{DateTime, Duration, Utc};
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::error::{PortainerError, Result};
use crate::transport::{ApiRequest, Transport};
use crate::types::{AuthRequest, AuthResponse};

/// Portainer issues 8-hour JWTs; renew 30 minutes early.
const TOKEN_VALIDITY_SECS: i64 = 7 * 3600 + 30 * 60;
const AUTH_TIMEOUT: StdDuration = StdDuration::from_secs(10);

/// How the daemon authenticates, resolved once from config.
#[derive(Debug, Clone)]
pub enum Credential {
    ApiKey(String),
    Login { username: String, password: String },
}

/// One authentication header, ready to attach to a request.
#[derive(Debug, Clone)]
pub struct AuthHeader {
    pub name: &'static str,
    pub value: String,
}

impl AuthHeader {
    pub fn api_key(key: &str) -> Self {
        Self {
            name: "X-API-Key",
            value: key.to_string(),
        }
    }

    pub fn bearer(token: &str) -> Self {
        Self {
            name: "Authorization",
            value: format!("Bearer {token}"),
        }
    }
}

#[derive(Debug, Clone)]
struct CachedToken {
    jwt: String,
    expires_at: DateTime<Utc>,
}

/// Owns the credential and the cached session token. Held in memory only;
/// a process restart always starts unauthenticated.
pub struct Session {
    transport: Arc<dyn Transport>,
    credential: Credential,
    token: RwLock<Option<CachedToken>>,
    validity: Duration,
}

impl Session {
    pub fn new(transport: Arc<dyn Transport>, credential: Credential) -> Self {
        Self {
            transport,
            credential,
            token: RwLock::new(None),
            validity: Duration::seconds(TOKEN_VALIDITY_SECS),
        }
    }

    /// Produce a valid auth header for the next call. Static keys are
    /// returned unchanged; login mode authenticates on first use and
    /// whenever the cached token's validity window has elapsed.
    pub async fn header(&self) -> Result<AuthHeader> {
        match &self.credential {
            Credential::ApiKey(key) => Ok(AuthHeader::api_key(key)),
            Credential::Login { .. } => Ok(AuthHeader::bearer(&self.ensure_token().await?)),
        }
    }

    /// Drop the cached token so the next [`Session::header`] call
    /// re-authenticates. Called after a 401 from any endpoint.
    pub async fn invalidate(&self) {
        *self.token.write().await = None;
    }

    async fn ensure_token(&self) -> Result<String> {
        // Fast path — read lock
        {
            let token = self.token.read().await;
            if let Some(t) = token.as_ref() {
                if Utc::now() < t.expires_at {
                    return Ok(t.jwt.clone());
                }
            }
        }

        // Slow path — write lock, re-check, authenticate
        let mut token = self.token.write().await;
        if let Some(t) = token.as_ref() {
            if Utc::now() < t.expires_at {
                return Ok(t.jwt.clone());
            }
        }

        let fresh = self.authenticate().await?;
        let jwt = fresh.jwt.clone();
        *token = Some(fresh);
        Ok(jwt)
    }

    async fn authenticate(&self) -> Result<CachedToken> {
        let Credential::Login { username, password } = &self.credential else {
            return Err(PortainerError::Auth {
                status: 0,
                message: "static API key cannot be re-authenticated".to_string(),
            });
        };

        info!("authenticating with Portainer");
        let body = serde_json::to_value(AuthRequest {
            username: username.clone(),
            password: password.clone(),
        })
        .map_err(|e| PortainerError::Parse(e.to_string()))?;

        let req = ApiRequest::post("/api/auth")
            .with_body(body)
            .with_timeout(AUTH_TIMEOUT);
        let resp = self.transport.execute(req).await?;

        if !resp.is_success() {
            return Err(PortainerError::Auth {
                status: resp.status,
                message: resp.body,
            });
        }

        let auth: AuthResponse = serde_json::from_str(&resp.body)
            .map_err(|e| PortainerError::Parse(format!("invalid auth response: {e}")))?;

        debug!("Portainer session token obtained");
        Ok(CachedToken {
            jwt: auth.jwt,
            expires_at: Utc::now() + self.validity,
        })
    }
}
