use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::Result;
use crate::session::AuthHeader;

/// Default per-request timeout; individual calls override it.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
}

/// One outbound API call, described independently of the HTTP library so
/// tests can execute requests against a scripted fake.
#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub method: Method,
    /// Path + query relative to the Portainer base URL, e.g. `/api/auth`.
    pub path: String,
    pub auth: Option<AuthHeader>,
    pub body: Option<Value>,
    pub timeout: Duration,
}

impl ApiRequest {
    pub fn get(path: impl Into<String>) -> Self {
        Self {
            method: Method::Get,
            path: path.into(),
            auth: None,
            body: None,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self {
            method: Method::Post,
            ..Self::get(path)
        }
    }

    pub fn with_auth(mut self, auth: AuthHeader) -> Self {
        self.auth = Some(auth);
        self
    }

    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Status and raw body of a completed call. Interpretation (success,
/// 401 handling, JSON decoding) is the caller's job.
#[derive(Debug, Clone)]
pub struct ApiResponse {
    pub status: u16,
    pub body: String,
}

impl ApiResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Executes API requests. The real implementation is [`HttpTransport`];
/// tests substitute a fake with canned responses.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn execute(&self, req: ApiRequest) -> Result<ApiResponse>;
}

/// reqwest-backed transport.
pub struct HttpTransport {
    client: reqwest::Client,
    base_url: String,
}

impl HttpTransport {
    pub fn new(base_url: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn execute(&self, req: ApiRequest) -> Result<ApiResponse> {
        let url = format!("{}{}", self.base_url, req.path);
        let mut builder = match req.method {
            Method::Get => self.client.get(&url),
            Method::Post => self.client.post(&url),
        };
        builder = builder.timeout(req.timeout);
        if let Some(auth) = &req.auth {
            builder = builder.header(auth.name, &auth.value);
        }
        if let Some(body) = &req.body {
            builder = builder.json(body);
        }

        let resp = builder.send().await?;
        let status = resp.status().as_u16();
        let body = resp.text().await.unwrap_or_default();
        Ok(ApiResponse { status, body })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_builders_set_fields() {
        let req = ApiRequest::post("/api/auth")
            .with_body(serde_json::json!({"username": "admin"}))
            .with_timeout(Duration::from_secs(30));
        assert_eq!(req.method, Method::Post);
        assert_eq!(req.path, "/api/auth");
        assert!(req.body.is_some());
        assert_eq!(req.timeout, Duration::from_secs(30));
    }

    #[test]
    fn success_covers_2xx_only() {
        let mut resp = ApiResponse {
            status: 204,
            body: String::new(),
        };
        assert!(resp.is_success());
        resp.status = 304;
        assert!(!resp.is_success());
        resp.status = 199;
        assert!(!resp.is_success());
    }

    #[test]
    fn base_url_trailing_slash_is_stripped() {
        let transport = HttpTransport::new("https://portainer.local/");
        assert_eq!(transport.base_url, "https://portainer.local");
    }
}
