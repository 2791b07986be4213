use std::sync::Arc;
use std::time::Duration;

use tracing::debug;

use crate::error::{PortainerError, Result};
use crate::session::{AuthHeader, Session};
use crate::transport::{ApiRequest, ApiResponse, Transport};
use crate::types::ContainerSummary;

const LIST_TIMEOUT: Duration = Duration::from_secs(10);
// Docker waits for the container to stop before starting it again, so the
// restart call is allowed to run much longer than a plain GET.
const RESTART_TIMEOUT: Duration = Duration::from_secs(30);

/// Shortest container-ID prefix accepted when resolving by ID.
const MIN_ID_PREFIX_LEN: usize = 12;

/// Client for the three Portainer operations nightshift uses. The endpoint
/// ID selects which managed Docker environment the calls target.
pub struct PortainerClient {
    transport: Arc<dyn Transport>,
    session: Session,
    endpoint_id: String,
}

impl PortainerClient {
    pub fn new(transport: Arc<dyn Transport>, session: Session, endpoint_id: String) -> Self {
        Self {
            transport,
            session,
            endpoint_id,
        }
    }

    /// List every container visible at the endpoint, including stopped ones.
    pub async fn list_containers(&self) -> Result<Vec<ContainerSummary>> {
        let path = format!(
            "/api/endpoints/{}/docker/containers/json?all=true",
            self.endpoint_id
        );
        let resp = self
            .send_authed(|auth| {
                ApiRequest::get(path.as_str())
                    .with_auth(auth)
                    .with_timeout(LIST_TIMEOUT)
            })
            .await?;

        if !resp.is_success() {
            return Err(PortainerError::Api {
                status: resp.status,
                message: resp.body,
            });
        }
        serde_json::from_str(&resp.body)
            .map_err(|e| PortainerError::Parse(format!("invalid container list: {e}")))
    }

    /// Map an operator-supplied name or ID prefix to the canonical container
    /// ID. Declared names are matched first, with and without the leading
    /// `/` Docker puts on them; then the value is tried as a hex ID prefix.
    pub async fn resolve(&self, name: &str) -> Result<String> {
        let containers = self.list_containers().await?;
        let slashed = format!("/{name}");

        for container in &containers {
            if container.names.iter().any(|n| n == name || n == &slashed) {
                debug!(container = %name, id = %container.id, "resolved by name");
                return Ok(container.id.clone());
            }
        }

        if name.len() >= MIN_ID_PREFIX_LEN && name.chars().all(|c| c.is_ascii_hexdigit()) {
            if let Some(container) = containers.iter().find(|c| c.id.starts_with(name)) {
                debug!(container = %name, id = %container.id, "resolved by ID prefix");
                return Ok(container.id.clone());
            }
        }

        Err(PortainerError::ContainerNotFound {
            name: name.to_string(),
        })
    }

    /// Restart the container with the given canonical ID.
    pub async fn restart(&self, container_id: &str) -> Result<()> {
        let path = format!(
            "/api/endpoints/{}/docker/containers/{}/restart",
            self.endpoint_id, container_id
        );
        let resp = self
            .send_authed(|auth| {
                ApiRequest::post(path.as_str())
                    .with_auth(auth)
                    .with_timeout(RESTART_TIMEOUT)
            })
            .await?;

        // The container can disappear between resolve and restart; report
        // that distinctly instead of folding it into a generic API error.
        if resp.status == 404 {
            return Err(PortainerError::ContainerNotFound {
                name: container_id.to_string(),
            });
        }
        if !resp.is_success() {
            return Err(PortainerError::Api {
                status: resp.status,
                message: resp.body,
            });
        }
        Ok(())
    }

    /// Send an authenticated request. On 401 the session is invalidated and
    /// the same call retried exactly once with a fresh credential; a second
    /// 401 propagates.
    async fn send_authed<F>(&self, build: F) -> Result<ApiResponse>
    where
        F: Fn(AuthHeader) -> ApiRequest,
    {
        let auth = self.session.header().await?;
        let resp = self.transport.execute(build(auth)).await?;
        if resp.status != 401 {
            return Ok(resp);
        }

        debug!("Portainer returned 401, refreshing session and retrying once");
        self.session.invalidate().await;
        let auth = self.session.header().await?;
        let resp = self.transport.execute(build(auth)).await?;
        if resp.status == 401 {
            return Err(PortainerError::Auth {
                status: 401,
                message: "still unauthorized after session refresh".to_string(),
            });
        }
        Ok(resp)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::Mutex;

    use async_trait::async_trait;

    use super::*;
    use crate::session::Credential;

    struct FakeTransport {
        responses: Mutex<VecDeque<ApiResponse>>,
        requests: Mutex<Vec<ApiRequest>>,
    }

    impl FakeTransport {
        fn new(responses: Vec<ApiResponse>) -> Arc<Self> {
            Arc::new(Self {
                responses: Mutex::new(responses.into()),
                requests: Mutex::new(Vec::new()),
            })
        }

        fn requests(&self) -> Vec<ApiRequest> {
            self.requests.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Transport for FakeTransport {
        async fn execute(&self, req: ApiRequest) -> Result<ApiResponse> {
            self.requests.lock().unwrap().push(req);
            Ok(self
                .responses
                .lock()
                .unwrap()
                .pop_front()
                .expect("unexpected extra request"))
        }
    }

    const NGINX_ID: &str = "abc123def4567890abc123def4567890abc123def4567890abc123def4567890";

    fn ok(body: &str) -> ApiResponse {
        ApiResponse {
            status: 200,
            body: body.to_string(),
        }
    }

    fn status(status: u16) -> ApiResponse {
        ApiResponse {
            status,
            body: String::new(),
        }
    }

    fn list_body() -> String {
        format!(r#"[{{"Id":"{NGINX_ID}","Names":["/nginx"]}}]"#)
    }

    fn api_key_client(transport: Arc<FakeTransport>) -> PortainerClient {
        let session = Session::new(transport.clone(), Credential::ApiKey("key".to_string()));
        PortainerClient::new(transport, session, "1".to_string())
    }

    fn login_client(transport: Arc<FakeTransport>) -> PortainerClient {
        let session = Session::new(
            transport.clone(),
            Credential::Login {
                username: "admin".to_string(),
                password: "hunter2".to_string(),
            },
        );
        PortainerClient::new(transport, session, "1".to_string())
    }

    #[tokio::test]
    async fn resolve_matches_plain_name() {
        let transport = FakeTransport::new(vec![ok(&list_body())]);
        let client = api_key_client(transport.clone());

        assert_eq!(client.resolve("nginx").await.unwrap(), NGINX_ID);
        let requests = transport.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(
            requests[0].path,
            "/api/endpoints/1/docker/containers/json?all=true"
        );
    }

    #[tokio::test]
    async fn resolve_matches_slashed_name() {
        let transport = FakeTransport::new(vec![ok(&list_body())]);
        let client = api_key_client(transport);
        assert_eq!(client.resolve("/nginx").await.unwrap(), NGINX_ID);
    }

    #[tokio::test]
    async fn resolve_matches_id_prefix() {
        let transport = FakeTransport::new(vec![ok(&list_body())]);
        let client = api_key_client(transport);
        assert_eq!(client.resolve("abc123def456").await.unwrap(), NGINX_ID);
    }

    #[tokio::test]
    async fn resolve_rejects_short_id_prefix() {
        // Six hex characters match the ID textually but are below the
        // minimum prefix length, so this must not resolve.
        let transport = FakeTransport::new(vec![ok(&list_body())]);
        let client = api_key_client(transport);
        assert!(matches!(
            client.resolve("abc123").await,
            Err(PortainerError::ContainerNotFound { .. })
        ));
    }

    #[tokio::test]
    async fn resolve_unknown_name_is_not_found() {
        let transport = FakeTransport::new(vec![ok(&list_body())]);
        let client = api_key_client(transport);
        match client.resolve("xyz").await {
            Err(PortainerError::ContainerNotFound { name }) => assert_eq!(name, "xyz"),
            other => panic!("expected ContainerNotFound, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn list_retries_once_after_401() {
        let transport = FakeTransport::new(vec![status(401), ok("[]")]);
        let client = api_key_client(transport.clone());

        assert!(client.list_containers().await.unwrap().is_empty());
        let requests = transport.requests();
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[0].path, requests[1].path);
    }

    #[tokio::test]
    async fn second_401_propagates_without_more_retries() {
        let transport = FakeTransport::new(vec![status(401), status(401)]);
        let client = api_key_client(transport.clone());

        assert!(matches!(
            client.list_containers().await,
            Err(PortainerError::Auth { status: 401, .. })
        ));
        assert_eq!(transport.requests().len(), 2);
    }

    #[tokio::test]
    async fn login_401_reauthenticates_before_retry() {
        let transport = FakeTransport::new(vec![
            ok(r#"{"jwt":"tok1"}"#),
            status(401),
            ok(r#"{"jwt":"tok2"}"#),
            ok("[]"),
        ]);
        let client = login_client(transport.clone());

        assert!(client.list_containers().await.unwrap().is_empty());
        let requests = transport.requests();
        assert_eq!(requests.len(), 4);
        assert_eq!(requests[2].path, "/api/auth");
        let retry_auth = requests[3].auth.as_ref().unwrap();
        assert_eq!(retry_auth.value, "Bearer tok2");
    }

    #[tokio::test]
    async fn restart_posts_to_restart_path() {
        let transport = FakeTransport::new(vec![status(204)]);
        let client = api_key_client(transport.clone());

        client.restart(NGINX_ID).await.unwrap();
        let requests = transport.requests();
        assert_eq!(
            requests[0].path,
            format!("/api/endpoints/1/docker/containers/{NGINX_ID}/restart")
        );
        assert_eq!(requests[0].timeout, Duration::from_secs(30));
    }

    #[tokio::test]
    async fn restart_404_is_container_not_found() {
        let transport = FakeTransport::new(vec![status(404)]);
        let client = api_key_client(transport);
        assert!(matches!(
            client.restart(NGINX_ID).await,
            Err(PortainerError::ContainerNotFound { .. })
        ));
    }

    #[tokio::test]
    async fn restart_server_error_is_api_error() {
        let transport = FakeTransport::new(vec![ApiResponse {
            status: 500,
            body: "boom".to_string(),
        }]);
        let client = api_key_client(transport);
        match client.restart(NGINX_ID).await {
            Err(PortainerError::Api { status, message }) => {
                assert_eq!(status, 500);
                assert_eq!(message, "boom");
            }
            other => panic!("expected Api error, got {other:?}"),
        }
    }
}
