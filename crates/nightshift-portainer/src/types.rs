use serde::{Deserialize, Serialize};

/// Body for `POST /api/auth`.
#[derive(Debug, Serialize)]
pub struct AuthRequest {
    pub username: String,
    pub password: String,
}

/// Successful response from `POST /api/auth`.
#[derive(Debug, Deserialize)]
pub struct AuthResponse {
    pub jwt: String,
}

/// One entry from the Docker container-list endpoint.
///
/// Field names follow the Docker Engine API; declared names carry a
/// leading `/` (e.g. `/nginx`).
#[derive(Debug, Clone, Deserialize)]
pub struct ContainerSummary {
    #[serde(rename = "Id")]
    pub id: String,
    #[serde(rename = "Names", default)]
    pub names: Vec<String>,
}
