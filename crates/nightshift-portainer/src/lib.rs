//! Portainer API client: authenticated session handling, container
//! resolution, and restart invocation.
//!
//! Only the three endpoints nightshift needs are covered: authenticate,
//! list containers, restart container. Everything goes through the
//! [`Transport`] seam so tests can run against a scripted fake.

pub mod client;
pub mod error;
pub mod session;
pub mod transport;
pub mod types;

pub use client::PortainerClient;
pub use error::{PortainerError, Result};
pub use session::{AuthHeader, Credential, Session};
pub use transport::{ApiRequest, ApiResponse, HttpTransport, Method, Transport};
