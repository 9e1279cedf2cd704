//! Transport protocol abstraction trait.
//!
//! This module defines the `ApiTransport` trait that abstracts how a REST
//! request reaches the server, so connections and queries can run over the
//! shared reqwest client or over a test double.

use crate::connection::auth::AuthToken;
use crate::error::TransportError;
use async_trait::async_trait;

/// A single authenticated GET against the REST API.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiRequest {
    /// Absolute request URL
    pub url: String,
    /// `Authorization` header value
    pub auth: AuthToken,
}

impl ApiRequest {
    /// Create a new request.
    pub fn new(url: String, auth: AuthToken) -> Self {
        Self { url, auth }
    }
}

/// Transport protocol trait for REST communication.
///
/// Implementations must support concurrent in-flight requests through a
/// shared reference.
#[async_trait]
pub trait ApiTransport: Send + Sync {
    /// Issue a GET request and parse the response body as JSON.
    ///
    /// # Errors
    ///
    /// Returns `TransportError` on network or TLS failure, a non-success
    /// status code, or a body that is not JSON.
    async fn get_json(&self, request: &ApiRequest) -> Result<serde_json::Value, TransportError>;
}
