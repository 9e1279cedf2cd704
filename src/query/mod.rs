//! Query handles bound to a connection.
//!
//! A [`Query`] carries everything needed to issue authenticated REST requests
//! on behalf of one connection: the server base URL, the derived token and the
//! transport. It fetches one page at a time; walking pages is left to callers.
//!
//! # Example
//!
//! ```no_run
//! # use stash_client::StashConnection;
//! # use tokio_util::sync::CancellationToken;
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let connection = StashConnection::new("alice", "secret", "https://git.example.com")?;
//! let query = connection.create_query().with_page_size(25);
//! let page = query
//!     .fetch_page::<serde_json::Value>("projects", &CancellationToken::new())
//!     .await?;
//! println!("{} projects, last page: {}", page.size, page.is_last_page);
//! # Ok(())
//! # }
//! ```

use crate::connection::auth::AuthToken;
use crate::error::{ConnectionError, StashError, TransportError};
use crate::transport::protocol::{ApiRequest, ApiTransport};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Path of the REST API below the server base URL.
pub const REST_API_ROOT: &str = "rest/api/1.0";

/// One page of a paged REST collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    /// Number of values on this page
    #[serde(default)]
    pub size: u32,
    /// Page size the server applied
    #[serde(default)]
    pub limit: u32,
    /// Whether more pages follow
    #[serde(default)]
    pub is_last_page: bool,
    /// Index of the first value on this page
    #[serde(default)]
    pub start: u32,
    /// Start index of the next page, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_page_start: Option<u32>,
    /// The values themselves
    #[serde(default = "Vec::new")]
    pub values: Vec<T>,
}

/// REST query handle bound to one connection.
#[derive(Clone)]
pub struct Query {
    server: String,
    auth: AuthToken,
    transport: Arc<dyn ApiTransport>,
    page_size: Option<u32>,
}

impl Query {
    pub(crate) fn new(server: String, auth: AuthToken, transport: Arc<dyn ApiTransport>) -> Self {
        Self {
            server,
            auth,
            transport,
            page_size: None,
        }
    }

    /// Request at most `page_size` values per page.
    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = Some(page_size);
        self
    }

    /// Configured page size, if any.
    pub fn page_size(&self) -> Option<u32> {
        self.page_size
    }

    /// Server base URL this query targets.
    pub fn server(&self) -> &str {
        &self.server
    }

    /// Absolute URL for `resource`, with the page size applied.
    pub fn url_for(&self, resource: &str) -> String {
        let resource = resource.trim_start_matches('/');
        let mut url = format!("{}/{}/{}", self.server, REST_API_ROOT, resource);

        if let Some(limit) = self.page_size {
            let separator = if url.contains('?') { '&' } else { '?' };
            url.push(separator);
            url.push_str(&format!("limit={}", limit));
        }

        url
    }

    /// Fetch `resource` and return the raw JSON document.
    ///
    /// # Errors
    ///
    /// `ConnectionError::Cancelled` if `cancel` fires first; otherwise the
    /// transport error unchanged.
    pub async fn fetch(
        &self,
        resource: &str,
        cancel: &CancellationToken,
    ) -> Result<serde_json::Value, StashError> {
        if cancel.is_cancelled() {
            return Err(ConnectionError::Cancelled.into());
        }

        let request = ApiRequest::new(self.url_for(resource), self.auth.clone());
        tracing::trace!(url = %request.url, "issuing REST request");

        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(ConnectionError::Cancelled.into()),
            result = self.transport.get_json(&request) => result.map_err(StashError::from),
        }
    }

    /// Fetch one page of `resource` and deserialize its values.
    pub async fn fetch_page<T: DeserializeOwned>(
        &self,
        resource: &str,
        cancel: &CancellationToken,
    ) -> Result<Page<T>, StashError> {
        let document = self.fetch(resource, cancel).await?;
        serde_json::from_value(document).map_err(|e| StashError::Transport(TransportError::from(e)))
    }
}

impl fmt::Debug for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Query")
            .field("server", &self.server)
            .field("auth", &self.auth)
            .field("page_size", &self.page_size)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::MockTransport;
    use serde_json::json;

    fn query_with(transport: MockTransport) -> Query {
        Query::new(
            "http://git.example.com".to_string(),
            AuthToken::basic("alice", "secret"),
            Arc::new(transport),
        )
    }

    #[test]
    fn test_url_for() {
        let query = query_with(MockTransport::new());

        assert_eq!(
            query.url_for("users"),
            "http://git.example.com/rest/api/1.0/users"
        );
        assert_eq!(
            query.url_for("/projects"),
            "http://git.example.com/rest/api/1.0/projects"
        );
    }

    #[test]
    fn test_url_for_with_page_size() {
        let query = query_with(MockTransport::new()).with_page_size(1);

        assert_eq!(query.page_size(), Some(1));
        assert_eq!(
            query.url_for("users"),
            "http://git.example.com/rest/api/1.0/users?limit=1"
        );
        assert_eq!(
            query.url_for("users?filter=al"),
            "http://git.example.com/rest/api/1.0/users?filter=al&limit=1"
        );
    }

    #[tokio::test]
    async fn test_fetch_sends_token_and_url() {
        let mut transport = MockTransport::new();
        transport
            .expect_get_json()
            .withf(|req| {
                req.url == "http://git.example.com/rest/api/1.0/users?limit=1"
                    && req.auth == AuthToken::basic("alice", "secret")
            })
            .times(1)
            .returning(|_| Ok(json!({ "size": 0, "values": [] })));

        let query = query_with(transport).with_page_size(1);
        let doc = query.fetch("users", &CancellationToken::new()).await.unwrap();

        assert_eq!(doc["size"], 0);
    }

    #[tokio::test]
    async fn test_fetch_already_cancelled() {
        let mut transport = MockTransport::new();
        transport.expect_get_json().times(0);

        let cancel = CancellationToken::new();
        cancel.cancel();

        let err = query_with(transport)
            .fetch("users", &cancel)
            .await
            .unwrap_err();
        assert!(err.is_cancelled());
    }

    #[tokio::test]
    async fn test_fetch_propagates_transport_error() {
        let mut transport = MockTransport::new();
        transport.expect_get_json().times(1).returning(|req| {
            Err(TransportError::Status {
                status: 404,
                url: req.url.clone(),
            })
        });

        let err = query_with(transport)
            .fetch("nope", &CancellationToken::new())
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            StashError::Transport(TransportError::Status { status: 404, .. })
        ));
    }

    #[tokio::test]
    async fn test_fetch_page_deserializes() {
        let mut transport = MockTransport::new();
        transport.expect_get_json().returning(|_| {
            Ok(json!({
                "size": 1,
                "limit": 1,
                "isLastPage": false,
                "start": 0,
                "nextPageStart": 1,
                "values": [{ "name": "alice", "id": 1 }]
            }))
        });

        #[derive(Debug, Deserialize)]
        struct User {
            name: String,
            id: u64,
        }

        let page: Page<User> = query_with(transport)
            .with_page_size(1)
            .fetch_page("users", &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(page.size, 1);
        assert!(!page.is_last_page);
        assert_eq!(page.next_page_start, Some(1));
        assert_eq!(page.values[0].name, "alice");
        assert_eq!(page.values[0].id, 1);
    }

    #[tokio::test]
    async fn test_fetch_page_shape_mismatch() {
        let mut transport = MockTransport::new();
        transport
            .expect_get_json()
            .returning(|_| Ok(json!({ "values": "not a list" })));

        let result = query_with(transport)
            .fetch_page::<serde_json::Value>("users", &CancellationToken::new())
            .await;

        assert!(matches!(
            result.unwrap_err(),
            StashError::Transport(TransportError::Deserialization(_))
        ));
    }

    #[test]
    fn test_debug_redacts_token() {
        let query = query_with(MockTransport::new());
        let debug = format!("{:?}", query);
        assert!(debug.contains("git.example.com"));
        assert!(!debug.contains("YWxpY2U6c2VjcmV0"));
    }
}
