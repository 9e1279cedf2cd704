//! # stash-client
//!
//! Connection and session layer for the Stash / Bitbucket Server REST API.
//!
//! This library resolves credentials from explicit values or a connection
//! string, derives the Basic authorization token, normalizes the server
//! address and runs every request over one process-wide HTTP client and
//! cookie store.
//!
//! ## Example
//!
//! ```no_run
//! # use stash_client::*;
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let connection = StashConnection::from_connection_string(
//!     "Data Source=https://git.example.com/;User ID=alice;password=secret;",
//! )?;
//!
//! // Probe credentials and reachability
//! connection.connect().await?;
//!
//! // Issue queries over the same shared transport
//! let users = connection
//!     .create_query()
//!     .with_page_size(10)
//!     .fetch("users", &tokio_util::sync::CancellationToken::new())
//!     .await?;
//! println!("{}", users);
//! # Ok(())
//! # }
//! ```

// Module declarations
pub mod client;
pub mod connection;
pub mod error;
pub mod query;
pub mod transport;

#[cfg(test)]
pub(crate) mod test_support;

// Re-export public API
pub use client::StashConnection;
pub use connection::{AuthToken, ConnectionBuilder, ConnectionParams, SessionState};
pub use error::{ConnectionError, ErrorKind, StashError, TransportError};
pub use query::{Page, Query};
pub use transport::{ApiTransport, HttpContext, TransportConfig};
