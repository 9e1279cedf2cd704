//! Credential resolution for Stash connections.
//!
//! This module provides connection-string parsing, the direct builder,
//! Basic token derivation and session state tracking.
//!
//! # Example
//!
//! ```
//! # use stash_client::connection::{ConnectionBuilder, ConnectionParams};
//! # use std::str::FromStr;
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! // Using ConnectionBuilder
//! let params = ConnectionBuilder::new()
//!     .login("alice")
//!     .password("secret")
//!     .server("https://git.example.com/")
//!     .build()?;
//!
//! // Or parse from connection string
//! let parsed = ConnectionParams::from_str(
//!     "Data Source=https://git.example.com;User ID=alice;password=secret;",
//! )?;
//! assert_eq!(params.server, parsed.server);
//! # Ok(())
//! # }
//! ```

pub mod auth;
pub mod params;
pub mod session;

pub use auth::{AuthToken, Credentials};
pub use params::{normalize_server, ConnectionBuilder, ConnectionParams};
pub use session::{Session, SessionState};
