//! Stash connection handle.
//!
//! This module provides the `StashConnection` type: resolved credentials, a
//! normalized server address and the derived token, plus the connectivity
//! probe and a factory for query handles.

use crate::connection::auth::{AuthToken, Credentials};
use crate::connection::params::{ConnectionBuilder, ConnectionParams};
use crate::connection::session::{Session, SessionState};
use crate::error::{ConnectionError, StashError};
use crate::query::Query;
use crate::transport::{ApiTransport, HttpContext};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Resource probed by `connect`.
const PROBE_RESOURCE: &str = "users";

/// Page size of the probe request.
const PROBE_PAGE_SIZE: u32 = 1;

/// Authenticated handle to one Stash server.
///
/// Two connections are equal when login and password match exactly and the
/// server matches ignoring case. The connected state takes no part in
/// equality.
///
/// # Example
///
/// ```no_run
/// use stash_client::StashConnection;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let connection = StashConnection::from_connection_string(
///     "Data Source=https://git.example.com/;User ID=alice;password=secret;",
/// )?;
///
/// connection.connect().await?;
/// assert!(connection.is_connected());
/// println!("connected as {}", connection);
/// # Ok(())
/// # }
/// ```
pub struct StashConnection {
    /// Login and password
    credentials: Credentials,
    /// Normalized server base URL
    server: String,
    /// Derived once at construction
    auth_token: AuthToken,
    /// Connected flag
    session: Session,
    /// Shared transport
    transport: Arc<dyn ApiTransport>,
}

impl StashConnection {
    /// Create a connection from explicit values.
    ///
    /// # Errors
    ///
    /// Returns `ConnectionError::InvalidParameter` if a value is empty after
    /// normalization.
    pub fn new(login: &str, password: &str, server: &str) -> Result<Self, ConnectionError> {
        ConnectionBuilder::new()
            .login(login)
            .password(password)
            .server(server)
            .build()
            .map(Self::from_params)
    }

    /// Create a connection from a connection string such as
    /// `Data Source=https://git.example.com;User ID=alice;password=secret;`.
    ///
    /// # Errors
    ///
    /// Returns `ConnectionError::MalformedConnectionString` naming the missing
    /// key, or `ConnectionError::MissingArgument` for a blank string.
    pub fn from_connection_string(connection_string: &str) -> Result<Self, ConnectionError> {
        ConnectionParams::from_str(connection_string).map(Self::from_params)
    }

    /// Create a connection over the process-wide shared HTTP context.
    pub fn from_params(params: ConnectionParams) -> Self {
        Self::with_transport(params, HttpContext::shared())
    }

    /// Create a connection over an explicit transport.
    pub fn with_transport(params: ConnectionParams, transport: Arc<dyn ApiTransport>) -> Self {
        let credentials = Credentials::new(params.login.clone(), params.password().to_string());
        let auth_token = credentials.auth_token();

        Self {
            credentials,
            server: params.server,
            auth_token,
            session: Session::new(),
            transport,
        }
    }

    /// Create a builder for the direct construction path.
    pub fn builder() -> ConnectionBuilder {
        ConnectionBuilder::new()
    }

    /// Login of this connection.
    pub fn login(&self) -> &str {
        self.credentials.login()
    }

    pub(crate) fn password(&self) -> &str {
        self.credentials.password()
    }

    /// Normalized server base URL.
    pub fn server(&self) -> &str {
        &self.server
    }

    /// `Authorization` header value sent with every request.
    pub fn auth_token(&self) -> &AuthToken {
        &self.auth_token
    }

    /// Transport used by this connection and its queries.
    pub fn transport(&self) -> &Arc<dyn ApiTransport> {
        &self.transport
    }

    /// Current session state.
    pub fn state(&self) -> SessionState {
        self.session.state()
    }

    /// Whether a probe has succeeded.
    pub fn is_connected(&self) -> bool {
        self.session.is_connected()
    }

    /// Create a new query handle bound to this connection.
    pub fn create_query(&self) -> Query {
        Query::new(
            self.server.clone(),
            self.auth_token.clone(),
            Arc::clone(&self.transport),
        )
    }

    /// Verify credentials and reachability.
    ///
    /// Equivalent to [`connect_with_cancellation`](Self::connect_with_cancellation)
    /// with a token that never fires.
    pub async fn connect(&self) -> Result<(), StashError> {
        self.connect_with_cancellation(&CancellationToken::new())
            .await
    }

    /// Verify credentials and reachability, honoring `cancel`.
    ///
    /// Returns immediately when already connected. Otherwise issues a single
    /// one-record listing of users; success moves the connection to
    /// `Connected` for good.
    ///
    /// # Errors
    ///
    /// - `ConnectionError::Cancelled` if `cancel` fires before or during the probe
    /// - `StashError::Transport` with the transport error unchanged
    ///
    /// The connection stays `Disconnected` on error and may be retried.
    pub async fn connect_with_cancellation(
        &self,
        cancel: &CancellationToken,
    ) -> Result<(), StashError> {
        if self.is_connected() {
            return Ok(());
        }

        if cancel.is_cancelled() {
            return Err(ConnectionError::Cancelled.into());
        }

        debug!(connection = %self, "probing server");

        self.create_query()
            .with_page_size(PROBE_PAGE_SIZE)
            .fetch(PROBE_RESOURCE, cancel)
            .await?;

        if self.session.mark_connected() {
            debug!(connection = %self, "connected");
        }

        Ok(())
    }
}

impl From<ConnectionParams> for StashConnection {
    fn from(params: ConnectionParams) -> Self {
        Self::from_params(params)
    }
}

impl FromStr for StashConnection {
    type Err = ConnectionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_connection_string(s)
    }
}

impl PartialEq for StashConnection {
    fn eq(&self, other: &Self) -> bool {
        self.credentials == other.credentials
            && self.server.to_lowercase() == other.server.to_lowercase()
    }
}

impl Eq for StashConnection {}

impl Hash for StashConnection {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.credentials.hash(state);
        self.server.to_lowercase().hash(state);
    }
}

impl fmt::Display for StashConnection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.login(), self.server)
    }
}

impl fmt::Debug for StashConnection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StashConnection")
            .field("login", &self.login())
            .field("password", &"<redacted>")
            .field("server", &self.server)
            .field("state", &self.state())
            .finish()
    }
}
