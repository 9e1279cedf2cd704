//! Connection parameter parsing and validation.
//!
//! This module resolves the `(login, password, server)` triple either from
//! explicit builder values or from a semicolon-delimited connection string.

use crate::error::ConnectionError;
use std::fmt;
use std::str::FromStr;

/// Connection string key holding the server base URL.
pub const KEY_DATA_SOURCE: &str = "Data Source";

/// Connection string key holding the login.
pub const KEY_USER_ID: &str = "User ID";

/// Connection string key holding the password.
pub const KEY_PASSWORD: &str = "password";

/// Resolved and normalized connection parameters.
#[derive(Clone)]
pub struct ConnectionParams {
    /// Login used for Basic authentication
    pub login: String,

    /// Password (never displayed)
    password: String,

    /// Server base URL without trailing `/`
    pub server: String,
}

impl ConnectionParams {
    /// Get the password (for internal use only, never logged).
    pub(crate) fn password(&self) -> &str {
        &self.password
    }

    /// Create a new ConnectionBuilder.
    pub fn builder() -> ConnectionBuilder {
        ConnectionBuilder::new()
    }

    /// Render the canonical connection string, quoting values where needed.
    ///
    /// The output parses back into equal parameters.
    pub fn to_connection_string(&self) -> String {
        format!(
            "{}={};{}={};{}={};",
            KEY_DATA_SOURCE,
            quote_value(&self.server),
            KEY_USER_ID,
            quote_value(&self.login),
            KEY_PASSWORD,
            quote_value(&self.password),
        )
    }
}

impl FromStr for ConnectionParams {
    type Err = ConnectionError;

    /// Parse a connection string in the format:
    /// `Data Source=<server-url>;User ID=<login>;password=<password>;`
    ///
    /// Keys are matched case-insensitively and pairs may appear in any order.
    ///
    /// # Examples
    ///
    /// ```
    /// # use stash_client::connection::ConnectionParams;
    /// # use std::str::FromStr;
    /// let params = ConnectionParams::from_str(
    ///     "Data Source=https://git.example.com/;User ID=alice;password=secret;",
    /// )?;
    /// assert_eq!(params.server, "https://git.example.com");
    /// assert_eq!(params.login, "alice");
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().is_empty() {
            return Err(ConnectionError::missing("connection_string"));
        }

        let mut login = None;
        let mut password = None;
        let mut server = None;

        for (key, value) in parse_pairs(s)? {
            match key.as_str() {
                "user id" => login = Some(value),
                "password" => password = Some(value),
                "data source" => server = Some(value),
                other => tracing::trace!(key = other, "ignoring unknown connection string key"),
            }
        }

        let login = login.ok_or_else(|| ConnectionError::missing_key(KEY_USER_ID))?;
        let password = password.ok_or_else(|| ConnectionError::missing_key(KEY_PASSWORD))?;
        let server = server.ok_or_else(|| ConnectionError::missing_key(KEY_DATA_SOURCE))?;

        // An empty value is bad input in the string, reported under its key
        ConnectionBuilder::new()
            .login(&login)
            .password(&password)
            .server(&server)
            .build()
            .map_err(|e| match e {
                ConnectionError::InvalidParameter { parameter, message } => {
                    ConnectionError::MalformedConnectionString {
                        key: Some(key_for_parameter(&parameter).to_string()),
                        message,
                    }
                }
                other => other,
            })
    }
}

fn key_for_parameter(parameter: &str) -> &str {
    match parameter {
        "login" => KEY_USER_ID,
        "password" => KEY_PASSWORD,
        "server" => KEY_DATA_SOURCE,
        other => other,
    }
}

// Prevent password from being displayed in debug or display output
impl fmt::Debug for ConnectionParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionParams")
            .field("login", &self.login)
            .field("password", &"<redacted>")
            .field("server", &self.server)
            .finish()
    }
}

impl fmt::Display for ConnectionParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "ConnectionParams {{ login: {}, server: {} }}",
            self.login, self.server
        )
    }
}

/// Builder for constructing ConnectionParams with validation.
#[derive(Clone, Default)]
pub struct ConnectionBuilder {
    login: Option<String>,
    password: Option<String>,
    server: Option<String>,
}

impl ConnectionBuilder {
    /// Create a new ConnectionBuilder with nothing set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the login.
    pub fn login(mut self, login: &str) -> Self {
        self.login = Some(login.to_string());
        self
    }

    /// Set the password.
    pub fn password(mut self, password: &str) -> Self {
        self.password = Some(password.to_string());
        self
    }

    /// Set the server base URL.
    pub fn server(mut self, server: &str) -> Self {
        self.server = Some(server.to_string());
        self
    }

    /// Build the ConnectionParams with validation.
    ///
    /// Arguments are checked in `login`, `password`, `server` order and the
    /// first one missing is reported.
    pub fn build(self) -> Result<ConnectionParams, ConnectionError> {
        let login = self.login.ok_or_else(|| ConnectionError::missing("login"))?;
        let password = self
            .password
            .ok_or_else(|| ConnectionError::missing("password"))?;
        let server = self
            .server
            .ok_or_else(|| ConnectionError::missing("server"))?;

        if login.is_empty() {
            return Err(ConnectionError::InvalidParameter {
                parameter: "login".to_string(),
                message: "Login cannot be empty".to_string(),
            });
        }

        if password.is_empty() {
            return Err(ConnectionError::InvalidParameter {
                parameter: "password".to_string(),
                message: "Password cannot be empty".to_string(),
            });
        }

        let server = normalize_server(&server);
        if server.is_empty() {
            return Err(ConnectionError::InvalidParameter {
                parameter: "server".to_string(),
                message: "Server cannot be empty".to_string(),
            });
        }

        Ok(ConnectionParams {
            login,
            password,
            server,
        })
    }
}

impl fmt::Debug for ConnectionBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionBuilder")
            .field("login", &self.login)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("server", &self.server)
            .finish()
    }
}

/// Trim surrounding whitespace and every trailing `/`.
pub fn normalize_server(server: &str) -> String {
    server
        .trim()
        .trim_end_matches(|c: char| c == '/' || c.is_whitespace())
        .to_string()
}

/// Normalize a key for case-insensitive lookup: trimmed, lowercased,
/// inner whitespace runs collapsed to one space.
fn normalize_key(key: &str) -> String {
    key.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Split a connection string into normalized `(key, value)` pairs.
fn parse_pairs(input: &str) -> Result<Vec<(String, String)>, ConnectionError> {
    let mut pairs = Vec::new();
    let mut chars = input.chars().peekable();

    loop {
        // Skip separators and whitespace between pairs
        while matches!(chars.peek(), Some(c) if *c == ';' || c.is_whitespace()) {
            chars.next();
        }
        if chars.peek().is_none() {
            break;
        }

        let mut raw_key = String::new();
        let mut found_eq = false;
        while let Some(&c) = chars.peek() {
            if c == '=' {
                chars.next();
                found_eq = true;
                break;
            }
            if c == ';' {
                break;
            }
            raw_key.push(c);
            chars.next();
        }

        if !found_eq {
            return Err(ConnectionError::malformed(format!(
                "segment '{}' has no '='",
                raw_key.trim()
            )));
        }

        let key = normalize_key(&raw_key);
        if key.is_empty() {
            return Err(ConnectionError::malformed("empty key"));
        }

        while matches!(chars.peek(), Some(c) if c.is_whitespace()) {
            chars.next();
        }

        let value = match chars.peek() {
            Some(&quote) if quote == '"' || quote == '\'' => {
                chars.next();
                let mut value = String::new();
                let mut closed = false;
                while let Some(c) = chars.next() {
                    if c == quote {
                        if chars.peek() == Some(&quote) {
                            chars.next();
                            value.push(quote);
                        } else {
                            closed = true;
                            break;
                        }
                    } else {
                        value.push(c);
                    }
                }
                if !closed {
                    return Err(ConnectionError::MalformedConnectionString {
                        key: Some(raw_key.trim().to_string()),
                        message: "unterminated quoted value".to_string(),
                    });
                }
                while matches!(chars.peek(), Some(c) if c.is_whitespace()) {
                    chars.next();
                }
                match chars.peek() {
                    None | Some(&';') => {}
                    Some(_) => {
                        return Err(ConnectionError::MalformedConnectionString {
                            key: Some(raw_key.trim().to_string()),
                            message: "unexpected characters after quoted value".to_string(),
                        });
                    }
                }
                value
            }
            _ => {
                let mut value = String::new();
                while let Some(&c) = chars.peek() {
                    if c == ';' {
                        break;
                    }
                    value.push(c);
                    chars.next();
                }
                value.trim_end().to_string()
            }
        };

        pairs.push((key, value));
    }

    Ok(pairs)
}

/// Quote a value when it would not survive an unquoted round trip.
fn quote_value(value: &str) -> String {
    let needs_quotes = value.is_empty()
        || value.contains(';')
        || value.starts_with(|c: char| c == '"' || c == '\'' || c.is_whitespace())
        || value.ends_with(char::is_whitespace);

    if needs_quotes {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}
