//! Process-wide HTTP context backed by reqwest.
//!
//! One `reqwest::Client` and one cookie jar serve every connection in the
//! process. The context is built on first use, or earlier through
//! [`HttpContext::initialize`], and is never torn down.

use async_trait::async_trait;
use reqwest::cookie::Jar;
use reqwest::header::{ACCEPT, AUTHORIZATION};
use std::fmt;
use std::sync::{Arc, OnceLock};
use tracing::{debug, warn};

use crate::error::TransportError;

use super::protocol::{ApiRequest, ApiTransport};

/// Environment variable listing allowed TLS versions, e.g. `1.0,1.1,1.2`.
pub const ENV_TLS_VERSIONS: &str = "STASH_CLIENT_TLS_VERSIONS";

/// Environment variable overriding the `User-Agent` header.
pub const ENV_USER_AGENT: &str = "STASH_CLIENT_USER_AGENT";

/// Environment variable toggling ambient credential fallback.
pub const ENV_DEFAULT_CREDENTIALS: &str = "STASH_CLIENT_DEFAULT_CREDENTIALS";

static SHARED: OnceLock<Arc<HttpContext>> = OnceLock::new();

/// TLS protocol versions that may be enabled on the shared transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum TlsVersion {
    Tls1_0,
    Tls1_1,
    Tls1_2,
    Tls1_3,
}

impl TlsVersion {
    /// Parse `1.0`, `tls1.2`, `TLSv1.3` and similar spellings.
    pub fn parse(s: &str) -> Option<Self> {
        let lowered = s.trim().to_ascii_lowercase();
        let version = lowered
            .trim_start_matches("tlsv")
            .trim_start_matches("tls")
            .trim();
        match version {
            "1.0" | "1" => Some(TlsVersion::Tls1_0),
            "1.1" => Some(TlsVersion::Tls1_1),
            "1.2" => Some(TlsVersion::Tls1_2),
            "1.3" => Some(TlsVersion::Tls1_3),
            _ => None,
        }
    }

    fn to_reqwest(self) -> reqwest::tls::Version {
        match self {
            TlsVersion::Tls1_0 => reqwest::tls::Version::TLS_1_0,
            TlsVersion::Tls1_1 => reqwest::tls::Version::TLS_1_1,
            TlsVersion::Tls1_2 => reqwest::tls::Version::TLS_1_2,
            TlsVersion::Tls1_3 => reqwest::tls::Version::TLS_1_3,
        }
    }
}

impl fmt::Display for TlsVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TlsVersion::Tls1_0 => write!(f, "TLS 1.0"),
            TlsVersion::Tls1_1 => write!(f, "TLS 1.1"),
            TlsVersion::Tls1_2 => write!(f, "TLS 1.2"),
            TlsVersion::Tls1_3 => write!(f, "TLS 1.3"),
        }
    }
}

/// Configuration applied once when the shared context is built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportConfig {
    /// Allowed TLS versions; enforced as the range from lowest to highest
    pub tls_versions: Vec<TlsVersion>,
    /// Ask for ambient/integrated credentials in addition to Basic auth.
    ///
    /// reqwest has no integrated authentication, so on this backend the flag
    /// is only recorded and logged.
    pub use_default_credentials: bool,
    /// `User-Agent` header sent with every request
    pub user_agent: String,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            tls_versions: vec![TlsVersion::Tls1_0, TlsVersion::Tls1_1, TlsVersion::Tls1_2],
            use_default_credentials: false,
            user_agent: concat!("stash-client/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

impl TransportConfig {
    /// Create the default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the allowed TLS versions.
    pub fn with_tls_versions(mut self, versions: impl IntoIterator<Item = TlsVersion>) -> Self {
        self.tls_versions = versions.into_iter().collect();
        self
    }

    /// Enable or disable ambient credential fallback.
    pub fn with_default_credentials(mut self, enabled: bool) -> Self {
        self.use_default_credentials = enabled;
        self
    }

    /// Set the `User-Agent` header.
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Build a configuration from `STASH_CLIENT_*` environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build a configuration from an arbitrary variable lookup.
    ///
    /// Unparsable values keep the default and are reported at `warn`.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(raw) = lookup(ENV_TLS_VERSIONS) {
            let parsed: Option<Vec<TlsVersion>> = raw
                .split(',')
                .filter(|s| !s.trim().is_empty())
                .map(TlsVersion::parse)
                .collect();
            match parsed {
                Some(versions) if !versions.is_empty() => config.tls_versions = versions,
                _ => warn!(variable = ENV_TLS_VERSIONS, value = %raw, "ignoring invalid TLS version list"),
            }
        }

        if let Some(user_agent) = lookup(ENV_USER_AGENT) {
            if !user_agent.trim().is_empty() {
                config.user_agent = user_agent;
            }
        }

        if let Some(raw) = lookup(ENV_DEFAULT_CREDENTIALS) {
            match parse_bool(&raw) {
                Some(enabled) => config.use_default_credentials = enabled,
                None => warn!(variable = ENV_DEFAULT_CREDENTIALS, value = %raw, "ignoring invalid boolean"),
            }
        }

        config
    }
}

/// Parse boolean value from string.
fn parse_bool(s: &str) -> Option<bool> {
    match s.trim().to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Shared HTTP transport and cookie store.
pub struct HttpContext {
    client: reqwest::Client,
    cookie_jar: Arc<Jar>,
    config: TransportConfig,
}

impl HttpContext {
    /// Build a standalone context. Most callers want [`HttpContext::shared`].
    ///
    /// A TLS version restriction the backend cannot honor is dropped and the
    /// client is built with defaults instead. An unusable user agent is
    /// dropped the same way. The shared cookie store is kept in every case.
    ///
    /// # Panics
    ///
    /// Only if the TLS backend cannot be initialized at all.
    pub fn new(config: TransportConfig) -> Self {
        let cookie_jar = Arc::new(Jar::default());
        let client = build_client(&config, &cookie_jar);

        if config.use_default_credentials {
            debug!("ambient credentials requested; this transport authenticates with Basic only");
        }

        Self {
            client,
            cookie_jar,
            config,
        }
    }

    /// Get the process-wide context, building it from the environment on first use.
    pub fn shared() -> Arc<HttpContext> {
        Arc::clone(SHARED.get_or_init(|| {
            debug!("initializing shared HTTP context");
            Arc::new(HttpContext::new(TransportConfig::from_env()))
        }))
    }

    /// Install `config` for the process-wide context.
    ///
    /// Returns `false` when the context already exists; the existing one is
    /// kept and `config` is discarded.
    pub fn initialize(config: TransportConfig) -> bool {
        let mut installed = false;
        SHARED.get_or_init(|| {
            installed = true;
            debug!("initializing shared HTTP context with explicit configuration");
            Arc::new(HttpContext::new(config))
        });
        if !installed {
            debug!("shared HTTP context already initialized; configuration ignored");
        }
        installed
    }

    /// The shared reqwest client.
    pub fn client(&self) -> &reqwest::Client {
        &self.client
    }

    /// The shared cookie store.
    pub fn cookie_jar(&self) -> &Arc<Jar> {
        &self.cookie_jar
    }

    /// The configuration this context was built with.
    pub fn config(&self) -> &TransportConfig {
        &self.config
    }
}

impl fmt::Debug for HttpContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpContext")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

fn build_client(config: &TransportConfig, jar: &Arc<Jar>) -> reqwest::Client {
    // No timeout: long requests are bounded by the caller's cancellation token
    let base = || {
        reqwest::Client::builder()
            .cookie_provider(Arc::clone(jar))
            .user_agent(config.user_agent.clone())
    };

    let mut builder = base();
    let lowest = config.tls_versions.iter().min();
    let highest = config.tls_versions.iter().max();
    if let (Some(lowest), Some(highest)) = (lowest, highest) {
        builder = builder
            .min_tls_version(lowest.to_reqwest())
            .max_tls_version(highest.to_reqwest());
    }

    match builder.build() {
        Ok(client) => client,
        Err(e) => {
            warn!(error = %e, "TLS version restriction not supported here, using backend defaults");
            base().build().unwrap_or_else(|e| {
                warn!(error = %e, "ignoring configured user agent");
                minimal_client(jar)
            })
        }
    }
}

/// Client with nothing but the shared cookie store.
///
/// # Panics
///
/// Panics if the TLS backend cannot be initialized at all, the same
/// condition under which `reqwest::Client::new` panics.
fn minimal_client(jar: &Arc<Jar>) -> reqwest::Client {
    match reqwest::Client::builder()
        .cookie_provider(Arc::clone(jar))
        .build()
    {
        Ok(client) => client,
        Err(e) => panic!("HTTP client backend failed to initialize: {}", e),
    }
}

#[async_trait]
impl ApiTransport for HttpContext {
    async fn get_json(&self, request: &ApiRequest) -> Result<serde_json::Value, TransportError> {
        let response = self
            .client
            .get(&request.url)
            .header(AUTHORIZATION, request.auth.header_value()?)
            .header(ACCEPT, "application/json")
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(TransportError::Status {
                status: status.as_u16(),
                url: request.url.clone(),
            });
        }

        let body = response.bytes().await?;
        Ok(serde_json::from_slice(&body)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| vars.get(name).cloned()
    }

    #[test]
    fn test_default_config() {
        let config = TransportConfig::default();
        assert_eq!(
            config.tls_versions,
            vec![TlsVersion::Tls1_0, TlsVersion::Tls1_1, TlsVersion::Tls1_2]
        );
        assert!(!config.use_default_credentials);
        assert!(config.user_agent.starts_with("stash-client/"));
    }

    #[test]
    fn test_config_builder() {
        let config = TransportConfig::new()
            .with_tls_versions([TlsVersion::Tls1_2, TlsVersion::Tls1_3])
            .with_default_credentials(true)
            .with_user_agent("batch/1.0");

        assert_eq!(config.tls_versions, vec![TlsVersion::Tls1_2, TlsVersion::Tls1_3]);
        assert!(config.use_default_credentials);
        assert_eq!(config.user_agent, "batch/1.0");
    }

    #[test]
    fn test_tls_version_parse() {
        assert_eq!(TlsVersion::parse("1.0"), Some(TlsVersion::Tls1_0));
        assert_eq!(TlsVersion::parse("tls1.1"), Some(TlsVersion::Tls1_1));
        assert_eq!(TlsVersion::parse(" TLSv1.2 "), Some(TlsVersion::Tls1_2));
        assert_eq!(TlsVersion::parse("1.3"), Some(TlsVersion::Tls1_3));
        assert_eq!(TlsVersion::parse("ssl3"), None);
    }

    #[test]
    fn test_from_lookup_overrides() {
        let config = TransportConfig::from_lookup(lookup(&[
            (ENV_TLS_VERSIONS, "1.2, 1.3"),
            (ENV_USER_AGENT, "custom-agent"),
            (ENV_DEFAULT_CREDENTIALS, "on"),
        ]));

        assert_eq!(config.tls_versions, vec![TlsVersion::Tls1_2, TlsVersion::Tls1_3]);
        assert_eq!(config.user_agent, "custom-agent");
        assert!(config.use_default_credentials);
    }

    #[test]
    fn test_from_lookup_invalid_values_keep_defaults() {
        let config = TransportConfig::from_lookup(lookup(&[
            (ENV_TLS_VERSIONS, "1.2,banana"),
            (ENV_DEFAULT_CREDENTIALS, "maybe"),
        ]));

        assert_eq!(config, TransportConfig::default());
    }

    #[test]
    fn test_new_context_never_fails() {
        let context = HttpContext::new(TransportConfig::default());
        assert_eq!(context.config(), &TransportConfig::default());

        // Empty allow-list means no restriction at all
        let context = HttpContext::new(TransportConfig::new().with_tls_versions([]));
        assert!(context.config().tls_versions.is_empty());
    }

    #[test]
    fn test_shared_context_is_singleton() {
        let a = HttpContext::shared();
        let b = HttpContext::shared();
        assert!(Arc::ptr_eq(&a, &b));

        // Already initialized, so explicit configuration is ignored
        assert!(!HttpContext::initialize(TransportConfig::new().with_user_agent("late")));
        assert!(Arc::ptr_eq(&a, &HttpContext::shared()));
    }

    #[test]
    fn test_shared_context_concurrent_first_use() {
        let handles: Vec<_> = (0..8)
            .map(|_| std::thread::spawn(HttpContext::shared))
            .collect();
        let contexts: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();

        for context in &contexts[1..] {
            assert!(Arc::ptr_eq(&contexts[0], context));
        }
    }

    #[test]
    fn test_debug_output() {
        let context = HttpContext::new(TransportConfig::default());
        let debug = format!("{:?}", context);
        assert!(debug.contains("HttpContext"));
        assert!(debug.contains("tls_versions"));
    }
}
