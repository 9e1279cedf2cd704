//! Transport layer for Stash REST communication.
//!
//! # Architecture
//!
//! The transport layer is organized into:
//! - `protocol` - Transport trait and request type
//! - `http` - Process-wide reqwest client and cookie store
//!
//! # Example
//!
//! ```no_run
//! use stash_client::transport::{HttpContext, TlsVersion, TransportConfig};
//!
//! // Optional: configure before the first connection is created
//! HttpContext::initialize(
//!     TransportConfig::new().with_tls_versions([TlsVersion::Tls1_2, TlsVersion::Tls1_3]),
//! );
//!
//! let client = HttpContext::shared().client().clone();
//! ```

pub mod http;
pub mod protocol;

pub use http::{HttpContext, TlsVersion, TransportConfig};
pub use protocol::{ApiRequest, ApiTransport};
