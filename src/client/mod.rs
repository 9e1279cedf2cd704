//! Public connection API.
//!
//! [`StashConnection`] is the handle callers construct, compare, probe and
//! hand to query code.

pub mod connection;

pub use connection::StashConnection;
