//! Test doubles for the transport seam.

use async_trait::async_trait;
use mockall::mock;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::error::TransportError;
use crate::transport::protocol::{ApiRequest, ApiTransport};

mock! {
    pub Transport {}

    #[async_trait]
    impl ApiTransport for Transport {
        async fn get_json(&self, request: &ApiRequest) -> Result<serde_json::Value, TransportError>;
    }
}

/// Transport whose requests never complete; counts how many were started.
#[derive(Default)]
pub struct PendingTransport {
    started: AtomicUsize,
}

impl PendingTransport {
    pub fn started(&self) -> usize {
        self.started.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ApiTransport for PendingTransport {
    async fn get_json(&self, _request: &ApiRequest) -> Result<serde_json::Value, TransportError> {
        self.started.fetch_add(1, Ordering::SeqCst);
        std::future::pending().await
    }
}
