//! Forwarders: delivery of decoded payloads to the logging service.
//!
//! One [`Forwarder`] interface, two transports:
//! - [`HttpForwarder`]: JSON `POST /log`, success is `202 Accepted`
//! - [`RpcForwarder`]: gRPC `LogInfo`, success is the reply string
//!
//! The transport is selected by [`ForwarderConfig::transport`].

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Deserializer};

use crate::payload::Payload;

pub mod http;
pub mod rpc;

pub use http::{HttpForwarder, HttpForwarderConfig};
pub use rpc::{RpcForwarder, RpcForwarderConfig};

/// Errors that can occur when forwarding a payload.
#[derive(Debug, thiserror::Error)]
pub enum ForwardError {
    /// HTTP request failed before a response arrived.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The logging service answered with something other than 202.
    #[error("Unexpected status {status}: {body}")]
    UnexpectedStatus { status: u16, body: String },

    /// RPC call failed.
    #[error("RPC error: {0}")]
    Rpc(#[from] tonic::Status),

    /// JSON serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Successful delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Ack {
    /// The HTTP endpoint accepted the payload.
    Accepted,
    /// The RPC endpoint processed the payload and replied.
    Reply(String),
}

/// Delivers a payload to the persistence collaborator.
///
/// Implementations make a single attempt; callers decide what a failure means.
#[async_trait]
pub trait Forwarder: Send + Sync {
    async fn forward(&self, payload: &Payload) -> Result<Ack, ForwardError>;

    /// Transport name for logging.
    fn name(&self) -> &str;
}

/// Forwarding transport discriminator.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Transport {
    #[default]
    Http,
    Rpc,
}

/// Forwarder configuration (discriminated union).
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ForwarderConfig {
    pub transport: Transport,
    pub http: HttpForwarderConfig,
    pub rpc: RpcForwarderConfig,
}

/// Read a timeout given in whole seconds.
pub(crate) fn duration_from_secs<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    u64::deserialize(deserializer).map(Duration::from_secs)
}

/// Build the forwarder selected by `config.transport`.
pub fn build_forwarder(config: &ForwarderConfig) -> Result<Arc<dyn Forwarder>, ForwardError> {
    let forwarder: Arc<dyn Forwarder> = match config.transport {
        Transport::Http => Arc::new(HttpForwarder::new(config.http.clone())?),
        Transport::Rpc => Arc::new(RpcForwarder::new(config.rpc.clone())?),
    };
    Ok(forwarder)
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::sync::Mutex;

    /// Forwarder that records every payload it is handed.
    #[derive(Default)]
    pub struct RecordingForwarder {
        seen: Mutex<Vec<Payload>>,
        fail: bool,
    }

    impl RecordingForwarder {
        pub fn failing() -> Self {
            Self {
                seen: Mutex::new(Vec::new()),
                fail: true,
            }
        }

        pub fn seen(&self) -> Vec<Payload> {
            self.seen.lock().unwrap().clone()
        }

        pub fn count(&self) -> usize {
            self.seen.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl Forwarder for RecordingForwarder {
        async fn forward(&self, payload: &Payload) -> Result<Ack, ForwardError> {
            self.seen.lock().unwrap().push(payload.clone());
            if self.fail {
                Err(ForwardError::UnexpectedStatus {
                    status: 500,
                    body: "boom".to_string(),
                })
            } else {
                Ok(Ack::Accepted)
            }
        }

        fn name(&self) -> &str {
            "recording"
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transport_defaults_to_http() {
        assert_eq!(ForwarderConfig::default().transport, Transport::Http);
    }

    #[tokio::test]
    async fn test_build_http_forwarder() {
        let forwarder = build_forwarder(&ForwarderConfig::default()).unwrap();
        assert_eq!(forwarder.name(), "http");
    }

    #[tokio::test]
    async fn test_build_rpc_forwarder() {
        let config = ForwarderConfig {
            transport: Transport::Rpc,
            ..Default::default()
        };
        let forwarder = build_forwarder(&config).unwrap();
        assert_eq!(forwarder.name(), "rpc");
    }

    #[test]
    fn test_build_rejects_empty_endpoint() {
        let config = ForwarderConfig {
            http: HttpForwarderConfig {
                endpoint: String::new(),
                ..Default::default()
            },
            ..Default::default()
        };
        assert!(matches!(
            build_forwarder(&config),
            Err(ForwardError::Config(_))
        ));
    }
}
