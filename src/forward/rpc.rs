//! RPC forwarder: calls `LogInfo` on the logging service over gRPC.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tonic::transport::Channel;
use tracing::debug;

use super::{Ack, ForwardError, Forwarder};
use crate::grpc::lazy_channel;
use crate::payload::Payload;
use crate::proto::log_service_client::LogServiceClient;
use crate::proto::RpcPayload;

/// RPC forwarder configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RpcForwarderConfig {
    /// gRPC address of the logging service.
    pub address: String,

    /// Per-call timeout, configured as `timeout_secs`.
    #[serde(rename = "timeout_secs", deserialize_with = "super::duration_from_secs")]
    pub timeout: Duration,
}

impl Default for RpcForwarderConfig {
    fn default() -> Self {
        Self {
            address: "http://logger-service:50001".to_string(),
            timeout: Duration::from_secs(15),
        }
    }
}

/// Forwards payloads with a single `LogInfo` round trip.
pub struct RpcForwarder {
    client: LogServiceClient<Channel>,
}

impl RpcForwarder {
    /// Create a forwarder; the connection is established on first use.
    pub fn new(config: RpcForwarderConfig) -> Result<Self, ForwardError> {
        let channel =
            lazy_channel(&config.address, config.timeout).map_err(ForwardError::Config)?;

        Ok(Self {
            client: LogServiceClient::new(channel),
        })
    }
}

#[async_trait]
impl Forwarder for RpcForwarder {
    async fn forward(&self, payload: &Payload) -> Result<Ack, ForwardError> {
        let mut client = self.client.clone();
        let reply = client.log_info(RpcPayload::from(payload)).await?.into_inner();

        debug!(name = %payload.name, reply = %reply.result, "LogInfo acknowledged");
        Ok(Ack::Reply(reply.result))
    }

    fn name(&self) -> &str {
        "rpc"
    }
}
