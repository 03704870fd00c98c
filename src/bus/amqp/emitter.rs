//! Publishing side of the topic exchange.

use std::sync::Arc;

use lapin::{
    options::{BasicPublishOptions, ConfirmSelectOptions},
    BasicProperties, Channel, Connection,
};
use tracing::debug;

use super::topology::{close_channel, declare_exchange, open_channel};
use crate::bus::{BusError, Result};
use crate::payload::Payload;

/// Publishes payloads to the topic exchange.
pub struct Emitter {
    connection: Arc<Connection>,
    exchange: String,
}

impl Emitter {
    /// Declare the exchange and return a ready emitter.
    pub async fn new(connection: Arc<Connection>, exchange: impl Into<String>) -> Result<Self> {
        let exchange = exchange.into();

        let channel = open_channel(&connection).await?;
        declare_exchange(&channel, &exchange).await?;
        close_channel(&channel).await;

        Ok(Self {
            connection,
            exchange,
        })
    }

    /// Publish `payload` under `routing_key` and wait for the broker confirm.
    pub async fn push(&self, payload: &Payload, routing_key: &str) -> Result<()> {
        let body = payload.to_json()?;

        let channel = open_channel(&self.connection).await?;
        channel
            .confirm_select(ConfirmSelectOptions::default())
            .await
            .map_err(|e| BusError::Publish(format!("Failed to enable confirms: {}", e)))?;

        let result = publish(&channel, &self.exchange, routing_key, &body).await;
        close_channel(&channel).await;
        result?;

        debug!(
            exchange = %self.exchange,
            routing_key = %routing_key,
            name = %payload.name,
            "Published payload"
        );
        Ok(())
    }
}

async fn publish(channel: &Channel, exchange: &str, routing_key: &str, body: &[u8]) -> Result<()> {
    let properties = BasicProperties::default().with_content_type("application/json".into());

    let confirm = channel
        .basic_publish(
            exchange,
            routing_key,
            BasicPublishOptions::default(),
            body,
            properties,
        )
        .await
        .map_err(|e| BusError::Publish(format!("Failed to publish: {}", e)))?;

    let confirmation = confirm
        .await
        .map_err(|e| BusError::Publish(format!("Publish confirmation failed: {}", e)))?;

    if confirmation.is_nack() {
        return Err(BusError::Publish("Broker rejected message".to_string()));
    }
    Ok(())
}
