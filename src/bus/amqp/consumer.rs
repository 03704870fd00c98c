//! Topic consumer: binds an anonymous queue and pumps deliveries into the
//! dispatch pool.

use std::sync::Arc;

use futures::StreamExt;
use lapin::{
    options::{BasicAckOptions, BasicConsumeOptions, BasicQosOptions},
    types::FieldTable,
    Connection,
};
use tokio::sync::watch;
use tracing::{debug, info};

use super::topology::{
    bind_routing_keys, close_channel, declare_anonymous_queue, declare_exchange, matched_binding,
    open_channel,
};
use crate::bus::{BusError, Result};
use crate::dispatch::{pump, DispatchPool};

const CONSUMER_TAG: &str = "logrelay-listener";

/// Consumes payloads from the topic exchange.
pub struct Consumer {
    connection: Arc<Connection>,
    exchange: String,
}

impl Consumer {
    /// Declare the exchange on a setup channel and return a ready consumer.
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

    /// Bind a fresh queue to `routing_keys` and dispatch every delivery.
    ///
    /// Each delivery is acknowledged as it is handed to the pool, so the
    /// broker forgets it whatever happens afterwards. The prefetch window is
    /// the pool capacity: while the pool is full nothing is acknowledged and
    /// the broker stops sending. Runs until the delivery stream ends or
    /// `shutdown` fires; returns the number of messages received.
    pub async fn listen<S: AsRef<str>>(
        &self,
        routing_keys: &[S],
        pool: &DispatchPool,
        shutdown: watch::Receiver<bool>,
    ) -> Result<usize> {
        let channel = open_channel(&self.connection).await?;

        channel
            .basic_qos(prefetch_count(pool.capacity()), BasicQosOptions::default())
            .await
            .map_err(|e| BusError::Subscribe(format!("Failed to set prefetch: {}", e)))?;

        let queue = declare_anonymous_queue(&channel).await?;
        let queue_name = queue.name().as_str().to_string();

        bind_routing_keys(&channel, &queue_name, &self.exchange, routing_keys).await?;

        let deliveries = channel
            .basic_consume(
                &queue_name,
                CONSUMER_TAG,
                BasicConsumeOptions::default(),
                FieldTable::default(),
            )
            .await
            .map_err(|e| BusError::Subscribe(format!("Failed to start consumer: {}", e)))?;

        info!(
            exchange = %self.exchange,
            queue = %queue_name,
            "Waiting for messages"
        );

        let bodies = deliveries.then(|delivery| async move {
            let delivery = delivery?;
            let routing_key = delivery.routing_key.as_str();
            debug!(
                routing_key = %routing_key,
                binding = ?matched_binding(routing_keys, routing_key),
                "Received message"
            );
            delivery.ack(BasicAckOptions::default()).await?;
            Ok::<_, lapin::Error>(delivery.data)
        });

        let result = pump(bodies, pool, shutdown)
            .await
            .map_err(|e| BusError::Subscribe(format!("Consumer delivery error: {}", e)));

        close_channel(&channel).await;
        result
    }
}

/// AMQP prefetch for a pool of `capacity` workers.
fn prefetch_count(capacity: usize) -> u16 {
    u16::try_from(capacity).unwrap_or(u16::MAX).max(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prefetch_follows_pool_capacity() {
        assert_eq!(prefetch_count(64), 64);
        assert_eq!(prefetch_count(1), 1);
    }

    #[test]
    fn test_prefetch_is_clamped_to_amqp_range() {
        assert_eq!(prefetch_count(0), 1);
        assert_eq!(prefetch_count(1_000_000), u16::MAX);
    }
}
