//! Message bus for log/event distribution.
//!
//! This module contains:
//! - `BusError`: errors raised while connecting to or talking with the broker
//! - AMQP (RabbitMQ) connection management, topology, consumer, and emitter

pub mod amqp;

pub use amqp::{AmqpConfig, ConnectionManager, Consumer, Emitter};

/// Result type for bus operations.
pub type Result<T> = std::result::Result<T, BusError>;

/// Errors that can occur during bus operations.
#[derive(Debug, thiserror::Error)]
pub enum BusError {
    #[error("Connection failed: {0}")]
    Connection(String),

    #[error("Topology declaration failed: {0}")]
    Topology(String),

    #[error("Subscribe failed: {0}")]
    Subscribe(String),

    #[error("Publish failed: {0}")]
    Publish(String),

    #[error("Serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}
