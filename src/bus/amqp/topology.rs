//! Exchange and queue declarations.

use lapin::{
    options::{ExchangeDeclareOptions, QueueBindOptions, QueueDeclareOptions},
    types::FieldTable,
    Channel, Connection, ExchangeKind, Queue,
};
use tracing::{debug, info, warn};

use crate::bus::{BusError, Result};

/// Open a channel for one logical operation.
pub(crate) async fn open_channel(connection: &Connection) -> Result<Channel> {
    connection
        .create_channel()
        .await
        .map_err(|e| BusError::Connection(format!("Failed to create channel: {}", e)))
}

pub(crate) async fn close_channel(channel: &Channel) {
    if let Err(e) = channel.close(200, "OK").await {
        warn!(error = %e, "Failed to close channel");
    }
}

/// Declare the durable topic exchange.
///
/// Redeclaring with identical parameters is a no-op on the broker; declaring
/// an existing exchange with different parameters fails with a channel error.
pub async fn declare_exchange(channel: &Channel, exchange: &str) -> Result<()> {
    channel
        .exchange_declare(
            exchange,
            ExchangeKind::Topic,
            ExchangeDeclareOptions {
                durable: true,
                auto_delete: false,
                internal: false,
                ..Default::default()
            },
            FieldTable::default(),
        )
        .await
        .map_err(|e| BusError::Topology(format!("Failed to declare exchange: {}", e)))?;

    debug!(exchange = %exchange, "Declared topic exchange");
    Ok(())
}

/// Declare a broker-named queue that lives only as long as its connection.
pub async fn declare_anonymous_queue(channel: &Channel) -> Result<Queue> {
    channel
        .queue_declare(
            "",
            QueueDeclareOptions {
                durable: false,
                exclusive: true,
                auto_delete: true,
                ..Default::default()
            },
            FieldTable::default(),
        )
        .await
        .map_err(|e| BusError::Topology(format!("Failed to declare queue: {}", e)))
}

/// Bind `queue` to `exchange` once per routing-key pattern, in order.
pub async fn bind_routing_keys<S: AsRef<str>>(
    channel: &Channel,
    queue: &str,
    exchange: &str,
    routing_keys: &[S],
) -> Result<()> {
    for key in routing_keys {
        let key = key.as_ref();
        channel
            .queue_bind(
                queue,
                exchange,
                key,
                QueueBindOptions::default(),
                FieldTable::default(),
            )
            .await
            .map_err(|e| {
                BusError::Topology(format!("Failed to bind queue to '{}': {}", key, e))
            })?;

        info!(queue = %queue, exchange = %exchange, routing_key = %key, "Bound queue");
    }

    Ok(())
}

/// Topic-exchange matching of a routing key against a binding pattern.
///
/// Words are `.`-delimited; `*` matches exactly one word and `#` matches
/// zero or more words.
pub fn topic_matches(pattern: &str, routing_key: &str) -> bool {
    let pattern: Vec<&str> = pattern.split('.').collect();
    let key: Vec<&str> = routing_key.split('.').collect();
    match_words(&pattern, &key)
}

/// First bound pattern that routes `routing_key` to the queue, if any.
pub fn matched_binding<'a, S: AsRef<str>>(bindings: &'a [S], routing_key: &str) -> Option<&'a str> {
    bindings
        .iter()
        .map(AsRef::as_ref)
        .find(|pattern| topic_matches(pattern, routing_key))
}

fn match_words(pattern: &[&str], key: &[&str]) -> bool {
    match pattern.split_first() {
        None => key.is_empty(),
        Some((&"#", rest)) => (0..=key.len()).any(|skip| match_words(rest, &key[skip..])),
        Some((&"*", rest)) => !key.is_empty() && match_words(rest, &key[1..]),
        Some((word, rest)) => key.first() == Some(word) && match_words(rest, &key[1..]),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BOUND: [&str; 3] = ["log.INFO", "log.WARNING", "log.ERROR"];

    fn delivered(routing_key: &str) -> usize {
        // A queue receives a message at most once regardless of how many of
        // its bindings match.
        usize::from(BOUND.iter().any(|p| topic_matches(p, routing_key)))
    }

    #[test]
    fn test_exact_key_delivered_once() {
        assert_eq!(delivered("log.ERROR"), 1);
        assert_eq!(delivered("log.WARNING"), 1);
    }

    #[test]
    fn test_unbound_key_not_delivered() {
        assert_eq!(delivered("system.ERROR"), 0);
        assert_eq!(delivered("log.DEBUG"), 0);
        assert_eq!(delivered("log.ERROR.extra"), 0);
    }

    #[test]
    fn test_star_matches_exactly_one_word() {
        assert!(topic_matches("log.*", "log.INFO"));
        assert!(!topic_matches("log.*", "log"));
        assert!(!topic_matches("log.*", "log.INFO.disk"));
        assert!(topic_matches("*.ERROR", "system.ERROR"));
    }

    #[test]
    fn test_hash_matches_zero_or_more_words() {
        assert!(topic_matches("log.#", "log"));
        assert!(topic_matches("log.#", "log.INFO"));
        assert!(topic_matches("log.#", "log.INFO.disk.full"));
        assert!(topic_matches("#", "anything.at.all"));
        assert!(topic_matches("#.ERROR", "system.ERROR"));
        assert!(topic_matches("#.ERROR", "ERROR"));
        assert!(!topic_matches("log.#", "system.ERROR"));
    }

    #[test]
    fn test_matched_binding_reports_first_matching_pattern() {
        let bindings = vec!["log.INFO".to_string(), "log.#".to_string()];
        assert_eq!(matched_binding(&bindings, "log.INFO"), Some("log.INFO"));
        assert_eq!(matched_binding(&bindings, "log.ERROR.disk"), Some("log.#"));
        assert_eq!(matched_binding(&bindings, "system.ERROR"), None);
        assert_eq!(matched_binding(&BOUND, "log.WARNING"), Some("log.WARNING"));
    }

    #[test]
    fn test_words_are_case_sensitive() {
        assert!(!topic_matches("log.error", "log.ERROR"));
    }
}
