//! Logrelay - topic-exchange log relay
//!
//! Consumes JSON log payloads from an AMQP topic exchange and forwards each
//! one to a logging service over HTTP or gRPC. Also ships the logging service
//! itself, which accepts payloads on both transports.

pub mod bus;
pub mod config;
pub mod dispatch;
pub mod forward;
pub mod grpc;
pub mod logger;
pub mod payload;
pub mod proto;
pub mod utils;
