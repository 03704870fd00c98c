//! Wire types for the `logger.LogService` RPC.
//!
//! The client and server stubs are generated by `build.rs`.

use crate::payload::Payload;

/// Request body of `LogInfo`.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct RpcPayload {
    #[prost(string, tag = "1")]
    pub name: ::prost::alloc::string::String,
    #[prost(string, tag = "2")]
    pub data: ::prost::alloc::string::String,
}

/// Acknowledgment returned by `LogInfo`.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct LogReply {
    #[prost(string, tag = "1")]
    pub result: ::prost::alloc::string::String,
}

impl From<&Payload> for RpcPayload {
    fn from(payload: &Payload) -> Self {
        Self {
            name: payload.name.clone(),
            data: payload.data.clone(),
        }
    }
}

impl From<RpcPayload> for Payload {
    fn from(payload: RpcPayload) -> Self {
        Payload::new(payload.name, payload.data)
    }
}

include!(concat!(env!("OUT_DIR"), "/logger.LogService.rs"));
