//! RPC ingress: the `LogInfo` method.

use std::sync::Arc;
use std::time::Duration;

use tonic::{Request, Response, Status};
use tracing::{error, info};

use super::{with_timeout, LogRepository, RepositoryError};
use crate::payload::Payload;
use crate::proto::log_service_server::{LogService, LogServiceServer};
use crate::proto::{LogReply, RpcPayload};

/// gRPC implementation of `LogInfo`.
pub struct LogRpcService {
    repository: Arc<dyn LogRepository>,
    timeout: Duration,
}

impl LogRpcService {
    pub fn new(repository: Arc<dyn LogRepository>, timeout: Duration) -> Self {
        Self {
            repository,
            timeout,
        }
    }

    pub fn into_server(self) -> LogServiceServer<Self> {
        LogServiceServer::new(self)
    }
}

#[tonic::async_trait]
impl LogService for LogRpcService {
    async fn log_info(&self, request: Request<RpcPayload>) -> Result<Response<LogReply>, Status> {
        let payload = Payload::from(request.into_inner());
        let name = payload.name.clone();

        match with_timeout(self.timeout, self.repository.insert(payload)).await {
            Ok(entry) => {
                info!(id = %entry.id, name = %name, "Log entry written via RPC");
                Ok(Response::new(LogReply {
                    result: format!("Processed payload via RPC: {}", name),
                }))
            }
            Err(e) => {
                error!(name = %name, error = %e, "Failed to write log entry");
                Err(match e {
                    RepositoryError::Timeout(_) => Status::deadline_exceeded(e.to_string()),
                    RepositoryError::Storage(_) => Status::internal(e.to_string()),
                })
            }
        }
    }
}
