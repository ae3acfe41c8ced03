use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use folio_core::errors::Error;
use folio_core::remote::{CancelOutcome, PingOutcome, PushOutcome, PushRequest};
use folio_core::types;
use folio_rpc::proto::interpreter as proto;
use proto::remote_interpreter_service_client::RemoteInterpreterServiceClient;
use tonic::transport::{Channel, Endpoint};

/// Server to interpreter calls. Only transport faults are returned as `Err`.
#[async_trait]
pub trait InterpreterClient: Send + Sync {
    async fn push(&self, request: PushRequest) -> types::Result<PushOutcome>;

    async fn cancel(&self, interpreter_job_uuid: &str) -> types::Result<CancelOutcome>;

    async fn ping(&self) -> types::Result<PingOutcome>;

    async fn shutdown(&self) -> types::Result<()>;
}

pub trait ClientFactory: Send + Sync {
    fn connect(&self, host: &str, port: u16) -> types::Result<Arc<dyn InterpreterClient>>;
}

pub struct GrpcInterpreterClient {
    inner: RemoteInterpreterServiceClient<Channel>,
}

impl GrpcInterpreterClient {
    pub fn new(channel: Channel) -> Self {
        Self {
            inner: RemoteInterpreterServiceClient::new(channel),
        }
    }
}

#[async_trait]
impl InterpreterClient for GrpcInterpreterClient {
    async fn push(&self, request: PushRequest) -> types::Result<PushOutcome> {
        let response = self
            .inner
            .clone()
            .push(proto::PushRequest::from(request))
            .await
            .map_err(|e| Error::transport("push failed", e))?;

        PushOutcome::try_from(response.into_inner())
            .map_err(|e| Error::transport("malformed push response", e))
    }

    async fn cancel(&self, interpreter_job_uuid: &str) -> types::Result<CancelOutcome> {
        let response = self
            .inner
            .clone()
            .cancel(proto::CancelRequest {
                interpreter_job_uuid: interpreter_job_uuid.to_string(),
            })
            .await
            .map_err(|e| Error::transport("cancel failed", e))?;

        CancelOutcome::try_from(response.into_inner())
            .map_err(|e| Error::transport("malformed cancel response", e))
    }

    async fn ping(&self) -> types::Result<PingOutcome> {
        let response = self
            .inner
            .clone()
            .ping(proto::PingRequest {})
            .await
            .map_err(|e| Error::transport("ping failed", e))?;

        Ok(response.into_inner().into())
    }

    async fn shutdown(&self) -> types::Result<()> {
        self.inner
            .clone()
            .shutdown(proto::ShutdownRequest {})
            .await
            .map_err(|e| Error::transport("shutdown failed", e))?;

        Ok(())
    }
}

pub struct GrpcClientFactory {
    rpc_timeout: Duration,
}

impl GrpcClientFactory {
    pub fn new(rpc_timeout: Duration) -> Arc<dyn ClientFactory> {
        Arc::new(Self { rpc_timeout })
    }
}

impl ClientFactory for GrpcClientFactory {
    fn connect(&self, host: &str, port: u16) -> types::Result<Arc<dyn InterpreterClient>> {
        let endpoint = Endpoint::from_shared(format!("http://{}:{}", host, port))
            .map_err(|e| Error::transport(format!("invalid endpoint {}:{}", host, port), e))?
            .timeout(self.rpc_timeout)
            .connect_timeout(self.rpc_timeout);

        Ok(Arc::new(GrpcInterpreterClient::new(endpoint.connect_lazy())))
    }
}
