//! Inbound RPC surface called back by interpreter processes.

use std::sync::Arc;

use folio_core::remote::RegisterInfo;
use folio_core::result::InterpreterResult;
use folio_rpc::proto::interpreter as proto;
use folio_rpc::proto::interpreter::remote_interpreter_event_service_server::{
    RemoteInterpreterEventService, RemoteInterpreterEventServiceServer,
};

use crate::handler::result::ResultHandler;
use crate::process::registry::InterpreterProcessRegistry;
use crate::scheduler::Scheduler;

#[derive(Clone)]
pub struct EventService {
    registry: Arc<InterpreterProcessRegistry>,
    results: Arc<ResultHandler>,
}

impl EventService {
    pub fn new(scheduler: &Scheduler) -> Self {
        Self {
            registry: scheduler.registry(),
            results: scheduler.result_handler(),
        }
    }

    pub fn into_server(self) -> RemoteInterpreterEventServiceServer<Self> {
        RemoteInterpreterEventServiceServer::new(self)
    }
}

#[tonic::async_trait]
impl RemoteInterpreterEventService for EventService {
    async fn register_interpreter_process(
        &self,
        request: tonic::Request<proto::RegisterInterpreterProcessRequest>,
    ) -> tonic::Result<tonic::Response<proto::RegisterInterpreterProcessResponse>> {
        let info: RegisterInfo = request
            .into_inner()
            .try_into()
            .map_err(|e: anyhow::Error| tonic::Status::invalid_argument(e.to_string()))?;

        let accepted = self.registry.handle_register(info);

        Ok(tonic::Response::new(
            proto::RegisterInterpreterProcessResponse { accepted },
        ))
    }

    async fn handle_interpreter_result(
        &self,
        request: tonic::Request<proto::HandleInterpreterResultRequest>,
    ) -> tonic::Result<tonic::Response<proto::HandleInterpreterResultResponse>> {
        let request = request.into_inner();

        let result = match InterpreterResult::from_json(&request.result) {
            Ok(result) => Some(result),
            Err(e) => {
                tracing::warn!(
                    interpreter_job_uuid = %request.interpreter_job_uuid,
                    "unparsable interpreter result: {}",
                    e
                );
                None
            }
        };

        self.results
            .handle(&request.interpreter_job_uuid, result)
            .await
            .map_err(|e| tonic::Status::internal(e.to_string()))?;

        Ok(tonic::Response::new(
            proto::HandleInterpreterResultResponse {},
        ))
    }

    async fn handle_interpreter_temp_output(
        &self,
        request: tonic::Request<proto::HandleInterpreterTempOutputRequest>,
    ) -> tonic::Result<tonic::Response<proto::HandleInterpreterTempOutputResponse>> {
        let request = request.into_inner();

        self.results
            .handle_temp_output(&request.interpreter_job_uuid, request.text)
            .await
            .map_err(|e| tonic::Status::internal(e.to_string()))?;

        Ok(tonic::Response::new(
            proto::HandleInterpreterTempOutputResponse {},
        ))
    }
}
