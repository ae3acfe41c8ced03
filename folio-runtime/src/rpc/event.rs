use folio_rpc::proto::interpreter::FILE_DESCRIPTOR_SET;
use folio_scheduler::gateway::EventService;
use folio_scheduler::scheduler::Scheduler;

use super::Service;

pub struct EventRpcService {
    inner: EventService,
}

impl EventRpcService {
    pub fn new(scheduler: &Scheduler) -> Box<dyn Service> {
        Box::new(Self {
            inner: EventService::new(scheduler),
        })
    }
}

impl Service for EventRpcService {
    fn register_rpc(
        &self,
        server: tonic::transport::server::Router,
    ) -> tonic::transport::server::Router {
        let server = server.add_service(self.inner.clone().into_server());

        match tonic_reflection::server::Builder::configure()
            .register_encoded_file_descriptor_set(FILE_DESCRIPTOR_SET)
            .build()
        {
            Ok(reflector) => server.add_service(reflector),
            Err(e) => {
                tracing::warn!("rpc reflection disabled: {}", e);
                server
            }
        }
    }
}
