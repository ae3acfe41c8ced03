use std::net::SocketAddr;

use anyhow::anyhow;
use folio_core::config::Config;
use folio_scheduler::scheduler::Scheduler;
use tokio_util::sync::CancellationToken;

use crate::rpc::event::EventRpcService;

pub mod event;

pub trait Service: Send + Sync {
    fn register_rpc(
        &self,
        server: tonic::transport::server::Router,
    ) -> tonic::transport::server::Router;
}

pub async fn start_server(
    config: Config,
    scheduler: Scheduler,
    token: CancellationToken,
) -> anyhow::Result<()> {
    let event_service = EventRpcService::new(&scheduler);

    let (_, health_service) = tonic_health::server::health_reporter();

    let mut rpc_server = tonic::transport::Server::builder().add_service(health_service);

    rpc_server = event_service.register_rpc(rpc_server);

    let addr: SocketAddr = format!("{}:{}", config.api.address, config.api.rpc_port)
        .parse()
        .map_err(|e| anyhow!("invalid rpc address: {}", e))?;

    tracing::info!("starting rpc server on {}", addr);

    rpc_server
        .serve_with_shutdown(addr, async move { token.cancelled().await })
        .await?;

    Ok(())
}
