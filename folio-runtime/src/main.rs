mod http;
mod rpc;
mod shutdown;
mod telemetry;

use std::sync::Arc;

use folio_core::config::Config;
use folio_scheduler::event::LoggingEventSink;
use folio_scheduler::process::client::GrpcClientFactory;
use folio_scheduler::process::launcher::ProcessLauncher;
use folio_scheduler::scheduler::{Scheduler, SchedulerDeps};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenv::dotenv();

    let config = Config::new()?;

    let _telemetry = telemetry::setup(&config.telemetry)?;

    let connection = folio_persistence::database_connection(&config.persistence).await?;
    folio_persistence::apply_migrations(&connection).await?;

    let token = shutdown::install_shutdown_handler()?;

    let scheduler = Scheduler::new(
        &config,
        connection.clone(),
        SchedulerDeps {
            options: folio_scheduler::interpreter_option::service::Service::new(connection),
            launcher: ProcessLauncher::new(
                config.interpreter.launch_command.clone(),
                config.interpreter.launch_args.clone(),
            ),
            client_factory: GrpcClientFactory::new(config.interpreter.rpc_timeout()),
            events: Arc::new(LoggingEventSink),
            notes: None,
        },
    );

    scheduler.restore_state().await?;

    let cycles = scheduler.start(token.clone());

    let rpc_server = tokio::task::spawn(rpc::start_server(
        config.clone(),
        scheduler.clone(),
        token.clone(),
    ));
    let http_server = tokio::task::spawn(http::start_server(config.api.clone(), token.clone()));

    tokio::select! {
        _ = token.cancelled() => {}
        result = rpc_server => {
            tracing::error!("rpc server exited: {:?}", result);
            token.cancel();
        }
        result = http_server => {
            tracing::error!("http server exited: {:?}", result);
            token.cancel();
        }
    }

    cycles.await?;
    scheduler.shutdown().await;

    tracing::info!("shutdown complete");

    Ok(())
}
