use actix_web::{middleware, web, App, HttpServer};
use folio_core::config::api::Api;
use tokio_util::sync::CancellationToken;

mod metrics;

/// Serves `/prometheus/metrics` until `token` is cancelled.
pub async fn start_server(api: Api, token: CancellationToken) -> anyhow::Result<()> {
    let registry = web::Data::new(metrics::SchedulerMetrics::new()?);

    let server = HttpServer::new(move || {
        App::new()
            .app_data(registry.clone())
            .wrap(middleware::NormalizePath::trim())
            .wrap(actix_cors::Cors::permissive())
            .service(web::scope("/prometheus").configure(metrics::routes))
    })
    .disable_signals()
    .bind((api.address.as_str(), api.http_port))?
    .run();

    let handle = server.handle();

    tracing::info!(address = %api.address, port = api.http_port, "http server listening");

    tokio::select! {
        result = server => result?,
        _ = token.cancelled() => handle.stop(true).await,
    }

    Ok(())
}
