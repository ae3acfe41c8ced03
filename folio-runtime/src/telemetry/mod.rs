use folio_core::config::telemetry::Telemetry;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::{Layer, Registry};

mod otel;
mod stdout;

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

/// Flushes exported spans when dropped.
pub struct TelemetryGuard {
    exporting: bool,
}

impl Drop for TelemetryGuard {
    fn drop(&mut self) {
        if self.exporting {
            opentelemetry::global::shutdown_tracer_provider();
        }
    }
}

pub fn setup(config: &Telemetry) -> anyhow::Result<TelemetryGuard> {
    // sqlx reports through `log`
    tracing_log::LogTracer::init()?;

    let mut layers: Vec<BoxedLayer> = Vec::new();

    if let Some(stdout) = &config.stdout {
        layers.push(stdout::layer(stdout)?);
    }

    let exporting = match &config.opentelemetry {
        Some(otel) => {
            layers.push(otel::layer(otel)?);
            true
        }
        None => false,
    };

    tracing::subscriber::set_global_default(Registry::default().with(layers))?;

    Ok(TelemetryGuard { exporting })
}
