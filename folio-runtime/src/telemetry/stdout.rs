use folio_core::config::telemetry::Stdout;
use tracing_subscriber::filter::EnvFilter;
use tracing_subscriber::Layer;

use super::BoxedLayer;

pub fn layer(config: &Stdout) -> anyhow::Result<BoxedLayer> {
    let filter = EnvFilter::try_new(config.filter.as_deref().unwrap_or("info"))?;

    Ok(tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_filter(filter)
        .boxed())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_directives_are_validated() {
        let per_crate = Stdout {
            filter: Some("folio_scheduler=debug,sqlx=warn".to_string()),
        };
        assert!(layer(&per_crate).is_ok());

        let broken = Stdout {
            filter: Some("folio_scheduler=loud".to_string()),
        };
        assert!(layer(&broken).is_err());
    }
}
