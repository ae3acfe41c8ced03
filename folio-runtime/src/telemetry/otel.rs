use folio_core::config::telemetry::OpenTelemetry;
use opentelemetry::sdk::{trace, Resource};
use opentelemetry::{runtime, KeyValue};
use opentelemetry_otlp::WithExportConfig;
use tracing_subscriber::Layer;

use super::BoxedLayer;

const SERVICE_NAME: &str = "service.name";

/// Batched OTLP export over gRPC. `service.name` defaults to the binary name.
pub fn layer(config: &OpenTelemetry) -> anyhow::Result<BoxedLayer> {
    let tracer = opentelemetry_otlp::new_pipeline()
        .tracing()
        .with_exporter(
            opentelemetry_otlp::new_exporter()
                .tonic()
                .with_endpoint(config.endpoint.clone()),
        )
        .with_trace_config(trace::config().with_resource(Resource::new(resource_attributes(config))))
        .install_batch(runtime::Tokio)?;

    Ok(tracing_opentelemetry::layer().with_tracer(tracer).boxed())
}

fn resource_attributes(config: &OpenTelemetry) -> Vec<KeyValue> {
    let mut attributes: Vec<KeyValue> = config
        .entity_attributes
        .iter()
        .map(|(key, value)| KeyValue::new(key.clone(), value.clone()))
        .collect();

    if !config.entity_attributes.contains_key(SERVICE_NAME) {
        attributes.push(KeyValue::new(SERVICE_NAME, env!("CARGO_PKG_NAME")));
    }

    attributes
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn otel(attributes: &[(&str, &str)]) -> OpenTelemetry {
        OpenTelemetry {
            endpoint: "http://localhost:4317".to_string(),
            entity_attributes: attributes
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect::<HashMap<_, _>>(),
        }
    }

    fn service_name(attributes: &[KeyValue]) -> Option<String> {
        attributes
            .iter()
            .find(|kv| kv.key.as_str() == SERVICE_NAME)
            .map(|kv| kv.value.to_string())
    }

    #[test]
    fn test_service_name_defaults_to_binary() {
        let attributes = resource_attributes(&otel(&[("deployment.environment", "staging")]));

        assert_eq!(attributes.len(), 2);
        assert_eq!(service_name(&attributes).as_deref(), Some("folio-runtime"));
    }

    #[test]
    fn test_configured_service_name_wins() {
        let attributes = resource_attributes(&otel(&[(SERVICE_NAME, "folio-eu")]));

        assert_eq!(attributes.len(), 1);
        assert_eq!(service_name(&attributes).as_deref(), Some("folio-eu"));
    }
}
