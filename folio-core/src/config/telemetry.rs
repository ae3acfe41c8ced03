use std::collections::HashMap;

use serde::Deserialize;

#[derive(Deserialize, Debug, Clone, Default)]
pub struct Telemetry {
    pub stdout: Option<Stdout>,
    pub opentelemetry: Option<OpenTelemetry>,
}

#[derive(Deserialize, Debug, Clone)]
pub struct Stdout {
    /// `EnvFilter` directives, `info` when absent.
    pub filter: Option<String>,
}

#[derive(Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct OpenTelemetry {
    pub endpoint: String,
    #[serde(default)]
    pub entity_attributes: HashMap<String, String>,
}
