use serde::Deserialize;

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct Persistence {
    pub database_connection_string: String,
    pub max_connections: Option<u32>,
}
