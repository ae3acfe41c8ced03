use serde::Deserialize;

#[derive(Debug, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Api {
    #[serde(default = "default_address")]
    pub address: String,
    #[serde(default = "default_rpc_port")]
    pub rpc_port: u16,
    #[serde(default = "default_http_port")]
    pub http_port: u16,

    /// Host handed to launched interpreters for their callbacks. Falls back to `address`.
    pub callback_host: Option<String>,
}

impl Api {
    pub fn callback_host(&self) -> String {
        self.callback_host
            .clone()
            .unwrap_or_else(|| self.address.clone())
    }
}

impl Default for Api {
    fn default() -> Self {
        Self {
            address: default_address(),
            rpc_port: default_rpc_port(),
            http_port: default_http_port(),
            callback_host: None,
        }
    }
}

fn default_address() -> String {
    "127.0.0.1".to_string()
}

fn default_rpc_port() -> u16 {
    6020
}

fn default_http_port() -> u16 {
    6021
}
