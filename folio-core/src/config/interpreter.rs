use std::time::Duration;

use serde::Deserialize;

#[derive(Debug, Deserialize, Clone)]
#[serde(rename_all = "camelCase", default)]
pub struct Interpreter {
    /// Program used to start a remote interpreter server.
    pub launch_command: Option<String>,

    /// Arguments for `launch_command`. Supports the placeholders `{host}`, `{port}`,
    /// `{shebang}`, `{classPath}`, `{className}`, `{remoteServerClassPath}` and `{poolSize}`.
    pub launch_args: Vec<String>,

    pub remote_server_class_path: Option<String>,
    pub registration_timeout_seconds: u64,
    pub rpc_timeout_millis: u64,
    pub connection_pool_size: usize,
    pub connection_checkout_timeout_millis: u64,

    /// Worker threads requested from each interpreter process.
    pub pool_size: u32,
}

impl Interpreter {
    pub fn registration_timeout(&self) -> Duration {
        Duration::from_secs(self.registration_timeout_seconds)
    }

    pub fn rpc_timeout(&self) -> Duration {
        Duration::from_millis(self.rpc_timeout_millis)
    }

    pub fn connection_checkout_timeout(&self) -> Duration {
        Duration::from_millis(self.connection_checkout_timeout_millis)
    }
}

impl Default for Interpreter {
    fn default() -> Self {
        Self {
            launch_command: None,
            launch_args: Vec::new(),
            remote_server_class_path: None,
            registration_timeout_seconds: 60,
            rpc_timeout_millis: 5000,
            connection_pool_size: 4,
            connection_checkout_timeout_millis: 1000,
            pool_size: 1,
        }
    }
}
