pub mod api;
pub mod interpreter;
pub mod persistence;
pub mod scheduler;
pub mod telemetry;

use serde::Deserialize;
use std::{env, path::Path};

use self::{
    api::Api, interpreter::Interpreter, persistence::Persistence, scheduler::Scheduler,
    telemetry::Telemetry,
};

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub api: Api,
    pub persistence: Persistence,
    #[serde(default)]
    pub scheduler: Scheduler,
    #[serde(default)]
    pub interpreter: Interpreter,
    #[serde(default)]
    pub telemetry: Telemetry,
}

impl Config {
    fn get_config_dir() -> anyhow::Result<String> {
        let mut path = env::current_exe()?;
        path.pop();
        path.push("config");

        if !path.is_dir() {
            if Path::new("folio-runtime/config").is_dir() {
                return Ok("folio-runtime/config".into());
            }

            if Path::new("config").is_dir() {
                return Ok("config".into());
            }

            return Err(anyhow::anyhow!("default config dir was not found"));
        }

        match path.to_str() {
            Some(v) => Ok(v.into()),
            _ => Err(anyhow::anyhow!("failed to get default config dir")),
        }
    }

    fn custom(run_mode: String, config_dir: String) -> anyhow::Result<Self> {
        let config = config::Config::builder()
            .add_source(config::File::with_name(&format!("{}/default", config_dir)))
            // optional per-environment overrides, 'development' unless told otherwise
            .add_source(
                config::File::with_name(&format!("{}/{}", config_dir, run_mode)).required(false),
            )
            // never checked in
            .add_source(config::File::with_name(&format!("{}/local", config_dir)).required(false))
            // Eg.. `FOLIO_RUNTIME_API__ADDRESS=0.0.0.0` sets `api.address`
            .add_source(config::Environment::with_prefix("folio_runtime").separator("__"))
            .build()?;

        Ok(config.try_deserialize()?)
    }

    pub fn custom_run_mode(run_mode: String) -> anyhow::Result<Self> {
        let config_dir = match env::var("FOLIO_RUNTIME_CONFIG_DIR") {
            Ok(dir) => dir,
            Err(_) => Self::get_config_dir()?,
        };

        Self::custom(run_mode, config_dir)
    }

    pub fn new() -> anyhow::Result<Self> {
        let run_mode = env::var("FOLIO_RUNTIME_RUN_MODE").unwrap_or_else(|_| "development".into());
        Self::custom_run_mode(run_mode)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loads_layered_config_from_dir() -> anyhow::Result<()> {
        let dir = env::temp_dir().join(format!("folio-config-{}", std::process::id()));
        std::fs::create_dir_all(&dir)?;

        std::fs::write(
            dir.join("default.toml"),
            r#"
[api]
address = "127.0.0.1"
rpcPort = 7000

[persistence]
databaseConnectionString = "sqlite::memory:"

[scheduler]
deathThreshold = 3
"#,
        )?;

        std::fs::write(
            dir.join("test.toml"),
            r#"
[scheduler]
pendingPollIntervalMillis = 50
"#,
        )?;

        let config = Config::custom("test".into(), dir.to_string_lossy().to_string())?;

        assert_eq!(config.api.rpc_port, 7000);
        assert_eq!(config.scheduler.death_threshold, 3);
        assert_eq!(config.scheduler.pending_poll_interval_millis, 50);
        assert_eq!(config.scheduler.abort_poll_interval_millis, 1000);
        assert_eq!(config.interpreter.connection_pool_size, 4);
        assert!(config.telemetry.stdout.is_none());

        std::fs::remove_dir_all(&dir)?;

        Ok(())
    }
}
