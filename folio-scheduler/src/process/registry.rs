use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use folio_core::config::Config;
use folio_core::option::{InterpreterOption, InterpreterOptionRepository};
use folio_core::remote::{PingOutcome, RegisterInfo};

use crate::metric;
use crate::process::client::ClientFactory;
use crate::process::launcher::{LaunchRequest, Launcher};
use crate::process::pool::ConnectionPool;
use crate::process::{InterpreterProcess, ProcessStatus};

#[derive(Clone, Debug)]
pub struct RegistrySettings {
    pub callback_host: String,
    pub callback_port: u16,
    pub remote_server_class_path: Option<String>,
    pub pool_size: u32,
    pub connection_pool_size: usize,
    pub connection_checkout_timeout: Duration,
    pub registration_timeout: Duration,
}

impl From<&Config> for RegistrySettings {
    fn from(config: &Config) -> Self {
        Self {
            callback_host: config.api.callback_host(),
            callback_port: config.api.rpc_port,
            remote_server_class_path: config.interpreter.remote_server_class_path.clone(),
            pool_size: config.interpreter.pool_size,
            connection_pool_size: config.interpreter.connection_pool_size,
            connection_checkout_timeout: config.interpreter.connection_checkout_timeout(),
            registration_timeout: config.interpreter.registration_timeout(),
        }
    }
}

/// One handle per shebang plus the consecutive-death counters used by the circuit breaker.
pub struct InterpreterProcessRegistry {
    processes: DashMap<String, InterpreterProcess>,
    death_counters: DashMap<String, u32>,
    launcher: Arc<dyn Launcher>,
    client_factory: Arc<dyn ClientFactory>,
    settings: RegistrySettings,
}

impl InterpreterProcessRegistry {
    pub fn new(
        settings: RegistrySettings,
        launcher: Arc<dyn Launcher>,
        client_factory: Arc<dyn ClientFactory>,
    ) -> Self {
        Self {
            processes: DashMap::new(),
            death_counters: DashMap::new(),
            launcher,
            client_factory,
            settings,
        }
    }

    /// Returns the existing handle, or registers a `Starting` one and launches the process.
    /// Never waits for registration.
    pub async fn get_remote(&self, option: &InterpreterOption) -> InterpreterProcess {
        let process = match self.processes.entry(option.shebang.clone()) {
            Entry::Occupied(entry) => return entry.get().clone(),
            Entry::Vacant(entry) => entry
                .insert(InterpreterProcess::new(
                    option.shebang.clone(),
                    ProcessStatus::Starting,
                ))
                .clone(),
        };

        let request = LaunchRequest {
            shebang: option.shebang.clone(),
            callback_host: self.settings.callback_host.clone(),
            callback_port: self.settings.callback_port,
            class_name: option.class_name.clone(),
            class_path: option.class_path.clone(),
            remote_server_class_path: self.settings.remote_server_class_path.clone(),
            pool_size: self.settings.pool_size,
        };

        match self.launcher.launch(&request).await {
            Ok(()) => process,
            Err(e) => {
                tracing::error!(shebang = %option.shebang, "failed to launch interpreter: {}", e);
                self.set_status(&option.shebang, ProcessStatus::NotFound);

                InterpreterProcess {
                    status: ProcessStatus::NotFound,
                    ..process
                }
            }
        }
    }

    /// Completes a launch. Returns false when no process was being started for the shebang.
    pub fn handle_register(&self, info: RegisterInfo) -> bool {
        let Some(mut process) = self.processes.get_mut(&info.shebang) else {
            tracing::warn!(shebang = %info.shebang, "registration for unknown interpreter process");
            return false;
        };

        if process.status != ProcessStatus::Starting {
            tracing::warn!(
                shebang = %info.shebang,
                "registration while process is {}, ignoring",
                process.status
            );
            return false;
        }

        process.pool = Some(ConnectionPool::new(
            self.client_factory.clone(),
            info.host.clone(),
            info.port,
            self.settings.connection_pool_size,
            self.settings.connection_checkout_timeout,
        ));
        process.uuid = Some(info.process_uuid.clone());
        process.status = ProcessStatus::Ready;

        tracing::info!(
            shebang = %info.shebang,
            process_uuid = %info.process_uuid,
            "interpreter process registered at {}:{}",
            info.host,
            info.port
        );

        true
    }

    pub fn get(&self, shebang: &str) -> Option<InterpreterProcess> {
        self.processes.get(shebang).map(|process| process.clone())
    }

    pub fn processes(&self) -> Vec<InterpreterProcess> {
        self.processes
            .iter()
            .map(|process| process.value().clone())
            .collect()
    }

    /// Uuids of every registered handle, dead ones included until they are reaped.
    pub fn known_process_uuids(&self) -> HashSet<String> {
        self.processes
            .iter()
            .filter_map(|process| process.uuid.clone())
            .collect()
    }

    pub fn dead_processes(&self) -> Vec<InterpreterProcess> {
        self.processes
            .iter()
            .filter(|process| process.status == ProcessStatus::Dead)
            .map(|process| process.value().clone())
            .collect()
    }

    pub fn mark_dead(&self, shebang: &str) {
        if self.set_status(shebang, ProcessStatus::Dead) {
            tracing::warn!(shebang = %shebang, "interpreter process marked dead");
        }
    }

    fn set_status(&self, shebang: &str, status: ProcessStatus) -> bool {
        match self.processes.get_mut(shebang) {
            Some(mut process) => {
                process.status = status;
                true
            }
            None => false,
        }
    }

    /// Drops a handle only if it is still in `status`, so a fresh launch is never discarded.
    pub fn remove_if_status(&self, shebang: &str, status: ProcessStatus) -> Option<InterpreterProcess> {
        self.processes
            .remove_if(shebang, |_, process| process.status == status)
            .map(|(_, process)| process)
    }

    pub fn record_death(&self, shebang: &str) -> u32 {
        metric::interpreter_death_count_metric()
            .with_label_values(&[shebang])
            .inc();

        let mut counter = self.death_counters.entry(shebang.to_string()).or_insert(0);
        *counter += 1;
        *counter
    }

    pub fn reset_death_counter(&self, shebang: &str) {
        self.death_counters.remove(shebang);
    }

    pub fn death_count(&self, shebang: &str) -> u32 {
        self.death_counters
            .get(shebang)
            .map(|counter| *counter)
            .unwrap_or_default()
    }

    /// Asks the process to exit over RPC, then kills the OS process.
    pub async fn force_kill(&self, process: &InterpreterProcess) {
        if process.is_ready() || process.status == ProcessStatus::Dead {
            match process.get_connection().await {
                Ok(connection) => {
                    if let Err(e) = connection.shutdown().await {
                        tracing::debug!(shebang = %process.shebang, "shutdown rpc failed: {}", e);
                    }
                }
                Err(e) => {
                    tracing::debug!(shebang = %process.shebang, "no connection for shutdown: {}", e)
                }
            }
        }

        if let Err(e) = self.launcher.kill(&process.shebang).await {
            tracing::warn!(shebang = %process.shebang, "failed to kill interpreter: {}", e);
        }
    }

    /// Marks processes whose OS process already exited. Returns the shebangs marked.
    pub fn mark_exited(&self) -> Vec<String> {
        let mut marked = Vec::new();

        for process in self.processes() {
            let live = matches!(process.status, ProcessStatus::Starting | ProcessStatus::Ready);

            if live && self.launcher.has_exited(&process.shebang) {
                self.mark_dead(&process.shebang);
                marked.push(process.shebang);
            }
        }

        marked
    }

    /// Marks unhealthy processes dead. Returns the shebangs marked in this pass.
    pub async fn check_health(&self, options: &dyn InterpreterOptionRepository) -> Vec<String> {
        let mut marked = Vec::new();

        for process in self.processes() {
            let healthy = match process.status {
                ProcessStatus::Starting => {
                    if self.launcher.has_exited(&process.shebang) {
                        false
                    } else if process.started_at.elapsed() > self.settings.registration_timeout {
                        tracing::warn!(
                            shebang = %process.shebang,
                            "interpreter did not register within {:?}",
                            self.settings.registration_timeout
                        );
                        false
                    } else {
                        true
                    }
                }
                ProcessStatus::Ready => self.check_ready_process(&process, options).await,
                ProcessStatus::Dead | ProcessStatus::NotFound => true,
            };

            if !healthy {
                self.mark_dead(&process.shebang);
                marked.push(process.shebang.clone());
            }
        }

        marked
    }

    async fn check_ready_process(
        &self,
        process: &InterpreterProcess,
        options: &dyn InterpreterOptionRepository,
    ) -> bool {
        if self.launcher.has_exited(&process.shebang) {
            return false;
        }

        match options.get_option(&process.shebang).await {
            Ok(Some(option)) if option.enabled => {}
            Ok(_) => {
                tracing::info!(
                    shebang = %process.shebang,
                    "interpreter option removed or disabled, recycling process"
                );
                return false;
            }
            Err(e) => {
                tracing::warn!(shebang = %process.shebang, "failed to load option: {}", e);
                return true;
            }
        }

        // a saturated pool is not a sign of death
        let connection = match process.get_connection().await {
            Ok(connection) => connection,
            Err(e) => {
                tracing::debug!(shebang = %process.shebang, "skipping ping: {}", e);
                return true;
            }
        };

        match connection.ping().await {
            Ok(PingOutcome::Ok) => true,
            Ok(PingOutcome::KillMe) => {
                tracing::info!(shebang = %process.shebang, "interpreter asked to be recycled");
                false
            }
            Err(e) => {
                tracing::warn!(shebang = %process.shebang, "ping failed: {}", e);
                false
            }
        }
    }
}
