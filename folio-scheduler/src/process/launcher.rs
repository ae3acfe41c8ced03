use std::process::Stdio;
use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use folio_core::errors::Error;
use folio_core::types;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::{Child, Command};

/// What a launched interpreter needs to find its way back to the scheduler.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LaunchRequest {
    pub shebang: String,
    pub callback_host: String,
    pub callback_port: u16,
    pub class_name: String,
    pub class_path: String,
    pub remote_server_class_path: Option<String>,
    pub pool_size: u32,
}

#[async_trait]
pub trait Launcher: Send + Sync {
    /// Starts the process and returns without waiting for it to register.
    async fn launch(&self, request: &LaunchRequest) -> types::Result<()>;

    /// True once a process started by this launcher has exited.
    fn has_exited(&self, shebang: &str) -> bool;

    async fn kill(&self, shebang: &str) -> types::Result<()>;
}

pub struct ProcessLauncher {
    command: Option<String>,
    args: Vec<String>,
    children: DashMap<String, Child>,
}

impl ProcessLauncher {
    pub fn new(command: Option<String>, args: Vec<String>) -> Arc<dyn Launcher> {
        Arc::new(Self {
            command,
            args,
            children: DashMap::new(),
        })
    }

    fn render_args(&self, request: &LaunchRequest) -> Vec<String> {
        let remote_server_class_path = request.remote_server_class_path.clone().unwrap_or_default();

        self.args
            .iter()
            .map(|arg| {
                arg.replace("{host}", &request.callback_host)
                    .replace("{port}", &request.callback_port.to_string())
                    .replace("{shebang}", &request.shebang)
                    .replace("{classPath}", &request.class_path)
                    .replace("{className}", &request.class_name)
                    .replace("{remoteServerClassPath}", &remote_server_class_path)
                    .replace("{poolSize}", &request.pool_size.to_string())
            })
            .collect()
    }
}

fn forward_output<R>(shebang: String, stream: &'static str, reader: R)
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut lines = BufReader::new(reader).lines();

        while let Ok(Some(line)) = lines.next_line().await {
            tracing::debug!(shebang = %shebang, stream, "{}", line);
        }
    });
}

#[async_trait]
impl Launcher for ProcessLauncher {
    async fn launch(&self, request: &LaunchRequest) -> types::Result<()> {
        let command = self.command.clone().ok_or_else(|| Error::Configuration {
            message: "interpreter.launchCommand is not set".to_string(),
            source: anyhow::anyhow!("missing launch command"),
        })?;

        if request.class_name.is_empty() {
            return Err(Error::Configuration {
                message: format!("no implementation class configured for '{}'", request.shebang),
                source: anyhow::anyhow!("empty class name"),
            });
        }

        // a stale child for the same shebang must not outlive its replacement
        self.kill(&request.shebang).await?;

        let args = self.render_args(request);

        let mut child = Command::new(&command)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| Error::Launch {
                shebang: request.shebang.clone(),
                message: format!("failed to spawn '{}'", command),
                source: e.into(),
            })?;

        if let Some(stdout) = child.stdout.take() {
            forward_output(request.shebang.clone(), "stdout", stdout);
        }

        if let Some(stderr) = child.stderr.take() {
            forward_output(request.shebang.clone(), "stderr", stderr);
        }

        tracing::info!(
            shebang = %request.shebang,
            pid = child.id().unwrap_or_default(),
            "launched interpreter process"
        );

        self.children.insert(request.shebang.clone(), child);

        Ok(())
    }

    fn has_exited(&self, shebang: &str) -> bool {
        let Some(mut child) = self.children.get_mut(shebang) else {
            return false;
        };

        match child.try_wait() {
            Ok(Some(status)) => {
                tracing::warn!(shebang = %shebang, "interpreter process exited with {}", status);
                true
            }
            Ok(None) => false,
            Err(e) => {
                tracing::warn!(shebang = %shebang, "failed to poll interpreter process: {}", e);
                true
            }
        }
    }

    async fn kill(&self, shebang: &str) -> types::Result<()> {
        if let Some((_, mut child)) = self.children.remove(shebang) {
            if let Err(e) = child.kill().await {
                tracing::warn!(shebang = %shebang, "failed to kill interpreter process: {}", e);
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> LaunchRequest {
        LaunchRequest {
            shebang: "%python".to_string(),
            callback_host: "10.0.0.5".to_string(),
            callback_port: 6020,
            class_name: "org.example.PythonInterpreter".to_string(),
            class_path: "/opt/python/*".to_string(),
            remote_server_class_path: Some("/opt/server".to_string()),
            pool_size: 2,
        }
    }

    #[test]
    fn renders_placeholders() {
        let launcher = ProcessLauncher {
            command: Some("java".to_string()),
            args: vec![
                "-cp".to_string(),
                "{remoteServerClassPath}/*:{classPath}".to_string(),
                "-h".to_string(),
                "{host}".to_string(),
                "-p".to_string(),
                "{port}".to_string(),
                "-sb".to_string(),
                "{shebang}".to_string(),
                "-cn".to_string(),
                "{className}".to_string(),
                "-pool".to_string(),
                "{poolSize}".to_string(),
            ],
            children: DashMap::new(),
        };

        assert_eq!(
            launcher.render_args(&request()),
            vec![
                "-cp",
                "/opt/server/*:/opt/python/*",
                "-h",
                "10.0.0.5",
                "-p",
                "6020",
                "-sb",
                "%python",
                "-cn",
                "org.example.PythonInterpreter",
                "-pool",
                "2"
            ]
        );
    }

    #[tokio::test]
    async fn missing_command_is_a_configuration_error() {
        let launcher = ProcessLauncher::new(None, vec![]);

        let err = launcher.launch(&request()).await.unwrap_err();

        assert!(matches!(err, Error::Configuration { .. }));
        assert!(!launcher.has_exited("%python"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn detects_exited_child() {
        let launcher = ProcessLauncher::new(Some("true".to_string()), vec![]);

        launcher.launch(&request()).await.unwrap();

        let mut exited = false;
        for _ in 0..50 {
            if launcher.has_exited("%python") {
                exited = true;
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        }

        assert!(exited);
        launcher.kill("%python").await.unwrap();
    }
}
