use std::future::Future;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;

use anyhow::Context;
use tokio::net::TcpStream;
use tokio::process::{Child, Command};
use tokio::time::{sleep, timeout, Instant};
use tracing::{debug, info, warn};

use super::errors::CoreError;

#[derive(Debug, Clone)]
pub struct BrowserConfig {
    pub headless: bool,
    pub binary_path: String,
    pub debugging_port: u16,
    pub profile_dir: Option<PathBuf>,
    pub startup_timeout: Duration,
}

/// A running browser the agent attaches to through its debugging endpoint.
#[derive(Debug)]
pub struct BrowserSession {
    pub debugging_url: String,
    process: Option<Child>,
}

impl BrowserSession {
    pub fn new(debugging_url: impl Into<String>) -> Self {
        Self {
            debugging_url: debugging_url.into(),
            process: None,
        }
    }

    fn with_process(debugging_url: String, process: Child) -> Self {
        Self {
            debugging_url,
            process: Some(process),
        }
    }
}

pub trait BrowserProvider: Send + Sync {
    fn launch(
        &self,
        config: &BrowserConfig,
    ) -> impl Future<Output = anyhow::Result<BrowserSession>> + Send;

    fn close(&self, session: BrowserSession) -> impl Future<Output = anyhow::Result<()>> + Send;
}

/// Starts a local Chrome-family browser with a visible window and a remote
/// debugging port.
#[derive(Debug, Default, Clone)]
pub struct ChromeLauncher;

impl ChromeLauncher {
    pub fn new() -> Self {
        Self
    }
}

impl BrowserProvider for ChromeLauncher {
    fn launch(
        &self,
        config: &BrowserConfig,
    ) -> impl Future<Output = anyhow::Result<BrowserSession>> + Send {
        let config = config.clone();
        async move {
            let profile_dir = match &config.profile_dir {
                Some(dir) => dir.clone(),
                None => std::env::temp_dir().join("talent-finder-browser-profile"),
            };
            tokio::fs::create_dir_all(&profile_dir)
                .await
                .with_context(|| format!("failed to create {}", profile_dir.display()))?;

            let mut command = Command::new(&config.binary_path);
            command
                .arg(format!("--remote-debugging-port={}", config.debugging_port))
                .arg(format!("--user-data-dir={}", profile_dir.display()))
                .arg("--no-first-run")
                .arg("--no-default-browser-check")
                .stdin(Stdio::null())
                .stdout(Stdio::null())
                .stderr(Stdio::null())
                .kill_on_drop(true);
            if config.headless {
                command.arg("--headless=new");
            }

            let mut child = command.spawn().map_err(|err| {
                CoreError::BrowserLaunch(format!("could not start {}: {err}", config.binary_path))
            })?;

            info!(
                binary = %config.binary_path,
                port = config.debugging_port,
                headless = config.headless,
                "browser process started"
            );

            let address = format!("127.0.0.1:{}", config.debugging_port);
            let deadline = Instant::now() + config.startup_timeout;
            loop {
                if let Some(status) = child.try_wait()? {
                    return Err(CoreError::BrowserLaunch(format!(
                        "browser exited during startup with {status}"
                    ))
                    .into());
                }

                if TcpStream::connect(&address).await.is_ok() {
                    break;
                }

                if Instant::now() >= deadline {
                    let _ = child.start_kill();
                    return Err(CoreError::BrowserLaunch(format!(
                        "debugging port {} not ready after {:?}",
                        config.debugging_port, config.startup_timeout
                    ))
                    .into());
                }

                sleep(Duration::from_millis(250)).await;
            }

            debug!(%address, "browser debugging endpoint ready");
            Ok(BrowserSession::with_process(format!("http://{address}"), child))
        }
    }

    fn close(&self, mut session: BrowserSession) -> impl Future<Output = anyhow::Result<()>> + Send {
        async move {
            let Some(mut child) = session.process.take() else {
                return Ok(());
            };

            child.start_kill()?;
            match timeout(Duration::from_secs(10), child.wait()).await {
                Ok(status) => {
                    let status = status?;
                    debug!(%status, "browser process exited");
                }
                Err(_) => warn!("browser did not exit within 10s after kill"),
            }
            Ok(())
        }
    }
}
