//! Host command

use anyhow::{Context, Result, bail};
use editbridge::{Daemon, RuntimeConfig};
use tracing::info;

/// Run the host in the foreground until ctrl-c
pub async fn cmd_host() -> Result<()> {
  let runtime_config = RuntimeConfig::load().await;

  if editbridge::dirs::is_host_running(&runtime_config.socket_path) {
    bail!("A host is already listening on {:?}", runtime_config.socket_path);
  }

  info!("Starting editbridge host");
  Daemon::new(runtime_config).run().await.context("Failed to run host")?;

  Ok(())
}
