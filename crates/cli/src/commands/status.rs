//! Status command

use anyhow::{Context, Result};
use editbridge::ipc::{Client, types::system::StatusParams};

/// Show what a running host is serving
pub async fn cmd_status(json: bool) -> Result<()> {
  let socket_path = super::host_socket_path();
  let client = Client::connect_to(&socket_path)
    .await
    .context("Host is not running. Start with: editbridge host")?;

  let status = client.call_typed(StatusParams {}).await.context("Failed to get status")?;

  if json {
    println!("{}", serde_json::to_string_pretty(&status)?);
    return Ok(());
  }

  println!("editbridge host");
  println!("===============\n");
  println!("Socket:         {}", status.socket_path);
  println!("Commands:       {}", status.commands.join(", "));

  if status.views.is_empty() {
    println!("Open views:     none");
  } else {
    println!("Open views:     {}", status.views.len());
    for view in &status.views {
      println!("                - {} {}", view.id, view.path);
    }
  }

  Ok(())
}
