//! Edit command and the script-runner entry the editor shim re-enters

use std::path::Path;

use anyhow::{Context, Result};
use editbridge::editor::{self, ScriptEntry, env::RUN_AS_NODE_VAR};
use tracing::debug;

/// Detect script-runner mode.
///
/// The editor shim runs `<host binary> <entry script> [args...]` with
/// `ELECTRON_RUN_AS_NODE=1`. Returns the entry and the arguments after it.
pub fn script_entry() -> Option<(ScriptEntry, Vec<String>)> {
  if std::env::var(RUN_AS_NODE_VAR).ok().as_deref() != Some("1") {
    return None;
  }

  let mut args = std::env::args().skip(1);
  let entry = ScriptEntry::from_path(Path::new(&args.next()?))?;
  Some((entry, args.collect()))
}

/// Run an entry script. Returns the process exit code.
pub async fn cmd_script(entry: ScriptEntry, args: Vec<String>) -> i32 {
  match entry {
    ScriptEntry::GitEditorMain => {
      // Git passes the message file as the last argument
      match request_edit(args.last().cloned()).await {
        Ok(()) => 0,
        Err(e) => {
          eprintln!("{:#}", e);
          1
        }
      }
    }
  }
}

/// Ask the host to edit `path` and wait until the user is done
pub async fn cmd_edit(path: Option<String>) -> Result<()> {
  request_edit(path).await
}

async fn request_edit(path: Option<String>) -> Result<()> {
  let socket_path = super::host_socket_path();
  let path = path.filter(|p| !p.is_empty()).map(absolute).transpose()?;
  debug!(socket = %socket_path.display(), path = ?path, "Requesting edit");

  let result = editor::request_edit(&socket_path, path)
    .await
    .with_context(|| format!("Edit request to {:?} failed", socket_path))?;
  debug!(result = ?result, "Edit finished");

  Ok(())
}

/// Resolve against this process's working directory; the host runs elsewhere.
fn absolute(path: String) -> Result<String> {
  let resolved = std::path::absolute(&path).with_context(|| format!("Invalid path: {}", path))?;
  Ok(resolved.display().to_string())
}
