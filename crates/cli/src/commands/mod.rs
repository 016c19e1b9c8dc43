//! CLI command implementations

mod config;
mod edit;
mod env;
mod host;
mod status;

pub use config::{cmd_config_init, cmd_config_show};
pub use edit::{cmd_edit, cmd_script, script_entry};
pub use env::cmd_env;
pub use host::cmd_host;
pub use status::cmd_status;

/// Socket of the host this process should talk to.
///
/// A helper launched by git inherits `VSCODE_GIT_IPC_HANDLE`; otherwise the
/// configured socket is used.
fn host_socket_path() -> std::path::PathBuf {
  match std::env::var_os(editbridge::editor::env::IPC_HANDLE_VAR) {
    Some(handle) if !handle.is_empty() => handle.into(),
    _ => editbridge::config::Config::load().socket_path(),
  }
}
