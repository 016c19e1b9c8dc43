//! Configuration system for editbridge.
//!
//! A single user-level file (`~/.config/editbridge/config.toml`) configures
//! the host. Every section is optional; missing keys fall back to defaults.

use std::{
  path::{Path, PathBuf},
  time::Duration,
};

use serde::{Deserialize, Serialize};

use crate::dirs;

// ============================================================================
// Host Configuration
// ============================================================================

/// Where the host listens and where it writes invocation shims
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct HostConfig {
  /// Unix socket path (default: $XDG_RUNTIME_DIR/editbridge.sock)
  #[serde(skip_serializing_if = "Option::is_none")]
  pub socket_path: Option<PathBuf>,

  /// Directory for the git-editor shims (default: $XDG_RUNTIME_DIR/editbridge)
  #[serde(skip_serializing_if = "Option::is_none")]
  pub runtime_dir: Option<PathBuf>,
}

// ============================================================================
// Editor Configuration
// ============================================================================

/// How the host opens files and how long it waits for them to close
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
  /// Editor command line; the file path is appended as the last argument.
  /// Must block until the file is closed (e.g. "code --wait", "gvim -f").
  /// Falls back to $VISUAL, then $EDITOR, then "vi".
  #[serde(skip_serializing_if = "Option::is_none")]
  pub command: Option<String>,

  /// Seconds to wait for the editor view to close (0 = wait forever)
  pub wait_timeout_secs: u64,
}

// ============================================================================
// Log Configuration
// ============================================================================

/// Host logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
  /// Log level: "off", "error", "warn", "info", "debug", "trace"
  /// Default: "info"
  #[serde(default = "default_log_level")]
  pub level: String,

  /// Log file rotation: "daily", "hourly", "never"
  /// Default: "daily"
  #[serde(default = "default_log_rotation")]
  pub rotation: String,
}

fn default_log_level() -> String {
  "info".to_string()
}
fn default_log_rotation() -> String {
  "daily".to_string()
}

impl Default for LogConfig {
  fn default() -> Self {
    Self {
      level: default_log_level(),
      rotation: default_log_rotation(),
    }
  }
}

// ============================================================================
// Main Configuration
// ============================================================================

/// editbridge configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
  /// Socket and shim locations
  #[serde(default)]
  pub host: HostConfig,

  /// Editor command and wait behavior
  #[serde(default)]
  pub editor: EditorConfig,

  /// Logging settings
  #[serde(default)]
  pub log: LogConfig,
}

impl Config {
  /// Load the user config, falling back to defaults
  pub fn load() -> Self {
    Self::load_from(&Self::user_config_path())
  }

  /// Load config from a specific file, falling back to defaults if it is
  /// missing or does not parse
  pub fn load_from(path: &Path) -> Self {
    if path.exists()
      && let Ok(content) = std::fs::read_to_string(path)
      && let Ok(config) = toml::from_str(&content)
    {
      return config;
    }

    Self::default()
  }

  /// Get the user-level config path
  pub fn user_config_path() -> PathBuf {
    dirs::default_config_dir().join("config.toml")
  }

  /// Effective socket path
  pub fn socket_path(&self) -> PathBuf {
    self.host.socket_path.clone().unwrap_or_else(dirs::default_socket_path)
  }

  /// Effective shim directory
  pub fn runtime_dir(&self) -> PathBuf {
    self.host.runtime_dir.clone().unwrap_or_else(dirs::default_runtime_dir)
  }

  /// Wait timeout, `None` when waits are unbounded
  pub fn wait_timeout(&self) -> Option<Duration> {
    match self.editor.wait_timeout_secs {
      0 => None,
      secs => Some(Duration::from_secs(secs)),
    }
  }

  /// Editor command split into program and arguments.
  ///
  /// Uses `editor.command`, then `$VISUAL`, then `$EDITOR`, then `vi`.
  pub fn editor_command(&self) -> Vec<String> {
    choose_editor(
      self.editor.command.clone(),
      std::env::var("VISUAL").ok(),
      std::env::var("EDITOR").ok(),
    )
  }

  /// Generate a default config file as a string
  pub fn generate_template() -> String {
    r#"# editbridge configuration
# Place in ~/.config/editbridge/config.toml

# ============================================================================
# Host
# ============================================================================

[host]
# Unix socket the host listens on (default: $XDG_RUNTIME_DIR/editbridge.sock)
# socket_path = "/run/user/1000/editbridge.sock"

# Directory for the git-editor shims (default: $XDG_RUNTIME_DIR/editbridge)
# runtime_dir = "/run/user/1000/editbridge"

# ============================================================================
# Editor
# ============================================================================

[editor]
# Command used to open files. The path is appended as the last argument and
# the command must block until the file is closed.
# Falls back to $VISUAL, then $EDITOR, then "vi".
# command = "code --wait"

# Seconds to wait for an editor view to close (0 = wait forever)
wait_timeout_secs = 0

# ============================================================================
# Logging
# ============================================================================

[log]
# Log level: off, error, warn, info, debug, trace
level = "info"

# Log file rotation when logging to a file: daily, hourly, never
rotation = "daily"
"#
    .to_string()
  }
}

/// First non-blank command line among the candidates, split into words
fn choose_editor(configured: Option<String>, visual: Option<String>, editor: Option<String>) -> Vec<String> {
  let non_blank = |line: Option<String>| line.filter(|l| !l.trim().is_empty());
  let line = non_blank(configured)
    .or_else(|| non_blank(visual))
    .or_else(|| non_blank(editor))
    .unwrap_or_else(|| "vi".to_string());

  line.split_whitespace().map(String::from).collect()
}
