use std::path::Path;

use serde::{Deserialize, Serialize};

use super::shim::ShimSet;

pub const GIT_EDITOR_VAR: &str = "GIT_EDITOR";
pub const RUN_AS_NODE_VAR: &str = "ELECTRON_RUN_AS_NODE";
pub const EDITOR_NODE_VAR: &str = "VSCODE_GIT_EDITOR_NODE";
pub const EDITOR_MAIN_VAR: &str = "VSCODE_GIT_EDITOR_MAIN";
/// Set by the server; where helpers find the host
pub const IPC_HANDLE_VAR: &str = "VSCODE_GIT_IPC_HANDLE";

/// Every variable the bridge sets. Processes the host launches must not see
/// them, or an editor started from a bridged shell would run as a helper.
pub const BRIDGE_VARS: [&str; 5] = [
  GIT_EDITOR_VAR,
  RUN_AS_NODE_VAR,
  EDITOR_NODE_VAR,
  EDITOR_MAIN_VAR,
  IPC_HANDLE_VAR,
];

/// Variables that make git use the host as its editor
#[serde_with::skip_serializing_none]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EditorEnvironment {
  #[serde(rename = "GIT_EDITOR")]
  pub git_editor: String,
  #[serde(rename = "ELECTRON_RUN_AS_NODE")]
  pub run_as_node: Option<String>,
  #[serde(rename = "VSCODE_GIT_EDITOR_NODE")]
  pub editor_node: Option<String>,
  #[serde(rename = "VSCODE_GIT_EDITOR_MAIN")]
  pub editor_main: Option<String>,
}

impl EditorEnvironment {
  /// Route git's editor through the host binary at `executable`
  pub fn enabled(shims: &ShimSet, executable: &Path) -> Self {
    Self {
      git_editor: format!("'{}'", shims.editor().display()),
      run_as_node: Some("1".to_string()),
      editor_node: Some(executable.display().to_string()),
      editor_main: Some(shims.main().display().to_string()),
    }
  }

  /// Point git at a shim that accepts the message without editing
  pub fn disabled(shims: &ShimSet) -> Self {
    Self {
      git_editor: shims.empty().display().to_string(),
      run_as_node: None,
      editor_node: None,
      editor_main: None,
    }
  }

  pub fn vars(&self) -> Vec<(&'static str, String)> {
    let mut vars = vec![(GIT_EDITOR_VAR, self.git_editor.clone())];
    if let Some(value) = &self.run_as_node {
      vars.push((RUN_AS_NODE_VAR, value.clone()));
    }
    if let Some(value) = &self.editor_node {
      vars.push((EDITOR_NODE_VAR, value.clone()));
    }
    if let Some(value) = &self.editor_main {
      vars.push((EDITOR_MAIN_VAR, value.clone()));
    }
    vars
  }
}
