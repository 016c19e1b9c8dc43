//! Git editor IPC types - the request a helper sends when git wants a commit
//! message edited
use serde::{Deserialize, Serialize};

use crate::ipc::{IpcError, client::IpcRequest};

/// Command name the git editor handler is registered under
pub const GIT_EDITOR_COMMAND: &str = "git-editor";

/// Acknowledgment returned once the edited file's view has closed.
///
/// Helpers only check for success; the value itself is fixed by the wire
/// protocol and must not change.
pub const EDIT_ACK: &str = "Hello World";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EditRequest {
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub commit_message_path: Option<String>,
}

impl EditRequest {
  pub fn new(commit_message_path: impl Into<String>) -> Self {
    Self {
      commit_message_path: Some(commit_message_path.into()),
    }
  }
}

impl IpcRequest for EditRequest {
  const COMMAND: &'static str = GIT_EDITOR_COMMAND;
  type Response = Option<String>;

  fn extract(result: Option<serde_json::Value>) -> Result<Self::Response, IpcError> {
    match result {
      None => Ok(None),
      Some(serde_json::Value::String(ack)) => Ok(Some(ack)),
      Some(_) => Err(IpcError::NoResult),
    }
  }
}
