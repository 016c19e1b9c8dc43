//! System IPC types - host status
use serde::{Deserialize, Serialize};

use crate::{
  ipc::{IpcError, client::IpcRequest},
  presentation::ViewId,
};

/// Command name the status handler is registered under
pub const STATUS_COMMAND: &str = "status";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StatusParams {}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusResult {
  pub socket_path: String,
  pub commands: Vec<String>,
  pub views: Vec<ViewInfo>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewInfo {
  pub id: ViewId,
  pub path: String,
}

impl IpcRequest for StatusParams {
  const COMMAND: &'static str = STATUS_COMMAND;
  type Response = StatusResult;

  fn extract(result: Option<serde_json::Value>) -> Result<Self::Response, IpcError> {
    let value = result.ok_or(IpcError::NoResult)?;
    Ok(serde_json::from_value(value)?)
  }
}
