//! Host introspection commands
use std::{
  path::PathBuf,
  sync::{Arc, Weak},
};

use async_trait::async_trait;

use crate::{
  ipc::{
    IpcError, decode_params,
    types::system::{StatusParams, StatusResult, ViewInfo},
  },
  presentation::ViewSet,
  registry::{HandlerRegistry, IpcHandler},
};

/// Handler for the `status` command.
///
/// Holds the registry weakly since the registry owns this handler.
pub struct StatusHandler {
  registry: Weak<HandlerRegistry>,
  views: Arc<ViewSet>,
  socket_path: PathBuf,
}

impl StatusHandler {
  pub fn new(registry: &Arc<HandlerRegistry>, views: Arc<ViewSet>, socket_path: PathBuf) -> Self {
    Self {
      registry: Arc::downgrade(registry),
      views,
      socket_path,
    }
  }

  pub fn status(&self) -> StatusResult {
    let commands = self.registry.upgrade().map(|r| r.commands()).unwrap_or_default();
    let views = self
      .views
      .views()
      .into_iter()
      .map(|(id, path)| ViewInfo {
        id,
        path: path.display().to_string(),
      })
      .collect();

    StatusResult {
      socket_path: self.socket_path.display().to_string(),
      commands,
      views,
    }
  }
}

#[async_trait]
impl IpcHandler for StatusHandler {
  async fn handle(&self, payload: serde_json::Value) -> Result<Option<serde_json::Value>, IpcError> {
    let _: StatusParams = decode_params(payload)?;
    Ok(Some(serde_json::to_value(self.status())?))
  }
}
