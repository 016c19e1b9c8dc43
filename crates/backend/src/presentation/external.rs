use std::{path::Path, sync::Arc};

use async_trait::async_trait;
use tokio::{process::Command, sync::watch};
use tracing::{debug, info, warn};

use super::{PresentError, Presenter, ViewId, ViewSet, VisibleViews};
use crate::editor::env::BRIDGE_VARS;

/// Presents files by launching an external editor process.
///
/// The view stays visible for as long as the editor process runs. When the
/// process exits (for any reason) the view is closed.
pub struct ExternalEditorPresenter {
  views: Arc<ViewSet>,
  program: String,
  args: Vec<String>,
}

impl ExternalEditorPresenter {
  /// `command` is the editor invocation split into words. The file path is
  /// appended as the last argument. An empty command falls back to `vi`.
  pub fn new(views: Arc<ViewSet>, command: Vec<String>) -> Self {
    let mut words = command.into_iter();
    let program = words.next().unwrap_or_else(|| "vi".to_string());
    Self {
      views,
      program,
      args: words.collect(),
    }
  }

  pub fn views(&self) -> &Arc<ViewSet> {
    &self.views
  }

  pub fn program(&self) -> &str {
    &self.program
  }

  /// Editor invocation for `path`, with the bridge's own variables removed
  fn command(&self, path: &Path) -> Command {
    let mut command = Command::new(&self.program);
    command.args(&self.args).arg(path);
    for var in BRIDGE_VARS {
      command.env_remove(var);
    }
    command
  }
}

#[async_trait]
impl Presenter for ExternalEditorPresenter {
  async fn open(&self, path: &Path) -> Result<ViewId, PresentError> {
    match tokio::fs::metadata(path).await {
      Ok(meta) if meta.is_file() => {}
      Ok(_) => return Err(PresentError::NotFound(path.to_path_buf())),
      Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
        return Err(PresentError::NotFound(path.to_path_buf()));
      }
      Err(e) => {
        return Err(PresentError::Open {
          path: path.to_path_buf(),
          message: e.to_string(),
        });
      }
    }

    let mut child = self
      .command(path)
      .spawn()
      .map_err(|e| PresentError::Open {
        path: path.to_path_buf(),
        message: format!("{}: {}", self.program, e),
      })?;

    let view = self.views.show(path);
    info!(view = %view, program = %self.program, path = %path.display(), "Editor launched");

    let views = Arc::clone(&self.views);
    tokio::spawn(async move {
      match child.wait().await {
        Ok(status) => debug!(view = %view, %status, "Editor exited"),
        Err(e) => warn!(view = %view, "Failed waiting for editor: {}", e),
      }
      views.close(view);
    });

    Ok(view)
  }

  fn observe_visible(&self) -> watch::Receiver<VisibleViews> {
    self.views.observe()
  }
}
