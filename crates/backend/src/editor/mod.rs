//! Git editor bridge - holds a `git-editor` request open until the user closes
//! the commit message view.
//!
//! Git invokes `$GIT_EDITOR <file>` and blocks until that process exits. The
//! shim it runs connects back to the host and sends the file path; the
//! [`EditHandler`] opens the file through the [`Presenter`], then suspends the
//! request until the opened view leaves the visible set. Only then does the
//! helper get its response and exit, letting git read the edited message.
//!
//! ```text
//! Idle -> Opening(path) -> Waiting(view) -> Resolved
//! Idle -> Resolved                               (no path)
//! ```

use std::{path::Path, sync::Arc, time::Duration};

use async_trait::async_trait;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::{
  ipc::{
    Client, IpcError, decode_params,
    types::editor::{EDIT_ACK, EditRequest, GIT_EDITOR_COMMAND},
  },
  presentation::{Presenter, ViewId, VisibleViews},
  registry::{HandlerRegistry, IpcHandler, Registration, Release},
};

pub mod env;
pub mod shim;

pub use env::EditorEnvironment;
pub use shim::{ScriptEntry, ShimError, ShimSet};

// ============================================================================
// PendingWait
// ============================================================================

/// One opened view waiting to be closed.
///
/// Owns the only observer for its request; the observer is dropped when
/// `resolve` returns, whatever the outcome.
pub struct PendingWait {
  view: ViewId,
  visible: watch::Receiver<VisibleViews>,
}

impl PendingWait {
  pub fn new(view: ViewId, visible: watch::Receiver<VisibleViews>) -> Self {
    Self { view, visible }
  }

  /// Wait until the view is no longer visible.
  pub async fn resolve(mut self, cancel: &CancellationToken, timeout: Option<Duration>) -> Result<(), IpcError> {
    let view = self.view;
    let visible = &mut self.visible;

    let closed = async move {
      loop {
        let gone = !visible.borrow_and_update().contains(&view);
        if gone {
          return Ok::<(), IpcError>(());
        }
        visible
          .changed()
          .await
          .map_err(|_| IpcError::Presentation("view set dropped".to_string()))?;
      }
    };

    let waited = async move {
      match timeout {
        Some(limit) => tokio::time::timeout(limit, closed)
          .await
          .map_err(|_| IpcError::Timeout {
            millis: limit.as_millis() as u64,
          })?,
        None => closed.await,
      }
    };

    tokio::select! {
      biased;
      _ = cancel.cancelled() => Err(IpcError::Cancelled),
      result = waited => result,
    }
  }
}

// ============================================================================
// EditHandler
// ============================================================================

/// Handler for the `git-editor` command
pub struct EditHandler {
  presenter: Arc<dyn Presenter>,
  cancel: CancellationToken,
  wait_timeout: Option<Duration>,
}

impl EditHandler {
  pub fn new(presenter: Arc<dyn Presenter>, cancel: CancellationToken, wait_timeout: Option<Duration>) -> Self {
    Self {
      presenter,
      cancel,
      wait_timeout,
    }
  }
}

#[async_trait]
impl IpcHandler for EditHandler {
  async fn handle(&self, payload: serde_json::Value) -> Result<Option<serde_json::Value>, IpcError> {
    if self.cancel.is_cancelled() {
      return Err(IpcError::Cancelled);
    }

    let request: EditRequest = decode_params(payload)?;
    let Some(path) = request.commit_message_path.filter(|p| !p.is_empty()) else {
      debug!("Edit request without a path");
      return Ok(None);
    };

    let view = self
      .presenter
      .open(Path::new(&path))
      .await
      .map_err(|e| IpcError::ResourceOpen {
        path: path.clone(),
        message: e.to_string(),
      })?;
    info!(view = %view, path = %path, "Waiting for commit message view to close");

    let pending = PendingWait::new(view, self.presenter.observe_visible());
    match pending.resolve(&self.cancel, self.wait_timeout).await {
      Ok(()) => {
        info!(view = %view, path = %path, "Commit message view closed");
        Ok(Some(serde_json::Value::String(EDIT_ACK.to_string())))
      }
      Err(e) => {
        warn!(view = %view, path = %path, "Edit wait ended without close: {}", e);
        Err(e)
      }
    }
  }
}

// ============================================================================
// GitEditor
// ============================================================================

/// The registered `git-editor` command together with the environment that
/// routes git to it.
///
/// Dropping it has the same effect as `dispose`.
pub struct GitEditor {
  registration: Registration,
  cancel: CancellationToken,
  env: EditorEnvironment,
  disabled_env: EditorEnvironment,
}

impl GitEditor {
  /// Register the edit handler and compute the environment descriptors.
  ///
  /// `executable` is the host binary the editor shim re-enters.
  pub fn register(
    registry: &Arc<HandlerRegistry>,
    presenter: Arc<dyn Presenter>,
    shims: &ShimSet,
    executable: &Path,
    wait_timeout: Option<Duration>,
  ) -> Result<Self, IpcError> {
    let cancel = CancellationToken::new();
    let handler = EditHandler::new(presenter, cancel.clone(), wait_timeout);
    let registration = registry.register(GIT_EDITOR_COMMAND, Arc::new(handler))?;

    Ok(Self {
      registration,
      cancel,
      env: EditorEnvironment::enabled(shims, executable),
      disabled_env: EditorEnvironment::disabled(shims),
    })
  }

  pub fn env(&self) -> &EditorEnvironment {
    &self.env
  }

  pub fn disabled_env(&self) -> &EditorEnvironment {
    &self.disabled_env
  }

  /// Unregister the handler and reject every pending wait with `Cancelled`.
  pub fn dispose(&self) {
    if self.is_disposed() {
      return;
    }
    self.cancel.cancel();
    self.registration.release();
    debug!("Git editor disposed");
  }

  pub fn is_disposed(&self) -> bool {
    self.cancel.is_cancelled()
  }
}

impl Release for GitEditor {
  fn release(&self) {
    self.dispose();
  }
}

impl Drop for GitEditor {
  fn drop(&mut self) {
    self.dispose();
  }
}

/// Act as the helper: ask the host at `socket_path` to edit a commit message
/// and wait for the answer.
pub async fn request_edit(socket_path: &Path, commit_message_path: Option<String>) -> Result<Option<String>, IpcError> {
  let client = Client::connect_to(socket_path).await?;
  client.call_typed(EditRequest { commit_message_path }).await
}
