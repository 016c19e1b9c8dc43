//! Presentation layer - where opened resources become visible views
//!
//! The edit coordinator never renders anything itself. It asks a
//! [`Presenter`] to open a file, gets back a [`ViewId`], and then watches the
//! set of visible views until that id disappears.
//!
//! Observation uses a `tokio::sync::watch` channel: every change to the
//! visible set publishes a new snapshot, and dropping a receiver is the
//! unsubscribe.

use std::{
  collections::BTreeSet,
  path::{Path, PathBuf},
  sync::{
    Arc,
    atomic::{AtomicU64, Ordering},
  },
};

use async_trait::async_trait;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tracing::debug;

mod external;

pub use external::ExternalEditorPresenter;

/// Identifier of one opened view. Ids are never reused within a process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ViewId(pub u64);

impl std::fmt::Display for ViewId {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    write!(f, "view-{}", self.0)
  }
}

/// Snapshot of the views visible at one point in time
pub type VisibleViews = Arc<BTreeSet<ViewId>>;

#[derive(Debug, thiserror::Error)]
pub enum PresentError {
  #[error("Not a file: {}", .0.display())]
  NotFound(PathBuf),
  #[error("Failed to open {}: {message}", path.display())]
  Open { path: PathBuf, message: String },
}

/// Opens resources for interactive display and reports which views are visible.
#[async_trait]
pub trait Presenter: Send + Sync {
  /// Open `path` and return the view showing it.
  async fn open(&self, path: &Path) -> Result<ViewId, PresentError>;

  /// Subscribe to changes of the visible view set.
  ///
  /// The receiver starts at the current snapshot. Dropping it unsubscribes.
  fn observe_visible(&self) -> watch::Receiver<VisibleViews>;
}

// ============================================================================
// ViewSet
// ============================================================================

/// The set of currently visible views.
///
/// Every `show` / `close` publishes a new snapshot to all observers.
pub struct ViewSet {
  tx: watch::Sender<VisibleViews>,
  paths: DashMap<ViewId, PathBuf>,
  next_id: AtomicU64,
}

impl Default for ViewSet {
  fn default() -> Self {
    Self::new()
  }
}

impl ViewSet {
  pub fn new() -> Self {
    let (tx, _rx) = watch::channel(Arc::new(BTreeSet::new()));
    Self {
      tx,
      paths: DashMap::new(),
      next_id: AtomicU64::new(1),
    }
  }

  /// Make a new view for `path` visible
  pub fn show(&self, path: &Path) -> ViewId {
    let id = ViewId(self.next_id.fetch_add(1, Ordering::Relaxed));
    self.paths.insert(id, path.to_path_buf());
    self.tx.send_modify(|views| {
      Arc::make_mut(views).insert(id);
    });
    debug!(view = %id, path = %path.display(), "View shown");
    id
  }

  /// Close a view. Returns false if it was not visible.
  pub fn close(&self, id: ViewId) -> bool {
    self.paths.remove(&id);
    let closed = self.tx.send_if_modified(|views| {
      if !views.contains(&id) {
        return false;
      }
      Arc::make_mut(views).remove(&id)
    });
    if closed {
      debug!(view = %id, "View closed");
    }
    closed
  }

  /// Close every view showing `path`. Returns how many were closed.
  pub fn close_path(&self, path: &Path) -> usize {
    let ids: Vec<ViewId> = self
      .paths
      .iter()
      .filter(|entry| entry.value() == path)
      .map(|entry| *entry.key())
      .collect();

    ids.into_iter().filter(|id| self.close(*id)).count()
  }

  /// Current snapshot of visible views
  pub fn visible(&self) -> VisibleViews {
    Arc::clone(&self.tx.borrow())
  }

  pub fn is_visible(&self, id: ViewId) -> bool {
    self.tx.borrow().contains(&id)
  }

  pub fn path_of(&self, id: ViewId) -> Option<PathBuf> {
    self.paths.get(&id).map(|path| path.value().clone())
  }

  /// Visible views with their paths, ordered by id
  pub fn views(&self) -> Vec<(ViewId, PathBuf)> {
    let visible = self.visible();
    visible
      .iter()
      .filter_map(|id| self.path_of(*id).map(|path| (*id, path)))
      .collect()
  }

  pub fn observe(&self) -> watch::Receiver<VisibleViews> {
    self.tx.subscribe()
  }

  /// Number of live observers of the visible set
  pub fn observer_count(&self) -> usize {
    self.tx.receiver_count()
  }
}

/// A bare view set presents by showing a view and nothing else; the view
/// stays until someone calls `close`.
#[async_trait]
impl Presenter for ViewSet {
  async fn open(&self, path: &Path) -> Result<ViewId, PresentError> {
    Ok(self.show(path))
  }

  fn observe_visible(&self) -> watch::Receiver<VisibleViews> {
    self.observe()
  }
}
