//! HandlerRegistry - maps command names to the handlers that serve them
//!
//! The registry is the table the IPC server dispatches through. It is an
//! explicit object shared via `Arc`: construct it at host startup, hand it to
//! every component that registers a command, and drop it at shutdown.
//!
//! # Registration policy
//!
//! At most one handler is active per command name. Registering a name that is
//! already taken fails with [`IpcError::DuplicateCommand`]; the existing
//! handler is left untouched.
//!
//! # Lifecycle
//!
//! `register` returns a [`Registration`]. Releasing it (explicitly, or by
//! dropping it) removes the mapping. Release is idempotent, and a stale
//! registration never removes a newer handler registered under the same name.
//!
//! # Usage
//!
//! ```ignore
//! let registry = Arc::new(HandlerRegistry::new());
//! let registration = registry.register("git-editor", handler)?;
//! let result = registry.dispatch("git-editor", payload).await?;
//! registration.release();
//! ```

use std::sync::{
  Arc, Weak,
  atomic::{AtomicBool, AtomicU64, Ordering},
};

use async_trait::async_trait;
use dashmap::{DashMap, mapref::entry::Entry};
use tracing::{debug, info, warn};

use crate::ipc::IpcError;

// ============================================================================
// Handler
// ============================================================================

/// A command handler reachable over IPC.
///
/// `Ok(None)` is a successful call with nothing to return.
#[async_trait]
pub trait IpcHandler: Send + Sync {
  async fn handle(&self, payload: serde_json::Value) -> Result<Option<serde_json::Value>, IpcError>;
}

struct Slot {
  token: u64,
  handler: Arc<dyn IpcHandler>,
}

// ============================================================================
// HandlerRegistry
// ============================================================================

/// Process-wide directory of command handlers
///
/// # Thread Safety
///
/// Register, release and dispatch may run concurrently from any task.
/// `DashMap` serializes access per entry, and dispatch clones the handler out
/// of the table before awaiting it, so a handler that waits for a long time
/// never blocks the table.
pub struct HandlerRegistry {
  handlers: DashMap<String, Slot>,
  next_token: AtomicU64,
}

impl Default for HandlerRegistry {
  fn default() -> Self {
    Self::new()
  }
}

impl HandlerRegistry {
  pub fn new() -> Self {
    Self {
      handlers: DashMap::new(),
      next_token: AtomicU64::new(1),
    }
  }

  /// Register a handler for a command name.
  ///
  /// Fails with `DuplicateCommand` if the name is already registered.
  pub fn register(
    self: &Arc<Self>,
    command: impl Into<String>,
    handler: Arc<dyn IpcHandler>,
  ) -> Result<Registration, IpcError> {
    let command = command.into();

    match self.handlers.entry(command.clone()) {
      Entry::Occupied(_) => {
        warn!(command = %command, "Rejected duplicate handler registration");
        Err(IpcError::DuplicateCommand { command })
      }
      Entry::Vacant(vacant) => {
        let token = self.next_token.fetch_add(1, Ordering::Relaxed);
        vacant.insert(Slot { token, handler });
        info!(command = %command, "Registered IPC handler");

        Ok(Registration {
          registry: Arc::downgrade(self),
          command,
          token,
          released: AtomicBool::new(false),
        })
      }
    }
  }

  /// Dispatch a payload to the handler registered for `command`.
  ///
  /// Fails with `UnknownCommand` if nothing is registered; otherwise returns
  /// whatever the handler returns.
  pub async fn dispatch(
    &self,
    command: &str,
    payload: serde_json::Value,
  ) -> Result<Option<serde_json::Value>, IpcError> {
    let handler = self.handlers.get(command).map(|slot| Arc::clone(&slot.handler));

    let Some(handler) = handler else {
      debug!(command = %command, "No handler registered");
      return Err(IpcError::UnknownCommand {
        command: command.to_string(),
      });
    };

    handler.handle(payload).await
  }

  /// Whether a handler is registered under `command`
  pub fn contains(&self, command: &str) -> bool {
    self.handlers.contains_key(command)
  }

  /// Registered command names, sorted
  pub fn commands(&self) -> Vec<String> {
    let mut commands: Vec<String> = self.handlers.iter().map(|entry| entry.key().clone()).collect();
    commands.sort();
    commands
  }

  pub fn len(&self) -> usize {
    self.handlers.len()
  }

  pub fn is_empty(&self) -> bool {
    self.handlers.is_empty()
  }

  /// Remove `command` only if it still belongs to the registration `token`
  fn release(&self, command: &str, token: u64) -> bool {
    self.handlers.remove_if(command, |_, slot| slot.token == token).is_some()
  }
}

// ============================================================================
// Scoped release
// ============================================================================

/// Something that can be torn down exactly once.
pub trait Release: Send + Sync {
  /// Release the underlying resource. Calling this more than once is a no-op.
  fn release(&self);
}

/// Handle for one active handler registration.
///
/// Dropping the handle releases the registration.
pub struct Registration {
  registry: Weak<HandlerRegistry>,
  command: String,
  token: u64,
  released: AtomicBool,
}

impl Registration {
  pub fn is_released(&self) -> bool {
    self.released.load(Ordering::Acquire)
  }

  /// Remove the mapping. Calling this more than once is a no-op.
  pub fn release(&self) {
    if self.released.swap(true, Ordering::AcqRel) {
      return;
    }

    // The registry may already be gone during shutdown; nothing to remove then
    if let Some(registry) = self.registry.upgrade()
      && registry.release(&self.command, self.token)
    {
      info!(command = %self.command, "Released IPC handler");
    }
  }
}

impl Release for Registration {
  fn release(&self) {
    Registration::release(self);
  }
}

impl Drop for Registration {
  fn drop(&mut self) {
    Registration::release(self);
  }
}

impl std::fmt::Debug for Registration {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("Registration")
      .field("command", &self.command)
      .field("released", &self.is_released())
      .finish()
  }
}

/// Releases a group of resources together, newest first.
#[derive(Default)]
pub struct ReleaseList {
  items: Vec<Box<dyn Release>>,
}

impl ReleaseList {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn push(&mut self, item: impl Release + 'static) {
    self.items.push(Box::new(item));
  }

  pub fn len(&self) -> usize {
    self.items.len()
  }

  pub fn is_empty(&self) -> bool {
    self.items.is_empty()
  }

  /// Release everything held so far. The list can be reused afterwards.
  pub fn release_all(&mut self) {
    while let Some(item) = self.items.pop() {
      item.release();
    }
  }
}

impl Drop for ReleaseList {
  fn drop(&mut self) {
    self.release_all();
  }
}
