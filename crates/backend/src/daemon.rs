//! Host lifecycle management.
//!
//! The host is the long-lived process git's editor shim connects back to.
//!
//! # Architecture
//!
//! ```text
//! Daemon
//!   ├── Server (IPC listener, spawns connection tasks)
//!   └── HandlerRegistry
//!         ├── git-editor -> EditHandler -> ExternalEditorPresenter -> ViewSet
//!         └── status     -> StatusHandler
//! ```
//!
//! # Lifecycle
//!
//! 1. Create master `CancellationToken`
//! 2. Install invocation shims into the runtime directory
//! 3. Create the registry, view set and presenter
//! 4. Register the git editor and status handlers
//! 5. Run server until cancelled
//! 6. Graceful shutdown: dispose the git editor, release registrations

use std::{path::PathBuf, sync::Arc};

use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::{
  domain::config::Config,
  editor::{GitEditor, ShimSet, env::IPC_HANDLE_VAR},
  ipc::{IpcError, types::system::STATUS_COMMAND},
  presentation::{ExternalEditorPresenter, Presenter, ViewSet},
  registry::{HandlerRegistry, ReleaseList},
  server::{Server, ServerConfig},
  system::StatusHandler,
};

// ============================================================================
// Configuration
// ============================================================================

/// Host runtime configuration.
///
/// Built from the user config file; fields may be overridden before `run`.
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
  /// Path to the Unix socket for IPC
  pub socket_path: PathBuf,
  /// Directory the invocation shims are written to
  pub runtime_dir: PathBuf,
  /// Binary the editor shim re-enters (normally this executable)
  pub executable: PathBuf,
  /// Full configuration
  pub config: Config,
}

impl RuntimeConfig {
  pub async fn load() -> Self {
    // Auto-create user config on first run if it doesn't exist
    Self::ensure_user_config().await;

    Self::from_config(Config::load())
  }

  pub fn from_config(config: Config) -> Self {
    let executable = match std::env::current_exe() {
      Ok(exe) => exe,
      Err(e) => {
        warn!("Failed to resolve current executable: {}", e);
        PathBuf::from("editbridge")
      }
    };

    Self {
      socket_path: config.socket_path(),
      runtime_dir: config.runtime_dir(),
      executable,
      config,
    }
  }

  /// Ensure user config file exists, creating it with defaults if not.
  async fn ensure_user_config() {
    let user_config_path = Config::user_config_path();

    if user_config_path.exists() {
      return;
    }

    if let Some(parent) = user_config_path.parent()
      && let Err(e) = tokio::fs::create_dir_all(parent).await
    {
      warn!("Failed to create config directory: {}", e);
      return;
    }

    let template = Config::generate_template();
    match tokio::fs::write(&user_config_path, &template).await {
      Ok(()) => info!("Created user config: {:?}", user_config_path),
      Err(e) => warn!("Failed to create user config: {}", e),
    }
  }

  /// Register the git editor the way the host does.
  fn register_git_editor(
    &self,
    registry: &Arc<HandlerRegistry>,
    presenter: Arc<dyn Presenter>,
    shims: &ShimSet,
  ) -> Result<GitEditor, IpcError> {
    GitEditor::register(registry, presenter, shims, &self.executable, self.config.wait_timeout())
  }

  /// Install the shims and return every variable a git process needs to use
  /// the host as its editor, including where to reach the host.
  ///
  /// Reads the descriptors from a git editor registered on a private registry.
  pub async fn editor_environment(&self, disabled: bool) -> Result<Vec<(&'static str, String)>, IpcError> {
    let shims = install_shims(&self.runtime_dir).await?;

    let registry = Arc::new(HandlerRegistry::new());
    let git_editor = self.register_git_editor(&registry, Arc::new(ViewSet::new()), &shims)?;
    let env = if disabled {
      git_editor.disabled_env()
    } else {
      git_editor.env()
    };

    let mut vars = env.vars();
    vars.push((IPC_HANDLE_VAR, self.socket_path.display().to_string()));
    Ok(vars)
  }
}

async fn install_shims(dir: &std::path::Path) -> Result<ShimSet, IpcError> {
  ShimSet::install(dir).await.map_err(|e| IpcError::Io(e.to_string()))
}

/// The editbridge host - owns the registry, the presenter and the server.
///
/// # Usage
///
/// ```ignore
/// let daemon = Daemon::new(RuntimeConfig::load().await);
/// daemon.run().await?;
/// ```
pub struct Daemon {
  runtime_config: RuntimeConfig,
}

impl Daemon {
  pub fn new(runtime_config: RuntimeConfig) -> Self {
    Self { runtime_config }
  }

  /// Run the host until ctrl-c.
  pub async fn run(self) -> Result<(), IpcError> {
    let cancel = CancellationToken::new();

    let cancel_for_signal = cancel.clone();
    tokio::spawn(async move {
      if let Err(e) = signal::ctrl_c().await {
        warn!("Failed to listen for ctrl-c: {}", e);
        return;
      }
      info!("Received ctrl-c, shutting down...");
      cancel_for_signal.cancel();
    });

    self.run_until(cancel).await
  }

  /// Run the host until `cancel` fires.
  pub async fn run_until(self, cancel: CancellationToken) -> Result<(), IpcError> {
    let rc = &self.runtime_config;
    info!("Starting editbridge host");
    info!("Socket: {:?}", rc.socket_path);
    info!("Runtime dir: {:?}", rc.runtime_dir);

    let shims = install_shims(&rc.runtime_dir).await?;

    let registry = Arc::new(HandlerRegistry::new());
    let views = Arc::new(ViewSet::new());
    let editor_command = rc.config.editor_command();
    info!("Editor command: {}", editor_command.join(" "));
    let presenter = Arc::new(ExternalEditorPresenter::new(Arc::clone(&views), editor_command));

    let git_editor = rc.register_git_editor(&registry, presenter, &shims)?;

    let mut registrations = ReleaseList::new();
    let status = StatusHandler::new(&registry, Arc::clone(&views), rc.socket_path.clone());
    registrations.push(registry.register(STATUS_COMMAND, Arc::new(status))?);
    registrations.push(git_editor);

    let server = Server::new(ServerConfig {
      socket_path: rc.socket_path.clone(),
      registry: Arc::clone(&registry),
    });

    let result = server.run(cancel.child_token()).await;
    if let Err(e) = &result {
      warn!("Server error: {}", e);
    }

    info!("Shutting down...");
    cancel.cancel();
    registrations.release_all();

    info!(requests = server.request_count(), "Host shutdown complete");
    result
  }
}
