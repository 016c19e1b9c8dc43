//! IPC server - accepts helper connections and dispatches their requests
//! through the [`HandlerRegistry`].
//!
//! # Protocol
//!
//! - Requests: JSON objects, one per line (`{"id", "command", "payload"}`)
//! - Responses: JSON objects, one per line, correlated by `id`
//!
//! Every request runs on its own task, so a request that waits on the user
//! (like `git-editor`) never blocks other requests on the same connection.
//! Responses are written in completion order.
//!
//! # Example
//!
//! ```ignore
//! let server = Server::new(ServerConfig {
//!     socket_path: PathBuf::from("/tmp/editbridge.sock"),
//!     registry: Arc::clone(&registry),
//! });
//! server.run(cancel_token).await?;
//! ```

use std::{
  path::{Path, PathBuf},
  sync::{
    Arc,
    atomic::{AtomicU64, Ordering},
  },
  time::Duration,
};

use futures::{FutureExt, SinkExt, StreamExt};
use tokio::{
  io::Interest,
  net::{UnixListener, UnixStream, unix::OwnedWriteHalf},
  sync::mpsc,
};
use tokio_util::{
  codec::{FramedRead, FramedWrite, LinesCodec},
  sync::CancellationToken,
};
use tracing::{debug, error, info, trace, warn};

use crate::{
  editor::env::IPC_HANDLE_VAR,
  ipc::{IpcError, Request, Response},
  registry::HandlerRegistry,
};

// ============================================================================
// Server Configuration
// ============================================================================

pub struct ServerConfig {
  /// Path to the Unix socket for IPC
  pub socket_path: PathBuf,

  /// Handlers requests are dispatched to
  pub registry: Arc<HandlerRegistry>,
}

// ============================================================================
// Server
// ============================================================================

/// IPC server that accepts connections and dispatches requests by command.
///
/// # Lifecycle
///
/// 1. `Server::new()` creates the server with all dependencies
/// 2. `Server::bind()` prepares the socket
/// 3. `Server::serve()` accepts connections, one task per connection
/// 4. On cancellation, in-flight requests are cancelled and the socket removed
pub struct Server {
  config: ServerConfig,
  /// Total requests handled across all connections
  request_count: Arc<AtomicU64>,
}

impl Server {
  pub fn new(config: ServerConfig) -> Self {
    Self {
      config,
      request_count: Arc::new(AtomicU64::new(0)),
    }
  }

  pub fn socket_path(&self) -> &Path {
    &self.config.socket_path
  }

  /// Variables a helper process needs to reach this server
  pub fn env(&self) -> Vec<(&'static str, String)> {
    vec![(IPC_HANDLE_VAR, self.config.socket_path.display().to_string())]
  }

  pub fn request_count(&self) -> u64 {
    self.request_count.load(Ordering::Relaxed)
  }

  /// Bind the socket, replacing a stale socket file and creating the parent
  /// directory if needed.
  pub async fn bind(&self) -> Result<UnixListener, IpcError> {
    let socket_path = &self.config.socket_path;

    if socket_path.exists() {
      tokio::fs::remove_file(socket_path).await?;
    }

    if let Some(parent) = socket_path.parent() {
      tokio::fs::create_dir_all(parent).await?;
    }

    let listener = UnixListener::bind(socket_path)?;
    info!("Server listening on {:?}", socket_path);
    Ok(listener)
  }

  /// Accept connections on `listener` until `cancel` fires.
  pub async fn serve(&self, listener: UnixListener, cancel: CancellationToken) -> Result<(), IpcError> {
    loop {
      tokio::select! {
        biased;

        _ = cancel.cancelled() => {
          info!("Server shutting down (cancelled)");
          break;
        }

        result = listener.accept() => {
          match result {
            Ok((stream, _)) => {
              let registry = Arc::clone(&self.config.registry);
              let request_count = Arc::clone(&self.request_count);
              tokio::spawn(handle_connection(stream, registry, request_count, cancel.child_token()));
            }
            Err(e) => {
              error!("Accept error: {}", e);
            }
          }
        }
      }
    }

    drop(listener);
    if self.config.socket_path.exists() {
      tokio::fs::remove_file(&self.config.socket_path).await?;
    }

    Ok(())
  }

  /// Bind and serve until the cancellation token is triggered.
  pub async fn run(&self, cancel: CancellationToken) -> Result<(), IpcError> {
    let listener = self.bind().await?;
    self.serve(listener, cancel).await
  }
}

// ============================================================================
// Connection Handler
// ============================================================================

/// How often a connection whose read side has ended checks for a full hang-up
const PEER_CHECK_INTERVAL: Duration = Duration::from_millis(100);

/// Handle a single client connection.
///
/// # Error Handling
///
/// - Parse errors return an error response but don't close the connection
/// - Handler errors return an error response but don't close the connection
/// - End of input stops reading; in-flight requests still get their responses
/// - A failed write or a full hang-up cancels the in-flight requests
async fn handle_connection(
  stream: UnixStream,
  registry: Arc<HandlerRegistry>,
  request_count: Arc<AtomicU64>,
  shutdown: CancellationToken,
) {
  debug!("Client connected");
  let (read_half, write_half) = stream.into_split();
  let mut stream = FramedRead::new(read_half, LinesCodec::new());
  let mut sink = FramedWrite::new(write_half, LinesCodec::new());
  let (response_tx, mut response_rx) = mpsc::channel::<Response>(64);

  // Fires on server shutdown and when the peer goes away
  let peer = shutdown.child_token();

  let writer = {
    let peer = peer.clone();
    tokio::spawn(async move {
      let mut liveness = tokio::time::interval(PEER_CHECK_INTERVAL);
      loop {
        tokio::select! {
          next = response_rx.recv() => {
            let Some(response) = next else { break };
            let json = match serde_json::to_string(&response) {
              Ok(json) => json,
              Err(e) => {
                error!(id = %response.id, "Failed to serialize response: {}", e);
                continue;
              }
            };
            if let Err(e) = sink.send(json).await {
              warn!(error = %e, "Error writing to client");
              peer.cancel();
              break;
            }
          }
          _ = liveness.tick() => {
            if hung_up(sink.get_ref()) {
              debug!("Client hung up");
              peer.cancel();
              break;
            }
          }
        }
      }
    })
  };

  let mut handled = 0u64;

  loop {
    let result = tokio::select! {
      _ = peer.cancelled() => break,
      next = stream.next() => match next {
        Some(result) => result,
        None => {
          trace!("Client finished sending");
          break;
        }
      },
    };

    let line = match result {
      Ok(l) => l,
      Err(e) => {
        warn!(error = %e, "Error reading from client");
        peer.cancel();
        break;
      }
    };

    let trimmed = line.trim();
    if trimmed.is_empty() {
      continue;
    }

    let request: Request = match serde_json::from_str(trimmed) {
      Ok(r) => r,
      Err(e) => {
        warn!("Invalid request JSON: {}", e);
        let response = Response::rpc_error("unknown", -32700, format!("Parse error: {}", e));
        if response_tx.send(response).await.is_err() {
          break;
        }
        continue;
      }
    };

    handled += 1;
    request_count.fetch_add(1, Ordering::Relaxed);
    tokio::spawn(dispatch_request(
      request,
      Arc::clone(&registry),
      response_tx.clone(),
      shutdown.clone(),
      peer.clone(),
    ));
  }

  // The writer ends once every in-flight request has answered
  drop(response_tx);
  let _ = writer.await;
  peer.cancel();

  debug!(requests_handled = handled, "Client disconnected");
}

/// Whether the peer has closed both directions of the socket.
///
/// A peer that only shut down its write side is still waiting for answers.
fn hung_up(half: &OwnedWriteHalf) -> bool {
  match half.ready(Interest::WRITABLE).now_or_never() {
    Some(Ok(ready)) => ready.is_write_closed(),
    Some(Err(_)) => true,
    None => false,
  }
}

async fn dispatch_request(
  request: Request,
  registry: Arc<HandlerRegistry>,
  response_tx: mpsc::Sender<Response>,
  shutdown: CancellationToken,
  peer: CancellationToken,
) {
  let start = std::time::Instant::now();
  trace!(command = %request.command, id = %request.id, "Processing request");

  let Request { id, command, payload } = request;
  let result = tokio::select! {
    _ = peer.cancelled() => {
      if shutdown.is_cancelled() {
        Err(IpcError::Shutdown)
      } else {
        Err(IpcError::Connection("client disconnected".to_string()))
      }
    }
    result = registry.dispatch(&command, payload) => result,
  };

  let response = match result {
    Ok(result) => Response::success(&id, result),
    Err(e) => {
      debug!(id = %id, command = %command, code = e.code(), "Request failed: {}", e);
      Response::error(&id, e)
    }
  };

  if response_tx.send(response).await.is_err() {
    debug!(id = %id, "Client gone before response was sent");
  }

  let elapsed = start.elapsed();
  debug!(
      id = %id,
      command = %command,
      elapsed_ms = elapsed.as_millis() as u64,
      "Request completed"
  );
}

// ============================================================================
// Tests
// ============================================================================
