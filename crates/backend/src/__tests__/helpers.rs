//! Shared helpers for end-to-end tests over a real Unix socket.

use std::{path::PathBuf, sync::Arc, time::Duration};

use futures::{SinkExt, StreamExt};
use tempfile::TempDir;
use tokio::{io::AsyncWriteExt, net::UnixStream, task::JoinHandle};
use tokio_util::{
  codec::{Framed, LinesCodec},
  sync::CancellationToken,
};

use crate::{
  editor::{GitEditor, ShimSet},
  ipc::{IpcError, Response},
  presentation::{ViewId, ViewSet},
  registry::HandlerRegistry,
  server::{Server, ServerConfig},
};

/// A host serving a bare `ViewSet` on a socket in a temp directory.
///
/// Views stay open until the test closes them.
pub struct TestHost {
  /// Temp directory - must be kept alive for the duration of the test
  temp_dir: TempDir,
  pub socket_path: PathBuf,
  pub shims: ShimSet,
  pub registry: Arc<HandlerRegistry>,
  pub views: Arc<ViewSet>,
  pub editor: GitEditor,
  cancel: CancellationToken,
  server: JoinHandle<Result<(), IpcError>>,
}

impl TestHost {
  pub async fn start() -> Self {
    Self::start_with_timeout(None).await
  }

  pub async fn start_with_timeout(wait_timeout: Option<Duration>) -> Self {
    let temp_dir = TempDir::new().expect("create temp dir");
    let socket_path = temp_dir.path().join("editbridge.sock");
    let shims = ShimSet::install(temp_dir.path().join("shims"))
      .await
      .expect("install shims");

    let registry = Arc::new(HandlerRegistry::new());
    let views = Arc::new(ViewSet::new());
    let editor = GitEditor::register(
      &registry,
      views.clone(),
      &shims,
      &PathBuf::from("/usr/bin/editbridge"),
      wait_timeout,
    )
    .expect("register git editor");

    let server = Server::new(ServerConfig {
      socket_path: socket_path.clone(),
      registry: Arc::clone(&registry),
    });
    let listener = server.bind().await.expect("bind socket");
    let cancel = CancellationToken::new();
    let server = {
      let cancel = cancel.clone();
      tokio::spawn(async move { server.serve(listener, cancel).await })
    };

    Self {
      temp_dir,
      socket_path,
      shims,
      registry,
      views,
      editor,
      cancel,
      server,
    }
  }

  /// Write a file into the temp directory and return its path
  pub fn write_file(&self, name: &str, content: &str) -> PathBuf {
    let path = self.temp_dir.path().join(name);
    std::fs::write(&path, content).expect("write test file");
    path
  }

  /// Wait until `count` views are visible and return them
  pub async fn wait_for_views(&self, count: usize) -> Vec<ViewId> {
    let mut rx = self.views.observe();
    tokio::time::timeout(Duration::from_secs(5), rx.wait_for(|v| v.len() == count))
      .await
      .expect("views should open in time")
      .expect("view set alive");
    self.views.visible().iter().copied().collect()
  }

  /// Wait until nothing observes the view set any more
  pub async fn wait_for_no_observers(&self) {
    for _ in 0..100 {
      if self.views.observer_count() == 0 {
        return;
      }
      tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("observers left behind: {}", self.views.observer_count());
  }

  pub async fn shutdown(self) {
    self.cancel.cancel();
    let result = tokio::time::timeout(Duration::from_secs(5), self.server)
      .await
      .expect("server should stop")
      .expect("server task");
    result.expect("server exits cleanly");
  }
}

/// Line-level connection for sending raw (possibly malformed) requests
pub struct RawConnection {
  framed: Framed<UnixStream, LinesCodec>,
}

impl RawConnection {
  pub async fn connect(host: &TestHost) -> Self {
    let stream = UnixStream::connect(&host.socket_path).await.expect("connect");
    Self {
      framed: Framed::new(stream, LinesCodec::new()),
    }
  }

  pub async fn send(&mut self, line: &str) {
    self.framed.send(line.to_string()).await.expect("send line");
  }

  /// Shut down the write side only; responses can still be read
  pub async fn finish_sending(&mut self) {
    self.framed.get_mut().shutdown().await.expect("shut down write side");
  }

  pub async fn recv(&mut self) -> Response {
    let line = tokio::time::timeout(Duration::from_secs(5), self.framed.next())
      .await
      .expect("response in time")
      .expect("connection open")
      .expect("valid line");
    serde_json::from_str(&line).expect("valid response")
  }

  pub async fn recv_line(&mut self) -> String {
    tokio::time::timeout(Duration::from_secs(5), self.framed.next())
      .await
      .expect("response in time")
      .expect("connection open")
      .expect("valid line")
  }
}
