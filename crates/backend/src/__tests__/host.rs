//! Full host tests: `Daemon` with a real editor process behind the presenter.

#[cfg(test)]
mod tests {
  use std::time::Duration;

  use tempfile::TempDir;
  use tokio_util::sync::CancellationToken;

  use crate::{
    Daemon, RuntimeConfig,
    config::Config,
    editor::{self, env::IPC_HANDLE_VAR},
    ipc::{Client, types::editor::EDIT_ACK, types::system::StatusParams},
  };

  fn runtime_config(dir: &TempDir, editor_command: &str) -> RuntimeConfig {
    let mut config = Config::default();
    config.editor.command = Some(editor_command.to_string());

    RuntimeConfig {
      socket_path: dir.path().join("editbridge.sock"),
      runtime_dir: dir.path().join("shims"),
      executable: "/usr/bin/editbridge".into(),
      config,
    }
  }

  async fn wait_for_socket(rc: &RuntimeConfig) {
    for _ in 0..100 {
      if crate::dirs::is_host_running(&rc.socket_path) {
        return;
      }
      tokio::time::sleep(Duration::from_millis(20)).await;
    }
    panic!("host did not start");
  }

  /// The editor process exiting closes the view, which answers the helper.
  #[tokio::test]
  async fn test_host_round_trip_with_editor_process() {
    let dir = TempDir::new().unwrap();
    let message = dir.path().join("COMMIT_EDITMSG");
    std::fs::write(&message, "msg").unwrap();

    let rc = runtime_config(&dir, "true");
    let socket_path = rc.socket_path.clone();
    let cancel = CancellationToken::new();
    let host = tokio::spawn(Daemon::new(rc.clone()).run_until(cancel.clone()));
    wait_for_socket(&rc).await;

    let result = tokio::time::timeout(
      Duration::from_secs(5),
      editor::request_edit(&socket_path, Some(message.display().to_string())),
    )
    .await
    .unwrap()
    .unwrap();
    assert_eq!(result.as_deref(), Some(EDIT_ACK));

    cancel.cancel();
    host.await.unwrap().unwrap();
    assert!(!socket_path.exists());
  }

  #[tokio::test]
  async fn test_host_reports_missing_file() {
    let dir = TempDir::new().unwrap();
    let rc = runtime_config(&dir, "true");
    let cancel = CancellationToken::new();
    let host = tokio::spawn(Daemon::new(rc.clone()).run_until(cancel.clone()));
    wait_for_socket(&rc).await;

    let missing = dir.path().join("missing").display().to_string();
    let result = editor::request_edit(&rc.socket_path, Some(missing.clone())).await;
    match result {
      Err(crate::ipc::IpcError::ResourceOpen { path, .. }) => assert_eq!(path, missing),
      other => panic!("expected ResourceOpen, got {:?}", other),
    }

    cancel.cancel();
    host.await.unwrap().unwrap();
  }

  #[tokio::test]
  async fn test_host_status() {
    let dir = TempDir::new().unwrap();
    let rc = runtime_config(&dir, "true");
    let cancel = CancellationToken::new();
    let host = tokio::spawn(Daemon::new(rc.clone()).run_until(cancel.clone()));
    wait_for_socket(&rc).await;

    let client = Client::connect_to(&rc.socket_path).await.unwrap();
    let status = client.call_typed(StatusParams {}).await.unwrap();
    assert_eq!(status.commands, vec!["git-editor".to_string(), "status".to_string()]);
    assert_eq!(status.socket_path, rc.socket_path.display().to_string());
    assert!(status.views.is_empty());

    cancel.cancel();
    host.await.unwrap().unwrap();
  }

  #[tokio::test]
  async fn test_editor_environment_installs_shims() {
    let dir = TempDir::new().unwrap();
    let rc = runtime_config(&dir, "true");

    let vars = rc.editor_environment(false).await.unwrap();
    let names: Vec<_> = vars.iter().map(|(name, _)| *name).collect();
    assert_eq!(
      names,
      vec![
        "GIT_EDITOR",
        "ELECTRON_RUN_AS_NODE",
        "VSCODE_GIT_EDITOR_NODE",
        "VSCODE_GIT_EDITOR_MAIN",
        IPC_HANDLE_VAR,
      ]
    );
    assert!(rc.runtime_dir.join("git-editor.sh").exists());

    let disabled = rc.editor_environment(true).await.unwrap();
    assert_eq!(disabled.len(), 2);
    assert_eq!(disabled[0].1, rc.runtime_dir.join("git-editor-empty.sh").display().to_string());
  }
}
