//! End-to-end tests for the git editor round trip.
//!
//! A helper connects over the socket, asks the host to edit a file, and must
//! not get its answer until the test closes the view.

#[cfg(test)]
mod tests {
  use std::{os::unix::fs::PermissionsExt, time::Duration};

  use pretty_assertions::assert_eq;
  use serde_json::json;

  use crate::{
    __tests__::helpers::{RawConnection, TestHost},
    editor,
    ipc::{
      Client, IpcError,
      types::editor::{EDIT_ACK, EditRequest, GIT_EDITOR_COMMAND},
    },
    registry::IpcHandler,
  };

  /// Validates:
  /// 1. The request opens exactly one view for the given path
  /// 2. The helper is still blocked while the view is visible
  /// 3. Closing the view resolves the helper with the sentinel
  #[tokio::test]
  async fn test_edit_resolves_after_view_closes() {
    let host = TestHost::start().await;
    let message = host.write_file("COMMIT_EDITMSG", "initial");

    let helper = {
      let socket = host.socket_path.clone();
      let path = message.display().to_string();
      tokio::spawn(async move { editor::request_edit(&socket, Some(path)).await })
    };

    let views = host.wait_for_views(1).await;
    assert_eq!(host.views.path_of(views[0]), Some(message.clone()));

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(!helper.is_finished());

    host.views.close(views[0]);
    let result = helper.await.unwrap().unwrap();
    assert_eq!(result.as_deref(), Some(EDIT_ACK));

    host.wait_for_no_observers().await;
    host.shutdown().await;
  }

  #[tokio::test]
  async fn test_edit_wire_format() {
    let host = TestHost::start().await;
    let mut conn = RawConnection::connect(&host).await;

    conn
      .send(r#"{"id":"1","command":"git-editor","payload":{"commitMessagePath":"/tmp/COMMIT_EDITMSG"}}"#)
      .await;
    let views = host.wait_for_views(1).await;
    host.views.close(views[0]);

    assert_eq!(conn.recv_line().await, r#"{"id":"1","result":"Hello World"}"#);
    host.shutdown().await;
  }

  #[tokio::test]
  async fn test_absent_path_returns_empty_success() {
    let host = TestHost::start().await;
    let mut conn = RawConnection::connect(&host).await;

    conn.send(r#"{"id":"2","command":"git-editor","payload":{}}"#).await;
    assert_eq!(conn.recv_line().await, r#"{"id":"2"}"#);

    let result = editor::request_edit(&host.socket_path, None).await.unwrap();
    assert_eq!(result, None);

    assert!(host.views.visible().is_empty());
    assert_eq!(host.views.observer_count(), 0);
    host.shutdown().await;
  }

  #[tokio::test]
  async fn test_unknown_command_is_error_response() {
    let host = TestHost::start().await;
    let client = Client::connect_to(&host.socket_path).await.unwrap();

    let result = client.call("no-such-command", json!({})).await;
    match result {
      Err(IpcError::UnknownCommand { command }) => assert_eq!(command, "no-such-command"),
      other => panic!("expected UnknownCommand, got {:?}", other),
    }
    host.shutdown().await;
  }

  #[tokio::test]
  async fn test_malformed_json_keeps_connection_usable() {
    let host = TestHost::start().await;
    let mut conn = RawConnection::connect(&host).await;

    conn.send("{not json").await;
    let response = conn.recv().await;
    assert_eq!(response.id, "unknown");
    assert_eq!(response.get_error().map(|e| e.code()), Some(-32700));

    conn.send(r#"{"id":"9","command":"git-editor"}"#).await;
    let response = conn.recv().await;
    assert_eq!(response.id, "9");
    assert!(response.is_ok());
    host.shutdown().await;
  }

  /// Two helpers on one connection must resolve independently, in the order
  /// their views close.
  #[tokio::test]
  async fn test_concurrent_requests_on_one_connection() {
    let host = TestHost::start().await;
    let client = Client::connect_to(&host.socket_path).await.unwrap();

    let first = {
      let client = client.clone();
      tokio::spawn(async move { client.call_typed(EditRequest::new("/tmp/first")).await })
    };
    let second = {
      let client = client.clone();
      tokio::spawn(async move { client.call_typed(EditRequest::new("/tmp/second")).await })
    };
    host.wait_for_views(2).await;

    host.views.close_path(std::path::Path::new("/tmp/second"));
    assert_eq!(second.await.unwrap().unwrap().as_deref(), Some(EDIT_ACK));
    assert!(!first.is_finished());

    host.views.close_path(std::path::Path::new("/tmp/first"));
    assert_eq!(first.await.unwrap().unwrap().as_deref(), Some(EDIT_ACK));
    host.shutdown().await;
  }

  #[tokio::test]
  async fn test_dispose_rejects_pending_helper() {
    let host = TestHost::start().await;

    let helper = {
      let socket = host.socket_path.clone();
      tokio::spawn(async move { editor::request_edit(&socket, Some("/tmp/COMMIT_EDITMSG".into())).await })
    };
    host.wait_for_views(1).await;

    host.editor.dispose();
    assert!(matches!(helper.await.unwrap(), Err(IpcError::Cancelled)));
    host.wait_for_no_observers().await;

    // The command is gone once disposed
    let result = editor::request_edit(&host.socket_path, Some("/tmp/COMMIT_EDITMSG".into())).await;
    assert!(matches!(result, Err(IpcError::UnknownCommand { .. })));
    host.shutdown().await;
  }

  #[tokio::test]
  async fn test_timeout_rejects_and_releases_observer() {
    let host = TestHost::start_with_timeout(Some(Duration::from_millis(100))).await;

    let result = editor::request_edit(&host.socket_path, Some("/tmp/COMMIT_EDITMSG".into())).await;
    assert!(matches!(result, Err(IpcError::Timeout { .. })));
    host.wait_for_no_observers().await;
    host.shutdown().await;
  }

  /// A helper that disconnects mid-wait must not leave an observer behind.
  #[tokio::test]
  async fn test_helper_disconnect_releases_observer() {
    let host = TestHost::start().await;
    let mut conn = RawConnection::connect(&host).await;

    conn
      .send(r#"{"id":"1","command":"git-editor","payload":{"commitMessagePath":"/tmp/COMMIT_EDITMSG"}}"#)
      .await;
    host.wait_for_views(1).await;
    drop(conn);

    host.wait_for_no_observers().await;
    host.shutdown().await;
  }

  /// A helper that sends its request and then shuts down its write side is
  /// still waiting for the answer.
  #[tokio::test]
  async fn test_half_closed_helper_still_gets_answer() {
    let host = TestHost::start().await;
    let mut conn = RawConnection::connect(&host).await;

    conn
      .send(r#"{"id":"1","command":"git-editor","payload":{"commitMessagePath":"/tmp/COMMIT_EDITMSG"}}"#)
      .await;
    conn.finish_sending().await;

    let views = host.wait_for_views(1).await;
    tokio::time::sleep(Duration::from_millis(250)).await;
    assert!(host.views.is_visible(views[0]));
    assert_eq!(host.views.observer_count(), 1);

    host.views.close(views[0]);
    assert_eq!(conn.recv_line().await, r#"{"id":"1","result":"Hello World"}"#);

    host.wait_for_no_observers().await;
    host.shutdown().await;
  }

  #[tokio::test]
  async fn test_shims_and_env_point_at_each_other() {
    let host = TestHost::start().await;

    for script in [host.shims.editor(), host.shims.empty()] {
      let mode = std::fs::metadata(&script).unwrap().permissions().mode();
      assert_eq!(mode & 0o111, 0o111, "{} should be executable", script.display());
    }

    let env = host.editor.env();
    assert_eq!(env.git_editor, format!("'{}'", host.shims.editor().display()));
    assert_eq!(env.run_as_node.as_deref(), Some("1"));
    assert_eq!(env.editor_node.as_deref(), Some("/usr/bin/editbridge"));
    assert_eq!(env.editor_main, Some(host.shims.main().display().to_string()));

    let disabled = host.editor.disabled_env();
    assert_eq!(disabled.git_editor, host.shims.empty().display().to_string());
    assert_eq!(disabled.vars().len(), 1);

    host.shutdown().await;
  }

  /// The registry only routes; a handler registered under the editor's name
  /// by someone else is rejected while the editor is live.
  #[tokio::test]
  async fn test_editor_command_cannot_be_hijacked() {
    struct Noop;

    #[async_trait::async_trait]
    impl IpcHandler for Noop {
      async fn handle(&self, _: serde_json::Value) -> Result<Option<serde_json::Value>, IpcError> {
        Ok(None)
      }
    }

    let host = TestHost::start().await;
    let result = host.registry.register(GIT_EDITOR_COMMAND, std::sync::Arc::new(Noop));
    assert!(matches!(result, Err(IpcError::DuplicateCommand { .. })));
    host.shutdown().await;
  }
}
