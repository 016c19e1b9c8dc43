//! Invocation shims written to the runtime directory.
//!
//! Git runs `$GIT_EDITOR <file>` through a shell. The editor shim re-enters
//! the host binary in script-runner mode, passing the entry script path as
//! its first argument so the binary knows which entry to run.

use std::path::{Path, PathBuf};

use tracing::debug;

pub const EDITOR_SHIM: &str = "git-editor.sh";
pub const EMPTY_SHIM: &str = "git-editor-empty.sh";
pub const MAIN_ENTRY: &str = "git-editor-main";

const EDITOR_SCRIPT: &str = "#!/bin/sh\n\
ELECTRON_RUN_AS_NODE=\"1\" \"$VSCODE_GIT_EDITOR_NODE\" \"$VSCODE_GIT_EDITOR_MAIN\" $VSCODE_GIT_EDITOR_EXTRA_ARGS \"$@\"\n";

const EMPTY_SCRIPT: &str = "#!/bin/sh\n";

const MAIN_MARKER: &str = "# editbridge entry: git-editor\n";

#[derive(Debug, thiserror::Error)]
pub enum ShimError {
  #[error("Failed to write {}: {source}", path.display())]
  Write {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },
}

/// Entry scripts the host binary can run when invoked as a script runner
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScriptEntry {
  GitEditorMain,
}

impl ScriptEntry {
  /// Recognize an entry from the script path passed as the first argument
  pub fn from_path(path: &Path) -> Option<Self> {
    match path.file_name().and_then(|name| name.to_str()) {
      Some(MAIN_ENTRY) => Some(Self::GitEditorMain),
      _ => None,
    }
  }
}

/// Location of an installed set of shims
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShimSet {
  dir: PathBuf,
}

impl ShimSet {
  /// Refer to shims in `dir` without writing anything
  pub fn at(dir: impl Into<PathBuf>) -> Self {
    Self { dir: dir.into() }
  }

  /// Write all shims into `dir`, creating it if needed.
  ///
  /// Files whose content is already current are left alone.
  pub async fn install(dir: impl Into<PathBuf>) -> Result<Self, ShimError> {
    let set = Self::at(dir);

    tokio::fs::create_dir_all(&set.dir).await.map_err(|source| ShimError::Write {
      path: set.dir.clone(),
      source,
    })?;

    write_file(&set.editor(), EDITOR_SCRIPT, 0o755).await?;
    write_file(&set.empty(), EMPTY_SCRIPT, 0o755).await?;
    write_file(&set.main(), MAIN_MARKER, 0o644).await?;

    debug!(dir = %set.dir.display(), "Shims installed");
    Ok(set)
  }

  pub fn editor(&self) -> PathBuf {
    self.dir.join(EDITOR_SHIM)
  }

  pub fn empty(&self) -> PathBuf {
    self.dir.join(EMPTY_SHIM)
  }

  pub fn main(&self) -> PathBuf {
    self.dir.join(MAIN_ENTRY)
  }
}

async fn write_file(path: &Path, content: &str, mode: u32) -> Result<(), ShimError> {
  let err = |source| ShimError::Write {
    path: path.to_path_buf(),
    source,
  };

  let current = tokio::fs::read_to_string(path).await.ok();
  if current.as_deref() != Some(content) {
    tokio::fs::write(path, content).await.map_err(err)?;
  }

  #[cfg(unix)]
  {
    use std::os::unix::fs::PermissionsExt;
    tokio::fs::set_permissions(path, std::fs::Permissions::from_mode(mode))
      .await
      .map_err(err)?;
  }
  #[cfg(not(unix))]
  let _ = mode;

  Ok(())
}

#[cfg(test)]
mod tests {
  use std::os::unix::fs::PermissionsExt;

  use tempfile::TempDir;

  use super::*;

  #[tokio::test]
  async fn test_install_writes_executable_scripts() {
    let dir = TempDir::new().unwrap();
    let shims = ShimSet::install(dir.path().join("shims")).await.unwrap();

    for script in [shims.editor(), shims.empty()] {
      let mode = std::fs::metadata(&script).unwrap().permissions().mode();
      assert_eq!(mode & 0o777, 0o755, "{} should be executable", script.display());
    }

    let editor = std::fs::read_to_string(shims.editor()).unwrap();
    assert!(editor.starts_with("#!/bin/sh\n"));
    assert!(editor.contains("\"$VSCODE_GIT_EDITOR_NODE\" \"$VSCODE_GIT_EDITOR_MAIN\""));
    assert!(editor.trim_end().ends_with("\"$@\""));

    assert!(shims.main().exists());
  }

  #[tokio::test]
  async fn test_install_is_idempotent() {
    let dir = TempDir::new().unwrap();
    let first = ShimSet::install(dir.path()).await.unwrap();
    let second = ShimSet::install(dir.path()).await.unwrap();

    assert_eq!(first, second);
    assert_eq!(std::fs::read_to_string(first.empty()).unwrap(), "#!/bin/sh\n");
  }

  #[tokio::test]
  async fn test_install_repairs_modified_script() {
    let dir = TempDir::new().unwrap();
    let shims = ShimSet::install(dir.path()).await.unwrap();
    std::fs::write(shims.editor(), "garbage").unwrap();

    ShimSet::install(dir.path()).await.unwrap();
    assert_eq!(std::fs::read_to_string(shims.editor()).unwrap(), EDITOR_SCRIPT);
  }

  #[test]
  fn test_script_entry_from_path() {
    assert_eq!(
      ScriptEntry::from_path(Path::new("/run/editbridge/git-editor-main")),
      Some(ScriptEntry::GitEditorMain)
    );
    assert_eq!(ScriptEntry::from_path(Path::new("/run/editbridge/git-editor.sh")), None);
    assert_eq!(ScriptEntry::from_path(Path::new("commit")), None);
  }
}
