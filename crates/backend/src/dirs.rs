/// Get the default socket path
pub fn default_socket_path() -> std::path::PathBuf {
  // Try XDG_RUNTIME_DIR first, fallback to /tmp
  if let Ok(runtime_dir) = std::env::var("XDG_RUNTIME_DIR") {
    std::path::PathBuf::from(runtime_dir).join("editbridge.sock")
  } else {
    let uid = unsafe { libc::getuid() };
    std::path::PathBuf::from(format!("/tmp/editbridge-{}.sock", uid))
  }
}

/// Get the default directory for invocation shims
///
/// Shims live next to the socket so a host and the helpers it hands out
/// always agree on where they are.
pub fn default_runtime_dir() -> std::path::PathBuf {
  if let Ok(runtime_dir) = std::env::var("XDG_RUNTIME_DIR") {
    std::path::PathBuf::from(runtime_dir).join("editbridge")
  } else {
    let uid = unsafe { libc::getuid() };
    std::path::PathBuf::from(format!("/tmp/editbridge-{}", uid))
  }
}

/// Check if a host is accepting connections on the given socket.
pub fn is_host_running(socket_path: &std::path::Path) -> bool {
  std::os::unix::net::UnixStream::connect(socket_path).is_ok()
}

/// Get the default base path for editbridge data (log files)
///
/// Respects the following environment variables (in order of precedence):
/// 1. DATA_DIR - explicit data directory override
/// 2. XDG_DATA_HOME - standard XDG data home directory
/// 3. dirs::data_local_dir() - platform default
pub fn default_data_dir() -> std::path::PathBuf {
  if let Ok(dir) = std::env::var("DATA_DIR") {
    return std::path::PathBuf::from(dir);
  }

  if let Ok(xdg_data) = std::env::var("XDG_DATA_HOME") {
    return std::path::PathBuf::from(xdg_data).join("editbridge");
  }

  dirs::data_local_dir()
    .unwrap_or_else(|| std::path::PathBuf::from("."))
    .join("editbridge")
}

/// Get the default config directory
///
/// Respects the following environment variables (in order of precedence):
/// 1. CONFIG_DIR - explicit config directory override
/// 2. XDG_CONFIG_HOME - standard XDG config home directory
/// 3. dirs::config_dir() - platform default
pub fn default_config_dir() -> std::path::PathBuf {
  if let Ok(dir) = std::env::var("CONFIG_DIR") {
    return std::path::PathBuf::from(dir);
  }

  if let Ok(xdg_config) = std::env::var("XDG_CONFIG_HOME") {
    return std::path::PathBuf::from(xdg_config).join("editbridge");
  }

  dirs::config_dir()
    .unwrap_or_else(|| std::path::PathBuf::from("."))
    .join("editbridge")
}
