//! IPC module - client/server communication and type definitions
use serde::{Deserialize, Serialize, de::DeserializeOwned};

pub mod types;

pub mod client;

pub use client::{Client, IpcRequest};
pub use types::*;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error, Serialize, Deserialize)]
pub enum IpcError {
  #[error("Command already registered: {command}")]
  DuplicateCommand { command: String },
  #[error("Unknown command: {command}")]
  UnknownCommand { command: String },
  #[error("Failed to open {path}: {message}")]
  ResourceOpen { path: String, message: String },
  #[error("Invalid params: {0}")]
  InvalidParams(String),
  #[error("Request cancelled")]
  Cancelled,
  #[error("Timed out after {millis}ms waiting for the editor to close")]
  Timeout { millis: u64 },
  #[error("Presentation error: {0}")]
  Presentation(String),
  #[error("Ser/de error: {0}")]
  Serde(String),
  #[error("RPC error {code}: {message}")]
  Rpc { code: i32, message: String },
  #[error("No result in response")]
  NoResult,
  #[error("IO error: {0}")]
  Io(String),
  #[error("Server shutdown")]
  Shutdown,
  #[error("Connection error: {0}")]
  Connection(String),
  #[error("Codec error: {0}")]
  Codec(String),
}

impl IpcError {
  /// JSON-RPC style error code for this error.
  ///
  /// - `-32700`: parse error
  /// - `-32601`: command not found
  /// - `-32602`: invalid params
  /// - `-32000`: everything else
  pub fn code(&self) -> i32 {
    match self {
      Self::Serde(_) => -32700,
      Self::UnknownCommand { .. } => -32601,
      Self::InvalidParams(_) => -32602,
      Self::Rpc { code, .. } => *code,
      _ => -32000,
    }
  }
}

impl From<serde_json::Error> for IpcError {
  fn from(err: serde_json::Error) -> Self {
    IpcError::Serde(err.to_string())
  }
}

impl From<std::io::Error> for IpcError {
  fn from(err: std::io::Error) -> Self {
    IpcError::Io(err.to_string())
  }
}

impl From<tokio_util::codec::LinesCodecError> for IpcError {
  fn from(err: tokio_util::codec::LinesCodecError) -> Self {
    IpcError::Codec(err.to_string())
  }
}

/// Decode a command payload into its parameter type.
///
/// A missing payload (`null`) decodes as the parameter type's default so
/// callers may omit `payload` entirely for commands without arguments.
pub fn decode_params<T: DeserializeOwned + Default>(payload: serde_json::Value) -> Result<T, IpcError> {
  if payload.is_null() {
    return Ok(T::default());
  }
  serde_json::from_value(payload).map_err(|e| IpcError::InvalidParams(e.to_string()))
}

// ============================================================================
// Request/Response envelopes (top-level IPC protocol)
// ============================================================================

/// One line on the wire from a helper to the host.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Request {
  pub id: String,
  pub command: String,
  #[serde(default)]
  pub payload: serde_json::Value,
}

/// One line on the wire from the host back to a helper.
///
/// Exactly one of `result` / `error` is set for a failed call; a successful
/// call that produced nothing carries neither.
#[serde_with::skip_serializing_none]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Response {
  pub id: String,
  #[serde(default)]
  pub result: Option<serde_json::Value>,
  #[serde(default)]
  pub error: Option<IpcError>,
}

impl Response {
  pub fn is_ok(&self) -> bool {
    !self.is_error()
  }

  pub fn is_error(&self) -> bool {
    self.error.is_some()
  }

  pub fn get_error(&self) -> Option<&IpcError> {
    self.error.as_ref()
  }

  /// Create a success response, with or without a result
  pub fn success(id: impl Into<String>, result: Option<serde_json::Value>) -> Self {
    Self {
      id: id.into(),
      result,
      error: None,
    }
  }

  /// Create an error response
  pub fn error(id: impl Into<String>, error: IpcError) -> Self {
    Self {
      id: id.into(),
      result: None,
      error: Some(error),
    }
  }

  /// Create an RPC error response with code and message
  pub fn rpc_error(id: impl Into<String>, code: i32, message: impl Into<String>) -> Self {
    Self::error(
      id,
      IpcError::Rpc {
        code,
        message: message.into(),
      },
    )
  }

  /// Split the response into the caller-facing result
  pub fn into_result(self) -> Result<Option<serde_json::Value>, IpcError> {
    match self.error {
      Some(error) => Err(error),
      None => Ok(self.result),
    }
  }
}
