//! IPC types - request/response payloads per command
//!
//! Each command has its own module containing:
//! - The command name as it appears on the wire
//! - Request types (input parameters)
//! - Response types (output data)

pub mod editor;
pub mod system;
