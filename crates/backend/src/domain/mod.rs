//! Domain types
//!
//! Host configuration, independent of IPC concerns.

pub mod config;
