mod server;
mod system;

mod domain;
pub use domain::config;

pub mod dirs;
pub mod editor;
pub mod ipc;
pub mod presentation;
pub mod registry;

mod daemon;
pub use daemon::{Daemon, RuntimeConfig};
pub use server::{Server, ServerConfig};

#[cfg(test)]
mod __tests__;
