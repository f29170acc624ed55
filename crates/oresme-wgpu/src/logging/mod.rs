//! Logging utilities.
//!
//! This module centralizes logger initialization for backend hosts. It stays
//! on the standard `log` facade; only the initializer knows about
//! `env_logger`.

mod init;

pub use init::{init_logging, LoggingConfig};
