//! Windowing glue for the interactive backend.
//!
//! Owns window creation, the caller-pumped event loop, and per-pump input
//! processing (close/Escape requests, surface resizes).

mod shell;

pub use shell::{WindowConfig, WindowShell};
