//! Oresme backend contract crate.
//!
//! This crate owns the backend capability trait, the shared color model and
//! the error taxonomy used by every backend variant. It stays free of GPU and
//! windowing dependencies so non-accelerated variants can depend on it too.

pub mod backend;
pub mod color;
pub mod error;
pub mod wait;

pub use backend::Backend;
pub use color::Color;
pub use error::{BackendError, ShaderStage};
