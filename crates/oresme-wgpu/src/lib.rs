//! Oresme wgpu backend crate.
//!
//! This crate owns the GPU runtime behind the [`oresme_backend::Backend`]
//! contract: a windowed variant driven through winit and an offscreen variant
//! that renders to a texture and exports image files.

pub mod device;
pub mod window;
pub mod windowed;
pub mod offscreen;

pub mod logging;
pub mod viewport;
pub mod program;
pub mod raster;
