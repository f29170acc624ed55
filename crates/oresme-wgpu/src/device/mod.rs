//! GPU device + target management.
//!
//! This module is responsible for:
//! - creating the wgpu Instance/Adapter/Device/Queue
//! - creating & configuring the render target (surface swapchain or
//!   offscreen texture)
//! - acquiring frames and providing encoders/views for rendering

mod gpu;
mod headless;

pub use gpu::{Gpu, GpuFrame, GpuInit, SurfaceErrorAction};
pub use headless::{HeadlessGpu, TARGET_FORMAT};
