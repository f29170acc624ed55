//! Draw staging and recording.
//!
//! Draws are staged on the CPU first (geometry layout, uniform bytes,
//! argument validation) and only then recorded against a device. The split
//! keeps every draw-call law testable without a GPU.

mod record;
mod stage;

pub use record::{record_clear, record_draw};
pub use stage::{flat_uniforms, stage_path, stage_rectangle, DrawTopology, StagedDraw};
