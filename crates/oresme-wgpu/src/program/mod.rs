//! Shader program management.
//!
//! WGSL stage sources are parsed and validated CPU-side (via `naga`) before
//! pipeline creation, and the uniform interface is reflected from the IR so
//! draws address uniforms by name with byte-accurate offsets.

mod flat;
mod reflect;

pub use flat::{
    position_layout, FlatColorProgram, FRAG_SOURCE, U_COLOR, U_WINDOW_HEIGHT, U_WINDOW_WIDTH,
    VERT_SOURCE,
};
pub use reflect::{
    compile_stage, BlockBinding, BlockLayout, ProgramInterface, UniformSlot, FS_ENTRY, VS_ENTRY,
};
