use oresme_backend::{BackendError, Color};

use crate::program::{ProgramInterface, UniformSlot, U_COLOR, U_WINDOW_HEIGHT, U_WINDOW_WIDTH};
use crate::viewport::Viewport;

/// Primitive class of one staged draw; selects the pipeline at record time.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum DrawTopology {
    /// Indexed triangle list (rectangle fills).
    FillQuad,
    /// Line strip through the vertices in order.
    Polyline,
}

/// One draw call staged on the CPU: interleaved `[x, y]` device-space
/// vertices plus optional indices. No device types involved, so staging is
/// testable without a GPU.
#[derive(Debug, Clone, PartialEq)]
pub struct StagedDraw {
    pub topology: DrawTopology,
    pub vertices: Vec<f32>,
    pub indices: Option<Vec<u16>>,
}

impl StagedDraw {
    pub fn vertex_count(&self) -> u32 {
        (self.vertices.len() / 2) as u32
    }

    pub fn index_count(&self) -> u32 {
        self.indices.as_ref().map_or(0, |i| i.len() as u32)
    }
}

/// Stages a filled rectangle spanned by `(x1, y1)`–`(x2, y2)`.
///
/// Vertex order is top-right, bottom-right, bottom-left, top-left, with the
/// quad split along the TR–TL diagonal. Corners are taken as given; a
/// "swapped" span mirrors the geometry rather than being normalized.
pub fn stage_rectangle(x1: f64, x2: f64, y1: f64, y2: f64) -> StagedDraw {
    let (x1, x2) = (x1 as f32, x2 as f32);
    let (y1, y2) = (y1 as f32, y2 as f32);

    StagedDraw {
        topology: DrawTopology::FillQuad,
        vertices: vec![
            x2, y2, // top right
            x2, y1, // bottom right
            x1, y1, // bottom left
            x1, y2, // top left
        ],
        indices: Some(vec![0, 1, 3, 1, 2, 3]),
    }
}

/// Stages a polyline through `(xs[i], ys[i])`.
///
/// Mismatched slice lengths fail before anything is allocated; fewer than two
/// points stages nothing (`Ok(None)`) since no segment exists.
pub fn stage_path(xs: &[f64], ys: &[f64]) -> Result<Option<StagedDraw>, BackendError> {
    if xs.len() != ys.len() {
        return Err(BackendError::DimensionMismatch {
            xs: xs.len(),
            ys: ys.len(),
        });
    }
    if xs.len() < 2 {
        return Ok(None);
    }

    let mut vertices = Vec::with_capacity(xs.len() * 2);
    for (&x, &y) in xs.iter().zip(ys) {
        vertices.push(x as f32);
        vertices.push(y as f32);
    }

    Ok(Some(StagedDraw {
        topology: DrawTopology::Polyline,
        vertices,
        indices: None,
    }))
}

/// Builds the uniform block bytes for one flat-color draw: viewport extent at
/// the reflected `windowWidth`/`windowHeight` offsets and the remapped color
/// at the `color` offset.
///
/// Uniform lookups go through the reflected interface, so a shader that lost
/// one of the named uniforms fails here with
/// [`BackendError::UniformNotFound`].
pub fn flat_uniforms(
    interface: &ProgramInterface,
    viewport: Viewport,
    color: Color,
) -> Result<Vec<u8>, BackendError> {
    let width_slot = interface.uniform(U_WINDOW_WIDTH)?;
    let height_slot = interface.uniform(U_WINDOW_HEIGHT)?;
    let color_slot = interface.uniform(U_COLOR)?;

    let block = &interface.blocks()[width_slot.block];
    let mut bytes = vec![0u8; block.size as usize];

    write_slot(&mut bytes, width_slot, bytemuck::bytes_of(&(viewport.width as f32)));
    write_slot(&mut bytes, height_slot, bytemuck::bytes_of(&(viewport.height as f32)));
    write_slot(&mut bytes, color_slot, bytemuck::bytes_of(&color.to_shader_rgba()));

    Ok(bytes)
}

fn write_slot(bytes: &mut [u8], slot: UniformSlot, value: &[u8]) {
    debug_assert_eq!(value.len(), slot.size as usize);
    let start = slot.offset as usize;
    bytes[start..start + value.len()].copy_from_slice(value);
}
