use anyhow::{Context, Result};

use oresme_backend::{Backend, BackendError, Color};

use crate::device::{GpuFrame, GpuInit, SurfaceErrorAction};
use crate::program::{FlatColorProgram, FRAG_SOURCE, VERT_SOURCE};
use crate::raster::{
    flat_uniforms, record_clear, record_draw, stage_path, stage_rectangle, StagedDraw,
};
use crate::window::{WindowConfig, WindowShell};

/// Interactive backend: renders into a winit window.
///
/// The caller drives the frame protocol; the shell's event loop is pumped on
/// `new_frame` (close/Escape requests, resizes) and blocked on in `wait`.
/// Size setters, position and file output are not provided by this variant.
pub struct WindowedBackend {
    // Field order fixes drop order: in-flight frame first, shell last.
    frame: Option<GpuFrame>,
    program: FlatColorProgram,
    shell: WindowShell,

    drew: bool,
    max_vertex_attributes: u32,
}

impl WindowedBackend {
    /// Creates the window, the GPU context and the flat-color program.
    pub fn new(config: WindowConfig, init: GpuInit) -> Result<Self> {
        let shell = WindowShell::new(config, init)?;

        let (program, max_vertex_attributes) = shell
            .with_gpu(|gpu| {
                (
                    FlatColorProgram::compile_and_link(
                        gpu.device(),
                        gpu.surface_format(),
                        VERT_SOURCE,
                        FRAG_SOURCE,
                    ),
                    gpu.max_vertex_attributes(),
                )
            })
            .context("window closed during construction")?;
        let program = program.context("failed to build flat-color program")?;

        Ok(WindowedBackend {
            frame: None,
            program,
            shell,
            drew: false,
            max_vertex_attributes,
        })
    }

    /// Device limit queried at construction.
    pub fn max_vertex_attributes(&self) -> u32 {
        self.max_vertex_attributes
    }

    /// Acquires the frame to record into, reconfiguring the surface once if
    /// it was lost or outdated.
    fn ensure_frame(&mut self) -> Result<(), BackendError> {
        if self.frame.is_some() {
            return Ok(());
        }

        let mut retried = false;
        loop {
            let begun = self
                .shell
                .with_gpu(|gpu| gpu.begin_frame())
                .ok_or_else(window_closed)?;

            match begun {
                Ok(frame) => {
                    self.frame = Some(frame);
                    return Ok(());
                }
                Err(err) => {
                    log::debug!("surface frame acquisition failed: {err}");
                    let action = self
                        .shell
                        .with_gpu_mut(|gpu| gpu.handle_surface_error(err))
                        .ok_or_else(window_closed)?;

                    match action {
                        SurfaceErrorAction::Reconfigured if !retried => retried = true,
                        SurfaceErrorAction::Reconfigured | SurfaceErrorAction::SkipFrame => {
                            return Err(BackendError::device("surface frame unavailable"));
                        }
                        SurfaceErrorAction::Fatal => {
                            return Err(BackendError::device("surface out of memory"));
                        }
                    }
                }
            }
        }
    }

    fn record(&mut self, draw: &StagedDraw, color: Color) -> Result<(), BackendError> {
        self.ensure_frame()?;

        let program = &self.program;
        let Some(frame) = self.frame.as_mut() else {
            return Err(window_closed());
        };

        self.shell
            .with_gpu(|gpu| {
                let uniforms = flat_uniforms(program.interface(), gpu.viewport(), color)?;
                record_draw(
                    gpu.device(),
                    &mut frame.encoder,
                    &frame.view,
                    program,
                    draw,
                    &uniforms,
                );
                Ok(())
            })
            .ok_or_else(window_closed)?
    }
}

impl Backend for WindowedBackend {
    fn is_interactive(&self) -> bool {
        true
    }

    fn supports_fonts(&self) -> bool {
        false
    }

    fn width(&self) -> Result<u32, BackendError> {
        self.shell
            .with_window(|w| w.inner_size().width)
            .ok_or_else(window_closed)
    }

    fn height(&self) -> Result<u32, BackendError> {
        self.shell
            .with_window(|w| w.inner_size().height)
            .ok_or_else(window_closed)
    }

    fn set_width(&mut self, _width: u32) -> Result<(), BackendError> {
        Err(BackendError::unsupported("set_width"))
    }

    fn set_height(&mut self, _height: u32) -> Result<(), BackendError> {
        Err(BackendError::unsupported("set_height"))
    }

    fn position_x(&self) -> Result<u32, BackendError> {
        Err(BackendError::unsupported("position_x"))
    }

    fn position_y(&self) -> Result<u32, BackendError> {
        Err(BackendError::unsupported("position_y"))
    }

    fn set_position_x(&mut self, _x: u32) -> Result<(), BackendError> {
        Err(BackendError::unsupported("set_position_x"))
    }

    fn set_position_y(&mut self, _y: u32) -> Result<(), BackendError> {
        Err(BackendError::unsupported("set_position_y"))
    }

    fn output(&self) -> Result<&str, BackendError> {
        Err(BackendError::unsupported("output"))
    }

    fn output_format(&self) -> Result<&str, BackendError> {
        Err(BackendError::unsupported("output_format"))
    }

    fn set_output(&mut self, _filename: &str) -> Result<bool, BackendError> {
        Err(BackendError::unsupported("set_output"))
    }

    fn set_output_with_format(
        &mut self,
        _filename: &str,
        _format: &str,
    ) -> Result<bool, BackendError> {
        Err(BackendError::unsupported("set_output_with_format"))
    }

    fn new_frame(&mut self) -> Result<(), BackendError> {
        // Per-cycle input processing: close/Escape requests and resizes are
        // applied here, before the frame's draws read the viewport.
        self.shell.pump();
        if !self.shell.is_open() {
            return Err(window_closed());
        }
        Ok(())
    }

    fn render_data(&mut self) -> Result<bool, BackendError> {
        let Some(frame) = self.frame.take() else {
            return Ok(false);
        };

        self.shell
            .with_window(|w| w.pre_present_notify())
            .ok_or_else(window_closed)?;
        self.shell
            .with_gpu(|gpu| gpu.submit(frame))
            .ok_or_else(window_closed)?;

        Ok(std::mem::take(&mut self.drew))
    }

    fn draw_background(&mut self, color: Color) -> Result<(), BackendError> {
        self.ensure_frame()?;
        let Some(frame) = self.frame.as_mut() else {
            return Err(window_closed());
        };

        record_clear(&mut frame.encoder, &frame.view, color);
        self.drew = true;
        Ok(())
    }

    fn draw_rectangle(
        &mut self,
        x1: f64,
        x2: f64,
        y1: f64,
        y2: f64,
        color: Color,
    ) -> Result<(), BackendError> {
        let draw = stage_rectangle(x1, x2, y1, y2);
        self.record(&draw, color)?;
        self.drew = true;
        Ok(())
    }

    fn draw_path(&mut self, xs: &[f64], ys: &[f64], color: Color) -> Result<(), BackendError> {
        let Some(draw) = stage_path(xs, ys)? else {
            return Ok(());
        };
        self.record(&draw, color)?;
        self.drew = true;
        Ok(())
    }

    fn draw_markers(&mut self, _xs: &[f64], _ys: &[f64], _zs: &[f64]) -> Result<(), BackendError> {
        Err(BackendError::unsupported("draw_markers"))
    }

    fn draw_text(&mut self, _xs: &[f64], _ys: &[f64], _zs: &[f64]) -> Result<(), BackendError> {
        Err(BackendError::unsupported("draw_text"))
    }

    fn draw_image(
        &mut self,
        _x: &[Vec<f64>],
        _y: &[Vec<f64>],
        _z: &[Vec<f64>],
    ) -> Result<(), BackendError> {
        Err(BackendError::unsupported("draw_image"))
    }

    fn draw_triangle(&mut self, _xs: &[f64], _ys: &[f64], _zs: &[f64]) -> Result<(), BackendError> {
        Err(BackendError::unsupported("draw_triangle"))
    }

    fn wait(&mut self) {
        // Anything recorded but not committed would outlive its surface.
        self.frame = None;
        self.shell.pump_until_dismissed();
    }
}

fn window_closed() -> BackendError {
    BackendError::device("window was closed")
}
