use anyhow::{Context, Result};

use oresme_backend::{Backend, BackendError, Color};

use crate::device::{HeadlessGpu, TARGET_FORMAT};
use crate::program::{FlatColorProgram, FRAG_SOURCE, VERT_SOURCE};
use crate::raster::{
    flat_uniforms, record_clear, record_draw, stage_path, stage_rectangle, StagedDraw,
};
use crate::viewport::Viewport;

/// Static-output backend: renders into an offscreen texture and exports
/// image files.
///
/// The render target is resizable through the size setters; position is plain
/// metadata. `render_data` commits the frame and, when an output file is
/// configured, reads the target back and writes it.
pub struct OffscreenBackend {
    encoder: Option<wgpu::CommandEncoder>,
    program: FlatColorProgram,
    gpu: HeadlessGpu,

    drew: bool,
    output: String,
    format: &'static str,
    position: (u32, u32),
    max_vertex_attributes: u32,
}

impl OffscreenBackend {
    /// Creates the headless GPU context and the flat-color program.
    pub fn new(width: u32, height: u32) -> Result<Self> {
        let gpu = pollster::block_on(HeadlessGpu::new(Viewport::new(width, height)))?;
        let program =
            FlatColorProgram::compile_and_link(gpu.device(), TARGET_FORMAT, VERT_SOURCE, FRAG_SOURCE)
                .context("failed to build flat-color program")?;
        let max_vertex_attributes = gpu.max_vertex_attributes();

        Ok(OffscreenBackend {
            encoder: None,
            program,
            gpu,
            drew: false,
            output: String::new(),
            format: "png",
            position: (0, 0),
            max_vertex_attributes,
        })
    }

    /// Device limit queried at construction.
    pub fn max_vertex_attributes(&self) -> u32 {
        self.max_vertex_attributes
    }

    /// Reads the current target back as tightly packed RGBA8 rows, top row
    /// first.
    pub fn read_pixels(&self) -> Result<Vec<u8>, BackendError> {
        self.gpu
            .read_pixels()
            .map_err(|e| BackendError::output(format!("{e:#}")))
    }

    fn resize_target(&mut self, extent: Viewport) -> Result<(), BackendError> {
        if !extent.is_renderable() {
            log::warn!(
                "ignoring zero-size resize request ({} x {})",
                extent.width,
                extent.height
            );
            return Ok(());
        }
        if extent == self.gpu.extent() {
            return Ok(());
        }

        // Draws recorded so far target the old texture; they can no longer
        // reach the new one.
        if self.encoder.take().is_some() {
            self.drew = false;
            log::debug!("pending frame discarded by resize");
        }

        self.gpu.resize(extent);
        Ok(())
    }

    fn record(&mut self, draw: &StagedDraw, color: Color) -> Result<(), BackendError> {
        // Validation (uniform lookup) happens before the encoder is touched,
        // so a failed call leaves frame state unchanged.
        let uniforms = flat_uniforms(self.program.interface(), self.gpu.extent(), color)?;

        let encoder = self.encoder.get_or_insert_with(|| self.gpu.begin_frame());
        record_draw(
            self.gpu.device(),
            encoder,
            self.gpu.view(),
            &self.program,
            draw,
            &uniforms,
        );
        Ok(())
    }

    fn export(&self) -> Result<()> {
        let pixels = self
            .gpu
            .read_pixels()
            .context("failed to read render target")?;
        let extent = self.gpu.extent();

        let rgba = image::RgbaImage::from_raw(extent.width, extent.height, pixels)
            .context("readback does not match target extent")?;

        match self.format {
            "png" => rgba.save_with_format(&self.output, image::ImageFormat::Png)?,
            // JPEG carries no alpha channel.
            "jpeg" => image::DynamicImage::ImageRgba8(rgba)
                .to_rgb8()
                .save_with_format(&self.output, image::ImageFormat::Jpeg)?,
            "bmp" => rgba.save_with_format(&self.output, image::ImageFormat::Bmp)?,
            other => anyhow::bail!("unhandled output format '{other}'"),
        }

        log::info!(
            "wrote {} ({} x {} {})",
            self.output,
            extent.width,
            extent.height,
            self.format
        );
        Ok(())
    }
}

impl Backend for OffscreenBackend {
    fn is_interactive(&self) -> bool {
        false
    }

    fn supports_fonts(&self) -> bool {
        false
    }

    fn width(&self) -> Result<u32, BackendError> {
        Ok(self.gpu.extent().width)
    }

    fn height(&self) -> Result<u32, BackendError> {
        Ok(self.gpu.extent().height)
    }

    fn set_width(&mut self, width: u32) -> Result<(), BackendError> {
        let extent = Viewport::new(width, self.gpu.extent().height);
        self.resize_target(extent)
    }

    fn set_height(&mut self, height: u32) -> Result<(), BackendError> {
        let extent = Viewport::new(self.gpu.extent().width, height);
        self.resize_target(extent)
    }

    fn position_x(&self) -> Result<u32, BackendError> {
        Ok(self.position.0)
    }

    fn position_y(&self) -> Result<u32, BackendError> {
        Ok(self.position.1)
    }

    fn set_position_x(&mut self, x: u32) -> Result<(), BackendError> {
        self.position.0 = x;
        Ok(())
    }

    fn set_position_y(&mut self, y: u32) -> Result<(), BackendError> {
        self.position.1 = y;
        Ok(())
    }

    fn output(&self) -> Result<&str, BackendError> {
        Ok(&self.output)
    }

    fn output_format(&self) -> Result<&str, BackendError> {
        Ok(self.format)
    }

    fn set_output(&mut self, filename: &str) -> Result<bool, BackendError> {
        let Some(format) = format_for_filename(filename) else {
            return Ok(false);
        };
        self.output = filename.to_owned();
        self.format = format;
        Ok(true)
    }

    fn set_output_with_format(
        &mut self,
        filename: &str,
        format: &str,
    ) -> Result<bool, BackendError> {
        let Some(format) = normalize_format(format) else {
            return Ok(false);
        };
        self.output = filename.to_owned();
        self.format = format;
        Ok(true)
    }

    fn new_frame(&mut self) -> Result<(), BackendError> {
        Ok(())
    }

    fn render_data(&mut self) -> Result<bool, BackendError> {
        if let Some(encoder) = self.encoder.take() {
            self.gpu.submit(encoder);
        }
        let drew = std::mem::take(&mut self.drew);

        if !self.output.is_empty() {
            self.export()
                .map_err(|e| BackendError::output(format!("{e:#}")))?;
        }

        Ok(drew)
    }

    fn draw_background(&mut self, color: Color) -> Result<(), BackendError> {
        let encoder = self.encoder.get_or_insert_with(|| self.gpu.begin_frame());
        record_clear(encoder, self.gpu.view(), color);
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
}

/// Maps a filename extension onto a handled output format.
fn format_for_filename(filename: &str) -> Option<&'static str> {
    let ext = filename.rsplit_once('.')?.1;
    normalize_format(ext)
}

/// Canonicalizes a format name; unhandled formats map to `None`.
fn normalize_format(format: &str) -> Option<&'static str> {
    match format.to_ascii_lowercase().as_str() {
        "png" => Some("png"),
        "jpg" | "jpeg" => Some("jpeg"),
        "bmp" => Some("bmp"),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Builds a backend, or skips the calling test when no adapter exists
    /// (headless CI without GPU or software rasterizer).
    fn gpu_backend(width: u32, height: u32) -> Option<OffscreenBackend> {
        match OffscreenBackend::new(width, height) {
            Ok(b) => Some(b),
            Err(e) => {
                eprintln!("skipping GPU test: {e:#}");
                None
            }
        }
    }

    fn pixel(pixels: &[u8], width: u32, x: u32, y_from_top: u32) -> [u8; 4] {
        let i = ((y_from_top * width + x) * 4) as usize;
        [pixels[i], pixels[i + 1], pixels[i + 2], pixels[i + 3]]
    }

    // ── format selection (no device) ──────────────────────────────────────

    #[test]
    fn filename_extension_selects_format() {
        assert_eq!(format_for_filename("plot.png"), Some("png"));
        assert_eq!(format_for_filename("plot.JPG"), Some("jpeg"));
        assert_eq!(format_for_filename("dir.v2/plot.bmp"), Some("bmp"));
        assert_eq!(format_for_filename("plot.svg"), None);
        assert_eq!(format_for_filename("plot"), None);
    }

    #[test]
    fn format_names_are_normalized() {
        assert_eq!(normalize_format("PNG"), Some("png"));
        assert_eq!(normalize_format("jpeg"), Some("jpeg"));
        assert_eq!(normalize_format("jpg"), Some("jpeg"));
        assert_eq!(normalize_format("gif"), None);
    }

    // ── capability & frame state (device) ─────────────────────────────────

    #[test]
    fn unsupported_draws_leave_frame_state_untouched() {
        let Some(mut b) = gpu_backend(32, 32) else {
            return;
        };

        assert!(matches!(
            b.draw_markers(&[1.0], &[1.0], &[0.0]),
            Err(BackendError::Unsupported { operation: "draw_markers" })
        ));
        assert!(matches!(
            b.draw_text(&[1.0], &[1.0], &[0.0]),
            Err(BackendError::Unsupported { .. })
        ));
        assert!(matches!(
            b.draw_triangle(&[1.0], &[1.0], &[0.0]),
            Err(BackendError::Unsupported { .. })
        ));

        // Nothing was rendered by the failed calls.
        assert_eq!(b.render_data().unwrap(), false);
    }

    #[test]
    fn path_dimension_mismatch_stages_nothing() {
        let Some(mut b) = gpu_backend(32, 32) else {
            return;
        };

        let err = b
            .draw_path(&[0.0, 1.0], &[0.0, 1.0, 2.0], Color::opaque(1.0, 1.0, 1.0))
            .unwrap_err();
        assert!(matches!(err, BackendError::DimensionMismatch { xs: 2, ys: 3 }));
        assert_eq!(b.render_data().unwrap(), false);
    }

    #[test]
    fn resize_is_idempotent_and_ignores_zero() {
        let Some(mut b) = gpu_backend(64, 48) else {
            return;
        };

        b.set_width(100).unwrap();
        b.set_width(100).unwrap();
        assert_eq!(b.width().unwrap(), 100);
        assert_eq!(b.height().unwrap(), 48);

        b.set_height(0).unwrap();
        assert_eq!(b.height().unwrap(), 48);
    }

    #[test]
    fn position_is_stored_metadata() {
        let Some(mut b) = gpu_backend(16, 16) else {
            return;
        };

        assert_eq!(b.position_x().unwrap(), 0);
        b.set_position_x(120).unwrap();
        b.set_position_y(80).unwrap();
        assert_eq!((b.position_x().unwrap(), b.position_y().unwrap()), (120, 80));
    }

    // ── end-to-end draws (device) ─────────────────────────────────────────

    #[test]
    fn background_and_rectangle_land_in_the_target() {
        let Some(mut b) = gpu_backend(64, 64) else {
            return;
        };

        b.new_frame().unwrap();
        b.draw_background(Color::opaque(1.0, 0.0, 0.0)).unwrap();
        b.draw_rectangle(16.0, 48.0, 16.0, 48.0, Color::opaque(0.0, 0.0, 1.0))
            .unwrap();
        assert_eq!(b.render_data().unwrap(), true);

        let pixels = b.read_pixels().unwrap();

        // Center of the rectangle: blue.
        assert_eq!(pixel(&pixels, 64, 32, 32), [0, 0, 255, 255]);
        // Near the top-left corner, outside the rectangle: background red.
        assert_eq!(pixel(&pixels, 64, 2, 2), [255, 0, 0, 255]);

        // The commit consumed the frame.
        assert_eq!(b.render_data().unwrap(), false);
    }

    #[test]
    fn path_draws_along_its_segment() {
        let Some(mut b) = gpu_backend(64, 64) else {
            return;
        };

        b.draw_background(Color::opaque(0.0, 0.0, 0.0)).unwrap();
        // Horizontal line across the middle.
        b.draw_path(
            &[0.0, 64.0],
            &[32.0, 32.0],
            Color::opaque(0.0, 1.0, 0.0),
        )
        .unwrap();
        assert_eq!(b.render_data().unwrap(), true);

        let pixels = b.read_pixels().unwrap();
        // A line y=32 rasterizes one pixel thick; accept either adjacent row.
        let on_row = |row: u32| pixel(&pixels, 64, 32, row) == [0, 255, 0, 255];
        assert!(on_row(31) || on_row(32), "line not found near center row");
    }

    #[test]
    fn png_export_writes_the_rendered_frame() {
        let Some(mut b) = gpu_backend(32, 24) else {
            return;
        };

        let path = std::env::temp_dir().join(format!("oresme-export-{}.png", std::process::id()));
        let path_str = path.to_string_lossy().into_owned();

        assert!(b.set_output(&path_str).unwrap());
        assert_eq!(b.output().unwrap(), path_str);
        assert_eq!(b.output_format().unwrap(), "png");

        b.draw_background(Color::opaque(0.0, 1.0, 0.0)).unwrap();
        assert_eq!(b.render_data().unwrap(), true);

        let exported = image::open(&path).unwrap().to_rgba8();
        assert_eq!(exported.dimensions(), (32, 24));
        assert_eq!(exported.get_pixel(5, 5).0, [0, 255, 0, 255]);

        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn unknown_output_format_is_rejected_without_state_change() {
        let Some(mut b) = gpu_backend(16, 16) else {
            return;
        };

        assert!(!b.set_output("plot.svg").unwrap());
        assert!(!b.set_output_with_format("plot.raw", "tiff").unwrap());
        assert_eq!(b.output().unwrap(), "");
        assert_eq!(b.output_format().unwrap(), "png");
    }
}
