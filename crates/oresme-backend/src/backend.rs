use crate::color::Color;
use crate::error::BackendError;

/// Capability contract implemented by every rendering backend variant.
///
/// The contract is deliberately flat: one trait, N implementing variants.
/// Every variant decides each primitive explicitly — an operation it does not
/// support fails with [`BackendError::Unsupported`] naming the operation and
/// leaves frame state untouched, so callers can fall back to another backend
/// or feature.
///
/// Frame protocol, per rendering cycle:
/// 1. [`new_frame`](Backend::new_frame) — prepare (no-op if nothing to do);
/// 2. [`draw_background`](Backend::draw_background) — once, before any
///    primitive;
/// 3. primitive draws, in any order;
/// 4. [`render_data`](Backend::render_data) — commit; returns whether
///    anything was rendered.
///
/// All operations must run on the thread owning the device/windowing context;
/// implementations perform no internal locking.
pub trait Backend {
    // ── capability flags ──────────────────────────────────────────────────

    /// Whether this variant presents to an interactive surface.
    fn is_interactive(&self) -> bool;

    /// Whether this variant can rasterize text itself.
    fn supports_fonts(&self) -> bool;

    // ── viewport & placement ──────────────────────────────────────────────

    /// Current viewport width in pixels, read live from the device context.
    fn width(&self) -> Result<u32, BackendError>;

    /// Current viewport height in pixels, read live from the device context.
    fn height(&self) -> Result<u32, BackendError>;

    fn set_width(&mut self, width: u32) -> Result<(), BackendError>;
    fn set_height(&mut self, height: u32) -> Result<(), BackendError>;

    fn position_x(&self) -> Result<u32, BackendError>;
    fn position_y(&self) -> Result<u32, BackendError>;
    fn set_position_x(&mut self, x: u32) -> Result<(), BackendError>;
    fn set_position_y(&mut self, y: u32) -> Result<(), BackendError>;

    // ── static output ─────────────────────────────────────────────────────

    /// Currently configured output file, if the variant renders to files.
    fn output(&self) -> Result<&str, BackendError>;

    /// Currently configured output format name (e.g. `"png"`).
    fn output_format(&self) -> Result<&str, BackendError>;

    /// Configures the output file; the format is derived from the filename.
    ///
    /// Returns `false` when the filename's format cannot be handled.
    fn set_output(&mut self, filename: &str) -> Result<bool, BackendError>;

    /// Configures the output file with an explicit format name.
    ///
    /// Returns `false` when the format is not handled by this variant.
    fn set_output_with_format(
        &mut self,
        filename: &str,
        format: &str,
    ) -> Result<bool, BackendError>;

    // ── frame cycle ───────────────────────────────────────────────────────

    /// Prepares the next frame. Also the per-cycle input-processing point for
    /// interactive variants (close/escape requests, resize application).
    fn new_frame(&mut self) -> Result<(), BackendError>;

    /// Commits the current frame (present or export).
    ///
    /// Returns whether anything was rendered this cycle.
    fn render_data(&mut self) -> Result<bool, BackendError>;

    /// Clears the frame with `color` (same channel remap as primitive draws).
    /// Must run once per frame before any primitive draw.
    fn draw_background(&mut self, color: Color) -> Result<(), BackendError>;

    // ── primitives ────────────────────────────────────────────────────────

    /// Draws a filled rectangle spanned by the corners `(x1, y1)`–`(x2, y2)`,
    /// in device-space coordinates.
    fn draw_rectangle(
        &mut self,
        x1: f64,
        x2: f64,
        y1: f64,
        y2: f64,
        color: Color,
    ) -> Result<(), BackendError>;

    /// Draws a polyline through `(xs[i], ys[i])`.
    ///
    /// Fails with [`BackendError::DimensionMismatch`] when the slices differ
    /// in length, before any GPU allocation takes place.
    fn draw_path(&mut self, xs: &[f64], ys: &[f64], color: Color) -> Result<(), BackendError>;

    fn draw_markers(&mut self, xs: &[f64], ys: &[f64], zs: &[f64]) -> Result<(), BackendError>;

    fn draw_text(&mut self, xs: &[f64], ys: &[f64], zs: &[f64]) -> Result<(), BackendError>;

    fn draw_image(
        &mut self,
        x: &[Vec<f64>],
        y: &[Vec<f64>],
        z: &[Vec<f64>],
    ) -> Result<(), BackendError>;

    fn draw_triangle(&mut self, xs: &[f64], ys: &[f64], zs: &[f64]) -> Result<(), BackendError>;

    // ── blocking ──────────────────────────────────────────────────────────

    /// Blocks until the presentation surface is dismissed.
    ///
    /// The default delegates to the shared blocking implementation
    /// ([`wait::block_until_dismissed`](crate::wait::block_until_dismissed));
    /// interactive variants override this with their own event-loop pump.
    fn wait(&mut self) {
        crate::wait::block_until_dismissed();
    }
}
