/// Viewport extent in physical pixels.
///
/// This is the coordinate basis for the vertex stage: draw coordinates arrive
/// in device space (`0..=width`, `0..=height`, origin bottom-left) and the
/// shader maps them to clip space. [`Viewport::clip_of`] mirrors that mapping
/// on the CPU so the law stays testable without a GPU device.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

impl Viewport {
    #[inline]
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Whether a frame can be rendered at this extent.
    ///
    /// Zero-area extents are rejected by the surface and by texture creation,
    /// so callers skip rendering (and keep the previous extent) while this is
    /// false.
    #[inline]
    pub fn is_renderable(self) -> bool {
        self.width > 0 && self.height > 0
    }

    /// Maps a device-space point to clip space: `(p / extent) * 2 - 1`.
    ///
    /// `(0, 0)` maps to the bottom-left clip corner `(-1, -1)` and
    /// `(width, height)` to the top-right `(1, 1)`; the y axis already points
    /// up in both spaces, so no flip is applied. Points outside the viewport
    /// map outside `[-1, 1]` and are clipped by the rasterizer.
    #[inline]
    pub fn clip_of(self, x: f64, y: f64) -> [f32; 2] {
        [
            (x / self.width as f64 * 2.0 - 1.0) as f32,
            (y / self.height as f64 * 2.0 - 1.0) as f32,
        ]
    }
}
