/// Flat draw color in the backend's `(alpha, r, g, b)` channel order.
///
/// Invariant:
/// - the `alpha` field stores *transparency*: `0.0` is fully opaque, `1.0` is
///   fully transparent. It is complemented to standard alpha at draw time.
///
/// Channel order and the complement are part of the draw contract; backends
/// must hand the shader `(r, g, b, 1 - alpha)` exactly.
#[derive(Debug, Copy, Clone, Default, PartialEq)]
pub struct Color {
    pub alpha: f32, // transparency: 0 = opaque
    pub r: f32,
    pub g: f32,
    pub b: f32,
}

impl Color {
    #[inline]
    pub const fn new(alpha: f32, r: f32, g: f32, b: f32) -> Self {
        Self { alpha, r, g, b }
    }

    /// Fully opaque color (alpha field 0).
    #[inline]
    pub const fn opaque(r: f32, g: f32, b: f32) -> Self {
        Self { alpha: 0.0, r, g, b }
    }

    /// Reads a color from the `[alpha, r, g, b]` array layout used by
    /// plotting front ends.
    #[inline]
    pub const fn from_array(c: [f32; 4]) -> Self {
        Self { alpha: c[0], r: c[1], g: c[2], b: c[3] }
    }

    #[inline]
    pub const fn to_array(self) -> [f32; 4] {
        [self.alpha, self.r, self.g, self.b]
    }

    /// Clamps all channels to `[0, 1]`.
    #[inline]
    pub fn clamped(self) -> Self {
        Self {
            alpha: self.alpha.clamp(0.0, 1.0),
            r: self.r.clamp(0.0, 1.0),
            g: self.g.clamp(0.0, 1.0),
            b: self.b.clamp(0.0, 1.0),
        }
    }

    /// Converts to the straight-alpha RGBA the shader receives:
    /// `(r, g, b, 1 - alpha)`.
    ///
    /// Components outside `[0, 1]` are clamped first, so out-of-range input
    /// cannot produce out-of-range shader values.
    #[inline]
    pub fn to_shader_rgba(self) -> [f32; 4] {
        let c = self.clamped();
        [c.r, c.g, c.b, 1.0 - c.alpha]
    }

    #[inline]
    pub fn is_finite(self) -> bool {
        self.alpha.is_finite() && self.r.is_finite() && self.g.is_finite() && self.b.is_finite()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // ── remap ─────────────────────────────────────────────────────────────

    #[test]
    fn remap_passes_rgb_through_and_complements_alpha() {
        let c = Color::new(0.25, 0.1, 0.4, 0.9);
        assert_eq!(c.to_shader_rgba(), [0.1, 0.4, 0.9, 0.75]);
    }

    #[test]
    fn remap_alpha_field_one_is_fully_transparent() {
        // (1, 0, 0, 0) is transparent black: shader alpha must be 0.
        let c = Color::new(1.0, 0.0, 0.0, 0.0);
        assert_eq!(c.to_shader_rgba(), [0.0, 0.0, 0.0, 0.0]);
    }

    #[test]
    fn remap_opaque_constructor_yields_alpha_one() {
        let c = Color::opaque(0.2, 0.5, 0.8);
        assert_eq!(c.to_shader_rgba(), [0.2, 0.5, 0.8, 1.0]);
    }

    // ── clamping ──────────────────────────────────────────────────────────

    #[test]
    fn remap_clamps_out_of_range_components() {
        let c = Color::new(-0.5, 1.5, -1.0, 0.5);
        assert_eq!(c.to_shader_rgba(), [1.0, 0.0, 0.5, 1.0]);
    }

    #[test]
    fn clamped_is_identity_in_range() {
        let c = Color::new(0.3, 0.1, 0.2, 0.9);
        assert_eq!(c.clamped(), c);
    }

    // ── array round trip ──────────────────────────────────────────────────

    #[test]
    fn array_layout_is_alpha_first() {
        let c = Color::from_array([0.1, 0.2, 0.3, 0.4]);
        assert_eq!(c.alpha, 0.1);
        assert_eq!(c.r, 0.2);
        assert_eq!(c.to_array(), [0.1, 0.2, 0.3, 0.4]);
    }
}
