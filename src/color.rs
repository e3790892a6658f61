use palette::Srgb;
use serde::{Serialize, Serializer};

use crate::config::{
    CONTRAST_OFFSET, LUMA_B, LUMA_G, LUMA_R, SRGB_BREAKPOINT, SRGB_DIV_HIGH, SRGB_DIV_LOW,
    SRGB_GAMMA, SRGB_OFFSET,
};
use crate::error::{ContrastError, Result};

/// Opaque sRGB color used throughout the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const BLACK: Color = Color::new(0, 0, 0);
    pub const WHITE: Color = Color::new(255, 255, 255);

    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Parse a 6-digit hex color like `#ff8800`. The `#` is optional.
    pub fn from_hex(hex: &str) -> Result<Self> {
        let digits = hex.trim().strip_prefix('#').unwrap_or(hex.trim());
        let bad = || ContrastError::UnrecognizedColorFormat(hex.to_string());
        if digits.len() != 6 || !digits.is_ascii() {
            return Err(bad());
        }
        let byte = |i: usize| u8::from_str_radix(&digits[i..i + 2], 16).map_err(|_| bad());
        Ok(Self::new(byte(0)?, byte(2)?, byte(4)?))
    }

    /// Serialize to lowercase hex `#rrggbb`.
    pub fn to_hex(self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }

    /// Clamp an `Srgb<f32>` to [0, 1] and round to 8-bit channels.
    pub fn from_srgb_f32_clamped(srgb: Srgb<f32>) -> Self {
        let r = (srgb.red.clamp(0.0, 1.0) * 255.0).round() as u8;
        let g = (srgb.green.clamp(0.0, 1.0) * 255.0).round() as u8;
        let b = (srgb.blue.clamp(0.0, 1.0) * 255.0).round() as u8;
        Self { r, g, b }
    }

    /// Per-channel `255 - c`.
    pub fn invert(self) -> Color {
        Color::new(255 - self.r, 255 - self.g, 255 - self.b)
    }

    /// Multiply every channel by `factor`, clamping to [0, 255] and
    /// truncating the fractional part.
    pub fn scale(self, factor: f64) -> Color {
        let channel = |c: u8| (c as f64 * factor).clamp(0.0, 255.0) as u8;
        Color::new(channel(self.r), channel(self.g), channel(self.b))
    }

    /// CSS functional notation, `rgb(r, g, b)`.
    pub fn to_css_rgb(self) -> String {
        format!("rgb({}, {}, {})", self.r, self.g, self.b)
    }

    /// WCAG relative luminance in [0, 1].
    ///
    /// Linearizes each sRGB channel, then computes the weighted sum.
    pub fn relative_luminance(self) -> f64 {
        fn linearize(c: u8) -> f64 {
            let c = c as f64 / 255.0;
            if c <= SRGB_BREAKPOINT {
                c / SRGB_DIV_LOW
            } else {
                ((c + SRGB_OFFSET) / SRGB_DIV_HIGH).powf(SRGB_GAMMA)
            }
        }
        LUMA_R * linearize(self.r) + LUMA_G * linearize(self.g) + LUMA_B * linearize(self.b)
    }

    /// WCAG contrast ratio between two colors.
    ///
    /// Returns a value in [1, 21]. Symmetric in its arguments.
    pub fn contrast_ratio(c1: &Color, c2: &Color) -> f64 {
        let l1 = c1.relative_luminance();
        let l2 = c2.relative_luminance();
        let (lighter, darker) = if l1 > l2 { (l1, l2) } else { (l2, l1) };
        (lighter + CONTRAST_OFFSET) / (darker + CONTRAST_OFFSET)
    }
}

impl std::fmt::Display for Color {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

/// Reports serialize colors as `[r, g, b]`.
impl Serialize for Color {
    fn serialize<S: Serializer>(&self, s: S) -> std::result::Result<S::Ok, S::Error> {
        [self.r, self.g, self.b].serialize(s)
    }
}

/// A color with straight (non-premultiplied) alpha in [0, 1].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rgba {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: f64,
}

impl Rgba {
    /// Alpha is clamped to [0, 1]; NaN becomes fully opaque.
    pub fn new(r: u8, g: u8, b: u8, a: f64) -> Self {
        let a = if a.is_nan() { 1.0 } else { a.clamp(0.0, 1.0) };
        Self { r, g, b, a }
    }

    pub fn opaque(color: Color) -> Self {
        Self::new(color.r, color.g, color.b, 1.0)
    }

    pub fn rgb(self) -> Color {
        Color::new(self.r, self.g, self.b)
    }

    pub fn is_opaque(self) -> bool {
        self.a >= 1.0
    }

    /// Alpha-composite `self` over an opaque `bottom`.
    ///
    /// Each channel is `top * a + bottom * (1 - a)`, rounded half up.
    pub fn blend_over(self, bottom: Color) -> Color {
        if self.is_opaque() {
            return self.rgb();
        }
        let a = self.a;
        let mix = |top: u8, under: u8| {
            (top as f64 * a + under as f64 * (1.0 - a))
                .round()
                .clamp(0.0, 255.0) as u8
        };
        Color::new(
            mix(self.r, bottom.r),
            mix(self.g, bottom.g),
            mix(self.b, bottom.b),
        )
    }
}

impl std::fmt::Display for Rgba {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.is_opaque() {
            write!(f, "rgb({}, {}, {})", self.r, self.g, self.b)
        } else {
            write!(f, "rgba({}, {}, {}, {:.3})", self.r, self.g, self.b, self.a)
        }
    }
}

/// Composite a painter's-model stack over `bottom`.
///
/// `layers[0]` is the topmost layer, so the fold runs from the last layer
/// upwards.
pub fn blend_chain(layers: &[Rgba], bottom: Color) -> Color {
    layers
        .iter()
        .rev()
        .fold(bottom, |under, layer| layer.blend_over(under))
}

#[cfg(test)]
mod tests {
    use super::*;

    const BLACK: Color = Color::BLACK;
    const WHITE: Color = Color::WHITE;

    #[test]
    fn hex_round_trip() {
        let original = Color::from_hex("#ff8800").unwrap();
        assert_eq!(original, Color::new(255, 136, 0));
        assert_eq!(original.to_hex(), "#ff8800");
    }

    #[test]
    fn hex_uppercase_input() {
        let color = Color::from_hex("#FF8800").unwrap();
        assert_eq!(color.to_hex(), "#ff8800");
    }

    #[test]
    fn hex_without_hash() {
        let color = Color::from_hex("aabbcc").unwrap();
        assert_eq!(color.to_hex(), "#aabbcc");
    }

    #[test]
    fn hex_invalid_length() {
        assert!(Color::from_hex("#fff").is_err());
    }

    #[test]
    fn hex_invalid_chars() {
        assert!(Color::from_hex("#gggggg").is_err());
    }

    #[test]
    fn contrast_ratio_black_white() {
        let ratio = Color::contrast_ratio(&BLACK, &WHITE);
        assert!(
            (ratio - 21.0).abs() < 1e-9,
            "black/white contrast should be 21:1, got {ratio}"
        );
    }

    #[test]
    fn contrast_ratio_same_color() {
        let gray = Color::new(128, 128, 128);
        let ratio = Color::contrast_ratio(&gray, &gray);
        assert!(
            (ratio - 1.0).abs() < 1e-9,
            "same color contrast should be 1:1, got {ratio}"
        );
    }

    #[test]
    fn contrast_ratio_is_symmetric() {
        let a = Color::new(200, 50, 50);
        let b = Color::new(50, 200, 50);
        assert_eq!(Color::contrast_ratio(&a, &b), Color::contrast_ratio(&b, &a));
    }

    #[test]
    fn contrast_ratio_mid_gray_vs_black() {
        // sRGB(119,119,119) has relative luminance ~0.184
        let gray = Color::new(119, 119, 119);
        let ratio = Color::contrast_ratio(&gray, &BLACK);
        assert!(
            ratio > 4.5 && ratio < 5.0,
            "mid-gray vs black should be ~4.7:1, got {ratio}"
        );
    }

    #[test]
    fn relative_luminance_extremes() {
        assert!(BLACK.relative_luminance().abs() < 1e-12);
        assert!((WHITE.relative_luminance() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn invert_and_scale() {
        assert_eq!(Color::new(10, 20, 250).invert(), Color::new(245, 235, 5));
        assert_eq!(Color::new(100, 200, 250).scale(0.5), Color::new(50, 100, 125));
        assert_eq!(Color::new(100, 200, 250).scale(1.8), Color::new(180, 255, 255));
    }

    #[test]
    fn blend_half_blue_over_white() {
        let top = Rgba::new(0, 0, 255, 0.5);
        let out = top.blend_over(WHITE);
        assert!(out.r == 127 || out.r == 128, "red channel {}", out.r);
        assert!(out.g == 127 || out.g == 128, "green channel {}", out.g);
        assert_eq!(out.b, 255);
    }

    #[test]
    fn opaque_layer_short_circuits() {
        let top = Rgba::new(12, 34, 56, 1.0);
        assert_eq!(top.blend_over(WHITE), Color::new(12, 34, 56));
    }

    #[test]
    fn transparent_layer_is_invisible() {
        let top = Rgba::new(255, 0, 0, 0.0);
        assert_eq!(top.blend_over(Color::new(1, 2, 3)), Color::new(1, 2, 3));
    }

    #[test]
    fn alpha_is_clamped() {
        assert_eq!(Rgba::new(0, 0, 0, 3.0).a, 1.0);
        assert_eq!(Rgba::new(0, 0, 0, -1.0).a, 0.0);
    }

    #[test]
    fn blend_chain_applies_topmost_last() {
        // opaque red on top hides everything underneath
        let layers = [Rgba::new(255, 0, 0, 1.0), Rgba::new(0, 0, 255, 0.5)];
        assert_eq!(blend_chain(&layers, WHITE), Color::new(255, 0, 0));

        // half black over half white over black: white first, then black
        let layers = [Rgba::new(0, 0, 0, 0.5), Rgba::new(255, 255, 255, 0.5)];
        let out = blend_chain(&layers, BLACK);
        // 255*0.5 = 127.5 -> 128, then 128*0.5 = 64
        assert_eq!(out, Color::new(64, 64, 64));
    }

    #[test]
    fn blend_chain_empty_is_bottom() {
        assert_eq!(blend_chain(&[], Color::new(9, 9, 9)), Color::new(9, 9, 9));
    }

    #[test]
    fn display_matches_to_hex() {
        let color = Color::new(171, 205, 239);
        assert_eq!(format!("{color}"), color.to_hex());
    }

    #[test]
    fn rgba_display() {
        assert_eq!(Rgba::new(1, 2, 3, 1.0).to_string(), "rgb(1, 2, 3)");
        assert_eq!(Rgba::new(1, 2, 3, 0.5).to_string(), "rgba(1, 2, 3, 0.500)");
    }
}
