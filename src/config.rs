use serde::{Deserialize, Deserializer};

use crate::cli::ExtractionMethod;
use crate::color::Color;
use crate::css::parse_css_color;
use crate::error::Result;

// WCAG 2.x conformance thresholds.
pub const AA_NORMAL: f64 = 4.5;
pub const AA_LARGE: f64 = 3.0;
pub const AAA_NORMAL: f64 = 7.0;
pub const AAA_LARGE: f64 = 4.5;

/// Text at or above this size is large regardless of weight.
pub const LARGE_TEXT_PX: f64 = 24.0;
/// Bold text at or above this size (14pt) is large.
pub const LARGE_BOLD_TEXT_PX: f64 = 18.66;
/// Numeric font weights at or above this count as bold.
pub const BOLD_WEIGHT: u16 = 700;

// sRGB linearization (WCAG 2.2 / IEC 61966-2-1 breakpoint).
pub const SRGB_BREAKPOINT: f64 = 0.04045;
pub const SRGB_DIV_LOW: f64 = 12.92;
pub const SRGB_OFFSET: f64 = 0.055;
pub const SRGB_DIV_HIGH: f64 = 1.055;
pub const SRGB_GAMMA: f64 = 2.4;

// Relative luminance coefficients (D65).
pub const LUMA_R: f64 = 0.2126;
pub const LUMA_G: f64 = 0.7152;
pub const LUMA_B: f64 = 0.0722;

/// Offset added to both luminances in the contrast formula.
pub const CONTRAST_OFFSET: f64 = 0.05;

// Remediation search steps, tried in order.
pub const DARKEN_FACTORS: [f64; 4] = [0.8, 0.6, 0.4, 0.2];
pub const LIGHTEN_FACTORS: [f64; 4] = [1.2, 1.4, 1.6, 1.8];
/// Suggestions below this count get a trailing text-shadow hint.
pub const MIN_SUGGESTIONS: usize = 3;

// Font parsing.
pub const DEFAULT_FONT_SIZE_PX: f64 = 16.0;
pub const PT_TO_PX: f64 = 1.333;
pub const EM_BASE_PX: f64 = 16.0;

// Dominant color extraction.
pub const FALLBACK_GRAY: Color = Color::new(128, 128, 128);
pub const DOWNSAMPLE_DIM: u32 = 150;
pub const DEFAULT_K: usize = 5;
pub const KMEANS_SEED: u64 = 42;
pub const KMEANS_MAX_ITER: usize = 20;
pub const KMEANS_CONVERGE: f32 = 0.0025;
/// Independent k-means restarts; the lowest-score run wins.
pub const KMEANS_RUNS: u64 = 3;

pub const DEFAULT_CANVAS: Color = Color::new(255, 255, 255);
pub const DEFAULT_TEXT_COLOR: &str = "#000000";

/// Per-request analysis settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Dominant color algorithm used for image backgrounds
    pub method: ExtractionMethod,
    /// Number of dominant colors to extract per region
    pub k: usize,
    /// Flat canvas underneath all overlays when there is no image
    #[serde(deserialize_with = "deserialize_canvas")]
    pub canvas: Color,
    /// Text color used when neither the span nor the slide declares one
    pub default_text_color: String,
    /// K-means initialization seed
    pub seed: u64,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            method: ExtractionMethod::MedianCut,
            k: DEFAULT_K,
            canvas: DEFAULT_CANVAS,
            default_text_color: DEFAULT_TEXT_COLOR.to_string(),
            seed: KMEANS_SEED,
        }
    }
}

/// Parse a canvas color from any CSS color syntax. A translucent color is
/// composited over white.
pub fn parse_canvas(css: &str) -> Result<Color> {
    Ok(parse_css_color(css)?.blend_over(DEFAULT_CANVAS))
}

fn deserialize_canvas<'de, D: Deserializer<'de>>(d: D) -> std::result::Result<Color, D::Error> {
    let css = String::deserialize(d)?;
    parse_canvas(&css).map_err(serde::de::Error::custom)
}
