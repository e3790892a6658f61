use std::path::Path;

use image::RgbImage;
use serde::Serialize;

use crate::color::{blend_chain, Rgba};
use crate::config::AnalysisConfig;
use crate::error::{ContrastError, Result};
use crate::pipeline::extract::{self, dominant_colors, Region, WeightedColor};
use crate::slide::Geometry;

/// What sits underneath a slide's overlay colors.
#[derive(Debug, Clone)]
pub enum Backdrop {
    /// No image; the configured canvas color
    Canvas,
    /// Decoded background image
    Image(RgbImage),
    /// An image was declared but could not be decoded
    Broken,
}

impl Backdrop {
    /// Decode `path` if given. Decode failures are logged and turn into
    /// [`Backdrop::Broken`].
    pub fn load(path: Option<&Path>) -> Self {
        let Some(path) = path else {
            return Backdrop::Canvas;
        };
        match extract::load_image(path) {
            Ok(img) => {
                log::debug!(
                    "loaded background {} ({}x{})",
                    path.display(),
                    img.width(),
                    img.height()
                );
                Backdrop::Image(img)
            }
            Err(e) => {
                log::warn!("{e}; image backgrounds fall back to neutral gray");
                Backdrop::Broken
            }
        }
    }
}

/// How the effective background was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BackgroundMethod {
    Canvas,
    Overlay,
    ImageDominant,
    ImageBlended,
    ImageFallback,
}

/// Candidate colors a text entity may be rendered against.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EffectiveBackground {
    pub method: BackgroundMethod,
    #[serde(rename = "candidate_colors")]
    pub candidates: Vec<WeightedColor>,
}

/// Map entity geometry onto an image crop region.
///
/// The origin is `left + translate_x`, `top + translate_y`; a missing extent
/// spans the whole image. The box is clamped to the image and each edge is
/// truncated to a whole pixel.
pub fn crop_region(geometry: &Geometry, img_width: u32, img_height: u32) -> Result<Region> {
    if geometry.is_empty() {
        return Err(ContrastError::MissingGeometry);
    }

    let (iw, ih) = (img_width as f64, img_height as f64);
    let x = geometry.left.unwrap_or(0.0) + geometry.translate_x.unwrap_or(0.0);
    let y = geometry.top.unwrap_or(0.0) + geometry.translate_y.unwrap_or(0.0);
    let w = geometry.width.unwrap_or(iw);
    let h = geometry.height.unwrap_or(ih);

    let x0 = x.clamp(0.0, iw);
    let y0 = y.clamp(0.0, ih);
    let x1 = (x + w).clamp(x0, iw);
    let y1 = (y + h).clamp(y0, ih);

    // Snap each edge to the pixel grid, then measure.
    let (left, top) = (x0 as u32, y0 as u32);
    let region = Region {
        x: left,
        y: top,
        width: x1 as u32 - left,
        height: y1 as u32 - top,
    };
    if region.width == 0 || region.height == 0 {
        return Err(ContrastError::DegenerateRegion {
            width: region.width,
            height: region.height,
        });
    }
    Ok(region)
}

/// Resolve the effective background for one entity.
///
/// `layers` are the slide's flat overlay colors, topmost first. An opaque
/// layer hides everything underneath it, so the stack is cut there. Without
/// an opaque layer the layers are blended over each dominant color of the
/// image region, or over the canvas when there is no image.
pub fn determine_effective_background(
    layers: &[Rgba],
    backdrop: &Backdrop,
    geometry: &Geometry,
    config: &AnalysisConfig,
) -> EffectiveBackground {
    if let Some(idx) = layers.iter().position(|l| l.is_opaque()) {
        let bottom = layers[idx].rgb();
        log::debug!("overlay layer {idx} is opaque, ignoring what lies beneath");
        return EffectiveBackground {
            method: BackgroundMethod::Overlay,
            candidates: vec![WeightedColor {
                color: blend_chain(&layers[..idx], bottom),
                weight: 1.0,
            }],
        };
    }

    let (method, base) = match backdrop {
        Backdrop::Canvas => {
            let method = if layers.is_empty() {
                BackgroundMethod::Canvas
            } else {
                BackgroundMethod::Overlay
            };
            let canvas = WeightedColor {
                color: config.canvas,
                weight: 1.0,
            };
            (method, vec![canvas])
        }
        Backdrop::Broken => (BackgroundMethod::ImageFallback, extract::fallback()),
        Backdrop::Image(img) => match crop_region(geometry, img.width(), img.height()) {
            Err(ContrastError::DegenerateRegion { width, height }) => {
                log::warn!(
                    "crop region {width}x{height} is empty after clamping, using neutral gray"
                );
                (BackgroundMethod::ImageFallback, extract::fallback())
            }
            region => {
                let region = region.ok();
                let method = if layers.is_empty() {
                    BackgroundMethod::ImageDominant
                } else {
                    BackgroundMethod::ImageBlended
                };
                let colors = dominant_colors(img, region, config.k, config.method, config.seed);
                (method, colors)
            }
        },
    };

    let candidates = base
        .into_iter()
        .map(|c| WeightedColor {
            color: blend_chain(layers, c.color),
            weight: c.weight,
        })
        .collect();
    EffectiveBackground { method, candidates }
}
