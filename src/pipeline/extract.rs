use std::collections::{BTreeMap, HashSet};
use std::path::Path;

use image::imageops::{self, FilterType};
use image::{DynamicImage, RgbImage};
use kmeans_colors::get_kmeans_hamerly;
use palette::Srgb;
use serde::Serialize;

use crate::cli::ExtractionMethod;
use crate::color::Color;
use crate::config::{DOWNSAMPLE_DIM, FALLBACK_GRAY, KMEANS_CONVERGE, KMEANS_MAX_ITER, KMEANS_RUNS};
use crate::error::{ContrastError, Result};

/// A representative color and the share of pixels it covers.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct WeightedColor {
    #[serde(rename = "rgb")]
    pub color: Color,
    pub weight: f64,
}

/// Pixel rectangle inside an image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Region {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl Region {
    pub fn full(image: &RgbImage) -> Self {
        Self {
            x: 0,
            y: 0,
            width: image.width(),
            height: image.height(),
        }
    }
}

/// The single-entry result used whenever extraction cannot proceed.
pub fn fallback() -> Vec<WeightedColor> {
    vec![WeightedColor {
        color: FALLBACK_GRAY,
        weight: 1.0,
    }]
}

/// Decode an image file into 8-bit RGB.
pub fn load_image(path: &Path) -> Result<RgbImage> {
    let img = image::open(path).map_err(|e| ContrastError::ImageDecodeFailure {
        path: path.to_path_buf(),
        reason: if path.exists() {
            e.to_string()
        } else {
            "file not found".to_string()
        },
    })?;
    Ok(img.to_rgb8())
}

/// Extract up to `k` dominant colors from `region` (the whole image when
/// `None`), sorted by descending weight.
///
/// Never fails: a degenerate region or any internal error yields
/// [`fallback`]. `k` below 1 is treated as 1.
pub fn dominant_colors(
    image: &RgbImage,
    region: Option<Region>,
    k: usize,
    method: ExtractionMethod,
    seed: u64,
) -> Vec<WeightedColor> {
    let k = k.max(1);
    let result = match method {
        ExtractionMethod::MedianCut => median_cut(image, region, k),
        ExtractionMethod::Kmeans => kmeans(image, region, k, seed),
    };
    match result {
        Ok(colors) if !colors.is_empty() => colors,
        Ok(_) => fallback(),
        Err(e) => {
            log::warn!("dominant color extraction failed, using neutral gray: {e}");
            fallback()
        }
    }
}

/// Crop `region` out of `image`, clipped to the image bounds.
fn crop(image: &RgbImage, region: Option<Region>) -> Result<RgbImage> {
    let region = region.unwrap_or_else(|| Region::full(image));
    let x = region.x.min(image.width());
    let y = region.y.min(image.height());
    let width = region.width.min(image.width() - x);
    let height = region.height.min(image.height() - y);
    if width == 0 || height == 0 {
        return Err(ContrastError::DegenerateRegion { width, height });
    }
    Ok(imageops::crop_imm(image, x, y, width, height).to_image())
}

/// Median-cut palette quantization.
///
/// The region is shrunk to fit within 150x150 (aspect ratio preserved), then
/// color space is split recursively until there are `k` boxes. Each box
/// contributes its pixel-weighted mean color.
pub fn median_cut(
    image: &RgbImage,
    region: Option<Region>,
    k: usize,
) -> Result<Vec<WeightedColor>> {
    let region = crop(image, region)?;
    let region = if region.width() > DOWNSAMPLE_DIM || region.height() > DOWNSAMPLE_DIM {
        DynamicImage::ImageRgb8(region)
            .resize(DOWNSAMPLE_DIM, DOWNSAMPLE_DIM, FilterType::Lanczos3)
            .to_rgb8()
    } else {
        region
    };

    let mut histogram: BTreeMap<Color, u32> = BTreeMap::new();
    for p in region.pixels() {
        *histogram.entry(Color::new(p[0], p[1], p[2])).or_insert(0) += 1;
    }

    let mut boxes = vec![ColorBox::new(histogram.into_iter().collect())];
    while boxes.len() < k.max(1) {
        // Split the most populated box that still holds more than one color.
        let mut target: Option<usize> = None;
        for (i, b) in boxes.iter().enumerate() {
            if b.colors.len() < 2 {
                continue;
            }
            if target.map_or(true, |t| b.pixel_count() > boxes[t].pixel_count()) {
                target = Some(i);
            }
        }
        let Some(idx) = target else {
            break;
        };
        let (left, right) = boxes.remove(idx).split();
        boxes.insert(idx, right);
        boxes.insert(idx, left);
    }

    let total = region.width() as f64 * region.height() as f64;
    let colors = boxes
        .iter()
        .map(|b| WeightedColor {
            color: b.average_color(),
            weight: b.pixel_count() as f64 / total,
        })
        .collect();
    Ok(finalize(colors))
}

/// K-means clustering over RGB pixels.
///
/// The region is resized to exactly 150x150. `k` is capped to the number of
/// distinct colors. The clustering is repeated with `KMEANS_RUNS`
/// consecutive seeds starting at `seed` and the lowest-score run is kept, so
/// identical inputs always give identical output.
pub fn kmeans(
    image: &RgbImage,
    region: Option<Region>,
    k: usize,
    seed: u64,
) -> Result<Vec<WeightedColor>> {
    let region = crop(image, region)?;
    let region = imageops::resize(&region, DOWNSAMPLE_DIM, DOWNSAMPLE_DIM, FilterType::Lanczos3);

    let distinct = region.pixels().map(|p| p.0).collect::<HashSet<[u8; 3]>>().len();
    let k = k.clamp(1, distinct.max(1));
    let total = region.pixels().len() as f64;

    let pixels: Vec<Srgb<f32>> = region
        .pixels()
        .map(|p| Srgb::new(p[0], p[1], p[2]).into_format())
        .collect();

    if k == 1 {
        return Ok(vec![WeightedColor {
            color: mean_color(&pixels),
            weight: 1.0,
        }]);
    }

    let best = (0..KMEANS_RUNS)
        .map(|run| {
            get_kmeans_hamerly(
                k,
                KMEANS_MAX_ITER,
                KMEANS_CONVERGE,
                false,
                &pixels,
                seed.wrapping_add(run),
            )
        })
        .reduce(|best, next| if next.score < best.score { next } else { best })
        .ok_or(ContrastError::DegenerateRegion {
            width: region.width(),
            height: region.height(),
        })?;

    let mut counts = vec![0u32; best.centroids.len()];
    for &idx in &best.indices {
        counts[idx as usize] += 1;
    }

    let colors = best
        .centroids
        .iter()
        .zip(&counts)
        .filter(|(_, count)| **count > 0)
        .map(|(centroid, &count)| WeightedColor {
            color: Color::from_srgb_f32_clamped(*centroid),
            weight: count as f64 / total,
        })
        .collect();
    Ok(finalize(colors))
}

fn mean_color(pixels: &[Srgb<f32>]) -> Color {
    let n = pixels.len().max(1) as f32;
    let (r, g, b) = pixels.iter().fold((0.0, 0.0, 0.0), |(r, g, b), p| {
        (r + p.red, g + p.green, b + p.blue)
    });
    Color::from_srgb_f32_clamped(Srgb::new(r / n, g / n, b / n))
}

/// Merge entries that landed on the same 8-bit color, then sort by
/// descending weight. Equal weights are ordered by color.
fn finalize(colors: Vec<WeightedColor>) -> Vec<WeightedColor> {
    let mut merged: BTreeMap<Color, f64> = BTreeMap::new();
    for c in colors {
        *merged.entry(c.color).or_insert(0.0) += c.weight;
    }
    let mut out: Vec<WeightedColor> = merged
        .into_iter()
        .map(|(color, weight)| WeightedColor { color, weight })
        .collect();
    out.sort_by(|a, b| b.weight.total_cmp(&a.weight).then(a.color.cmp(&b.color)));
    out
}

#[derive(Debug, Clone, Copy)]
enum Channel {
    Red,
    Green,
    Blue,
}

/// A box of colors (with pixel counts) in RGB space.
struct ColorBox {
    colors: Vec<(Color, u32)>,
}

impl ColorBox {
    fn new(colors: Vec<(Color, u32)>) -> Self {
        Self { colors }
    }

    fn pixel_count(&self) -> u64 {
        self.colors.iter().map(|(_, count)| *count as u64).sum()
    }

    fn widest_channel(&self) -> Channel {
        let range = |f: fn(&Color) -> u8| {
            let (lo, hi) = self
                .colors
                .iter()
                .fold((u8::MAX, u8::MIN), |(lo, hi), (c, _)| (lo.min(f(c)), hi.max(f(c))));
            hi.saturating_sub(lo)
        };
        let (r, g, b) = (range(|c| c.r), range(|c| c.g), range(|c| c.b));
        if r >= g && r >= b {
            Channel::Red
        } else if g >= b {
            Channel::Green
        } else {
            Channel::Blue
        }
    }

    /// Split at the pixel-count median along the widest channel. Both halves
    /// are non-empty.
    fn split(mut self) -> (ColorBox, ColorBox) {
        let channel = self.widest_channel();
        self.colors.sort_by_key(|(c, _)| match channel {
            Channel::Red => (c.r, c.g, c.b),
            Channel::Green => (c.g, c.r, c.b),
            Channel::Blue => (c.b, c.r, c.g),
        });

        let half = self.pixel_count() / 2;
        let mut running = 0u64;
        let mut split_idx = self.colors.len() / 2;
        for (i, (_, count)) in self.colors.iter().enumerate() {
            running += *count as u64;
            if running >= half {
                split_idx = i + 1;
                break;
            }
        }
        let split_idx = split_idx.clamp(1, self.colors.len() - 1);

        let right = self.colors.split_off(split_idx);
        (ColorBox::new(self.colors), ColorBox::new(right))
    }

    /// Pixel-weighted mean, rounded to the nearest channel value.
    fn average_color(&self) -> Color {
        let total = self.pixel_count();
        if total == 0 {
            return FALLBACK_GRAY;
        }
        let channel = |f: fn(&Color) -> u8| {
            let sum: u64 = self
                .colors
                .iter()
                .map(|(c, count)| f(c) as u64 * *count as u64)
                .sum();
            ((sum + total / 2) / total) as u8
        };
        Color::new(channel(|c| c.r), channel(|c| c.g), channel(|c| c.b))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    fn solid(width: u32, height: u32, rgb: [u8; 3]) -> RgbImage {
        RgbImage::from_fn(width, height, |_, _| Rgb(rgb))
    }

    /// Left `split` columns red, the rest blue.
    fn two_tone(width: u32, height: u32, split: u32) -> RgbImage {
        RgbImage::from_fn(width, height, |x, _| {
            if x < split {
                Rgb([200, 30, 30])
            } else {
                Rgb([30, 30, 200])
            }
        })
    }

    fn weight_sum(colors: &[WeightedColor]) -> f64 {
        colors.iter().map(|c| c.weight).sum()
    }

    fn assert_sorted(colors: &[WeightedColor]) {
        for w in colors.windows(2) {
            assert!(
                w[0].weight >= w[1].weight,
                "colors not sorted by weight: {} < {}",
                w[0].weight,
                w[1].weight
            );
        }
    }

    // --- median cut ---

    #[test]
    fn median_cut_uniform_image() {
        let img = solid(40, 30, [10, 120, 220]);
        let colors = median_cut(&img, None, 5).unwrap();
        assert_eq!(colors.len(), 1);
        assert_eq!(colors[0].color, Color::new(10, 120, 220));
        assert_eq!(colors[0].weight, 1.0);
    }

    #[test]
    fn median_cut_two_tones_weighted_by_coverage() {
        let img = two_tone(100, 10, 75);
        let colors = median_cut(&img, None, 5).unwrap();
        assert_eq!(colors.len(), 2);
        assert_eq!(colors[0].color, Color::new(200, 30, 30));
        assert!((colors[0].weight - 0.75).abs() < 1e-9);
        assert!((weight_sum(&colors) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn median_cut_respects_k() {
        let img = RgbImage::from_fn(64, 64, |x, y| Rgb([(x * 4) as u8, (y * 4) as u8, 90]));
        for k in [1, 2, 3, 8] {
            let colors = median_cut(&img, None, k).unwrap();
            assert!(colors.len() <= k, "k={k} gave {}", colors.len());
            assert!((weight_sum(&colors) - 1.0).abs() < 1e-6);
            assert_sorted(&colors);
        }
    }

    #[test]
    fn median_cut_downsamples_large_regions() {
        let img = two_tone(600, 300, 300);
        let colors = median_cut(&img, None, 2).unwrap();
        assert!((weight_sum(&colors) - 1.0).abs() < 1e-6);
        assert_sorted(&colors);
    }

    #[test]
    fn median_cut_crops_region() {
        let img = two_tone(100, 20, 50);
        let region = Region {
            x: 60,
            y: 0,
            width: 40,
            height: 20,
        };
        let colors = median_cut(&img, Some(region), 4).unwrap();
        assert_eq!(colors.len(), 1);
        assert_eq!(colors[0].color, Color::new(30, 30, 200));
    }

    // --- k-means ---

    #[test]
    fn kmeans_uniform_image_caps_k() {
        let img = solid(20, 20, [200, 50, 50]);
        let colors = kmeans(&img, None, 8, 42).unwrap();
        assert_eq!(colors.len(), 1);
        assert_eq!(colors[0].color, Color::new(200, 50, 50));
        assert_eq!(colors[0].weight, 1.0);
    }

    #[test]
    fn kmeans_two_tones() {
        let img = two_tone(150, 150, 100);
        let colors = kmeans(&img, None, 2, 42).unwrap();
        assert!((weight_sum(&colors) - 1.0).abs() < 1e-6);
        assert_sorted(&colors);
        let top = colors[0].color;
        assert!(top.r > top.b, "dominant cluster should be red, got {top}");
        assert!(
            colors[0].weight > 0.6,
            "red covers two thirds, got {}",
            colors[0].weight
        );
    }

    #[test]
    fn kmeans_is_deterministic() {
        let img = RgbImage::from_fn(50, 40, |x, y| Rgb([(x * 5) as u8, (y * 6) as u8, 128]));
        let first = kmeans(&img, None, 4, 42).unwrap();
        let second = kmeans(&img, None, 4, 42).unwrap();
        assert_eq!(first, second);
    }

    // --- fallbacks ---

    #[test]
    fn region_outside_image_falls_back_to_gray() {
        let img = solid(50, 50, [0, 0, 0]);
        let region = Region {
            x: 80,
            y: 80,
            width: 10,
            height: 10,
        };
        for method in [ExtractionMethod::MedianCut, ExtractionMethod::Kmeans] {
            let colors = dominant_colors(&img, Some(region), 3, method, 42);
            assert_eq!(colors, fallback());
        }
    }

    #[test]
    fn zero_area_region_is_degenerate() {
        let img = solid(50, 50, [0, 0, 0]);
        let region = Region {
            x: 10,
            y: 10,
            width: 0,
            height: 10,
        };
        let err = median_cut(&img, Some(region), 3).unwrap_err();
        assert!(matches!(err, ContrastError::DegenerateRegion { .. }));
    }

    #[test]
    fn k_zero_is_treated_as_one() {
        let img = two_tone(40, 40, 20);
        let colors = dominant_colors(&img, None, 0, ExtractionMethod::MedianCut, 42);
        assert_eq!(colors.len(), 1);
        assert_eq!(colors[0].weight, 1.0);
    }

    #[test]
    fn load_missing_file_reports_decode_failure() {
        let err = load_image(Path::new("/nonexistent/background.png")).unwrap_err();
        assert!(matches!(err, ContrastError::ImageDecodeFailure { .. }));
        assert!(err.to_string().contains("file not found"), "{err}");
    }

    #[test]
    fn finalize_merges_and_orders() {
        let c = |r, w| WeightedColor {
            color: Color::new(r, 0, 0),
            weight: w,
        };
        let out = finalize(vec![c(9, 0.375), c(5, 0.25), c(1, 0.25), c(5, 0.125)]);
        assert_eq!(out.len(), 3);
        // 9 (0.375) and 5 (0.25 + 0.125) tie, broken by color
        assert_eq!(out[0].color.r, 5);
        assert_eq!(out[0].weight, 0.375);
        assert_eq!(out[1].color.r, 9);
        assert_eq!(out[2].color.r, 1);
    }
}
