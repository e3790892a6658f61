use std::path::PathBuf;

use clap::Parser;
use serde::{Deserialize, Serialize};

/// Check WCAG text contrast of presentation slides.
#[derive(Parser, Debug)]
#[command(name = "slide-contrast", version, about)]
pub struct Args {
    /// Slide JSON file (a single slide object or an array of slides)
    pub slide: PathBuf,

    /// Background image, overrides the slide's `background_image`
    #[arg(short, long)]
    pub bg_image: Option<PathBuf>,

    /// Analyze only the slide at this index of an array file
    #[arg(short = 'i', long)]
    pub slide_index: Option<usize>,

    /// JSON file with analysis settings, flags below take precedence
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Dominant color algorithm for image backgrounds
    #[arg(short, long, value_enum)]
    pub method: Option<ExtractionMethod>,

    /// Number of dominant colors per region
    #[arg(short = 'k', long = "colors")]
    pub colors: Option<usize>,

    /// Canvas color under the slide when there is no image (#rrggbb)
    #[arg(long)]
    pub canvas: Option<String>,

    /// Seed for k-means initialization
    #[arg(long)]
    pub seed: Option<u64>,

    /// Write the JSON report to this file instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Log pipeline decisions to stderr
    #[arg(short, long)]
    pub verbose: bool,
}

/// Dominant color extraction algorithm.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum ExtractionMethod {
    /// Deterministic palette quantization
    #[default]
    #[value(name = "mediancut")]
    MedianCut,
    /// Seeded k-means clustering
    Kmeans,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_full_command_line() {
        let args = Args::try_parse_from([
            "slide-contrast",
            "slides.json",
            "--bg-image",
            "bg.png",
            "-i",
            "2",
            "--method",
            "kmeans",
            "-k",
            "3",
            "--canvas",
            "#000000",
            "-v",
        ])
        .unwrap();
        assert_eq!(args.slide, PathBuf::from("slides.json"));
        assert_eq!(args.bg_image, Some(PathBuf::from("bg.png")));
        assert_eq!(args.slide_index, Some(2));
        assert_eq!(args.method, Some(ExtractionMethod::Kmeans));
        assert_eq!(args.colors, Some(3));
        assert_eq!(args.canvas.as_deref(), Some("#000000"));
        assert!(args.verbose);
    }

    #[test]
    fn mediancut_value_name() {
        let args = Args::try_parse_from(["slide-contrast", "s.json", "-m", "mediancut"]).unwrap();
        assert_eq!(args.method, Some(ExtractionMethod::MedianCut));
        assert!(Args::try_parse_from(["slide-contrast", "s.json", "-m", "fancy"]).is_err());
    }

    #[test]
    fn method_serde_names() {
        assert_eq!(
            serde_json::to_string(&ExtractionMethod::MedianCut).unwrap(),
            "\"mediancut\""
        );
        let m: ExtractionMethod = serde_json::from_str("\"kmeans\"").unwrap();
        assert_eq!(m, ExtractionMethod::Kmeans);
    }
}
