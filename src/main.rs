use std::fs;
use std::path::Path;

use anyhow::{bail, Context, Result};
use clap::Parser;
use serde::Serialize;
use serde_json::Value;

use slide_contrast::cli::Args;
use slide_contrast::config::parse_canvas;
use slide_contrast::logging::init_logging;
use slide_contrast::report::{self, SlideReport};
use slide_contrast::{analyze_slide, AnalysisConfig, SlideInput};

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.verbose);

    let config = build_config(&args)?;
    let (slides, single) = load_slides(&args.slide, args.slide_index)?;

    let mut reports: Vec<SlideReport> = Vec::with_capacity(slides.len());
    for mut slide in slides {
        if let Some(path) = &args.bg_image {
            slide.background_image = Some(path.clone());
        }
        reports.push(analyze_slide(&slide, &config));
    }

    match (single, reports.as_slice()) {
        (true, [only]) => emit(only, args.output.as_deref()),
        _ => emit(&reports, args.output.as_deref()),
    }
}

fn emit<T: Serialize + ?Sized>(value: &T, output: Option<&Path>) -> Result<()> {
    match output {
        Some(path) => {
            report::write_to(value, path)
                .with_context(|| format!("failed to write {}", path.display()))?;
            eprintln!("Report written to {}", path.display());
        }
        None => println!("{}", report::to_json(value)?),
    }
    Ok(())
}

/// Settings file first, then command-line flags on top.
fn build_config(args: &Args) -> Result<AnalysisConfig> {
    let mut config = match &args.config {
        Some(path) => {
            let raw = fs::read_to_string(path)
                .with_context(|| format!("failed to read config {}", path.display()))?;
            serde_json::from_str(&raw)
                .with_context(|| format!("invalid config {}", path.display()))?
        }
        None => AnalysisConfig::default(),
    };

    if let Some(method) = args.method {
        config.method = method;
    }
    if let Some(k) = args.colors {
        config.k = k;
    }
    if let Some(canvas) = &args.canvas {
        config.canvas = parse_canvas(canvas).context("invalid --canvas")?;
    }
    if let Some(seed) = args.seed {
        config.seed = seed;
    }
    Ok(config)
}

fn read_json(path: &Path) -> Result<Value> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read slide file {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("invalid JSON in {}", path.display()))
}

/// Load one slide object, or the slides of an array (optionally just the one
/// at `index`). The flag is set when a single report should be written
/// rather than an array.
fn load_slides(path: &Path, index: Option<usize>) -> Result<(Vec<SlideInput>, bool)> {
    let value = read_json(path)?;
    let single = index.is_some() || value.is_object();
    let slides: Vec<SlideInput> = match value {
        Value::Array(items) => {
            let items = match index {
                Some(i) => {
                    let count = items.len();
                    match items.into_iter().nth(i) {
                        Some(item) => vec![item],
                        None => bail!("slide index {i} out of range ({count} slides)"),
                    }
                }
                None => items,
            };
            items
                .into_iter()
                .map(serde_json::from_value)
                .collect::<std::result::Result<_, _>>()
                .with_context(|| format!("invalid slide in {}", path.display()))?
        }
        object @ Value::Object(_) => {
            if let Some(i) = index.filter(|&i| i != 0) {
                bail!("slide index {i} out of range (file holds a single slide)");
            }
            vec![serde_json::from_value(object)
                .with_context(|| format!("invalid slide in {}", path.display()))?]
        }
        _ => bail!("{} must hold a slide object or an array of slides", path.display()),
    };
    Ok((slides, single))
}
