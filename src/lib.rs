//! WCAG contrast checking for presentation slides.
//!
//! Text entities described by inline CSS are measured against their
//! effective background: flat overlay colors composited over either a canvas
//! or the dominant colors of a background image region.

pub mod cli;
pub mod color;
pub mod config;
pub mod css;
pub mod error;
pub mod logging;
pub mod pipeline;
pub mod report;
pub mod slide;

pub use color::{Color, Rgba};
pub use config::AnalysisConfig;
pub use error::{ContrastError, Result};
pub use pipeline::analyze::{analyze_entity, analyze_slide, analyze_slide_with};
pub use report::{EntityReport, SlideReport};
pub use slide::SlideInput;
