//! Output records handed to whatever renders or stores the results.

use std::fs;
use std::path::Path;

use serde::Serialize;

use crate::color::Color;
use crate::error::Result;
use crate::pipeline::background::EffectiveBackground;
use crate::pipeline::contrast::{Suggestion, WcagLevels};
use crate::slide::FontDescriptor;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TextColorReport {
    /// Color channels, alpha not included
    pub rgb: Color,
    /// The CSS value as written
    pub css: String,
    pub weight: f64,
}

/// Worst case for one text color across all background candidates.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TextContrast {
    pub css: String,
    pub min_ratio: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContrastReport {
    pub min_ratio: f64,
    pub max_ratio: f64,
    pub wcag: WcagLevels,
    pub per_text: Vec<TextContrast>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EntityReport {
    pub id: String,
    pub text_colors: Vec<TextColorReport>,
    pub font: FontDescriptor,
    pub background: EffectiveBackground,
    pub contrast: ContrastReport,
    pub suggestions: Vec<Suggestion>,
}

impl EntityReport {
    pub fn passes_aa_normal(&self) -> bool {
        self.contrast.wcag.aa_normal
    }
}

/// An entity that could not be analyzed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EntityError {
    pub id: String,
    pub message: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Summary {
    pub total_entities: usize,
    pub passed_aa_normal: usize,
    pub failed_aa_normal: usize,
    pub errored: usize,
}

impl Summary {
    pub fn tally(entities: &[EntityReport], errors: &[EntityError]) -> Self {
        let passed = entities.iter().filter(|e| e.passes_aa_normal()).count();
        Self {
            total_entities: entities.len() + errors.len(),
            passed_aa_normal: passed,
            failed_aa_normal: entities.len() - passed,
            errored: errors.len(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SlideReport {
    pub slide_id: Option<String>,
    pub entities: Vec<EntityReport>,
    pub errors: Vec<EntityError>,
    pub summary: Summary,
}

/// Pretty-printed JSON for any report value.
pub fn to_json<T: Serialize + ?Sized>(report: &T) -> Result<String> {
    Ok(serde_json::to_string_pretty(report)?)
}

/// Write `report` as pretty JSON to `path`, with a trailing newline.
pub fn write_to<T: Serialize + ?Sized>(report: &T, path: &Path) -> Result<()> {
    let mut json = to_json(report)?;
    json.push('\n');
    fs::write(path, json)?;
    Ok(())
}
