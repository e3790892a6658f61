use serde::Serialize;

use crate::color::Color;
use crate::config::{
    AAA_LARGE, AAA_NORMAL, AA_LARGE, AA_NORMAL, DARKEN_FACTORS, LARGE_TEXT_PX, LIGHTEN_FACTORS,
    MIN_SUGGESTIONS,
};
use crate::css::FontWeight;
use crate::slide::is_large_text;

/// Pass/fail flags for each WCAG level.
///
/// `aaa` already uses the large-text AAA bar when `is_large_text` is set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct WcagLevels {
    #[serde(rename = "AA_normal")]
    pub aa_normal: bool,
    #[serde(rename = "AA_large")]
    pub aa_large: bool,
    #[serde(rename = "AAA")]
    pub aaa: bool,
    pub is_large_text: bool,
}

/// A contrast ratio together with its classification.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ContrastResult {
    pub ratio: f64,
    pub wcag: WcagLevels,
}

impl ContrastResult {
    pub fn between(text: Color, background: Color, size_px: f64, weight: FontWeight) -> Self {
        let ratio = Color::contrast_ratio(&text, &background);
        Self {
            ratio,
            wcag: classify(ratio, size_px, weight),
        }
    }
}

/// Classify a contrast ratio for text of the given size and weight.
pub fn classify(ratio: f64, size_px: f64, weight: FontWeight) -> WcagLevels {
    let is_large = is_large_text(size_px, weight);
    let aaa_threshold = if is_large { AAA_LARGE } else { AAA_NORMAL };
    WcagLevels {
        aa_normal: ratio >= AA_NORMAL,
        aa_large: ratio >= AA_LARGE,
        aaa: ratio >= aaa_threshold,
        is_large_text: is_large,
    }
}

/// The AA bar that applies to text of this size and weight.
pub fn aa_target(size_px: f64, weight: FontWeight) -> f64 {
    if is_large_text(size_px, weight) {
        AA_LARGE
    } else {
        AA_NORMAL
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SuggestionKind {
    InvertTextColor,
    ChangeTextColor,
    DarkenBackground,
    LightenBackground,
    IncreaseFontSize,
    AddTextShadow,
}

/// A remediation that would bring the pair up to the AA bar.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Suggestion {
    #[serde(rename = "type")]
    pub kind: SuggestionKind,
    pub description: String,
    /// CSS value to apply
    pub new_value: String,
    /// Ratio after applying the change, rounded to two decimals. `None` for
    /// changes that do not alter the measured contrast.
    pub expected_ratio: Option<f64>,
}

pub(crate) fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

/// Propose fixes for a failing text/background pair.
///
/// Returns nothing when `ratio` already meets the applicable AA target.
/// Strategies are evaluated in a fixed order and every one that reaches the
/// target is included; darkening and lightening each stop at the first
/// factor that works. A text-shadow hint is appended when fewer than three
/// suggestions were found.
pub fn suggest_fixes(
    ratio: f64,
    text: Color,
    background: Color,
    size_px: f64,
    weight: FontWeight,
) -> Vec<Suggestion> {
    let target = aa_target(size_px, weight);
    let mut suggestions = Vec::new();
    if ratio >= target {
        return suggestions;
    }

    let inverted = text.invert();
    let inverted_ratio = Color::contrast_ratio(&inverted, &background);
    if inverted_ratio >= target {
        suggestions.push(Suggestion {
            kind: SuggestionKind::InvertTextColor,
            description: "Invert the text color".to_string(),
            new_value: inverted.to_hex(),
            expected_ratio: Some(round2(inverted_ratio)),
        });
    }

    for (candidate, name) in [(Color::BLACK, "black"), (Color::WHITE, "white")] {
        let candidate_ratio = Color::contrast_ratio(&candidate, &background);
        if candidate_ratio >= target {
            suggestions.push(Suggestion {
                kind: SuggestionKind::ChangeTextColor,
                description: format!("Change the text color to {name}"),
                new_value: candidate.to_hex(),
                expected_ratio: Some(round2(candidate_ratio)),
            });
        }
    }

    let darkened = DARKEN_FACTORS.iter().find_map(|&factor| {
        let bg = background.scale(factor);
        let r = Color::contrast_ratio(&text, &bg);
        (r >= target).then_some((factor, bg, r))
    });
    if let Some((factor, bg, r)) = darkened {
        suggestions.push(Suggestion {
            kind: SuggestionKind::DarkenBackground,
            description: format!(
                "Darken the background by {}%",
                ((1.0 - factor) * 100.0).round()
            ),
            new_value: bg.to_css_rgb(),
            expected_ratio: Some(round2(r)),
        });
    }

    let lightened = LIGHTEN_FACTORS.iter().find_map(|&factor| {
        let bg = background.scale(factor);
        let r = Color::contrast_ratio(&text, &bg);
        (r >= target).then_some((factor, bg, r))
    });
    if let Some((factor, bg, r)) = lightened {
        suggestions.push(Suggestion {
            kind: SuggestionKind::LightenBackground,
            description: format!(
                "Lighten the background by {}%",
                ((factor - 1.0) * 100.0).round()
            ),
            new_value: bg.to_css_rgb(),
            expected_ratio: Some(round2(r)),
        });
    }

    if size_px < LARGE_TEXT_PX && ratio >= AA_LARGE {
        suggestions.push(Suggestion {
            kind: SuggestionKind::IncreaseFontSize,
            description: format!(
                "Increase the font size to at least {LARGE_TEXT_PX}px so the large-text \
                 AA bar of {AA_LARGE}:1 applies (current {:.2}:1)",
                ratio
            ),
            new_value: format!("{LARGE_TEXT_PX}px"),
            expected_ratio: Some(round2(ratio)),
        });
    }

    if suggestions.len() < MIN_SUGGESTIONS {
        suggestions.push(Suggestion {
            kind: SuggestionKind::AddTextShadow,
            description: "Add a text shadow to improve legibility (does not change the \
                          measured contrast)"
                .to_string(),
            new_value: "text-shadow: 0 0 4px rgba(0,0,0,0.8)".to_string(),
            expected_ratio: None,
        });
    }

    suggestions
}
