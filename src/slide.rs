//! Slide input records and the typed values derived from them.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::color::Rgba;
use crate::config::{DEFAULT_FONT_SIZE_PX, LARGE_BOLD_TEXT_PX, LARGE_TEXT_PX};
use crate::css::{
    parse_css_color, parse_font_size_px, parse_length_px, parse_translate, FontWeight,
    InlineStyle,
};
use crate::error::Result;

/// One slide as handed over by the HTML extraction layer.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SlideInput {
    #[serde(alias = "id_slide")]
    pub id: Option<String>,
    /// Topmost flat overlay color
    pub base_color: Option<String>,
    /// Theme color underneath `base_color`
    pub custom_theme: Option<String>,
    /// Default text color for spans that declare none
    pub color_text: Option<String>,
    /// Raster background, relative paths resolve against the working directory
    pub background_image: Option<PathBuf>,
    pub entities: Vec<EntityRecord>,
}

impl SlideInput {
    /// Flat overlay colors, topmost first.
    pub fn overlay_layers(&self) -> Result<Vec<Rgba>> {
        [&self.base_color, &self.custom_theme]
            .into_iter()
            .flatten()
            .filter(|css| !css.trim().is_empty())
            .map(|css| parse_css_color(css))
            .collect()
    }
}

/// A text entity as extracted from the slide HTML.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct EntityRecord {
    pub id: String,
    pub wrapper_style: String,
    pub spans: Vec<SpanRecord>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SpanRecord {
    pub style: String,
    pub text: String,
}

/// Font size and weight of an entity. `is_large` is derived.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FontDescriptor {
    size_px: f64,
    weight: FontWeight,
    is_large: bool,
}

impl FontDescriptor {
    /// Non-positive or non-finite sizes fall back to the default size.
    pub fn new(size_px: f64, weight: FontWeight) -> Self {
        let size_px = if size_px.is_finite() && size_px > 0.0 {
            size_px
        } else {
            DEFAULT_FONT_SIZE_PX
        };
        Self {
            size_px,
            weight,
            is_large: is_large_text(size_px, weight),
        }
    }

    /// Resolve the entity font.
    ///
    /// Both properties are looked up in the wrapper style, then in the first
    /// span, then default to 16px / `normal`.
    pub fn from_record(record: &EntityRecord) -> Self {
        let mut sources = vec![InlineStyle::parse(&record.wrapper_style)];
        if let Some(first) = record.spans.first() {
            sources.push(InlineStyle::parse(&first.style));
        }

        let size_px = first_declared(&sources, "font-size", parse_font_size_px)
            .unwrap_or(DEFAULT_FONT_SIZE_PX);
        let weight = first_declared(&sources, "font-weight", |v| v.parse::<FontWeight>().ok())
            .unwrap_or_default();

        Self::new(size_px, weight)
    }

    pub fn size_px(&self) -> f64 {
        self.size_px
    }

    pub fn weight(&self) -> FontWeight {
        self.weight
    }

    pub fn is_large(&self) -> bool {
        self.is_large
    }
}

impl Default for FontDescriptor {
    fn default() -> Self {
        Self::new(DEFAULT_FONT_SIZE_PX, FontWeight::Normal)
    }
}

/// WCAG large text: 24px and up, or 18.66px and up when bold.
pub fn is_large_text(size_px: f64, weight: FontWeight) -> bool {
    size_px >= LARGE_TEXT_PX || (size_px >= LARGE_BOLD_TEXT_PX && weight.is_bold())
}

/// Consult `sources` in order and return the first value of `property`
/// that parses.
fn first_declared<T>(
    sources: &[InlineStyle],
    property: &str,
    parse: impl Fn(&str) -> Option<T>,
) -> Option<T> {
    sources
        .iter()
        .filter_map(|style| style.get(property))
        .find_map(parse)
}

/// Axis-aligned box of an entity in image pixel coordinates.
///
/// Fields that are absent or do not parse stay `None`, so an explicit zero
/// is distinguishable from a missing value.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Geometry {
    pub left: Option<f64>,
    pub top: Option<f64>,
    pub width: Option<f64>,
    pub height: Option<f64>,
    pub translate_x: Option<f64>,
    pub translate_y: Option<f64>,
}

impl Geometry {
    pub fn from_style(style: &InlineStyle) -> Self {
        let length = |prop: &str| style.get(prop).and_then(parse_length_px);
        let translate = style.get("transform").and_then(parse_translate);
        Self {
            left: length("left"),
            top: length("top"),
            width: length("width"),
            height: length("height"),
            translate_x: translate.map(|(x, _)| x),
            translate_y: translate.map(|(_, y)| y),
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == Geometry::default()
    }
}

/// One colored run of text inside an entity.
#[derive(Debug, Clone, PartialEq)]
pub struct TextSpan {
    /// CSS the color came from, as written
    pub color_css: String,
    pub color: Rgba,
    /// Share of the entity's visual prominence, spans sum to 1
    pub weight: f64,
}

/// A text entity ready for contrast analysis.
#[derive(Debug, Clone)]
pub struct TextEntity {
    pub id: String,
    pub font: FontDescriptor,
    pub geometry: Geometry,
    /// Sorted by descending weight
    pub spans: Vec<TextSpan>,
}

impl TextEntity {
    /// Resolve fonts, geometry and weighted span colors.
    ///
    /// Spans without a `color` declaration use `default_color`. Each span is
    /// weighted by font size times character count; if every span is empty
    /// the weights are uniform. An entity without spans gets a single span
    /// in `default_color`.
    pub fn from_record(record: &EntityRecord, default_color: &str) -> Result<Self> {
        let font = FontDescriptor::from_record(record);
        let geometry = Geometry::from_style(&InlineStyle::parse(&record.wrapper_style));

        if record.spans.is_empty() {
            let color = parse_css_color(default_color)?;
            return Ok(Self {
                id: record.id.clone(),
                font,
                geometry,
                spans: vec![TextSpan {
                    color_css: default_color.to_string(),
                    color,
                    weight: 1.0,
                }],
            });
        }

        let mut spans = Vec::with_capacity(record.spans.len());
        for span in &record.spans {
            let style = InlineStyle::parse(&span.style);
            let color_css = style.get("color").unwrap_or(default_color).to_string();
            let color = parse_css_color(&color_css)?;
            let size = style
                .get("font-size")
                .and_then(parse_font_size_px)
                .unwrap_or(font.size_px());
            let weight = size * span.text.chars().count() as f64;
            spans.push(TextSpan {
                color_css,
                color,
                weight,
            });
        }

        let total: f64 = spans.iter().map(|s| s.weight).sum();
        let uniform = 1.0 / spans.len() as f64;
        for span in &mut spans {
            span.weight = if total > 0.0 {
                span.weight / total
            } else {
                uniform
            };
        }
        spans.sort_by(|a, b| b.weight.total_cmp(&a.weight));

        Ok(Self {
            id: record.id.clone(),
            font,
            geometry,
            spans,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::Color;
    use crate::error::ContrastError;

    fn span(style: &str, text: &str) -> SpanRecord {
        SpanRecord {
            style: style.to_string(),
            text: text.to_string(),
        }
    }

    fn record(wrapper: &str, spans: Vec<SpanRecord>) -> EntityRecord {
        EntityRecord {
            id: "text-1".to_string(),
            wrapper_style: wrapper.to_string(),
            spans,
        }
    }

    #[test]
    fn font_prefers_wrapper_then_first_span() {
        let r = record(
            "font-size: 30px",
            vec![span("font-size: 12px; font-weight: bold", "hi")],
        );
        let font = FontDescriptor::from_record(&r);
        assert_eq!(font.size_px(), 30.0);
        assert_eq!(font.weight(), FontWeight::Bold);
        assert!(font.is_large());
    }

    #[test]
    fn font_falls_back_to_defaults() {
        let r = record("font-size: huge; font-weight: heavy", vec![]);
        let font = FontDescriptor::from_record(&r);
        assert_eq!(font.size_px(), 16.0);
        assert_eq!(font.weight(), FontWeight::Normal);
        assert!(!font.is_large());
    }

    #[test]
    fn large_text_thresholds() {
        assert!(is_large_text(24.0, FontWeight::Normal));
        assert!(!is_large_text(23.9, FontWeight::Normal));
        assert!(is_large_text(18.66, FontWeight::Bold));
        assert!(is_large_text(19.0, FontWeight::Numeric(700)));
        assert!(!is_large_text(19.0, FontWeight::Numeric(600)));
        assert!(!is_large_text(18.0, FontWeight::Bolder));
    }

    #[test]
    fn invalid_font_size_uses_default() {
        assert_eq!(FontDescriptor::new(-1.0, FontWeight::Bold).size_px(), 16.0);
        assert_eq!(FontDescriptor::new(f64::NAN, FontWeight::Bold).size_px(), 16.0);
    }

    #[test]
    fn geometry_keeps_absent_fields_absent() {
        let style = InlineStyle::parse(
            "left: 10px; top: 0px; width: auto; height: 40px; transform: translate(5px, 6px)",
        );
        let g = Geometry::from_style(&style);
        assert_eq!(g.left, Some(10.0));
        assert_eq!(g.top, Some(0.0));
        assert_eq!(g.width, None);
        assert_eq!(g.height, Some(40.0));
        assert_eq!(g.translate_x, Some(5.0));
        assert_eq!(g.translate_y, Some(6.0));
        assert!(Geometry::from_style(&InlineStyle::parse("color: red")).is_empty());
    }

    #[test]
    fn span_weights_follow_size_and_length() {
        let r = record(
            "",
            vec![
                span("color: red; font-size: 10px", "abcd"),
                span("color: blue; font-size: 20px", "abcdef"),
            ],
        );
        let entity = TextEntity::from_record(&r, "#000").unwrap();
        assert_eq!(entity.spans.len(), 2);
        assert_eq!(entity.spans[0].color.rgb(), Color::new(0, 0, 255));
        assert!((entity.spans[0].weight - 0.75).abs() < 1e-9);
        assert!((entity.spans[1].weight - 0.25).abs() < 1e-9);
    }

    #[test]
    fn empty_spans_get_uniform_weights_and_default_color() {
        let r = record("", vec![span("font-weight: bold", ""), span("", "")]);
        let entity = TextEntity::from_record(&r, "#333333").unwrap();
        for s in &entity.spans {
            assert_eq!(s.color_css, "#333333");
            assert!((s.weight - 0.5).abs() < 1e-9);
        }
    }

    #[test]
    fn entity_without_spans_uses_default_color() {
        let entity = TextEntity::from_record(&record("", vec![]), "white").unwrap();
        assert_eq!(entity.spans.len(), 1);
        assert_eq!(entity.spans[0].color.rgb(), Color::WHITE);
        assert_eq!(entity.spans[0].weight, 1.0);
    }

    #[test]
    fn unparseable_span_color_fails() {
        let r = record("", vec![span("color: notacolor", "x")]);
        let err = TextEntity::from_record(&r, "#000").unwrap_err();
        assert!(matches!(err, ContrastError::UnrecognizedColorFormat(_)));
    }

    #[test]
    fn overlay_layers_are_topmost_first() {
        let slide = SlideInput {
            base_color: Some("#ff000080".to_string()),
            custom_theme: Some("blue".to_string()),
            ..Default::default()
        };
        let layers = slide.overlay_layers().unwrap();
        assert_eq!(layers.len(), 2);
        assert_eq!(layers[0].rgb(), Color::new(255, 0, 0));
        assert_eq!(layers[1].rgb(), Color::new(0, 0, 255));
    }

    #[test]
    fn slide_json_accepts_minimal_input() {
        let slide: SlideInput = serde_json::from_str(
            r#"{"id_slide": "s1", "entities": [{"id": "text-a", "spans": [{"text": "hi"}]}]}"#,
        )
        .unwrap();
        assert_eq!(slide.id.as_deref(), Some("s1"));
        assert_eq!(slide.entities[0].spans[0].style, "");
        assert!(slide.overlay_layers().unwrap().is_empty());
    }
}
