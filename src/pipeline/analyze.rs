use crate::color::{Color, Rgba};
use crate::config::AnalysisConfig;
use crate::pipeline::background::{determine_effective_background, Backdrop, EffectiveBackground};
use crate::pipeline::contrast::{round2, suggest_fixes, ContrastResult};
use crate::report::{
    ContrastReport, EntityError, EntityReport, SlideReport, Summary, TextColorReport,
    TextContrast,
};
use crate::slide::{SlideInput, TextEntity};

/// The worst (text, background) pair found for an entity.
#[derive(Debug, Clone, Copy)]
struct Pair {
    ratio: f64,
    text: Color,
    background: Color,
}

/// Contrast of a possibly translucent text color over an opaque background.
fn pair(text: Rgba, background: Color) -> Pair {
    let text = text.blend_over(background);
    Pair {
        ratio: Color::contrast_ratio(&text, &background),
        text,
        background,
    }
}

/// Analyze one entity against its resolved background.
///
/// Every text color is measured against every background candidate. The
/// minimum ratio governs classification and suggestions.
pub fn analyze_entity(entity: &TextEntity, background: &EffectiveBackground) -> EntityReport {
    let mut worst: Option<Pair> = None;
    let mut best = 0.0_f64;
    let mut per_text = Vec::with_capacity(entity.spans.len());

    for span in &entity.spans {
        let mut span_min = f64::INFINITY;
        for candidate in &background.candidates {
            let p = pair(span.color, candidate.color);
            span_min = span_min.min(p.ratio);
            best = best.max(p.ratio);
            if worst.map_or(true, |w| p.ratio < w.ratio) {
                worst = Some(p);
            }
        }
        if span_min.is_finite() {
            per_text.push(TextContrast {
                css: span.color_css.clone(),
                min_ratio: round2(span_min),
            });
        }
    }

    // Entities always carry a span and backgrounds a candidate, but keep a
    // defined result if either list is empty.
    let worst = worst.unwrap_or_else(|| pair(Rgba::opaque(Color::BLACK), Color::WHITE));
    let best = best.max(worst.ratio);

    let font = entity.font;
    let governing =
        ContrastResult::between(worst.text, worst.background, font.size_px(), font.weight());
    let suggestions = if governing.wcag.aa_normal {
        Vec::new()
    } else {
        suggest_fixes(
            governing.ratio,
            worst.text,
            worst.background,
            font.size_px(),
            font.weight(),
        )
    };

    log::debug!(
        "{}: min {:.2} max {:.2} over {} candidate(s), {} suggestion(s)",
        entity.id,
        worst.ratio,
        best,
        background.candidates.len(),
        suggestions.len()
    );

    EntityReport {
        id: entity.id.clone(),
        text_colors: entity
            .spans
            .iter()
            .map(|s| TextColorReport {
                rgb: s.color.rgb(),
                css: s.color_css.clone(),
                weight: s.weight,
            })
            .collect(),
        font,
        background: background.clone(),
        contrast: ContrastReport {
            min_ratio: round2(governing.ratio),
            max_ratio: round2(best),
            wcag: governing.wcag,
            per_text,
        },
        suggestions,
    }
}

/// Analyze every entity of a slide, decoding its background image once.
pub fn analyze_slide(slide: &SlideInput, config: &AnalysisConfig) -> SlideReport {
    let backdrop = Backdrop::load(slide.background_image.as_deref());
    analyze_slide_with(slide, &backdrop, config)
}

/// Analyze a slide against an already resolved backdrop.
///
/// Never fails. An entity with an unrecognized color is listed under
/// `errors` and the rest of the slide is still analyzed. If a slide-level
/// overlay color cannot be parsed no entity has a defined background, so
/// every entity of the slide is listed under `errors`.
pub fn analyze_slide_with(
    slide: &SlideInput,
    backdrop: &Backdrop,
    config: &AnalysisConfig,
) -> SlideReport {
    let slide_id = slide.id.as_deref().unwrap_or("-");
    let mut entities = Vec::with_capacity(slide.entities.len());
    let mut errors = Vec::new();

    match slide.overlay_layers() {
        Ok(layers) => {
            let default_color = slide
                .color_text
                .as_deref()
                .filter(|c| !c.trim().is_empty())
                .unwrap_or(&config.default_text_color);

            for record in &slide.entities {
                let entity = match TextEntity::from_record(record, default_color) {
                    Ok(entity) => entity,
                    Err(e) => {
                        log::warn!("skipping entity {}: {e}", record.id);
                        errors.push(EntityError {
                            id: record.id.clone(),
                            message: e.to_string(),
                        });
                        continue;
                    }
                };
                let background =
                    determine_effective_background(&layers, backdrop, &entity.geometry, config);
                entities.push(analyze_entity(&entity, &background));
            }
        }
        Err(e) => {
            log::warn!("slide {slide_id}: overlay color rejected, skipping its entities: {e}");
            errors.extend(slide.entities.iter().map(|record| EntityError {
                id: record.id.clone(),
                message: format!("slide overlay: {e}"),
            }));
        }
    }

    let summary = Summary::tally(&entities, &errors);
    log::debug!(
        "slide {slide_id}: {} passed, {} failed, {} errored",
        summary.passed_aa_normal,
        summary.failed_aa_normal,
        summary.errored
    );

    SlideReport {
        slide_id: slide.id.clone(),
        entities,
        errors,
        summary,
    }
}
