//! Inline CSS parsing: declarations, colors, font sizes, weights and lengths.
//!
//! Colors are a hard requirement of the pipeline, so [`parse_css_color`]
//! reports failures. Every other value parser returns `Option` and the
//! caller picks a documented default.

use std::fmt;
use std::str::FromStr;

use serde::{Serialize, Serializer};

use crate::color::{Color, Rgba};
use crate::config::{BOLD_WEIGHT, EM_BASE_PX, PT_TO_PX};
use crate::error::{ContrastError, Result};

/// CSS color keywords understood by the parser. `transparent` is handled
/// separately because it carries zero alpha.
static NAMED_COLORS: &[(&str, Color)] = &[
    ("black", Color::new(0, 0, 0)),
    ("white", Color::new(255, 255, 255)),
    ("red", Color::new(255, 0, 0)),
    ("green", Color::new(0, 128, 0)),
    ("lime", Color::new(0, 255, 0)),
    ("blue", Color::new(0, 0, 255)),
    ("yellow", Color::new(255, 255, 0)),
    ("cyan", Color::new(0, 255, 255)),
    ("aqua", Color::new(0, 255, 255)),
    ("magenta", Color::new(255, 0, 255)),
    ("fuchsia", Color::new(255, 0, 255)),
    ("gray", Color::new(128, 128, 128)),
    ("grey", Color::new(128, 128, 128)),
    ("lightgray", Color::new(211, 211, 211)),
    ("lightgrey", Color::new(211, 211, 211)),
    ("darkgray", Color::new(169, 169, 169)),
    ("darkgrey", Color::new(169, 169, 169)),
    ("orange", Color::new(255, 165, 0)),
    ("purple", Color::new(128, 0, 128)),
    ("pink", Color::new(255, 192, 203)),
    ("brown", Color::new(165, 42, 42)),
    ("navy", Color::new(0, 0, 128)),
    ("teal", Color::new(0, 128, 128)),
    ("olive", Color::new(128, 128, 0)),
    ("maroon", Color::new(128, 0, 0)),
    ("silver", Color::new(192, 192, 192)),
];

/// Look up a CSS color keyword (case-insensitive).
pub fn named_color(name: &str) -> Option<Rgba> {
    let name = name.trim().to_ascii_lowercase();
    if name == "transparent" {
        return Some(Rgba::new(0, 0, 0, 0.0));
    }
    NAMED_COLORS
        .iter()
        .find(|(n, _)| *n == name)
        .map(|(_, c)| Rgba::opaque(*c))
}

/// Parse any supported CSS color into [`Rgba`].
///
/// Grammars are tried in order: keyword, `#rgb`/`#rgba`,
/// `#rrggbb`/`#rrggbbaa`, `rgb()`/`rgba()`, `hsl()`/`hsla()`.
pub fn parse_css_color(input: &str) -> Result<Rgba> {
    let s = input.trim().to_ascii_lowercase();
    let unrecognized = || ContrastError::UnrecognizedColorFormat(input.to_string());

    if let Some(rgba) = named_color(&s) {
        return Ok(rgba);
    }
    if let Some(hex) = s.strip_prefix('#') {
        return parse_hex(hex).ok_or_else(unrecognized);
    }
    if let Some(args) = function_args(&s, &["rgba", "rgb"]) {
        return parse_rgb_args(args).ok_or_else(unrecognized);
    }
    if let Some(args) = function_args(&s, &["hsla", "hsl"]) {
        return parse_hsl_args(args).ok_or_else(unrecognized);
    }
    Err(unrecognized())
}

fn parse_hex(hex: &str) -> Option<Rgba> {
    if !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
        return None;
    }
    let nibble = |i: usize| u8::from_str_radix(&hex[i..i + 1], 16).ok().map(|v| v * 17);
    let byte = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).ok();
    match hex.len() {
        3 => Some(Rgba::new(nibble(0)?, nibble(1)?, nibble(2)?, 1.0)),
        4 => Some(Rgba::new(
            nibble(0)?,
            nibble(1)?,
            nibble(2)?,
            nibble(3)? as f64 / 255.0,
        )),
        6 => Some(Rgba::new(byte(0)?, byte(2)?, byte(4)?, 1.0)),
        8 => Some(Rgba::new(
            byte(0)?,
            byte(2)?,
            byte(4)?,
            byte(6)? as f64 / 255.0,
        )),
        _ => None,
    }
}

/// Return the argument list of `name(...)` for the first matching name,
/// split on commas or, in the modern syntax, on whitespace and `/`.
fn function_args<'a>(s: &'a str, names: &[&str]) -> Option<Vec<&'a str>> {
    let rest = names.iter().find_map(|name| s.strip_prefix(name))?;
    let inner = rest.trim_start().strip_prefix('(')?.strip_suffix(')')?;
    let args: Vec<&str> = if inner.contains(',') {
        inner.split(',').map(str::trim).collect()
    } else {
        let (channels, alpha) = match inner.split_once('/') {
            Some((channels, alpha)) => (channels, Some(alpha.trim())),
            None => (inner, None),
        };
        channels.split_whitespace().chain(alpha).collect()
    };
    Some(args)
}

fn parse_number(s: &str) -> Option<f64> {
    s.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

fn parse_alpha(s: &str) -> Option<f64> {
    match s.strip_suffix('%') {
        Some(pct) => Some((parse_number(pct)? / 100.0).clamp(0.0, 1.0)),
        None => Some(parse_number(s)?.clamp(0.0, 1.0)),
    }
}

fn parse_rgb_args(args: Vec<&str>) -> Option<Rgba> {
    if args.len() != 3 && args.len() != 4 {
        return None;
    }
    let channel = |s: &str| -> Option<u8> {
        let value = match s.strip_suffix('%') {
            Some(pct) => parse_number(pct)? * 255.0 / 100.0,
            None => parse_number(s)?,
        };
        Some(value.round().clamp(0.0, 255.0) as u8)
    };
    let a = match args.get(3) {
        Some(alpha) => parse_alpha(alpha)?,
        None => 1.0,
    };
    Some(Rgba::new(
        channel(args[0])?,
        channel(args[1])?,
        channel(args[2])?,
        a,
    ))
}

fn parse_hsl_args(args: Vec<&str>) -> Option<Rgba> {
    if args.len() != 3 && args.len() != 4 {
        return None;
    }
    let hue = parse_number(args[0].strip_suffix("deg").unwrap_or(args[0]))?;
    let percent = |s: &str| -> Option<f64> {
        Some((parse_number(s.strip_suffix('%').unwrap_or(s))? / 100.0).clamp(0.0, 1.0))
    };
    let saturation = percent(args[1])?;
    let lightness = percent(args[2])?;
    let a = match args.get(3) {
        Some(alpha) => parse_alpha(alpha)?,
        None => 1.0,
    };
    let rgb = hsl_to_rgb(hue, saturation, lightness);
    Some(Rgba::new(rgb.r, rgb.g, rgb.b, a))
}

/// Convert HSL to sRGB.
///
/// `h` is in degrees and wraps modulo 360; `s` and `l` are in [0, 1].
/// Channels are rounded half up.
pub fn hsl_to_rgb(h: f64, s: f64, l: f64) -> Color {
    let h = h.rem_euclid(360.0);
    let c = (1.0 - (2.0 * l - 1.0).abs()) * s;
    let sector = h / 60.0;
    let x = c * (1.0 - ((sector % 2.0) - 1.0).abs());
    let (r1, g1, b1) = match sector as u8 {
        0 => (c, x, 0.0),
        1 => (x, c, 0.0),
        2 => (0.0, c, x),
        3 => (0.0, x, c),
        4 => (x, 0.0, c),
        _ => (c, 0.0, x),
    };
    let m = l - c / 2.0;
    let channel = |v: f64| ((v + m) * 255.0).round().clamp(0.0, 255.0) as u8;
    Color::new(channel(r1), channel(g1), channel(b1))
}

/// Parsed inline `style` attribute.
///
/// Property names are lowercased. When a property is declared twice the
/// later declaration wins, as in a browser.
#[derive(Debug, Clone, Default)]
pub struct InlineStyle {
    declarations: Vec<(String, String)>,
}

impl InlineStyle {
    pub fn parse(style: &str) -> Self {
        let declarations = style
            .split(';')
            .filter_map(|decl| {
                let (prop, value) = decl.split_once(':')?;
                let prop = prop.trim().to_ascii_lowercase();
                let value = value.trim();
                if prop.is_empty() || value.is_empty() {
                    return None;
                }
                Some((prop, value.to_string()))
            })
            .collect();
        Self { declarations }
    }

    pub fn get(&self, property: &str) -> Option<&str> {
        self.declarations
            .iter()
            .rev()
            .find(|(p, _)| p == property)
            .map(|(_, v)| v.as_str())
    }
}

/// Parse a `font-size` value to pixels.
///
/// Supports `px`, `pt`, `em`/`rem` (16px base), `%` of 16px and bare
/// numbers. Returns `None` for anything else, including non-positive sizes.
pub fn parse_font_size_px(value: &str) -> Option<f64> {
    let v = value.trim().to_ascii_lowercase();
    let px = if let Some(n) = v.strip_suffix("px") {
        parse_number(n)?
    } else if let Some(n) = v.strip_suffix("pt") {
        parse_number(n)? * PT_TO_PX
    } else if let Some(n) = v.strip_suffix("rem") {
        parse_number(n)? * EM_BASE_PX
    } else if let Some(n) = v.strip_suffix("em") {
        parse_number(n)? * EM_BASE_PX
    } else if let Some(n) = v.strip_suffix('%') {
        parse_number(n)? * EM_BASE_PX / 100.0
    } else {
        parse_number(&v)?
    };
    (px > 0.0).then_some(px)
}

/// Parse a length such as `120px` or `120` to pixels. Other units are
/// rejected.
pub fn parse_length_px(value: &str) -> Option<f64> {
    let v = value.trim().to_ascii_lowercase();
    parse_number(v.strip_suffix("px").unwrap_or(&v))
}

/// Extract the offsets of a 2D `translate(x[, y])` from a `transform` value.
pub fn parse_translate(transform: &str) -> Option<(f64, f64)> {
    let lower = transform.to_ascii_lowercase();
    let start = lower.find("translate(")? + "translate(".len();
    let end = start + lower[start..].find(')')?;
    let mut parts = lower[start..end].split(',');
    let x = parse_length_px(parts.next()?)?;
    let y = match parts.next() {
        Some(y) => parse_length_px(y)?,
        None => 0.0,
    };
    Some((x, y))
}

/// A CSS `font-weight` value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FontWeight {
    #[default]
    Normal,
    Bold,
    Bolder,
    Lighter,
    Numeric(u16),
}

impl FontWeight {
    /// `bold`, `bolder`, or a numeric weight of 700 and above.
    pub fn is_bold(self) -> bool {
        match self {
            FontWeight::Bold | FontWeight::Bolder => true,
            FontWeight::Numeric(n) => n >= BOLD_WEIGHT,
            FontWeight::Normal | FontWeight::Lighter => false,
        }
    }
}

impl FromStr for FontWeight {
    type Err = ();

    fn from_str(s: &str) -> std::result::Result<Self, ()> {
        match s.trim().to_ascii_lowercase().as_str() {
            "normal" => Ok(FontWeight::Normal),
            "bold" => Ok(FontWeight::Bold),
            "bolder" => Ok(FontWeight::Bolder),
            "lighter" => Ok(FontWeight::Lighter),
            other => match other.parse::<u16>() {
                Ok(n) if (1..=1000).contains(&n) => Ok(FontWeight::Numeric(n)),
                _ => Err(()),
            },
        }
    }
}

impl fmt::Display for FontWeight {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FontWeight::Normal => f.write_str("normal"),
            FontWeight::Bold => f.write_str("bold"),
            FontWeight::Bolder => f.write_str("bolder"),
            FontWeight::Lighter => f.write_str("lighter"),
            FontWeight::Numeric(n) => write!(f, "{n}"),
        }
    }
}

impl Serialize for FontWeight {
    fn serialize<S: Serializer>(&self, s: S) -> std::result::Result<S::Ok, S::Error> {
        s.collect_str(self)
    }
}
