//! Font resolution and text measurement.
//!
//! The layout stages only need two things from fonts: which face a
//! `(family, bold, italic)` triple resolves to, and how wide a string is in
//! that face. [`MeasurementProvider`] is that seam. [`FontManager`] is the
//! shipped implementation: it measures with real glyph advances when a
//! TTF/OTF face has been loaded via `ttf-parser`, and otherwise falls back to
//! an average-character-width heuristic per generic family.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::ForgeError;
use crate::model::{mm_to_pt, TextStyle};

/// The small fixed family table every font request maps onto.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GenericFamily {
    Sans,
    Serif,
    Monospace,
}

impl GenericFamily {
    /// Map an authored family name onto a generic family. Returns `None` for
    /// names outside the table.
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "sans" | "sans-serif" | "helvetica" | "arial" => Some(GenericFamily::Sans),
            "serif" | "times" | "times new roman" | "times-roman" => Some(GenericFamily::Serif),
            "monospace" | "mono" | "courier" | "courier new" => Some(GenericFamily::Monospace),
            _ => None,
        }
    }

    /// Average advance as a fraction of the font size.
    fn average_advance(self, bold: bool) -> f32 {
        let base = match self {
            GenericFamily::Sans => 0.5,
            GenericFamily::Serif => 0.45,
            GenericFamily::Monospace => 0.6,
        };
        // Bold is ~10 % wider, except fixed-pitch faces.
        if bold && self != GenericFamily::Monospace {
            base * 1.1
        } else {
            base
        }
    }
}

/// A resolved face: one of the generic families in one of four styles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FontId {
    pub family: GenericFamily,
    pub bold: bool,
    pub italic: bool,
}

impl FontId {
    pub const DEFAULT: FontId = FontId {
        family: GenericFamily::Sans,
        bold: false,
        italic: false,
    };

    /// PostScript name of the matching standard-14 PDF font.
    pub fn builtin_name(&self) -> &'static str {
        match (self.family, self.bold, self.italic) {
            (GenericFamily::Sans, false, false) => "Helvetica",
            (GenericFamily::Sans, true, false) => "Helvetica-Bold",
            (GenericFamily::Sans, false, true) => "Helvetica-Oblique",
            (GenericFamily::Sans, true, true) => "Helvetica-BoldOblique",
            (GenericFamily::Serif, false, false) => "Times-Roman",
            (GenericFamily::Serif, true, false) => "Times-Bold",
            (GenericFamily::Serif, false, true) => "Times-Italic",
            (GenericFamily::Serif, true, true) => "Times-BoldItalic",
            (GenericFamily::Monospace, false, false) => "Courier",
            (GenericFamily::Monospace, true, false) => "Courier-Bold",
            (GenericFamily::Monospace, false, true) => "Courier-Oblique",
            (GenericFamily::Monospace, true, true) => "Courier-BoldOblique",
        }
    }
}

/// Supplies font resolution and string widths to the layout stages.
pub trait MeasurementProvider {
    /// Resolve an authored family name and style to a face. Unknown families
    /// fall back to the default sans family.
    fn resolve_font(&self, family: &str, bold: bool, italic: bool) -> FontId;

    /// Width of `text` in points when set in `font` at `size` points.
    fn measure_width(&self, text: &str, font: FontId, size: f32) -> f32;
}

/// Metrics of a loaded font face.
#[derive(Clone)]
struct FontData {
    /// Raw font bytes (kept alive for ttf-parser's zero-copy API).
    bytes: Vec<u8>,
    units_per_em: f32,
}

/// Default [`MeasurementProvider`].
#[derive(Clone, Default)]
pub struct FontManager {
    faces: HashMap<FontId, FontData>,
}

impl FontManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a TTF/OTF face to use for measuring `font`.
    pub fn load_font(&mut self, font: FontId, bytes: Vec<u8>) -> Result<(), ForgeError> {
        let face = ttf_parser::Face::parse(&bytes, 0)
            .map_err(|e| ForgeError::Render(format!("Failed to parse font: {e}")))?;
        let data = FontData {
            units_per_em: face.units_per_em() as f32,
            bytes,
        };
        log::debug!("loaded font face for {}", font.builtin_name());
        self.faces.insert(font, data);
        Ok(())
    }

    /// Whether a real face backs measurements for `font`.
    pub fn has_face(&self, font: FontId) -> bool {
        self.faces.contains_key(&font)
    }

    fn heuristic_width(text: &str, font: FontId, size: f32) -> f32 {
        text.chars().count() as f32 * size * font.family.average_advance(font.bold)
    }
}

impl MeasurementProvider for FontManager {
    fn resolve_font(&self, family: &str, bold: bool, italic: bool) -> FontId {
        let family = GenericFamily::from_name(family).unwrap_or_else(|| {
            log::warn!("unknown font family '{family}', falling back to sans");
            GenericFamily::Sans
        });
        FontId {
            family,
            bold,
            italic,
        }
    }

    fn measure_width(&self, text: &str, font: FontId, size: f32) -> f32 {
        let Some(data) = self.faces.get(&font) else {
            return Self::heuristic_width(text, font, size);
        };

        // Parse the font and sum horizontal advances
        match ttf_parser::Face::parse(&data.bytes, 0) {
            Ok(face) => {
                let scale = size / data.units_per_em;
                text.chars()
                    .map(|ch| match face.glyph_index(ch) {
                        Some(gid) => face.glyph_hor_advance(gid).unwrap_or(0) as f32 * scale,
                        // Missing glyph
                        None => size * font.family.average_advance(font.bold),
                    })
                    .sum()
            }
            Err(_) => Self::heuristic_width(text, font, size),
        }
    }
}

/// Word-wrap text to fit within `max_width` points.
///
/// Hard line breaks split paragraphs first; each paragraph is then filled
/// greedily (a run of words stays on a line while its measured width is
/// `<= max_width`). A word wider than the line is placed alone, never
/// truncated. Empty paragraphs are kept as blank lines, so the result always
/// has at least one line.
pub fn wrap_text(
    text: &str,
    font: FontId,
    size: f32,
    max_width: f32,
    fonts: &dyn MeasurementProvider,
) -> Vec<String> {
    let mut lines: Vec<String> = Vec::new();
    for paragraph in text.split('\n') {
        let paragraph = paragraph.strip_suffix('\r').unwrap_or(paragraph);
        let mut words = paragraph.split_whitespace();
        let Some(first) = words.next() else {
            lines.push(String::new());
            continue;
        };

        if max_width <= 0.0 {
            lines.push(std::iter::once(first).chain(words).collect::<Vec<_>>().join(" "));
            continue;
        }

        let mut current_line = first.to_string();
        for word in words {
            let candidate = format!("{current_line} {word}");
            if fonts.measure_width(&candidate, font, size) <= max_width {
                current_line = candidate;
            } else {
                lines.push(std::mem::replace(&mut current_line, word.to_string()));
            }
        }
        lines.push(current_line);
    }
    lines
}

/// Wrap `text` in `style` against a width given in millimetres.
pub fn wrap_styled(
    text: &str,
    style: &TextStyle,
    width_mm: f32,
    fonts: &dyn MeasurementProvider,
) -> Vec<String> {
    let font = fonts.resolve_font(&style.font_family, style.bold, style.italic);
    wrap_text(text, font, style.font_size, mm_to_pt(width_mm), fonts)
}
