//! Renderer contract and the two shipped backends.
//!
//! Every [`Renderer`] call takes points with a top-left origin; converting to
//! the backend's own coordinate system is the backend's job. [`PdfRenderer`]
//! writes PDF with `printpdf` (v0.8 ops-based API). [`RecordingRenderer`]
//! captures the call stream as [`DrawCall`] values.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use base64::{engine::general_purpose::STANDARD as BASE64_STD, Engine as _};
use printpdf::*;
use serde::{Deserialize, Serialize};

use crate::error::ForgeError;
use crate::fonts::{wrap_text, FontId, FontManager, GenericFamily, MeasurementProvider};
use crate::model::{line_height_pt, TableTheme, TextAlign};

const PT_TO_MM: f32 = 0.352778;

// ---------------------------------------------------------------------------
// Primitive descriptions
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RectSpec {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub stroke_color: Option<String>,
    pub fill_color: Option<String>,
    pub stroke_width: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineSpec {
    pub x1: f32,
    pub y1: f32,
    pub x2: f32,
    pub y2: f32,
    pub color: String,
    pub stroke_width: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageSpec {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    /// File path or base64 `data:` URI.
    pub source: String,
}

/// A run of text whose top edge is at `y`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextSpec {
    pub x: f32,
    pub y: f32,
    pub text: String,
    pub font_family: String,
    pub font_size: f32,
    pub color: String,
    pub align: TextAlign,
    pub width: Option<f32>,
    pub bold: bool,
    pub italic: bool,
    /// Wrap at `width`.
    pub wrap: bool,
    /// Shrink the font until the text fits `width` on one line.
    pub auto_scale: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableSpec {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub rows: Vec<Vec<String>>,
    pub col_widths: Option<Vec<f32>>,
    pub row_heights: Option<Vec<f32>>,
    pub font_size: f32,
    pub stroke_color: String,
    pub header_fill: Option<String>,
    pub theme: TableTheme,
}

impl TableSpec {
    fn column_widths(&self) -> Vec<f32> {
        let columns = self.rows.iter().map(Vec::len).max().unwrap_or(0);
        match &self.col_widths {
            Some(widths) if widths.len() == columns => widths.clone(),
            _ if columns > 0 => vec![self.width / columns as f32; columns],
            _ => Vec::new(),
        }
    }

    fn row_heights(&self) -> Vec<f32> {
        match &self.row_heights {
            Some(heights) if heights.len() == self.rows.len() => heights.clone(),
            _ if !self.rows.is_empty() => vec![self.height / self.rows.len() as f32; self.rows.len()],
            _ => Vec::new(),
        }
    }
}

/// The drawing backend driven by the export pipeline.
///
/// A renderer produces one document and is not reused.
pub trait Renderer {
    fn set_page_size(&mut self, width: f32, height: f32);
    fn initialize(&mut self, output: Option<&Path>) -> Result<(), ForgeError>;
    fn start_page(&mut self) -> Result<(), ForgeError>;
    fn end_page(&mut self) -> Result<(), ForgeError>;
    fn draw_rect(&mut self, rect: &RectSpec) -> Result<(), ForgeError>;
    fn draw_line(&mut self, line: &LineSpec) -> Result<(), ForgeError>;
    fn draw_image(&mut self, image: &ImageSpec) -> Result<(), ForgeError>;
    fn draw_text(&mut self, text: &TextSpec) -> Result<(), ForgeError>;
    fn draw_table(&mut self, table: &TableSpec) -> Result<(), ForgeError>;
    fn save(&mut self, output: Option<&Path>) -> Result<(), ForgeError>;
}

// ---------------------------------------------------------------------------
// Recording backend
// ---------------------------------------------------------------------------

/// One captured renderer call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum DrawCall {
    SetPageSize { width: f32, height: f32 },
    Initialize { output: Option<String> },
    StartPage,
    EndPage,
    Rect(RectSpec),
    Line(LineSpec),
    Image(ImageSpec),
    Text(TextSpec),
    Table(TableSpec),
    Save { output: Option<String> },
}

#[derive(Debug, Clone, Default)]
pub struct RecordingRenderer {
    calls: Vec<DrawCall>,
}

impl RecordingRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> &[DrawCall] {
        &self.calls
    }

    pub fn into_calls(self) -> Vec<DrawCall> {
        self.calls
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string_pretty(&self.calls).unwrap_or_default()
    }
}

fn path_string(path: Option<&Path>) -> Option<String> {
    path.map(|p| p.display().to_string())
}

impl Renderer for RecordingRenderer {
    fn set_page_size(&mut self, width: f32, height: f32) {
        self.calls.push(DrawCall::SetPageSize { width, height });
    }

    fn initialize(&mut self, output: Option<&Path>) -> Result<(), ForgeError> {
        self.calls.push(DrawCall::Initialize {
            output: path_string(output),
        });
        Ok(())
    }

    fn start_page(&mut self) -> Result<(), ForgeError> {
        self.calls.push(DrawCall::StartPage);
        Ok(())
    }

    fn end_page(&mut self) -> Result<(), ForgeError> {
        self.calls.push(DrawCall::EndPage);
        Ok(())
    }

    fn draw_rect(&mut self, rect: &RectSpec) -> Result<(), ForgeError> {
        self.calls.push(DrawCall::Rect(rect.clone()));
        Ok(())
    }

    fn draw_line(&mut self, line: &LineSpec) -> Result<(), ForgeError> {
        self.calls.push(DrawCall::Line(line.clone()));
        Ok(())
    }

    fn draw_image(&mut self, image: &ImageSpec) -> Result<(), ForgeError> {
        self.calls.push(DrawCall::Image(image.clone()));
        Ok(())
    }

    fn draw_text(&mut self, text: &TextSpec) -> Result<(), ForgeError> {
        self.calls.push(DrawCall::Text(text.clone()));
        Ok(())
    }

    fn draw_table(&mut self, table: &TableSpec) -> Result<(), ForgeError> {
        self.calls.push(DrawCall::Table(table.clone()));
        Ok(())
    }

    fn save(&mut self, output: Option<&Path>) -> Result<(), ForgeError> {
        self.calls.push(DrawCall::Save {
            output: path_string(output),
        });
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// PDF backend
// ---------------------------------------------------------------------------

/// A printpdf XObject together with the pixel dimensions of the source image.
struct ImageResource {
    xobj_id: XObjectId,
    px_width: u32,
    px_height: u32,
}

/// Writes PDF through `printpdf` using the standard-14 fonts.
pub struct PdfRenderer {
    title: String,
    page_width: f32,
    page_height: f32,
    fonts: FontManager,
    doc: Option<PdfDocument>,
    pages: Vec<PdfPage>,
    current: Option<Vec<Op>>,
    images: HashMap<String, ImageResource>,
    output: Option<PathBuf>,
    bytes: Option<Vec<u8>>,
}

impl PdfRenderer {
    pub fn new(title: impl Into<String>) -> Self {
        Self::with_fonts(title, FontManager::default())
    }

    /// Use `fonts` to measure text for alignment, wrapping and auto-scaling.
    pub fn with_fonts(title: impl Into<String>, fonts: FontManager) -> Self {
        Self {
            title: title.into(),
            // A4 until told otherwise
            page_width: 595.28,
            page_height: 841.89,
            fonts,
            doc: None,
            pages: Vec::new(),
            current: None,
            images: HashMap::new(),
            output: None,
            bytes: None,
        }
    }

    /// The saved document, once [`Renderer::save`] has run.
    pub fn bytes(&self) -> Option<&[u8]> {
        self.bytes.as_deref()
    }

    pub fn take_bytes(&mut self) -> Option<Vec<u8>> {
        self.bytes.take()
    }

    fn ops(&mut self) -> Result<&mut Vec<Op>, ForgeError> {
        self.current
            .as_mut()
            .ok_or_else(|| ForgeError::Render("draw call outside of a page".into()))
    }

    /// PDF origin is bottom-left; ours is top-left.
    fn flip(&self, y: f32) -> f32 {
        self.page_height - y
    }

    fn load_image(&mut self, source: &str) -> Result<(), ForgeError> {
        if self.images.contains_key(source) {
            return Ok(());
        }
        let doc = self
            .doc
            .as_mut()
            .ok_or_else(|| ForgeError::Render("renderer not initialized".into()))?;

        let bytes = if source.starts_with("data:") {
            parse_data_uri(source).map_err(ForgeError::Render)?
        } else {
            std::fs::read(source)?
        };

        // Decode with the `image` crate to obtain pixel dimensions.
        let dyn_img = ::image::load_from_memory(&bytes)
            .map_err(|e| ForgeError::Render(format!("image decode error: {e}")))?;
        let (px_width, px_height) = (dyn_img.width(), dyn_img.height());

        let mut warnings: Vec<PdfWarnMsg> = Vec::new();
        let raw = RawImage::decode_from_bytes(&bytes, &mut warnings)
            .map_err(|e| ForgeError::Render(format!("PDF image encode error: {e}")))?;
        let xobj_id = doc.add_image(&raw);

        self.images.insert(
            source.to_string(),
            ImageResource {
                xobj_id,
                px_width,
                px_height,
            },
        );
        Ok(())
    }

    fn rect_ops(&self, rect: &RectSpec) -> Vec<Op> {
        let mut ops = Vec::new();
        let x1 = rect.x;
        let x2 = rect.x + rect.width;
        let y_top = self.flip(rect.y);
        let y_bottom = self.flip(rect.y + rect.height);

        if let Some(fill) = rect.fill_color.as_deref().and_then(parse_color) {
            ops.push(Op::SetFillColor { col: fill });
            ops.push(Op::DrawPolygon {
                polygon: Polygon {
                    rings: vec![PolygonRing {
                        points: box_points(x1, y_bottom, x2, y_top),
                    }],
                    mode: PaintMode::Fill,
                    winding_order: WindingOrder::NonZero,
                },
            });
        }

        if let Some(stroke) = rect.stroke_color.as_deref().and_then(parse_color) {
            ops.push(Op::SetOutlineColor { col: stroke });
            ops.push(Op::SetOutlineThickness {
                pt: Pt(rect.stroke_width),
            });
            ops.push(Op::DrawLine {
                line: Line {
                    points: box_points(x1, y_bottom, x2, y_top),
                    is_closed: true,
                },
            });
        }
        ops
    }

    fn line_ops(&self, line: &LineSpec) -> Vec<Op> {
        vec![
            Op::SetOutlineColor {
                col: color_or_black(&line.color),
            },
            Op::SetOutlineThickness {
                pt: Pt(line.stroke_width),
            },
            Op::DrawLine {
                line: Line {
                    points: vec![
                        line_point(line.x1, self.flip(line.y1)),
                        line_point(line.x2, self.flip(line.y2)),
                    ],
                    is_closed: false,
                },
            },
        ]
    }

    /// Ops for one line of text with its baseline at `baseline` (PDF space).
    fn text_line_ops(
        font: BuiltinFont,
        x: f32,
        baseline: f32,
        size: f32,
        color: &Color,
        text: &str,
    ) -> Vec<Op> {
        vec![
            Op::StartTextSection,
            Op::SetTextCursor {
                pos: Point {
                    x: Pt(x),
                    y: Pt(baseline),
                },
            },
            Op::SetFontSizeBuiltinFont {
                size: Pt(size),
                font,
            },
            Op::SetLineHeight {
                lh: Pt(line_height_pt(size)),
            },
            Op::SetFillColor { col: color.clone() },
            Op::WriteTextBuiltinFont {
                items: vec![TextItem::Text(to_winlatin(text))],
                font,
            },
            Op::EndTextSection,
        ]
    }

    fn text_ops(&self, spec: &TextSpec) -> Vec<Op> {
        let font_id = self
            .fonts
            .resolve_font(&spec.font_family, spec.bold, spec.italic);
        let font = builtin_font(font_id);
        let color = color_or_black(&spec.color);
        let width = spec.width.filter(|w| *w > 0.0);

        let mut size = spec.font_size;
        if let (true, Some(w)) = (spec.auto_scale, width) {
            let measured = self.fonts.measure_width(&spec.text, font_id, size);
            if measured > w {
                size *= (w / measured) * 0.98;
            }
        }

        let lines: Vec<String> = match width {
            Some(w) if spec.wrap && !spec.auto_scale => {
                wrap_text(&spec.text, font_id, size, w, &self.fonts)
            }
            _ => spec.text.split('\n').map(str::to_string).collect(),
        };

        let first_baseline = self.flip(spec.y + size * 0.8);
        let mut ops = Vec::new();
        for (i, line) in lines.iter().enumerate() {
            if line.is_empty() {
                continue;
            }
            let line_width = self.fonts.measure_width(line, font_id, size);
            let x = match (spec.align, width) {
                (TextAlign::Center, Some(w)) => spec.x + (w - line_width) / 2.0,
                (TextAlign::Right, Some(w)) => spec.x + w - line_width,
                _ => spec.x,
            };
            let baseline = first_baseline - i as f32 * line_height_pt(size);
            ops.extend(Self::text_line_ops(font, x, baseline, size, &color, line));
        }
        ops
    }

    fn table_ops(&self, table: &TableSpec) -> Vec<Op> {
        let widths = table.column_widths();
        let heights = table.row_heights();
        if widths.is_empty() || heights.is_empty() {
            return Vec::new();
        }
        let x_right = table.x + widths.iter().sum::<f32>();
        let font = builtin_font(FontId::DEFAULT);
        let header_font = builtin_font(FontId {
            bold: true,
            ..FontId::DEFAULT
        });
        let stroke = color_or_black(&table.stroke_color);
        let text_color = color_or_black("black");
        let header_fill = match table.theme {
            TableTheme::Dark => Some("#333333".to_string()),
            _ => table.header_fill.clone(),
        };
        let has_header = header_fill.is_some();
        let mut ops = Vec::new();

        // Row backgrounds
        let mut top = table.y;
        for (r, h) in heights.iter().enumerate() {
            let fill = match (r, table.theme) {
                (0, _) if has_header => header_fill.clone(),
                (r, TableTheme::Striped) if r % 2 == 1 => Some("#f5f5f5".to_string()),
                _ => None,
            };
            if let Some(fill) = fill {
                ops.extend(self.rect_ops(&RectSpec {
                    x: table.x,
                    y: top,
                    width: x_right - table.x,
                    height: *h,
                    stroke_color: None,
                    fill_color: Some(fill),
                    stroke_width: 0.0,
                }));
            }
            top += h;
        }
        let bottom = top;

        // Rules
        ops.push(Op::SetOutlineColor { col: stroke });
        ops.push(Op::SetOutlineThickness { pt: Pt(0.5) });
        let mut rule = |x1: f32, y1: f32, x2: f32, y2: f32| {
            ops.push(Op::DrawLine {
                line: Line {
                    points: vec![
                        line_point(x1, self.flip(y1)),
                        line_point(x2, self.flip(y2)),
                    ],
                    is_closed: false,
                },
            });
        };
        let mut y = table.y;
        for (r, h) in heights.iter().enumerate() {
            let draw = match table.theme {
                TableTheme::Simple => r == 0 || (r == 1 && has_header),
                _ => true,
            };
            if draw {
                rule(table.x, y, x_right, y);
            }
            y += h;
        }
        rule(table.x, bottom, x_right, bottom);
        if table.theme != TableTheme::Simple {
            let mut x = table.x;
            rule(x, table.y, x, bottom);
            for w in &widths {
                x += w;
                rule(x, table.y, x, bottom);
            }
        }

        // Cell text, vertically centred
        let padding = 2.0;
        let mut row_top = table.y;
        for (r, (row, h)) in table.rows.iter().zip(&heights).enumerate() {
            let is_header = r == 0 && has_header;
            let (cell_font, cell_color) = match (is_header, table.theme) {
                (true, TableTheme::Dark) => (header_font, color_or_black("white")),
                (true, _) => (header_font, text_color.clone()),
                _ => (font, text_color.clone()),
            };
            let baseline = self.flip(row_top + h / 2.0 + table.font_size * 0.35);
            let mut x = table.x;
            for (cell, w) in row.iter().zip(&widths) {
                if !cell.is_empty() {
                    ops.extend(Self::text_line_ops(
                        cell_font,
                        x + padding,
                        baseline,
                        table.font_size,
                        &cell_color,
                        cell,
                    ));
                }
                x += w;
            }
            row_top += h;
        }
        ops
    }

    fn image_ops(&self, spec: &ImageSpec) -> Vec<Op> {
        let Some(res) = self.images.get(&spec.source) else {
            return Vec::new();
        };
        // translate_y = bottom edge of image in PDF coordinates.
        let img_bottom_y = self.flip(spec.y + spec.height);

        // At dpi=72 printpdf renders 1 px = 1 pt, so
        // scale = desired_pt / px_dim.
        let scale_x = if res.px_width > 0 {
            spec.width / res.px_width as f32
        } else {
            1.0
        };
        let scale_y = if res.px_height > 0 {
            spec.height / res.px_height as f32
        } else {
            1.0
        };

        vec![Op::UseXobject {
            id: res.xobj_id.clone(),
            transform: XObjectTransform {
                translate_x: Some(Pt(spec.x)),
                translate_y: Some(Pt(img_bottom_y)),
                dpi: Some(72.0),
                scale_x: Some(scale_x),
                scale_y: Some(scale_y),
                rotate: None,
            },
        }]
    }
}

impl Renderer for PdfRenderer {
    fn set_page_size(&mut self, width: f32, height: f32) {
        self.page_width = width;
        self.page_height = height;
    }

    fn initialize(&mut self, output: Option<&Path>) -> Result<(), ForgeError> {
        self.doc = Some(PdfDocument::new(&self.title));
        self.output = output.map(Path::to_path_buf);
        Ok(())
    }

    fn start_page(&mut self) -> Result<(), ForgeError> {
        if self.current.is_some() {
            return Err("start_page called twice without end_page".into());
        }
        self.current = Some(Vec::new());
        Ok(())
    }

    fn end_page(&mut self) -> Result<(), ForgeError> {
        let ops = self
            .current
            .take()
            .ok_or_else(|| ForgeError::Render("end_page without start_page".into()))?;
        self.pages.push(PdfPage::new(
            Mm(self.page_width * PT_TO_MM),
            Mm(self.page_height * PT_TO_MM),
            ops,
        ));
        Ok(())
    }

    fn draw_rect(&mut self, rect: &RectSpec) -> Result<(), ForgeError> {
        let ops = self.rect_ops(rect);
        self.ops()?.extend(ops);
        Ok(())
    }

    fn draw_line(&mut self, line: &LineSpec) -> Result<(), ForgeError> {
        let ops = self.line_ops(line);
        self.ops()?.extend(ops);
        Ok(())
    }

    fn draw_image(&mut self, image: &ImageSpec) -> Result<(), ForgeError> {
        if image.source.is_empty() {
            return Ok(());
        }
        if let Err(e) = self.load_image(&image.source) {
            // Red outline marks where the image should have been.
            let placeholder = self.rect_ops(&RectSpec {
                x: image.x,
                y: image.y,
                width: image.width,
                height: image.height,
                stroke_color: Some("red".into()),
                fill_color: None,
                stroke_width: 1.0,
            });
            self.ops()?.extend(placeholder);
            return Err(e);
        }
        let ops = self.image_ops(image);
        self.ops()?.extend(ops);
        Ok(())
    }

    fn draw_text(&mut self, text: &TextSpec) -> Result<(), ForgeError> {
        let ops = self.text_ops(text);
        self.ops()?.extend(ops);
        Ok(())
    }

    fn draw_table(&mut self, table: &TableSpec) -> Result<(), ForgeError> {
        let ops = self.table_ops(table);
        self.ops()?.extend(ops);
        Ok(())
    }

    fn save(&mut self, output: Option<&Path>) -> Result<(), ForgeError> {
        let mut doc = self
            .doc
            .take()
            .ok_or_else(|| ForgeError::Render("save called before initialize".into()))?;
        if let Some(ops) = self.current.take() {
            log::warn!("unterminated page closed on save");
            self.pages.push(PdfPage::new(
                Mm(self.page_width * PT_TO_MM),
                Mm(self.page_height * PT_TO_MM),
                ops,
            ));
        }

        let mut pages = std::mem::take(&mut self.pages);
        // Ensure at least one page.
        if pages.is_empty() {
            pages.push(PdfPage::new(
                Mm(self.page_width * PT_TO_MM),
                Mm(self.page_height * PT_TO_MM),
                Vec::new(),
            ));
        }
        doc.with_pages(pages);
        let bytes = doc.save(&PdfSaveOptions::default(), &mut Vec::new());

        if let Some(path) = output.or(self.output.as_deref()) {
            std::fs::write(path, &bytes)?;
            log::debug!("wrote {} bytes to {}", bytes.len(), path.display());
        }
        self.bytes = Some(bytes);
        Ok(())
    }
}

fn line_point(x: f32, y: f32) -> LinePoint {
    LinePoint {
        p: Point { x: Pt(x), y: Pt(y) },
        bezier: false,
    }
}

/// Corners of an axis-aligned box in PDF space, counter-clockwise from the
/// bottom-left.
fn box_points(x1: f32, y1: f32, x2: f32, y2: f32) -> Vec<LinePoint> {
    vec![
        line_point(x1, y1),
        line_point(x2, y1),
        line_point(x2, y2),
        line_point(x1, y2),
    ]
}

fn builtin_font(font: FontId) -> BuiltinFont {
    match (font.family, font.bold, font.italic) {
        (GenericFamily::Sans, false, false) => BuiltinFont::Helvetica,
        (GenericFamily::Sans, true, false) => BuiltinFont::HelveticaBold,
        (GenericFamily::Sans, false, true) => BuiltinFont::HelveticaOblique,
        (GenericFamily::Sans, true, true) => BuiltinFont::HelveticaBoldOblique,
        (GenericFamily::Serif, false, false) => BuiltinFont::TimesRoman,
        (GenericFamily::Serif, true, false) => BuiltinFont::TimesBold,
        (GenericFamily::Serif, false, true) => BuiltinFont::TimesItalic,
        (GenericFamily::Serif, true, true) => BuiltinFont::TimesBoldItalic,
        (GenericFamily::Monospace, false, false) => BuiltinFont::Courier,
        (GenericFamily::Monospace, true, false) => BuiltinFont::CourierBold,
        (GenericFamily::Monospace, false, true) => BuiltinFont::CourierOblique,
        (GenericFamily::Monospace, true, true) => BuiltinFont::CourierBoldOblique,
    }
}

/// Parse `#rgb`, `#rrggbb` or a common colour name. `None` for
/// `transparent`, empty and unrecognised values.
pub fn parse_rgb(value: &str) -> Option<(f32, f32, f32)> {
    let value = value.trim();
    let named = match value.to_ascii_lowercase().as_str() {
        "black" => Some("000000"),
        "white" => Some("ffffff"),
        "red" => Some("ff0000"),
        "green" => Some("008000"),
        "blue" => Some("0000ff"),
        "yellow" => Some("ffff00"),
        "orange" => Some("ffa500"),
        "gray" | "grey" => Some("808080"),
        "lightgray" | "lightgrey" => Some("d3d3d3"),
        "darkgray" | "darkgrey" => Some("a9a9a9"),
        _ => None,
    };
    let hex = named.unwrap_or_else(|| value.trim_start_matches('#'));
    let channel = |s: &str| u8::from_str_radix(s, 16).ok().map(|v| v as f32 / 255.0);
    match hex.len() {
        6 if hex.is_ascii() => Some((channel(&hex[0..2])?, channel(&hex[2..4])?, channel(&hex[4..6])?)),
        3 if hex.is_ascii() => Some((
            channel(&hex[0..1].repeat(2))?,
            channel(&hex[1..2].repeat(2))?,
            channel(&hex[2..3].repeat(2))?,
        )),
        _ => None,
    }
}

fn parse_color(value: &str) -> Option<Color> {
    parse_rgb(value).map(|(r, g, b)| {
        Color::Rgb(Rgb {
            r,
            g,
            b,
            icc_profile: None,
        })
    })
}

fn color_or_black(value: &str) -> Color {
    parse_color(value).unwrap_or_else(|| {
        log::debug!("unrecognised colour '{value}', using black");
        Color::Rgb(Rgb {
            r: 0.0,
            g: 0.0,
            b: 0.0,
            icc_profile: None,
        })
    })
}

/// Convert a UTF-8 string to raw Windows-1252 bytes then wrap in a String so
/// printpdf writes the bytes unchanged into the PDF stream (builtin fonts use
/// WinAnsiEncoding, so each glyph is one byte 0x00–0xFF).
fn to_winlatin(s: &str) -> String {
    let bytes: Vec<u8> = s
        .chars()
        .map(|c| match c {
            '\u{20AC}' => 0x80, // euro
            '\u{2026}' => 0x85, // ellipsis
            '\u{2018}' => 0x91,
            '\u{2019}' => 0x92,
            '\u{201C}' => 0x93,
            '\u{201D}' => 0x94,
            '\u{2022}' => 0x95, // bullet
            '\u{2013}' => 0x96,
            '\u{2014}' => 0x97,
            '\u{00A0}' => 0x20,
            c if (c as u32) < 256 => c as u8,
            _ => b'?',
        })
        .collect();
    // SAFETY: intentionally non-UTF-8 for 0x80-0xFF; printpdf passes these
    // bytes straight to the PDF stream, decoded by WinAnsiEncoding.
    #[allow(unsafe_code)]
    unsafe {
        String::from_utf8_unchecked(bytes)
    }
}

/// Parse a `data:<mime>;base64,<data>` URI and return the raw decoded bytes.
fn parse_data_uri(src: &str) -> Result<Vec<u8>, String> {
    let rest = src
        .strip_prefix("data:")
        .ok_or_else(|| "not a data URI".to_string())?;
    let comma_pos = rest.find(',').ok_or_else(|| {
        "Invalid data URI: missing `,` separator between header and data".to_string()
    })?;
    let header = &rest[..comma_pos];
    if !header.contains(";base64") {
        return Err("Only base64-encoded data URIs are supported".to_string());
    }
    BASE64_STD
        .decode(rest[comma_pos + 1..].trim())
        .map_err(|e| format!("Base64 decode error: {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(s: &str) -> TextSpec {
        TextSpec {
            x: 10.0,
            y: 10.0,
            text: s.into(),
            font_family: "Times".into(),
            font_size: 12.0,
            color: "#336699".into(),
            align: TextAlign::Center,
            width: Some(100.0),
            bold: true,
            italic: false,
            wrap: true,
            auto_scale: false,
        }
    }

    #[test]
    fn render_empty_document() {
        let mut r = PdfRenderer::new("empty");
        r.initialize(None).unwrap();
        r.save(None).unwrap();
        let bytes = r.take_bytes().unwrap();
        assert!(bytes.len() > 100, "PDF should have content");
        // PDF magic number
        assert_eq!(&bytes[0..5], b"%PDF-");
    }

    #[test]
    fn draws_every_primitive_kind() {
        let mut r = PdfRenderer::new("all");
        r.set_page_size(226.77, 300.0);
        r.initialize(None).unwrap();
        r.start_page().unwrap();
        r.draw_rect(&RectSpec {
            x: 1.0,
            y: 1.0,
            width: 50.0,
            height: 20.0,
            stroke_color: Some("black".into()),
            fill_color: Some("#eee".into()),
            stroke_width: 1.0,
        })
        .unwrap();
        r.draw_line(&LineSpec {
            x1: 0.0,
            y1: 0.0,
            x2: 100.0,
            y2: 100.0,
            color: "blue".into(),
            stroke_width: 2.0,
        })
        .unwrap();
        r.draw_text(&text("Total due: 42,00 €")).unwrap();
        for theme in [TableTheme::Simple, TableTheme::Grid, TableTheme::Striped, TableTheme::Dark] {
            r.draw_table(&TableSpec {
                x: 0.0,
                y: 150.0,
                width: 200.0,
                height: 60.0,
                rows: vec![
                    vec!["Item".into(), "Qty".into()],
                    vec!["Bolt".into(), "3".into()],
                    vec!["Nut".into()],
                ],
                col_widths: None,
                row_heights: None,
                font_size: 9.0,
                stroke_color: "black".into(),
                header_fill: Some("#f0f0f0".into()),
                theme,
            })
            .unwrap();
        }
        r.end_page().unwrap();
        r.save(None).unwrap();
        assert_eq!(&r.bytes().unwrap()[0..5], b"%PDF-");
    }

    #[test]
    fn embeds_data_uri_images() {
        let mut png = Vec::new();
        ::image::DynamicImage::ImageRgb8(::image::RgbImage::new(4, 2))
            .write_to(&mut std::io::Cursor::new(&mut png), ::image::ImageFormat::Png)
            .unwrap();
        let uri = format!("data:image/png;base64,{}", BASE64_STD.encode(&png));

        let mut r = PdfRenderer::new("img");
        r.initialize(None).unwrap();
        r.start_page().unwrap();
        let spec = ImageSpec {
            x: 10.0,
            y: 10.0,
            width: 40.0,
            height: 20.0,
            source: uri,
        };
        r.draw_image(&spec).unwrap();
        // Cached on second use
        r.draw_image(&spec).unwrap();
        assert_eq!(r.images.len(), 1);
        r.end_page().unwrap();
        r.save(None).unwrap();
    }

    #[test]
    fn unreadable_image_reports_error_and_page_survives() {
        let mut r = PdfRenderer::new("img");
        r.initialize(None).unwrap();
        r.start_page().unwrap();
        let err = r
            .draw_image(&ImageSpec {
                x: 0.0,
                y: 0.0,
                width: 10.0,
                height: 10.0,
                source: "/definitely/not/here.png".into(),
            })
            .unwrap_err();
        assert!(matches!(err, ForgeError::Io(_)), "{err}");
        assert!(!r.current.as_ref().unwrap().is_empty(), "placeholder outline drawn");
        r.end_page().unwrap();
        r.save(None).unwrap();
    }

    #[test]
    fn draw_outside_page_is_an_error() {
        let mut r = PdfRenderer::new("x");
        r.initialize(None).unwrap();
        assert!(r.draw_text(&text("hi")).is_err());
    }

    #[test]
    fn colours_parse_hex_and_names() {
        assert_eq!(parse_rgb("#ff0000"), Some((1.0, 0.0, 0.0)));
        assert_eq!(parse_rgb("fff"), Some((1.0, 1.0, 1.0)));
        assert_eq!(parse_rgb("Black"), Some((0.0, 0.0, 0.0)));
        assert_eq!(parse_rgb("transparent"), None);
        assert_eq!(parse_rgb("#12"), None);
    }

    #[test]
    fn recorded_calls_serialise_with_op_tag() {
        let mut r = RecordingRenderer::new();
        r.start_page().unwrap();
        r.draw_text(&text("hello")).unwrap();
        r.end_page().unwrap();
        let json = r.to_json();
        assert!(json.contains("\"op\": \"text\""), "{json}");
        let back: Vec<DrawCall> = serde_json::from_str(&json).unwrap();
        assert_eq!(back, r.calls());
    }
}
