//! Pipeline – ties together resolution, sizing, pagination and rendering.
//!
//! ```text
//! Template ─▶ prepare (private copy) ─▶ layout::resolve ─▶ sizing::resize
//!          ─▶ pagination::paginate ─▶ PaginatedDocument ─▶ Renderer calls
//! ```
//!
//! All arithmetic up to and including pagination is in millimetres. The one
//! mm → pt conversion happens in [`render_document`], at the renderer
//! boundary.

use std::path::Path;

use crate::error::{ForgeError, Warning};
use crate::fonts::{FontManager, MeasurementProvider};
use crate::layout::{resolve_with_depth, PositionedElement, MAX_NESTING_DEPTH};
use crate::layout_config::{PageLayout, PageMode, PaginatedDocument};
use crate::model::{
    mm_to_pt, BackgroundType, BlockLookup, Element, ElementProps, SplitType, Template,
    TemplateItem, TextAlign, Variables, DEFAULT_DESIGN_ROW_COUNT,
};
use crate::pagination::{
    paginate_with, PaginationOptions, CONTINUOUS_ROLL_WIDTHS_MM, ROLL_BOTTOM_MARGIN_MM,
};
use crate::render::{
    ImageSpec, LineSpec, PdfRenderer, RectSpec, Renderer, TableSpec, TextSpec,
};
use crate::sizing::{resize_with, SizingOptions, REFLOW_TOLERANCE_MM};

/// Gap between a KV box's measured key text and the divider, in mm.
pub const KV_BOX_PADDING_MM: f32 = 1.5;
/// Inset of KV box key/value text from the box edge and divider, in mm.
pub const KV_BOX_TEXT_PADDING_MM: f32 = 0.5;
/// Header row fill for tables that show a header.
pub const TABLE_HEADER_FILL: &str = "#f0f0f0";

/// Configuration for the export pipeline.
#[derive(Debug, Clone, PartialEq)]
pub struct ExportConfig {
    /// Document title embedded in the PDF metadata (default: "plate-forge output").
    pub title: String,
    /// Row count assumed for tables that do not record one (default: 3).
    pub design_row_count: usize,
    /// Page widths that select continuous-roll mode (default: 58 and 80 mm).
    pub roll_widths_mm: Vec<f32>,
    /// Space below the content of a continuous roll (default: 10 mm).
    pub roll_bottom_margin_mm: f32,
    /// Deepest element nesting that is flattened (default: 64).
    pub max_nesting_depth: usize,
    /// Slack when deciding whether an element sits below a grower (default: 0.1 mm).
    pub reflow_tolerance_mm: f32,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            title: PaginatedDocument::default_title(),
            design_row_count: DEFAULT_DESIGN_ROW_COUNT,
            roll_widths_mm: CONTINUOUS_ROLL_WIDTHS_MM.to_vec(),
            roll_bottom_margin_mm: ROLL_BOTTOM_MARGIN_MM,
            max_nesting_depth: MAX_NESTING_DEPTH,
            reflow_tolerance_mm: REFLOW_TOLERANCE_MM,
        }
    }
}

impl ExportConfig {
    pub fn with_title(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Self::default()
        }
    }

    fn sizing_options(&self) -> SizingOptions {
        SizingOptions {
            design_row_count: self.design_row_count,
            reflow_tolerance_mm: self.reflow_tolerance_mm,
        }
    }

    fn pagination_options(&self) -> PaginationOptions {
        PaginationOptions {
            roll_widths_mm: self.roll_widths_mm.clone(),
            roll_bottom_margin_mm: self.roll_bottom_margin_mm,
            reflow_tolerance_mm: self.reflow_tolerance_mm,
        }
    }
}

/// Summary of a finished export.
#[derive(Debug, Clone, PartialEq)]
pub struct ExportReport {
    pub page_count: usize,
    pub page_width_mm: f32,
    pub page_height_mm: f32,
    pub mode: PageMode,
    pub warnings: Vec<Warning>,
}

/// Take the private working copy of `template` and pre-bind it.
///
/// Elements carrying a legacy `variable_name` prop receive that variable as
/// their primary content. Block instances get every global variable their
/// own data does not already define.
pub fn prepare(template: &Template, variables: &Variables) -> Template {
    let mut working = template.clone();
    for item in &mut working.items {
        match item {
            TemplateItem::Element(element) => apply_legacy_bindings(element, variables),
            TemplateItem::Instance(instance) => {
                for (key, value) in variables {
                    instance
                        .data
                        .entry(key.clone())
                        .or_insert_with(|| value.clone());
                }
            }
        }
    }
    working
}

fn apply_legacy_bindings(root: &mut Element, variables: &Variables) {
    let mut stack = vec![root];
    while let Some(element) = stack.pop() {
        let bound = element
            .props
            .legacy_variable()
            .and_then(|name| variables.get(name))
            .cloned();
        if let Some(value) = bound {
            element.props.set_primary_content(&value);
        }
        stack.extend(element.children.iter_mut());
    }
}

/// Resolve, size and paginate `template` without rendering.
pub fn compute_layout(
    template: &Template,
    blocks: &dyn BlockLookup,
    fonts: &dyn MeasurementProvider,
    variables: &Variables,
    config: &ExportConfig,
) -> PaginatedDocument {
    let working = prepare(template, variables);

    let resolved = resolve_with_depth(&working, blocks, variables, config.max_nesting_depth);
    let elements = resize_with(resolved.elements, &config.sizing_options());
    let pagination = paginate_with(
        elements,
        working.page_size.width,
        working.page_size.height,
        working.settings.page_top_margin_mm,
        fonts,
        &config.pagination_options(),
    );

    let mut warnings = resolved.warnings;
    warnings.extend(pagination.warnings);

    PaginatedDocument {
        title: config.title.clone(),
        page_width_mm: working.page_size.width,
        page_height_mm: pagination.page_height_mm,
        mode: pagination.mode,
        pages: pagination
            .pages
            .into_iter()
            .enumerate()
            .map(|(page_index, elements)| PageLayout {
                page_index,
                elements,
            })
            .collect(),
        warnings,
    }
}

/// Drive `renderer` through every page of `document`.
///
/// A primitive the renderer rejects is recorded as [`Warning::DrawFailed`]
/// and the rest of the page still renders. Only failures to set up, close or
/// save the document are returned as errors.
pub fn render_document(
    document: &PaginatedDocument,
    renderer: &mut dyn Renderer,
    fonts: &dyn MeasurementProvider,
    output: Option<&Path>,
) -> Result<ExportReport, ForgeError> {
    let mut warnings = document.warnings.clone();

    renderer.set_page_size(document.page_width_pt(), document.page_height_pt());
    renderer.initialize(output)?;
    for page in &document.pages {
        renderer.start_page()?;
        for element in &page.elements {
            if let Err(e) = draw_element(element, renderer, fonts) {
                let warning = Warning::DrawFailed {
                    element_id: element.id.clone(),
                    message: e.to_string(),
                };
                warning.log();
                warnings.push(warning);
            }
        }
        renderer.end_page()?;
    }
    renderer.save(output)?;

    log::debug!(
        "rendered {} page(s) with {} warning(s)",
        document.pages.len(),
        warnings.len()
    );
    Ok(ExportReport {
        page_count: document.pages.len(),
        page_width_mm: document.page_width_mm,
        page_height_mm: document.page_height_mm,
        mode: document.mode,
        warnings,
    })
}

/// Full pipeline: template → renderer calls.
///
/// The caller's `template` is never modified.
pub fn export(
    template: &Template,
    blocks: &dyn BlockLookup,
    renderer: &mut dyn Renderer,
    fonts: &dyn MeasurementProvider,
    variables: &Variables,
    config: &ExportConfig,
    output: Option<&Path>,
) -> Result<ExportReport, ForgeError> {
    let document = compute_layout(template, blocks, fonts, variables, config);
    render_document(&document, renderer, fonts, output)
}

/// Convenience: template → PDF bytes with the built-in fonts.
///
/// Returns `(pdf_bytes, paginated_document)`.
pub fn generate_pdf(
    template: &Template,
    blocks: &dyn BlockLookup,
    variables: &Variables,
    config: &ExportConfig,
) -> Result<(Vec<u8>, PaginatedDocument), ForgeError> {
    let fonts = FontManager::default();
    let mut renderer = PdfRenderer::with_fonts(&config.title, fonts.clone());
    let document = compute_layout(template, blocks, &fonts, variables, config);
    render_document(&document, &mut renderer, &fonts, None)?;
    let bytes = renderer
        .take_bytes()
        .ok_or_else(|| ForgeError::Render("renderer produced no output".into()))?;
    Ok((bytes, document))
}

/// Translate one element into renderer primitives.
fn draw_element(
    element: &PositionedElement,
    renderer: &mut dyn Renderer,
    fonts: &dyn MeasurementProvider,
) -> Result<(), ForgeError> {
    let x = mm_to_pt(element.x);
    let y = mm_to_pt(element.y);
    let w = mm_to_pt(element.width);
    let h = mm_to_pt(element.height);

    match &element.props {
        ElementProps::Rect(p) => {
            let stroke_color = p
                .show_outline
                .then(|| p.stroke_color.clone().unwrap_or_else(|| "black".into()));
            if stroke_color.is_some() || p.fill_color.is_some() {
                renderer.draw_rect(&RectSpec {
                    x,
                    y,
                    width: w,
                    height: h,
                    stroke_color,
                    fill_color: p.fill_color.clone(),
                    stroke_width: p.stroke_width,
                })?;
            }
        }
        ElementProps::Text(p) => renderer.draw_text(&TextSpec {
            x,
            y,
            text: p.text.clone(),
            font_family: p.font_family.clone(),
            font_size: p.font_size,
            color: p.color.clone(),
            align: p.text_align,
            width: Some(w),
            bold: p.font_bold,
            italic: p.font_italic,
            wrap: true,
            auto_scale: false,
        })?,
        ElementProps::TextBox(p) => renderer.draw_text(&TextSpec {
            x,
            y,
            text: p.text.clone(),
            font_family: p.font_family.clone(),
            font_size: p.font_size,
            color: p.color.clone(),
            align: p.text_align,
            width: Some(w),
            bold: p.font_bold,
            italic: p.font_italic,
            wrap: true,
            auto_scale: false,
        })?,
        ElementProps::Image(p) => renderer.draw_image(&ImageSpec {
            x,
            y,
            width: w,
            height: h,
            source: p.image_path.clone(),
        })?,
        ElementProps::Line(p) => {
            let (x2, y2) = element.line_end();
            renderer.draw_line(&LineSpec {
                x1: x,
                y1: y,
                x2: mm_to_pt(x2),
                y2: mm_to_pt(y2),
                color: p.stroke_color.clone(),
                stroke_width: p.stroke_width,
            })?;
        }
        ElementProps::KvBox(p) => {
            let split = match p.split_type {
                SplitType::Fixed => mm_to_pt(p.split_fixed),
                SplitType::Auto => {
                    let font = fonts.resolve_font(&p.font_family, p.font_bold, p.font_italic);
                    fonts.measure_width(&p.key_text, font, p.font_size) + mm_to_pt(KV_BOX_PADDING_MM)
                }
                SplitType::Ratio => w * p.split_ratio,
            };
            if p.show_outline {
                renderer.draw_rect(&RectSpec {
                    x,
                    y,
                    width: w,
                    height: h,
                    stroke_color: Some(p.border_color.clone()),
                    fill_color: None,
                    stroke_width: p.stroke_width,
                })?;
                renderer.draw_line(&LineSpec {
                    x1: x + split,
                    y1: y,
                    x2: x + split,
                    y2: y + h,
                    color: p.divider_color.clone(),
                    stroke_width: p.stroke_width,
                })?;
            }

            let pad = mm_to_pt(KV_BOX_TEXT_PADDING_MM);
            let v_offset = (h - p.font_size) / 2.0;
            let cell = |cx: f32, width: f32, text: &str| TextSpec {
                x: cx,
                y: y + v_offset,
                text: text.to_string(),
                font_family: p.font_family.clone(),
                font_size: p.font_size,
                color: p.color.clone(),
                align: TextAlign::Left,
                width: Some(width),
                bold: p.font_bold,
                italic: p.font_italic,
                wrap: true,
                auto_scale: true,
            };
            renderer.draw_text(&cell(x + pad, split - pad, &p.key_text))?;
            renderer.draw_text(&cell(x + split + pad, w - split - pad, &p.text))?;
        }
        ElementProps::Container(p) => {
            let fill_color = (p.bg_type == BackgroundType::Solid).then(|| p.fill_color.clone());
            let stroke_color = p.show_outline.then(|| p.stroke_color.clone());
            if fill_color.is_some() || stroke_color.is_some() {
                renderer.draw_rect(&RectSpec {
                    x,
                    y,
                    width: w,
                    height: h,
                    stroke_color,
                    fill_color,
                    stroke_width: p.stroke_width,
                })?;
            }
        }
        ElementProps::Table(p) => {
            if !p.data.is_empty() {
                let row_height = mm_to_pt(p.effective_row_height(element.height));
                renderer.draw_table(&TableSpec {
                    x,
                    y,
                    width: w,
                    height: h,
                    rows: p.data.clone(),
                    col_widths: p
                        .col_widths
                        .as_ref()
                        .map(|cols| cols.iter().map(|c| mm_to_pt(*c)).collect()),
                    row_heights: Some(vec![row_height; p.data.len()]),
                    font_size: p.font_size,
                    stroke_color: p.stroke_color.clone(),
                    header_fill: p.show_header.then(|| {
                        p.header_bg_color
                            .clone()
                            .unwrap_or_else(|| TABLE_HEADER_FILL.to_string())
                    }),
                    theme: p.theme,
                })?;
            }
        }
    }
    Ok(())
}
