//! Pagination – partitions a flat element list into pages.
//!
//! Fixed-page mode keeps every element's absolute Y: an element belongs to
//! page `floor(y / page_height)` at local `y mod page_height`, so independent
//! side-by-side columns keep their positions. Tables and text boxes that
//! cross the bottom edge are split; the remainder is re-injected at the top
//! margin of the next page and processed again, so one element may span any
//! number of pages. Everything else moves whole to the next page.
//!
//! Continuous-roll mode (receipt printers) produces one page exactly as tall
//! as its content and never splits. Text boxes grown to their content push
//! down whatever sits below them.

use crate::error::Warning;
use crate::fonts::{wrap_styled, MeasurementProvider};
use crate::layout::PositionedElement;
use crate::layout_config::PageMode;
use crate::model::{ElementProps, TableProps, TextBoxProps};
use crate::sizing::{reflow, Growth, REFLOW_TOLERANCE_MM};

/// Page widths (mm) that select continuous-roll mode.
pub const CONTINUOUS_ROLL_WIDTHS_MM: [f32; 2] = [58.0, 80.0];

/// Blank space added below the lowest element of a continuous roll.
pub const ROLL_BOTTOM_MARGIN_MM: f32 = 10.0;

/// Slack for float comparisons against page edges.
const EPSILON: f32 = 1e-4;

#[derive(Debug, Clone, PartialEq)]
pub struct PaginationOptions {
    pub roll_widths_mm: Vec<f32>,
    pub roll_bottom_margin_mm: f32,
    /// Reflow slack used when roll-mode text boxes grow.
    pub reflow_tolerance_mm: f32,
}

impl Default for PaginationOptions {
    fn default() -> Self {
        Self {
            roll_widths_mm: CONTINUOUS_ROLL_WIDTHS_MM.to_vec(),
            roll_bottom_margin_mm: ROLL_BOTTOM_MARGIN_MM,
            reflow_tolerance_mm: REFLOW_TOLERANCE_MM,
        }
    }
}

impl PaginationOptions {
    pub fn is_continuous_roll(&self, page_width: f32) -> bool {
        self.roll_widths_mm
            .iter()
            .any(|w| (w - page_width).abs() < EPSILON)
    }
}

/// Paginator output. Element `y` values are page-local.
#[derive(Debug, Clone)]
pub struct Pagination {
    pub mode: PageMode,
    /// Effective page height; computed from content in roll mode.
    pub page_height_mm: f32,
    pub pages: Vec<Vec<PositionedElement>>,
    pub warnings: Vec<Warning>,
}

/// Paginate with the default roll presets.
pub fn paginate(
    elements: Vec<PositionedElement>,
    page_width: f32,
    page_height: f32,
    top_margin: f32,
    fonts: &dyn MeasurementProvider,
) -> Pagination {
    paginate_with(
        elements,
        page_width,
        page_height,
        top_margin,
        fonts,
        &PaginationOptions::default(),
    )
}

pub fn paginate_with(
    elements: Vec<PositionedElement>,
    page_width: f32,
    page_height: f32,
    top_margin: f32,
    fonts: &dyn MeasurementProvider,
    options: &PaginationOptions,
) -> Pagination {
    let pagination = if options.is_continuous_roll(page_width) {
        paginate_roll(elements, fonts, options)
    } else {
        Paginator::new(page_height, top_margin, fonts).run(elements)
    };
    log::debug!(
        "paginated into {} page(s) of {:.2}mm",
        pagination.pages.len(),
        pagination.page_height_mm
    );
    pagination
}

/// Wrapped lines of a text box and its line height in millimetres.
fn text_box_lines(
    text_box: &TextBoxProps,
    width: f32,
    fonts: &dyn MeasurementProvider,
) -> (Vec<String>, f32) {
    let lines = wrap_styled(&text_box.text, &text_box.style(), width, fonts);
    (lines, text_box.line_height_mm())
}

fn paginate_roll(
    mut elements: Vec<PositionedElement>,
    fonts: &dyn MeasurementProvider,
    options: &PaginationOptions,
) -> Pagination {
    let mut growths = Vec::new();
    for (index, element) in elements.iter_mut().enumerate() {
        if let ElementProps::TextBox(text_box) = &element.props {
            let (lines, line_height) = text_box_lines(text_box, element.width, fonts);
            let content = lines.len() as f32 * line_height;
            let base = text_box.base_height.unwrap_or(element.height);
            let height = base.max(content);
            if height != element.height {
                growths.push(Growth {
                    index,
                    original_bottom: element.bottom(),
                    delta: height - element.height,
                });
                element.height = height;
            }
        }
    }
    reflow(&mut elements, &growths, options.reflow_tolerance_mm);

    let content_bottom = elements
        .iter()
        .map(PositionedElement::bottom)
        .fold(0.0f32, f32::max);

    Pagination {
        mode: PageMode::ContinuousRoll,
        page_height_mm: content_bottom + options.roll_bottom_margin_mm,
        pages: vec![elements],
        warnings: Vec::new(),
    }
}

/// What to do with an element that crosses the bottom of its page.
enum Step {
    /// Put it on the page as it is.
    Place(PositionedElement),
    /// Put the first part on this page and keep processing the remainder.
    Split(PositionedElement, PositionedElement),
    /// Move it whole to the top of the next page.
    Defer(PositionedElement),
    /// Drop it.
    Skip,
}

struct Paginator<'a> {
    page_height: f32,
    top_margin: f32,
    fonts: &'a dyn MeasurementProvider,
    pages: Vec<Vec<PositionedElement>>,
    warnings: Vec<Warning>,
}

impl<'a> Paginator<'a> {
    fn new(page_height: f32, top_margin: f32, fonts: &'a dyn MeasurementProvider) -> Self {
        // A negative margin would send deferred content back to its own page.
        let top_margin = if top_margin.is_finite() && top_margin >= 0.0 {
            top_margin
        } else {
            log::warn!("page top margin {top_margin}mm is unusable; using 0mm");
            0.0
        };
        Self {
            page_height,
            top_margin,
            fonts,
            pages: vec![Vec::new()],
            warnings: Vec::new(),
        }
    }

    fn warn(&mut self, warning: Warning) {
        warning.log();
        self.warnings.push(warning);
    }

    fn run(mut self, elements: Vec<PositionedElement>) -> Pagination {
        if !self.page_height.is_finite() || self.page_height <= 0.0 {
            self.warn(Warning::DegeneratePage {
                page_height_mm: self.page_height,
            });
            self.pages = vec![elements];
        } else {
            for element in elements {
                self.process(element);
            }
        }
        Pagination {
            mode: PageMode::Fixed,
            page_height_mm: self.page_height,
            pages: self.pages,
            warnings: self.warnings,
        }
    }

    fn page_of(&self, y: f32) -> usize {
        (y / self.page_height).floor().max(0.0) as usize
    }

    /// Lay out one element, and whatever remains of it after each split or
    /// deferral. A remainder never goes back to a page before `first_page`,
    /// so every pass either places something or reaches a fresh page top.
    fn process(&mut self, element: PositionedElement) {
        if !element.y.is_finite() || !element.height.is_finite() {
            self.warn(Warning::DegenerateElement {
                element_id: element.id.clone(),
                reason: format!("position {}mm with height {}mm cannot be paginated", element.y, element.height),
            });
            return;
        }

        let mut pending = Some((element, 0usize));
        while let Some((element, first_page)) = pending.take() {
            let page_index = self.page_of(element.y).max(first_page);
            let local_y = element.y - page_index as f32 * self.page_height;
            let available = self.page_height - local_y;
            let at_top = local_y <= self.top_margin + EPSILON;

            let step = match &element.props {
                ElementProps::Table(table) => {
                    self.step_table(element.clone(), table, page_index, available, at_top)
                }
                ElementProps::TextBox(text_box) => {
                    self.step_text_box(element.clone(), text_box, page_index, available, at_top)
                }
                _ if element.height <= available + EPSILON => Step::Place(element),
                _ if at_top => {
                    self.warn(Warning::ForcedPlacement {
                        element_id: element.id.clone(),
                        page_index,
                    });
                    Step::Place(element)
                }
                _ => Step::Defer(element),
            };

            match step {
                Step::Place(element) => self.place(element, page_index, local_y),
                Step::Split(first, mut rest) => {
                    self.place(first, page_index, local_y);
                    rest.translate(0.0, self.next_page_top(page_index) - rest.y);
                    pending = Some((rest, page_index + 1));
                }
                Step::Defer(mut element) => {
                    element.translate(0.0, self.next_page_top(page_index) - element.y);
                    pending = Some((element, page_index + 1));
                }
                Step::Skip => {}
            }
        }
    }

    fn next_page_top(&self, page_index: usize) -> f32 {
        (page_index + 1) as f32 * self.page_height + self.top_margin
    }

    fn place(&mut self, mut element: PositionedElement, page_index: usize, local_y: f32) {
        if self.pages.len() <= page_index {
            self.pages.resize_with(page_index + 1, Vec::new);
        }
        element.translate(0.0, local_y - element.y);
        self.pages[page_index].push(element);
    }

    /// How many units of `unit` height fit in `available`, forcing one when
    /// none do but the element already starts at the top of its page.
    fn units_that_fit(
        &mut self,
        element: &PositionedElement,
        page_index: usize,
        unit: f32,
        available: f32,
        at_top: bool,
    ) -> usize {
        let fit = ((available + EPSILON) / unit).floor().max(0.0) as usize;
        if fit == 0 && at_top {
            self.warn(Warning::ForcedPlacement {
                element_id: element.id.clone(),
                page_index,
            });
            return 1;
        }
        fit
    }

    fn step_table(
        &mut self,
        mut element: PositionedElement,
        table: &TableProps,
        page_index: usize,
        available: f32,
        at_top: bool,
    ) -> Step {
        if element.height <= available + EPSILON {
            return Step::Place(element);
        }
        let rows = table.row_count();
        let row_height = table.effective_row_height(element.height);
        if rows == 0 || row_height <= 0.0 {
            self.warn(Warning::DegenerateElement {
                element_id: element.id.clone(),
                reason: format!("table with {rows} rows of height {row_height}mm cannot be split"),
            });
            return Step::Skip;
        }

        let fit = self.units_that_fit(&element, page_index, row_height, available, at_top);
        if fit >= rows {
            return Step::Place(element);
        }
        if fit == 0 {
            return Step::Defer(element);
        }

        let mut rest = element.clone();
        if let ElementProps::Table(first_table) = &mut element.props {
            first_table.data.truncate(fit);
            first_table.row_height = Some(row_height);
        }
        element.height = fit as f32 * row_height;

        if let ElementProps::Table(rest_table) = &mut rest.props {
            rest_table.data.drain(..fit);
            rest_table.row_height = Some(row_height);
            rest_table.show_header = false;
        }
        rest.height = (rows - fit) as f32 * row_height;
        Step::Split(element, rest)
    }

    fn step_text_box(
        &mut self,
        mut element: PositionedElement,
        text_box: &TextBoxProps,
        page_index: usize,
        available: f32,
        at_top: bool,
    ) -> Step {
        let (lines, line_height) = text_box_lines(text_box, element.width, self.fonts);
        if line_height <= 0.0 {
            self.warn(Warning::DegenerateElement {
                element_id: element.id.clone(),
                reason: format!("text box line height {line_height}mm is not positive"),
            });
            return Step::Skip;
        }

        let content = lines.len() as f32 * line_height;
        let base = text_box.base_height.unwrap_or(element.height);
        if content <= available + EPSILON {
            element.height = content.max(base.min(available));
            return Step::Place(element);
        }

        let fit = self.units_that_fit(&element, page_index, line_height, available, at_top);
        if fit >= lines.len() {
            element.height = content;
            return Step::Place(element);
        }
        if fit == 0 {
            return Step::Defer(element);
        }

        let mut rest = element.clone();
        if let ElementProps::TextBox(first) = &mut element.props {
            first.text = lines[..fit].join("\n");
        }
        element.height = fit as f32 * line_height;

        if let ElementProps::TextBox(remaining) = &mut rest.props {
            remaining.text = lines[fit..].join("\n");
            // The design floor applies to the first part only.
            remaining.base_height = Some(0.0);
        }
        rest.height = (lines.len() - fit) as f32 * line_height;
        Step::Split(element, rest)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fonts::{wrap_styled, FontManager};
    use crate::model::{Element, ElementProps, TableProps, TextBoxProps};

    fn place(id: &str, props: ElementProps, y: f32, w: f32, h: f32) -> PositionedElement {
        let e = Element::new(id, props).at(0.0, y).sized(w, h);
        PositionedElement::from_element(&e, 0.0, y)
    }

    fn table(id: &str, rows: usize, y: f32, row_height: f32) -> PositionedElement {
        let props = ElementProps::Table(TableProps {
            data: (0..rows).map(|i| vec![format!("row {i}")]).collect(),
            row_height: Some(row_height),
            ..TableProps::default()
        });
        place(id, props, y, 100.0, rows as f32 * row_height)
    }

    fn table_rows(e: &PositionedElement) -> Vec<String> {
        match &e.props {
            ElementProps::Table(t) => t.data.iter().map(|r| r[0].clone()).collect(),
            other => panic!("expected table, got {other:?}"),
        }
    }

    fn text_box_text(e: &PositionedElement) -> &str {
        match &e.props {
            ElementProps::TextBox(tb) => &tb.text,
            other => panic!("expected text box, got {other:?}"),
        }
    }

    #[test]
    fn elements_that_fit_keep_local_position() {
        let fonts = FontManager::default();
        let out = paginate(
            vec![
                place("a", ElementProps::rect(), 10.0, 50.0, 20.0),
                place("b", ElementProps::rect(), 310.0, 50.0, 20.0),
            ],
            210.0,
            297.0,
            0.0,
            &fonts,
        );
        assert_eq!(out.mode, PageMode::Fixed);
        assert_eq!(out.pages.len(), 2);
        assert_eq!(out.pages[0][0].y, 10.0);
        assert!((out.pages[1][0].y - 13.0).abs() < 1e-3);
    }

    #[test]
    fn table_split_keeps_whole_rows() {
        let fonts = FontManager::default();
        // 25mm available on page 0: two 10mm rows fit.
        let out = paginate(vec![table("t", 5, 75.0, 10.0)], 210.0, 100.0, 0.0, &fonts);
        assert_eq!(out.pages.len(), 2);

        let first = &out.pages[0][0];
        assert_eq!(table_rows(first), vec!["row 0", "row 1"]);
        assert_eq!(first.height, 20.0);
        assert_eq!(first.y, 75.0);

        let rest = &out.pages[1][0];
        assert_eq!(table_rows(rest), vec!["row 2", "row 3", "row 4"]);
        assert_eq!(rest.height, 30.0);
        assert_eq!(rest.y, 0.0);
        match &rest.props {
            ElementProps::Table(t) => assert!(!t.show_header),
            _ => unreachable!(),
        }
    }

    #[test]
    fn long_table_spans_several_pages_below_top_margin() {
        let fonts = FontManager::default();
        let out = paginate(vec![table("t", 25, 0.0, 10.0)], 210.0, 100.0, 15.0, &fonts);
        let counts: Vec<usize> = out.pages.iter().map(|p| table_rows(&p[0]).len()).collect();
        assert_eq!(counts, vec![10, 8, 7]);
        assert_eq!(out.pages[1][0].y, 15.0);
        assert_eq!(out.pages[2][0].y, 15.0);
    }

    #[test]
    fn table_with_no_room_moves_whole() {
        let fonts = FontManager::default();
        let out = paginate(vec![table("t", 3, 95.0, 10.0)], 210.0, 100.0, 0.0, &fonts);
        assert!(out.pages[0].is_empty());
        assert_eq!(table_rows(&out.pages[1][0]).len(), 3);
    }

    #[test]
    fn non_splittable_elements_move_to_next_page() {
        let fonts = FontManager::default();
        let out = paginate(
            vec![place("img", ElementProps::rect(), 90.0, 20.0, 20.0)],
            210.0,
            100.0,
            5.0,
            &fonts,
        );
        assert!(out.pages[0].is_empty());
        assert_eq!(out.pages[1][0].y, 5.0);
    }

    #[test]
    fn oversized_elements_are_forced_instead_of_looping() {
        let fonts = FontManager::default();
        let out = paginate(
            vec![
                place("huge", ElementProps::rect(), 50.0, 20.0, 500.0),
                table("tall-row", 2, 0.0, 150.0),
            ],
            210.0,
            100.0,
            0.0,
            &fonts,
        );
        assert_eq!(out.pages[1][0].id, "huge");
        assert!(out
            .warnings
            .iter()
            .any(|w| matches!(w, Warning::ForcedPlacement { element_id, .. } if element_id == "huge")));
        assert!(out
            .warnings
            .iter()
            .any(|w| matches!(w, Warning::ForcedPlacement { element_id, .. } if element_id == "tall-row")));
    }

    #[test]
    fn text_box_split_reconstructs_wrapped_lines() {
        let fonts = FontManager::default();
        let text = "The quick brown fox jumps over the lazy dog.\n\nPack my box with five dozen liquor jugs. "
            .repeat(12);
        let props = ElementProps::TextBox(TextBoxProps {
            text: text.clone(),
            font_size: 10.0,
            ..TextBoxProps::default()
        });
        let element = place("tb", props.clone(), 40.0, 60.0, 10.0);
        let ElementProps::TextBox(original) = &props else {
            unreachable!()
        };
        let expected = wrap_styled(&text, &original.style(), 60.0, &fonts);

        let out = paginate(vec![element], 210.0, 100.0, 8.0, &fonts);
        assert!(out.pages.len() > 1, "expected the text box to split");

        let mut rebuilt = Vec::new();
        for page in &out.pages {
            for part in page {
                let ElementProps::TextBox(tb) = &part.props else {
                    panic!("unexpected element {part:?}");
                };
                rebuilt.extend(wrap_styled(&tb.text, &tb.style(), 60.0, &fonts));
                assert!(part.y + part.height <= 100.0 + 1e-3, "part overflows its page");
            }
        }
        assert_eq!(rebuilt, expected);
    }

    #[test]
    fn text_box_split_preserves_content_across_widths_texts_and_offsets() {
        let fonts = FontManager::default();
        let texts = [
            format!("\n\n{}\n\n", "Leading and trailing blank lines around wrapped prose. ".repeat(20)),
            "runs   of     spaces    between\twords   ".repeat(40),
            "windows\r\nline\r\nendings here and there\r\n".repeat(30),
            format!("{} then a short tail of words.\n", "x".repeat(400)).repeat(6),
            "\n".repeat(60),
        ];
        // 5mm is narrower than the longest word; 0 disables wrapping.
        let widths = [60.0, 25.0, 5.0, 0.0];
        let starts = [0.0, 37.5, 88.0, 230.0];

        for text in &texts {
            for &width in &widths {
                for &start in &starts {
                    let props = ElementProps::TextBox(TextBoxProps {
                        text: text.clone(),
                        font_size: 10.0,
                        ..TextBoxProps::default()
                    });
                    let ElementProps::TextBox(original) = &props else {
                        unreachable!()
                    };
                    let expected = wrap_styled(text, &original.style(), width, &fonts);
                    let out = paginate(vec![place("tb", props.clone(), start, width, 10.0)], 210.0, 100.0, 8.0, &fonts);

                    let mut rebuilt = Vec::new();
                    let mut part_lines = 0;
                    for part in out.pages.iter().flatten() {
                        let ElementProps::TextBox(tb) = &part.props else {
                            panic!("unexpected element {part:?}");
                        };
                        let lines = wrap_styled(&tb.text, &tb.style(), width, &fonts);
                        part_lines += lines.len();
                        rebuilt.extend(lines);
                    }
                    let case = format!("width {width}, start {start}, text {:?}", &text[..text.len().min(30)]);
                    assert_eq!(part_lines, expected.len(), "line count changed for {case}");
                    assert_eq!(rebuilt, expected, "content changed for {case}");
                }
            }
        }
    }

    #[test]
    fn negative_top_margin_is_treated_as_zero() {
        let fonts = FontManager::default();
        let out = paginate(
            vec![
                place("r", ElementProps::rect(), 90.0, 20.0, 20.0),
                table("t", 3, 95.0, 10.0),
            ],
            210.0,
            100.0,
            -10.0,
            &fonts,
        );
        assert!(out.pages[0].is_empty());
        assert_eq!(out.pages[1][0].id, "r");
        assert_eq!(out.pages[1][0].y, 0.0);
        assert_eq!(table_rows(&out.pages[1][1]).len(), 3);
        assert_eq!(out.pages[1][1].y, 0.0);
    }

    #[test]
    fn non_finite_geometry_degrades_instead_of_looping() {
        let fonts = FontManager::default();
        let out = paginate(vec![table("t", 5, 90.0, 10.0)], 210.0, f32::NAN, 0.0, &fonts);
        assert_eq!(out.pages.len(), 1);
        assert!(matches!(out.warnings.as_slice(), [Warning::DegeneratePage { .. }]));

        let out = paginate(
            vec![
                place("lost", ElementProps::rect(), f32::NAN, 10.0, 10.0),
                place("kept", ElementProps::rect(), 10.0, 10.0, 10.0),
            ],
            210.0,
            100.0,
            f32::NAN,
            &fonts,
        );
        assert_eq!(out.pages[0].len(), 1);
        assert_eq!(out.pages[0][0].id, "kept");
        assert!(matches!(out.warnings.as_slice(), [Warning::DegenerateElement { element_id, .. }] if element_id == "lost"));
    }

    #[test]
    fn fitting_text_box_height_follows_content_with_base_floor() {
        let fonts = FontManager::default();
        let props = ElementProps::TextBox(TextBoxProps {
            text: "one\ntwo\nthree".into(),
            base_height: Some(3.0),
            ..TextBoxProps::default()
        });
        let out = paginate(vec![place("tb", props, 0.0, 80.0, 3.0)], 210.0, 297.0, 0.0, &fonts);
        let tb = &out.pages[0][0];
        // 3 lines × 12pt × 1.2 = 43.2pt
        assert!((tb.height - 43.2 / 2.83465).abs() < 1e-3);
        assert_eq!(text_box_text(tb), "one\ntwo\nthree");
    }

    #[test]
    fn roll_widths_produce_a_single_growing_page() {
        let fonts = FontManager::default();
        for width in [58.0, 80.0] {
            let out = paginate(
                vec![table("t", 100, 0.0, 10.0), place("r", ElementProps::rect(), 1200.0, 10.0, 5.0)],
                width,
                297.0,
                0.0,
                &fonts,
            );
            assert_eq!(out.mode, PageMode::ContinuousRoll);
            assert_eq!(out.pages.len(), 1);
            assert_eq!(table_rows(&out.pages[0][0]).len(), 100);
            assert_eq!(out.page_height_mm, 1215.0);
        }
    }

    #[test]
    fn roll_text_boxes_grow_to_content() {
        let fonts = FontManager::default();
        let props = ElementProps::TextBox(TextBoxProps {
            text: "a\nb\nc\nd".into(),
            base_height: Some(2.0),
            ..TextBoxProps::default()
        });
        let out = paginate(vec![place("tb", props, 0.0, 70.0, 2.0)], 80.0, 297.0, 0.0, &fonts);
        let expected = 4.0 * 12.0 * 1.2 / 2.83465;
        assert!((out.pages[0][0].height - expected).abs() < 1e-3);
        assert!((out.page_height_mm - (expected + 10.0)).abs() < 1e-3);
    }

    #[test]
    fn roll_text_box_growth_pushes_content_below() {
        let fonts = FontManager::default();
        let props = ElementProps::TextBox(TextBoxProps {
            text: (1..=8).map(|i| format!("item {i}")).collect::<Vec<_>>().join("\n"),
            base_height: Some(5.0),
            ..TextBoxProps::default()
        });
        let out = paginate(
            vec![
                place("tb", props, 0.0, 70.0, 5.0),
                place("total", ElementProps::rect(), 5.0, 70.0, 5.0),
                place("logo", ElementProps::rect(), 0.0, 5.0, 3.0),
            ],
            80.0,
            297.0,
            0.0,
            &fonts,
        );
        let content = 8.0 * 12.0 * 1.2 / 2.83465;
        let page = &out.pages[0];
        assert!((page[0].height - content).abs() < 1e-3);
        assert!((page[1].y - content).abs() < 1e-3, "total overlaps the text box");
        assert_eq!(page[2].y, 0.0, "elements beside the text box stay put");
        assert!((out.page_height_mm - (content + 5.0 + 10.0)).abs() < 1e-3);
    }

    #[test]
    fn non_positive_page_height_places_everything_unsplit() {
        let fonts = FontManager::default();
        let out = paginate(vec![table("t", 5, 0.0, 10.0)], 210.0, 0.0, 0.0, &fonts);
        assert_eq!(out.pages.len(), 1);
        assert_eq!(table_rows(&out.pages[0][0]).len(), 5);
        assert!(matches!(out.warnings.as_slice(), [Warning::DegeneratePage { .. }]));
    }

    #[test]
    fn empty_table_needing_split_is_skipped() {
        let fonts = FontManager::default();
        let out = paginate(
            vec![place("t", ElementProps::table(vec![]), 90.0, 50.0, 30.0)],
            210.0,
            100.0,
            0.0,
            &fonts,
        );
        assert!(out.pages.iter().all(Vec::is_empty));
        assert!(matches!(out.warnings.as_slice(), [Warning::DegenerateElement { .. }]));
    }
}
