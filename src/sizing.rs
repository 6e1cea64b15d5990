//! Dynamic sizing – recomputes content-driven heights and shifts whatever sits
//! below a resized element.
//!
//! Tables are rescaled here: every row is treated as having the uniform
//! height implied by the design-time size, regardless of cell content. Text
//! boxes only get their design-time `base_height` recorded; their real height
//! depends on where they land on a page and is settled by the paginator.

use crate::layout::PositionedElement;
use crate::model::{ElementProps, TableProps, DEFAULT_DESIGN_ROW_COUNT};

/// Elements whose top is within this distance above a grower's bottom still
/// count as "below" it.
pub const REFLOW_TOLERANCE_MM: f32 = 0.1;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SizingOptions {
    /// Row count assumed for tables that do not record one.
    pub design_row_count: usize,
    pub reflow_tolerance_mm: f32,
}

impl Default for SizingOptions {
    fn default() -> Self {
        Self {
            design_row_count: DEFAULT_DESIGN_ROW_COUNT,
            reflow_tolerance_mm: REFLOW_TOLERANCE_MM,
        }
    }
}

/// A height change to propagate: the element's index, its bottom edge before
/// the change, and the change itself.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct Growth {
    pub index: usize,
    pub original_bottom: f32,
    pub delta: f32,
}

/// Rescale a table to its current row count. Returns the new height, or
/// `None` when the table has no rows (left as authored).
fn size_table(table: &mut TableProps, height: f32, design_row_count: usize) -> Option<f32> {
    let rows = table.row_count();
    if rows == 0 {
        return None;
    }
    let base = *table.base_height.get_or_insert(height);
    let design_rows = (*table.num_rows_editor.get_or_insert(design_row_count)).max(1);
    let row_height = base / design_rows as f32;
    table.row_height = Some(row_height);
    Some(row_height * rows as f32)
}

/// Recompute heights and reflow with default options.
pub fn resize(elements: Vec<PositionedElement>) -> Vec<PositionedElement> {
    resize_with(elements, &SizingOptions::default())
}

pub fn resize_with(
    mut elements: Vec<PositionedElement>,
    options: &SizingOptions,
) -> Vec<PositionedElement> {
    let mut growths = Vec::new();

    for (index, element) in elements.iter_mut().enumerate() {
        let original_height = element.height;
        match &mut element.props {
            ElementProps::Table(table) => {
                if let Some(h) = size_table(table, original_height, options.design_row_count) {
                    element.height = h;
                }
            }
            ElementProps::TextBox(text_box) => {
                text_box.base_height.get_or_insert(original_height);
            }
            _ => {}
        }

        let delta = element.height - original_height;
        if delta != 0.0 {
            growths.push(Growth {
                index,
                original_bottom: element.y + original_height,
                delta,
            });
        }
    }

    reflow(&mut elements, &growths, options.reflow_tolerance_mm);
    elements
}

/// Move everything below each grower by its delta. Element tops are read
/// once, before any of them moves, so the order of `growths` is irrelevant.
pub(crate) fn reflow(elements: &mut [PositionedElement], growths: &[Growth], tolerance: f32) {
    if growths.is_empty() {
        return;
    }
    let tops: Vec<f32> = elements.iter().map(|e| e.y).collect();
    let offsets = reflow_offsets(&tops, growths, tolerance);
    for (element, dy) in elements.iter_mut().zip(offsets) {
        if dy != 0.0 {
            element.translate(0.0, dy);
        }
    }
    log::debug!("reflowed {} element(s) after {} height change(s)", elements.len(), growths.len());
}

/// Accumulate every grower's delta into the pending offset of each element
/// below it. `tops` is the unmutated snapshot; nothing moves until all
/// growers have been considered.
fn reflow_offsets(tops: &[f32], growths: &[Growth], tolerance: f32) -> Vec<f32> {
    let mut offsets = vec![0.0f32; tops.len()];
    for growth in growths {
        for (i, top) in tops.iter().enumerate() {
            if i != growth.index && *top >= growth.original_bottom - tolerance {
                offsets[i] += growth.delta;
            }
        }
    }
    offsets
}

/// Shift every element whose top is at or below `grower_original_bottom` by
/// `delta`. `elements` should not contain the grower itself.
pub fn apply_reflow(elements: &mut [PositionedElement], grower_original_bottom: f32, delta: f32) {
    apply_reflow_with(elements, grower_original_bottom, delta, REFLOW_TOLERANCE_MM);
}

/// [`apply_reflow`] with an explicit tolerance, as in [`SizingOptions`].
pub fn apply_reflow_with(
    elements: &mut [PositionedElement],
    grower_original_bottom: f32,
    delta: f32,
    tolerance: f32,
) {
    for element in elements.iter_mut() {
        if element.y >= grower_original_bottom - tolerance {
            element.translate(0.0, delta);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Element, ElementProps, TableProps};

    fn place(id: &str, props: ElementProps, y: f32, h: f32) -> PositionedElement {
        let e = Element::new(id, props).at(0.0, y).sized(100.0, h);
        PositionedElement::from_element(&e, 0.0, y)
    }

    fn rows(n: usize) -> Vec<Vec<String>> {
        (0..n).map(|i| vec![format!("r{i}")]).collect()
    }

    fn table_props(e: &PositionedElement) -> &TableProps {
        match &e.props {
            ElementProps::Table(t) => t,
            other => panic!("expected table, got {other:?}"),
        }
    }

    #[test]
    fn table_scales_with_row_count() {
        let out = resize(vec![place("t", ElementProps::table(rows(5)), 0.0, 30.0)]);
        assert_eq!(out[0].height, 50.0);
        let t = table_props(&out[0]);
        assert_eq!(t.row_height, Some(10.0));
        assert_eq!(t.base_height, Some(30.0));
        assert_eq!(t.num_rows_editor, Some(3));
    }

    #[test]
    fn recorded_design_rows_take_precedence() {
        let props = ElementProps::Table(TableProps {
            data: rows(2),
            num_rows_editor: Some(4),
            ..TableProps::default()
        });
        let out = resize(vec![place("t", props, 0.0, 40.0)]);
        assert_eq!(out[0].height, 20.0);
    }

    #[test]
    fn empty_table_is_left_unchanged() {
        let out = resize(vec![
            place("t", ElementProps::table(vec![]), 0.0, 30.0),
            place("below", ElementProps::rect(), 30.0, 5.0),
        ]);
        assert_eq!(out[0].height, 30.0);
        assert_eq!(out[1].y, 30.0);
    }

    #[test]
    fn text_box_records_base_height_without_growing() {
        let long = "word ".repeat(200);
        let out = resize(vec![place("tb", ElementProps::text_box(long), 0.0, 12.0)]);
        assert_eq!(out[0].height, 12.0);
        match &out[0].props {
            ElementProps::TextBox(tb) => assert_eq!(tb.base_height, Some(12.0)),
            other => panic!("expected text box, got {other:?}"),
        }
    }

    #[test]
    fn reflow_shifts_siblings_below_once() {
        // 4 rows of 10mm: 30 -> 40, delta +10
        let out = resize(vec![
            place("t", ElementProps::table(rows(4)), 0.0, 30.0),
            place("b", ElementProps::rect(), 30.0, 5.0),
            place("side", ElementProps::rect(), 10.0, 5.0),
        ]);
        assert_eq!(out[1].y, 40.0);
        assert_eq!(out[2].y, 10.0, "elements beside the grower stay put");
    }

    #[test]
    fn overlapping_growers_shift_each_element_exactly_once_per_grower() {
        let first = place("t1", ElementProps::table(rows(4)), 0.0, 30.0); // +10
        let second = place("t2", ElementProps::table(rows(5)), 30.0, 30.0); // +20
        let tail = place("tail", ElementProps::rect(), 60.0, 5.0);

        let forward = resize(vec![first.clone(), second.clone(), tail.clone()]);
        let backward = resize(vec![tail, second, first]);

        let y_of = |v: &[PositionedElement], id: &str| v.iter().find(|e| e.id == id).map(|e| e.y);
        assert_eq!(y_of(&forward, "t2"), Some(40.0));
        assert_eq!(y_of(&forward, "tail"), Some(90.0));
        assert_eq!(y_of(&backward, "t2"), Some(40.0));
        assert_eq!(y_of(&backward, "tail"), Some(90.0));
    }

    #[test]
    fn shrinking_table_pulls_siblings_up() {
        let out = resize(vec![
            place("t", ElementProps::table(rows(1)), 0.0, 30.0),
            place("b", ElementProps::rect(), 30.0, 5.0),
        ]);
        assert_eq!(out[0].height, 10.0);
        assert_eq!(out[1].y, 10.0);
    }

    #[test]
    fn standalone_reflow_respects_tolerance() {
        let mut siblings = vec![
            place("b", ElementProps::rect(), 10.0, 5.0),
            place("near", ElementProps::rect(), 9.95, 5.0),
            place("above", ElementProps::rect(), 2.0, 5.0),
        ];
        apply_reflow(&mut siblings, 10.0, 4.0);
        assert_eq!(siblings[0].y, 14.0);
        assert!((siblings[1].y - 13.95).abs() < 1e-4);
        assert_eq!(siblings[2].y, 2.0);
    }

    #[test]
    fn standalone_reflow_uses_given_tolerance() {
        let mut siblings = vec![
            place("near", ElementProps::rect(), 9.5, 5.0),
            place("far", ElementProps::rect(), 8.0, 5.0),
        ];
        apply_reflow_with(&mut siblings, 10.0, 4.0, 1.0);
        assert_eq!(siblings[0].y, 13.5);
        assert_eq!(siblings[1].y, 8.0);

        let mut strict = vec![place("near", ElementProps::rect(), 9.95, 5.0)];
        apply_reflow_with(&mut strict, 10.0, 4.0, 0.0);
        assert_eq!(strict[0].y, 9.95);
    }

    #[test]
    fn resize_and_standalone_reflow_agree_on_tolerance() {
        let options = SizingOptions {
            reflow_tolerance_mm: 2.0,
            ..SizingOptions::default()
        };
        // 4 rows of 10mm: 30 -> 40
        let out = resize_with(
            vec![
                place("t", ElementProps::table(rows(4)), 0.0, 30.0),
                place("b", ElementProps::rect(), 28.5, 5.0),
            ],
            &options,
        );
        let mut standalone = vec![place("b", ElementProps::rect(), 28.5, 5.0)];
        apply_reflow_with(&mut standalone, 30.0, 10.0, options.reflow_tolerance_mm);
        assert_eq!(out[1].y, 38.5);
        assert_eq!(standalone[0].y, out[1].y);
    }
}
