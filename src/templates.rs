//! Sample templates for testing and demonstration.
//!
//! Each template is stored in the persisted JSON format and exercises a
//! different part of the pipeline.

/// A4 invoice: header block instance, bound key/value boxes, a line-item
/// table and a terms text box below it.
pub fn invoice_template() -> &'static str {
    r##"{
  "id": "invoice",
  "name": "Invoice",
  "version": "0.0.2",
  "pageSize": { "width": 210, "height": 297 },
  "settings": { "pageTopMarginMm": 15 },
  "items": [
    { "id": "header", "blockId": "company-header", "x": 10, "y": 10,
      "data": { "number": "2024-001" } },
    { "id": "customer", "kind": "kv_box", "x": 10, "y": 45, "width": 90, "height": 8,
      "props": { "key_text": "Customer:", "split_type": "auto" },
      "bindings": [ { "variableName": "customer", "targetProperty": "text" } ] },
    { "id": "due", "kind": "kv_box", "x": 110, "y": 45, "width": 90, "height": 8,
      "props": { "key_text": "Due:", "split_type": "fixed", "split_fixed": 15 },
      "bindings": [ { "variableName": "due_date", "targetProperty": "text" } ] },
    { "id": "items", "kind": "table", "x": 10, "y": 60, "width": 190, "height": 24,
      "props": {
        "theme": "Striped",
        "col_widths": [100, 30, 30, 30],
        "num_rows_editor": 3,
        "data": [["Item", "Qty", "Price", "Total"], ["Sample", "1", "0.00", "0.00"]]
      },
      "bindings": [ { "variableName": "line_items", "targetProperty": "data" } ] },
    { "id": "rule", "kind": "line", "x": 10, "y": 86, "width": 190, "height": 0,
      "props": { "x2": 200, "y2": 86, "stroke_width": 0.5 } },
    { "id": "total", "kind": "text", "x": 140, "y": 88, "width": 60, "height": 8,
      "props": { "text": "Total: 0.00", "font_bold": true, "text_align": "right" },
      "bindings": [ { "variableName": "total", "targetProperty": "text" } ] },
    { "id": "terms", "kind": "text_box", "x": 10, "y": 100, "width": 190, "height": 20,
      "props": { "text": "Payment is due within 30 days.", "font_size": 9 },
      "bindings": [ { "variableName": "terms", "targetProperty": "text" } ] }
  ]
}"##
}

/// Block definitions referenced by [`invoice_template`].
pub fn invoice_blocks() -> &'static str {
    r##"[
  {
    "id": "company-header",
    "name": "Company header",
    "width": 190,
    "height": 30,
    "elements": [
      { "id": "banner", "kind": "container", "x": 0, "y": 0, "width": 190, "height": 30,
        "props": { "bg_type": "solid", "fill_color": "#1a365d" },
        "children": [
          { "id": "title", "kind": "text", "x": 5, "y": 5, "width": 120, "height": 10,
            "props": { "text": "INVOICE {{ number }}", "font_size": 20, "font_bold": true, "color": "#ffffff" } },
          { "id": "company", "kind": "text", "x": 5, "y": 18, "width": 120, "height": 6,
            "props": { "text": "{{company}}", "color": "#ffffff" } }
        ] }
    ]
  }
]"##
}

/// Variables for [`invoice_template`].
pub fn invoice_variables() -> &'static str {
    r##"{
  "company": "Acme Corp",
  "customer": "Client Inc",
  "due_date": "2024-02-01",
  "line_items": [
    ["Item", "Qty", "Price", "Total"],
    ["Web Development", "40", "150.00", "6000.00"],
    ["Design Services", "20", "125.00", "2500.00"],
    ["Hosting (Annual)", "1", "500.00", "500.00"]
  ],
  "total": "Total: 9000.00",
  "terms": "Payment is due within 30 days. Late payments incur a 2% monthly fee.\nThank you for your business."
}"##
}

/// 80mm receipt: a continuous roll whose height follows its content.
pub fn receipt_template() -> &'static str {
    r##"{
  "id": "receipt",
  "name": "Receipt",
  "version": "0.0.2",
  "pageSize": { "width": 80, "height": 200 },
  "items": [
    { "id": "shop", "kind": "text", "x": 5, "y": 5, "width": 70, "height": 8,
      "props": { "text": "CORNER SHOP", "font_size": 14, "font_bold": true, "text_align": "center" } },
    { "id": "lines", "kind": "table", "x": 5, "y": 16, "width": 70, "height": 15,
      "props": {
        "theme": "Simple",
        "font_size": 8,
        "data": [["Item", "Price"], ["Coffee", "3.00"], ["Bagel", "2.50"]]
      },
      "bindings": [ { "variableName": "lines", "targetProperty": "data" } ] },
    { "id": "footer", "kind": "text_box", "x": 5, "y": 34, "width": 70, "height": 6,
      "props": { "text": "Thank you!", "font_size": 8, "font_family": "Courier" },
      "bindings": [ { "variableName": "footer", "targetProperty": "text" } ] }
  ]
}"##
}

/// Long report whose table and text box split across several A4 pages.
pub fn report_template() -> &'static str {
    r##"{
  "id": "report",
  "name": "Quarterly report",
  "version": "0.0.2",
  "pageSize": { "width": 210, "height": 297 },
  "settings": { "pageTopMarginMm": 20 },
  "items": [
    { "id": "heading", "kind": "text", "x": 15, "y": 15, "width": 180, "height": 12,
      "props": { "text": "Quarterly Report", "font_size": 22, "font_bold": true, "font_family": "Times" } },
    { "id": "summary", "kind": "text_box", "x": 15, "y": 30, "width": 180, "height": 40,
      "props": { "text": "Summary goes here.", "font_size": 11 },
      "bindings": [ { "variableName": "summary", "targetProperty": "text" } ] },
    { "id": "figures", "kind": "table", "x": 15, "y": 75, "width": 180, "height": 30,
      "props": { "theme": "Grid", "font_size": 9, "data": [] },
      "bindings": [ { "variableName": "figures", "targetProperty": "data" } ] },
    { "id": "sign-off", "kind": "text", "x": 15, "y": 110, "width": 180, "height": 8,
      "props": { "text": "End of report", "text_align": "center", "font_italic": true } }
  ]
}"##
}

/// Smallest useful template: one text element.
pub fn minimal_template() -> &'static str {
    r##"{
  "name": "Minimal",
  "version": "0.0.2",
  "pageSize": { "width": 210, "height": 297 },
  "items": [
    { "kind": "text", "x": 20, "y": 20, "width": 100, "height": 10,
      "props": { "text": "Hello, World!" } }
  ]
}"##
}

/// One of every element kind.
pub fn all_elements_template() -> &'static str {
    r##"{
  "id": "all-elements",
  "name": "All elements",
  "version": "0.0.2",
  "pageSize": { "width": 210, "height": 297 },
  "items": [
    { "id": "frame", "kind": "container", "x": 10, "y": 10, "width": 190, "height": 120,
      "props": { "show_outline": true, "stroke_color": "#888888" },
      "children": [
        { "id": "box", "kind": "rect", "x": 5, "y": 5, "width": 30, "height": 20,
          "props": { "fill_color": "#e2e8f0", "show_outline": true } },
        { "id": "caption", "kind": "text", "x": 40, "y": 5, "width": 100, "height": 8,
          "props": { "text": "Caption", "color": "navy" } },
        { "id": "body", "kind": "text_box", "x": 40, "y": 15, "width": 140, "height": 12,
          "props": { "text": "A text box that wraps across several lines when the text is long enough." } },
        { "id": "divider", "kind": "line", "x": 5, "y": 30, "width": 175, "height": 0,
          "props": { "x2": 180, "y2": 30, "stroke_color": "gray" } },
        { "id": "pair", "kind": "kv_box", "x": 5, "y": 35, "width": 80, "height": 8,
          "props": { "key_text": "Key:", "text": "Value" } },
        { "id": "grid", "kind": "table", "x": 5, "y": 50, "width": 175, "height": 30,
          "props": { "theme": "Dark", "data": [["A", "B"], ["1", "2"], ["3", "4"]] } },
        { "id": "logo", "kind": "image", "x": 5, "y": 85, "width": 20, "height": 20,
          "props": { "image_path": "logo.png" } }
      ] }
  ]
}"##
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::{blocks_from_json, template_from_json};
    use crate::model::Variables;

    #[test]
    fn templates_load() {
        for json in [
            invoice_template(),
            receipt_template(),
            report_template(),
            minimal_template(),
            all_elements_template(),
        ] {
            let template = template_from_json(json);
            assert!(template.is_ok(), "{template:?}");
        }
    }

    #[test]
    fn invoice_companions_load() {
        let blocks = blocks_from_json(invoice_blocks()).unwrap();
        assert!(blocks.contains_key("company-header"));
        let vars: Variables = serde_json::from_str(invoice_variables()).unwrap();
        assert!(vars.contains_key("line_items"));
    }
}
