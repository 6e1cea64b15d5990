//! Layout config – the intermediate representation between pagination and
//! rendering. This is the "frozen" structure that encodes exactly what goes on
//! each page, in page-local millimetres.

use serde::{Deserialize, Serialize};

use crate::error::{ForgeError, Warning};
use crate::layout::PositionedElement;
use crate::model::mm_to_pt;

/// How the page height was chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PageMode {
    /// Fixed page height; content is split across pages.
    Fixed,
    /// Receipt-style roll: one page as tall as its content.
    ContinuousRoll,
}

/// A complete paginated document ready for rendering.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaginatedDocument {
    /// Document title embedded in the PDF metadata.
    #[serde(default = "PaginatedDocument::default_title")]
    pub title: String,
    pub page_width_mm: f32,
    /// Height of every page; for a continuous roll, the computed height.
    pub page_height_mm: f32,
    pub mode: PageMode,
    /// Ordered list of pages.
    pub pages: Vec<PageLayout>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<Warning>,
}

/// One page of content, in paint order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageLayout {
    pub page_index: usize,
    pub elements: Vec<PositionedElement>,
}

impl PaginatedDocument {
    pub(crate) fn default_title() -> String {
        "plate-forge output".to_string()
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    pub fn page_width_pt(&self) -> f32 {
        mm_to_pt(self.page_width_mm)
    }

    pub fn page_height_pt(&self) -> f32 {
        mm_to_pt(self.page_height_mm)
    }

    /// Serialise to JSON.
    pub fn to_json(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_default()
    }

    /// Deserialise from JSON.
    pub fn from_json(json: &str) -> Result<Self, ForgeError> {
        Ok(serde_json::from_str(json)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Element, ElementProps};

    #[test]
    fn json_round_trip_keeps_pages_and_mode() {
        let e = Element::new("t", ElementProps::text("hi")).at(5.0, 6.0).sized(20.0, 5.0);
        let doc = PaginatedDocument {
            title: "x".into(),
            page_width_mm: 80.0,
            page_height_mm: 42.0,
            mode: PageMode::ContinuousRoll,
            pages: vec![PageLayout {
                page_index: 0,
                elements: vec![PositionedElement::from_element(&e, 5.0, 6.0)],
            }],
            warnings: vec![],
        };
        let json = doc.to_json();
        assert!(json.contains("\"continuous_roll\""), "{json}");
        assert!(json.contains("\"kind\": \"text\""), "{json}");
        let back = PaginatedDocument::from_json(&json).unwrap();
        assert_eq!(back, doc);
    }

    #[test]
    fn missing_title_gets_default() {
        let doc = PaginatedDocument::from_json(
            r#"{"page_width_mm": 210, "page_height_mm": 297, "mode": "fixed", "pages": []}"#,
        )
        .unwrap();
        assert_eq!(doc.title, "plate-forge output");
        assert!((doc.page_width_pt() - 595.2765).abs() < 0.01);
    }
}
