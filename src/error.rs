//! Error and warning types.
//!
//! [`ForgeError`] is reserved for the few failures that stop an export before
//! anything is drawn (unreadable or malformed input) or that the rendering
//! backend cannot recover from. Everything an individual element can get
//! wrong is a [`Warning`]: it is logged, collected, and the export carries on.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Hard failures.
#[derive(Debug, Error)]
pub enum ForgeError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid template: {0}")]
    InvalidTemplate(String),

    #[error("Render error: {0}")]
    Render(String),
}

impl From<&str> for ForgeError {
    fn from(s: &str) -> Self {
        ForgeError::Render(s.to_string())
    }
}

/// A recoverable problem encountered while compiling or drawing a template.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Warning {
    /// A block instance refers to a block id that the lookup does not know.
    MissingBlock { instance_id: String, block_id: String },
    /// Flattening stopped descending below this element.
    DepthLimit { element_id: String, depth: usize },
    /// Page height is not a positive number; nothing could be paginated.
    DegeneratePage { page_height_mm: f32 },
    /// An element could not be laid out and was skipped.
    DegenerateElement { element_id: String, reason: String },
    /// An element was placed even though it does not fit its page.
    ForcedPlacement { element_id: String, page_index: usize },
    /// The renderer rejected a primitive for this element.
    DrawFailed { element_id: String, message: String },
}

impl Warning {
    /// Emit this warning through the `log` facade.
    pub fn log(&self) {
        log::warn!("{self}");
    }
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Warning::MissingBlock {
                instance_id,
                block_id,
            } => write!(
                f,
                "block instance '{instance_id}' references unknown block '{block_id}'; skipped"
            ),
            Warning::DepthLimit { element_id, depth } => write!(
                f,
                "element '{element_id}' is nested {depth} levels deep; its children were not flattened"
            ),
            Warning::DegeneratePage { page_height_mm } => write!(
                f,
                "page height {page_height_mm}mm is not a positive number; elements placed unsplit on one page"
            ),
            Warning::DegenerateElement { element_id, reason } => {
                write!(f, "element '{element_id}' skipped: {reason}")
            }
            Warning::ForcedPlacement {
                element_id,
                page_index,
            } => write!(
                f,
                "element '{element_id}' does not fit page {page_index}; placed anyway"
            ),
            Warning::DrawFailed {
                element_id,
                message,
            } => write!(f, "drawing element '{element_id}' failed: {message}"),
        }
    }
}
