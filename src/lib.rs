//! # plate-forge – block-based document templates → paginated PDF
//!
//! This crate compiles a document template (free-form elements plus
//! instances of reusable blocks, bound to variable data) into absolutely
//! positioned drawing primitives, one list per page. The pipeline stages
//! are:
//!
//! 1. **Load** – parse, migrate and validate persisted JSON ([`io`])
//! 2. **Resolve** – flatten the element/block hierarchy and apply bindings ([`layout`])
//! 3. **Size** – recompute table heights and reflow what sits below ([`sizing`])
//! 4. **Paginate** – split tables and text boxes across pages ([`pagination`])
//! 5. **Render** – drive a [`render::Renderer`] backend, e.g. PDF via printpdf
//!
//! [`pipeline`] ties the stages together. A C-compatible FFI surface is
//! exposed via the [`ffi`] module.

pub mod error;
pub mod ffi;
pub mod fonts;
pub mod io;
pub mod layout;
pub mod layout_config;
pub mod model;
pub mod pagination;
pub mod pipeline;
pub mod render;
pub mod sizing;
pub mod templates;

// Re-exports for convenience
pub use error::{ForgeError, Warning};
pub use model::{Block, BlockInstance, Element, ElementProps, Template, Variables};
pub use pipeline::{compute_layout, export, generate_pdf, ExportConfig, ExportReport};
