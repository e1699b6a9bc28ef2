//! Canvasdive Canvas - Canvas Model and Grid Layout
//!
//! This crate provides the canvas data model for Canvasdive:
//! - Grid: area-string codec, geometry and grid templates
//! - Layout: named layout catalog, fallback synthesis and the interactive editor
//! - Document: canvas types, sections, items and parent/child links
//! - Builtin: canvas types and layouts shipped out of the box
//! - Export: fixed-page HTML rendering of a canvas
//! - Store: persistence boundary and SQLite implementation
//! - Error: Error types for canvas operations
//!
//! ## Usage
//!
//! ```ignore
//! use canvasdive_canvas::{builtin_canvas_types, Canvas, CanvasExporter};
//!
//! let ty = builtin_canvas_types().remove(0);
//! let mut canvas = Canvas::new("Coffee shop", ty);
//! canvas.add_item("Key Partners", "Local roastery")?;
//!
//! let page = CanvasExporter::new().export(&canvas);
//! ```
//!
//! ## Area strings
//!
//! Each section's area is serialized as `"rowStart / colStart / rowEnd / colEnd"`,
//! 1-based with exclusive end lines, e.g. `"1 / 1 / 3 / 2"` for a cell spanning
//! two rows of the first column.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod builtin;
pub mod document;
pub mod error;
pub mod export;
pub mod grid;
pub mod layout;
pub mod store;

// Re-export main types
pub use builtin::{builtin_canvas_types, builtin_layouts};
pub use document::{
    Canvas, CanvasType, ChildLink, ParentLink, Section, SectionDefinition, SectionItem,
};
pub use error::{Error, Result};
pub use export::{CanvasExporter, ExportedDocument, SectionPlacement};
pub use grid::{
    compute_geometry, parse_area_string, to_area_string, AreaSpec, CellMatrix, Geometry,
    GridTemplate, EMPTY_CELL,
};
pub use layout::{
    synthesize_default, template_or_default, LayoutCatalog, LayoutEditor, NamedLayout, MAX_TRACKS,
};
pub use store::{CanvasRepository, CanvasSummary, DocumentMeta, SqliteCanvasStore};
