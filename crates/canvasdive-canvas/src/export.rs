//! Canvas Export
//!
//! Renders a canvas onto a fixed-size page. Sections are absolutely positioned
//! from the canvas layout via [`compute_geometry`](crate::grid::compute_geometry)
//! and emitted in `sorted_sections` order; item text is rendered as Markdown.

use pulldown_cmark::{html, Options, Parser};
use serde::Serialize;
use tracing::warn;

use crate::document::{Canvas, SectionItem};
use crate::grid::Geometry;
use crate::layout::template_or_default;

/// A4 landscape at 96 dpi
const DEFAULT_PAGE_WIDTH: u32 = 1123;
const DEFAULT_PAGE_HEIGHT: u32 = 794;

/// Exporter for fixed-page canvas documents
#[derive(Debug, Clone)]
pub struct CanvasExporter {
    page_width: u32,
    page_height: u32,
}

impl CanvasExporter {
    /// Create an exporter with the default page size
    #[must_use]
    pub fn new() -> Self {
        Self {
            page_width: DEFAULT_PAGE_WIDTH,
            page_height: DEFAULT_PAGE_HEIGHT,
        }
    }

    /// Set the page size in pixels
    #[must_use]
    pub fn with_page_size(mut self, width: u32, height: u32) -> Self {
        self.page_width = width;
        self.page_height = height;
        self
    }

    /// Render markdown to HTML
    #[must_use]
    pub fn render_markdown(&self, markdown: &str) -> String {
        let mut options = Options::empty();
        options.insert(Options::ENABLE_TABLES);
        options.insert(Options::ENABLE_STRIKETHROUGH);

        let parser = Parser::new_ext(markdown, options);
        let mut html_output = String::new();
        html::push_html(&mut html_output, parser);

        html_output
    }

    /// Render one item to HTML
    #[must_use]
    pub fn render_item(&self, item: &SectionItem) -> String {
        match item {
            SectionItem::Text { content, .. } => format!(
                r#"<div class="item item-text">{}</div>"#,
                self.render_markdown(content)
            ),
        }
    }

    /// Lay out and render a canvas.
    ///
    /// An invalid layout falls back to the synthesized default; sections without an
    /// area are left off the page.
    #[must_use]
    pub fn export(&self, canvas: &Canvas) -> ExportedDocument {
        let section_count = canvas.canvas_type.sections.len();
        let layout = template_or_default(&canvas.canvas_layout, section_count);

        let mut placements = Vec::new();
        let mut body = String::new();
        for section in canvas.sorted_sections() {
            let Some(index) = canvas.sections.iter().position(|s| s.name == section.name) else {
                continue;
            };
            let Some(geometry) = layout.geometry(index, 100.0) else {
                warn!(
                    canvas_id = %canvas.id,
                    section = %section.name,
                    "Section has no layout area, omitting from export"
                );
                continue;
            };

            let items: String = section.items.iter().map(|i| self.render_item(i)).collect();
            body.push_str(&format!(
                r#"<section class="canvas-section" style="position:absolute;left:{:.4}%;top:{:.4}%;width:{:.4}%;height:{:.4}%"><h2>{}</h2>{}</section>"#,
                geometry.left,
                geometry.top,
                geometry.width,
                geometry.height,
                html_escape(&section.name),
                items
            ));
            placements.push(SectionPlacement {
                section_name: section.name.clone(),
                geometry,
                item_count: section.items.len(),
            });
        }

        let html = format!(
            r#"<!DOCTYPE html><html><head><meta charset="utf-8"><title>{title}</title></head><body><main class="canvas-page" style="position:relative;width:{w}px;height:{h}px"><header><h1>{title}</h1><p>{description}</p></header>{body}</main></body></html>"#,
            title = html_escape(&canvas.name),
            description = html_escape(&canvas.description),
            w = self.page_width,
            h = self.page_height,
            body = body,
        );

        ExportedDocument {
            html,
            page_width: self.page_width,
            page_height: self.page_height,
            placements,
        }
    }
}

impl Default for CanvasExporter {
    fn default() -> Self {
        Self::new()
    }
}

/// Where one section landed on the page
#[derive(Debug, Clone, Serialize)]
pub struct SectionPlacement {
    /// Section name
    pub section_name: String,
    /// Placement in percent of the page
    pub geometry: Geometry,
    /// Number of items rendered
    pub item_count: usize,
}

/// Exported document output
#[derive(Debug, Clone, Serialize)]
pub struct ExportedDocument {
    /// Complete HTML page
    pub html: String,
    /// Page width in pixels
    pub page_width: u32,
    /// Page height in pixels
    pub page_height: u32,
    /// Placements in render order
    pub placements: Vec<SectionPlacement>,
}

/// Escape HTML special characters
fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}
