//! Layout Catalog
//!
//! Named grid templates keyed by section count, the deterministic fallback
//! layout, and the interactive editor used to resize and repaint a template.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::Result;
use crate::grid::{AreaSpec, CellMatrix, GridTemplate, DEFAULT_TRACK};

/// Upper bound for column and row counts
pub const MAX_TRACKS: usize = 6;

/// A named grid template
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamedLayout {
    /// Stable identifier
    pub id: String,
    /// Display name
    pub name: String,
    /// The template itself
    pub template: GridTemplate,
}

impl NamedLayout {
    /// Create a named layout
    #[must_use]
    pub fn new(id: impl Into<String>, name: impl Into<String>, template: GridTemplate) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            template,
        }
    }

    /// Number of sections this layout places
    #[must_use]
    pub fn section_count(&self) -> usize {
        self.template.areas.len()
    }
}

/// Collection of known layouts
#[derive(Debug, Clone, Default)]
pub struct LayoutCatalog {
    layouts: Vec<NamedLayout>,
}

impl LayoutCatalog {
    /// Create a catalog from a list of layouts. Invalid layouts are dropped.
    #[must_use]
    pub fn new(layouts: Vec<NamedLayout>) -> Self {
        let layouts = layouts
            .into_iter()
            .filter(|l| match l.template.validate(l.section_count()) {
                Ok(()) => true,
                Err(e) => {
                    debug!(layout = %l.id, error = %e, "Skipping invalid layout");
                    false
                }
            })
            .collect();
        Self { layouts }
    }

    /// All layouts in catalog order
    #[must_use]
    pub fn layouts(&self) -> &[NamedLayout] {
        &self.layouts
    }

    /// Layouts that place exactly `section_count` sections.
    ///
    /// An empty result is not an error; callers fall back to [`synthesize_default`].
    #[must_use]
    pub fn templates_for(&self, section_count: usize) -> Vec<&NamedLayout> {
        self.layouts
            .iter()
            .filter(|l| l.section_count() == section_count)
            .collect()
    }

    /// Look up a layout by id
    #[must_use]
    pub fn get(&self, id: &str) -> Option<&NamedLayout> {
        self.layouts.iter().find(|l| l.id == id)
    }

    /// First matching template, or the synthesized default
    #[must_use]
    pub fn select(&self, section_count: usize) -> GridTemplate {
        self.templates_for(section_count)
            .first()
            .map(|l| l.template.clone())
            .unwrap_or_else(|| synthesize_default(section_count))
    }
}

/// Deterministic fallback layout.
///
/// Columns are `ceil(sqrt(n))` capped at [`MAX_TRACKS`], rows follow; areas are filled
/// row-major one cell each and trailing cells stay empty. Sizes here read columns × rows:
/// five sections give a 3×2 grid of 3 columns and 2 rows. Cell coordinates are always
/// `(row, col)`.
#[must_use]
pub fn synthesize_default(section_count: usize) -> GridTemplate {
    if section_count == 0 {
        return GridTemplate::uniform(1, 1, Vec::new());
    }

    let mut columns = 1;
    while columns * columns < section_count && columns < MAX_TRACKS {
        columns += 1;
    }
    let rows = section_count.div_ceil(columns);

    let areas = (0..section_count)
        .map(|i| Some(AreaSpec::cell(i / columns, i % columns)))
        .collect();
    GridTemplate::uniform(columns, rows, areas)
}

/// Return `template` when it is valid for `section_count`, otherwise the synthesized default
#[must_use]
pub fn template_or_default(template: &GridTemplate, section_count: usize) -> GridTemplate {
    template.clone().or_default(section_count)
}

impl GridTemplate {
    /// Keep this template if valid for `section_count`, else synthesize one
    #[must_use]
    pub fn or_default(self, section_count: usize) -> GridTemplate {
        match self.validate(section_count) {
            Ok(()) => self,
            Err(e) => {
                debug!(error = %e, section_count, "Falling back to synthesized layout");
                synthesize_default(section_count)
            }
        }
    }
}

/// Interactive grid editor.
///
/// Every operation applies immediately; [`LayoutEditor::to_template`] re-encodes the
/// matrix into area specs for storage or export. Intermediate states may be
/// non-rectangular while a multi-cell area is being painted; only the encoded
/// template must satisfy the layout invariants.
#[derive(Debug, Clone)]
pub struct LayoutEditor {
    column_tracks: Vec<String>,
    row_tracks: Vec<String>,
    matrix: CellMatrix,
    area_count: usize,
    selected: Option<usize>,
}

impl LayoutEditor {
    /// Start editing an existing template
    #[must_use]
    pub fn new(template: &GridTemplate) -> Self {
        Self {
            column_tracks: template.column_tracks.clone(),
            row_tracks: template.row_tracks.clone(),
            matrix: template.to_matrix(),
            area_count: template.areas.len(),
            selected: None,
        }
    }

    /// Current matrix
    #[must_use]
    pub fn matrix(&self) -> &CellMatrix {
        &self.matrix
    }

    /// Currently selected section index
    #[must_use]
    pub fn selected(&self) -> Option<usize> {
        self.selected
    }

    /// Number of columns
    #[must_use]
    pub fn columns(&self) -> usize {
        self.column_tracks.len()
    }

    /// Number of rows
    #[must_use]
    pub fn rows(&self) -> usize {
        self.row_tracks.len()
    }

    /// Change the column count, clamped to `[1, MAX_TRACKS]`
    pub fn set_columns(&mut self, columns: usize) -> &mut Self {
        let columns = columns.clamp(1, MAX_TRACKS);
        self.column_tracks.resize(columns, DEFAULT_TRACK.to_string());
        self.matrix = self.matrix.resized(self.rows(), columns);
        self
    }

    /// Change the row count, clamped to `[1, MAX_TRACKS]`
    pub fn set_rows(&mut self, rows: usize) -> &mut Self {
        let rows = rows.clamp(1, MAX_TRACKS);
        self.row_tracks.resize(rows, DEFAULT_TRACK.to_string());
        self.matrix = self.matrix.resized(rows, self.columns());
        self
    }

    /// Select the section subsequent clicks paint. Out-of-range indices clear the selection.
    pub fn select_section(&mut self, index: usize) -> &mut Self {
        self.selected = (index < self.area_count).then_some(index);
        self
    }

    /// Clear the current selection
    pub fn deselect(&mut self) -> &mut Self {
        self.selected = None;
        self
    }

    /// Paint the selected section into a cell. Other cells are never touched.
    ///
    /// Returns false when nothing is selected or the cell is out of range.
    pub fn paint(&mut self, row: usize, col: usize) -> bool {
        match self.selected {
            Some(label) => self.matrix.set(row, col, Some(label)),
            None => false,
        }
    }

    /// Paint by row-major cell index, as delivered by a click on the rendered grid
    pub fn click(&mut self, cell_index: usize) -> bool {
        let columns = self.columns();
        if columns == 0 || cell_index >= columns * self.rows() {
            return false;
        }
        self.paint(cell_index / columns, cell_index % columns)
    }

    /// Reset a cell to empty
    pub fn erase(&mut self, row: usize, col: usize) -> bool {
        self.matrix.set(row, col, None)
    }

    /// Encode the current state as a template.
    ///
    /// Fails with `InvalidLayout` when a section's painted cells are not a rectangle.
    /// A template returned here always passes [`GridTemplate::validate`].
    pub fn to_template(&self) -> Result<GridTemplate> {
        let template = GridTemplate::from_matrix(
            self.column_tracks.clone(),
            self.row_tracks.clone(),
            &self.matrix,
            self.area_count,
        )?;
        template.validate(self.area_count)?;
        Ok(template)
    }
}
