//! Grid Area Codec
//!
//! This module parses and serializes the compact grid-area string format
//! (`"rowStart / colStart / rowEnd / colEnd"`, 1-based, end-exclusive) and
//! computes relative geometry for rendering and export.
//!
//! A layout has two interchangeable representations:
//! - [`GridTemplate`]: track definitions plus one optional [`AreaSpec`] per section
//! - [`CellMatrix`]: a rows × columns matrix where each cell holds the index of the
//!   section occupying it, or nothing

use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::warn;

use crate::error::{Error, Result};

/// Sentinel rendered for cells no section occupies
pub const EMPTY_CELL: &str = ".";

/// Track size token used for tracks created by the layout synthesizer and editor
pub const DEFAULT_TRACK: &str = "1fr";

/// A rectangular grid area, 1-based with exclusive end lines
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct AreaSpec {
    row_start: usize,
    col_start: usize,
    row_end: usize,
    col_end: usize,
}

impl AreaSpec {
    /// Create an area from grid lines, validating the span invariants
    pub fn new(row_start: usize, col_start: usize, row_end: usize, col_end: usize) -> Result<Self> {
        let spec = Self {
            row_start,
            col_start,
            row_end,
            col_end,
        };
        if row_start == 0 || col_start == 0 {
            return Err(Error::area_parse(
                spec.to_string(),
                "grid lines are 1-based",
            ));
        }
        if row_end <= row_start {
            return Err(Error::area_parse(
                spec.to_string(),
                "rowEnd must be greater than rowStart",
            ));
        }
        if col_end <= col_start {
            return Err(Error::area_parse(
                spec.to_string(),
                "colEnd must be greater than colStart",
            ));
        }
        Ok(spec)
    }

    /// A single cell at 0-based editor coordinates
    #[must_use]
    pub fn cell(row: usize, col: usize) -> Self {
        Self {
            row_start: row + 1,
            col_start: col + 1,
            row_end: row + 2,
            col_end: col + 2,
        }
    }

    /// Build an area from a 0-based origin and a span of at least one cell each way
    #[must_use]
    pub fn spanning(row: usize, col: usize, height: usize, width: usize) -> Self {
        Self {
            row_start: row + 1,
            col_start: col + 1,
            row_end: row + 1 + height.max(1),
            col_end: col + 1 + width.max(1),
        }
    }

    /// First row line (1-based)
    #[must_use]
    pub fn row_start(&self) -> usize {
        self.row_start
    }

    /// First column line (1-based)
    #[must_use]
    pub fn col_start(&self) -> usize {
        self.col_start
    }

    /// End row line (exclusive)
    #[must_use]
    pub fn row_end(&self) -> usize {
        self.row_end
    }

    /// End column line (exclusive)
    #[must_use]
    pub fn col_end(&self) -> usize {
        self.col_end
    }

    /// 0-based row of the top-left cell
    #[must_use]
    pub fn row(&self) -> usize {
        self.row_start - 1
    }

    /// 0-based column of the top-left cell
    #[must_use]
    pub fn col(&self) -> usize {
        self.col_start - 1
    }

    /// Number of columns spanned
    #[must_use]
    pub fn width(&self) -> usize {
        self.col_end - self.col_start
    }

    /// Number of rows spanned
    #[must_use]
    pub fn height(&self) -> usize {
        self.row_end - self.row_start
    }

    /// Whether the 0-based cell lies inside this area
    #[must_use]
    pub fn contains(&self, row: usize, col: usize) -> bool {
        (self.row()..self.row() + self.height()).contains(&row)
            && (self.col()..self.col() + self.width()).contains(&col)
    }

    /// Whether the area lies within a grid of the given size
    #[must_use]
    pub fn fits(&self, columns: usize, rows: usize) -> bool {
        self.col_end - 1 <= columns && self.row_end - 1 <= rows
    }

    /// Whether two areas share at least one cell
    #[must_use]
    pub fn overlaps(&self, other: &AreaSpec) -> bool {
        self.row_start < other.row_end
            && other.row_start < self.row_end
            && self.col_start < other.col_end
            && other.col_start < self.col_end
    }

    /// Iterate the 0-based cells covered by this area, row-major
    pub fn cells(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        (self.row()..self.row() + self.height())
            .flat_map(move |r| (self.col()..self.col() + self.width()).map(move |c| (r, c)))
    }
}

/// Parse a `"rowStart / colStart / rowEnd / colEnd"` string
pub fn parse_area_string(input: &str) -> Result<AreaSpec> {
    let tokens: Vec<&str> = input.split('/').map(str::trim).collect();
    if tokens.len() != 4 {
        return Err(Error::area_parse(
            input,
            format!("expected 4 '/'-separated values, found {}", tokens.len()),
        ));
    }

    let mut lines = [0usize; 4];
    for (slot, token) in lines.iter_mut().zip(&tokens) {
        *slot = token
            .parse()
            .map_err(|_| Error::area_parse(input, format!("'{}' is not a grid line", token)))?;
    }

    AreaSpec::new(lines[0], lines[1], lines[2], lines[3])
        .map_err(|e| match e {
            Error::AreaParse { reason, .. } => Error::area_parse(input, reason),
            other => other,
        })
}

/// Serialize an area in canonical form
#[must_use]
pub fn to_area_string(spec: &AreaSpec) -> String {
    spec.to_string()
}

impl fmt::Display for AreaSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} / {} / {} / {}",
            self.row_start, self.col_start, self.row_end, self.col_end
        )
    }
}

impl FromStr for AreaSpec {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        parse_area_string(s)
    }
}

impl TryFrom<String> for AreaSpec {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        parse_area_string(&value)
    }
}

impl From<AreaSpec> for String {
    fn from(spec: AreaSpec) -> Self {
        spec.to_string()
    }
}

/// Placement rectangle expressed as percentages of a bounding box
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Geometry {
    /// Offset from the left edge
    pub left: f64,
    /// Offset from the top edge
    pub top: f64,
    /// Width
    pub width: f64,
    /// Height
    pub height: f64,
}

/// Compute where an area sits inside a grid of `columns` × `rows` equal tracks.
///
/// `container_percent` is the extent of the bounding box (100.0 for a full page).
/// The editor and the exporter both place sections through this function.
#[must_use]
pub fn compute_geometry(
    spec: &AreaSpec,
    columns: usize,
    rows: usize,
    container_percent: f64,
) -> Geometry {
    if columns == 0 || rows == 0 {
        return Geometry {
            left: 0.0,
            top: 0.0,
            width: 0.0,
            height: 0.0,
        };
    }
    let col_unit = container_percent / columns as f64;
    let row_unit = container_percent / rows as f64;
    Geometry {
        left: spec.col() as f64 * col_unit,
        top: spec.row() as f64 * row_unit,
        width: spec.width() as f64 * col_unit,
        height: spec.height() as f64 * row_unit,
    }
}

/// Track definitions plus one area per section, in section placement order.
///
/// An area of `None` is a section still pending layout assignment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GridTemplate {
    /// Column track sizes (e.g. `"1fr"`, `"auto"`)
    pub column_tracks: Vec<String>,
    /// Row track sizes
    pub row_tracks: Vec<String>,
    /// One entry per section
    pub areas: Vec<Option<AreaSpec>>,
}

/// Stored form of a template, with areas still as raw strings
#[derive(Deserialize)]
struct StoredTemplate {
    column_tracks: Vec<String>,
    row_tracks: Vec<String>,
    areas: Vec<Option<String>>,
}

impl GridTemplate {
    /// Deserialize a stored template without failing on malformed area strings.
    ///
    /// If any area does not parse, all areas are discarded. The result then fails
    /// [`GridTemplate::validate`] for a non-empty canvas, and callers recover through
    /// [`GridTemplate::or_default`].
    pub fn deserialize_lenient<'de, D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let stored = StoredTemplate::deserialize(deserializer)?;
        let areas = stored
            .areas
            .iter()
            .map(|a| a.as_deref().map(parse_area_string).transpose())
            .collect::<Result<Vec<_>>>()
            .unwrap_or_else(|e| {
                warn!(error = %e, "Discarding stored layout with malformed area");
                Vec::new()
            });
        Ok(Self {
            column_tracks: stored.column_tracks,
            row_tracks: stored.row_tracks,
            areas,
        })
    }

    /// Create a template of equal `1fr` tracks
    #[must_use]
    pub fn uniform(columns: usize, rows: usize, areas: Vec<Option<AreaSpec>>) -> Self {
        Self {
            column_tracks: vec![DEFAULT_TRACK.to_string(); columns],
            row_tracks: vec![DEFAULT_TRACK.to_string(); rows],
            areas,
        }
    }

    /// Build a template from area strings, failing on the first malformed one
    pub fn from_area_strings<S: AsRef<str>>(
        column_tracks: Vec<String>,
        row_tracks: Vec<String>,
        areas: &[S],
    ) -> Result<Self> {
        let areas = areas
            .iter()
            .map(|s| parse_area_string(s.as_ref()).map(Some))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self {
            column_tracks,
            row_tracks,
            areas,
        })
    }

    /// Number of column tracks
    #[must_use]
    pub fn columns(&self) -> usize {
        self.column_tracks.len()
    }

    /// Number of row tracks
    #[must_use]
    pub fn rows(&self) -> usize {
        self.row_tracks.len()
    }

    /// Check the layout invariants against the number of sections it must place
    pub fn validate(&self, section_count: usize) -> Result<()> {
        if self.areas.len() != section_count {
            return Err(Error::invalid_layout(format!(
                "{} areas for {} sections",
                self.areas.len(),
                section_count
            )));
        }
        if self.columns() == 0 || self.rows() == 0 {
            return Err(Error::invalid_layout("grid has no tracks"));
        }

        let placed: Vec<(usize, &AreaSpec)> = self
            .areas
            .iter()
            .enumerate()
            .filter_map(|(i, a)| a.as_ref().map(|a| (i, a)))
            .collect();

        for (i, area) in &placed {
            if !area.fits(self.columns(), self.rows()) {
                return Err(Error::invalid_layout(format!(
                    "area {} ({}) exceeds {}x{} grid",
                    i,
                    area,
                    self.columns(),
                    self.rows()
                )));
            }
        }

        for (n, (i, a)) in placed.iter().enumerate() {
            for (j, b) in &placed[n + 1..] {
                if a.overlaps(b) {
                    return Err(Error::invalid_layout(format!(
                        "areas {} and {} overlap",
                        i, j
                    )));
                }
            }
        }

        Ok(())
    }

    /// Geometry for the area at `index`, if it has been placed
    #[must_use]
    pub fn geometry(&self, index: usize, container_percent: f64) -> Option<Geometry> {
        self.areas
            .get(index)
            .copied()
            .flatten()
            .map(|a| compute_geometry(&a, self.columns(), self.rows(), container_percent))
    }

    /// Serialized area strings, `None` for unplaced sections
    #[must_use]
    pub fn area_strings(&self) -> Vec<Option<String>> {
        self.areas.iter().map(|a| a.map(|a| a.to_string())).collect()
    }

    /// Paint every placed area into a cell matrix
    #[must_use]
    pub fn to_matrix(&self) -> CellMatrix {
        let mut matrix = CellMatrix::new(self.rows(), self.columns());
        for (index, area) in self.areas.iter().enumerate() {
            if let Some(area) = area {
                for (r, c) in area.cells() {
                    matrix.set(r, c, Some(index));
                }
            }
        }
        matrix
    }

    /// Build a template from an edited matrix.
    ///
    /// Fails with `InvalidLayout` when a section's cells do not form a rectangle.
    pub fn from_matrix(
        column_tracks: Vec<String>,
        row_tracks: Vec<String>,
        matrix: &CellMatrix,
        area_count: usize,
    ) -> Result<Self> {
        Ok(Self {
            column_tracks,
            row_tracks,
            areas: matrix.to_areas(area_count)?,
        })
    }
}

/// Row-major cell matrix in editor addressing; each cell holds a section index
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CellMatrix {
    rows: usize,
    columns: usize,
    cells: Vec<Option<usize>>,
}

impl CellMatrix {
    /// Create an all-empty matrix
    #[must_use]
    pub fn new(rows: usize, columns: usize) -> Self {
        Self {
            rows,
            columns,
            cells: vec![None; rows * columns],
        }
    }

    /// Number of rows
    #[must_use]
    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Number of columns
    #[must_use]
    pub fn columns(&self) -> usize {
        self.columns
    }

    /// Section index at a cell; `None` for empty or out-of-range cells
    #[must_use]
    pub fn get(&self, row: usize, col: usize) -> Option<usize> {
        if row < self.rows && col < self.columns {
            self.cells[row * self.columns + col]
        } else {
            None
        }
    }

    /// Set a cell label. Returns false when the cell is out of range.
    pub fn set(&mut self, row: usize, col: usize, label: Option<usize>) -> bool {
        if row < self.rows && col < self.columns {
            self.cells[row * self.columns + col] = label;
            true
        } else {
            false
        }
    }

    /// Copy into a new size, keeping labels whose coordinates still exist
    #[must_use]
    pub fn resized(&self, rows: usize, columns: usize) -> Self {
        let mut next = Self::new(rows, columns);
        for r in 0..rows.min(self.rows) {
            for c in 0..columns.min(self.columns) {
                next.set(r, c, self.get(r, c));
            }
        }
        next
    }

    /// Count of cells no section occupies
    #[must_use]
    pub fn empty_cells(&self) -> usize {
        self.cells.iter().filter(|c| c.is_none()).count()
    }

    /// Encode each label's cells as an area; labels with no cells stay unplaced.
    ///
    /// A label whose cells do not fill their bounding box has no area encoding and
    /// is rejected rather than widened over cells other labels own.
    pub fn to_areas(&self, area_count: usize) -> Result<Vec<Option<AreaSpec>>> {
        // (min_row, min_col, max_row, max_col)
        let mut bounds: Vec<Option<(usize, usize, usize, usize)>> = vec![None; area_count];
        let mut counts = vec![0usize; area_count];
        for r in 0..self.rows {
            for c in 0..self.columns {
                let Some(label) = self.get(r, c) else {
                    continue;
                };
                let Some(slot) = bounds.get_mut(label) else {
                    continue;
                };
                counts[label] += 1;
                *slot = Some(match *slot {
                    None => (r, c, r, c),
                    Some((r0, c0, r1, c1)) => (r0.min(r), c0.min(c), r1.max(r), c1.max(c)),
                });
            }
        }
        bounds
            .into_iter()
            .zip(counts)
            .enumerate()
            .map(|(label, (b, count))| match b {
                None => Ok(None),
                Some((r0, c0, r1, c1)) => {
                    let area = AreaSpec::spanning(r0, c0, r1 - r0 + 1, c1 - c0 + 1);
                    if area.width() * area.height() == count {
                        Ok(Some(area))
                    } else {
                        Err(Error::invalid_layout(format!(
                            "section {} covers {} of the {} cells in {}; areas must be rectangular",
                            label,
                            count,
                            area.width() * area.height(),
                            area
                        )))
                    }
                }
            })
            .collect()
    }

    /// Render as CSS `grid-template-areas` rows (`s0 s1 .`)
    #[must_use]
    pub fn template_areas(&self) -> Vec<String> {
        (0..self.rows)
            .map(|r| {
                (0..self.columns)
                    .map(|c| match self.get(r, c) {
                        Some(label) => format!("s{}", label),
                        None => EMPTY_CELL.to_string(),
                    })
                    .collect::<Vec<_>>()
                    .join(" ")
            })
            .collect()
    }
}
