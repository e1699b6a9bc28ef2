//! Canvas Document Types
//!
//! This module defines the canvas structure: a canvas type with ordered section
//! definitions, the sections and items a canvas owns, its grid layout, and the
//! weak parent/child links created by dives.
//!
//! Section mutations keep `canvas_type.sections`, `sections` and
//! `canvas_layout.areas` index-aligned.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::grid::GridTemplate;
use crate::layout::{synthesize_default, template_or_default};

/// Definition of one section within a canvas type
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SectionDefinition {
    /// Unique key within the type
    pub name: String,
    /// Guidance text shown in an empty section
    pub placeholder: String,
    /// Stable ordering key
    pub grid_index: u32,
}

impl SectionDefinition {
    /// Create a section definition
    #[must_use]
    pub fn new(name: impl Into<String>, placeholder: impl Into<String>, grid_index: u32) -> Self {
        Self {
            name: name.into(),
            placeholder: placeholder.into(),
            grid_index,
        }
    }
}

/// A kind of canvas (Business Model Canvas, SWOT, ...)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CanvasType {
    /// Identifier
    pub id: String,
    /// Display name
    pub name: String,
    /// Short description
    #[serde(default)]
    pub description: String,
    /// Sections in placement order
    pub sections: Vec<SectionDefinition>,
    /// Layout used for new canvases of this type
    #[serde(deserialize_with = "GridTemplate::deserialize_lenient")]
    pub default_layout: GridTemplate,
}

impl CanvasType {
    /// Find a section definition by name
    #[must_use]
    pub fn section(&self, name: &str) -> Option<&SectionDefinition> {
        self.sections.iter().find(|s| s.name == name)
    }
}

/// An item inside a section
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SectionItem {
    /// Plain text item
    Text {
        /// Immutable item ID
        id: Uuid,
        /// Item text
        content: String,
    },
}

impl SectionItem {
    /// Create a text item with a fresh ID
    #[must_use]
    pub fn text(content: impl Into<String>) -> Self {
        Self::Text {
            id: Uuid::new_v4(),
            content: content.into(),
        }
    }

    /// Get the item ID
    #[must_use]
    pub fn id(&self) -> Uuid {
        match self {
            Self::Text { id, .. } => *id,
        }
    }

    /// Get the item kind as a string
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Text { .. } => "text",
        }
    }

    /// Get the item content
    #[must_use]
    pub fn content(&self) -> &str {
        match self {
            Self::Text { content, .. } => content,
        }
    }

    /// Replace the content, keeping the ID
    pub fn set_content(&mut self, new_content: String) {
        match self {
            Self::Text { content, .. } => *content = new_content,
        }
    }
}

/// A named, ordered bucket of items
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Section {
    /// Section name, matches a [`SectionDefinition`]
    pub name: String,
    /// Ordering key copied from the definition
    pub grid_index: u32,
    /// Items in display order
    pub items: Vec<SectionItem>,
}

impl Section {
    fn from_definition(def: &SectionDefinition) -> Self {
        Self {
            name: def.name.clone(),
            grid_index: def.grid_index,
            items: Vec::new(),
        }
    }

    /// Get an item by ID
    #[must_use]
    pub fn item(&self, item_id: Uuid) -> Option<&SectionItem> {
        self.items.iter().find(|i| i.id() == item_id)
    }
}

/// Back-reference from a child canvas to the item it was derived from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParentLink {
    /// Parent canvas
    pub parent_canvas_id: Uuid,
    /// Section holding the item
    pub section_name: String,
    /// Item the dive started from
    pub item_id: Uuid,
}

/// Reference from a parent item to a derived child canvas
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChildLink {
    /// Item in the parent the child was derived from
    pub item_id: Uuid,
    /// Child canvas
    pub child_canvas_id: Uuid,
    /// Child display name at link time
    pub child_canvas_name: String,
}

/// A canvas document
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Canvas {
    /// Unique identifier
    pub id: Uuid,

    /// Canvas name
    pub name: String,

    /// Canvas description
    #[serde(default)]
    pub description: String,

    /// The canvas type, owned per canvas so sections can be added or removed
    pub canvas_type: CanvasType,

    /// Layout, one area per section
    #[serde(deserialize_with = "GridTemplate::deserialize_lenient")]
    pub canvas_layout: GridTemplate,

    /// Sections in `canvas_type.sections` order
    pub sections: Vec<Section>,

    /// Set when this canvas was derived from an item of another canvas
    #[serde(default)]
    pub parent_link: Option<ParentLink>,

    /// Children derived from items of this canvas
    #[serde(default)]
    pub linked_children: Vec<ChildLink>,

    /// When the canvas was created
    pub created_at: DateTime<Utc>,

    /// When the canvas was last modified
    pub updated_at: DateTime<Utc>,
}

impl Canvas {
    /// Create an empty canvas of the given type.
    ///
    /// The type's default layout is used when valid, otherwise a synthesized one.
    #[must_use]
    pub fn new(name: impl Into<String>, canvas_type: CanvasType) -> Self {
        let now = Utc::now();
        let sections = canvas_type
            .sections
            .iter()
            .map(Section::from_definition)
            .collect();
        let canvas_layout =
            template_or_default(&canvas_type.default_layout, canvas_type.sections.len());
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            description: String::new(),
            canvas_type,
            canvas_layout,
            sections,
            parent_link: None,
            linked_children: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Create with a specific ID
    #[must_use]
    pub fn with_id(mut self, id: Uuid) -> Self {
        self.id = id;
        self
    }

    /// Set the description
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Get a section by name
    #[must_use]
    pub fn section(&self, name: &str) -> Option<&Section> {
        self.sections.iter().find(|s| s.name == name)
    }

    fn section_mut(&mut self, name: &str) -> Result<&mut Section> {
        self.sections
            .iter_mut()
            .find(|s| s.name == name)
            .ok_or_else(|| Error::SectionNotFound(name.to_string()))
    }

    fn section_position(&self, name: &str) -> Option<usize> {
        self.sections.iter().position(|s| s.name == name)
    }

    /// Sections sorted by `grid_index` ascending
    #[must_use]
    pub fn sorted_sections(&self) -> Vec<&Section> {
        let mut sorted: Vec<&Section> = self.sections.iter().collect();
        sorted.sort_by_key(|s| s.grid_index);
        sorted
    }

    /// Append a section. Its layout area starts unplaced.
    pub fn add_section(
        &mut self,
        name: impl Into<String>,
        placeholder: impl Into<String>,
    ) -> Result<&Section> {
        let name = name.into();
        if self.section_position(&name).is_some() {
            return Err(Error::DuplicateSection(name));
        }
        let grid_index = self
            .canvas_type
            .sections
            .iter()
            .map(|s| s.grid_index + 1)
            .max()
            .unwrap_or(0);
        let def = SectionDefinition::new(name, placeholder, grid_index);
        self.sections.push(Section::from_definition(&def));
        self.canvas_type.sections.push(def);
        self.canvas_layout.areas.push(None);
        self.updated_at = Utc::now();
        Ok(&self.sections[self.sections.len() - 1])
    }

    /// Remove a section together with its definition and layout area
    pub fn remove_section(&mut self, name: &str) -> Result<Section> {
        let pos = self
            .section_position(name)
            .ok_or_else(|| Error::SectionNotFound(name.to_string()))?;
        self.canvas_type.sections.remove(pos);
        if pos < self.canvas_layout.areas.len() {
            self.canvas_layout.areas.remove(pos);
        }
        self.updated_at = Utc::now();
        Ok(self.sections.remove(pos))
    }

    /// Reorder sections. `new_order` must name every section exactly once.
    ///
    /// Definitions and layout areas move with their sections and `grid_index`
    /// is renumbered to the new positions.
    pub fn reorder_sections<S: AsRef<str>>(&mut self, new_order: &[S]) -> Result<()> {
        if new_order.len() != self.sections.len() {
            return Err(Error::InvalidOrder(format!(
                "expected {} sections, got {}",
                self.sections.len(),
                new_order.len()
            )));
        }

        let mut positions = Vec::with_capacity(new_order.len());
        for name in new_order {
            let name = name.as_ref();
            let pos = self
                .section_position(name)
                .ok_or_else(|| Error::SectionNotFound(name.to_string()))?;
            if positions.contains(&pos) {
                return Err(Error::InvalidOrder(format!("'{}' listed twice", name)));
            }
            positions.push(pos);
        }

        let mut sections = Vec::with_capacity(positions.len());
        let mut defs = Vec::with_capacity(positions.len());
        let mut areas = Vec::with_capacity(positions.len());
        for (new_index, &pos) in positions.iter().enumerate() {
            let mut section = self.sections[pos].clone();
            let mut def = self.canvas_type.sections[pos].clone();
            section.grid_index = new_index as u32;
            def.grid_index = new_index as u32;
            sections.push(section);
            defs.push(def);
            areas.push(self.canvas_layout.areas.get(pos).copied().flatten());
        }

        self.sections = sections;
        self.canvas_type.sections = defs;
        self.canvas_layout.areas = areas;
        self.updated_at = Utc::now();
        Ok(())
    }

    /// Add a text item to a section
    pub fn add_item(
        &mut self,
        section_name: &str,
        content: impl Into<String>,
    ) -> Result<SectionItem> {
        let item = SectionItem::text(content);
        self.section_mut(section_name)?.items.push(item.clone());
        self.updated_at = Utc::now();
        Ok(item)
    }

    /// Replace an item's content, keeping its ID and position
    pub fn update_item(
        &mut self,
        section_name: &str,
        item_id: Uuid,
        content: String,
    ) -> Result<()> {
        let section = self.section_mut(section_name)?;
        let item = section
            .items
            .iter_mut()
            .find(|i| i.id() == item_id)
            .ok_or(Error::ItemNotFound(item_id))?;
        item.set_content(content);
        self.updated_at = Utc::now();
        Ok(())
    }

    /// Remove an item. Removing an absent item is a no-op returning `None`.
    pub fn remove_item(
        &mut self,
        section_name: &str,
        item_id: Uuid,
    ) -> Result<Option<SectionItem>> {
        let section = self.section_mut(section_name)?;
        let Some(pos) = section.items.iter().position(|i| i.id() == item_id) else {
            return Ok(None);
        };
        let removed = section.items.remove(pos);
        self.updated_at = Utc::now();
        Ok(Some(removed))
    }

    /// Move an item within its section
    pub fn move_item(
        &mut self,
        section_name: &str,
        item_id: Uuid,
        new_index: usize,
    ) -> Result<usize> {
        let section = self.section_mut(section_name)?;
        let pos = section
            .items
            .iter()
            .position(|i| i.id() == item_id)
            .ok_or(Error::ItemNotFound(item_id))?;
        let item = section.items.remove(pos);
        let idx = new_index.min(section.items.len());
        section.items.insert(idx, item);
        self.updated_at = Utc::now();
        Ok(idx)
    }

    /// Find an item, failing with the specific missing key
    pub fn find_item(&self, section_name: &str, item_id: Uuid) -> Result<&SectionItem> {
        self.section(section_name)
            .ok_or_else(|| Error::SectionNotFound(section_name.to_string()))?
            .item(item_id)
            .ok_or(Error::ItemNotFound(item_id))
    }

    /// Whether an item still exists, used to detect dangling links
    #[must_use]
    pub fn contains_item(&self, section_name: &str, item_id: Uuid) -> bool {
        self.find_item(section_name, item_id).is_ok()
    }

    /// Record a derived child canvas for an item
    pub fn link_child(
        &mut self,
        item_id: Uuid,
        child_canvas_id: Uuid,
        child_canvas_name: impl Into<String>,
    ) {
        self.linked_children.push(ChildLink {
            item_id,
            child_canvas_id,
            child_canvas_name: child_canvas_name.into(),
        });
        self.updated_at = Utc::now();
    }

    /// Children derived from one item
    #[must_use]
    pub fn children_of(&self, item_id: Uuid) -> Vec<&ChildLink> {
        self.linked_children
            .iter()
            .filter(|l| l.item_id == item_id)
            .collect()
    }

    /// Drop the link to a child canvas. Returns false if none existed.
    pub fn unlink_child(&mut self, child_canvas_id: Uuid) -> bool {
        let before = self.linked_children.len();
        self.linked_children.retain(|l| l.child_canvas_id != child_canvas_id);
        let removed = self.linked_children.len() != before;
        if removed {
            self.updated_at = Utc::now();
        }
        removed
    }

    /// Check the structural invariants
    pub fn validate(&self) -> Result<()> {
        if self.sections.len() != self.canvas_type.sections.len() {
            return Err(Error::invalid_layout(format!(
                "{} sections for {} definitions",
                self.sections.len(),
                self.canvas_type.sections.len()
            )));
        }
        for (section, def) in self.sections.iter().zip(&self.canvas_type.sections) {
            if section.name != def.name {
                return Err(Error::SectionNotFound(section.name.clone()));
            }
        }
        self.canvas_layout.validate(self.canvas_type.sections.len())
    }

    /// Replace a layout that does not fit the sections with the synthesized default.
    ///
    /// Returns true when the layout was replaced.
    pub fn repair_layout(&mut self) -> bool {
        let section_count = self.sections.len();
        match self.canvas_layout.validate(section_count) {
            Ok(()) => false,
            Err(e) => {
                warn!(
                    canvas_id = %self.id,
                    error = %e,
                    "Replacing unusable layout with synthesized default"
                );
                self.canvas_layout = synthesize_default(section_count);
                true
            }
        }
    }

    /// Total number of items across all sections
    #[must_use]
    pub fn item_count(&self) -> usize {
        self.sections.iter().map(|s| s.items.len()).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::AreaSpec;

    fn quad_type() -> CanvasType {
        CanvasType {
            id: "swot".to_string(),
            name: "SWOT".to_string(),
            description: String::new(),
            sections: ["Strengths", "Weaknesses", "Opportunities", "Threats"]
                .iter()
                .enumerate()
                .map(|(i, n)| SectionDefinition::new(*n, format!("List {}", n), i as u32))
                .collect(),
            default_layout: synthesize_default(4),
        }
    }

    #[test]
    fn test_canvas_creation() {
        let canvas = Canvas::new("Plan", quad_type());
        assert_eq!(canvas.sections.len(), 4);
        assert_eq!(canvas.canvas_layout.areas.len(), 4);
        assert!(canvas.validate().is_ok());
        assert!(canvas.parent_link.is_none());
    }

    #[test]
    fn test_invalid_default_layout_falls_back() {
        let mut ty = quad_type();
        ty.default_layout = GridTemplate::uniform(1, 1, vec![None]);
        let canvas = Canvas::new("Plan", ty);
        assert_eq!(canvas.canvas_layout, synthesize_default(4));
    }

    #[test]
    fn test_add_and_update_item() {
        let mut canvas = Canvas::new("Plan", quad_type());
        let item = canvas.add_item("Strengths", "Strong brand").unwrap();
        canvas.add_item("Strengths", "Loyal users").unwrap();

        canvas
            .update_item("Strengths", item.id(), "Very strong brand".to_string())
            .unwrap();
        let section = canvas.section("Strengths").unwrap();
        assert_eq!(section.items[0].id(), item.id());
        assert_eq!(section.items[0].content(), "Very strong brand");
        assert_eq!(section.items.len(), 2);
    }

    #[test]
    fn test_item_not_found() {
        let mut canvas = Canvas::new("Plan", quad_type());
        let err = canvas.add_item("Nope", "x").unwrap_err();
        assert_eq!(err.code(), "section_not_found");

        let err = canvas
            .update_item("Strengths", Uuid::new_v4(), "x".to_string())
            .unwrap_err();
        assert_eq!(err.code(), "item_not_found");
    }

    #[test]
    fn test_double_remove_is_noop() {
        let mut canvas = Canvas::new("Plan", quad_type());
        let item = canvas.add_item("Threats", "Competitors").unwrap();

        let first = canvas.remove_item("Threats", item.id()).unwrap();
        assert!(first.is_some());
        let second = canvas.remove_item("Threats", item.id()).unwrap();
        assert!(second.is_none());
        assert!(canvas.section("Threats").unwrap().items.is_empty());
    }

    #[test]
    fn test_remove_section_keeps_areas_aligned() {
        let mut canvas = Canvas::new("Plan", quad_type());
        let third_area = canvas.canvas_layout.areas[2];

        canvas.remove_section("Weaknesses").unwrap();
        assert_eq!(canvas.sections.len(), 3);
        assert_eq!(canvas.canvas_layout.areas.len(), 3);
        assert_eq!(canvas.canvas_type.sections.len(), 3);
        assert_eq!(canvas.canvas_layout.areas[1], third_area);
        assert!(canvas.validate().is_ok());

        assert!(canvas.remove_section("Weaknesses").is_err());
    }

    #[test]
    fn test_add_section_appends_unplaced_area() {
        let mut canvas = Canvas::new("Plan", quad_type());
        canvas.add_section("Notes", "Anything else").unwrap();

        assert_eq!(canvas.canvas_layout.areas.len(), 5);
        assert_eq!(canvas.canvas_layout.areas[4], None);
        assert_eq!(canvas.section("Notes").unwrap().grid_index, 4);
        assert!(canvas.validate().is_ok());

        let err = canvas.add_section("Notes", "again").unwrap_err();
        assert_eq!(err.code(), "duplicate_section");
    }

    #[test]
    fn test_reorder_sections() {
        let mut canvas = Canvas::new("Plan", quad_type());
        let threat_area = canvas.canvas_layout.areas[3];

        canvas
            .reorder_sections(&["Threats", "Strengths", "Weaknesses", "Opportunities"])
            .unwrap();
        assert_eq!(canvas.sections[0].name, "Threats");
        assert_eq!(canvas.canvas_type.sections[0].name, "Threats");
        assert_eq!(canvas.canvas_layout.areas[0], threat_area);
        assert_eq!(canvas.sorted_sections()[0].name, "Threats");
        assert!(canvas.validate().is_ok());

        assert!(canvas.reorder_sections(&["Threats"]).is_err());
        assert!(canvas
            .reorder_sections(&["Threats", "Threats", "Weaknesses", "Opportunities"])
            .is_err());
    }

    #[test]
    fn test_move_item() {
        let mut canvas = Canvas::new("Plan", quad_type());
        let a = canvas.add_item("Strengths", "a").unwrap();
        canvas.add_item("Strengths", "b").unwrap();

        assert_eq!(canvas.move_item("Strengths", a.id(), 10).unwrap(), 1);
        assert_eq!(canvas.section("Strengths").unwrap().items[1].id(), a.id());
    }

    #[test]
    fn test_child_links() {
        let mut canvas = Canvas::new("Plan", quad_type());
        let item = canvas.add_item("Opportunities", "Asia").unwrap();
        let (c1, c2) = (Uuid::new_v4(), Uuid::new_v4());

        canvas.link_child(item.id(), c1, "Asia deep dive");
        canvas.link_child(item.id(), c2, "Asia deep dive");
        assert_eq!(canvas.children_of(item.id()).len(), 2);

        assert!(canvas.unlink_child(c1));
        assert!(!canvas.unlink_child(c1));
        assert_eq!(canvas.children_of(item.id())[0].child_canvas_id, c2);
    }

    #[test]
    fn test_validate_detects_overlap() {
        let mut canvas = Canvas::new("Plan", quad_type());
        canvas.canvas_layout.areas[1] = Some(AreaSpec::cell(0, 0));
        assert!(canvas.validate().is_err());
    }

    #[test]
    fn test_canvas_serialization() {
        let mut canvas = Canvas::new("Plan", quad_type());
        canvas.add_item("Strengths", "Team").unwrap();
        let json = serde_json::to_string(&canvas).unwrap();
        assert!(json.contains("\"type\":\"text\""));
        assert!(json.contains("\"1 / 1 / 2 / 2\""));

        let parsed: Canvas = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.id, canvas.id);
        assert_eq!(parsed.item_count(), 1);
        assert_eq!(parsed.canvas_layout, canvas.canvas_layout);
    }

    #[test]
    fn test_malformed_stored_area_is_recoverable() {
        let canvas = Canvas::new("Plan", quad_type());
        let json = serde_json::to_string(&canvas)
            .unwrap()
            .replace("\"1 / 1 / 2 / 2\"", "\"1 / 1 / 1 / 2\"");

        let mut parsed: Canvas = serde_json::from_str(&json).unwrap();
        assert!(parsed.canvas_layout.areas.is_empty());
        assert!(parsed.canvas_type.default_layout.areas.is_empty());
        assert!(parsed.validate().is_err());

        assert!(parsed.repair_layout());
        assert_eq!(parsed.canvas_layout, synthesize_default(4));
        assert!(parsed.validate().is_ok());
        assert!(!parsed.repair_layout());
    }
}
