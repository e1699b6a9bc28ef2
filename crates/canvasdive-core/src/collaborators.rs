//! Boundaries to external collaborators: suggestion, dive advice, type naming
//! and entitlement checks.

use crate::dive::DiveSuggestionSet;
use crate::error::Result;
use async_trait::async_trait;
use canvasdive_canvas::{Canvas, CanvasType};
use canvasdive_llm::Message;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Fewest suggestions a single request may ask for
pub const MIN_SUGGESTIONS: usize = 3;
/// Most suggestions a single request may ask for
pub const MAX_SUGGESTIONS: usize = 5;
/// Upper bound on a generated canvas description
pub const MAX_DESCRIPTION_CHARS: usize = 100;

/// Section the collaborator should write items for
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SectionPrompt {
    /// Section name
    pub name: String,
    /// Guidance text shown in the empty section
    pub placeholder: String,
}

/// Request for item suggestions in one section
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuggestionRequest {
    /// Plain-text digest of the canvas being worked on
    pub parent_canvas_summary: String,
    /// Content of the item being explored
    pub target_item_content: String,
    /// Section to generate items for
    pub section_to_generate: SectionPrompt,
    /// How many suggestions to ask for, always within 3..=5
    pub desired_count: usize,
}

impl SuggestionRequest {
    /// Build a request, clamping `desired_count` into range
    #[must_use]
    pub fn new(
        parent_canvas_summary: impl Into<String>,
        target_item_content: impl Into<String>,
        section_to_generate: SectionPrompt,
        desired_count: usize,
    ) -> Self {
        Self {
            parent_canvas_summary: parent_canvas_summary.into(),
            target_item_content: target_item_content.into(),
            section_to_generate,
            desired_count: desired_count.clamp(MIN_SUGGESTIONS, MAX_SUGGESTIONS),
        }
    }
}

/// One suggested item
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Suggestion {
    /// Proposed item text
    pub content: String,
    /// Why the item fits
    #[serde(default)]
    pub rationale: String,
}

/// Produces item suggestions for a section
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SuggestionProvider: Send + Sync {
    /// Generate suggestions. Failure is a single error, never a partial list.
    async fn suggest(&self, request: &SuggestionRequest) -> Result<Vec<Suggestion>>;
}

/// Catalog entry shown to the dive advisor
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CanvasTypeSummary {
    /// Canvas type ID
    pub id: String,
    /// Display name
    pub name: String,
    /// What the type is for
    pub description: String,
    /// Section names in order
    pub sections: Vec<String>,
}

impl From<&CanvasType> for CanvasTypeSummary {
    fn from(ty: &CanvasType) -> Self {
        Self {
            id: ty.id.clone(),
            name: ty.name.clone(),
            description: ty.description.clone(),
            sections: ty.sections.iter().map(|s| s.name.clone()).collect(),
        }
    }
}

/// Request for child canvas proposals when diving into an item
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiveSuggestionRequest {
    /// Plain-text digest of the parent canvas
    pub parent_canvas_summary: String,
    /// Section holding the item
    pub section_name: String,
    /// Content of the item being explored
    pub target_item_content: String,
    /// Known canvas types
    pub known_types: Vec<CanvasTypeSummary>,
}

/// Proposes canvas types and seed content for a dive
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait DiveAdvisor: Send + Sync {
    /// Rank candidate types and optionally propose a new one
    async fn advise(&self, request: &DiveSuggestionRequest) -> Result<DiveSuggestionSet>;
}

/// Name and description for a canvas type drafted in conversation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CanvasTypeName {
    /// Canvas name
    pub canvas_name: String,
    /// Short description, at most 100 characters
    pub canvas_description: String,
}

/// Names a canvas type from a conversation
#[async_trait]
pub trait TypeNamer: Send + Sync {
    /// Derive a name and description from the conversation so far
    async fn name_canvas_type(&self, conversation_history: &[Message]) -> Result<CanvasTypeName>;
}

/// Decides whether a caller may use suggestion features
#[async_trait]
pub trait EntitlementChecker: Send + Sync {
    /// Absent or unknown tokens are not entitled
    async fn is_entitled(&self, auth_token: Option<&str>) -> bool;
}

/// Entitlement checker backed by a fixed allow-list
#[derive(Debug, Clone, Default)]
pub struct StaticEntitlements {
    tokens: HashSet<String>,
}

impl StaticEntitlements {
    /// Create from a list of entitled tokens
    #[must_use]
    pub fn new<I, S>(tokens: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            tokens: tokens.into_iter().map(Into::into).collect(),
        }
    }

    /// Checker that entitles every non-empty token
    #[must_use]
    pub fn allow_all() -> AllowAll {
        AllowAll
    }
}

#[async_trait]
impl EntitlementChecker for StaticEntitlements {
    async fn is_entitled(&self, auth_token: Option<&str>) -> bool {
        auth_token.is_some_and(|t| self.tokens.contains(t.trim()))
    }
}

/// Entitles any non-empty token
#[derive(Debug, Clone, Copy, Default)]
pub struct AllowAll;

#[async_trait]
impl EntitlementChecker for AllowAll {
    async fn is_entitled(&self, auth_token: Option<&str>) -> bool {
        auth_token.is_some_and(|t| !t.trim().is_empty())
    }
}

/// Plain-text digest of a canvas for prompts
#[must_use]
pub fn summarize_canvas(canvas: &Canvas) -> String {
    let mut out = format!("Canvas: {} ({})", canvas.name, canvas.canvas_type.name);
    if !canvas.description.is_empty() {
        out.push_str(&format!("\nDescription: {}", canvas.description));
    }
    for section in canvas.sorted_sections() {
        let items: Vec<&str> = section.items.iter().map(|i| i.content()).collect();
        if items.is_empty() {
            out.push_str(&format!("\n{}: (empty)", section.name));
        } else {
            out.push_str(&format!("\n{}: {}", section.name, items.join("; ")));
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use canvasdive_canvas::builtin_canvas_types;

    #[test]
    fn test_desired_count_clamped() {
        let prompt = SectionPrompt {
            name: "Strengths".into(),
            placeholder: "What do you do well?".into(),
        };
        let low = SuggestionRequest::new("", "", prompt.clone(), 1);
        assert_eq!(low.desired_count, MIN_SUGGESTIONS);
        let high = SuggestionRequest::new("", "", prompt.clone(), 9);
        assert_eq!(high.desired_count, MAX_SUGGESTIONS);
        let mid = SuggestionRequest::new("", "", prompt, 4);
        assert_eq!(mid.desired_count, 4);
    }

    #[tokio::test]
    async fn test_static_entitlements() {
        let checker = StaticEntitlements::new(["tok-1"]);
        assert!(checker.is_entitled(Some("tok-1")).await);
        assert!(!checker.is_entitled(Some("tok-2")).await);
        assert!(!checker.is_entitled(None).await);

        let open = StaticEntitlements::allow_all();
        assert!(open.is_entitled(Some("anything")).await);
        assert!(!open.is_entitled(Some("  ")).await);
    }

    #[test]
    fn test_summarize_canvas() {
        let ty = builtin_canvas_types()
            .into_iter()
            .find(|t| t.id == "swot")
            .unwrap();
        let mut canvas = Canvas::new("Bakery", ty);
        canvas.add_item("Strengths", "Sourdough").unwrap();

        let summary = summarize_canvas(&canvas);
        assert!(summary.starts_with("Canvas: Bakery (SWOT"));
        assert!(summary.contains("Strengths: Sourdough"));
        assert!(summary.contains("Threats: (empty)"));
    }
}
