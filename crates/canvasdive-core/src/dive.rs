//! Dive protocol: derive a linked child canvas from one item of a parent.
//!
//! Creating the child and recording it on the parent are two separate steps.
//! A failure between them leaves an unlinked child, which
//! [`crate::links::find_unlinked_children`] reports.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use canvasdive_canvas::{
    synthesize_default, Canvas, CanvasType, ParentLink, SectionDefinition, SectionItem,
};
use canvasdive_llm::util::truncate_chars;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::catalog::CatalogCache;
use crate::collaborators::{
    summarize_canvas, CanvasTypeSummary, DiveAdvisor, DiveSuggestionRequest, EntitlementChecker,
};
use crate::error::{Error, Result};

/// Longest child canvas name derived from item content
const MAX_CHILD_NAME_CHARS: usize = 80;

/// Seed items keyed by section name
pub type SeedContent = BTreeMap<String, Vec<String>>;

/// An existing canvas type proposed for the child
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiveCandidate {
    /// Catalog ID of the proposed type
    pub canvas_type_id: String,
    /// Why it fits
    #[serde(default)]
    pub rationale: String,
    /// Initial items per section
    #[serde(default)]
    pub seed_content: SeedContent,
}

/// Section of a newly proposed canvas type
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProposedSection {
    /// Section name
    pub name: String,
    /// Guidance text
    #[serde(default)]
    pub placeholder: String,
}

/// A wholly new canvas type proposed when no known type fits
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProposedCanvasType {
    /// Type name
    pub name: String,
    /// Sections in order
    pub sections: Vec<ProposedSection>,
    /// Why it fits
    #[serde(default)]
    pub rationale: String,
    /// Initial items per section
    #[serde(default)]
    pub seed_content: SeedContent,
}

impl ProposedCanvasType {
    /// Materialize as a canvas type with a synthesized layout.
    ///
    /// Duplicate section names keep their first occurrence.
    #[must_use]
    pub fn to_canvas_type(&self) -> CanvasType {
        let mut sections: Vec<SectionDefinition> = Vec::new();
        for proposed in &self.sections {
            let name = proposed.name.trim();
            if name.is_empty() || sections.iter().any(|s| s.name == name) {
                continue;
            }
            let grid_index = sections.len() as u32;
            sections.push(SectionDefinition::new(
                name,
                proposed.placeholder.clone(),
                grid_index,
            ));
        }
        CanvasType {
            id: format!("custom-{}", Uuid::new_v4()),
            name: self.name.clone(),
            description: self.rationale.clone(),
            default_layout: synthesize_default(sections.len()),
            sections,
        }
    }
}

/// Ranked proposals for a dive. The caller picks; nothing is auto-selected.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiveSuggestionSet {
    /// Existing types, best first
    #[serde(default)]
    pub candidates: Vec<DiveCandidate>,
    /// Optional new type
    #[serde(default)]
    pub proposed_type: Option<ProposedCanvasType>,
}

impl DiveSuggestionSet {
    /// Whether there is nothing to choose from
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty() && self.proposed_type.is_none()
    }
}

/// The user's pick from a [`DiveSuggestionSet`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiveChoice {
    /// Candidate at this index
    Existing(usize),
    /// The proposed new type
    Proposed,
}

/// Lifecycle of one dive
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", content = "message", rename_all = "snake_case")]
pub enum DiveState {
    /// Nothing requested yet
    Idle,
    /// Waiting on the advisor
    RequestingSuggestions,
    /// Suggestions shown, waiting for a pick
    AwaitingUserChoice,
    /// Building the child canvas
    CreatingChildCanvas,
    /// Child created and recorded on the parent
    Linked,
    /// Failed with a message
    Errored(String),
}

impl DiveState {
    /// Whether no further transitions are possible
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Linked | Self::Errored(_))
    }

    /// Whether `next` is a legal successor
    #[must_use]
    pub fn can_transition_to(&self, next: &DiveState) -> bool {
        use DiveState::*;
        match (self, next) {
            (s, Errored(_)) => !s.is_terminal(),
            (Idle, RequestingSuggestions)
            | (RequestingSuggestions, AwaitingUserChoice)
            | (AwaitingUserChoice, CreatingChildCanvas)
            | (CreatingChildCanvas, Linked) => true,
            _ => false,
        }
    }
}

impl fmt::Display for DiveState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::RequestingSuggestions => "requesting_suggestions",
            Self::AwaitingUserChoice => "awaiting_user_choice",
            Self::CreatingChildCanvas => "creating_child_canvas",
            Self::Linked => "linked",
            Self::Errored(_) => "errored",
        };
        f.write_str(name)
    }
}

/// One dive from a parent item, tracked through its states
#[derive(Debug, Clone)]
pub struct DiveOperation {
    /// Operation ID
    pub id: Uuid,
    /// Parent canvas
    pub parent_canvas_id: Uuid,
    /// Section holding the item
    pub section_name: String,
    /// Item being explored
    pub item_id: Uuid,
    state: DiveState,
    suggestions: Option<DiveSuggestionSet>,
    child_canvas_id: Option<Uuid>,
}

impl DiveOperation {
    /// Start an idle operation
    #[must_use]
    pub fn new(parent_canvas_id: Uuid, section_name: impl Into<String>, item_id: Uuid) -> Self {
        Self {
            id: Uuid::new_v4(),
            parent_canvas_id,
            section_name: section_name.into(),
            item_id,
            state: DiveState::Idle,
            suggestions: None,
            child_canvas_id: None,
        }
    }

    /// Current state
    #[must_use]
    pub fn state(&self) -> &DiveState {
        &self.state
    }

    /// Suggestions received, if any
    #[must_use]
    pub fn suggestions(&self) -> Option<&DiveSuggestionSet> {
        self.suggestions.as_ref()
    }

    /// Child created by this operation
    #[must_use]
    pub fn child_canvas_id(&self) -> Option<Uuid> {
        self.child_canvas_id
    }

    /// Move to `next`, rejecting illegal transitions
    pub fn transition(&mut self, next: DiveState) -> Result<()> {
        if !self.state.can_transition_to(&next) {
            return Err(Error::invalid_transition(&self.state, &next));
        }
        debug!(dive_id = %self.id, from = %self.state, to = %next, "Dive transition");
        self.state = next;
        Ok(())
    }

    /// Enter `Errored` unless already terminal
    pub fn fail(&mut self, message: impl Into<String>) {
        let message = message.into();
        if self.state.is_terminal() {
            return;
        }
        warn!(dive_id = %self.id, from = %self.state, error = %message, "Dive failed");
        self.state = DiveState::Errored(message);
    }
}

/// Derives linked child canvases from parent items
pub struct DiveService {
    advisor: Arc<dyn DiveAdvisor>,
    entitlements: Arc<dyn EntitlementChecker>,
    catalog: Arc<CatalogCache>,
}

impl DiveService {
    /// Create a dive service
    #[must_use]
    pub fn new(
        advisor: Arc<dyn DiveAdvisor>,
        entitlements: Arc<dyn EntitlementChecker>,
        catalog: Arc<CatalogCache>,
    ) -> Self {
        Self {
            advisor,
            entitlements,
            catalog,
        }
    }

    /// Ask the advisor which canvas types suit a dive into `item_id`.
    ///
    /// Candidates naming unknown types are dropped; order is otherwise kept.
    #[instrument(skip(self, auth_token, parent), fields(parent_id = %parent.id))]
    pub async fn request_dive_suggestions(
        &self,
        auth_token: Option<&str>,
        parent: &Canvas,
        section_name: &str,
        item_id: Uuid,
    ) -> Result<DiveSuggestionSet> {
        let item = parent.find_item(section_name, item_id)?;
        if !self.entitlements.is_entitled(auth_token).await {
            return Err(Error::NotEntitled);
        }

        let known = self.catalog.canvas_types().await?;
        let request = DiveSuggestionRequest {
            parent_canvas_summary: summarize_canvas(parent),
            section_name: section_name.to_string(),
            target_item_content: item.content().to_string(),
            known_types: known.iter().map(CanvasTypeSummary::from).collect(),
        };

        let mut set = self.advisor.advise(&request).await?;
        set.candidates.retain(|c| {
            let found = known.iter().any(|t| t.id == c.canvas_type_id);
            if !found {
                warn!(canvas_type_id = %c.canvas_type_id, "Dropping candidate with unknown type");
            }
            found
        });
        info!(
            candidates = set.candidates.len(),
            proposed = set.proposed_type.is_some(),
            "Dive suggestions ready"
        );
        Ok(set)
    }

    /// Drive `op` from `Idle` to `AwaitingUserChoice`, or to `Errored` on failure
    pub async fn suggest_for(
        &self,
        op: &mut DiveOperation,
        auth_token: Option<&str>,
        parent: &Canvas,
    ) -> Result<()> {
        op.transition(DiveState::RequestingSuggestions)?;
        let section_name = op.section_name.clone();
        match self
            .request_dive_suggestions(auth_token, parent, &section_name, op.item_id)
            .await
        {
            Ok(set) => {
                op.suggestions = Some(set);
                op.transition(DiveState::AwaitingUserChoice)
            }
            Err(e) => {
                op.fail(e.to_string());
                Err(e)
            }
        }
    }

    /// Resolve a choice to a concrete type and its seed content
    pub async fn resolve_choice(
        &self,
        set: &DiveSuggestionSet,
        choice: DiveChoice,
    ) -> Result<(CanvasType, SeedContent)> {
        match choice {
            DiveChoice::Existing(index) => {
                let candidate = set.candidates.get(index).ok_or_else(|| {
                    Error::CanvasTypeNotFound(format!("candidate #{}", index))
                })?;
                let ty = self.catalog.canvas_type(&candidate.canvas_type_id).await?;
                Ok((ty, candidate.seed_content.clone()))
            }
            DiveChoice::Proposed => {
                let proposal = set
                    .proposed_type
                    .as_ref()
                    .ok_or_else(|| Error::CanvasTypeNotFound("proposed type".to_string()))?;
                Ok((proposal.to_canvas_type(), proposal.seed_content.clone()))
            }
        }
    }

    /// Finish `op`: build the child from the chosen suggestion and link it on `parent`
    pub async fn complete(
        &self,
        op: &mut DiveOperation,
        parent: &mut Canvas,
        choice: DiveChoice,
    ) -> Result<Canvas> {
        if parent.id != op.parent_canvas_id {
            return Err(Error::Canvas(canvasdive_canvas::Error::CanvasNotFound(
                op.parent_canvas_id,
            )));
        }
        let set = op
            .suggestions
            .clone()
            .ok_or_else(|| Error::invalid_transition(&op.state, DiveState::CreatingChildCanvas))?;
        op.transition(DiveState::CreatingChildCanvas)?;

        let built = match self.resolve_choice(&set, choice).await {
            Ok((ty, seed)) => {
                create_linked_canvas(parent, &op.section_name, op.item_id, ty, &seed)
            }
            Err(e) => Err(e),
        };
        let child = match built {
            Ok(child) => child,
            Err(e) => {
                op.fail(e.to_string());
                return Err(e);
            }
        };

        link_child(parent, &child)?;
        op.child_canvas_id = Some(child.id);
        op.transition(DiveState::Linked)?;
        Ok(child)
    }
}

/// Build a child canvas for a dive into `item_id`.
///
/// Sections come from `chosen_type`; each is seeded from `seed_content` by name,
/// missing entries stay empty and unknown names are ignored. The child is not
/// persisted and the parent is not modified.
pub fn create_linked_canvas(
    parent: &Canvas,
    section_name: &str,
    item_id: Uuid,
    chosen_type: CanvasType,
    seed_content: &SeedContent,
) -> Result<Canvas> {
    let item = parent.find_item(section_name, item_id)?;
    let name = truncate_chars(item.content().trim(), MAX_CHILD_NAME_CHARS);

    let mut child = Canvas::new(name, chosen_type)
        .with_description(format!("{} in {}", section_name, parent.name));

    for (section, entries) in seed_content {
        let Some(target) = child.sections.iter_mut().find(|s| &s.name == section) else {
            debug!(section = %section, "Ignoring seed for unknown section");
            continue;
        };
        target.items.extend(
            entries
                .iter()
                .filter(|e| !e.trim().is_empty())
                .map(|e| SectionItem::text(e.trim())),
        );
    }

    child.parent_link = Some(ParentLink {
        parent_canvas_id: parent.id,
        section_name: section_name.to_string(),
        item_id,
    });
    info!(
        parent_id = %parent.id,
        child_id = %child.id,
        section = %section_name,
        "Child canvas created"
    );
    Ok(child)
}

/// Record `child` on `parent` using the child's parent link
pub fn link_child(parent: &mut Canvas, child: &Canvas) -> Result<()> {
    let link = child
        .parent_link
        .as_ref()
        .filter(|l| l.parent_canvas_id == parent.id)
        .ok_or(Error::Canvas(canvasdive_canvas::Error::CanvasNotFound(
            parent.id,
        )))?;
    parent.link_child(link.item_id, child.id, child.name.clone());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::StaticCatalogSource;
    use crate::collaborators::{MockDiveAdvisor, StaticEntitlements};
    use canvasdive_canvas::builtin_canvas_types;

    fn swot() -> CanvasType {
        builtin_canvas_types()
            .into_iter()
            .find(|t| t.id == "swot")
            .unwrap()
    }

    fn parent_with_item() -> (Canvas, Uuid) {
        let ty = builtin_canvas_types().remove(0);
        let mut parent = Canvas::new("Coffee shop", ty);
        let item = parent
            .add_item("Customer Segments", "Remote workers")
            .unwrap();
        (parent, item.id())
    }

    fn service(advisor: MockDiveAdvisor) -> DiveService {
        DiveService::new(
            Arc::new(advisor),
            Arc::new(StaticEntitlements::new(["tok"])),
            Arc::new(CatalogCache::new(Arc::new(StaticCatalogSource::builtin()))),
        )
    }

    fn suggestion_set() -> DiveSuggestionSet {
        DiveSuggestionSet {
            candidates: vec![
                DiveCandidate {
                    canvas_type_id: "swot".into(),
                    rationale: "Assess the segment".into(),
                    seed_content: BTreeMap::from([(
                        "Strengths".to_string(),
                        vec!["Flexible hours".to_string()],
                    )]),
                },
                DiveCandidate {
                    canvas_type_id: "does-not-exist".into(),
                    rationale: String::new(),
                    seed_content: SeedContent::new(),
                },
            ],
            proposed_type: Some(ProposedCanvasType {
                name: "Persona".into(),
                sections: vec![
                    ProposedSection {
                        name: "Goals".into(),
                        placeholder: "What they want".into(),
                    },
                    ProposedSection {
                        name: "Goals".into(),
                        placeholder: "dup".into(),
                    },
                    ProposedSection {
                        name: "Habits".into(),
                        placeholder: String::new(),
                    },
                ],
                rationale: "Understand the worker".into(),
                seed_content: BTreeMap::from([(
                    "Habits".to_string(),
                    vec!["Works from cafes".to_string()],
                )]),
            }),
        }
    }

    #[test]
    fn test_create_linked_canvas_seeds_sections() {
        let (parent, item_id) = parent_with_item();
        let seed = BTreeMap::from([
            (
                "Strengths".to_string(),
                vec!["Loyal".to_string(), "  ".to_string()],
            ),
            ("Nonexistent".to_string(), vec!["ignored".to_string()]),
        ]);

        let child =
            create_linked_canvas(&parent, "Customer Segments", item_id, swot(), &seed).unwrap();

        assert_ne!(child.id, parent.id);
        assert_eq!(child.name, "Remote workers");
        assert_eq!(child.sections.len(), 4);
        assert_eq!(child.section("Strengths").unwrap().items.len(), 1);
        assert!(child.section("Threats").unwrap().items.is_empty());
        assert_eq!(child.canvas_layout.areas.len(), 4);

        let link = child.parent_link.as_ref().unwrap();
        assert_eq!(link.parent_canvas_id, parent.id);
        assert_eq!(link.section_name, "Customer Segments");
        assert_eq!(link.item_id, item_id);
        assert!(parent.linked_children.is_empty());
    }

    #[test]
    fn test_create_linked_canvas_missing_item() {
        let (parent, _) = parent_with_item();
        let err = create_linked_canvas(
            &parent,
            "Customer Segments",
            Uuid::new_v4(),
            swot(),
            &SeedContent::new(),
        )
        .unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_repeated_dive_creates_independent_children() {
        let (mut parent, item_id) = parent_with_item();
        let seed = SeedContent::new();

        let mut first =
            create_linked_canvas(&parent, "Customer Segments", item_id, swot(), &seed).unwrap();
        let second =
            create_linked_canvas(&parent, "Customer Segments", item_id, swot(), &seed).unwrap();
        assert_ne!(first.id, second.id);

        first.add_item("Threats", "Coworking spaces").unwrap();
        assert!(second.section("Threats").unwrap().items.is_empty());

        link_child(&mut parent, &first).unwrap();
        link_child(&mut parent, &second).unwrap();
        assert_eq!(parent.children_of(item_id).len(), 2);
    }

    #[test]
    fn test_link_child_rejects_foreign_parent() {
        let (parent, item_id) = parent_with_item();
        let (mut other, _) = parent_with_item();
        let child = create_linked_canvas(
            &parent,
            "Customer Segments",
            item_id,
            swot(),
            &SeedContent::new(),
        )
        .unwrap();
        assert!(link_child(&mut other, &child).is_err());
        assert!(other.linked_children.is_empty());
    }

    #[test]
    fn test_state_transitions() {
        let mut op = DiveOperation::new(Uuid::new_v4(), "Channels", Uuid::new_v4());
        assert!(op.transition(DiveState::Linked).is_err());
        op.transition(DiveState::RequestingSuggestions).unwrap();
        op.transition(DiveState::AwaitingUserChoice).unwrap();
        op.transition(DiveState::CreatingChildCanvas).unwrap();
        op.transition(DiveState::Linked).unwrap();
        assert!(op.state().is_terminal());

        op.fail("too late");
        assert_eq!(op.state(), &DiveState::Linked);
        assert!(op
            .transition(DiveState::Errored("again".into()))
            .is_err());
    }

    #[test]
    fn test_errored_from_any_non_terminal_state() {
        for state in [
            DiveState::Idle,
            DiveState::RequestingSuggestions,
            DiveState::AwaitingUserChoice,
            DiveState::CreatingChildCanvas,
        ] {
            assert!(state.can_transition_to(&DiveState::Errored("x".into())));
        }
    }

    #[test]
    fn test_proposed_type_dedups_sections() {
        let ty = suggestion_set().proposed_type.unwrap().to_canvas_type();
        let names: Vec<&str> = ty.sections.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, ["Goals", "Habits"]);
        assert!(ty.id.starts_with("custom-"));
        assert!(ty.default_layout.validate(2).is_ok());
    }

    #[tokio::test]
    async fn test_request_filters_unknown_candidates() {
        let mut advisor = MockDiveAdvisor::new();
        advisor
            .expect_advise()
            .withf(|req| {
                req.target_item_content == "Remote workers"
                    && req.known_types.iter().any(|t| t.id == "swot")
            })
            .times(1)
            .returning(|_| Ok(suggestion_set()));

        let (parent, item_id) = parent_with_item();
        let set = service(advisor)
            .request_dive_suggestions(Some("tok"), &parent, "Customer Segments", item_id)
            .await
            .unwrap();
        assert_eq!(set.candidates.len(), 1);
        assert_eq!(set.candidates[0].canvas_type_id, "swot");
        assert!(set.proposed_type.is_some());
    }

    #[tokio::test]
    async fn test_request_requires_entitlement() {
        let mut advisor = MockDiveAdvisor::new();
        advisor.expect_advise().never();

        let (parent, item_id) = parent_with_item();
        let err = service(advisor)
            .request_dive_suggestions(None, &parent, "Customer Segments", item_id)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::NotEntitled));
    }

    #[tokio::test]
    async fn test_full_operation_with_proposed_type() {
        let mut advisor = MockDiveAdvisor::new();
        advisor
            .expect_advise()
            .returning(|_| Ok(suggestion_set()));
        let service = service(advisor);

        let (mut parent, item_id) = parent_with_item();
        let mut op = DiveOperation::new(parent.id, "Customer Segments", item_id);
        service
            .suggest_for(&mut op, Some("tok"), &parent)
            .await
            .unwrap();
        assert_eq!(op.state(), &DiveState::AwaitingUserChoice);

        let child = service
            .complete(&mut op, &mut parent, DiveChoice::Proposed)
            .await
            .unwrap();
        assert_eq!(op.state(), &DiveState::Linked);
        assert_eq!(op.child_canvas_id(), Some(child.id));
        assert_eq!(child.canvas_type.name, "Persona");
        assert_eq!(child.section("Habits").unwrap().items.len(), 1);
        assert_eq!(parent.children_of(item_id)[0].child_canvas_id, child.id);
    }

    #[tokio::test]
    async fn test_failed_suggestions_enter_errored() {
        let mut advisor = MockDiveAdvisor::new();
        advisor
            .expect_advise()
            .returning(|_| Err(Error::upstream("model unavailable")));
        let service = service(advisor);

        let (parent, item_id) = parent_with_item();
        let mut op = DiveOperation::new(parent.id, "Customer Segments", item_id);
        assert!(service
            .suggest_for(&mut op, Some("tok"), &parent)
            .await
            .is_err());
        assert!(matches!(op.state(), DiveState::Errored(_)));
    }

    #[tokio::test]
    async fn test_bad_choice_enters_errored() {
        let mut advisor = MockDiveAdvisor::new();
        advisor.expect_advise().returning(|_| {
            Ok(DiveSuggestionSet {
                candidates: Vec::new(),
                proposed_type: None,
            })
        });
        let service = service(advisor);

        let (mut parent, item_id) = parent_with_item();
        let mut op = DiveOperation::new(parent.id, "Customer Segments", item_id);
        service
            .suggest_for(&mut op, Some("tok"), &parent)
            .await
            .unwrap();
        assert!(op.suggestions().unwrap().is_empty());

        let err = service
            .complete(&mut op, &mut parent, DiveChoice::Existing(0))
            .await
            .unwrap_err();
        assert!(err.is_not_found());
        assert!(matches!(op.state(), DiveState::Errored(_)));
        assert!(parent.linked_children.is_empty());
    }
}
