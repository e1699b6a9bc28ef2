//! Canvasdive Core - Dive protocol and suggestion orchestration
//!
//! This crate ties the canvas model to the suggestion collaborators:
//! - Dive: deriving linked child canvases from a parent item
//! - Generation: per-canvas generation status with stale-run detection
//! - Generator: multi-section suggestion runs with accept/reject
//! - Stream: cumulative accumulation of streamed model output
//! - Collaborators: suggestion, dive advice, type naming and entitlement boundaries
//! - Suggest: collaborator implementations on top of an LLM provider
//! - Catalog: read-through cache of canvas types and layouts
//! - Links: auditing of parent/child references

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod catalog;
pub mod collaborators;
pub mod dive;
pub mod error;
pub mod generation;
pub mod generator;
pub mod links;
pub mod stream;
pub mod suggest;

pub use catalog::{CatalogCache, CatalogChange, CatalogSource, StaticCatalogSource};
pub use collaborators::{
    summarize_canvas, AllowAll, CanvasTypeName, CanvasTypeSummary, DiveAdvisor,
    DiveSuggestionRequest, EntitlementChecker, SectionPrompt, StaticEntitlements, Suggestion,
    SuggestionProvider, SuggestionRequest, TypeNamer,
};
pub use dive::{
    create_linked_canvas, link_child, DiveCandidate, DiveChoice, DiveOperation, DiveService,
    DiveState, DiveSuggestionSet, ProposedCanvasType, ProposedSection, SeedContent,
};
pub use error::{format_error_for_cli, Error, Result, UserFriendlyError};
pub use generation::{GenerationEvent, GenerationRun, GenerationStatus, GenerationStatusTracker};
pub use generator::{GenerationReport, PendingSuggestions, SectionGenerator};
pub use links::{audit_parent_link, find_missing_children, find_unlinked_children, LinkStatus};
pub use stream::StreamAccumulator;
pub use suggest::{GenerationSettings, LlmDiveAdvisor, LlmSuggestionProvider, LlmTypeNamer};
