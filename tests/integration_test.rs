//! Integration tests for Canvasdive
//!
//! These tests verify the integration between the crates:
//! - canvasdive-canvas: canvas model, layouts, persistence and export
//! - canvasdive-llm: scripted provider standing in for the model
//! - canvasdive-core: dive protocol, generation tracking and link auditing

use std::collections::BTreeMap;
use std::sync::Arc;

use canvasdive_canvas::{
    builtin_canvas_types, parse_area_string, Canvas, CanvasExporter, CanvasRepository,
    LayoutEditor, SqliteCanvasStore,
};
use canvasdive_core::{
    audit_parent_link, find_unlinked_children, link_child, CatalogCache, DiveChoice,
    DiveOperation, DiveService, DiveState, GenerationSettings, GenerationStatusTracker,
    LinkStatus, LlmDiveAdvisor, LlmSuggestionProvider, SectionGenerator, StaticCatalogSource,
    StaticEntitlements,
};
use canvasdive_llm::MockProvider;
use sqlx::sqlite::SqlitePoolOptions;
use tokio_test::assert_ok;

async fn memory_store() -> SqliteCanvasStore {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .unwrap();
    let store = SqliteCanvasStore::new(pool);
    store.init().await.unwrap();
    store
}

fn business_model(name: &str) -> Canvas {
    let ty = builtin_canvas_types()
        .into_iter()
        .find(|t| t.id == "business-model")
        .unwrap();
    Canvas::new(name, ty)
}

const DIVE_REPLY: &str = r#"```json
{
  "candidates": [
    {"canvas_type_id": "empathy-map", "rationale": "Understand the segment",
     "seed_content": {"Says": ["I need quiet"], "Pains": ["Noisy cafes"]}},
    {"canvas_type_id": "swot", "rationale": "Assess fit", "seed_content": {}}
  ],
  "proposed_type": null
}
```"#;

// ============================================================================
// Dive → create → link → audit → export
// ============================================================================

#[tokio::test]
async fn test_dive_end_to_end() {
    let store = memory_store().await;
    let mut parent = business_model("Coworking cafe");
    let item = parent
        .add_item("Customer Segments", "Remote workers")
        .unwrap();
    assert_ok!(store.save(&parent).await);

    let mock = MockProvider::new();
    mock.add_response(DIVE_REPLY);
    let service = DiveService::new(
        Arc::new(LlmDiveAdvisor::new(
            Arc::new(mock),
            GenerationSettings::default(),
        )),
        Arc::new(StaticEntitlements::new(["tok"])),
        Arc::new(CatalogCache::new(Arc::new(StaticCatalogSource::builtin()))),
    );

    let mut op = DiveOperation::new(parent.id, "Customer Segments", item.id());
    service
        .suggest_for(&mut op, Some("tok"), &parent)
        .await
        .unwrap();
    assert_eq!(op.state(), &DiveState::AwaitingUserChoice);
    assert_eq!(op.suggestions().unwrap().candidates.len(), 2);

    let child = service
        .complete(&mut op, &mut parent, DiveChoice::Existing(0))
        .await
        .unwrap();
    assert_eq!(op.state(), &DiveState::Linked);
    assert_eq!(child.canvas_type.id, "empathy-map");
    assert_eq!(child.section("Says").unwrap().items.len(), 1);
    assert!(child.section("Thinks").unwrap().items.is_empty());

    assert_ok!(store.save(&child).await);
    assert_ok!(store.save(&parent).await);

    let reloaded_child = store.load(child.id).await.unwrap();
    assert_eq!(
        audit_parent_link(&reloaded_child, &store).await.unwrap(),
        LinkStatus::Intact
    );
    let reloaded_parent = store.load(parent.id).await.unwrap();
    assert!(find_unlinked_children(&reloaded_parent, &store)
        .await
        .unwrap()
        .is_empty());
    assert_eq!(reloaded_parent.children_of(item.id()).len(), 1);

    let exported = CanvasExporter::new().export(&reloaded_child);
    assert_eq!(exported.placements.len(), 6);
    assert!(exported.html.contains("I need quiet"));
}

#[tokio::test]
async fn test_interrupted_link_is_detectable() {
    let store = memory_store().await;
    let mut parent = business_model("Bakery");
    let item = parent.add_item("Channels", "Farmers market").unwrap();
    store.save(&parent).await.unwrap();

    let swot = builtin_canvas_types()
        .into_iter()
        .find(|t| t.id == "swot")
        .unwrap();
    let child = canvasdive_core::create_linked_canvas(
        &parent,
        "Channels",
        item.id(),
        swot,
        &BTreeMap::new(),
    )
    .unwrap();
    // Child persisted, parent update never happened
    store.save(&child).await.unwrap();

    let unlinked = find_unlinked_children(&parent, &store).await.unwrap();
    assert_eq!(unlinked.len(), 1);
    assert_eq!(unlinked[0].id, child.id);

    link_child(&mut parent, &child).unwrap();
    store.save(&parent).await.unwrap();
    assert!(find_unlinked_children(&parent, &store)
        .await
        .unwrap()
        .is_empty());

    // Removing the source item leaves the child's back-reference dangling
    parent.remove_item("Channels", item.id()).unwrap();
    store.save(&parent).await.unwrap();
    assert_eq!(
        audit_parent_link(&child, &store).await.unwrap(),
        LinkStatus::MissingItem
    );
}

// ============================================================================
// Section generation
// ============================================================================

#[tokio::test]
async fn test_generate_and_accept_suggestions() {
    let mut canvas = business_model("Bike repair");
    let mock = MockProvider::new();
    mock.add_chunks([
        "[{\"content\": \"Commuters\", \"rationale\": \"daily riders\"},",
        " {\"content\": \"Students\"}]",
    ]);
    mock.add_response(r#"[{"content": "Repair subscriptions"}]"#);

    let tracker = Arc::new(GenerationStatusTracker::default());
    let mut events = tracker.subscribe();
    let generator = SectionGenerator::new(
        Arc::new(LlmSuggestionProvider::new(Arc::new(mock))),
        Arc::new(StaticEntitlements::new(["tok"])),
        Arc::clone(&tracker),
    )
    .with_desired_count(4);

    let mut report = generator
        .generate(
            Some("tok"),
            &canvas,
            "Mobile repair van",
            &["Customer Segments", "Revenue Streams"],
        )
        .await
        .unwrap();
    assert!(report.is_complete());
    assert!(tracker.status(canvas.id).is_none());
    assert!(events.try_recv().is_ok());

    let segments = report.section_mut("Customer Segments").unwrap();
    assert_eq!(segments.suggestions().len(), 2);
    segments.accept(0, &mut canvas).unwrap();
    segments.reject(0);

    let contents: Vec<&str> = canvas
        .section("Customer Segments")
        .unwrap()
        .items
        .iter()
        .map(|i| i.content())
        .collect();
    assert_eq!(contents, ["Commuters"]);
}

#[tokio::test]
async fn test_generation_failure_keeps_partial() {
    let canvas = business_model("Bike repair");
    let mock = MockProvider::new();
    mock.add_broken_stream(["[{\"content\": \"Tourists"], "connection reset");

    let tracker = Arc::new(GenerationStatusTracker::default());
    let generator = SectionGenerator::new(
        Arc::new(LlmSuggestionProvider::new(Arc::new(mock))),
        Arc::new(StaticEntitlements::new(["tok"])),
        Arc::clone(&tracker),
    );

    let report = generator
        .generate(Some("tok"), &canvas, "", &["Customer Segments"])
        .await
        .unwrap();
    assert_eq!(report.partial.as_deref(), Some("[{\"content\": \"Tourists"));

    let status = tracker.status(canvas.id).unwrap();
    assert!(!status.is_generating);
    assert!(status.error.is_some());
}

// ============================================================================
// Layout editing feeds export
// ============================================================================

#[test]
fn test_edited_layout_exports_with_new_geometry() {
    let swot = builtin_canvas_types()
        .into_iter()
        .find(|t| t.id == "swot")
        .unwrap();
    let mut canvas = Canvas::new("Layout test", swot);
    let mut editor = LayoutEditor::new(&canvas.canvas_layout);
    editor.set_columns(3).select_section(1);
    assert!(editor.paint(0, 2));
    canvas.canvas_layout = assert_ok!(editor.to_template());
    assert_ok!(canvas.canvas_layout.validate(canvas.sections.len()));

    // A stray cell for the same section is refused, not widened over its neighbours
    assert!(editor.paint(1, 0));
    assert!(editor.to_template().is_err());

    let exported = CanvasExporter::new().export(&canvas);
    let weaknesses = exported
        .placements
        .iter()
        .find(|p| p.section_name == "Weaknesses")
        .unwrap();
    let spec = canvas.canvas_layout.areas[1].unwrap();
    assert_eq!(spec.to_string(), "1 / 2 / 2 / 4");
    assert!(weaknesses.geometry.width > 60.0);
    assert_eq!(parse_area_string(&spec.to_string()).unwrap(), spec);
}
