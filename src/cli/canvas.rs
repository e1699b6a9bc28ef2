//! Commands over stored canvases

use anyhow::{anyhow, Context, Result};
use canvasdive_canvas::{Canvas, CanvasExporter, CanvasRepository};
use canvasdive_core::{
    audit_parent_link, create_linked_canvas, find_missing_children, find_unlinked_children,
    format_error_for_cli, link_child, CatalogCache, LinkStatus, SeedContent, StaticCatalogSource,
};
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

use super::open_store;
use crate::config::AppConfig;

async fn canvas_type(type_id: &str) -> Result<canvasdive_canvas::CanvasType> {
    CatalogCache::new(Arc::new(StaticCatalogSource::builtin()))
        .canvas_type(type_id)
        .await
        .map_err(|e| anyhow!(format_error_for_cli(&e)))
}

pub async fn create(
    config: &AppConfig,
    type_id: &str,
    name: &str,
    description: Option<String>,
) -> Result<()> {
    let store = open_store(config).await?;
    let mut canvas = Canvas::new(name, canvas_type(type_id).await?);
    if let Some(description) = description {
        canvas = canvas.with_description(description);
    }
    store.save(&canvas).await?;
    info!(canvas_id = %canvas.id, type_id, "Canvas created");
    println!("{}", canvas.id);
    Ok(())
}

pub async fn show(config: &AppConfig, id: Uuid) -> Result<()> {
    let store = open_store(config).await?;
    let canvas = store.load(id).await?;

    println!("{} [{}]", canvas.name, canvas.canvas_type.name);
    if !canvas.description.is_empty() {
        println!("{}", canvas.description);
    }
    if let Some(link) = &canvas.parent_link {
        println!(
            "dived from {} / {} / {}",
            link.parent_canvas_id, link.section_name, link.item_id
        );
    }
    for section in canvas.sorted_sections() {
        println!("\n## {}", section.name);
        for item in &section.items {
            let children = canvas.children_of(item.id());
            if children.is_empty() {
                println!("- {}  ({})", item.content(), item.id());
            } else {
                println!(
                    "- {}  ({}) -> {} child canvas(es)",
                    item.content(),
                    item.id(),
                    children.len()
                );
            }
        }
    }

    let documents = store.list_documents(id).await?;
    if !documents.is_empty() {
        println!("\nDocuments:");
        for doc in documents {
            println!("- {} ({}, {} bytes)", doc.file_name, doc.content_type, doc.size_bytes);
        }
    }
    Ok(())
}

pub async fn add_item(config: &AppConfig, id: Uuid, section: &str, text: &str) -> Result<()> {
    let store = open_store(config).await?;
    let mut canvas = store.load(id).await?;
    let item = canvas.add_item(section, text)?;
    store.save(&canvas).await?;
    println!("{}", item.id());
    Ok(())
}

pub async fn dive(
    config: &AppConfig,
    id: Uuid,
    section: &str,
    item_id: Uuid,
    type_id: &str,
) -> Result<()> {
    let store = open_store(config).await?;
    let mut parent = store.load(id).await?;
    let chosen = canvas_type(type_id).await?;

    let child = create_linked_canvas(&parent, section, item_id, chosen, &SeedContent::new())
        .map_err(|e| anyhow!(format_error_for_cli(&e)))?;
    store.save(&child).await.context("Failed to save child canvas")?;

    link_child(&mut parent, &child).map_err(|e| anyhow!(format_error_for_cli(&e)))?;
    if let Err(e) = store.save(&parent).await {
        warn!(child_id = %child.id, error = %e, "Child saved but parent link not recorded");
        return Err(anyhow!(e).context("Failed to record link on parent; run `links` to repair"));
    }
    println!("{}", child.id);
    Ok(())
}

pub async fn export(config: &AppConfig, id: Uuid, out: &Path) -> Result<()> {
    let store = open_store(config).await?;
    let canvas = store.load(id).await?;

    let document = CanvasExporter::new()
        .with_page_size(config.export.page_width_px, config.export.page_height_px)
        .export(&canvas);
    std::fs::write(out, &document.html)
        .with_context(|| format!("Failed to write {}", out.display()))?;
    println!(
        "Exported {} sections to {} ({}x{})",
        document.placements.len(),
        out.display(),
        document.page_width,
        document.page_height
    );
    Ok(())
}

pub async fn links(config: &AppConfig, id: Uuid) -> Result<()> {
    let store = open_store(config).await?;
    let mut canvas = store.load(id).await?;

    let status = audit_parent_link(&canvas, &store).await?;
    match status {
        LinkStatus::Root => println!("parent: none"),
        LinkStatus::Intact => println!("parent: intact"),
        LinkStatus::MissingParent => println!("parent: missing (parent canvas deleted)"),
        LinkStatus::MissingItem => println!("parent: dangling (item removed)"),
    }

    for link in &canvas.linked_children {
        println!(
            "child: {} ({}) from item {}",
            link.child_canvas_name, link.child_canvas_id, link.item_id
        );
    }
    for missing in find_missing_children(&canvas, &store).await? {
        println!("child missing: {}", missing);
    }

    let unlinked = find_unlinked_children(&canvas, &store).await?;
    for child in &unlinked {
        let loaded = store.load(child.id).await?;
        link_child(&mut canvas, &loaded).map_err(|e| anyhow!(format_error_for_cli(&e)))?;
        println!("relinked: {} ({})", child.name, child.id);
    }
    if !unlinked.is_empty() {
        store.save(&canvas).await?;
    }
    Ok(())
}
