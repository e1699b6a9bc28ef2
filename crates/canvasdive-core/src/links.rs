//! Detection of dangling and missing parent/child links.

use canvasdive_canvas::{Canvas, CanvasRepository, CanvasSummary, Error as CanvasError};
use serde::Serialize;
use tracing::debug;

use crate::error::Result;

/// State of a child canvas's back-reference
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LinkStatus {
    /// Canvas has no parent
    Root,
    /// Parent and item both exist
    Intact,
    /// Parent canvas was deleted
    MissingParent,
    /// Parent exists but the item or its section is gone
    MissingItem,
}

impl LinkStatus {
    /// Whether the link points at something that no longer exists
    #[must_use]
    pub fn is_dangling(self) -> bool {
        matches!(self, Self::MissingParent | Self::MissingItem)
    }
}

/// Check whether `child`'s parent link still resolves
pub async fn audit_parent_link(child: &Canvas, repo: &dyn CanvasRepository) -> Result<LinkStatus> {
    let Some(link) = child.parent_link.as_ref() else {
        return Ok(LinkStatus::Root);
    };

    let parent = match repo.load(link.parent_canvas_id).await {
        Ok(parent) => parent,
        Err(CanvasError::CanvasNotFound(_)) => {
            debug!(child_id = %child.id, parent_id = %link.parent_canvas_id, "Parent canvas missing");
            return Ok(LinkStatus::MissingParent);
        }
        Err(e) => return Err(e.into()),
    };

    if parent.contains_item(&link.section_name, link.item_id) {
        Ok(LinkStatus::Intact)
    } else {
        debug!(child_id = %child.id, item_id = %link.item_id, "Parent item missing");
        Ok(LinkStatus::MissingItem)
    }
}

/// Persisted children of `parent` that its `linked_children` does not record
pub async fn find_unlinked_children(
    parent: &Canvas,
    repo: &dyn CanvasRepository,
) -> Result<Vec<CanvasSummary>> {
    let children = repo.list_children(parent.id).await?;
    Ok(children
        .into_iter()
        .filter(|c| {
            !parent
                .linked_children
                .iter()
                .any(|l| l.child_canvas_id == c.id)
        })
        .collect())
}

/// Recorded child links whose canvas no longer exists
pub async fn find_missing_children(
    parent: &Canvas,
    repo: &dyn CanvasRepository,
) -> Result<Vec<uuid::Uuid>> {
    let mut missing = Vec::new();
    for link in &parent.linked_children {
        match repo.load(link.child_canvas_id).await {
            Ok(_) => {}
            Err(CanvasError::CanvasNotFound(id)) => missing.push(id),
            Err(e) => return Err(e.into()),
        }
    }
    Ok(missing)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dive::{create_linked_canvas, link_child, SeedContent};
    use canvasdive_canvas::{builtin_canvas_types, SqliteCanvasStore};
    use sqlx::sqlite::SqlitePoolOptions;

    async fn store() -> SqliteCanvasStore {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        let store = SqliteCanvasStore::new(pool);
        store.init().await.unwrap();
        store
    }

    fn family() -> (Canvas, Canvas) {
        let types = builtin_canvas_types();
        let mut parent = Canvas::new("Coffee shop", types[0].clone());
        let item = parent.add_item("Channels", "Pop-up stalls").unwrap();
        let child = create_linked_canvas(
            &parent,
            "Channels",
            item.id(),
            types[2].clone(),
            &SeedContent::new(),
        )
        .unwrap();
        (parent, child)
    }

    #[tokio::test]
    async fn test_audit_intact_and_root() {
        let store = store().await;
        let (parent, child) = family();
        store.save(&parent).await.unwrap();

        assert_eq!(
            audit_parent_link(&child, &store).await.unwrap(),
            LinkStatus::Intact
        );
        assert_eq!(
            audit_parent_link(&parent, &store).await.unwrap(),
            LinkStatus::Root
        );
    }

    #[tokio::test]
    async fn test_audit_detects_dangling_links() {
        let store = store().await;
        let (mut parent, child) = family();
        assert_eq!(
            audit_parent_link(&child, &store).await.unwrap(),
            LinkStatus::MissingParent
        );

        let item_id = child.parent_link.as_ref().unwrap().item_id;
        parent.remove_item("Channels", item_id).unwrap();
        store.save(&parent).await.unwrap();
        let status = audit_parent_link(&child, &store).await.unwrap();
        assert_eq!(status, LinkStatus::MissingItem);
        assert!(status.is_dangling());
    }

    #[tokio::test]
    async fn test_unlinked_child_detected() {
        let store = store().await;
        let (mut parent, child) = family();
        store.save(&parent).await.unwrap();
        store.save(&child).await.unwrap();

        let unlinked = find_unlinked_children(&parent, &store).await.unwrap();
        assert_eq!(unlinked.len(), 1);
        assert_eq!(unlinked[0].id, child.id);

        link_child(&mut parent, &child).unwrap();
        assert!(find_unlinked_children(&parent, &store)
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn test_deleted_child_leaves_parent_link_dangling() {
        let store = store().await;
        let (mut parent, child) = family();
        link_child(&mut parent, &child).unwrap();
        store.save(&parent).await.unwrap();
        store.save(&child).await.unwrap();

        assert!(store.delete(child.id).await.unwrap());
        let reloaded = store.load(parent.id).await.unwrap();
        assert_eq!(reloaded.linked_children.len(), 1);
        assert_eq!(
            find_missing_children(&reloaded, &store).await.unwrap(),
            vec![child.id]
        );
    }
}
