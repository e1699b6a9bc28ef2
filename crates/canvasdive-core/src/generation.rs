//! Per-canvas generation status.
//!
//! The tracker is the only writer of [`GenerationStatus`]. Every `begin` hands
//! out a [`GenerationRun`] token; mutations made with a token that is no longer
//! the canvas's active run are ignored, so late responses from a cleared or
//! superseded run never touch current state.

use dashmap::DashMap;
use serde::Serialize;
use std::collections::BTreeSet;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::broadcast;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::{Error, Result};

/// Status of in-flight generation for one canvas
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct GenerationStatus {
    /// Whether a run is active
    pub is_generating: bool,
    /// Section currently being generated
    pub current_section: Option<String>,
    /// Sections finished in this run
    pub completed_sections: BTreeSet<String>,
    /// Failure message for this run
    pub error: Option<String>,
}

/// Token identifying one generation run for a canvas
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GenerationRun {
    /// Canvas being generated
    pub canvas_id: Uuid,
    /// Monotonic run number
    pub run_id: u64,
}

/// Status changes published to subscribers
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum GenerationEvent {
    /// A run started
    Started {
        /// Canvas ID
        canvas_id: Uuid,
        /// Run number
        run_id: u64,
    },
    /// A section began generating
    SectionStarted {
        /// Canvas ID
        canvas_id: Uuid,
        /// Section name
        section: String,
    },
    /// A section finished
    SectionCompleted {
        /// Canvas ID
        canvas_id: Uuid,
        /// Section name
        section: String,
    },
    /// The run failed
    Failed {
        /// Canvas ID
        canvas_id: Uuid,
        /// Sanitized message
        error: String,
    },
    /// Status was removed
    Cleared {
        /// Canvas ID
        canvas_id: Uuid,
    },
}

impl GenerationEvent {
    /// Canvas the event belongs to
    #[must_use]
    pub fn canvas_id(&self) -> Uuid {
        match self {
            Self::Started { canvas_id, .. }
            | Self::SectionStarted { canvas_id, .. }
            | Self::SectionCompleted { canvas_id, .. }
            | Self::Failed { canvas_id, .. }
            | Self::Cleared { canvas_id } => *canvas_id,
        }
    }
}

#[derive(Debug)]
struct Entry {
    run_id: u64,
    status: GenerationStatus,
}

/// Owns generation status for every canvas in the process
#[derive(Debug)]
pub struct GenerationStatusTracker {
    entries: DashMap<Uuid, Entry>,
    next_run: AtomicU64,
    events: broadcast::Sender<GenerationEvent>,
}

impl Default for GenerationStatusTracker {
    fn default() -> Self {
        Self::new(256)
    }
}

impl GenerationStatusTracker {
    /// Create a tracker whose event channel buffers `capacity` events
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (events, _) = broadcast::channel(capacity);
        Self {
            entries: DashMap::new(),
            next_run: AtomicU64::new(1),
            events,
        }
    }

    /// Subscribe to status events. Slow subscribers lag rather than block.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<GenerationEvent> {
        self.events.subscribe()
    }

    fn publish(&self, event: GenerationEvent) {
        // No subscribers is fine
        let _ = self.events.send(event);
    }

    /// Start a run, superseding any previous one for the canvas
    pub fn begin(&self, canvas_id: Uuid) -> GenerationRun {
        let run_id = self.next_run.fetch_add(1, Ordering::Relaxed);
        let previous = self.entries.insert(
            canvas_id,
            Entry {
                run_id,
                status: GenerationStatus {
                    is_generating: true,
                    ..Default::default()
                },
            },
        );
        if let Some(prev) = previous.filter(|p| p.status.is_generating) {
            debug!(%canvas_id, superseded = prev.run_id, "Superseding active generation run");
        }
        info!(%canvas_id, run_id, "Generation started");
        self.publish(GenerationEvent::Started { canvas_id, run_id });
        GenerationRun { canvas_id, run_id }
    }

    /// Whether `run` is still the canvas's active run
    #[must_use]
    pub fn is_current(&self, run: &GenerationRun) -> bool {
        self.entries
            .get(&run.canvas_id)
            .is_some_and(|e| e.run_id == run.run_id)
    }

    /// Fail with [`Error::StaleRun`] unless `run` is active
    pub fn ensure_current(&self, run: &GenerationRun) -> Result<()> {
        if self.is_current(run) {
            Ok(())
        } else {
            Err(Error::StaleRun)
        }
    }

    fn update<F>(&self, run: &GenerationRun, apply: F) -> bool
    where
        F: FnOnce(&mut GenerationStatus),
    {
        match self.entries.get_mut(&run.canvas_id) {
            Some(mut entry) if entry.run_id == run.run_id => {
                apply(&mut entry.status);
                true
            }
            _ => {
                debug!(
                    canvas_id = %run.canvas_id,
                    run_id = run.run_id,
                    "Ignoring update from stale generation run"
                );
                false
            }
        }
    }

    /// Mark `section` as being generated. Returns false for a stale run.
    pub fn start_section(&self, run: &GenerationRun, section: &str) -> bool {
        let applied = self.update(run, |s| s.current_section = Some(section.to_string()));
        if applied {
            self.publish(GenerationEvent::SectionStarted {
                canvas_id: run.canvas_id,
                section: section.to_string(),
            });
        }
        applied
    }

    /// Move `section` into the completed set. Returns false for a stale run.
    pub fn complete_section(&self, run: &GenerationRun, section: &str) -> bool {
        let applied = self.update(run, |s| {
            s.completed_sections.insert(section.to_string());
            if s.current_section.as_deref() == Some(section) {
                s.current_section = None;
            }
        });
        if applied {
            self.publish(GenerationEvent::SectionCompleted {
                canvas_id: run.canvas_id,
                section: section.to_string(),
            });
        }
        applied
    }

    /// Record a failure and stop generating. Completed sections are kept.
    pub fn fail(&self, run: &GenerationRun, message: impl Into<String>) -> bool {
        let message = message.into();
        let applied = self.update(run, |s| {
            s.error = Some(message.clone());
            s.is_generating = false;
            s.current_section = None;
        });
        if applied {
            warn!(canvas_id = %run.canvas_id, error = %message, "Generation failed");
            self.publish(GenerationEvent::Failed {
                canvas_id: run.canvas_id,
                error: message,
            });
        }
        applied
    }

    /// Finish a run after every section completed, clearing its status
    pub fn finish(&self, run: &GenerationRun) -> bool {
        let removed = self
            .entries
            .remove_if(&run.canvas_id, |_, e| e.run_id == run.run_id)
            .is_some();
        if removed {
            info!(canvas_id = %run.canvas_id, run_id = run.run_id, "Generation finished");
            self.publish(GenerationEvent::Cleared {
                canvas_id: run.canvas_id,
            });
        }
        removed
    }

    /// Drop all status for a canvas, invalidating its active run
    pub fn clear(&self, canvas_id: Uuid) -> bool {
        let removed = self.entries.remove(&canvas_id).is_some();
        if removed {
            debug!(%canvas_id, "Generation status cleared");
            self.publish(GenerationEvent::Cleared { canvas_id });
        }
        removed
    }

    /// Snapshot of a canvas's status
    #[must_use]
    pub fn status(&self, canvas_id: Uuid) -> Option<GenerationStatus> {
        self.entries.get(&canvas_id).map(|e| e.status.clone())
    }

    /// Whether `section` may start generating without overlapping an active run
    #[must_use]
    pub fn is_section_busy(&self, canvas_id: Uuid, section: &str) -> bool {
        self.entries.get(&canvas_id).is_some_and(|e| {
            e.status.is_generating && e.status.current_section.as_deref() == Some(section)
        })
    }

    /// Number of canvases with status
    #[must_use]
    pub fn tracked_count(&self) -> usize {
        self.entries.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_section_lifecycle() {
        let tracker = GenerationStatusTracker::default();
        let canvas_id = Uuid::new_v4();

        let run = tracker.begin(canvas_id);
        assert!(tracker.start_section(&run, "X"));
        assert!(tracker.is_section_busy(canvas_id, "X"));
        assert!(tracker.complete_section(&run, "X"));

        let status = tracker.status(canvas_id).unwrap();
        assert!(status.is_generating);
        assert_eq!(status.current_section, None);
        assert_eq!(status.completed_sections, BTreeSet::from(["X".to_string()]));
        assert_eq!(status.error, None);

        assert!(tracker.clear(canvas_id));
        assert!(tracker.status(canvas_id).is_none());
    }

    #[test]
    fn test_begin_resets_previous_state() {
        let tracker = GenerationStatusTracker::default();
        let canvas_id = Uuid::new_v4();

        let first = tracker.begin(canvas_id);
        tracker.complete_section(&first, "A");
        tracker.fail(&first, "boom");

        let second = tracker.begin(canvas_id);
        let status = tracker.status(canvas_id).unwrap();
        assert!(status.is_generating);
        assert!(status.completed_sections.is_empty());
        assert_eq!(status.error, None);
        assert_ne!(first.run_id, second.run_id);
    }

    #[test]
    fn test_stale_run_after_clear_is_ignored() {
        let tracker = GenerationStatusTracker::default();
        let canvas_id = Uuid::new_v4();

        let old = tracker.begin(canvas_id);
        tracker.start_section(&old, "A");
        tracker.clear(canvas_id);
        let current = tracker.begin(canvas_id);

        assert!(!tracker.is_current(&old));
        assert!(matches!(tracker.ensure_current(&old), Err(Error::StaleRun)));
        assert!(!tracker.complete_section(&old, "A"));
        assert!(!tracker.fail(&old, "late failure"));
        assert!(!tracker.finish(&old));

        let status = tracker.status(canvas_id).unwrap();
        assert!(status.completed_sections.is_empty());
        assert_eq!(status.error, None);
        assert!(tracker.is_current(&current));
    }

    #[test]
    fn test_fail_keeps_completed_sections() {
        let tracker = GenerationStatusTracker::default();
        let canvas_id = Uuid::new_v4();

        let run = tracker.begin(canvas_id);
        tracker.complete_section(&run, "A");
        tracker.start_section(&run, "B");
        tracker.fail(&run, "upstream unavailable");

        let status = tracker.status(canvas_id).unwrap();
        assert!(!status.is_generating);
        assert_eq!(status.current_section, None);
        assert!(status.completed_sections.contains("A"));
        assert_eq!(status.error.as_deref(), Some("upstream unavailable"));
    }

    #[test]
    fn test_finish_removes_status() {
        let tracker = GenerationStatusTracker::default();
        let canvas_id = Uuid::new_v4();
        let run = tracker.begin(canvas_id);
        tracker.complete_section(&run, "A");
        assert!(tracker.finish(&run));
        assert_eq!(tracker.tracked_count(), 0);
    }

    #[tokio::test]
    async fn test_events_published() {
        let tracker = GenerationStatusTracker::new(16);
        let mut rx = tracker.subscribe();
        let canvas_id = Uuid::new_v4();

        let run = tracker.begin(canvas_id);
        tracker.start_section(&run, "A");
        tracker.complete_section(&run, "A");
        tracker.clear(canvas_id);

        assert!(matches!(rx.recv().await.unwrap(), GenerationEvent::Started { .. }));
        assert!(matches!(
            rx.recv().await.unwrap(),
            GenerationEvent::SectionStarted { .. }
        ));
        assert!(matches!(
            rx.recv().await.unwrap(),
            GenerationEvent::SectionCompleted { .. }
        ));
        let last = rx.recv().await.unwrap();
        assert!(matches!(last, GenerationEvent::Cleared { .. }));
        assert_eq!(last.canvas_id(), canvas_id);
    }

    #[test]
    fn test_separate_canvases_independent() {
        let tracker = GenerationStatusTracker::default();
        let a = tracker.begin(Uuid::new_v4());
        let b = tracker.begin(Uuid::new_v4());
        tracker.fail(&a, "boom");
        assert!(tracker.status(b.canvas_id).unwrap().is_generating);
        assert_eq!(tracker.tracked_count(), 2);
    }
}
