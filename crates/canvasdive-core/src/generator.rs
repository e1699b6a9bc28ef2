//! Multi-section suggestion generation with accept/reject.
//!
//! Failures inside a run become tracker status; only problems detected before
//! the run starts (missing sections, no entitlement) are returned as errors.

use std::sync::Arc;

use canvasdive_canvas::{Canvas, SectionItem};
use tracing::{info, warn};

use crate::collaborators::{
    summarize_canvas, EntitlementChecker, SectionPrompt, Suggestion, SuggestionProvider,
    SuggestionRequest, MIN_SUGGESTIONS,
};
use crate::error::{Error, Result};
use crate::generation::{GenerationRun, GenerationStatusTracker};

/// Suggestions for one section awaiting a decision
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingSuggestions {
    /// Target section
    pub section_name: String,
    suggestions: Vec<Suggestion>,
}

impl PendingSuggestions {
    /// Create for a section
    #[must_use]
    pub fn new(section_name: impl Into<String>, suggestions: Vec<Suggestion>) -> Self {
        Self {
            section_name: section_name.into(),
            suggestions,
        }
    }

    /// Suggestions not yet accepted or rejected
    #[must_use]
    pub fn suggestions(&self) -> &[Suggestion] {
        &self.suggestions
    }

    /// Whether every suggestion has been decided
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.suggestions.is_empty()
    }

    /// Add the suggestion at `index` to the canvas as a text item
    pub fn accept(&mut self, index: usize, canvas: &mut Canvas) -> Result<SectionItem> {
        let Some(suggestion) = self.suggestions.get(index) else {
            return Err(Error::Canvas(canvasdive_canvas::Error::InvalidOrder(format!(
                "no pending suggestion at {}",
                index
            ))));
        };
        let item = canvas.add_item(&self.section_name, suggestion.content.clone())?;
        self.suggestions.remove(index);
        Ok(item)
    }

    /// Discard the suggestion at `index`. Rejecting twice is a no-op.
    pub fn reject(&mut self, index: usize) -> Option<Suggestion> {
        (index < self.suggestions.len()).then(|| self.suggestions.remove(index))
    }

    /// Accept everything still pending
    pub fn accept_all(&mut self, canvas: &mut Canvas) -> Result<Vec<SectionItem>> {
        let mut items = Vec::with_capacity(self.suggestions.len());
        while !self.suggestions.is_empty() {
            items.push(self.accept(0, canvas)?);
        }
        Ok(items)
    }
}

/// Outcome of one generation run
#[derive(Debug, Clone)]
pub struct GenerationReport {
    /// Run token
    pub run: GenerationRun,
    /// Sections that produced suggestions, in request order
    pub pending: Vec<PendingSuggestions>,
    /// Failure recorded on the tracker, if any
    pub error: Option<String>,
    /// Text streamed before the failure
    pub partial: Option<String>,
    /// The run was superseded and later responses were discarded
    pub stale: bool,
}

impl GenerationReport {
    fn new(run: GenerationRun) -> Self {
        Self {
            run,
            pending: Vec::new(),
            error: None,
            partial: None,
            stale: false,
        }
    }

    /// Whether every requested section completed
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.error.is_none() && !self.stale
    }

    /// Pending suggestions for a section
    #[must_use]
    pub fn section(&self, name: &str) -> Option<&PendingSuggestions> {
        self.pending.iter().find(|p| p.section_name == name)
    }

    /// Mutable pending suggestions for a section
    pub fn section_mut(&mut self, name: &str) -> Option<&mut PendingSuggestions> {
        self.pending.iter_mut().find(|p| p.section_name == name)
    }
}

/// Generates suggestions section by section, reporting through the tracker
pub struct SectionGenerator {
    suggestions: Arc<dyn SuggestionProvider>,
    entitlements: Arc<dyn EntitlementChecker>,
    tracker: Arc<GenerationStatusTracker>,
    desired_count: usize,
}

impl SectionGenerator {
    /// Create a generator
    #[must_use]
    pub fn new(
        suggestions: Arc<dyn SuggestionProvider>,
        entitlements: Arc<dyn EntitlementChecker>,
        tracker: Arc<GenerationStatusTracker>,
    ) -> Self {
        Self {
            suggestions,
            entitlements,
            tracker,
            desired_count: MIN_SUGGESTIONS,
        }
    }

    /// Suggestions per section, clamped by [`SuggestionRequest::new`]
    #[must_use]
    pub fn with_desired_count(mut self, desired_count: usize) -> Self {
        self.desired_count = desired_count;
        self
    }

    /// Tracker this generator reports to
    #[must_use]
    pub fn tracker(&self) -> &Arc<GenerationStatusTracker> {
        &self.tracker
    }

    /// Generate suggestions for `sections` of `canvas`, one section at a time.
    ///
    /// `focus` is the item or theme the suggestions should elaborate on. An empty
    /// `sections` slice means every section in grid order.
    pub async fn generate<S: AsRef<str>>(
        &self,
        auth_token: Option<&str>,
        canvas: &Canvas,
        focus: &str,
        sections: &[S],
    ) -> Result<GenerationReport> {
        let prompts = self.prompts(canvas, sections)?;
        if !self.entitlements.is_entitled(auth_token).await {
            return Err(Error::NotEntitled);
        }

        let summary = summarize_canvas(canvas);
        let run = self.tracker.begin(canvas.id);
        let mut report = GenerationReport::new(run);

        for prompt in prompts {
            if !self.tracker.start_section(&run, &prompt.name) {
                report.stale = true;
                return Ok(report);
            }

            let section_name = prompt.name.clone();
            let request =
                SuggestionRequest::new(summary.clone(), focus, prompt, self.desired_count);
            match self.suggestions.suggest(&request).await {
                Ok(list) => {
                    if !self.tracker.complete_section(&run, &section_name) {
                        warn!(canvas_id = %canvas.id, section = %section_name, "Discarding stale suggestions");
                        report.stale = true;
                        return Ok(report);
                    }
                    report.pending.push(PendingSuggestions::new(section_name, list));
                }
                Err(e) => {
                    let message = e.to_string();
                    if !self.tracker.fail(&run, message.clone()) {
                        report.stale = true;
                        return Ok(report);
                    }
                    report.partial = e.partial().map(str::to_string);
                    report.error = Some(message);
                    return Ok(report);
                }
            }
        }

        self.tracker.finish(&run);
        info!(canvas_id = %canvas.id, sections = report.pending.len(), "Section generation complete");
        Ok(report)
    }

    fn prompts<S: AsRef<str>>(&self, canvas: &Canvas, sections: &[S]) -> Result<Vec<SectionPrompt>> {
        let to_prompt = |name: &str| -> Result<SectionPrompt> {
            let def = canvas
                .canvas_type
                .section(name)
                .ok_or_else(|| canvasdive_canvas::Error::SectionNotFound(name.to_string()))?;
            Ok(SectionPrompt {
                name: def.name.clone(),
                placeholder: def.placeholder.clone(),
            })
        };

        if sections.is_empty() {
            canvas
                .sorted_sections()
                .iter()
                .map(|s| to_prompt(&s.name))
                .collect()
        } else {
            sections.iter().map(|s| to_prompt(s.as_ref())).collect()
        }
    }
}
