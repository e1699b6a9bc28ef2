//! Collaborators implemented on top of an [`LlmProvider`].
//!
//! Each one streams the model reply through a [`StreamAccumulator`], extracts
//! the JSON payload and maps anything unusable to
//! [`Error::UpstreamGeneration`] with the raw text kept as partial content.
//! Every call accumulates into its own channel; concurrent calls never share
//! progress.

use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use canvasdive_llm::util::{extract_json, sanitize_error_for_user, truncate_chars};
use canvasdive_llm::{CompletionRequest, LlmProvider, Message};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tokio::sync::watch;
use tracing::{debug, instrument};

use crate::collaborators::{
    CanvasTypeName, DiveAdvisor, DiveSuggestionRequest, Suggestion, SuggestionProvider,
    SuggestionRequest, TypeNamer, MAX_DESCRIPTION_CHARS,
};
use crate::dive::DiveSuggestionSet;
use crate::error::{Error, Result};
use crate::stream::StreamAccumulator;

const SUGGESTION_SYSTEM_PROMPT: &str = "You help people fill in strategy canvases. \
Reply with a JSON array of objects with \"content\" and \"rationale\" fields and nothing else.";

const DIVE_SYSTEM_PROMPT: &str = "You help people explore one item of a strategy canvas in depth. \
Pick the known canvas types that suit the item, best first, and seed their sections. \
If none fits well, propose a new type. Reply with JSON: \
{\"candidates\": [{\"canvas_type_id\", \"rationale\", \"seed_content\": {section: [items]}}], \
\"proposed_type\": null | {\"name\", \"sections\": [{\"name\", \"placeholder\"}], \"rationale\", \"seed_content\"}}";

const NAMING_SYSTEM_PROMPT: &str = "Name the canvas type described in this conversation. \
Reply with JSON {\"canvas_name\", \"canvas_description\"}; the description is one sentence under 100 characters.";

/// Sampling settings shared by the LLM-backed collaborators
#[derive(Debug, Clone)]
pub struct GenerationSettings {
    /// Model name, empty for the provider default
    pub model: String,
    /// Sampling temperature
    pub temperature: f32,
    /// Reply length cap
    pub max_tokens: u32,
}

impl Default for GenerationSettings {
    fn default() -> Self {
        Self {
            model: String::new(),
            temperature: 0.7,
            max_tokens: 1024,
        }
    }
}

/// Streams a completion and decodes its JSON payload
struct JsonCompleter {
    provider: Arc<dyn LlmProvider>,
    settings: GenerationSettings,
}

impl JsonCompleter {
    fn new(provider: Arc<dyn LlmProvider>, settings: GenerationSettings) -> Self {
        Self { provider, settings }
    }

    fn request(&self, system: &str, user: String) -> CompletionRequest {
        let model = if self.settings.model.is_empty() {
            self.provider.default_model().to_string()
        } else {
            self.settings.model.clone()
        };
        CompletionRequest::new(model)
            .with_message(Message::system(system))
            .with_message(Message::user(user))
            .with_temperature(self.settings.temperature)
            .with_max_tokens(self.settings.max_tokens)
    }

    async fn complete<T: DeserializeOwned>(
        &self,
        request: CompletionRequest,
        accumulator: StreamAccumulator,
    ) -> Result<T> {
        let stream = self
            .provider
            .complete_stream(request)
            .await
            .map_err(|e| Error::upstream(sanitize_error_for_user(&e.to_string())))?;
        let text = accumulator.consume(stream).await?;
        decode(&text)
    }
}

fn decode<T: DeserializeOwned>(text: &str) -> Result<T> {
    let json = extract_json(text)
        .ok_or_else(|| Error::upstream_with_partial("reply contained no JSON", text))?;
    serde_json::from_str(json).map_err(|e| {
        debug!(error = %e, "Unparseable model reply");
        Error::upstream_with_partial(format!("unparseable reply: {}", e), text)
    })
}

#[derive(Deserialize)]
#[serde(untagged)]
enum SuggestionReply {
    List(Vec<Suggestion>),
    Wrapped { suggestions: Vec<Suggestion> },
}

/// [`SuggestionProvider`] backed by a language model
pub struct LlmSuggestionProvider {
    inner: JsonCompleter,
}

impl LlmSuggestionProvider {
    /// Create with default settings
    #[must_use]
    pub fn new(provider: Arc<dyn LlmProvider>) -> Self {
        Self::with_settings(provider, GenerationSettings::default())
    }

    /// Create with explicit settings
    #[must_use]
    pub fn with_settings(provider: Arc<dyn LlmProvider>, settings: GenerationSettings) -> Self {
        Self {
            inner: JsonCompleter::new(provider, settings),
        }
    }

    /// Start a request whose raw reply can be watched as it streams in.
    ///
    /// The receiver belongs to this request alone. Dropping the future abandons the
    /// request; the receiver then keeps the last text it saw.
    pub fn suggest_streaming<'a>(
        &'a self,
        request: &'a SuggestionRequest,
    ) -> (
        watch::Receiver<String>,
        impl Future<Output = Result<Vec<Suggestion>>> + Send + 'a,
    ) {
        let accumulator = StreamAccumulator::new();
        let progress = accumulator.subscribe();
        (progress, self.suggest_into(request, accumulator))
    }

    #[instrument(skip_all, fields(section = %request.section_to_generate.name))]
    async fn suggest_into(
        &self,
        request: &SuggestionRequest,
        accumulator: StreamAccumulator,
    ) -> Result<Vec<Suggestion>> {
        let prompt = format!(
            "{}\n\nItem being explored: {}\n\nWrite {} items for the section \"{}\" ({}).",
            request.parent_canvas_summary,
            request.target_item_content,
            request.desired_count,
            request.section_to_generate.name,
            request.section_to_generate.placeholder,
        );
        let reply: SuggestionReply = self
            .inner
            .complete(self.inner.request(SUGGESTION_SYSTEM_PROMPT, prompt), accumulator)
            .await?;
        let mut suggestions = match reply {
            SuggestionReply::List(list) | SuggestionReply::Wrapped { suggestions: list } => list,
        };
        suggestions.retain(|s| !s.content.trim().is_empty());
        suggestions.truncate(request.desired_count);
        if suggestions.is_empty() {
            return Err(Error::upstream("model returned no suggestions"));
        }
        Ok(suggestions)
    }
}

#[async_trait]
impl SuggestionProvider for LlmSuggestionProvider {
    async fn suggest(&self, request: &SuggestionRequest) -> Result<Vec<Suggestion>> {
        self.suggest_into(request, StreamAccumulator::new()).await
    }
}

/// [`DiveAdvisor`] backed by a language model
pub struct LlmDiveAdvisor {
    inner: JsonCompleter,
}

impl LlmDiveAdvisor {
    /// Create with explicit settings
    #[must_use]
    pub fn new(provider: Arc<dyn LlmProvider>, settings: GenerationSettings) -> Self {
        Self {
            inner: JsonCompleter::new(provider, settings),
        }
    }
}

#[async_trait]
impl DiveAdvisor for LlmDiveAdvisor {
    async fn advise(&self, request: &DiveSuggestionRequest) -> Result<DiveSuggestionSet> {
        let types = serde_json::to_string(&request.known_types)
            .map_err(|e| Error::upstream(e.to_string()))?;
        let prompt = format!(
            "{}\n\nDive into \"{}\" from section \"{}\".\n\nKnown canvas types: {}",
            request.parent_canvas_summary,
            request.target_item_content,
            request.section_name,
            types,
        );
        self.inner
            .complete(
                self.inner.request(DIVE_SYSTEM_PROMPT, prompt),
                StreamAccumulator::new(),
            )
            .await
    }
}

/// [`TypeNamer`] backed by a language model
pub struct LlmTypeNamer {
    inner: JsonCompleter,
}

impl LlmTypeNamer {
    /// Create with explicit settings
    #[must_use]
    pub fn new(provider: Arc<dyn LlmProvider>, settings: GenerationSettings) -> Self {
        Self {
            inner: JsonCompleter::new(provider, settings),
        }
    }
}

#[async_trait]
impl TypeNamer for LlmTypeNamer {
    async fn name_canvas_type(&self, conversation_history: &[Message]) -> Result<CanvasTypeName> {
        let transcript = canvasdive_llm::message::transcript(conversation_history);
        let mut name: CanvasTypeName = self
            .inner
            .complete(
                self.inner.request(NAMING_SYSTEM_PROMPT, transcript),
                StreamAccumulator::new(),
            )
            .await?;
        name.canvas_name = name.canvas_name.trim().to_string();
        if name.canvas_name.is_empty() {
            return Err(Error::upstream("model returned an empty name"));
        }
        name.canvas_description =
            truncate_chars(name.canvas_description.trim(), MAX_DESCRIPTION_CHARS);
        Ok(name)
    }
}
