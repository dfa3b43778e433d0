use async_stream::try_stream;
use futures_util::stream::BoxStream;
use futures_util::{Stream, StreamExt};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::agent::{ContextBuilder, ToolRegistry};
use crate::cache::Fingerprint;
use crate::error::{Error, Result};
use crate::traits::{
    CacheStore, ChatMessage, ChatRequest, ConversationTurn, Memory, Provider,
};

struct Prepared {
    messages: Vec<ChatMessage>,
    model: String,
    fingerprint: Fingerprint,
}

enum Plan {
    /// Answered by a tool or the cache; nothing to send upstream.
    Ready(String),
    Call(Prepared),
}

/// Runs one chat exchange through tool dispatch, memory, cache and
/// provider, then commits the turn pair.
///
/// Only the commit step mutates shared state, so any error before it
/// leaves memory and cache as they were.
pub struct Orchestrator {
    provider: Arc<dyn Provider>,
    embedder: Option<Arc<dyn Provider>>,
    context_builder: ContextBuilder,
    tools: Arc<ToolRegistry>,
    memory: Option<Arc<dyn Memory>>,
    cache: Option<Arc<dyn CacheStore>>,
    cache_ttl: Option<Duration>,
    commit_lock: Mutex<()>,
}

impl Orchestrator {
    pub fn new(provider: Arc<dyn Provider>) -> Self {
        Self {
            provider,
            embedder: None,
            context_builder: ContextBuilder::new(),
            tools: Arc::new(ToolRegistry::new()),
            memory: None,
            cache: None,
            cache_ttl: None,
            commit_lock: Mutex::new(()),
        }
    }

    pub fn with_tools(mut self, tools: Arc<ToolRegistry>) -> Self {
        self.tools = tools;
        self
    }

    pub fn with_memory(mut self, memory: Arc<dyn Memory>) -> Self {
        self.memory = Some(memory);
        self
    }

    pub fn with_cache(mut self, cache: Arc<dyn CacheStore>) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn with_cache_ttl(mut self, ttl: Option<Duration>) -> Self {
        self.cache_ttl = ttl;
        self
    }

    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.context_builder = self.context_builder.with_system_prompt(prompt);
        self
    }

    pub fn with_embedder(mut self, embedder: Arc<dyn Provider>) -> Self {
        self.embedder = Some(embedder);
        self
    }

    pub fn provider(&self) -> &Arc<dyn Provider> {
        &self.provider
    }

    pub fn memory(&self) -> Option<&Arc<dyn Memory>> {
        self.memory.as_ref()
    }

    pub async fn history(&self) -> Result<Vec<ConversationTurn>> {
        match &self.memory {
            Some(memory) => memory.history().await.map_err(memory_error),
            None => Ok(Vec::new()),
        }
    }

    pub async fn clear_memory(&self) -> Result<()> {
        if let Some(memory) = &self.memory {
            let _guard = self.commit_lock.lock().await;
            memory.clear().await.map_err(memory_error)?;
        }
        Ok(())
    }

    pub async fn chat(&self, message: &str, model_override: Option<&str>) -> Result<String> {
        match self.plan(message, model_override).await? {
            Plan::Ready(content) => {
                self.commit(message, &content, None).await?;
                Ok(content)
            }
            Plan::Call(prepared) => {
                let request = ChatRequest {
                    messages: &prepared.messages,
                    model: &prepared.model,
                };
                let response = self
                    .provider
                    .complete(request)
                    .await
                    .map_err(Error::Provider)?;

                self.commit(message, &response, Some(&prepared.fingerprint))
                    .await?;
                Ok(response)
            }
        }
    }

    /// Same pipeline as [`chat`](Self::chat), yielding provider chunks as
    /// they arrive. The commit runs only once the stream is exhausted; a
    /// stream dropped early commits nothing.
    pub fn stream_chat<'a>(
        &'a self,
        message: &'a str,
        model_override: Option<&'a str>,
    ) -> BoxStream<'a, Result<String>> {
        self.chunks(message, model_override).boxed()
    }

    fn chunks<'a>(
        &'a self,
        message: &'a str,
        model_override: Option<&'a str>,
    ) -> impl Stream<Item = Result<String>> + Send + 'a {
        try_stream! {
            match self.plan(message, model_override).await? {
                Plan::Ready(content) => {
                    yield content.clone();
                    self.commit(message, &content, None).await?;
                }
                Plan::Call(prepared) => {
                    let request = ChatRequest {
                        messages: &prepared.messages,
                        model: &prepared.model,
                    };
                    let mut chunks = self
                        .provider
                        .complete_stream(request)
                        .await
                        .map_err(Error::Provider)?;

                    let mut buffer = String::new();
                    while let Some(chunk) = chunks.next().await {
                        let chunk = chunk.map_err(Error::Provider)?;
                        buffer.push_str(&chunk);
                        yield chunk;
                    }

                    self.commit(message, &buffer, Some(&prepared.fingerprint)).await?;
                }
            }
        }
    }

    /// Embeddings never touch memory or cache.
    pub async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.embedder
            .as_ref()
            .unwrap_or(&self.provider)
            .embed(text)
            .await
            .map_err(Error::Provider)
    }

    async fn plan(&self, message: &str, model_override: Option<&str>) -> Result<Plan> {
        if let Some(invocation) = self.tools.dispatch(message).await {
            let invocation = invocation?;
            debug!("Answered by tool '{}'", invocation.tool_id);
            return Ok(Plan::Ready(invocation.output_text));
        }

        let prepared = self.prepare(message, model_override).await?;

        if let Some(cached) = self.lookup_cache(&prepared.fingerprint).await {
            return Ok(Plan::Ready(cached));
        }

        Ok(Plan::Call(prepared))
    }

    async fn prepare(&self, message: &str, model_override: Option<&str>) -> Result<Prepared> {
        let history = self.history().await?;
        let model = model_override
            .unwrap_or_else(|| self.provider.model())
            .to_string();
        let messages = self.context_builder.build_messages(&history, message);
        let fingerprint = Fingerprint::compute(self.provider.vendor(), &model, &messages);

        Ok(Prepared {
            messages,
            model,
            fingerprint,
        })
    }

    async fn lookup_cache(&self, fingerprint: &Fingerprint) -> Option<String> {
        let cache = self.cache.as_ref()?;
        match cache.get(fingerprint).await {
            Ok(Some(entry)) => {
                debug!("Cache hit for {}", fingerprint);
                Some(entry.response)
            }
            Ok(None) => {
                debug!("Cache miss for {}", fingerprint);
                None
            }
            Err(e) => {
                warn!("Cache read failed, treating as miss: {}", e);
                None
            }
        }
    }

    /// Appends the pair and, for fresh provider output, writes the cache.
    /// Both happen under one lock so concurrent commits never interleave.
    async fn commit(
        &self,
        message: &str,
        response: &str,
        fingerprint: Option<&Fingerprint>,
    ) -> Result<()> {
        let _guard = self.commit_lock.lock().await;

        if let Some(memory) = &self.memory {
            memory
                .append(
                    ConversationTurn::user(message),
                    ConversationTurn::assistant(response),
                )
                .await
                .map_err(memory_error)?;
        }

        if let (Some(cache), Some(fingerprint)) = (&self.cache, fingerprint)
            && let Err(e) = cache.put(fingerprint, response, self.cache_ttl).await
        {
            warn!("Cache write failed for {}: {}", fingerprint, e);
        }

        Ok(())
    }
}

fn memory_error(e: anyhow::Error) -> Error {
    Error::Memory(format!("{:#}", e))
}
