use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::error;

use crate::providers::stream::{LineEvent, error_for_status, spawn_line_stream};
use crate::traits::{ChatMessage, ChatRequest, ChunkStream, Provider};

pub const OLLAMA_BASE_URL: &str = "http://localhost:11434";

#[derive(Debug, Serialize)]
struct OllamaRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    #[serde(skip_serializing_if = "Option::is_none")]
    options: Option<OllamaOptions>,
    stream: bool,
}

#[derive(Debug, Serialize)]
struct OllamaOptions {
    temperature: f64,
}

#[derive(Debug, Deserialize)]
struct OllamaResponse {
    message: OllamaResponseMessage,
}

#[derive(Debug, Deserialize)]
struct OllamaResponseMessage {
    content: Option<String>,
    #[serde(default)]
    thinking: Option<String>,
}

#[derive(Debug, Deserialize)]
struct StreamResponse {
    message: Option<StreamMessage>,
    #[serde(default)]
    done: bool,
}

#[derive(Debug, Deserialize)]
struct StreamMessage {
    content: Option<String>,
}

#[derive(Debug, Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    input: &'a str,
}

#[derive(Debug, Deserialize)]
struct EmbedResponse {
    embeddings: Vec<Vec<f32>>,
}

pub struct OllamaProvider {
    client: reqwest::Client,
    base_url: String,
    model: String,
    temperature: Option<f64>,
}

impl OllamaProvider {
    pub fn new() -> Self {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(300))
            .connect_timeout(std::time::Duration::from_secs(30))
            .build()
            .unwrap_or_default();

        Self {
            client,
            base_url: OLLAMA_BASE_URL.to_string(),
            model: "llama3.2".to_string(),
            temperature: None,
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        let url = base_url.into();
        self.base_url = url.trim_end_matches('/').to_string();
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_temperature(mut self, temperature: f64) -> Self {
        self.temperature = Some(temperature);
        self
    }

    fn chat_body<'a>(&self, request: &ChatRequest<'a>, stream: bool) -> OllamaRequest<'a> {
        OllamaRequest {
            model: request.model,
            messages: request.messages,
            options: self.temperature.map(|temperature| OllamaOptions { temperature }),
            stream,
        }
    }

    async fn post<T: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &T,
    ) -> anyhow::Result<reqwest::Response> {
        let response = self
            .client
            .post(format!("{}/{}", self.base_url, path))
            .json(body)
            .send()
            .await?;

        error_for_status("Ollama", response).await.inspect_err(|e| {
            error!("Ollama request to /{} failed: {}", path, e);
        })
    }

    fn parse_stream_line(line: &str) -> LineEvent {
        let line = line.trim();

        if line.is_empty() {
            return LineEvent::Skip;
        }

        let Ok(response) = serde_json::from_str::<StreamResponse>(line) else {
            return LineEvent::Skip;
        };

        if let Some(content) = response.message.and_then(|m| m.content)
            && !content.is_empty()
        {
            return LineEvent::Chunk(content);
        }

        if response.done {
            LineEvent::Done
        } else {
            LineEvent::Skip
        }
    }
}

impl Default for OllamaProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Provider for OllamaProvider {
    fn vendor(&self) -> &str {
        "ollama"
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn complete(&self, request: ChatRequest<'_>) -> anyhow::Result<String> {
        let body = self.chat_body(&request, false);
        let response: OllamaResponse = self.post("api/chat", &body).await?.json().await?;

        let message = response.message;
        match message.content {
            Some(content) if !content.is_empty() => Ok(content),
            _ => match message.thinking {
                Some(thinking) if !thinking.is_empty() => Err(anyhow::anyhow!(
                    "Model stopped while thinking and produced no answer"
                )),
                _ => Err(anyhow::anyhow!("Empty response from Ollama")),
            },
        }
    }

    async fn embed(&self, text: &str) -> anyhow::Result<Vec<f32>> {
        let body = EmbedRequest {
            model: &self.model,
            input: text,
        };
        let response: EmbedResponse = self.post("api/embed", &body).await?.json().await?;

        response
            .embeddings
            .into_iter()
            .next()
            .ok_or_else(|| anyhow::anyhow!("No embedding in response"))
    }

    async fn complete_stream(&self, request: ChatRequest<'_>) -> anyhow::Result<ChunkStream> {
        let body = self.chat_body(&request, true);
        let response = self.post("api/chat", &body).await?;
        Ok(spawn_line_stream(response, Self::parse_stream_line))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_ndjson_lines() {
        let line = r#"{"message":{"role":"assistant","content":"Hi"},"done":false}"#;
        assert_eq!(OllamaProvider::parse_stream_line(line), LineEvent::Chunk("Hi".into()));

        let last = r#"{"message":{"role":"assistant","content":""},"done":true}"#;
        assert_eq!(OllamaProvider::parse_stream_line(last), LineEvent::Done);

        assert_eq!(OllamaProvider::parse_stream_line("garbage"), LineEvent::Skip);
        assert_eq!(OllamaProvider::parse_stream_line("   "), LineEvent::Skip);
    }

    #[test]
    fn temperature_is_optional() {
        let messages = vec![ChatMessage::user("hi")];
        let request = ChatRequest {
            messages: &messages,
            model: "llama3.2",
        };

        let plain = serde_json::to_value(OllamaProvider::new().chat_body(&request, false)).unwrap();
        assert!(plain.get("options").is_none());

        let warm = OllamaProvider::new().with_temperature(0.2);
        let json = serde_json::to_value(warm.chat_body(&request, true)).unwrap();
        assert_eq!(json["options"]["temperature"], 0.2);
        assert_eq!(json["stream"], true);
    }
}
