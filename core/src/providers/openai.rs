use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::error;

use crate::providers::stream::{LineEvent, error_for_status, spawn_line_stream};
use crate::traits::{ChatMessage, ChatRequest, ChunkStream, Provider};

pub const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
pub const OPENROUTER_BASE_URL: &str = "https://openrouter.ai/api/v1";

#[derive(Debug, Serialize)]
struct OpenAIRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    stream: bool,
}

#[derive(Debug, Deserialize)]
struct OpenAIResponse {
    choices: Vec<OpenAIChoice>,
}

#[derive(Debug, Deserialize)]
struct OpenAIChoice {
    message: OpenAIResponseMessage,
}

#[derive(Debug, Deserialize)]
struct OpenAIResponseMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct StreamResponse {
    choices: Vec<StreamChoice>,
}

#[derive(Debug, Deserialize)]
struct StreamChoice {
    delta: StreamDelta,
}

#[derive(Debug, Deserialize)]
struct StreamDelta {
    content: Option<String>,
}

#[derive(Debug, Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a str,
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
}

/// Any endpoint speaking the OpenAI chat-completions dialect.
pub struct OpenAIProvider {
    client: reqwest::Client,
    vendor: String,
    api_key: String,
    model: String,
    base_url: String,
}

impl OpenAIProvider {
    pub fn new(api_key: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(120))
            .connect_timeout(std::time::Duration::from_secs(30))
            .build()
            .unwrap_or_default();

        Self {
            client,
            vendor: "openai".to_string(),
            api_key: api_key.into(),
            model: "gpt-4o".to_string(),
            base_url: OPENAI_BASE_URL.to_string(),
        }
    }

    pub fn openrouter(api_key: impl Into<String>) -> Self {
        Self::new(api_key)
            .with_vendor("openrouter")
            .with_base_url(OPENROUTER_BASE_URL)
    }

    pub fn with_vendor(mut self, vendor: impl Into<String>) -> Self {
        self.vendor = vendor.into();
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    async fn post<T: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &T,
    ) -> anyhow::Result<reqwest::Response> {
        let response = self
            .client
            .post(format!("{}/{}", self.base_url, path))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(body)
            .send()
            .await?;

        error_for_status(&self.vendor, response).await.inspect_err(|e| {
            error!("{} request to /{} failed: {}", self.vendor, path, e);
        })
    }

    fn parse_stream_line(line: &str) -> LineEvent {
        let Some(data) = line.trim().strip_prefix("data:") else {
            return LineEvent::Skip;
        };
        let data = data.trim();

        if data == "[DONE]" {
            return LineEvent::Done;
        }

        match serde_json::from_str::<StreamResponse>(data) {
            Ok(response) => response
                .choices
                .into_iter()
                .next()
                .and_then(|c| c.delta.content)
                .filter(|c| !c.is_empty())
                .map(LineEvent::Chunk)
                .unwrap_or(LineEvent::Skip),
            Err(_) => LineEvent::Skip,
        }
    }
}

#[async_trait]
impl Provider for OpenAIProvider {
    fn vendor(&self) -> &str {
        &self.vendor
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn complete(&self, request: ChatRequest<'_>) -> anyhow::Result<String> {
        let body = OpenAIRequest {
            model: request.model,
            messages: request.messages,
            stream: false,
        };

        let response: OpenAIResponse = self.post("chat/completions", &body).await?.json().await?;

        let choice = response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| anyhow::anyhow!("No choices in response"))?;

        match choice.message.content {
            Some(content) if !content.trim().is_empty() => Ok(content),
            _ => Err(anyhow::anyhow!("Empty response from {} API", self.vendor)),
        }
    }

    async fn embed(&self, text: &str) -> anyhow::Result<Vec<f32>> {
        let body = EmbeddingRequest {
            model: &self.model,
            input: text,
        };

        let response: EmbeddingResponse = self.post("embeddings", &body).await?.json().await?;

        response
            .data
            .into_iter()
            .next()
            .map(|d| d.embedding)
            .ok_or_else(|| anyhow::anyhow!("No embedding in response"))
    }

    async fn complete_stream(&self, request: ChatRequest<'_>) -> anyhow::Result<ChunkStream> {
        let body = OpenAIRequest {
            model: request.model,
            messages: request.messages,
            stream: true,
        };

        let response = self.post("chat/completions", &body).await?;
        Ok(spawn_line_stream(response, Self::parse_stream_line))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_sse_lines() {
        let line = r#"data: {"choices":[{"delta":{"content":"Hel"}}]}"#;
        assert_eq!(
            OpenAIProvider::parse_stream_line(line),
            LineEvent::Chunk("Hel".into())
        );
        assert_eq!(OpenAIProvider::parse_stream_line("data: [DONE]"), LineEvent::Done);
        assert_eq!(OpenAIProvider::parse_stream_line(": keep-alive"), LineEvent::Skip);
        assert_eq!(
            OpenAIProvider::parse_stream_line(r#"data: {"choices":[{"delta":{"role":"assistant"}}]}"#),
            LineEvent::Skip
        );
    }

    #[test]
    fn request_body_uses_plain_roles() {
        let messages = vec![ChatMessage::system("be brief"), ChatMessage::user("hi")];
        let body = OpenAIRequest {
            model: "gpt-4o",
            messages: &messages,
            stream: false,
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["messages"][0]["role"], "system");
        assert_eq!(json["messages"][1]["content"], "hi");
        assert_eq!(json["stream"], false);
    }

    #[test]
    fn openrouter_preset() {
        let provider = OpenAIProvider::openrouter("key").with_model("meta/llama");
        assert_eq!(provider.vendor(), "openrouter");
        assert_eq!(provider.model(), "meta/llama");
        assert_eq!(provider.base_url, OPENROUTER_BASE_URL);
    }
}
