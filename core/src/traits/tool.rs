use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Record of one tool run. Lives for a single call only.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ToolInvocation {
    pub tool_id: String,
    pub input_text: String,
    pub output_text: String,
}

/// A deterministic handler that can answer a message without the provider.
/// Implementations must be side-effect free: their output is never cached.
#[async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &str;

    fn description(&self) -> &str;

    fn matches(&self, message: &str) -> bool;

    async fn run(&self, message: &str) -> anyhow::Result<String>;
}
