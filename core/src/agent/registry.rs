use crate::error::{Error, Result};
use crate::traits::{Tool, ToolInvocation};
use std::sync::{Arc, Mutex};
use tracing::debug;

/// Tools in registration order. The first tool whose predicate accepts a
/// message handles it.
pub struct ToolRegistry {
    tools: Mutex<Vec<Arc<dyn Tool>>>,
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self {
            tools: Mutex::new(Vec::new()),
        }
    }

    pub fn register(&self, tool: Arc<dyn Tool>) {
        if let Ok(mut tools) = self.tools.lock() {
            tools.push(tool);
        }
    }

    pub fn names(&self) -> Vec<String> {
        self.tools
            .lock()
            .map(|tools| tools.iter().map(|t| t.name().to_string()).collect())
            .unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.lock().map(|t| t.is_empty()).unwrap_or(true)
    }

    fn find_match(&self, message: &str) -> Option<Arc<dyn Tool>> {
        let tools = self.tools.lock().ok()?;
        tools.iter().find(|t| t.matches(message)).cloned()
    }

    /// `None` when no tool accepts the message.
    pub async fn dispatch(&self, message: &str) -> Option<Result<ToolInvocation>> {
        let tool = self.find_match(message)?;
        debug!("Tool '{}' matched message", tool.name());

        let result = match tool.run(message).await {
            Ok(output) => Ok(ToolInvocation {
                tool_id: tool.name().to_string(),
                input_text: message.to_string(),
                output_text: output,
            }),
            Err(e) => Err(Error::ToolExecution {
                tool: tool.name().to_string(),
                message: format!("{:#}", e),
            }),
        };
        Some(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::CalculatorTool;
    use async_trait::async_trait;

    struct Keyword {
        name: &'static str,
        keyword: &'static str,
    }

    #[async_trait]
    impl Tool for Keyword {
        fn name(&self) -> &str {
            self.name
        }

        fn description(&self) -> &str {
            "answers when the keyword appears"
        }

        fn matches(&self, message: &str) -> bool {
            message.contains(self.keyword)
        }

        async fn run(&self, _message: &str) -> anyhow::Result<String> {
            if self.keyword == "boom" {
                anyhow::bail!("exploded");
            }
            Ok(format!("{} handled it", self.name))
        }
    }

    #[tokio::test]
    async fn first_registered_match_wins() {
        let registry = ToolRegistry::new();
        registry.register(Arc::new(Keyword { name: "first", keyword: "time" }));
        registry.register(Arc::new(Keyword { name: "second", keyword: "time" }));

        let invocation = registry.dispatch("what time is it").await.unwrap().unwrap();
        assert_eq!(invocation.tool_id, "first");
        assert_eq!(invocation.input_text, "what time is it");
        assert_eq!(invocation.output_text, "first handled it");
        assert_eq!(registry.names(), vec!["first", "second"]);
    }

    #[tokio::test]
    async fn no_match_falls_through() {
        let registry = ToolRegistry::new();
        registry.register(Arc::new(CalculatorTool::new()));
        assert!(registry.dispatch("hello there").await.is_none());
        assert!(registry.dispatch("Call me at 555-1234 tomorrow").await.is_none());
    }

    #[tokio::test]
    async fn failures_name_the_tool() {
        let registry = ToolRegistry::new();
        registry.register(Arc::new(Keyword { name: "bomb", keyword: "boom" }));

        let err = registry.dispatch("boom").await.unwrap().unwrap_err();
        assert!(matches!(
            err,
            Error::ToolExecution { ref tool, ref message } if tool == "bomb" && message == "exploded"
        ));
    }
}
