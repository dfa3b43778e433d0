use crate::traits::{ChatMessage, ConversationTurn};

/// Folds conversation history and the new message into a provider request.
#[derive(Debug, Clone, Default)]
pub struct ContextBuilder {
    pub system_prompt: Option<String>,
}

impl ContextBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        let prompt = prompt.into();
        self.system_prompt = (!prompt.trim().is_empty()).then_some(prompt);
        self
    }

    pub fn build_messages(
        &self,
        history: &[ConversationTurn],
        current_message: &str,
    ) -> Vec<ChatMessage> {
        let mut messages = Vec::with_capacity(history.len() + 2);
        if let Some(prompt) = &self.system_prompt {
            messages.push(ChatMessage::system(prompt.clone()));
        }
        messages.extend(history.iter().map(ChatMessage::from));
        messages.push(ChatMessage::user(current_message));
        messages
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn history_sits_between_system_and_user() {
        let builder = ContextBuilder::new().with_system_prompt("be brief");
        let history = vec![
            ConversationTurn::user("hi"),
            ConversationTurn::assistant("hello"),
        ];

        let messages = builder.build_messages(&history, "how are you?");
        let roles: Vec<&str> = messages.iter().map(|m| m.role.as_str()).collect();
        assert_eq!(roles, vec!["system", "user", "assistant", "user"]);
        assert_eq!(messages[3].content, "how are you?");
    }

    #[test]
    fn blank_system_prompt_is_dropped() {
        let builder = ContextBuilder::new().with_system_prompt("  ");
        let messages = builder.build_messages(&[], "hi");
        assert_eq!(messages, vec![ChatMessage::user("hi")]);
    }
}
