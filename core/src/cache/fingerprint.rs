use ring::digest::{SHA256, digest};
use serde::{Deserialize, Serialize};

use crate::traits::ChatMessage;

#[derive(Serialize)]
struct CanonicalRequest<'a> {
    vendor: String,
    model: String,
    messages: Vec<CanonicalMessage<'a>>,
}

#[derive(Serialize)]
struct CanonicalMessage<'a> {
    role: &'a str,
    content: &'a str,
}

/// Hex-encoded SHA-256 of the canonical request encoding.
///
/// Vendor names are case-folded the same way the provider registry folds
/// them. Model ids are only trimmed, since backends treat case as significant.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Fingerprint(String);

impl Fingerprint {
    pub fn compute(vendor: &str, model: &str, messages: &[ChatMessage]) -> Self {
        let canonical = CanonicalRequest {
            vendor: vendor.trim().to_lowercase(),
            model: model.trim().to_string(),
            messages: messages
                .iter()
                .map(|m| CanonicalMessage {
                    role: m.role.as_str(),
                    content: m.content.as_str(),
                })
                .collect(),
        };

        // Struct field order is fixed, so the encoding is stable.
        let encoded = serde_json::to_vec(&canonical).unwrap_or_default();
        let hash = digest(&SHA256, &encoded);
        Self(hash.as_ref().iter().map(|b| format!("{:02x}", b)).collect())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Only lowercase hex of the right length; anything else could escape
    /// the cache directory.
    pub fn parse(hex: &str) -> Option<Self> {
        let valid = hex.len() == 64 && hex.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'));
        valid.then(|| Self(hex.to_string()))
    }
}

impl std::fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn history() -> Vec<ChatMessage> {
        vec![
            ChatMessage::user("hello"),
            ChatMessage::assistant("hi there"),
            ChatMessage::user("what's new?"),
        ]
    }

    #[test]
    fn identical_requests_collide() {
        let a = Fingerprint::compute("openai", "gpt-4o", &history());
        let b = Fingerprint::compute("openai", "gpt-4o", &history());
        assert_eq!(a, b);
        assert_eq!(a.as_str().len(), 64);
    }

    #[test]
    fn incidental_formatting_is_ignored() {
        let a = Fingerprint::compute("openai", "gpt-4o", &history());
        let b = Fingerprint::compute(" OpenAI ", " gpt-4o ", &history());
        assert_eq!(a, b);
    }

    #[test]
    fn model_case_is_significant() {
        let messages = history();
        assert_ne!(
            Fingerprint::compute("ollama", "hf.co/Org/Model-Q4", &messages),
            Fingerprint::compute("ollama", "hf.co/org/model-q4", &messages)
        );
    }

    #[test]
    fn each_field_changes_the_key() {
        let base = Fingerprint::compute("openai", "gpt-4o", &history());

        assert_ne!(base, Fingerprint::compute("ollama", "gpt-4o", &history()));
        assert_ne!(base, Fingerprint::compute("openai", "gpt-4o-mini", &history()));

        let mut edited = history();
        edited[1].content = "hi there!".into();
        assert_ne!(base, Fingerprint::compute("openai", "gpt-4o", &edited));

        let mut reordered = history();
        reordered.swap(0, 2);
        assert_ne!(base, Fingerprint::compute("openai", "gpt-4o", &reordered));

        let mut role_swapped = history();
        role_swapped[0].role = "system".into();
        assert_ne!(base, Fingerprint::compute("openai", "gpt-4o", &role_swapped));
    }

    #[test]
    fn message_boundaries_matter() {
        let joined = vec![ChatMessage::user("ab")];
        let split = vec![ChatMessage::user("a"), ChatMessage::user("b")];
        assert_ne!(
            Fingerprint::compute("openai", "m", &joined),
            Fingerprint::compute("openai", "m", &split)
        );
    }

    #[test]
    fn parse_rejects_non_hex() {
        let fp = Fingerprint::compute("openai", "gpt-4o", &history());
        assert_eq!(Fingerprint::parse(fp.as_str()), Some(fp));
        assert!(Fingerprint::parse("../../etc/passwd").is_none());
        assert!(Fingerprint::parse("abc").is_none());
    }
}
