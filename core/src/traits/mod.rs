pub mod cache;
pub mod memory;
pub mod provider;
pub mod tool;

pub use cache::{CacheEntry, CacheStore};
pub use memory::{ConversationTurn, Memory, Role};
pub use provider::{ChatMessage, ChatRequest, ChunkStream, Provider};
pub use tool::{Tool, ToolInvocation};
