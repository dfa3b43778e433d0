pub mod agent;
pub mod cache;
pub mod config;
pub mod error;
pub mod memory;
pub mod providers;
pub mod tools;
pub mod traits;

pub use agent::{ContextBuilder, Orchestrator, ToolRegistry};
pub use cache::{FileCache, Fingerprint, MemoryCache, create_cache};
pub use config::*;
pub use error::{Error, Result};
pub use memory::*;
pub use providers::*;
pub use tools::*;
pub use traits::*;
