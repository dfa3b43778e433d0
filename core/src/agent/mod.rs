pub mod context;
pub mod orchestrator;
pub mod registry;

pub use context::ContextBuilder;
pub use orchestrator::Orchestrator;
pub use registry::ToolRegistry;
