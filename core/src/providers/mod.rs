pub mod ollama;
pub mod openai;
pub mod registry;
mod stream;

pub use ollama::OllamaProvider;
pub use openai::OpenAIProvider;
pub use registry::{Credentials, ProviderConstructor, ProviderRegistry, require_api_key};
