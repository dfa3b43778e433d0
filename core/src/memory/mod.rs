pub mod buffer;
pub mod expiring;
pub mod factory;
pub mod session;
pub mod unbounded;

pub use buffer::ShortMemoryBuffer;
pub use expiring::ExpiringMemory;
pub use factory::{create_memory, create_session_manager, session_factory};
pub use session::{MemoryFactory, SessionMemory, SessionMemoryManager};
pub use unbounded::UnboundedMemory;

pub(crate) fn lock_poisoned<T>(_: T) -> anyhow::Error {
    anyhow::anyhow!("memory lock poisoned")
}
