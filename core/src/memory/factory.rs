use std::sync::Arc;

use crate::config::MemoryConfig;
use crate::memory::{
    ExpiringMemory, MemoryFactory, SessionMemoryManager, ShortMemoryBuffer, UnboundedMemory,
};
use crate::traits::Memory;

pub fn create_memory(config: &MemoryConfig) -> Arc<dyn Memory> {
    let base: Arc<dyn Memory> = match config.max_turns {
        Some(max_turns) => Arc::new(ShortMemoryBuffer::new(max_turns)),
        None => Arc::new(UnboundedMemory::new()),
    };

    match config.ttl() {
        Some(ttl) => Arc::new(ExpiringMemory::new(base, ttl)),
        None => base,
    }
}

pub fn session_factory(config: &MemoryConfig) -> MemoryFactory {
    let config = *config;
    Arc::new(move || create_memory(&config))
}

pub fn create_session_manager(config: &MemoryConfig) -> Arc<SessionMemoryManager> {
    let factory = session_factory(config);
    Arc::new(match config.max_sessions {
        Some(max) => SessionMemoryManager::with_max_sessions(factory, max),
        None => SessionMemoryManager::unbounded(factory),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::session::DEFAULT_MAX_SESSIONS;

    #[test]
    fn factory_picks_variant() {
        let config = MemoryConfig {
            max_turns: Some(3),
            ..Default::default()
        };
        assert_eq!(create_memory(&config).name(), "short_buffer");

        assert_eq!(create_memory(&MemoryConfig::default()).name(), "unbounded");

        let config = MemoryConfig {
            max_turns: Some(3),
            ttl_seconds: Some(60),
            ..Default::default()
        };
        assert_eq!(create_memory(&config).name(), "expiring");
    }

    #[tokio::test]
    async fn session_manager_uses_configured_bound() {
        let config = MemoryConfig {
            max_turns: Some(1),
            max_sessions: Some(1),
            ..Default::default()
        };
        let manager = create_session_manager(&config);
        manager.session("a").unwrap();
        manager.session("b").unwrap();
        assert_eq!(manager.session_ids().unwrap(), vec!["b"]);
    }

    #[test]
    fn default_config_caps_sessions() {
        let manager = create_session_manager(&MemoryConfig::default());
        for i in 0..=DEFAULT_MAX_SESSIONS {
            manager.session(&format!("s{}", i)).unwrap();
        }
        assert_eq!(manager.len(), DEFAULT_MAX_SESSIONS);
    }
}
