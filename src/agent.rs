use std::sync::atomic::{AtomicBool, Ordering};

use crate::config::AgentConfig;
use crate::queue::MessageQueue;

/// Process-wide context shared by every reporter: identity, enablement
/// and the outbound queue.
#[derive(Debug)]
pub struct Agent {
    config: AgentConfig,
    enabled: AtomicBool,
    queue: MessageQueue,
}

impl Agent {
    pub fn new(config: AgentConfig) -> Self {
        Self {
            enabled: AtomicBool::new(config.agent_enabled),
            queue: MessageQueue::new(config.queue_capacity),
            config,
        }
    }

    pub fn config(&self) -> &AgentConfig {
        &self.config
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Relaxed)
    }

    pub fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::Relaxed);
    }

    pub fn uuid(&self) -> String {
        uuid::Uuid::new_v4().to_string()
    }

    pub fn queue(&self) -> &MessageQueue {
        &self.queue
    }
}
