use std::io;

/// Errors surfaced by the agent's outer layers (configuration and the
/// outbound queue). Recording and reporting never fail.
#[derive(Debug, thiserror::Error)]
pub enum AgentError {
    #[error("cannot read config file: {0}")]
    ConfigIo(#[from] io::Error),

    #[error("cannot parse config: {0}")]
    ConfigParse(#[from] serde_json::Error),

    #[error("invalid config: {0}")]
    InvalidConfig(String),

    #[error("outbound queue full ({capacity} messages), dropping {kind}")]
    QueueFull { kind: String, capacity: usize },
}

pub type Result<T> = std::result::Result<T, AgentError>;
