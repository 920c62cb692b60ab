use std::path::Path;

use serde::Deserialize;

use crate::error::{AgentError, Result};

// ─── Agent configuration ─────────────────────────────────────────

#[derive(Debug, Clone, Deserialize)]
pub struct AgentConfig {
    /// Name of the monitored application; part of every metric identity.
    pub app_name: String,

    /// Deployment environment, e.g. "production" or "staging".
    #[serde(default = "default_app_environment")]
    pub app_environment: String,

    /// Host the agent runs on.
    #[serde(default = "default_host_name")]
    pub host_name: String,

    /// Master switch; reports are discarded while false.
    #[serde(default = "default_agent_enabled")]
    pub agent_enabled: bool,

    /// Seconds between scheduled error reports (1–3600).
    #[serde(default = "default_report_interval_secs")]
    pub report_interval_secs: u64,

    /// Maximum number of envelopes waiting for the transport.
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,

    /// Distinct error messages kept under one call-path node before the
    /// rest are folded into "Other".
    #[serde(default = "default_error_message_limit")]
    pub error_message_limit: usize,
}

fn default_app_environment() -> String {
    "production".into()
}
fn default_host_name() -> String {
    std::env::var("HOSTNAME").unwrap_or_else(|_| "localhost".into())
}
fn default_agent_enabled() -> bool {
    true
}
fn default_report_interval_secs() -> u64 {
    60
}
fn default_queue_capacity() -> usize {
    1000
}
fn default_error_message_limit() -> usize {
    5
}

impl AgentConfig {
    /// Defaults for everything except the application name.
    pub fn new(app_name: impl Into<String>) -> Self {
        Self {
            app_name: app_name.into(),
            app_environment: default_app_environment(),
            host_name: default_host_name(),
            agent_enabled: default_agent_enabled(),
            report_interval_secs: default_report_interval_secs(),
            queue_capacity: default_queue_capacity(),
            error_message_limit: default_error_message_limit(),
        }
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json(&raw)
    }

    pub fn validate(&self) -> Result<()> {
        if self.app_name.trim().is_empty() {
            return Err(AgentError::InvalidConfig("app_name must not be empty".into()));
        }
        if self.report_interval_secs == 0 || self.report_interval_secs > 3600 {
            return Err(AgentError::InvalidConfig(
                "report_interval_secs must be between 1 and 3600".into(),
            ));
        }
        if self.queue_capacity == 0 {
            return Err(AgentError::InvalidConfig(
                "queue_capacity must be greater than 0".into(),
            ));
        }
        if self.error_message_limit == 0 {
            return Err(AgentError::InvalidConfig(
                "error_message_limit must be greater than 0".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_fill_missing_fields() {
        let config = AgentConfig::from_json(r#"{"app_name": "checkout"}"#).unwrap();

        assert_eq!(config.app_name, "checkout");
        assert_eq!(config.app_environment, "production");
        assert!(config.agent_enabled);
        assert_eq!(config.report_interval_secs, 60);
        assert_eq!(config.queue_capacity, 1000);
        assert_eq!(config.error_message_limit, 5);
    }

    #[test]
    fn rejects_out_of_range_interval() {
        let err = AgentConfig::from_json(r#"{"app_name": "x", "report_interval_secs": 0}"#)
            .unwrap_err();
        assert!(matches!(err, AgentError::InvalidConfig(_)));
    }

    #[test]
    fn rejects_missing_app_name() {
        let err = AgentConfig::from_json("{}").unwrap_err();
        assert!(matches!(err, AgentError::ConfigParse(_)));
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = AgentConfig::from_file("/nonexistent/agent.json").unwrap_err();
        assert!(matches!(err, AgentError::ConfigIo(_)));
    }
}
