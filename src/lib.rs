//! Aggregation core of an in-process telemetry agent.
//!
//! Application threads record errors and measurements into concurrent
//! breakdown trees; a scheduler periodically detaches each interval's trees
//! and hands them, wrapped in metric envelopes, to the outbound queue.

pub mod agent;
pub mod breakdown;
pub mod config;
pub mod error;
pub mod metrics;
pub mod queue;
pub mod reporter;
pub mod scheduler;

pub use agent::Agent;
pub use breakdown::{BreakdownNode, BreakdownSnapshot};
pub use config::AgentConfig;
pub use error::{AgentError, Result};
pub use metrics::{Metric, MetricEnvelope, MetricType};
pub use queue::{Message, MessageQueue};
pub use reporter::ErrorReporter;
pub use scheduler::{IntervalScheduler, ReportHook};
