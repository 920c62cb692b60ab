use std::sync::Arc;

use serde::Serialize;
use sha2::{Digest, Sha256};

use super::vocabulary::MetricType;
use crate::agent::Agent;
use crate::breakdown::{BreakdownNode, BreakdownSnapshot};

// ─── Public types ────────────────────────────────────────────────

/// One flushed observation of a metric.
#[derive(Debug)]
pub struct Measurement {
    pub id: String,
    pub trigger: String,
    pub value: f64,
    /// Length of the covered interval, in seconds.
    pub duration: u64,
    pub breakdown: Option<BreakdownNode>,
    /// Unix seconds at capture.
    pub timestamp: i64,
}

/// A logical time series. The id is stable across restarts for the same
/// application, environment, host, type, category, name and unit.
#[derive(Debug)]
pub struct Metric {
    agent: Arc<Agent>,
    id: String,
    metric_type: MetricType,
    category: String,
    name: String,
    unit: String,
    measurement: Option<Measurement>,
    last_value: Option<f64>,
}

/// Wire shape of a metric handed to the outbound queue.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricEnvelope {
    pub id: String,
    #[serde(rename = "type")]
    pub metric_type: MetricType,
    pub category: String,
    pub name: String,
    pub unit: String,
    pub measurement: Option<MeasurementEnvelope>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MeasurementEnvelope {
    pub id: String,
    pub trigger: String,
    pub value: f64,
    pub duration: u64,
    pub breakdown: Option<BreakdownSnapshot>,
    pub timestamp: i64,
}

// ─── Metric impl ─────────────────────────────────────────────────

impl Metric {
    pub fn new(
        agent: &Arc<Agent>,
        metric_type: MetricType,
        category: &str,
        name: &str,
        unit: &str,
    ) -> Self {
        let config = agent.config();
        let id = metric_id(&[
            config.app_name.as_str(),
            config.app_environment.as_str(),
            config.host_name.as_str(),
            metric_type.as_str(),
            category,
            name,
            unit,
        ]);

        Self {
            agent: Arc::clone(agent),
            id,
            metric_type,
            category: category.to_owned(),
            name: name.to_owned(),
            unit: unit.to_owned(),
            measurement: None,
            last_value: None,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn metric_type(&self) -> MetricType {
        self.metric_type
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn has_measurement(&self) -> bool {
        self.measurement.is_some()
    }

    pub fn measurement(&self) -> Option<&Measurement> {
        self.measurement.as_ref()
    }

    pub fn take_measurement(&mut self) -> Option<Measurement> {
        self.measurement.take()
    }

    /// Stores a pending measurement and returns it.
    ///
    /// Counters report deltas: the first call only records a baseline and
    /// returns `None`; later calls carry `value - previous value`. Every
    /// other type carries `value` as given.
    pub fn create_measurement(
        &mut self,
        trigger: &str,
        value: f64,
        duration: u64,
        breakdown: Option<BreakdownNode>,
    ) -> Option<&Measurement> {
        let value = if self.metric_type == MetricType::Counter {
            let previous = self.last_value.replace(value)?;
            value - previous
        } else {
            value
        };

        self.measurement = Some(Measurement {
            id: self.agent.uuid(),
            trigger: trigger.to_owned(),
            value,
            duration,
            breakdown,
            timestamp: chrono::Utc::now().timestamp(),
        });
        self.measurement.as_ref()
    }

    pub fn to_envelope(&self) -> MetricEnvelope {
        MetricEnvelope {
            id: self.id.clone(),
            metric_type: self.metric_type,
            category: self.category.clone(),
            name: self.name.clone(),
            unit: self.unit.clone(),
            measurement: self.measurement.as_ref().map(|m| MeasurementEnvelope {
                id: m.id.clone(),
                trigger: m.trigger.clone(),
                value: m.value,
                duration: m.duration,
                breakdown: m.breakdown.as_ref().map(BreakdownNode::snapshot),
                timestamp: m.timestamp,
            }),
        }
    }
}

/// Hex SHA-256 over the identity fields, NUL-separated so that adjacent
/// fields cannot run into each other.
fn metric_id(fields: &[&str]) -> String {
    let mut hasher = Sha256::new();
    for field in fields {
        hasher.update(field.as_bytes());
        hasher.update([0u8]);
    }
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AgentConfig;
    use crate::metrics::{category, name, trigger, unit};

    fn agent(host: &str) -> Arc<Agent> {
        let mut config = AgentConfig::new("checkout");
        config.host_name = host.into();
        Arc::new(Agent::new(config))
    }

    #[test]
    fn id_is_stable_for_same_identity() {
        let cpu_usage = |host: &str| {
            Metric::new(
                &agent(host),
                MetricType::State,
                category::CPU,
                name::CPU_USAGE,
                unit::PERCENT,
            )
        };
        let a = cpu_usage("web-1");
        let b = cpu_usage("web-1");
        let other_host = cpu_usage("web-2");

        assert_eq!(a.id(), b.id());
        assert_ne!(a.id(), other_host.id());
        assert_eq!(a.id().len(), 64);
    }

    #[test]
    fn counter_reports_delta_after_baseline() {
        let mut metric = Metric::new(
            &agent("web-1"),
            MetricType::Counter,
            category::GC,
            "Number of GCs",
            unit::NONE,
        );

        assert!(metric.create_measurement(trigger::TIMER, 100.0, 60, None).is_none());
        assert!(!metric.has_measurement());

        let m = metric.create_measurement(trigger::TIMER, 140.0, 60, None).unwrap();
        assert_eq!(m.value, 40.0);

        let m = metric.create_measurement(trigger::TIMER, 145.0, 60, None).unwrap();
        assert_eq!(m.value, 5.0);
    }

    #[test]
    fn state_reports_raw_value() {
        let mut metric = Metric::new(
            &agent("web-1"),
            MetricType::State,
            category::MEMORY,
            name::CURRENT_RSS,
            unit::KILOBYTE,
        );

        let m = metric.create_measurement(trigger::ANOMALY, 512.0, 10, None).unwrap();
        assert_eq!(m.value, 512.0);
        assert_eq!(m.trigger, "anomaly");
        assert!(!m.id.is_empty());
    }

    #[test]
    fn envelope_carries_breakdown() {
        let tree = BreakdownNode::new("db");
        tree.increment(3.0, 3);
        tree.find_or_add_child("timeout").increment(3.0, 3);

        let mut metric = Metric::new(
            &agent("web-1"),
            MetricType::State,
            category::ERROR_PROFILE,
            "db",
            unit::NONE,
        );
        metric.create_measurement(trigger::TIMER, tree.measurement(), 60, Some(tree));

        let json = serde_json::to_value(metric.to_envelope()).unwrap();
        assert_eq!(json["type"], "state");
        assert_eq!(json["category"], "error-profile");
        assert_eq!(json["measurement"]["value"], 3.0);
        assert_eq!(json["measurement"]["duration"], 60);
        assert_eq!(json["measurement"]["breakdown"]["name"], "db");
        assert_eq!(json["measurement"]["breakdown"]["children"][0]["name"], "timeout");
    }

    #[test]
    fn envelope_without_measurement_is_null() {
        let metric = Metric::new(
            &agent("web-1"),
            MetricType::Trace,
            category::HTTP_TRACE,
            "GET /",
            unit::MILLISECOND,
        );

        let json = serde_json::to_value(metric.to_envelope()).unwrap();
        assert!(json["measurement"].is_null());
        assert_eq!(json["type"], "trace");
    }
}
