use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::Serialize;

use crate::error::{AgentError, Result};
use crate::metrics::MetricEnvelope;

/// Message kind used for every metric envelope.
pub const KIND_METRIC: &str = "metric";

/// One unit of outbound work, waiting for the transport.
#[derive(Debug, Clone, Serialize)]
pub struct Message {
    pub kind: String,
    pub content: MetricEnvelope,
    pub added_at: DateTime<Utc>,
}

/// Bounded in-memory hand-off between the aggregation core and whatever
/// ships messages off-process. Once full, new messages are rejected.
#[derive(Debug)]
pub struct MessageQueue {
    capacity: usize,
    inner: Mutex<VecDeque<Message>>,
}

impl MessageQueue {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            inner: Mutex::new(VecDeque::with_capacity(capacity.min(1024))),
        }
    }

    pub fn add_message(&self, kind: &str, content: MetricEnvelope) -> Result<()> {
        let mut inner = self.inner.lock();
        if inner.len() >= self.capacity {
            return Err(AgentError::QueueFull {
                kind: kind.to_owned(),
                capacity: self.capacity,
            });
        }
        inner.push_back(Message {
            kind: kind.to_owned(),
            content,
            added_at: Utc::now(),
        });
        Ok(())
    }

    /// Takes every pending message, oldest first.
    pub fn drain(&self) -> Vec<Message> {
        self.inner.lock().drain(..).collect()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::MetricType;

    fn envelope(name: &str) -> MetricEnvelope {
        MetricEnvelope {
            id: "id".into(),
            metric_type: MetricType::State,
            category: "error-profile".into(),
            name: name.into(),
            unit: String::new(),
            measurement: None,
        }
    }

    #[test]
    fn rejects_when_full() {
        let queue = MessageQueue::new(2);
        queue.add_message(KIND_METRIC, envelope("a")).unwrap();
        queue.add_message(KIND_METRIC, envelope("b")).unwrap();

        let err = queue.add_message(KIND_METRIC, envelope("c")).unwrap_err();
        assert!(matches!(err, AgentError::QueueFull { capacity: 2, .. }));
        assert_eq!(queue.len(), 2);
    }

    #[test]
    fn drain_empties_in_order() {
        let queue = MessageQueue::new(8);
        queue.add_message(KIND_METRIC, envelope("a")).unwrap();
        queue.add_message(KIND_METRIC, envelope("b")).unwrap();

        let names: Vec<_> = queue.drain().into_iter().map(|m| m.content.name).collect();
        assert_eq!(names, ["a", "b"]);
        assert!(queue.is_empty());
    }
}
