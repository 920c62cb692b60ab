pub mod metric;
pub mod vocabulary;

pub use metric::{Measurement, MeasurementEnvelope, Metric, MetricEnvelope};
pub use vocabulary::{category, name, trigger, unit, MetricType};
