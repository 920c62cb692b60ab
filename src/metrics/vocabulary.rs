//! Fixed vocabulary shared by every metric the agent emits.

use serde::Serialize;

/// What kind of time series a metric is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MetricType {
    State,
    Counter,
    Profile,
    Trace,
}

impl MetricType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::State => "state",
            Self::Counter => "counter",
            Self::Profile => "profile",
            Self::Trace => "trace",
        }
    }
}

pub mod category {
    pub const CPU: &str = "cpu";
    pub const MEMORY: &str = "memory";
    pub const GC: &str = "gc";
    pub const RUNTIME: &str = "runtime";
    pub const CPU_PROFILE: &str = "cpu-profile";
    pub const MEMORY_PROFILE: &str = "memory-profile";
    pub const BLOCK_PROFILE: &str = "block-profile";
    pub const LOCK_PROFILE: &str = "lock-profile";
    pub const HTTP_TRACE: &str = "http-trace";
    pub const SEGMENT_TRACE: &str = "segment-trace";
    pub const ERROR_PROFILE: &str = "error-profile";
}

pub mod name {
    pub const CPU_TIME: &str = "CPU time";
    pub const CPU_USAGE: &str = "CPU usage";
    pub const MAX_RSS: &str = "Max RSS";
    pub const CURRENT_RSS: &str = "Current RSS";
    pub const VM_SIZE: &str = "VM Size";
    pub const NUM_THREADS: &str = "Number of threads";
    pub const ALLOCATED: &str = "Allocated memory";
    pub const HEAP_ALLOCATION: &str = "Heap allocation";
    pub const BLOCKING_CALL_TIMES: &str = "Blocking call times";
    pub const HTTP_TRANSACTION_BREAKDOWN: &str = "HTTP transaction breakdown";
}

pub mod unit {
    pub const NONE: &str = "";
    pub const MILLISECOND: &str = "millisecond";
    pub const MICROSECOND: &str = "microsecond";
    pub const NANOSECOND: &str = "nanosecond";
    pub const BYTE: &str = "byte";
    pub const KILOBYTE: &str = "kilobyte";
    pub const PERCENT: &str = "percent";
}

/// Why a flush happened.
pub mod trigger {
    pub const TIMER: &str = "timer";
    pub const ANOMALY: &str = "anomaly";
}
