use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tokio_stream::wrappers::IntervalStream;
use tokio_stream::StreamExt;
use tracing::info;

use crate::metrics::trigger;

/// Something that can be flushed on demand. The scheduler decides when;
/// the hook only honors the trigger label it is given.
pub trait ReportHook: Send + Sync + 'static {
    fn report(&self, trigger: &str);
}

// ─── Interval scheduler ──────────────────────────────────────────

/// Fires `report("timer")` on a fixed period from a Tokio task, and
/// `report("anomaly")` whenever asked.
pub struct IntervalScheduler {
    hook: Arc<dyn ReportHook>,
    period: Duration,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl IntervalScheduler {
    pub fn new(hook: Arc<dyn ReportHook>, period: Duration) -> Self {
        Self {
            hook,
            period,
            task: Mutex::new(None),
        }
    }

    /// Spawns the timer task. Must be called inside a Tokio runtime.
    /// Starting an already running scheduler does nothing.
    pub fn start(&self) {
        let mut task = self.task.lock();
        if task.is_some() {
            return;
        }

        let hook = Arc::clone(&self.hook);
        // first tick one full period from now, not immediately
        let start = tokio::time::Instant::now() + self.period;
        let interval = tokio::time::interval_at(start, self.period);

        *task = Some(tokio::spawn(async move {
            let mut ticks = IntervalStream::new(interval);
            while ticks.next().await.is_some() {
                hook.report(trigger::TIMER);
            }
        }));
        info!(period_secs = self.period.as_secs(), "report scheduler started");
    }

    /// Guarantees no further timer flush fires. In-flight recording is
    /// untouched.
    pub fn stop(&self) {
        if let Some(task) = self.task.lock().take() {
            task.abort();
            info!("report scheduler stopped");
        }
    }

    pub fn is_running(&self) -> bool {
        self.task.lock().is_some()
    }

    /// Out-of-band flush, outside the regular period.
    pub fn trigger_anomaly(&self) {
        self.hook.report(trigger::ANOMALY);
    }
}

impl Drop for IntervalScheduler {
    fn drop(&mut self) {
        if let Some(task) = self.task.get_mut().take() {
            task.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Recorded(Mutex<Vec<String>>);

    impl ReportHook for Recorded {
        fn report(&self, trigger: &str) {
            self.0.lock().push(trigger.to_owned());
        }
    }

    #[tokio::test(start_paused = true)]
    async fn fires_once_per_period() {
        let hook = Arc::new(Recorded::default());
        let scheduler = IntervalScheduler::new(hook.clone(), Duration::from_secs(60));
        scheduler.start();
        scheduler.start();

        tokio::time::sleep(Duration::from_secs(59)).await;
        assert!(hook.0.lock().is_empty());

        tokio::time::sleep(Duration::from_secs(62)).await;
        assert_eq!(*hook.0.lock(), ["timer", "timer"]);
    }

    #[tokio::test(start_paused = true)]
    async fn stop_prevents_further_flushes() {
        let hook = Arc::new(Recorded::default());
        let scheduler = IntervalScheduler::new(hook.clone(), Duration::from_secs(10));
        scheduler.start();

        tokio::time::sleep(Duration::from_secs(11)).await;
        scheduler.stop();
        assert!(!scheduler.is_running());

        tokio::time::sleep(Duration::from_secs(60)).await;
        assert_eq!(hook.0.lock().len(), 1);
    }

    #[tokio::test]
    async fn anomaly_flushes_immediately() {
        let hook = Arc::new(Recorded::default());
        let scheduler = IntervalScheduler::new(hook.clone(), Duration::from_secs(60));

        scheduler.trigger_anomaly();

        assert_eq!(*hook.0.lock(), ["anomaly"]);
    }
}
