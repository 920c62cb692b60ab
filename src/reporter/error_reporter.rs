use std::collections::HashMap;
use std::error::Error;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::{RwLock, RwLockWriteGuard};
use tracing::{debug, info, warn};

use super::frames::{BacktraceCapture, FrameCapture};
use crate::agent::Agent;
use crate::breakdown::BreakdownNode;
use crate::metrics::{category, unit, Metric, MetricType};
use crate::queue::KIND_METRIC;
use crate::scheduler::ReportHook;

// ─── Configuration ───────────────────────────────────────────────

/// Bucket that absorbs messages past the per-node limit.
pub const OTHER_BUCKET: &str = "Other";

/// Stand-in for errors whose text is empty.
pub const UNDEFINED_MESSAGE: &str = "Undefined";

// ─── Public types ────────────────────────────────────────────────

/// Groups captured errors into one breakdown tree per group and interval.
///
/// Each tree is rooted at the group label, descends through the call path
/// outermost frame first, and ends in a leaf per error message. `report`
/// swaps the whole group map out and ships every detached tree.
pub struct ErrorReporter {
    agent: Arc<Agent>,
    started: AtomicBool,
    frames: Box<dyn FrameCapture>,
    error_graphs: RwLock<HashMap<String, Arc<BreakdownNode>>>,
}

// ─── ErrorReporter impl ──────────────────────────────────────────

impl ErrorReporter {
    pub fn new(agent: Arc<Agent>) -> Self {
        Self::with_frame_capture(agent, BacktraceCapture)
    }

    pub fn with_frame_capture(agent: Arc<Agent>, frames: impl FrameCapture + 'static) -> Self {
        Self {
            agent,
            started: AtomicBool::new(false),
            frames: Box::new(frames),
            error_graphs: RwLock::new(HashMap::new()),
        }
    }

    /// Begins accepting errors. Calling it again while started does nothing.
    pub fn start(&self) {
        if self.started.swap(true, Ordering::SeqCst) {
            return;
        }
        self.error_graphs.write().clear();
        info!("error reporter started");
    }

    /// Stops accepting errors. Whatever the current interval holds stays
    /// until the next `report`.
    pub fn stop(&self) {
        if self.started.swap(false, Ordering::SeqCst) {
            info!("error reporter stopped");
        }
    }

    pub fn is_started(&self) -> bool {
        self.started.load(Ordering::SeqCst)
    }

    /// Number of groups recorded in the current interval.
    pub fn group_count(&self) -> usize {
        self.error_graphs.read().len()
    }

    /// Copy of one group's tree in the current interval.
    pub fn group_snapshot(&self, group: &str) -> Option<BreakdownNode> {
        self.error_graphs
            .read()
            .get(group)
            .map(|graph| BreakdownNode::clone(graph))
    }

    /// Records `error` under `group`, keyed by the caller's call path.
    /// `skip` drops that many frames above the caller.
    pub fn record_error(&self, group: &str, error: Option<&dyn Error>, skip: usize) {
        if !self.is_started() {
            return;
        }
        let Some(error) = error else {
            debug!(group, "missing error object");
            return;
        };

        let message = error.to_string();
        let frames = self.frames.capture(skip);

        // Fast path: the group already has a tree in this interval. The
        // shared lock is held through the increment so a concurrent
        // `report` cannot detach the tree halfway through.
        {
            let graphs = self.error_graphs.read();
            if let Some(graph) = graphs.get(group) {
                self.increment_error(graph, &message, &frames);
                return;
            }
        }

        // Slow path: create under the exclusive lock, re-checking for a tree
        // another recorder created meanwhile, then downgrade so the
        // increment runs under the shared lock without a gap a `report`
        // could slip into.
        let mut graphs = self.error_graphs.write();
        let graph = Arc::clone(
            graphs
                .entry(group.to_owned())
                .or_insert_with(|| Arc::new(BreakdownNode::new(group))),
        );
        let _graphs = RwLockWriteGuard::downgrade(graphs);
        self.increment_error(&graph, &message, &frames);
    }

    /// Walks the call path outermost frame first, then bumps the message
    /// leaf under the innermost frame.
    ///
    /// The message cap counts every child of that innermost node, frame
    /// children from deeper call paths included, not only message leaves.
    /// A node that already fans out into `error_message_limit` deeper
    /// frames sends even its first message to [`OTHER_BUCKET`].
    fn increment_error(&self, graph: &BreakdownNode, message: &str, frames: &[String]) {
        graph.increment(1.0, 1);

        let mut current: Option<Arc<BreakdownNode>> = None;
        for frame in frames.iter().rev() {
            let parent = current.as_deref().unwrap_or(graph);
            let node = parent.find_or_add_child(frame);
            node.increment(1.0, 1);
            current = Some(node);
        }

        let message = if message.is_empty() { UNDEFINED_MESSAGE } else { message };
        current
            .as_deref()
            .unwrap_or(graph)
            .find_or_add_bounded(message, self.agent.config().error_message_limit, OTHER_BUCKET)
            .increment(1.0, 1);
    }

    /// Closes the interval and queues one envelope per group. Returns how
    /// many envelopes were queued.
    pub fn report(&self, trigger: &str) -> usize {
        let outgoing = std::mem::take(&mut *self.error_graphs.write());

        if !self.agent.is_enabled() {
            debug!(groups = outgoing.len(), "agent disabled, discarding error profiles");
            return 0;
        }

        let duration = self.agent.config().report_interval_secs;
        let mut queued = 0;

        for (group, graph) in outgoing {
            let graph =
                Arc::try_unwrap(graph).unwrap_or_else(|shared| BreakdownNode::clone(&shared));

            let mut metric = Metric::new(
                &self.agent,
                MetricType::State,
                category::ERROR_PROFILE,
                &group,
                unit::NONE,
            );
            metric.create_measurement(trigger, graph.measurement(), duration, Some(graph));

            match self.agent.queue().add_message(KIND_METRIC, metric.to_envelope()) {
                Ok(()) => queued += 1,
                Err(err) => warn!(group = %group, error = %err, "dropping error profile"),
            }
        }

        debug!(trigger, queued, "error profiles reported");
        queued
    }
}

impl ReportHook for ErrorReporter {
    fn report(&self, trigger: &str) {
        ErrorReporter::report(self, trigger);
    }
}
