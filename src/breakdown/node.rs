use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;
use rand::Rng;

use super::atomic::AtomicF64;

// ─── Configuration ───────────────────────────────────────────────

/// Maximum number of raw values a node keeps for percentile estimation.
pub const RESERVOIR_SIZE: usize = 1000;

// ─── Public types ────────────────────────────────────────────────

/// One level of a named statistical rollup.
///
/// The hot counters (`measurement`, `num_samples`) are lock-free atomics.
/// The cold structure (children map, reservoir) sits behind per-node
/// reader-writer locks, so writers only contend on nodes they share.
#[derive(Debug)]
pub struct BreakdownNode {
    pub(super) name: String,
    pub(super) measurement: AtomicF64,
    pub(super) num_samples: AtomicI64,
    pub(super) reservoir: RwLock<Vec<AtomicF64>>,
    pub(super) children: RwLock<HashMap<String, Arc<BreakdownNode>>>,
}

// ─── Recording path ──────────────────────────────────────────────

impl BreakdownNode {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            measurement: AtomicF64::default(),
            num_samples: AtomicI64::new(0),
            reservoir: RwLock::new(Vec::new()),
            children: RwLock::new(HashMap::new()),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn measurement(&self) -> f64 {
        self.measurement.load()
    }

    pub fn num_samples(&self) -> i64 {
        self.num_samples.load(Ordering::Acquire)
    }

    pub fn reservoir_len(&self) -> usize {
        self.reservoir.read().len()
    }

    pub fn child_count(&self) -> usize {
        self.children.read().len()
    }

    /// Point-in-time copy of the child handles.
    pub fn children(&self) -> Vec<Arc<BreakdownNode>> {
        self.children.read().values().cloned().collect()
    }

    pub fn find_child(&self, name: &str) -> Option<Arc<BreakdownNode>> {
        self.children.read().get(name).cloned()
    }

    /// Inserts `child`, replacing any existing child with the same name.
    pub fn add_child(&self, child: BreakdownNode) -> Arc<BreakdownNode> {
        let child = Arc::new(child);
        self.children
            .write()
            .insert(child.name.clone(), Arc::clone(&child));
        child
    }

    pub fn remove_child(&self, name: &str) -> Option<Arc<BreakdownNode>> {
        self.children.write().remove(name)
    }

    /// Get-or-create. The common case is a shared-lock hit; on a miss the
    /// insert re-checks under the exclusive lock, so concurrent first
    /// touches of the same name all end up with one node.
    pub fn find_or_add_child(&self, name: &str) -> Arc<BreakdownNode> {
        if let Some(child) = self.find_child(name) {
            return child;
        }

        let mut children = self.children.write();
        Arc::clone(
            children
                .entry(name.to_owned())
                .or_insert_with(|| Arc::new(BreakdownNode::new(name))),
        )
    }

    /// Like [`find_or_add_child`](Self::find_or_add_child), but once this
    /// node holds `limit` children any new name is folded into `overflow`.
    pub fn find_or_add_bounded(
        &self,
        name: &str,
        limit: usize,
        overflow: &str,
    ) -> Arc<BreakdownNode> {
        if let Some(child) = self.find_child(name) {
            return child;
        }

        let mut children = self.children.write();
        if let Some(child) = children.get(name) {
            return Arc::clone(child);
        }
        let key = if children.len() < limit { name } else { overflow };
        Arc::clone(
            children
                .entry(key.to_owned())
                .or_insert_with(|| Arc::new(BreakdownNode::new(key))),
        )
    }

    /// Child with the largest measurement, if any.
    pub fn max_child(&self) -> Option<Arc<BreakdownNode>> {
        self.children
            .read()
            .values()
            .max_by(|a, b| a.measurement().total_cmp(&b.measurement()))
            .cloned()
    }

    /// Child with the smallest measurement, if any.
    pub fn min_child(&self) -> Option<Arc<BreakdownNode>> {
        self.children
            .read()
            .values()
            .min_by(|a, b| a.measurement().total_cmp(&b.measurement()))
            .cloned()
    }

    /// Lock-free accumulate. This is the hottest path in the agent.
    pub fn increment(&self, value: f64, count: i64) {
        self.measurement.fetch_add(value);
        self.num_samples.fetch_add(count, Ordering::AcqRel);
    }

    /// Feeds one raw value into the percentile reservoir.
    ///
    /// Until the reservoir is full values are appended under the write
    /// lock. After that a uniformly random slot is overwritten with an
    /// atomic store under the read lock. This is random replacement, not
    /// textbook reservoir sampling: late values are as likely to survive
    /// as early ones.
    pub fn update_p95(&self, value: f64) {
        let full = self.reservoir.read().len() >= RESERVOIR_SIZE;

        if full {
            let reservoir = self.reservoir.read();
            let slot = rand::thread_rng().gen_range(0..RESERVOIR_SIZE);
            if let Some(cell) = reservoir.get(slot) {
                cell.store(value);
            }
        } else {
            let mut reservoir = self.reservoir.write();
            if reservoir.len() < RESERVOIR_SIZE {
                reservoir.push(AtomicF64::new(value));
            } else {
                let slot = rand::thread_rng().gen_range(0..reservoir.len());
                reservoir[slot].store(value);
            }
        }

        self.num_samples.fetch_add(1, Ordering::AcqRel);
    }
}

/// Deep copy: new locks, new atomics, new child nodes.
impl Clone for BreakdownNode {
    fn clone(&self) -> Self {
        let copy = BreakdownNode::new(self.name.clone());
        copy.measurement.store(self.measurement());
        copy.num_samples.store(self.num_samples(), Ordering::Release);
        *copy.reservoir.write() = self
            .reservoir
            .read()
            .iter()
            .map(|cell| AtomicF64::new(cell.load()))
            .collect();

        for child in self.children() {
            copy.add_child(BreakdownNode::clone(&child));
        }
        copy
    }
}
