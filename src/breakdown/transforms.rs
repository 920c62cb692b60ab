//! Whole-tree post-processing.
//!
//! These run once recording for an interval has stopped, against a tree
//! that has already been detached from the live recording map. They still
//! go through the node locks, but nothing else is contending for them.

use std::sync::atomic::Ordering;

use super::node::BreakdownNode;

impl BreakdownNode {
    /// Replaces `measurement` with the 95th percentile of the reservoir,
    /// then clears the reservoir. Recurses into every child.
    pub fn evaluate_p95(&self) {
        {
            let mut reservoir = self.reservoir.write();
            if !reservoir.is_empty() {
                let mut values: Vec<f64> = reservoir.iter().map(|cell| cell.load()).collect();
                values.sort_by(f64::total_cmp);

                let index = (values.len() as f64 / 100.0 * 95.0).floor() as usize;
                self.measurement.store(values[index]);

                reservoir.clear();
            }
        }

        for child in self.children() {
            child.evaluate_p95();
        }
    }

    /// Post-order: every node ends up holding its own value plus the sum
    /// of all its descendants.
    pub fn propagate(&self) {
        for child in self.children() {
            child.propagate();
            self.measurement.fetch_add(child.measurement());
            self.num_samples
                .fetch_add(child.num_samples(), Ordering::AcqRel);
        }
    }

    /// Rescales every measurement in the tree to a percentage of `total`.
    pub fn convert_to_percentage(&self, total: f64) {
        self.measurement.store(self.measurement() / total * 100.0);
        for child in self.children() {
            child.convert_to_percentage(total);
        }
    }

    /// Divides measurements by `factor`. Sample counts are divided and
    /// rounded up, so a non-zero count never collapses to zero.
    pub fn normalize(&self, factor: f64) {
        self.measurement.store(self.measurement() / factor);
        let samples = (self.num_samples() as f64 / factor).ceil() as i64;
        self.num_samples.store(samples, Ordering::Release);

        for child in self.children() {
            child.normalize(factor);
        }
    }

    /// Drops every descendant at depth `from_level` or deeper whose
    /// measurement falls outside `[min, max]`. Direct children are depth 1.
    pub fn filter(&self, from_level: usize, min: f64, max: f64) {
        self.filter_level(1, from_level, min, max);
    }

    fn filter_level(&self, current_level: usize, from_level: usize, min: f64, max: f64) {
        let survivors: Vec<_> = {
            let mut children = self.children.write();
            if current_level >= from_level {
                children.retain(|_, child| {
                    let value = child.measurement();
                    value >= min && value <= max
                });
            }
            children.values().cloned().collect()
        };

        for child in survivors {
            child.filter_level(current_level + 1, from_level, min, max);
        }
    }

    /// Keeps only subtrees whose name satisfies `predicate`, at every level.
    pub fn filter_by_name<F>(&self, predicate: &F)
    where
        F: Fn(&str) -> bool,
    {
        let survivors: Vec<_> = {
            let mut children = self.children.write();
            children.retain(|name, _| predicate(name.as_str()));
            children.values().cloned().collect()
        };

        for child in survivors {
            child.filter_by_name(predicate);
        }
    }

    /// Longest root-to-leaf path, counting this node.
    pub fn depth(&self) -> usize {
        self.children()
            .iter()
            .map(|child| child.depth())
            .max()
            .unwrap_or(0)
            + 1
    }
}

#[cfg(test)]
mod tests {
    use super::super::RESERVOIR_SIZE;
    use super::*;
    use hdrhistogram::Histogram;

    fn tree_with_children(values: &[(&str, f64)]) -> BreakdownNode {
        let root = BreakdownNode::new("root");
        for (name, value) in values {
            root.find_or_add_child(name).increment(*value, 1);
        }
        root
    }

    #[test]
    fn p95_of_full_reservoir() {
        let node = BreakdownNode::new("latency");
        // insert out of order so the sort is exercised
        for v in (1..=RESERVOIR_SIZE).rev() {
            node.update_p95(v as f64);
        }

        node.evaluate_p95();

        assert_eq!(node.measurement(), 951.0);
        assert_eq!(node.reservoir_len(), 0);
    }

    #[test]
    fn p95_recurses_and_skips_empty_reservoirs() {
        let root = BreakdownNode::new("root");
        root.increment(7.0, 1);
        let child = root.find_or_add_child("call");
        for v in 1..=20 {
            child.update_p95(v as f64);
        }

        root.evaluate_p95();

        assert_eq!(root.measurement(), 7.0);
        // floor(20 * 0.95) = 19 -> the largest value
        assert_eq!(child.measurement(), 20.0);
    }

    #[test]
    fn p95_tracks_exact_histogram_within_one_rank() {
        let node = BreakdownNode::new("latency");
        let mut hist = Histogram::<u64>::new_with_bounds(1, 1_000_000, 3).unwrap();
        // 1..=500 in a scrambled order
        for v in 0..500u64 {
            let value = v * 7 % 500 + 1;
            node.update_p95(value as f64);
            hist.record(value).unwrap();
        }

        node.evaluate_p95();

        let exact = hist.value_at_percentile(95.0) as f64;
        assert!((node.measurement() - exact).abs() <= 1.0);
    }

    #[test]
    fn propagate_sums_leaves_into_root() {
        let root = BreakdownNode::new("root");
        let a = root.find_or_add_child("a");
        a.find_or_add_child("a1").increment(2.0, 1);
        a.find_or_add_child("a2").increment(2.0, 1);
        root.find_or_add_child("b").increment(2.0, 1);

        root.propagate();

        assert_eq!(root.measurement(), 6.0);
        assert_eq!(root.num_samples(), 3);
        assert_eq!(a.measurement(), 4.0);
    }

    #[test]
    fn propagate_keeps_direct_root_value() {
        let root = tree_with_children(&[("a", 1.0), ("b", 1.0)]);
        root.increment(10.0, 5);

        root.propagate();

        assert_eq!(root.measurement(), 12.0);
        assert_eq!(root.num_samples(), 7);
    }

    #[test]
    fn percentage_and_normalize() {
        let root = tree_with_children(&[("a", 25.0)]);
        root.increment(50.0, 3);

        root.convert_to_percentage(200.0);
        assert_eq!(root.measurement(), 25.0);
        assert_eq!(root.find_child("a").unwrap().measurement(), 12.5);

        root.normalize(2.0);
        assert_eq!(root.measurement(), 12.5);
        // ceil(3 / 2) and ceil(1 / 2)
        assert_eq!(root.num_samples(), 2);
        assert_eq!(root.find_child("a").unwrap().num_samples(), 1);
    }

    #[test]
    fn filter_drops_out_of_range_children() {
        let root = tree_with_children(&[("low", 5.0), ("mid", 50.0), ("high", 150.0)]);

        root.filter(1, 10.0, 100.0);

        assert_eq!(root.child_count(), 1);
        assert!(root.find_child("mid").is_some());
    }

    #[test]
    fn filter_respects_from_level() {
        let root = tree_with_children(&[("tiny", 1.0)]);
        let tiny = root.find_child("tiny").unwrap();
        tiny.find_or_add_child("deep-low").increment(1.0, 1);
        tiny.find_or_add_child("deep-ok").increment(20.0, 1);

        root.filter(2, 10.0, 100.0);

        assert!(root.find_child("tiny").is_some());
        assert!(tiny.find_child("deep-low").is_none());
        assert!(tiny.find_child("deep-ok").is_some());
    }

    #[test]
    fn filter_by_name_prunes_every_level() {
        let root = tree_with_children(&[("app::run", 1.0), ("std::rt", 1.0)]);
        let run = root.find_child("app::run").unwrap();
        run.find_or_add_child("app::step");
        run.find_or_add_child("core::panic");

        root.filter_by_name(&|name: &str| name.starts_with("app::"));

        assert_eq!(root.child_count(), 1);
        assert_eq!(run.child_count(), 1);
        assert!(run.find_child("app::step").is_some());
    }

    #[test]
    fn depth_counts_root() {
        let root = BreakdownNode::new("root");
        assert_eq!(root.depth(), 1);

        root.find_or_add_child("a").find_or_add_child("b");
        root.find_or_add_child("c");
        assert_eq!(root.depth(), 3);
    }
}
