pub mod atomic;
pub mod node;
pub mod transforms;

use std::fmt;

use serde::Serialize;

pub use atomic::AtomicF64;
pub use node::{BreakdownNode, RESERVOIR_SIZE};

/// Structural copy of a breakdown tree, ready for transmission.
/// Children are ordered by name so identical trees serialize identically.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BreakdownSnapshot {
    pub name: String,
    pub measurement: f64,
    pub sample_count: i64,
    pub children: Vec<BreakdownSnapshot>,
}

impl BreakdownNode {
    pub fn snapshot(&self) -> BreakdownSnapshot {
        let mut children: Vec<_> = self.children().iter().map(|c| c.snapshot()).collect();
        children.sort_by(|a, b| a.name.cmp(&b.name));

        BreakdownSnapshot {
            name: self.name().to_owned(),
            measurement: self.measurement(),
            sample_count: self.num_samples(),
            children,
        }
    }

    fn write_level(&self, f: &mut fmt::Formatter<'_>, level: usize) -> fmt::Result {
        writeln!(
            f,
            "{:indent$}{} - {} ({})",
            "",
            self.name(),
            self.measurement(),
            self.num_samples(),
            indent = level * 2
        )?;
        let mut children = self.children();
        children.sort_by(|a, b| a.name().cmp(b.name()));
        for child in children {
            child.write_level(f, level + 1)?;
        }
        Ok(())
    }
}

/// Indented dump, one `name - measurement (samples)` line per node.
impl fmt::Display for BreakdownNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.write_level(f, 0)
    }
}
