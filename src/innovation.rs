//! The run-wide innovation registry (C1).
//!
//! Explicit and owned by `Population`, threaded by `&mut` reference into
//! every genome operator that can create structure — no hidden globals,
//! so a seeded run is fully reproducible.

use crate::node::NodeId;

#[derive(Debug, Clone)]
pub struct InnovationRecord {
    counter: usize,
    bootstrapped: bool,
    history: Vec<(NodeId, NodeId, usize)>,
}

impl InnovationRecord {
    pub fn new() -> Self {
        InnovationRecord {
            counter: 0,
            bootstrapped: false,
            history: Vec::new(),
        }
    }

    /// Sets the counter so that connection innovations never collide
    /// with the node identifiers assigned at genesis (sensors + outputs
    /// occupy `0..sensor_and_output_count`). A no-op after the first
    /// call in a run.
    pub fn bootstrap(&mut self, sensor_and_output_count: usize) {
        if !self.bootstrapped {
            self.counter = sensor_and_output_count;
            self.bootstrapped = true;
        }
    }

    /// Returns the innovation number for the (source, target) pair,
    /// minting a new one if this exact pair has never been presented.
    pub fn obtain(&mut self, source: NodeId, target: NodeId) -> usize {
        for (s, t, number) in &self.history {
            if *s == source && *t == target {
                return *number;
            }
        }
        let number = self.counter;
        self.counter += 1;
        self.history.push((source, target, number));
        number
    }

    /// Mints (or looks up) the two connections incident to a freshly
    /// split node in one call.
    pub fn obtain_node_split(
        &mut self,
        new_node: NodeId,
        in_node: NodeId,
        out_node: NodeId,
    ) -> (usize, usize) {
        let in_innovation = self.obtain(in_node, new_node);
        let out_innovation = self.obtain(new_node, out_node);
        (in_innovation, out_innovation)
    }
}

impl Default for InnovationRecord {
    fn default() -> Self {
        Self::new()
    }
}
