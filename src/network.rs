//! The priority-driven forward evaluator (C5).
//!
//! Mirrors the reference design's queue contract exactly: `put`ting an
//! already-queued node removes it and re-appends it at the back before
//! recording the new priority, so ties break by current queue position
//! rather than by original insertion order.

use std::collections::{HashMap, HashSet};

use crate::activation::sigmoid;
use crate::genome::Genome;
use crate::node::{NodeId, NodeKind};

struct PriorityQueue {
    items: Vec<NodeId>,
    priorities: HashMap<NodeId, i8>,
}

impl PriorityQueue {
    fn new() -> Self {
        PriorityQueue {
            items: Vec::new(),
            priorities: HashMap::new(),
        }
    }

    fn put(&mut self, item: NodeId, priority: i8) {
        if let Some(pos) = self.items.iter().position(|&existing| existing == item) {
            self.items.remove(pos);
        }
        self.items.push(item);
        self.priorities.insert(item, priority);
    }

    /// Highest priority first; on a tie, the item that has sat in the
    /// queue longest since its last `put` wins.
    fn get(&mut self) -> Option<NodeId> {
        if self.items.is_empty() {
            return None;
        }
        let mut best_index = 0;
        let mut best_priority = self.priorities[&self.items[0]];
        for (i, item) in self.items.iter().enumerate().skip(1) {
            let priority = self.priorities[item];
            if priority > best_priority {
                best_priority = priority;
                best_index = i;
            }
        }
        Some(self.items.remove(best_index))
    }
}

/// Forward-evaluates `genome` against one set of sensor values (length
/// equal to the non-bias sensor count) and returns the output nodes'
/// values in declaration order.
///
/// Sensor and bias nodes pass their value straight through as their
/// output value; every other node applies the logistic activation. The
/// queue keeps making progress on cyclic graphs by giving nodes with an
/// unready in-edge priority −1 rather than refusing to enqueue them.
pub fn evaluate(genome: &mut Genome, inputs: &[f32]) -> Vec<f32> {
    let sensor_ids: Vec<NodeId> = genome.sensor_ids().to_vec();
    let non_bias_count = sensor_ids.len() - genome.has_bias() as usize;
    assert_eq!(
        inputs.len(),
        non_bias_count,
        "evaluate: expected {non_bias_count} sensor values, got {}",
        inputs.len()
    );

    for (i, &id) in sensor_ids.iter().enumerate() {
        let value = if genome.has_bias() && i + 1 == sensor_ids.len() {
            1.0
        } else {
            inputs[i]
        };
        if let Some(node) = genome.nodes.get_mut(&id) {
            node.input_value = value;
        }
    }

    let mut activated: HashSet<NodeId> = HashSet::new();
    let mut queue = PriorityQueue::new();
    for &id in &sensor_ids {
        queue.put(id, 0);
    }

    while let Some(current) = queue.get() {
        let (input_value, kind) = {
            let node = &genome.nodes[&current];
            (node.input_value, node.kind)
        };
        let output_value = match kind {
            NodeKind::Sensor => input_value,
            NodeKind::Hidden | NodeKind::Output => sigmoid(input_value),
        };
        {
            let node = genome.nodes.get_mut(&current).unwrap();
            node.output_value = output_value;
            node.input_value = 0.0;
        }
        activated.insert(current);

        let outgoing: Vec<(NodeId, f32)> = genome
            .connections
            .values()
            .filter(|c| c.enabled && c.in_node == current)
            .map(|c| (c.out_node, c.weight))
            .collect();

        for (target, weight) in outgoing {
            if let Some(node) = genome.nodes.get_mut(&target) {
                node.input_value += output_value * weight;
            }
            if !activated.contains(&target) {
                let all_incoming_ready = genome
                    .connections
                    .values()
                    .filter(|c| c.enabled && c.out_node == target)
                    .all(|c| activated.contains(&c.in_node));
                let priority: i8 = if all_incoming_ready { 1 } else { -1 };
                queue.put(target, priority);
            }
        }
    }

    genome
        .output_ids()
        .iter()
        .map(|id| genome.nodes[id].output_value)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn priority_queue_reinsert_moves_to_back_and_updates_priority() {
        let mut queue = PriorityQueue::new();
        let a = NodeId::new(0, 0);
        let b = NodeId::new(1, 0);
        let c = NodeId::new(2, 0);
        queue.put(a, 0);
        queue.put(b, 0);
        queue.put(c, 0);
        // Re-put a at the same priority: ties break by position, so the
        // oldest remaining item (b) should now come out first.
        queue.put(a, 0);
        assert_eq!(queue.get(), Some(b));
        assert_eq!(queue.get(), Some(c));
        assert_eq!(queue.get(), Some(a));
        assert_eq!(queue.get(), None);
    }

    #[test]
    fn priority_queue_picks_highest_priority_first() {
        let mut queue = PriorityQueue::new();
        let a = NodeId::new(0, 0);
        let b = NodeId::new(1, 0);
        queue.put(a, -1);
        queue.put(b, 1);
        assert_eq!(queue.get(), Some(b));
        assert_eq!(queue.get(), Some(a));
    }
}
