//! A genome: a node set and connection set with crossover, mutation, and
//! compatibility distance. See `network` for the forward evaluator.

use std::collections::{HashMap, HashSet};

use rand::{seq::IteratorRandom, Rng, RngCore};

use crate::config::{InitTopology, NeatConfig};
use crate::connection::ConnectionGene;
use crate::innovation::InnovationRecord;
use crate::network;
use crate::node::{NodeGene, NodeId, NodeKind};

#[derive(Debug, Clone)]
pub struct Genome {
    pub nodes: HashMap<NodeId, NodeGene>,
    node_order: Vec<NodeId>,
    pub connections: HashMap<usize, ConnectionGene>,
    connection_set: HashSet<(NodeId, NodeId)>,

    sensor_count: usize,
    bias: bool,
    output_count: usize,

    pub raw_fitness: f64,
    pub shared_fitness: f64,
}

impl Genome {
    /// An empty genome with the given layout and no connections. Used
    /// directly by `InitTopology::None` and as the starting point for
    /// `crossover`'s child.
    fn skeleton(sensor_count: usize, bias: bool, output_count: usize) -> Self {
        Genome {
            nodes: HashMap::new(),
            node_order: Vec::new(),
            connections: HashMap::new(),
            connection_set: HashSet::new(),
            sensor_count,
            bias,
            output_count,
            raw_fitness: 0.0,
            shared_fitness: 0.0,
        }
    }

    /// Builds a fresh genome: sensors (bias last, if any), then outputs,
    /// laid down as raw node identifiers `0..sensor+bias+output` before
    /// any connection exists. `innovation.bootstrap` is called so that
    /// connection innovations never collide with these identifiers.
    pub fn new(
        config: &NeatConfig,
        rng: &mut dyn RngCore,
        innovation: &mut InnovationRecord,
    ) -> Self {
        let mut genome = Genome::skeleton(config.sensor, config.bias, config.output);

        let mut next = 0usize;
        for i in 0..config.sensor {
            let id = NodeId::new(next, 0);
            next += 1;
            let name = config
                .sensor_names
                .as_ref()
                .map(|names| names[i].clone());
            genome
                .nodes
                .insert(id, NodeGene::new(id, NodeKind::Sensor, name));
            genome.node_order.push(id);
        }
        if config.bias {
            let id = NodeId::new(next, 0);
            next += 1;
            genome
                .nodes
                .insert(id, NodeGene::new(id, NodeKind::Sensor, Some("bias".into())));
            genome.node_order.push(id);
        }
        for i in 0..config.output {
            let id = NodeId::new(next, 0);
            next += 1;
            let name = config
                .output_names
                .as_ref()
                .map(|names| names[i].clone());
            genome
                .nodes
                .insert(id, NodeGene::new(id, NodeKind::Output, name));
            genome.node_order.push(id);
        }

        innovation.bootstrap(next);

        match config.init_state {
            InitTopology::None => {}
            InitTopology::OneLink => genome.add_connection_mutation(rng, innovation),
            InitTopology::AllLinked => genome.connect_all(rng, innovation),
        }

        genome
    }

    fn connect_all(&mut self, rng: &mut dyn RngCore, innovation: &mut InnovationRecord) {
        let sensors = self.sensor_ids().to_vec();
        let outputs = self.output_ids().to_vec();
        for &sensor in &sensors {
            for &output in &outputs {
                let weight = rng.random_range(-1.0..1.0);
                self.insert_connection(sensor, output, weight, innovation);
            }
        }
    }

    fn insert_connection(
        &mut self,
        in_node: NodeId,
        out_node: NodeId,
        weight: f32,
        innovation: &mut InnovationRecord,
    ) {
        let number = innovation.obtain(in_node, out_node);
        self.connections
            .insert(number, ConnectionGene::new(in_node, out_node, weight, number));
        self.connection_set.insert((in_node, out_node));
    }

    pub fn sensor_ids(&self) -> &[NodeId] {
        let len = self.sensor_count + self.bias as usize;
        &self.node_order[..len]
    }

    pub fn output_ids(&self) -> &[NodeId] {
        let start = self.sensor_count + self.bias as usize;
        &self.node_order[start..start + self.output_count]
    }

    pub fn hidden_ids(&self) -> &[NodeId] {
        let start = self.sensor_count + self.bias as usize + self.output_count;
        &self.node_order[start..]
    }

    pub fn has_bias(&self) -> bool {
        self.bias
    }

    /// Forward-evaluates the genome against one set of sensor values.
    /// See `network::evaluate` for the priority-queue algorithm.
    pub fn evaluate(&mut self, inputs: &[f32]) -> Vec<f32> {
        network::evaluate(self, inputs)
    }

    /// Zeroes every node's accumulated input. Output values are left
    /// alone: callers relying on recurrence read them across calls.
    pub fn clear_nodes(&mut self) {
        for node in self.nodes.values_mut() {
            node.input_value = 0.0;
        }
    }

    /// Applies every mutation operator in turn, each gated by its own
    /// independent coin flip, per the reference design's ordering.
    pub fn mutate(
        &mut self,
        config: &NeatConfig,
        rng: &mut dyn RngCore,
        innovation: &mut InnovationRecord,
    ) {
        if rng.random::<f32>() < config.weight_mutation_prob {
            self.mutate_weights(config, rng);
        }

        if rng.random::<f32>() < config.new_connection_prob {
            self.add_connection_mutation(rng, innovation);
        }

        if rng.random::<f32>() < config.new_node_prob {
            self.add_node_mutation(config, rng, innovation);
        }
    }

    fn mutate_weights(&mut self, config: &NeatConfig, rng: &mut dyn RngCore) {
        for connection in self.connections.values_mut() {
            if rng.random::<f32>() < config.weight_perturb_prob {
                connection.weight =
                    (connection.weight + rng.random_range(-0.5..0.5)).clamp(-1.0, 1.0);
            } else {
                connection.weight = rng.random_range(-1.0..1.0);
            }
        }
    }

    /// Enumerates every legal (u, v) pair not already connected and
    /// wires one in at random. A no-op, logged rather than erroring,
    /// when no such pair exists (§7 "fully connected").
    fn add_connection_mutation(&mut self, rng: &mut dyn RngCore, innovation: &mut InnovationRecord) {
        let outputs: HashSet<NodeId> = self.output_ids().iter().copied().collect();
        let sensors: HashSet<NodeId> = self.sensor_ids().iter().copied().collect();

        let mut candidates = Vec::new();
        for &u in self.nodes.keys() {
            if outputs.contains(&u) {
                continue;
            }
            for &v in self.nodes.keys() {
                if sensors.contains(&v) || u == v {
                    continue;
                }
                if self.connection_set.contains(&(u, v)) {
                    continue;
                }
                candidates.push((u, v));
            }
        }

        if candidates.is_empty() {
            log::debug!("add-connection mutation: genome is fully connected, skipping");
            return;
        }

        let (u, v) = candidates[rng.random_range(0..candidates.len())];
        let weight = rng.random_range(-1.0..1.0);
        self.insert_connection(u, v, weight, innovation);
    }

    /// Splits a random enabled connection into two, inserting a fresh
    /// hidden node between its endpoints. Falls back to add-connection
    /// when there is nothing enabled left to split (§7).
    fn add_node_mutation(
        &mut self,
        _config: &NeatConfig,
        rng: &mut dyn RngCore,
        innovation: &mut InnovationRecord,
    ) {
        let enabled: Vec<usize> = self
            .connections
            .iter()
            .filter(|(_, c)| c.enabled)
            .map(|(&innov, _)| innov)
            .collect();

        let Some(&split) = enabled.iter().choose(rng) else {
            log::debug!("add-node mutation: no enabled connections, falling back to add-connection");
            self.add_connection_mutation(rng, innovation);
            return;
        };

        let connection = *self.connections.get(&split).unwrap();
        self.connections.get_mut(&split).unwrap().enabled = false;

        let mut disambiguator = 0usize;
        while self.nodes.contains_key(&NodeId::new(split, disambiguator)) {
            disambiguator += 1;
        }
        let new_node = NodeId::new(split, disambiguator);
        let (in_innov, out_innov) =
            innovation.obtain_node_split(new_node, connection.in_node, connection.out_node);

        self.nodes
            .insert(new_node, NodeGene::new(new_node, NodeKind::Hidden, None));
        self.node_order.push(new_node);

        self.connections.insert(
            in_innov,
            ConnectionGene::new(connection.in_node, new_node, 1.0, in_innov),
        );
        self.connection_set.insert((connection.in_node, new_node));

        self.connections.insert(
            out_innov,
            ConnectionGene::new(new_node, connection.out_node, connection.weight, out_innov),
        );
        self.connection_set.insert((new_node, connection.out_node));
    }

    /// Crossover, with `self` and `other` in any order: the fitter
    /// parent (by `shared_fitness`) is determined internally. On a
    /// tie, `self` plays the "fitter" role and gene order is not
    /// shuffled — unlike a coin-flip reorder, this keeps crossover's
    /// output a pure function of its two input genomes.
    pub fn crossover(
        &self,
        other: &Genome,
        config: &NeatConfig,
        rng: &mut dyn RngCore,
    ) -> Genome {
        let (fitter, weaker, same_fitness) = if self.shared_fitness > other.shared_fitness {
            (self, other, false)
        } else if other.shared_fitness > self.shared_fitness {
            (other, self, false)
        } else {
            (self, other, true)
        };

        let mut child = Genome::skeleton(fitter.sensor_count, fitter.bias, fitter.output_count);
        child.node_order = fitter.node_order.clone();

        for (&id, node) in &fitter.nodes {
            child.nodes.insert(id, node.clone());
        }
        if same_fitness {
            for (&id, node) in &weaker.nodes {
                child.nodes.entry(id).or_insert_with(|| node.clone());
            }
            for &id in &weaker.node_order {
                if !child.node_order.contains(&id) {
                    child.node_order.push(id);
                }
            }
        }

        for (innovation, c1) in &fitter.connections {
            let chosen = match weaker.connections.get(innovation) {
                Some(c2) => {
                    let mut gene = if rng.random_bool(0.5) { *c1 } else { *c2 };
                    if (!c1.enabled || !c2.enabled)
                        && rng.random::<f32>() < config.disabled_inherit_prob
                    {
                        gene.enabled = false;
                    }
                    gene
                }
                None => *c1,
            };
            child.connections.insert(*innovation, chosen);
            child
                .connection_set
                .insert((chosen.in_node, chosen.out_node));
        }

        if same_fitness {
            for (innovation, c2) in &weaker.connections {
                if !child.connections.contains_key(innovation) {
                    child.connections.insert(*innovation, *c2);
                    child.connection_set.insert((c2.in_node, c2.out_node));
                }
            }
        }

        // Rebind: drop any connection whose endpoints didn't make it into
        // the child (should not happen given the construction above, but
        // keeps the invariant airtight against future changes here).
        child
            .connections
            .retain(|_, c| child.nodes.contains_key(&c.in_node) && child.nodes.contains_key(&c.out_node));

        child
    }

    /// E/D classified against a single split point — the fitter genome's
    /// own max innovation number, per §4.4 — with "fitter" determined the
    /// same way `crossover` determines it (by `shared_fitness`, ties
    /// going to `self`). W̄ is averaged over matching genes, N from the
    /// larger genome's connection count. Symmetric in `self`/`other`
    /// because the split point is pinned to whichever genome is fitter,
    /// not to whichever argument position it occupies.
    pub fn compatibility_distance(&self, other: &Genome, config: &NeatConfig) -> f64 {
        let fitter = if other.shared_fitness > self.shared_fitness {
            other
        } else {
            self
        };
        let split = fitter.connections.keys().max().copied().unwrap_or(0);

        let mut all_innovations: HashSet<usize> = self.connections.keys().copied().collect();
        all_innovations.extend(other.connections.keys().copied());

        let mut excess = 0usize;
        let mut disjoint = 0usize;
        let mut matching = 0usize;
        let mut weight_diff_sum = 0.0f64;

        for innovation in all_innovations {
            match (
                self.connections.get(&innovation),
                other.connections.get(&innovation),
            ) {
                (Some(a), Some(b)) => {
                    matching += 1;
                    weight_diff_sum += (a.weight - b.weight).abs() as f64;
                }
                (Some(_), None) | (None, Some(_)) => {
                    if innovation > split {
                        excess += 1;
                    } else {
                        disjoint += 1;
                    }
                }
                (None, None) => unreachable!(),
            }
        }

        let weight_diff = if matching > 0 {
            weight_diff_sum / matching as f64
        } else {
            0.0
        };

        let larger = self.connections.len().max(other.connections.len());
        let n = (larger.saturating_sub(config.large_genome_normalizer_offset)).max(1) as f64;

        config.compatibility_excess_coefficient * excess as f64 / n
            + config.compatibility_disjoint_coefficient * disjoint as f64 / n
            + config.compatibility_weight_coefficient * weight_diff
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::NeatConfig;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn rng() -> StdRng {
        StdRng::seed_from_u64(42)
    }

    #[test]
    fn construction_respects_layout() {
        let config = NeatConfig::default();
        let mut innovation = InnovationRecord::new();
        let genome = Genome::new(&config, &mut rng(), &mut innovation);
        assert_eq!(genome.sensor_ids().len(), config.sensor + config.bias as usize);
        assert_eq!(genome.output_ids().len(), config.output);
    }

    #[test]
    fn s2_trivial_feed_forward() {
        let mut config = NeatConfig::default();
        config.sensor = 2;
        config.bias = true;
        config.output = 1;
        config.init_state = InitTopology::None;

        let mut innovation = InnovationRecord::new();
        let mut genome = Genome::new(&config, &mut rng(), &mut innovation);

        let s1 = genome.sensor_ids()[0];
        let s2 = genome.sensor_ids()[1];
        let bias = genome.sensor_ids()[2];
        let output = genome.output_ids()[0];

        genome.insert_connection(s1, output, 0.5, &mut innovation);
        genome.insert_connection(s2, output, 0.5, &mut innovation);
        genome.insert_connection(bias, output, 0.0, &mut innovation);

        let out = genome.evaluate(&[1.0, 0.0]);
        assert_eq!(out.len(), 1);
        assert!((out[0] - 0.924_14).abs() < 1e-4);
    }

    #[test]
    fn s3_innovation_dedup_across_genomes() {
        let mut config = NeatConfig::default();
        config.sensor = 2;
        config.output = 1;
        config.bias = false;
        config.init_state = InitTopology::AllLinked;

        let mut innovation = InnovationRecord::new();
        let first = Genome::new(&config, &mut rng(), &mut innovation);
        let second = Genome::new(&config, &mut rng(), &mut innovation);

        let mut first_innovations: Vec<usize> = first.connections.keys().copied().collect();
        let mut second_innovations: Vec<usize> = second.connections.keys().copied().collect();
        first_innovations.sort();
        second_innovations.sort();
        assert_eq!(first_innovations, second_innovations);
    }

    #[test]
    fn crossover_does_not_force_reenable_when_both_parents_disabled() {
        // disabled_inherit_prob = 0.0 means the force-disable branch never
        // fires; if both parent copies of a matching gene are already
        // disabled, the child's copy (whichever parent it was cloned from)
        // must stay disabled rather than being silently re-enabled.
        let mut config = NeatConfig::default();
        config.sensor = 1;
        config.output = 1;
        config.bias = false;
        config.init_state = InitTopology::None;
        config.disabled_inherit_prob = 0.0;

        let mut innovation = InnovationRecord::new();
        let mut p1 = Genome::new(&config, &mut rng(), &mut innovation);
        let u = p1.sensor_ids()[0];
        let v = p1.output_ids()[0];
        p1.insert_connection(u, v, 0.5, &mut innovation);
        let innov = *p1.connections.keys().next().unwrap();
        p1.connections.get_mut(&innov).unwrap().enabled = false;
        p1.shared_fitness = 1.0;

        let mut p2 = p1.clone();
        p2.shared_fitness = 1.0;

        for seed in 0..20u64 {
            let mut rng = StdRng::seed_from_u64(seed);
            let child = p1.crossover(&p2, &config, &mut rng);
            assert!(!child.connections[&innov].enabled);
        }
    }

    #[test]
    fn identity_crossover_preserves_structure() {
        let config = NeatConfig::default();
        let mut innovation = InnovationRecord::new();
        let genome = Genome::new(&config, &mut rng(), &mut innovation);

        let child = genome.crossover(&genome, &config, &mut rng());

        let mut original: Vec<NodeId> = genome.nodes.keys().copied().collect();
        let mut child_nodes: Vec<NodeId> = child.nodes.keys().copied().collect();
        original.sort();
        child_nodes.sort();
        assert_eq!(original, child_nodes);

        let mut original_innov: Vec<usize> = genome.connections.keys().copied().collect();
        let mut child_innov: Vec<usize> = child.connections.keys().copied().collect();
        original_innov.sort();
        child_innov.sort();
        assert_eq!(original_innov, child_innov);
    }

    #[test]
    fn distance_is_symmetric() {
        let config = NeatConfig::default();
        let mut innovation = InnovationRecord::new();
        let mut a = Genome::new(&config, &mut rng(), &mut innovation);
        let mut b = Genome::new(&config, &mut rng(), &mut innovation);
        a.mutate(&config, &mut rng(), &mut innovation);
        // Give the two genomes distinct shared fitness so whichever one is
        // "fitter" is fixed regardless of which side of the call it sits
        // on, exercising the real symmetry guarantee rather than the
        // tie-breaks-to-self fallback.
        a.shared_fitness = 3.0;
        b.shared_fitness = 1.0;

        let d_ab = a.compatibility_distance(&b, &config);
        let d_ba = b.compatibility_distance(&a, &config);
        assert!((d_ab - d_ba).abs() < 1e-9);
    }

    #[test]
    fn s4_add_node_preserves_contribution_sign() {
        use crate::activation::sigmoid;

        let mut config = NeatConfig::default();
        config.sensor = 1;
        config.output = 1;
        config.bias = false;
        config.init_state = InitTopology::None;

        let mut innovation = InnovationRecord::new();
        let mut genome = Genome::new(&config, &mut rng(), &mut innovation);
        let u = genome.sensor_ids()[0];
        let v = genome.output_ids()[0];
        let weight = 0.7f32;
        genome.insert_connection(u, v, weight, &mut innovation);

        for &u_in in &[-2.0f32, -0.3, 0.0, 0.3, 2.0] {
            let before = weight * sigmoid(u_in);
            let after = weight * sigmoid(sigmoid(u_in));
            assert_eq!(before.signum(), after.signum());
        }

        genome.add_node_mutation(&config, &mut rng(), &mut innovation);
        assert_eq!(genome.hidden_ids().len(), 1);
        let split_connection = genome
            .connections
            .values()
            .find(|c| !c.enabled)
            .expect("original connection should be disabled after the split");
        assert_eq!(split_connection.in_node, u);
        assert_eq!(split_connection.out_node, v);

        let hidden = genome.hidden_ids()[0];
        let first_leg = genome
            .connections
            .values()
            .find(|c| c.in_node == u && c.out_node == hidden)
            .expect("u -> hidden connection");
        let second_leg = genome
            .connections
            .values()
            .find(|c| c.in_node == hidden && c.out_node == v)
            .expect("hidden -> v connection");
        assert_eq!(first_leg.weight, 1.0);
        assert_eq!(second_leg.weight, weight);
    }

    #[test]
    fn clear_nodes_zeroes_inputs() {
        let mut config = NeatConfig::default();
        config.sensor = 2;
        config.output = 1;
        let mut innovation = InnovationRecord::new();
        let mut genome = Genome::new(&config, &mut rng(), &mut innovation);
        genome.evaluate(&[1.0, 1.0]);
        genome.clear_nodes();
        assert!(genome.nodes.values().all(|n| n.input_value == 0.0));
    }
}
