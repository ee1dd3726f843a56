//! Tunable parameters for a NEAT run.
//!
//! Every constant the reference design hard-codes is exposed here as a
//! field with a `Default` that reproduces the reference value exactly.
//! Nothing about the algorithm reads a literal directly; it all goes
//! through a `NeatConfig`.

use crate::error::NeatError;

/// Topology a freshly constructed genome starts with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InitTopology {
    /// No connections at all. Used internally by crossover.
    None,
    /// A single connection, added via the add-connection mutation.
    OneLink,
    /// Every sensor connected to every output.
    AllLinked,
}

impl std::str::FromStr for InitTopology {
    type Err = NeatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "none" => Ok(InitTopology::None),
            "one_link" | "oneLink" => Ok(InitTopology::OneLink),
            "all_linked" | "allLinked" => Ok(InitTopology::AllLinked),
            other => Err(NeatError::UnknownInitialTopology(other.to_string())),
        }
    }
}

#[derive(Debug, Clone)]
pub struct NeatConfig {
    // General parameters
    pub demography: usize,
    pub sensor: usize,
    pub output: usize,
    pub bias: bool,
    pub init_state: InitTopology,
    pub sensor_names: Option<Vec<String>>,
    pub output_names: Option<Vec<String>>,

    // Mutation parameters
    pub weight_mutation_prob: f32,
    pub weight_perturb_prob: f32,
    pub new_connection_prob: f32,
    pub new_node_prob: f32,
    pub disabled_inherit_prob: f32,

    // Reproduction parameters
    pub clone_and_mutate_prob: f64,
    pub inter_species_mating_prob: f64,

    // Compatibility / speciation parameters
    pub compatibility_excess_coefficient: f64,
    pub compatibility_disjoint_coefficient: f64,
    pub compatibility_weight_coefficient: f64,
    pub compatibility_threshold: f64,
    pub large_genome_normalizer_offset: usize,

    // Elitism / stagnation parameters
    pub elitism_min_species_size: usize,
    pub species_stagnation_limit: usize,
    pub population_stagnation_limit: usize,
    pub surviving_species_on_stagnation: usize,
}

impl Default for NeatConfig {
    fn default() -> Self {
        NeatConfig {
            demography: 150,
            sensor: 2,
            output: 1,
            bias: true,
            init_state: InitTopology::OneLink,
            sensor_names: None,
            output_names: None,

            weight_mutation_prob: 0.8,
            weight_perturb_prob: 0.9,
            new_connection_prob: 0.05,
            new_node_prob: 0.03,
            disabled_inherit_prob: 0.75,

            clone_and_mutate_prob: 0.25,
            inter_species_mating_prob: 0.001,

            compatibility_excess_coefficient: 1.0,
            compatibility_disjoint_coefficient: 1.0,
            compatibility_weight_coefficient: 0.4,
            compatibility_threshold: 3.0,
            large_genome_normalizer_offset: 20,

            elitism_min_species_size: 5,
            species_stagnation_limit: 15,
            population_stagnation_limit: 20,
            surviving_species_on_stagnation: 2,
        }
    }
}

impl NeatConfig {
    /// Fail fast on configuration errors (§7 of the design doc).
    pub fn validate(&self) -> Result<(), NeatError> {
        if self.sensor == 0 {
            return Err(NeatError::InvalidSensorCount);
        }
        if self.output == 0 {
            return Err(NeatError::InvalidOutputCount);
        }
        if self.demography == 0 {
            return Err(NeatError::InvalidDemography);
        }
        if let Some(names) = &self.sensor_names {
            if names.len() != self.sensor {
                return Err(NeatError::SensorNameCountMismatch {
                    expected: self.sensor,
                    got: names.len(),
                });
            }
        }
        if let Some(names) = &self.output_names {
            if names.len() != self.output {
                return Err(NeatError::OutputNameCountMismatch {
                    expected: self.output,
                    got: names.len(),
                });
            }
        }
        Ok(())
    }
}
