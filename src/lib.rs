//! A NEAT (NeuroEvolution of Augmenting Topologies) engine: genomes of
//! nodes and innovation-numbered connections, evolved by mutation,
//! crossover, and speciation under a caller-supplied fitness function.

pub mod activation;
pub mod config;
pub mod connection;
pub mod error;
pub mod genome;
pub mod innovation;
pub mod network;
pub mod node;
pub mod population;
pub mod species;

pub use config::{InitTopology, NeatConfig};
pub use error::NeatError;
pub use genome::Genome;
pub use innovation::InnovationRecord;
pub use population::{GenerationStats, Population};
