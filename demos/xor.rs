//! Evolves a network that solves XOR. Run with `cargo run --example xor`.

use neat_core::{NeatConfig, Population};

const PATTERNS: [([f32; 2], f32); 4] = [
    ([0.0, 0.0], 0.0),
    ([0.0, 1.0], 1.0),
    ([1.0, 0.0], 1.0),
    ([1.0, 1.0], 0.0),
];

fn score(genome: &neat_core::Genome) -> f64 {
    let mut genome = genome.clone();
    let mut error = 0.0f64;
    for (inputs, target) in &PATTERNS {
        let output = genome.evaluate(inputs);
        error += (output[0] as f64 - *target as f64).abs();
        genome.clear_nodes();
    }
    (4.0 - error).powi(2)
}

fn main() {
    env_logger::init();

    let mut config = NeatConfig::default();
    config.sensor = 2;
    config.output = 1;

    let mut population = Population::new(config, 1).expect("valid configuration");

    for generation in 0..100 {
        population.evaluate_with(score);
        let best = population.best_so_far().map(|g| g.raw_fitness).unwrap_or(0.0);
        println!(
            "generation {generation}: species={} best_fitness={best:.4}",
            population.species_count()
        );
        if best >= 15.5 {
            println!("solved after {generation} generations");
            break;
        }
        population.step();
    }

    if let Some(champion) = population.best_so_far() {
        let mut champion = champion.clone();
        for (inputs, target) in &PATTERNS {
            let output = champion.evaluate(inputs);
            champion.clear_nodes();
            println!("{inputs:?} -> {:.4} (target {target})", output[0]);
        }
    }
}
