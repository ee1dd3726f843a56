//! Orchestrates generations: evaluate, speciate, share fitness, purge,
//! recover from stagnation, and reproduce (C7).

use rand::rngs::StdRng;
use rand::{seq::IteratorRandom, Rng, RngCore, SeedableRng};
#[cfg(feature = "rayon")]
use rayon::prelude::*;

use crate::config::NeatConfig;
use crate::error::NeatError;
use crate::genome::Genome;
use crate::innovation::InnovationRecord;
use crate::species::Species;

/// One generation's snapshot, appended to `Population::history` at stage
/// 12 (§4.5). Cheap by design — it holds the champion's fitness, not the
/// champion itself; `best_so_far()` is the place to go for the genome.
#[derive(Debug, Clone)]
pub struct GenerationStats {
    pub generation: usize,
    pub species_count: usize,
    pub champion_fitness: f64,
    pub average_fitness: f64,
}

pub struct Population {
    config: NeatConfig,
    genomes: Vec<Genome>,
    species: Vec<Species>,
    innovation: InnovationRecord,
    rng: StdRng,

    generation: usize,
    global_best: Option<Genome>,
    global_staleness: usize,
    last_average_fitness: f64,
    history: Vec<GenerationStats>,
}

impl Population {
    pub fn new(config: NeatConfig, seed: u64) -> Result<Self, NeatError> {
        config.validate()?;

        let mut rng = StdRng::seed_from_u64(seed);
        let mut innovation = InnovationRecord::new();

        let mut genomes = Vec::with_capacity(config.demography);
        for _ in 0..config.demography {
            genomes.push(Genome::new(&config, &mut rng, &mut innovation));
        }

        log::info!(
            "population constructed: demography={} sensors={} outputs={}",
            config.demography,
            config.sensor,
            config.output
        );

        Ok(Population {
            config,
            genomes,
            species: Vec::new(),
            innovation,
            rng,
            generation: 0,
            global_best: None,
            global_staleness: 0,
            last_average_fitness: 0.0,
            history: Vec::new(),
        })
    }

    pub fn generation(&self) -> usize {
        self.generation
    }

    pub fn best_so_far(&self) -> Option<&Genome> {
        self.global_best.as_ref()
    }

    pub fn species_count(&self) -> usize {
        self.species.len()
    }

    pub fn global_staleness(&self) -> usize {
        self.global_staleness
    }

    /// Per-generation snapshots appended at stage 12 of each `step()`
    /// (§3 "history of champions and averages", §4.5 stage 12).
    pub fn history(&self) -> &[GenerationStats] {
        &self.history
    }

    /// Evaluates every genome against one input vector without
    /// advancing the generation — for interactive debugging.
    pub fn evaluate(&mut self, inputs: &[f32]) {
        for genome in &mut self.genomes {
            genome.evaluate(inputs);
        }
    }

    /// Stage 1, single-threaded: `rawFitness = fitnessFn(genome)`.
    pub fn evaluate_with(&mut self, fitness: impl Fn(&Genome) -> f64) {
        for genome in &mut self.genomes {
            genome.raw_fitness = fitness(genome);
        }
    }

    /// Stage 1, parallel fitness evaluation (C12). Mutation and
    /// reproduction downstream of this call remain single-threaded;
    /// only the pure fitness scoring is parallelized.
    #[cfg(feature = "rayon")]
    pub fn evaluate_parallel_with(&mut self, fitness: impl Fn(&Genome) -> f64 + Sync + Send) {
        let scores: Vec<f64> = self.genomes.par_iter().map(&fitness).collect();
        for (genome, score) in self.genomes.iter_mut().zip(scores) {
            genome.raw_fitness = score;
        }
    }

    /// Runs one full generation: stages 1 is the caller's job via
    /// `evaluate_with`/`evaluate_parallel_with` beforehand; `step`
    /// covers stages 2 through 12.
    pub fn step(&mut self) {
        self.speciate();
        self.share_fitness();
        self.update_champions();
        self.update_species_average_fitness();
        self.update_global_best();
        self.analyze();
        self.purge_stale_species();
        self.recover_from_stagnation();
        self.refresh_mascots();
        self.reproduce();

        self.generation += 1;
        self.history.push(GenerationStats {
            generation: self.generation,
            species_count: self.species.len(),
            champion_fitness: self.global_best.as_ref().map_or(0.0, |g| g.raw_fitness),
            average_fitness: self.last_average_fitness,
        });
        log::info!(
            "generation {} complete: species={} global_staleness={}",
            self.generation,
            self.species.len(),
            self.global_staleness
        );
    }

    /// Stage 2. First-match speciation: insertion order of both genomes
    /// and species is part of the contract, so results are
    /// reproducible given the same seed.
    fn speciate(&mut self) {
        for species in &mut self.species {
            species.members.clear();
        }

        for index in 0..self.genomes.len() {
            let genome = &self.genomes[index];
            let home = self
                .species
                .iter()
                .position(|species| species.matches(genome, &self.config));
            match home {
                Some(species_index) => self.species[species_index].members.push(index),
                None => {
                    log::debug!("speciation: new species founded by genome {index}");
                    self.species
                        .push(Species::new(genome.clone(), index));
                }
            }
        }

        let before = self.species.len();
        self.species.retain(|species| !species.members.is_empty());
        if self.species.len() != before {
            log::debug!(
                "speciation: dropped {} empty species",
                before - self.species.len()
            );
        }
    }

    /// Stage 3.
    fn share_fitness(&mut self) {
        for species in &self.species {
            species.share_fitness(&mut self.genomes);
        }
    }

    /// Stage 4.
    fn update_champions(&mut self) {
        for species in &mut self.species {
            species.update_champion(&self.genomes);
        }
    }

    /// Stage 5.
    fn update_species_average_fitness(&mut self) {
        for species in &mut self.species {
            species.update_average_fitness(&self.genomes);
        }
    }

    /// Stage 6. The winner is kept as a standalone snapshot on
    /// `Population`, independent of species membership, so a later
    /// stagnation purge of its originating species can never lose it
    /// (§9 design note 4).
    fn update_global_best(&mut self) {
        let mut improved = false;
        for species in &self.species {
            if let Some(champion) = &species.champion {
                let is_better = match &self.global_best {
                    Some(best) => champion.raw_fitness > best.raw_fitness,
                    None => true,
                };
                if is_better {
                    self.global_best = Some(champion.clone());
                    improved = true;
                }
            }
        }
        if improved {
            self.global_staleness = 0;
            log::info!(
                "new global best: fitness={:.4}",
                self.global_best.as_ref().unwrap().raw_fitness
            );
        } else {
            self.global_staleness += 1;
        }
    }

    /// Stage 7. Marking elitism is read directly off `Species::is_elite`
    /// during reproduction; this stage computes the weighted average
    /// fitness for telemetry, recorded into `GenerationStats` by `step`
    /// once stage 12 runs.
    fn analyze(&mut self) {
        self.last_average_fitness = if self.genomes.is_empty() {
            0.0
        } else {
            self.genomes.iter().map(|g| g.shared_fitness).sum::<f64>() / self.genomes.len() as f64
        };
        log::debug!(
            "generation {} weighted average fitness: {:.4}",
            self.generation,
            self.last_average_fitness
        );
    }

    /// Stage 8. Drops species that have gone stale for too long, then
    /// trims each survivor to its top half. The global best itself
    /// lives outside the species list (see `update_global_best`), so
    /// dropping its species here never loses it.
    fn purge_stale_species(&mut self) {
        let before = self.species.len();
        self.species
            .retain(|species| species.staleness <= self.config.species_stagnation_limit);
        if self.species.len() != before {
            log::debug!(
                "purged {} stagnant species",
                before - self.species.len()
            );
        }

        for species in &mut self.species {
            species.purge(&self.genomes);
        }
    }

    /// Stage 9. A flat-fitness run drives every species' staleness up
    /// in lockstep; when the population as a whole stalls for too
    /// long, cut down to the two strongest species and try again.
    fn recover_from_stagnation(&mut self) {
        if self.global_staleness <= self.config.population_stagnation_limit {
            return;
        }
        log::warn!(
            "population stagnation recovery triggered after {} generations",
            self.global_staleness
        );

        self.species
            .sort_by(|a, b| b.average_fitness.total_cmp(&a.average_fitness));
        self.species
            .truncate(self.config.surviving_species_on_stagnation.max(1));
        self.global_staleness = 0;
    }

    /// Stage 10.
    fn refresh_mascots(&mut self) {
        for species in &mut self.species {
            species.refresh_mascot(&self.genomes, &mut self.rng);
        }
    }

    /// Stage 11/12: builds the next generation's genome list in place
    /// and increments is handled by the caller (`step`).
    fn reproduce(&mut self) {
        let target = self.config.demography;
        let mut next_generation = Vec::with_capacity(target);

        for species in &self.species {
            if species.is_elite(&self.config) {
                if let Some(champion) = &species.champion {
                    next_generation.push(champion.clone());
                }
            }
        }

        while next_generation.len() < target {
            let child = if self.rng.random::<f64>() < self.config.clone_and_mutate_prob {
                self.clone_and_mutate()
            } else {
                self.crossover_and_mutate()
            };
            next_generation.push(child);
        }

        next_generation.truncate(target);
        self.genomes = next_generation;
    }

    fn clone_and_mutate(&mut self) -> Genome {
        let index = select_from_population(&self.genomes, &mut self.rng);
        let mut child = self.genomes[index].clone();
        child.raw_fitness = 0.0;
        child.shared_fitness = 0.0;
        child.mutate(&self.config, &mut self.rng, &mut self.innovation);
        child
    }

    fn crossover_and_mutate(&mut self) -> Genome {
        let (a, b) = if self.rng.random_bool(self.config.inter_species_mating_prob) {
            let a = select_from_population(&self.genomes, &mut self.rng);
            let b = select_from_population(&self.genomes, &mut self.rng);
            (a, b)
        } else {
            let species_index = select_species(&self.species, &mut self.rng);
            let species = &self.species[species_index];
            let a = species.select_parent(&self.genomes, &mut self.rng);
            let b = species.select_parent(&self.genomes, &mut self.rng);
            (a, b)
        };

        let mut child = self.genomes[a].crossover(&self.genomes[b], &self.config, &mut self.rng);
        child.mutate(&self.config, &mut self.rng, &mut self.innovation);
        child
    }
}

/// Fitness-proportional sampling over the whole population's shared
/// fitness, falling back to uniform selection when every genome has
/// zero shared fitness (§7 "degenerate selection").
fn select_from_population(genomes: &[Genome], rng: &mut dyn RngCore) -> usize {
    let total: f64 = genomes.iter().map(|g| g.shared_fitness).sum();
    if total <= 0.0 {
        return (0..genomes.len()).choose(rng).unwrap();
    }
    let mut target = rng.random_range(0.0..total);
    for (index, genome) in genomes.iter().enumerate() {
        target -= genome.shared_fitness;
        if target <= 0.0 {
            return index;
        }
    }
    genomes.len() - 1
}

/// Fitness-proportional sampling over species' average fitness, same
/// uniform fallback.
fn select_species(species: &[Species], rng: &mut dyn RngCore) -> usize {
    let total: f64 = species.iter().map(|s| s.average_fitness).sum();
    if total <= 0.0 {
        return (0..species.len()).choose(rng).unwrap();
    }
    let mut target = rng.random_range(0.0..total);
    for (index, s) in species.iter().enumerate() {
        target -= s.average_fitness;
        if target <= 0.0 {
            return index;
        }
    }
    species.len() - 1
}
