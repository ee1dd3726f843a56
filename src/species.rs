//! A cluster of genomes within compatibility distance of a shared
//! mascot (C6). Owns no genomes directly — members are indices into
//! `Population::genomes` for the current generation, while the mascot,
//! champion, and all-time best are kept as owned snapshots so they
//! survive the generation's genome list being replaced wholesale.

use rand::{seq::IteratorRandom, Rng, RngCore};

use crate::config::NeatConfig;
use crate::genome::Genome;

pub struct Species {
    pub mascot: Genome,
    pub members: Vec<usize>,
    pub best: Option<Genome>,
    pub best_fitness: f64,
    pub champion: Option<Genome>,
    pub staleness: usize,
    pub average_fitness: f64,
}

impl Species {
    pub fn new(mascot: Genome, founding_member: usize) -> Self {
        Species {
            mascot,
            members: vec![founding_member],
            best: None,
            best_fitness: f64::MIN,
            champion: None,
            staleness: 0,
            average_fitness: 0.0,
        }
    }

    pub fn matches(&self, candidate: &Genome, config: &NeatConfig) -> bool {
        candidate.compatibility_distance(&self.mascot, config) < config.compatibility_threshold
    }

    /// `sharedFitness = rawFitness / |members|` for every member.
    pub fn share_fitness(&self, genomes: &mut [Genome]) {
        let count = self.members.len() as f64;
        for &index in &self.members {
            genomes[index].shared_fitness = genomes[index].raw_fitness / count;
        }
    }

    /// This generation's top scorer becomes the champion. If it beats
    /// the all-time best, staleness resets; otherwise it increments.
    pub fn update_champion(&mut self, genomes: &[Genome]) {
        let Some(&top) = self
            .members
            .iter()
            .max_by(|&&a, &&b| genomes[a].raw_fitness.total_cmp(&genomes[b].raw_fitness))
        else {
            return;
        };
        let champion = genomes[top].clone();
        if champion.raw_fitness > self.best_fitness {
            self.best_fitness = champion.raw_fitness;
            self.best = Some(champion.clone());
            self.staleness = 0;
        } else {
            self.staleness += 1;
        }
        self.champion = Some(champion);
    }

    /// Sum (not mean) of member shared fitnesses — intentionally kept:
    /// since shared fitness is already `raw / |members|`, this sum
    /// equals the mean raw fitness.
    pub fn update_average_fitness(&mut self, genomes: &[Genome]) {
        self.average_fitness = self.members.iter().map(|&i| genomes[i].shared_fitness).sum();
    }

    pub fn is_elite(&self, config: &NeatConfig) -> bool {
        self.members.len() >= config.elitism_min_species_size
    }

    /// Keeps the top `ceil(|members| / 2)` by raw fitness, never fewer
    /// than one.
    pub fn purge(&mut self, genomes: &[Genome]) {
        let mut sorted = self.members.clone();
        sorted.sort_by(|&a, &b| genomes[b].raw_fitness.total_cmp(&genomes[a].raw_fitness));
        let keep = (sorted.len() + 1) / 2;
        sorted.truncate(keep.max(1));
        self.members = sorted;
    }

    pub fn refresh_mascot(&mut self, genomes: &[Genome], rng: &mut dyn RngCore) {
        if let Some(&index) = self.members.iter().choose(rng) {
            self.mascot = genomes[index].clone();
        }
    }

    /// Fitness-proportional sampling over shared fitness; falls back to
    /// uniform selection when every member has zero shared fitness
    /// (§7 "degenerate selection").
    pub fn select_parent(&self, genomes: &[Genome], rng: &mut dyn RngCore) -> usize {
        let total: f64 = self.members.iter().map(|&i| genomes[i].shared_fitness).sum();
        if total <= 0.0 {
            return *self.members.iter().choose(rng).unwrap();
        }
        let mut target = rng.random_range(0.0..total);
        for &index in &self.members {
            target -= genomes[index].shared_fitness;
            if target <= 0.0 {
                return index;
            }
        }
        *self.members.last().unwrap()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::innovation::InnovationRecord;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn rng() -> StdRng {
        StdRng::seed_from_u64(7)
    }

    #[test]
    fn purge_keeps_ceil_half_and_never_empties() {
        let config = NeatConfig::default();
        let mut innovation = InnovationRecord::new();
        let mascot = Genome::new(&config, &mut rng(), &mut innovation);
        let mut species = Species::new(mascot, 0);
        species.members = vec![0, 1, 2];
        let mut genomes = vec![
            Genome::new(&config, &mut rng(), &mut innovation),
            Genome::new(&config, &mut rng(), &mut innovation),
            Genome::new(&config, &mut rng(), &mut innovation),
        ];
        genomes[0].raw_fitness = 1.0;
        genomes[1].raw_fitness = 3.0;
        genomes[2].raw_fitness = 2.0;

        species.purge(&genomes);
        assert_eq!(species.members.len(), 2);
        assert_eq!(species.members[0], 1);
    }

    #[test]
    fn select_parent_falls_back_to_uniform_when_all_zero() {
        let config = NeatConfig::default();
        let mut innovation = InnovationRecord::new();
        let mascot = Genome::new(&config, &mut rng(), &mut innovation);
        let mut species = Species::new(mascot, 0);
        species.members = vec![0, 1];
        let genomes = vec![
            Genome::new(&config, &mut rng(), &mut innovation),
            Genome::new(&config, &mut rng(), &mut innovation),
        ];
        let index = species.select_parent(&genomes, &mut rng());
        assert!(index == 0 || index == 1);
    }
}
