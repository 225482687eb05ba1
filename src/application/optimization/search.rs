//! Candidate generation for the three search methods.

use crate::domain::optimization::parameters::{ParameterSet, ParameterSpace};
use itertools::Itertools;
use rand::Rng;
use rand::seq::IndexedRandom;

/// Size of the first stochastic batch
pub const STOCHASTIC_INITIAL_BATCH: usize = 10;

/// Individuals compared in each tournament
pub const TOURNAMENT_SIZE: usize = 3;

/// Every combination of the space in generation order (last parameter varies fastest).
pub fn grid_candidates(space: &ParameterSpace) -> impl Iterator<Item = ParameterSet> + '_ {
    let names: Vec<&String> = space.keys().collect();
    space
        .values()
        .multi_cartesian_product()
        .map(move |values| {
            names
                .iter()
                .zip(values)
                .map(|(name, value)| ((*name).clone(), value.clone()))
                .collect()
        })
}

/// Independently samples one value per parameter.
pub fn sample_candidate<R: Rng + ?Sized>(space: &ParameterSpace, rng: &mut R) -> ParameterSet {
    space
        .iter()
        .filter_map(|(name, values)| values.choose(rng).map(|v| (name.clone(), v.clone())))
        .collect()
}

/// Genetic operators over a fixed parameter space
#[derive(Debug, Clone, Copy)]
pub struct GeneticOperators {
    pub mutation_rate: f64,
    pub crossover_rate: f64,
}

impl GeneticOperators {
    /// Best of `TOURNAMENT_SIZE` random picks (with replacement).
    pub fn tournament<'a, R: Rng + ?Sized>(
        &self,
        scored: &'a [(ParameterSet, f64)],
        rng: &mut R,
    ) -> Option<&'a ParameterSet> {
        if scored.is_empty() {
            return None;
        }
        (0..TOURNAMENT_SIZE)
            .map(|_| &scored[rng.random_range(0..scored.len())])
            .max_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(params, _)| params)
    }

    /// Uniform crossover: each gene comes from `other` with probability `crossover_rate`.
    pub fn crossover<R: Rng + ?Sized>(
        &self,
        first: &ParameterSet,
        other: &ParameterSet,
        rng: &mut R,
    ) -> ParameterSet {
        first
            .iter()
            .map(|(name, value)| {
                let gene = match other.get(name) {
                    Some(theirs) if rng.random_bool(self.crossover_rate) => theirs.clone(),
                    _ => value.clone(),
                };
                (name.clone(), gene)
            })
            .collect()
    }

    /// Resamples each gene from its domain with probability `mutation_rate`.
    pub fn mutate<R: Rng + ?Sized>(
        &self,
        individual: &mut ParameterSet,
        space: &ParameterSpace,
        rng: &mut R,
    ) {
        for (name, values) in space {
            if rng.random_bool(self.mutation_rate)
                && let Some(value) = values.choose(rng)
            {
                individual.insert(name.clone(), value.clone());
            }
        }
    }

    /// Next generation of the same size as `scored`.
    pub fn breed<R: Rng + ?Sized>(
        &self,
        scored: &[(ParameterSet, f64)],
        space: &ParameterSpace,
        rng: &mut R,
    ) -> Vec<ParameterSet> {
        let mut next = Vec::with_capacity(scored.len());
        while next.len() < scored.len() {
            let (Some(a), Some(b)) = (self.tournament(scored, rng), self.tournament(scored, rng))
            else {
                break;
            };
            let mut child = self.crossover(a, b, rng);
            self.mutate(&mut child, space, rng);
            next.push(child);
        }
        next
    }
}
