//! Optimization engine for parameter search.
//!
//! Runs grid, genetic or stochastic search over a discrete parameter space.
//! Market data is loaded once per optimization and shared by every candidate.
//! Only one optimization may run per engine at a time.

use crate::application::optimization::search::{
    self, GeneticOperators, STOCHASTIC_INITIAL_BATCH,
};
use crate::application::optimization::simulator::{MarketDataSet, Simulator};
use crate::domain::backtest::BacktestResult;
use crate::domain::errors::{EvaluationError, OptimizationError};
use crate::domain::optimization::fitness;
use crate::domain::optimization::parameters::{ParameterSet, space_size};
use crate::domain::optimization::types::{
    OptimizationConfig, OptimizationResult, OptimizationStep, SearchMethod,
};
use chrono::Utc;
use futures::StreamExt;
use rand::SeedableRng;
use rand::rngs::StdRng;
use serde_json::Value;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;
use tracing::{debug, info, warn};

/// Clears the running flag when the optimization ends, however it ends.
struct RunningGuard<'a>(&'a AtomicBool);

impl Drop for RunningGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Append-only step history with the index of the best step so far
#[derive(Default)]
struct SearchState {
    history: Vec<OptimizationStep>,
    best: Option<usize>,
    attempted: usize,
}

impl SearchState {
    fn push(&mut self, parameters: ParameterSet, fitness: f64, result: BacktestResult) {
        let step = OptimizationStep {
            iteration: self.history.len(),
            parameters,
            fitness,
            result,
            timestamp: Utc::now(),
        };
        let improved = self
            .best
            .map(|i| fitness > self.history[i].fitness)
            .unwrap_or(true);
        if improved {
            self.best = Some(self.history.len());
        }
        self.history.push(step);
    }

    fn best_fitness(&self) -> Option<f64> {
        self.best.map(|i| self.history[i].fitness)
    }
}

pub struct OptimizationEngine {
    simulator: Simulator,
    running: AtomicBool,
}

impl OptimizationEngine {
    pub fn new(simulator: Simulator) -> Self {
        Self {
            simulator,
            running: AtomicBool::new(false),
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    pub fn simulator(&self) -> &Simulator {
        &self.simulator
    }

    pub async fn optimize_algorithm(
        &self,
        config: OptimizationConfig,
    ) -> Result<OptimizationResult, OptimizationError> {
        if self
            .running
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            warn!("OptimizationEngine: rejected request, an optimization is already running");
            return Err(OptimizationError::AlreadyRunning);
        }
        let _guard = RunningGuard(&self.running);

        config.validate()?;
        let started = Instant::now();

        info!(
            "OptimizationEngine: {} search for '{}' over {} combinations (budget {}, metric {})",
            config.method,
            config.base.strategy_id,
            space_size(&config.parameter_space),
            config.max_iterations,
            config.fitness_metric
        );

        let data = Arc::new(self.simulator.load_market_data(&config.base).await);
        debug!(
            "OptimizationEngine: loaded {} bars across {} symbols",
            data.bar_count(),
            data.series.len()
        );

        let mut rng = match config.base.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        let mut state = SearchState::default();

        match config.method {
            SearchMethod::Grid => self.grid_search(&config, &data, &mut state).await,
            SearchMethod::Genetic => {
                self.genetic_search(&config, &data, &mut state, &mut rng)
                    .await
            }
            SearchMethod::Stochastic => {
                self.stochastic_search(&config, &data, &mut state, &mut rng)
                    .await
            }
        }

        let Some(best_index) = state.best else {
            warn!(
                "OptimizationEngine: all {} candidate evaluations failed",
                state.attempted
            );
            return Err(OptimizationError::NoValidResults {
                attempted: state.attempted,
            });
        };

        let fitness_values: Vec<f64> = state.history.iter().map(|s| s.fitness).collect();
        let average_fitness = fitness_values.iter().sum::<f64>() / fitness_values.len() as f64;
        let convergence = fitness::convergence(&fitness_values);
        let best = state.history[best_index].clone();

        info!(
            "OptimizationEngine: best {} with fitness {:.4} after {} steps ({} failed)",
            best.parameters,
            best.fitness,
            state.history.len(),
            state.attempted - state.history.len()
        );

        self.simulator.record(&best.result, best.fitness).await;

        Ok(OptimizationResult {
            method: config.method,
            fitness_metric: config.fitness_metric,
            best_parameters: best.parameters,
            best_result: best.result,
            best_fitness: best.fitness,
            average_fitness,
            convergence,
            duration_ms: started.elapsed().as_millis() as u64,
            history: state.history,
        })
    }

    async fn grid_search(
        &self,
        config: &OptimizationConfig,
        data: &Arc<MarketDataSet>,
        state: &mut SearchState,
    ) {
        let limit = config
            .max_iterations
            .min(space_size(&config.parameter_space));
        let candidates: Vec<ParameterSet> = search::grid_candidates(&config.parameter_space)
            .take(limit)
            .collect();

        info!("GridSearch: evaluating {} combinations", candidates.len());
        self.evaluate_batch(config, data, candidates, state).await;
    }

    /// `max_iterations` generations of `population_size` individuals.
    async fn genetic_search(
        &self,
        config: &OptimizationConfig,
        data: &Arc<MarketDataSet>,
        state: &mut SearchState,
        rng: &mut StdRng,
    ) {
        let operators = GeneticOperators {
            mutation_rate: config.mutation_rate,
            crossover_rate: config.crossover_rate,
        };
        let mut population: Vec<ParameterSet> = (0..config.population_size)
            .map(|_| search::sample_candidate(&config.parameter_space, rng))
            .collect();

        for generation in 0..config.max_iterations {
            let scores = self
                .evaluate_batch(config, data, population.clone(), state)
                .await;

            // Failed individuals never win a tournament
            let scored: Vec<(ParameterSet, f64)> = population
                .into_iter()
                .zip(scores)
                .map(|(individual, score)| (individual, score.unwrap_or(f64::NEG_INFINITY)))
                .collect();

            match scored.iter().max_by(|a, b| a.1.total_cmp(&b.1)) {
                Some((best, score)) if score.is_finite() => info!(
                    "GeneticSearch: generation {}/{} best {} fitness {:.4}",
                    generation + 1,
                    config.max_iterations,
                    best,
                    score
                ),
                _ => warn!(
                    "GeneticSearch: generation {}/{} produced no valid individuals",
                    generation + 1,
                    config.max_iterations
                ),
            }

            population = operators.breed(&scored, &config.parameter_space, rng);
        }
    }

    /// Uniform random sampling, starting with a batch of up to ten points.
    async fn stochastic_search(
        &self,
        config: &OptimizationConfig,
        data: &Arc<MarketDataSet>,
        state: &mut SearchState,
        rng: &mut StdRng,
    ) {
        let initial = STOCHASTIC_INITIAL_BATCH.min(config.max_iterations);
        let batch: Vec<ParameterSet> = (0..initial)
            .map(|_| search::sample_candidate(&config.parameter_space, rng))
            .collect();
        self.evaluate_batch(config, data, batch, state).await;
        info!(
            "StochasticSearch: initial batch of {} done, best fitness {:?}",
            initial,
            state.best_fitness()
        );

        let remaining: Vec<ParameterSet> = (initial..config.max_iterations)
            .map(|_| search::sample_candidate(&config.parameter_space, rng))
            .collect();
        self.evaluate_batch(config, data, remaining, state).await;
    }

    /// Evaluates up to `max_concurrency` candidates at once, each replayed on
    /// its own blocking thread, and records successes in issue order.
    /// Returns one fitness per candidate, None for failures.
    async fn evaluate_batch(
        &self,
        config: &OptimizationConfig,
        data: &Arc<MarketDataSet>,
        candidates: Vec<ParameterSet>,
        state: &mut SearchState,
    ) -> Vec<Option<f64>> {
        let outcomes: Vec<(ParameterSet, Result<BacktestResult, EvaluationError>)> =
            futures::stream::iter(candidates.into_iter().map(|params| async move {
                let outcome = self.evaluate(config, data, &params).await;
                (params, outcome)
            }))
            .buffered(config.max_concurrency)
            .collect()
            .await;

        let mut scores = Vec::with_capacity(outcomes.len());
        for (params, outcome) in outcomes {
            state.attempted += 1;
            match outcome {
                Ok(result) => {
                    let score = fitness::score(&result, config.fitness_metric);
                    debug!("Optimizer: {} -> fitness {:.4}", params, score);
                    state.push(params, score, result);
                    scores.push(Some(score));
                }
                Err(e) => {
                    warn!("Optimizer: skipping {}: {}", params, e);
                    scores.push(None);
                }
            }
        }
        scores
    }

    async fn evaluate(
        &self,
        config: &OptimizationConfig,
        data: &Arc<MarketDataSet>,
        params: &ParameterSet,
    ) -> Result<BacktestResult, EvaluationError> {
        if let Some((name, _)) = params
            .iter()
            .find(|(_, v)| matches!(v, Value::Array(_) | Value::Object(_)))
        {
            return Err(EvaluationError::InvalidParameter(format!(
                "'{}' must be a scalar value",
                name
            )));
        }

        let backtest = config.base.with_parameters(params.clone());
        Ok(self.simulator.run_with_data(&backtest, data).await?)
    }
}
