use crate::domain::backtest::{BacktestConfig, BacktestResult};
use crate::domain::errors::OptimizationError;
use crate::domain::optimization::parameters::{ParameterSet, ParameterSpace};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Search algorithm used to walk the parameter space
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchMethod {
    #[default]
    Grid,
    Genetic,
    /// Uniform random resampling. Accepts "bayesian" for compatibility.
    #[serde(alias = "bayesian")]
    Stochastic,
}

impl FromStr for SearchMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "grid" => Ok(SearchMethod::Grid),
            "genetic" | "ga" => Ok(SearchMethod::Genetic),
            "stochastic" | "random" | "bayesian" => Ok(SearchMethod::Stochastic),
            _ => Err(format!("Invalid search method: {}", s)),
        }
    }
}

impl fmt::Display for SearchMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SearchMethod::Grid => write!(f, "grid"),
            SearchMethod::Genetic => write!(f, "genetic"),
            SearchMethod::Stochastic => write!(f, "stochastic"),
        }
    }
}

/// Objective maximized by the search. Unknown names resolve to `Returns`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum FitnessMetric {
    Sharpe,
    #[default]
    Returns,
    Calmar,
    /// 0.4 Sharpe + 0.3 return + 0.2 win rate + 0.1 (1 - max drawdown)
    Custom,
}

impl From<&str> for FitnessMetric {
    fn from(name: &str) -> Self {
        match name.to_lowercase().as_str() {
            "sharpe" | "sharpe_ratio" => FitnessMetric::Sharpe,
            "calmar" | "calmar_ratio" => FitnessMetric::Calmar,
            "custom" | "composite" => FitnessMetric::Custom,
            _ => FitnessMetric::Returns,
        }
    }
}

impl From<String> for FitnessMetric {
    fn from(name: String) -> Self {
        FitnessMetric::from(name.as_str())
    }
}

impl From<FitnessMetric> for String {
    fn from(metric: FitnessMetric) -> Self {
        metric.to_string()
    }
}

impl fmt::Display for FitnessMetric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FitnessMetric::Sharpe => write!(f, "sharpe"),
            FitnessMetric::Returns => write!(f, "returns"),
            FitnessMetric::Calmar => write!(f, "calmar"),
            FitnessMetric::Custom => write!(f, "custom"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptimizationConfig {
    /// Strategy, symbols, date range and costs shared by every candidate
    pub base: BacktestConfig,
    pub parameter_space: ParameterSpace,
    #[serde(default)]
    pub method: SearchMethod,
    #[serde(default)]
    pub fitness_metric: FitnessMetric,
    /// Evaluations for grid/stochastic, generations for genetic
    pub max_iterations: usize,
    #[serde(default = "default_population_size")]
    pub population_size: usize,
    #[serde(default = "default_mutation_rate")]
    pub mutation_rate: f64,
    #[serde(default = "default_crossover_rate")]
    pub crossover_rate: f64,
    /// Candidate evaluations in flight at once
    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: usize,
}

fn default_population_size() -> usize {
    50
}

fn default_mutation_rate() -> f64 {
    0.1
}

fn default_crossover_rate() -> f64 {
    0.7
}

fn default_max_concurrency() -> usize {
    1
}

impl OptimizationConfig {
    pub fn new(base: BacktestConfig, parameter_space: ParameterSpace) -> Self {
        Self {
            base,
            parameter_space,
            method: SearchMethod::Grid,
            fitness_metric: FitnessMetric::Returns,
            max_iterations: 100,
            population_size: default_population_size(),
            mutation_rate: default_mutation_rate(),
            crossover_rate: default_crossover_rate(),
            max_concurrency: default_max_concurrency(),
        }
    }

    pub fn validate(&self) -> Result<(), OptimizationError> {
        self.base.validate()?;

        if self.parameter_space.is_empty() || self.parameter_space.values().any(|v| v.is_empty())
        {
            return Err(OptimizationError::EmptyParameterSpace);
        }
        if self.max_iterations == 0 {
            return Err(OptimizationError::InvalidConfig(
                "max_iterations must be greater than 0".to_string(),
            ));
        }
        if self.method == SearchMethod::Genetic && self.population_size == 0 {
            return Err(OptimizationError::InvalidConfig(
                "population_size must be greater than 0".to_string(),
            ));
        }
        for (name, rate) in [
            ("mutation_rate", self.mutation_rate),
            ("crossover_rate", self.crossover_rate),
        ] {
            if !(0.0..=1.0).contains(&rate) {
                return Err(OptimizationError::InvalidConfig(format!(
                    "{} must be within [0, 1], got {}",
                    name, rate
                )));
            }
        }
        if self.max_concurrency == 0 {
            return Err(OptimizationError::InvalidConfig(
                "max_concurrency must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }
}

/// One evaluated candidate. Never mutated after it is recorded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptimizationStep {
    pub iteration: usize,
    pub parameters: ParameterSet,
    pub fitness: f64,
    pub result: BacktestResult,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptimizationResult {
    pub method: SearchMethod,
    pub fitness_metric: FitnessMetric,
    pub best_parameters: ParameterSet,
    pub best_result: BacktestResult,
    pub best_fitness: f64,
    pub average_fitness: f64,
    /// Percentage; 0 when fewer than 10 steps were recorded
    pub convergence: f64,
    pub duration_ms: u64,
    pub history: Vec<OptimizationStep>,
}
