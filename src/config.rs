//! Evaluation configuration.
//!
//! Every tunable of the learning and evolutionary schedulers lives here so
//! that experiments can be described in a JSON file instead of constants.
//! Missing fields take their defaults:
//!
//! ```json
//! {
//!   "seed": 42,
//!   "learning": {"alpha": 1.0, "gamma": 0.2,
//!                "episodes": {"by_task_count": {"52": 2000}, "default_episodes": 1000}},
//!   "genetic": {"population_size": 8, "max_generations": 30, "mutation_ratio": 0.01},
//!   "shaping": {"tolerance": 0.01, "max_iterations": 10000}
//! }
//! ```

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::ga::operators::MutationType;

/// Top-level configuration of an evaluation run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EvaluationConfig {
    /// Seed for every random draw. `None` seeds from OS entropy.
    pub seed: Option<u64>,
    /// Q-learning parameters.
    pub learning: LearningConfig,
    /// Genetic algorithm parameters.
    pub genetic: GeneticConfig,
    /// CCR shaping parameters.
    pub shaping: ShapingConfig,
}

/// Q-learning parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LearningConfig {
    /// Learning rate.
    pub alpha: f64,
    /// Discount factor.
    pub gamma: f64,
    /// Number of learning episodes per graph size.
    pub episodes: EpisodeBudget,
}

/// Learning episodes keyed by the number of tasks of the graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EpisodeBudget {
    /// Task count → episodes.
    pub by_task_count: BTreeMap<usize, usize>,
    /// Episodes for graph sizes missing from the table.
    pub default_episodes: usize,
}

/// Genetic algorithm parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneticConfig {
    /// Individuals per generation.
    pub population_size: usize,
    /// Generation limit.
    pub max_generations: usize,
    /// Per-gene mutation probability.
    pub mutation_ratio: f64,
    /// Wall-clock budget, checked at the end of each generation.
    pub time_budget_secs: u64,
    /// Mutation operator.
    pub mutation_type: MutationType,
}

/// Parameters of [`shape_to_target_ccr`](crate::rank::shape_to_target_ccr).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShapingConfig {
    /// Accepted distance between the rounded CCR and the target.
    pub tolerance: f64,
    /// Scaling rounds before giving up.
    pub max_iterations: usize,
}

impl Default for LearningConfig {
    fn default() -> Self {
        Self {
            alpha: 1.0,
            gamma: 0.2,
            episodes: EpisodeBudget::default(),
        }
    }
}

impl Default for EpisodeBudget {
    fn default() -> Self {
        Self {
            by_task_count: BTreeMap::new(),
            default_episodes: 1000,
        }
    }
}

impl Default for GeneticConfig {
    fn default() -> Self {
        Self {
            population_size: 8,
            max_generations: 30,
            mutation_ratio: 0.01,
            time_budget_secs: 4 * 60 * 60,
            mutation_type: MutationType::default(),
        }
    }
}

impl Default for ShapingConfig {
    fn default() -> Self {
        Self {
            tolerance: 0.01,
            max_iterations: 10_000,
        }
    }
}

impl EpisodeBudget {
    /// A budget using `episodes` for every graph size.
    pub fn fixed(episodes: usize) -> Self {
        Self {
            by_task_count: BTreeMap::new(),
            default_episodes: episodes,
        }
    }

    /// Sets the episode count for one graph size.
    pub fn with_entry(mut self, task_count: usize, episodes: usize) -> Self {
        self.by_task_count.insert(task_count, episodes);
        self
    }

    /// Episodes for a graph with `task_count` tasks.
    pub fn episodes_for(&self, task_count: usize) -> usize {
        self.by_task_count
            .get(&task_count)
            .copied()
            .unwrap_or(self.default_episodes)
    }
}

impl EvaluationConfig {
    /// Creates the default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Reads and validates a JSON configuration file.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    /// Sets the random seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Sets the Q-learning parameters.
    pub fn with_learning(mut self, learning: LearningConfig) -> Self {
        self.learning = learning;
        self
    }

    /// Sets the genetic algorithm parameters.
    pub fn with_genetic(mut self, genetic: GeneticConfig) -> Self {
        self.genetic = genetic;
        self
    }

    /// Sets the CCR shaping parameters.
    pub fn with_shaping(mut self, shaping: ShapingConfig) -> Self {
        self.shaping = shaping;
        self
    }

    /// Checks parameter ranges.
    ///
    /// # Errors
    /// `InvalidConfig` naming the first offending field.
    pub fn validate(&self) -> Result<()> {
        let l = &self.learning;
        if !(l.alpha.is_finite() && l.alpha > 0.0 && l.alpha <= 1.0) {
            return Err(Error::invalid_config(format!(
                "learning.alpha must be in (0, 1], got {}",
                l.alpha
            )));
        }
        if !(l.gamma.is_finite() && (0.0..1.0).contains(&l.gamma)) {
            return Err(Error::invalid_config(format!(
                "learning.gamma must be in [0, 1), got {}",
                l.gamma
            )));
        }
        let g = &self.genetic;
        if g.population_size < 2 {
            return Err(Error::invalid_config(format!(
                "genetic.population_size must be >= 2, got {}",
                g.population_size
            )));
        }
        if !(0.0..=1.0).contains(&g.mutation_ratio) {
            return Err(Error::invalid_config(format!(
                "genetic.mutation_ratio must be in [0, 1], got {}",
                g.mutation_ratio
            )));
        }
        if !(self.shaping.tolerance.is_finite() && self.shaping.tolerance > 0.0) {
            return Err(Error::invalid_config(format!(
                "shaping.tolerance must be > 0, got {}",
                self.shaping.tolerance
            )));
        }
        Ok(())
    }
}

impl LearningConfig {
    /// Sets the learning rate.
    pub fn with_alpha(mut self, alpha: f64) -> Self {
        self.alpha = alpha;
        self
    }

    /// Sets the discount factor.
    pub fn with_gamma(mut self, gamma: f64) -> Self {
        self.gamma = gamma;
        self
    }

    /// Sets the episode budget.
    pub fn with_episodes(mut self, episodes: EpisodeBudget) -> Self {
        self.episodes = episodes;
        self
    }
}

impl GeneticConfig {
    /// Sets the population size.
    pub fn with_population_size(mut self, size: usize) -> Self {
        self.population_size = size;
        self
    }

    /// Sets the generation limit.
    pub fn with_max_generations(mut self, generations: usize) -> Self {
        self.max_generations = generations;
        self
    }

    /// Sets the per-gene mutation probability.
    pub fn with_mutation_ratio(mut self, ratio: f64) -> Self {
        self.mutation_ratio = ratio;
        self
    }

    /// Sets the wall-clock budget in seconds.
    pub fn with_time_budget_secs(mut self, secs: u64) -> Self {
        self.time_budget_secs = secs;
        self
    }

    /// Sets the mutation operator.
    pub fn with_mutation_type(mut self, mutation_type: MutationType) -> Self {
        self.mutation_type = mutation_type;
        self
    }
}
