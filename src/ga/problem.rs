//! CQGA-HEFT problem definition and evolution loop.
//!
//! Bridges the edge chromosome to the scheduling domain: a chromosome is
//! decoded by penalising its selected edges, learning an ordering with
//! [`QLearningScheduler`] and list-scheduling that ordering on the
//! un-penalised graph.
//!
//! # Evolution
//!
//! 1. Evaluate the initial random population.
//! 2. Keep the best `ceil(size / 4)` individuals (elites).
//! 3. Refill with single-point crossover children of elites drawn with
//!    replacement; mutate the children.
//! 4. Evaluate, repeat until the generation limit or the time budget.
//!
//! Fitness is deterministic per gene vector: the learning random source is
//! seeded from the run seed and the genes, so surviving elites keep their
//! fitness and the best fitness never increases.
//!
//! # Reference
//! Goldberg (1989), "Genetic Algorithms in Search, Optimization and Machine
//! Learning", Ch. 4 (elitist selection)

use std::time::{Duration, Instant};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::chromosome::EdgeChromosome;
use super::operators::GeneticOperators;
use super::{fittest, sort_by_fitness, Individual};
use crate::algorithms::QLearningScheduler;
use crate::config::{GeneticConfig, LearningConfig};
use crate::error::{Error, Result};
use crate::models::{ClusteredProcessor, TaskGraph, TaskId};
use crate::scheduler::ListScheduler;

/// Genetic hybrid scheduler.
///
/// # Example
/// ```no_run
/// use cluster_sched::config::{EpisodeBudget, GeneticConfig, LearningConfig};
/// use cluster_sched::ga::Cqgaheft;
/// use cluster_sched::models::{ClusteredProcessor, TaskGraph};
///
/// let graph = TaskGraph::from_costs(&[2, 3, 4], &[(0, 1, 5), (0, 2, 1)]).unwrap();
/// let processor = ClusteredProcessor::new(2, 2, 3.0).unwrap();
/// let learning = LearningConfig::default().with_episodes(EpisodeBudget::fixed(100));
/// let mut ga = Cqgaheft::new(&graph, &processor, learning, GeneticConfig::default(), 42).unwrap();
/// ga.evolution().unwrap();
/// let order = ga.sched_list().unwrap();
/// ```
#[derive(Debug, Clone)]
pub struct Cqgaheft {
    graph: TaskGraph,
    processor: ClusteredProcessor,
    edges: Vec<(TaskId, TaskId)>,
    learning: LearningConfig,
    genetic: GeneticConfig,
    operators: GeneticOperators,
    seed: u64,
    rng: StdRng,
    population: Vec<EdgeChromosome>,
    best_history: Vec<u64>,
    generations: usize,
    duration: Option<Duration>,
}

impl Cqgaheft {
    /// Creates the problem with a random initial population.
    ///
    /// # Errors
    /// `InvalidConfig` for an empty population.
    pub fn new(
        graph: &TaskGraph,
        processor: &ClusteredProcessor,
        learning: LearningConfig,
        genetic: GeneticConfig,
        seed: u64,
    ) -> Result<Self> {
        if genetic.population_size == 0 {
            return Err(Error::invalid_config("genetic.population_size must be > 0"));
        }
        let edges: Vec<(TaskId, TaskId)> = graph.dependencies().map(|d| (d.source, d.target)).collect();
        let mut rng = StdRng::seed_from_u64(seed);
        let population = (0..genetic.population_size)
            .map(|_| EdgeChromosome::random(edges.len(), &mut rng))
            .collect();
        let operators = GeneticOperators {
            mutation_type: genetic.mutation_type,
            mutation_ratio: genetic.mutation_ratio,
        };
        Ok(Self {
            graph: graph.clone(),
            processor: processor.clone(),
            edges,
            learning,
            genetic,
            operators,
            seed,
            rng,
            population,
            best_history: Vec::new(),
            generations: 0,
            duration: None,
        })
    }

    /// Copy of the graph with every edge selected by `chromosome` scaled by
    /// `inout_ratio` (truncated).
    pub fn penalised_graph(&self, chromosome: &EdgeChromosome) -> Result<TaskGraph> {
        let mut g = self.graph.clone();
        let ratio = self.processor.inout_ratio();
        for i in chromosome.penalised() {
            let (source, target) = self.edges[i];
            let comm = g.comm(source, target).unwrap_or(0);
            g.set_comm(source, target, (comm as f64 * ratio) as u64)?;
        }
        Ok(g)
    }

    /// Decodes a chromosome into a scheduling list.
    pub fn decode(&self, chromosome: &EdgeChromosome) -> Result<Vec<TaskId>> {
        let g = self.penalised_graph(chromosome)?;
        let mut ql = QLearningScheduler::new(&g, self.learning.alpha, self.learning.gamma)?;
        let episodes = self.learning.episodes.episodes_for(g.task_count());
        let mut rng = StdRng::seed_from_u64(self.chromosome_seed(chromosome));
        ql.learn(episodes, &mut rng);
        ql.extract_ordering()
    }

    /// Makespan of the decoded ordering on a fresh copy of the processor.
    pub fn fitness(&self, chromosome: &EdgeChromosome) -> Result<u64> {
        let list = self.decode(chromosome)?;
        let mut scheduler = ListScheduler::new(self.graph.clone(), self.processor.clone(), list);
        scheduler.schedule()?;
        scheduler.makespan()
    }

    fn chromosome_seed(&self, chromosome: &EdgeChromosome) -> u64 {
        let mut h = self.seed;
        for &gene in &chromosome.genes {
            h = splitmix64(h ^ u64::from(gene));
        }
        splitmix64(h)
    }

    fn evaluate_population(&mut self) -> Result<()> {
        for i in 0..self.population.len() {
            if self.population[i].fitness().is_some() {
                continue;
            }
            let f = self.fitness(&self.population[i])?;
            log::debug!("cqga-heft: chromosome {i} makespan {f}");
            self.population[i].set_fitness(f);
        }
        Ok(())
    }

    fn record_best(&mut self) {
        if let Some(best) = fittest(&self.population).and_then(|c| c.fitness()) {
            self.best_history.push(best);
        }
    }

    /// Runs the evolution loop.
    pub fn evolution(&mut self) -> Result<()> {
        let started = Instant::now();
        let budget = Duration::from_secs(self.genetic.time_budget_secs);
        let size = self.population.len();

        self.evaluate_population()?;
        self.record_best();

        for generation in 0..self.genetic.max_generations {
            sort_by_fitness(&mut self.population);
            let elites = size.div_ceil(4);
            let mut next: Vec<EdgeChromosome> = self.population[..elites].to_vec();
            while next.len() < size {
                let p1 = &self.population[self.rng.random_range(0..elites)];
                let p2 = &self.population[self.rng.random_range(0..elites)];
                let (c1, c2) = self.operators.crossover(p1, p2, &mut self.rng);
                next.push(c1);
                if next.len() < size {
                    next.push(c2);
                }
            }
            for child in &mut next[elites..] {
                self.operators.mutate(child, &mut self.rng);
            }
            self.population = next;
            self.evaluate_population()?;
            self.record_best();
            self.generations = generation + 1;
            log::info!(
                "cqga-heft: generation {} best makespan {:?}",
                self.generations,
                self.best_history.last()
            );

            if started.elapsed() >= budget {
                log::warn!(
                    "cqga-heft: time budget of {}s exhausted after {} generations",
                    self.genetic.time_budget_secs,
                    self.generations
                );
                break;
            }
        }

        self.duration = Some(started.elapsed());
        Ok(())
    }

    /// Best chromosome of the current population.
    pub fn best(&self) -> Option<&EdgeChromosome> {
        fittest(&self.population)
    }

    /// Scheduling list of the best chromosome.
    ///
    /// # Errors
    /// `InvalidOrdering` if the population was never evaluated.
    pub fn sched_list(&self) -> Result<Vec<TaskId>> {
        let best = self
            .best()
            .ok_or_else(|| Error::InvalidOrdering("population has not been evaluated".into()))?;
        self.decode(best)
    }

    /// Best fitness after the initial evaluation and after each generation.
    pub fn best_history(&self) -> &[u64] {
        &self.best_history
    }

    /// Completed generations.
    pub fn generations(&self) -> usize {
        self.generations
    }

    /// Wall time of the last [`evolution`](Self::evolution) call.
    pub fn duration(&self) -> Option<Duration> {
        self.duration
    }

    /// Current population.
    pub fn population(&self) -> &[EdgeChromosome] {
        &self.population
    }

    /// Dependencies in gene order.
    pub fn edges(&self) -> &[(TaskId, TaskId)] {
        &self.edges
    }
}

fn splitmix64(mut x: u64) -> u64 {
    x = x.wrapping_add(0x9E37_79B9_7F4A_7C15);
    x = (x ^ (x >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    x = (x ^ (x >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    x ^ (x >> 31)
}
