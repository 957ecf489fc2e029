//! Q-learning task ordering (QL-HEFT).
//!
//! The graph is closed with a virtual entry and exit task, and each task's
//! upward rank becomes the reward for choosing it. Learning runs episodic
//! random walks over precedence-valid partial orders; the greedy policy of
//! the learned Q-table is the scheduling list.
//!
//! # Algorithm
//!
//! Each episode starts at the virtual entry. At every step a task is drawn
//! uniformly from the ready set, its newly-ready successors join the set and
//!
//! ```text
//! Q[prev, picked] += alpha * (rank[picked] + gamma * max_a Q[picked, a] - Q[prev, picked])
//! ```
//!
//! # Reference
//! Tong et al. (2020), "QL-HEFT: a novel machine learning scheduling scheme
//! base on cloud computing environment", Neural Comput. & Applic. 32

use std::time::{Duration, Instant};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::OrderingStrategy;
use crate::config::LearningConfig;
use crate::error::{Error, Result};
use crate::models::{TaskGraph, TaskId};
use crate::rank::{insert_virtual_entry, insert_virtual_exit, normalize_comm_for_ranking, upward_rank};

/// Q-learning scheduler bound to one graph.
///
/// # Example
///
/// ```
/// use cluster_sched::algorithms::QLearningScheduler;
/// use cluster_sched::models::TaskGraph;
/// use rand::SeedableRng;
///
/// let graph = TaskGraph::from_costs(&[2, 3, 1], &[(0, 1, 1), (0, 2, 4)]).unwrap();
/// let mut ql = QLearningScheduler::new(&graph, 1.0, 0.2).unwrap();
/// ql.learn(200, &mut rand::rngs::SmallRng::seed_from_u64(7));
/// let order = ql.extract_ordering().unwrap();
/// assert_eq!(order[0], 0);
/// ```
#[derive(Debug, Clone)]
pub struct QLearningScheduler {
    graph: TaskGraph,
    entry: TaskId,
    exit: TaskId,
    alpha: f64,
    gamma: f64,
    rewards: Vec<u64>,
    q_table: Vec<f64>,
    width: usize,
    learning_duration: Option<Duration>,
}

impl QLearningScheduler {
    /// Prepares learning over a copy of `graph`.
    ///
    /// # Errors
    /// `DegenerateGraph` if the graph has no task.
    pub fn new(graph: &TaskGraph, alpha: f64, gamma: f64) -> Result<Self> {
        Self::prepare(graph.clone(), alpha, gamma)
    }

    /// Like [`new`](Self::new), with communication normalised for a
    /// clustered processor before the rewards are computed.
    pub fn for_cluster(graph: &TaskGraph, alpha: f64, gamma: f64, inout_ratio: f64) -> Result<Self> {
        let mut g = graph.clone();
        normalize_comm_for_ranking(&mut g, inout_ratio);
        Self::prepare(g, alpha, gamma)
    }

    fn prepare(mut graph: TaskGraph, alpha: f64, gamma: f64) -> Result<Self> {
        if graph.task_count() == 0 {
            return Err(Error::degenerate("cannot learn an ordering of an empty graph"));
        }
        let entry = insert_virtual_entry(&mut graph)?;
        let exit = insert_virtual_exit(&mut graph)?;
        let rewards = upward_rank(&mut graph);
        let width = graph.slot_count();
        Ok(Self {
            graph,
            entry,
            exit,
            alpha,
            gamma,
            rewards,
            q_table: vec![0.0; width * width],
            width,
            learning_duration: None,
        })
    }

    /// Runs `episodes` learning episodes.
    pub fn learn<R: Rng>(&mut self, episodes: usize, rng: &mut R) {
        let started = Instant::now();
        let steps = self.graph.task_count() - 1;
        for _ in 0..episodes {
            let mut walk = ReadySet::new(self);
            let mut current = self.entry;
            for _ in 0..steps {
                if walk.ready.is_empty() {
                    break;
                }
                let picked = walk.ready.swap_remove(rng.random_range(0..walk.ready.len()));
                walk.take(&self.graph, picked);

                let next_best = self.row(picked).iter().copied().fold(f64::NEG_INFINITY, f64::max);
                let target = self.rewards[picked] as f64 + self.gamma * next_best;
                let idx = current * self.width + picked;
                let delta = self.alpha * (target - self.q_table[idx]);
                self.q_table[idx] += delta;
                current = picked;
            }
        }
        let elapsed = started.elapsed();
        log::debug!(
            "q-learning: {episodes} episodes over {} tasks in {:?}",
            steps + 1,
            elapsed
        );
        self.learning_duration = Some(elapsed);
    }

    /// Greedy walk over the Q-table from the virtual entry.
    ///
    /// Ties go to the earliest task to have become ready. Virtual tasks are
    /// stripped from the result.
    pub fn extract_ordering(&self) -> Result<Vec<TaskId>> {
        let mut walk = ReadySet::new(self);
        let mut current = self.entry;
        let mut order = Vec::with_capacity(self.graph.task_count());

        while !walk.ready.is_empty() {
            let row = self.row(current);
            let mut best = 0;
            for (i, &task) in walk.ready.iter().enumerate().skip(1) {
                if row[task] > row[walk.ready[best]] {
                    best = i;
                }
            }
            let picked = walk.ready.remove(best);
            walk.take(&self.graph, picked);
            if picked != self.exit {
                order.push(picked);
            }
            current = picked;
        }

        if order.len() + 2 != self.graph.task_count() {
            return Err(Error::InvalidOrdering(format!(
                "greedy walk reached {} of {} tasks",
                order.len(),
                self.graph.task_count() - 2
            )));
        }
        Ok(order)
    }

    fn row(&self, task: TaskId) -> &[f64] {
        &self.q_table[task * self.width..(task + 1) * self.width]
    }

    /// Q-value of moving from `from` to `to`.
    pub fn q_value(&self, from: TaskId, to: TaskId) -> f64 {
        self.q_table[from * self.width + to]
    }

    /// The learning graph, virtual tasks included.
    pub fn graph(&self) -> &TaskGraph {
        &self.graph
    }

    /// Id of the virtual entry task.
    pub fn virtual_entry(&self) -> TaskId {
        self.entry
    }

    /// Id of the virtual exit task.
    pub fn virtual_exit(&self) -> TaskId {
        self.exit
    }

    /// Wall time of the last [`learn`](Self::learn) call.
    pub fn learning_duration(&self) -> Option<Duration> {
        self.learning_duration
    }
}

/// Ready set of a precedence-respecting walk.
struct ReadySet {
    ready: Vec<TaskId>,
    chosen: Vec<bool>,
    queued: Vec<bool>,
}

impl ReadySet {
    fn new(ql: &QLearningScheduler) -> Self {
        let mut chosen = vec![false; ql.width];
        let mut queued = vec![false; ql.width];
        chosen[ql.entry] = true;
        let ready: Vec<TaskId> = ql.graph.successors(ql.entry).map(|(s, _)| s).collect();
        for &t in &ready {
            queued[t] = true;
        }
        Self {
            ready,
            chosen,
            queued,
        }
    }

    /// Marks `task` chosen and queues the successors it releases.
    fn take(&mut self, graph: &TaskGraph, task: TaskId) {
        self.chosen[task] = true;
        for (succ, _) in graph.successors(task) {
            if !self.queued[succ] && graph.predecessors(succ).all(|p| self.chosen[p]) {
                self.queued[succ] = true;
                self.ready.push(succ);
            }
        }
    }
}

/// QL-HEFT as an [`OrderingStrategy`]: a fresh [`QLearningScheduler`] per
/// graph, trained for the configured episode budget.
#[derive(Debug, Clone)]
pub struct QlHeft {
    config: LearningConfig,
    inout_ratio: f64,
    rng: StdRng,
    last_duration: Option<Duration>,
}

impl QlHeft {
    /// Creates the strategy with a seeded random source.
    pub fn new(config: LearningConfig, inout_ratio: f64, seed: u64) -> Self {
        Self {
            config,
            inout_ratio,
            rng: StdRng::seed_from_u64(seed),
            last_duration: None,
        }
    }

    /// Learning wall time of the last ordering.
    pub fn learning_duration(&self) -> Option<Duration> {
        self.last_duration
    }
}

impl OrderingStrategy for QlHeft {
    fn name(&self) -> &'static str {
        "QL-HEFT"
    }

    fn sched_list(&mut self, graph: &TaskGraph) -> Result<Vec<TaskId>> {
        let mut ql = QLearningScheduler::for_cluster(
            graph,
            self.config.alpha,
            self.config.gamma,
            self.inout_ratio,
        )?;
        let episodes = self.config.episodes.episodes_for(graph.task_count());
        ql.learn(episodes, &mut self.rng);
        self.last_duration = ql.learning_duration();
        ql.extract_ordering()
    }
}
