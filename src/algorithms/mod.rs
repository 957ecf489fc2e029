//! Task-ordering algorithms.
//!
//! Every algorithm produces a scheduling list: a precedence-valid total
//! order of the live tasks, consumed by
//! [`ListScheduler`](crate::scheduler::ListScheduler).
//!
//! | Algorithm | Priority |
//! |-----------|----------|
//! | HEFT | Upward rank over normalised communication |
//! | QL-HEFT | Greedy policy of a Q-table rewarded by upward rank |
//! | HTSTC | `pre` score after merging chains of cheap tasks |
//!
//! The genetic hybrid (CQGA-HEFT) lives in [`crate::ga`].
//!
//! # References
//!
//! - Topcuoglu et al. (2002), "Performance-effective and low-complexity task
//!   scheduling for heterogeneous computing"
//! - Tong et al. (2020), "QL-HEFT: a novel machine learning scheduling
//!   scheme base on cloud computing environment", Neural Comput. & Applic.

mod clustering;
mod heft;
mod qlearning;

pub use clustering::{apply_merges, duplication_candidates, merge_two_tasks, Htstc, HtstcOrdering};
pub use heft::{rank_ordering, Heft};
pub use qlearning::{QLearningScheduler, QlHeft};

use crate::error::Result;
use crate::models::{TaskGraph, TaskId};

/// A strategy that orders the tasks of a graph for list scheduling.
pub trait OrderingStrategy {
    /// Strategy name (e.g., "HEFT").
    fn name(&self) -> &'static str;

    /// Builds the scheduling list for `graph`.
    fn sched_list(&mut self, graph: &TaskGraph) -> Result<Vec<TaskId>>;
}

/// Orders live tasks by descending `scores[id]`, ties by ascending id.
///
/// A predecessor never scores below its successor, so the only precedence
/// conflict left is a tie across a zero-cost edge with the successor on the
/// lower id. Such a successor is held back and released right after its
/// last predecessor; all other tasks keep their sorted position.
pub(crate) fn order_by_descending_score(graph: &TaskGraph, scores: &[u64]) -> Vec<TaskId> {
    let mut sorted: Vec<TaskId> = graph.task_ids().collect();
    // stable: equal scores keep id order
    sorted.sort_by(|a, b| scores[*b].cmp(&scores[*a]));

    let mut placed = vec![false; graph.slot_count()];
    let mut held: Vec<TaskId> = Vec::new();
    let mut order = Vec::with_capacity(sorted.len());
    for id in sorted {
        if !graph.predecessors(id).all(|p| placed[p]) {
            held.push(id);
            continue;
        }
        placed[id] = true;
        order.push(id);
        while let Some(pos) = held
            .iter()
            .position(|&h| graph.predecessors(h).all(|p| placed[p]))
        {
            let released = held.remove(pos);
            placed[released] = true;
            order.push(released);
        }
    }
    order
}
