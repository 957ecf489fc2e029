//! Task clustering (HTSTC).
//!
//! Chains of single-input, single-output tasks whose connecting edge costs
//! at least as much as the successor's execution are fused before ranking.
//! Tasks are then listed by descending `pre` score (the heaviest successor path
//! excluding the task itself).
//!
//! Merges are recorded as `(kept, absorbed)` pairs so they can be replayed
//! on the un-normalised input graph before scheduling.
//!
//! # Reference
//! Kwok & Ahmad (1999), "Static scheduling algorithms for allocating directed
//! task graphs to multiprocessors", Sec. 5 (clustering)

use super::{order_by_descending_score, OrderingStrategy};
use crate::error::{Error, Result};
use crate::models::{Dependency, ScheduleLog, TaskGraph, TaskId};
use crate::rank::{normalize_comm_for_ranking, pre_scores};

/// Clustering scheduler bound to one graph.
#[derive(Debug, Clone)]
pub struct Htstc {
    graph: TaskGraph,
    merges: Vec<(TaskId, TaskId)>,
    clustered: bool,
}

impl Htstc {
    /// Clones `graph` and normalises its communication for `inout_ratio`.
    pub fn new(graph: &TaskGraph, inout_ratio: f64) -> Self {
        let mut graph = graph.clone();
        normalize_comm_for_ranking(&mut graph, inout_ratio);
        Self {
            graph,
            merges: Vec::new(),
            clustered: false,
        }
    }

    /// Merges task chains until a full scan finds nothing to merge.
    ///
    /// Returns the merge list, in merge order.
    pub fn cluster_tasks(&mut self) -> Result<&[(TaskId, TaskId)]> {
        while let Some((task, succ)) = self.find_mergeable() {
            merge_two_tasks(&mut self.graph, task, succ)?;
            log::debug!("htstc: merged task {succ} into {task}");
            self.merges.push((task, succ));
        }
        self.clustered = true;
        Ok(&self.merges)
    }

    fn find_mergeable(&self) -> Option<(TaskId, TaskId)> {
        let g = &self.graph;
        g.task_ids().find_map(|task| {
            if g.in_degree(task) != 1 || g.out_degree(task) != 1 {
                return None;
            }
            let (succ, comm) = g.successors(task).next()?;
            let chain = g.in_degree(succ) == 1 && g.out_degree(succ) == 1;
            let exec = g.task(succ)?.exec;
            (chain && comm >= exec).then_some((task, succ))
        })
    }

    /// Clusters (once), ranks and orders tasks by descending `pre` score.
    pub fn sched_list(&mut self) -> Result<Vec<TaskId>> {
        if !self.clustered {
            self.cluster_tasks()?;
        }
        let pre = pre_scores(&mut self.graph);
        Ok(order_by_descending_score(&self.graph, &pre))
    }

    /// Recorded `(kept, absorbed)` merges.
    pub fn merge_list(&self) -> &[(TaskId, TaskId)] {
        &self.merges
    }

    /// The normalised, clustered graph.
    pub fn graph(&self) -> &TaskGraph {
        &self.graph
    }
}

/// Fuses `succ` into `task`.
///
/// `exec(task) += exec(succ) + comm(task, succ)`; every outgoing edge of
/// `succ` is re-attached to `task` with its cost, and `succ` is removed.
///
/// # Errors
/// - `UnknownTask` if either task is missing.
/// - `DegenerateGraph` if `succ` is not a successor of `task` or has other
///   predecessors.
pub fn merge_two_tasks(graph: &mut TaskGraph, task: TaskId, succ: TaskId) -> Result<()> {
    let comm = graph.comm(task, succ).ok_or_else(|| {
        Error::degenerate(format!("task {succ} is not a successor of task {task}"))
    })?;
    if graph.in_degree(succ) != 1 {
        return Err(Error::degenerate(format!(
            "task {succ} has {} predecessors and cannot be merged",
            graph.in_degree(succ)
        )));
    }
    let absorbed = graph.exec(succ)?;
    let outgoing: Vec<(TaskId, u64)> = graph.successors(succ).collect();
    for (next, c) in outgoing {
        graph.add_dependency(task, next, c)?;
    }
    graph.remove_task(succ)?;
    let kept = graph.task_mut(task).ok_or(Error::UnknownTask(task))?;
    kept.exec += absorbed + comm;
    Ok(())
}

/// Replays recorded merges on another copy of a graph.
pub fn apply_merges(graph: &mut TaskGraph, merges: &[(TaskId, TaskId)]) -> Result<()> {
    for &(task, succ) in merges {
        merge_two_tasks(graph, task, succ)?;
    }
    Ok(())
}

/// Cross-cluster dependencies whose slack `start(target) - finish(source)`
/// is below the edge's communication cost.
///
/// These are the edges task duplication would target. Diagnostic only:
/// scheduling never acts on them.
pub fn duplication_candidates(graph: &TaskGraph, log: &ScheduleLog) -> Vec<Dependency> {
    graph
        .dependencies()
        .filter(|d| match (log.get(d.source), log.get(d.target)) {
            (Some(src), Some(dst)) if src.cluster_id != dst.cluster_id => {
                dst.start.saturating_sub(src.finish) < d.comm
            }
            _ => false,
        })
        .collect()
}

/// HTSTC as an [`OrderingStrategy`]. The merges of the last ordering must be
/// applied to the graph before it is scheduled.
#[derive(Debug, Clone, Default)]
pub struct HtstcOrdering {
    inout_ratio: f64,
    merges: Vec<(TaskId, TaskId)>,
}

impl HtstcOrdering {
    /// Creates the strategy for a processor with the given `inout_ratio`.
    pub fn new(inout_ratio: f64) -> Self {
        Self {
            inout_ratio,
            merges: Vec::new(),
        }
    }

    /// Merges recorded by the last ordering.
    pub fn merges(&self) -> &[(TaskId, TaskId)] {
        &self.merges
    }

    /// Returns a copy of `graph` with the last ordering's merges applied.
    pub fn clustered(&self, graph: &TaskGraph) -> Result<TaskGraph> {
        let mut g = graph.clone();
        apply_merges(&mut g, &self.merges)?;
        Ok(g)
    }
}

impl OrderingStrategy for HtstcOrdering {
    fn name(&self) -> &'static str {
        "HTSTC"
    }

    fn sched_list(&mut self, graph: &TaskGraph) -> Result<Vec<TaskId>> {
        let mut htstc = Htstc::new(graph, self.inout_ratio);
        let list = htstc.sched_list()?;
        self.merges = htstc.merge_list().to_vec();
        Ok(list)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ClusteredProcessor, LogEntry};
    use crate::scheduler::ListScheduler;
    use crate::validation::validate_sched_list;

    fn chain() -> TaskGraph {
        // P -> A -> B -> C
        TaskGraph::from_costs(&[1, 2, 3, 4], &[(0, 1, 1), (1, 2, 5), (2, 3, 2)]).unwrap()
    }

    #[test]
    fn test_merge_in_chain() {
        let mut htstc = Htstc::new(&chain(), 1.0);
        assert_eq!(htstc.cluster_tasks().unwrap(), &[(1, 2)]);
        let g = htstc.graph();
        assert!(!g.contains(2));
        assert_eq!(g.exec(1).unwrap(), 2 + 3 + 5);
        assert_eq!(g.comm(1, 3), Some(2));
        assert_eq!(g.task_count(), 3);
    }

    #[test]
    fn test_no_merge_when_edge_cheaper_than_exec() {
        let g = TaskGraph::from_costs(&[1, 2, 6, 4], &[(0, 1, 1), (1, 2, 5), (2, 3, 2)]).unwrap();
        let mut htstc = Htstc::new(&g, 1.0);
        assert!(htstc.cluster_tasks().unwrap().is_empty());
        assert_eq!(htstc.graph(), &g);
    }

    #[test]
    fn test_three_chain_has_no_mergeable_head() {
        // A has no predecessor, so the pattern never matches
        let g = TaskGraph::from_costs(&[1, 1, 1], &[(0, 1, 9), (1, 2, 9)]).unwrap();
        let mut htstc = Htstc::new(&g, 1.0);
        assert!(htstc.cluster_tasks().unwrap().is_empty());
    }

    #[test]
    fn test_repeated_merges() {
        // P -> A -> B -> C -> D, expensive edges
        let g = TaskGraph::from_costs(
            &[1, 1, 1, 1, 1],
            &[(0, 1, 4), (1, 2, 4), (2, 3, 4), (3, 4, 4)],
        )
        .unwrap();
        let mut htstc = Htstc::new(&g, 1.0);
        assert_eq!(htstc.cluster_tasks().unwrap(), &[(1, 2), (1, 3)]);
        assert_eq!(htstc.graph().exec(1).unwrap(), 1 + (1 + 4) + (1 + 4));
        assert_eq!(htstc.graph().comm(1, 4), Some(4));
    }

    #[test]
    fn test_merge_uses_normalised_comm() {
        // ratio 0 halves comm: 5 -> 2 < exec(B) = 3
        let mut htstc = Htstc::new(&chain(), 0.0);
        assert!(htstc.cluster_tasks().unwrap().is_empty());
    }

    #[test]
    fn test_sched_list_by_pre_score() {
        let mut htstc = Htstc::new(&chain(), 1.0);
        let list = htstc.sched_list().unwrap();
        assert_eq!(list, vec![0, 1, 3]);
        let g = htstc.graph();
        // pre(1) = comm(1, 3) + rank(3) = 2 + 4
        assert_eq!(g.task(1).unwrap().pre, Some(6));
        assert_eq!(g.task(3).unwrap().pre, Some(0));
    }

    #[test]
    fn test_apply_merges_on_raw_graph() {
        let raw = TaskGraph::from_costs(&[1, 2, 3, 4], &[(0, 1, 1), (1, 2, 6), (2, 3, 2)]).unwrap();
        let mut strategy = HtstcOrdering::new(0.0);
        // normalised comm(1, 2) = 3 >= exec(2)
        let list = strategy.sched_list(&raw).unwrap();
        assert_eq!(strategy.merges(), &[(1, 2)]);

        let clustered = strategy.clustered(&raw).unwrap();
        // raw comm is charged, not the normalised one
        assert_eq!(clustered.exec(1).unwrap(), 2 + 3 + 6);
        assert!(validate_sched_list(&clustered, &list).is_ok());

        let p = ClusteredProcessor::new(1, 1, 0.0).unwrap();
        let mut s = ListScheduler::new(clustered, p, list);
        s.schedule_using_task_duplication().unwrap();
        // 0:[0,1) 1:[2,13) 3:[15,19)
        assert_eq!(s.makespan().unwrap(), 19);
        assert_eq!(strategy.name(), "HTSTC");
    }

    #[test]
    fn test_merge_two_tasks_errors() {
        let mut g = chain();
        assert!(matches!(
            merge_two_tasks(&mut g, 0, 2),
            Err(Error::DegenerateGraph(_))
        ));
        let mut join = TaskGraph::from_costs(&[1, 1, 1], &[(0, 2, 1), (1, 2, 1)]).unwrap();
        assert!(matches!(
            merge_two_tasks(&mut join, 0, 2),
            Err(Error::DegenerateGraph(_))
        ));
    }

    #[test]
    fn test_duplication_candidates() {
        let g = TaskGraph::from_costs(&[1, 1, 1], &[(0, 1, 3), (0, 2, 3)]).unwrap();
        let mut log = ScheduleLog::new();
        let at = |task, cluster_id, start| LogEntry {
            task,
            cluster_id,
            core_id: 1,
            start,
            finish: start + 1,
        };
        log.record(at(0, 1, 0)).unwrap();
        log.record(at(1, 2, 2)).unwrap();
        log.record(at(2, 1, 1)).unwrap();
        let found = duplication_candidates(&g, &log);
        assert_eq!(found, vec![Dependency::new(0, 1, 3)]);
    }
}
