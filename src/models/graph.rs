//! Task graph (DAG) model.
//!
//! Tasks are stored in dense slots indexed by [`TaskId`]. Removing a task
//! (task clustering) empties its slot, so the ids of the remaining tasks
//! never change. Successors and predecessors are kept in ordered maps:
//! every traversal visits neighbours in ascending id order, which keeps all
//! algorithms built on top of the graph deterministic.
//!
//! The graph is acyclic at all times. [`TaskGraph::add_dependency`] rejects
//! an edge that would close a cycle.
//!
//! # Reference
//! Cormen et al. (2009), "Introduction to Algorithms", Ch. 22.4 (Topological Sort)

use std::cmp::Reverse;
use std::collections::{BTreeMap, BTreeSet, BinaryHeap};

use super::{Dependency, Task, TaskId};
use crate::error::{Error, Result};

/// Directed acyclic task graph.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TaskGraph {
    tasks: Vec<Option<Task>>,
    succs: Vec<BTreeMap<TaskId, u64>>,
    preds: Vec<BTreeSet<TaskId>>,
}

impl TaskGraph {
    /// Creates an empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a graph from execution costs and `(source, target, comm)` edges.
    pub fn from_costs(execs: &[u64], edges: &[(TaskId, TaskId, u64)]) -> Result<Self> {
        let mut graph = Self::new();
        for &exec in execs {
            graph.add_task(exec);
        }
        for &(source, target, comm) in edges {
            graph.add_dependency(source, target, comm)?;
        }
        Ok(graph)
    }

    /// Appends a real task and returns its id.
    pub fn add_task(&mut self, exec: u64) -> TaskId {
        let id = self.tasks.len();
        self.push_slot(Task::new(id, exec));
        id
    }

    /// Appends a zero-cost virtual task and returns its id.
    pub fn add_virtual_task(&mut self) -> TaskId {
        let id = self.tasks.len();
        self.push_slot(Task::virtual_task(id));
        id
    }

    fn push_slot(&mut self, task: Task) {
        self.tasks.push(Some(task));
        self.succs.push(BTreeMap::new());
        self.preds.push(BTreeSet::new());
    }

    /// Adds (or overwrites) the dependency `source -> target`.
    ///
    /// # Errors
    /// `UnknownTask` for a missing endpoint, `SelfLoop` for `source == target`,
    /// `CyclicDependency` if `source` is already reachable from `target`.
    pub fn add_dependency(&mut self, source: TaskId, target: TaskId, comm: u64) -> Result<()> {
        self.ensure_task(source)?;
        self.ensure_task(target)?;
        if source == target {
            return Err(Error::SelfLoop(source));
        }
        if !self.succs[source].contains_key(&target) && self.is_reachable(target, source) {
            return Err(Error::CyclicDependency {
                pred: source,
                succ: target,
            });
        }
        self.succs[source].insert(target, comm);
        self.preds[target].insert(source);
        Ok(())
    }

    /// Removes a task and every edge touching it.
    pub fn remove_task(&mut self, id: TaskId) -> Result<Task> {
        self.ensure_task(id)?;
        let succs = std::mem::take(&mut self.succs[id]);
        for succ in succs.keys() {
            self.preds[*succ].remove(&id);
        }
        let preds = std::mem::take(&mut self.preds[id]);
        for pred in &preds {
            self.succs[*pred].remove(&id);
        }
        self.tasks[id].take().ok_or(Error::UnknownTask(id))
    }

    fn ensure_task(&self, id: TaskId) -> Result<()> {
        if self.contains(id) {
            Ok(())
        } else {
            Err(Error::UnknownTask(id))
        }
    }

    /// Whether `id` is a live task.
    pub fn contains(&self, id: TaskId) -> bool {
        matches!(self.tasks.get(id), Some(Some(_)))
    }

    /// Returns the task with the given id.
    pub fn task(&self, id: TaskId) -> Option<&Task> {
        self.tasks.get(id).and_then(|t| t.as_ref())
    }

    /// Returns the task with the given id, mutably.
    pub fn task_mut(&mut self, id: TaskId) -> Option<&mut Task> {
        self.tasks.get_mut(id).and_then(|t| t.as_mut())
    }

    /// Execution cost of a task.
    pub fn exec(&self, id: TaskId) -> Result<u64> {
        self.task(id).map(|t| t.exec).ok_or(Error::UnknownTask(id))
    }

    /// Communication cost of `source -> target`, if the edge exists.
    pub fn comm(&self, source: TaskId, target: TaskId) -> Option<u64> {
        self.succs.get(source).and_then(|m| m.get(&target)).copied()
    }

    /// Overwrites the communication cost of an existing edge.
    pub fn set_comm(&mut self, source: TaskId, target: TaskId, comm: u64) -> Result<()> {
        match self.succs.get_mut(source).and_then(|m| m.get_mut(&target)) {
            Some(c) => {
                *c = comm;
                Ok(())
            }
            None => Err(Error::UnknownTask(target)),
        }
    }

    /// Successors of a task with edge costs, ascending by id.
    pub fn successors(&self, id: TaskId) -> impl Iterator<Item = (TaskId, u64)> + '_ {
        self.succs
            .get(id)
            .into_iter()
            .flat_map(|m| m.iter().map(|(&t, &c)| (t, c)))
    }

    /// Predecessors of a task, ascending by id.
    pub fn predecessors(&self, id: TaskId) -> impl Iterator<Item = TaskId> + '_ {
        self.preds.get(id).into_iter().flat_map(|s| s.iter().copied())
    }

    /// Number of incoming edges.
    pub fn in_degree(&self, id: TaskId) -> usize {
        self.preds.get(id).map_or(0, |s| s.len())
    }

    /// Number of outgoing edges.
    pub fn out_degree(&self, id: TaskId) -> usize {
        self.succs.get(id).map_or(0, |m| m.len())
    }

    /// Live task ids, ascending.
    pub fn task_ids(&self) -> impl Iterator<Item = TaskId> + '_ {
        self.tasks().map(|t| t.id)
    }

    /// Live tasks, ascending by id.
    pub fn tasks(&self) -> impl Iterator<Item = &Task> + '_ {
        self.tasks.iter().flatten()
    }

    /// Live tasks, mutably.
    pub fn tasks_mut(&mut self) -> impl Iterator<Item = &mut Task> + '_ {
        self.tasks.iter_mut().flatten()
    }

    /// Number of live tasks.
    pub fn task_count(&self) -> usize {
        self.tasks().count()
    }

    /// Number of id slots, including emptied ones.
    pub fn slot_count(&self) -> usize {
        self.tasks.len()
    }

    /// All dependencies, ordered by `(source, target)`.
    pub fn dependencies(&self) -> impl Iterator<Item = Dependency> + '_ {
        self.succs.iter().enumerate().flat_map(|(source, m)| {
            m.iter()
                .map(move |(&target, &comm)| Dependency::new(source, target, comm))
        })
    }

    /// Number of dependencies.
    pub fn dependency_count(&self) -> usize {
        self.succs.iter().map(|m| m.len()).sum()
    }

    /// Tasks without predecessors.
    pub fn entry_tasks(&self) -> Vec<TaskId> {
        self.task_ids().filter(|&id| self.in_degree(id) == 0).collect()
    }

    /// Tasks without successors.
    pub fn exit_tasks(&self) -> Vec<TaskId> {
        self.task_ids().filter(|&id| self.out_degree(id) == 0).collect()
    }

    /// Applies `f` to every communication cost.
    pub fn map_comms<F: FnMut(u64) -> u64>(&mut self, mut f: F) {
        for m in &mut self.succs {
            for c in m.values_mut() {
                *c = f(*c);
            }
        }
    }

    /// Applies `f` to every execution cost.
    pub fn map_execs<F: FnMut(u64) -> u64>(&mut self, mut f: F) {
        for task in self.tasks_mut() {
            task.exec = f(task.exec);
        }
    }

    /// Multiplies every execution and communication cost, truncating.
    pub fn scale_costs(&mut self, exec_factor: f64, comm_factor: f64) {
        self.map_execs(|e| (e as f64 * exec_factor) as u64);
        self.map_comms(|c| (c as f64 * comm_factor) as u64);
    }

    /// Sum of execution costs.
    pub fn total_exec(&self) -> u64 {
        self.tasks().map(|t| t.exec).sum()
    }

    /// Lexicographically smallest topological order (Kahn with a min-heap).
    ///
    /// When every dependency goes from a lower to a higher id this is the
    /// ascending id order.
    pub fn topological_order(&self) -> Vec<TaskId> {
        let mut remaining: Vec<usize> = (0..self.tasks.len()).map(|i| self.in_degree(i)).collect();
        let mut ready: BinaryHeap<Reverse<TaskId>> =
            self.entry_tasks().into_iter().map(Reverse).collect();
        let mut order = Vec::with_capacity(self.task_count());

        while let Some(Reverse(id)) = ready.pop() {
            order.push(id);
            for (succ, _) in self.successors(id) {
                remaining[succ] -= 1;
                if remaining[succ] == 0 {
                    ready.push(Reverse(succ));
                }
            }
        }
        order
    }

    /// Whether `to` can be reached from `from` along dependencies.
    pub fn is_reachable(&self, from: TaskId, to: TaskId) -> bool {
        let mut visited = vec![false; self.tasks.len()];
        let mut stack = vec![from];
        while let Some(id) = stack.pop() {
            if id == to {
                return true;
            }
            if std::mem::replace(&mut visited[id], true) {
                continue;
            }
            stack.extend(self.successors(id).map(|(s, _)| s));
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn diamond() -> TaskGraph {
        TaskGraph::from_costs(&[1, 2, 3, 4], &[(0, 1, 5), (0, 2, 6), (1, 3, 7), (2, 3, 8)]).unwrap()
    }

    #[test]
    fn test_build_graph() {
        let g = diamond();
        assert_eq!(g.task_count(), 4);
        assert_eq!(g.dependency_count(), 4);
        assert_eq!(g.exec(2).unwrap(), 3);
        assert_eq!(g.comm(1, 3), Some(7));
        assert_eq!(g.comm(3, 1), None);
        assert_eq!(g.entry_tasks(), vec![0]);
        assert_eq!(g.exit_tasks(), vec![3]);
    }

    #[test]
    fn test_neighbours_sorted() {
        let g = diamond();
        let succs: Vec<_> = g.successors(0).collect();
        assert_eq!(succs, vec![(1, 5), (2, 6)]);
        let preds: Vec<_> = g.predecessors(3).collect();
        assert_eq!(preds, vec![1, 2]);
    }

    #[test]
    fn test_reject_cycle() {
        let mut g = diamond();
        let err = g.add_dependency(3, 0, 1).unwrap_err();
        assert!(matches!(err, Error::CyclicDependency { pred: 3, succ: 0 }));
        assert!(matches!(g.add_dependency(2, 2, 1), Err(Error::SelfLoop(2))));
        assert!(matches!(g.add_dependency(0, 9, 1), Err(Error::UnknownTask(9))));
    }

    #[test]
    fn test_overwrite_existing_edge() {
        let mut g = diamond();
        g.add_dependency(0, 1, 11).unwrap();
        assert_eq!(g.comm(0, 1), Some(11));
        assert_eq!(g.dependency_count(), 4);
    }

    #[test]
    fn test_remove_task_keeps_ids() {
        let mut g = diamond();
        let removed = g.remove_task(1).unwrap();
        assert_eq!(removed.exec, 2);
        assert!(!g.contains(1));
        assert_eq!(g.task_count(), 3);
        assert_eq!(g.slot_count(), 4);
        assert_eq!(g.task_ids().collect::<Vec<_>>(), vec![0, 2, 3]);
        assert_eq!(g.predecessors(3).collect::<Vec<_>>(), vec![2]);
        assert_eq!(g.dependency_count(), 2);
    }

    #[test]
    fn test_topological_order() {
        let g = diamond();
        assert_eq!(g.topological_order(), vec![0, 1, 2, 3]);

        let reversed = TaskGraph::from_costs(&[1, 1, 1, 1], &[(3, 0, 0), (2, 1, 0)]).unwrap();
        assert_eq!(reversed.topological_order(), vec![2, 1, 3, 0]);
    }

    #[test]
    fn test_scale_costs_truncates() {
        let mut g = diamond();
        g.scale_costs(1.5, 0.5);
        assert_eq!(g.exec(1).unwrap(), 3);
        assert_eq!(g.exec(2).unwrap(), 4);
        assert_eq!(g.comm(0, 1), Some(2));
        assert_eq!(g.comm(2, 3), Some(4));
    }

    #[test]
    fn test_dependencies_enumeration_order() {
        let g = diamond();
        let deps: Vec<_> = g.dependencies().map(|d| (d.source, d.target)).collect();
        assert_eq!(deps, vec![(0, 1), (0, 2), (1, 3), (2, 3)]);
    }
}
