//! List-scheduling engine for clustered processors.
//!
//! # Algorithm
//!
//! Tasks are taken from the scheduling list one at a time. For each cluster
//! the engine computes
//!
//! - the data-ready time: the latest predecessor finish plus its
//!   communication cost (scaled by `inout_ratio` when the predecessor ran in
//!   another cluster), never earlier than the current time;
//! - the core-ready time: current time plus the cluster's shortest remaining
//!   busy period.
//!
//! The task goes to the cluster whose `max(data_ready, core_ready)` is
//! smallest (lowest cluster id on ties), on the core with the shortest
//! remaining time. The processor clock is advanced to that instant and the
//! allocation is logged.
//!
//! # Complexity
//! O(n * (c * (p + k))) where n=tasks, c=clusters, p=predecessors, k=cores.
//!
//! # Reference
//! Kwok & Ahmad (1999), "Static scheduling algorithms for allocating directed
//! task graphs to multiprocessors", Sec. 4 (list scheduling)

use std::collections::VecDeque;

use crate::error::{Error, Result};
use crate::models::{ClusteredProcessor, LogEntry, ScheduleExport, ScheduleLog, TaskGraph, TaskId};

/// Discrete-time list scheduler.
///
/// Owns its graph, processor and list: every run works on independent
/// copies.
///
/// # Example
///
/// ```
/// use cluster_sched::models::{ClusteredProcessor, TaskGraph};
/// use cluster_sched::scheduler::ListScheduler;
///
/// let graph = TaskGraph::from_costs(&[2, 3], &[(0, 1, 1)]).unwrap();
/// let processor = ClusteredProcessor::new(1, 1, 1.0).unwrap();
/// let mut scheduler = ListScheduler::new(graph, processor, vec![0, 1]);
/// scheduler.schedule().unwrap();
/// assert_eq!(scheduler.makespan().unwrap(), 6);
/// ```
#[derive(Debug, Clone)]
pub struct ListScheduler {
    graph: TaskGraph,
    processor: ClusteredProcessor,
    sched_list: VecDeque<TaskId>,
    log: ScheduleLog,
    current_time: u64,
}

impl ListScheduler {
    /// Creates a scheduler over owned copies of its inputs.
    pub fn new(graph: TaskGraph, processor: ClusteredProcessor, sched_list: Vec<TaskId>) -> Self {
        Self {
            graph,
            processor,
            sched_list: sched_list.into(),
            log: ScheduleLog::new(),
            current_time: 0,
        }
    }

    /// Schedules every task of the list.
    ///
    /// # Errors
    /// - `UnknownTask` if the list names a task missing from the graph.
    /// - `UnscheduledTask` if a task comes before one of its predecessors.
    /// - `InvalidOrdering` if the list names a task twice.
    pub fn schedule(&mut self) -> Result<()> {
        while let Some(head) = self.sched_list.pop_front() {
            let (cluster_id, core_id, start) = self.earliest_slot(head)?;
            self.wait_until(start);
            self.allocate(head, cluster_id, core_id)?;
        }
        log::debug!(
            "scheduled {} tasks, makespan {:?}",
            self.log.len(),
            self.log.makespan().ok()
        );
        Ok(())
    }

    /// Duplication-aware entry point.
    ///
    /// Task duplication is not implemented: this schedules exactly like
    /// [`schedule`](Self::schedule).
    pub fn schedule_using_task_duplication(&mut self) -> Result<()> {
        self.schedule()
    }

    /// Finds the (cluster, core, start time) at which `task` can start earliest.
    fn earliest_slot(&self, task: TaskId) -> Result<(usize, usize, u64)> {
        if !self.graph.contains(task) {
            return Err(Error::UnknownTask(task));
        }
        if self.log.contains(task) {
            return Err(Error::InvalidOrdering(format!(
                "task {task} appears more than once in the list"
            )));
        }
        let mut best: Option<(usize, usize, u64)> = None;
        for cluster in self.processor.clusters() {
            let data_ready = self.data_ready_time(cluster.cluster_id, task)?;
            let (shortest, core_id) = cluster.shortest_remaining();
            let allocatable = data_ready.max(self.current_time + shortest);
            if best.map_or(true, |(_, _, t)| allocatable < t) {
                best = Some((cluster.cluster_id, core_id, allocatable));
            }
        }
        // the processor has at least one cluster
        best.ok_or(Error::UnknownTask(task))
    }

    /// Latest data arrival time of `task` if placed on `cluster_id`.
    fn data_ready_time(&self, cluster_id: usize, task: TaskId) -> Result<u64> {
        let mut ready = self.current_time;
        for pred in self.graph.predecessors(task) {
            let entry = self.log.entry(pred)?;
            let comm = self.graph.comm(pred, task).unwrap_or(0);
            let arrival = entry.finish
                + self
                    .processor
                    .comm_cost(comm, entry.cluster_id == cluster_id);
            ready = ready.max(arrival);
        }
        Ok(ready)
    }

    fn wait_until(&mut self, time: u64) {
        debug_assert!(time >= self.current_time);
        self.processor.advance(time - self.current_time);
        self.current_time = time;
    }

    fn allocate(&mut self, task: TaskId, cluster_id: usize, core_id: usize) -> Result<()> {
        let exec = self.graph.exec(task)?;
        self.processor.allocate(cluster_id, core_id, task, exec)?;
        log::trace!(
            "task {task} -> cluster {cluster_id} core {core_id} at {}",
            self.current_time
        );
        self.log.record(LogEntry {
            task,
            cluster_id,
            core_id,
            start: self.current_time,
            finish: self.current_time + exec,
        })
    }

    /// Finish time of a scheduled task.
    pub fn finish_time(&self, task: TaskId) -> Result<u64> {
        self.log.finish_time(task)
    }

    /// Cluster a scheduled task was placed on.
    pub fn allocated_cluster(&self, task: TaskId) -> Result<usize> {
        self.log.allocated_cluster(task)
    }

    /// Latest finish time.
    pub fn makespan(&self) -> Result<u64> {
        self.log.makespan()
    }

    /// The schedule log.
    pub fn log(&self) -> &ScheduleLog {
        &self.log
    }

    /// The scheduled graph.
    pub fn graph(&self) -> &TaskGraph {
        &self.graph
    }

    /// The processor in its final state.
    pub fn processor(&self) -> &ClusteredProcessor {
        &self.processor
    }

    /// Current simulated time.
    pub fn current_time(&self) -> u64 {
        self.current_time
    }

    /// Builds the exported schedule.
    pub fn export(&self) -> Result<ScheduleExport> {
        self.log.export(&self.processor)
    }

    /// Writes the exported schedule as pretty-printed JSON.
    pub fn write_json<P: AsRef<std::path::Path>>(&self, path: P) -> Result<()> {
        let export = self.export()?;
        let file = std::fs::File::create(path)?;
        serde_json::to_writer_pretty(std::io::BufWriter::new(file), &export)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validation::check_schedule;
    use proptest::prelude::*;

    fn diamond(comm: u64) -> TaskGraph {
        TaskGraph::from_costs(
            &[1, 1, 1, 1],
            &[(0, 1, comm), (0, 2, comm), (1, 3, comm), (2, 3, comm)],
        )
        .unwrap()
    }

    fn run(graph: &TaskGraph, processor: &ClusteredProcessor, list: &[TaskId]) -> ListScheduler {
        let mut s = ListScheduler::new(graph.clone(), processor.clone(), list.to_vec());
        s.schedule().unwrap();
        s
    }

    #[test]
    fn test_diamond_without_comm() {
        let g = diamond(0);
        let serial = ClusteredProcessor::new(1, 1, 1.0).unwrap();
        assert_eq!(run(&g, &serial, &[0, 1, 2, 3]).makespan().unwrap(), 4);
        assert_eq!(run(&g, &serial, &[0, 2, 1, 3]).makespan().unwrap(), 4);

        let dual = ClusteredProcessor::new(1, 2, 1.0).unwrap();
        let s = run(&g, &dual, &[0, 1, 2, 3]);
        assert_eq!(s.makespan().unwrap(), 3);
        assert_eq!(s.log().entry(1).unwrap().start, 1);
        assert_eq!(s.log().entry(2).unwrap().start, 1);
    }

    #[test]
    fn test_diamond_with_intra_cluster_comm() {
        let g = diamond(1);
        let serial = ClusteredProcessor::new(1, 1, 1.0).unwrap();
        // 0:[0,1) 1:[2,3) 2:[3,4) 3:[5,6)
        let s = run(&g, &serial, &[0, 1, 2, 3]);
        assert_eq!(s.makespan().unwrap(), 6);
        assert_eq!(s.log().entry(2).unwrap().start, 3);

        let dual = ClusteredProcessor::new(1, 2, 1.0).unwrap();
        // 0:[0,1) 1,2:[2,3) 3:[4,5)
        assert_eq!(run(&g, &dual, &[0, 1, 2, 3]).makespan().unwrap(), 5);
    }

    #[test]
    fn test_cross_cluster_penalty() {
        // 0 and 1 both feed 2; two single-core clusters
        let g = TaskGraph::from_costs(&[4, 4, 1], &[(0, 2, 2), (1, 2, 2)]).unwrap();
        let p = ClusteredProcessor::new(2, 1, 3.0).unwrap();
        let s = run(&g, &p, &[0, 1, 2]);
        assert_eq!(s.allocated_cluster(0).unwrap(), 1);
        assert_eq!(s.allocated_cluster(1).unwrap(), 2);
        // cluster 1: max(4 + 2, 4 + 6) = 10; cluster 2: max(4 + 6, 4 + 2) = 10 → cluster 1
        let e = s.log().entry(2).unwrap();
        assert_eq!((e.cluster_id, e.start, e.finish), (1, 10, 11));
    }

    #[test]
    fn test_cluster_tie_goes_to_lowest_id() {
        let g = TaskGraph::from_costs(&[3, 3], &[]).unwrap();
        let p = ClusteredProcessor::new(3, 1, 2.0).unwrap();
        let s = run(&g, &p, &[0, 1]);
        assert_eq!(s.allocated_cluster(0).unwrap(), 1);
        assert_eq!(s.allocated_cluster(1).unwrap(), 2);
    }

    #[test]
    fn test_waits_for_busy_core() {
        let g = TaskGraph::from_costs(&[5, 2], &[]).unwrap();
        let p = ClusteredProcessor::new(1, 1, 1.0).unwrap();
        let s = run(&g, &p, &[0, 1]);
        let e = s.log().entry(1).unwrap();
        assert_eq!((e.start, e.finish), (5, 7));
        assert_eq!(s.current_time(), 5);
    }

    #[test]
    fn test_predecessor_not_scheduled() {
        let g = diamond(1);
        let p = ClusteredProcessor::new(1, 1, 1.0).unwrap();
        let mut s = ListScheduler::new(g, p, vec![1, 0, 2, 3]);
        assert!(matches!(s.schedule(), Err(Error::UnscheduledTask(0))));
    }

    #[test]
    fn test_repeated_task_in_list() {
        let g = TaskGraph::from_costs(&[3, 2], &[(0, 1, 1)]).unwrap();
        let p = ClusteredProcessor::new(1, 1, 1.0).unwrap();
        let mut s = ListScheduler::new(g, p, vec![0, 0, 1]);
        assert!(matches!(s.schedule(), Err(Error::InvalidOrdering(_))));
        assert_eq!(s.log().len(), 1);
    }

    #[test]
    fn test_unknown_task_in_list() {
        let g = diamond(1);
        let p = ClusteredProcessor::new(1, 1, 1.0).unwrap();
        let mut s = ListScheduler::new(g, p, vec![0, 9]);
        assert!(matches!(s.schedule(), Err(Error::UnknownTask(9))));
    }

    #[test]
    fn test_duplication_entry_point_matches_plain_schedule() {
        let g = diamond(2);
        let p = ClusteredProcessor::new(2, 2, 2.0).unwrap();
        let plain = run(&g, &p, &[0, 2, 1, 3]);
        let mut dup = ListScheduler::new(g, p, vec![0, 2, 1, 3]);
        dup.schedule_using_task_duplication().unwrap();
        assert_eq!(plain.log(), dup.log());
    }

    #[test]
    fn test_export_and_write_json() {
        let g = diamond(0);
        let p = ClusteredProcessor::new(2, 2, 1.0).unwrap();
        let s = run(&g, &p, &[0, 1, 2, 3]);
        let export = s.export().unwrap();
        assert_eq!(export.core_num, 4);
        assert_eq!(export.makespan, s.makespan().unwrap());
        assert_eq!(export.task_set.len(), 4);

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("schedule.json");
        s.write_json(&path).unwrap();
        let read: ScheduleExport =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(read, export);
    }

    #[test]
    fn test_empty_list() {
        let g = diamond(0);
        let p = ClusteredProcessor::new(1, 1, 1.0).unwrap();
        let s = run(&g, &p, &[]);
        assert!(matches!(s.makespan(), Err(Error::EmptySchedule)));
    }

    fn arb_case() -> impl Strategy<Value = (TaskGraph, ClusteredProcessor)> {
        (
            2usize..14,
            1usize..4,
            1usize..4,
            prop_oneof![Just(0.0), Just(1.0), Just(1.5), Just(3.0)],
        )
            .prop_flat_map(|(n, clusters, cores, ratio)| {
                (
                    proptest::collection::vec(1u64..10, n),
                    proptest::collection::vec((0..n, 0..n, 0u64..8), 0..(n * 2)),
                    Just(ClusteredProcessor::new(clusters, cores, ratio).unwrap()),
                )
            })
            .prop_map(|(execs, raw, p)| {
                let mut g = TaskGraph::new();
                for e in execs {
                    g.add_task(e);
                }
                for (a, b, c) in raw {
                    if a < b {
                        g.add_dependency(a, b, c).unwrap();
                    }
                }
                (g, p)
            })
    }

    proptest! {
        #[test]
        fn schedule_respects_cores_and_communication((g, p) in arb_case()) {
            let list = g.topological_order();
            let s = run(&g, &p, &list);
            prop_assert!(check_schedule(&g, &p, s.log()).is_empty());
            let max_finish = s.log().entries().iter().map(|e| e.finish).max().unwrap();
            prop_assert_eq!(s.makespan().unwrap(), max_finish);
        }

        #[test]
        fn serial_makespan_without_comm_is_total_exec((g, p) in arb_case()) {
            let mut g = g;
            g.map_comms(|_| 0);
            let serial = ClusteredProcessor::new(1, 1, p.inout_ratio()).unwrap();
            let s = run(&g, &serial, &g.topological_order());
            prop_assert_eq!(s.makespan().unwrap(), g.total_exec());
        }
    }
}
