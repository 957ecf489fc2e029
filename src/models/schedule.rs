//! Schedule log and its exported form.
//!
//! A schedule log records where and when each task ran. It is append-only
//! during a scheduling run and keeps allocation order.
//!
//! The exported form is the JSON document consumed by external tooling:
//!
//! ```json
//! {"coreNum": 4, "makespan": 10,
//!  "taskSet": [{"coreID": 1, "taskName": "task_0", "startTime": 0, "executionTime": 3}]}
//! ```

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::{ClusteredProcessor, TaskId};
use crate::error::{Error, Result};

/// Placement and timing of one task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    /// Scheduled task.
    pub task: TaskId,
    /// Cluster id (1-based).
    pub cluster_id: usize,
    /// Core id within the cluster (1-based).
    pub core_id: usize,
    /// Start time (ticks).
    pub start: u64,
    /// Finish time (ticks).
    pub finish: u64,
}

/// Append-only record of a scheduling run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScheduleLog {
    entries: Vec<LogEntry>,
    index: HashMap<TaskId, usize>,
}

/// Exported schedule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleExport {
    /// Total number of cores.
    pub core_num: usize,
    /// Latest finish time.
    pub makespan: u64,
    /// One record per task, in allocation order.
    pub task_set: Vec<TaskRecord>,
}

/// One task of an exported schedule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskRecord {
    /// Global 1-based core index (cluster-major).
    #[serde(rename = "coreID")]
    pub core_id: usize,
    /// `task_<id>`.
    pub task_name: String,
    /// Start time (ticks).
    pub start_time: u64,
    /// Execution time (ticks).
    pub execution_time: u64,
}

impl LogEntry {
    /// Execution time of the entry.
    #[inline]
    pub fn duration(&self) -> u64 {
        self.finish - self.start
    }

    /// Whether two entries occupy the same core at some instant.
    pub fn overlaps(&self, other: &LogEntry) -> bool {
        self.cluster_id == other.cluster_id
            && self.core_id == other.core_id
            && self.start < other.finish
            && other.start < self.finish
    }
}

impl ScheduleLog {
    /// Creates an empty log.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records an entry.
    ///
    /// # Errors
    /// `InvalidOrdering` if the task already has an entry.
    pub fn record(&mut self, entry: LogEntry) -> Result<()> {
        if self.index.contains_key(&entry.task) {
            return Err(Error::InvalidOrdering(format!(
                "task {} is scheduled twice",
                entry.task
            )));
        }
        self.index.insert(entry.task, self.entries.len());
        self.entries.push(entry);
        Ok(())
    }

    /// Entry for a task.
    pub fn get(&self, task: TaskId) -> Option<&LogEntry> {
        self.index.get(&task).map(|&i| &self.entries[i])
    }

    /// Entry for a task, or `UnscheduledTask`.
    pub fn entry(&self, task: TaskId) -> Result<&LogEntry> {
        self.get(task).ok_or(Error::UnscheduledTask(task))
    }

    /// Finish time of a task.
    pub fn finish_time(&self, task: TaskId) -> Result<u64> {
        self.entry(task).map(|e| e.finish)
    }

    /// Cluster a task was allocated to.
    pub fn allocated_cluster(&self, task: TaskId) -> Result<usize> {
        self.entry(task).map(|e| e.cluster_id)
    }

    /// Whether the task has been scheduled.
    pub fn contains(&self, task: TaskId) -> bool {
        self.index.contains_key(&task)
    }

    /// Entries in allocation order.
    pub fn entries(&self) -> &[LogEntry] {
        &self.entries
    }

    /// Number of scheduled tasks.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing has been scheduled.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Latest finish time.
    ///
    /// # Errors
    /// `EmptySchedule` if no task was scheduled.
    pub fn makespan(&self) -> Result<u64> {
        self.entries
            .iter()
            .map(|e| e.finish)
            .max()
            .ok_or(Error::EmptySchedule)
    }

    /// Entries placed on one core, in allocation order.
    pub fn entries_on_core(&self, cluster_id: usize, core_id: usize) -> Vec<&LogEntry> {
        self.entries
            .iter()
            .filter(|e| e.cluster_id == cluster_id && e.core_id == core_id)
            .collect()
    }

    /// Builds the exported form.
    pub fn export(&self, processor: &ClusteredProcessor) -> Result<ScheduleExport> {
        let makespan = self.makespan()?;
        let task_set = self
            .entries
            .iter()
            .map(|e| {
                Ok(TaskRecord {
                    core_id: processor.global_core_id(e.cluster_id, e.core_id)?,
                    task_name: format!("task_{}", e.task),
                    start_time: e.start,
                    execution_time: e.duration(),
                })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(ScheduleExport {
            core_num: processor.total_cores(),
            makespan,
            task_set,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(task: TaskId, cluster_id: usize, core_id: usize, start: u64, finish: u64) -> LogEntry {
        LogEntry {
            task,
            cluster_id,
            core_id,
            start,
            finish,
        }
    }

    fn sample_log() -> ScheduleLog {
        let mut log = ScheduleLog::new();
        log.record(entry(0, 1, 1, 0, 3)).unwrap();
        log.record(entry(2, 2, 2, 4, 9)).unwrap();
        log.record(entry(1, 1, 2, 3, 5)).unwrap();
        log
    }

    #[test]
    fn test_queries() {
        let log = sample_log();
        assert_eq!(log.len(), 3);
        assert_eq!(log.finish_time(2).unwrap(), 9);
        assert_eq!(log.allocated_cluster(1).unwrap(), 1);
        assert!(matches!(log.finish_time(5), Err(Error::UnscheduledTask(5))));
        assert!(matches!(
            log.allocated_cluster(5),
            Err(Error::UnscheduledTask(5))
        ));
        assert_eq!(log.makespan().unwrap(), 9);
    }

    #[test]
    fn test_record_rejects_second_entry_for_task() {
        let mut log = sample_log();
        assert!(matches!(
            log.record(entry(2, 1, 1, 9, 14)),
            Err(Error::InvalidOrdering(_))
        ));
        assert_eq!(log.len(), 3);
        assert_eq!(log.finish_time(2).unwrap(), 9);
    }

    #[test]
    fn test_export_unknown_core_fails() {
        let mut log = ScheduleLog::new();
        log.record(entry(0, 0, 1, 0, 3)).unwrap();
        let p = ClusteredProcessor::new(2, 2, 1.0).unwrap();
        assert!(matches!(log.export(&p), Err(Error::UnknownCluster(0))));
    }

    #[test]
    fn test_empty_makespan_fails() {
        assert!(matches!(
            ScheduleLog::new().makespan(),
            Err(Error::EmptySchedule)
        ));
    }

    #[test]
    fn test_overlaps() {
        let a = entry(0, 1, 1, 0, 3);
        assert!(a.overlaps(&entry(1, 1, 1, 2, 4)));
        assert!(!a.overlaps(&entry(1, 1, 1, 3, 4)));
        assert!(!a.overlaps(&entry(1, 1, 2, 0, 3)));
    }

    #[test]
    fn test_export_format() {
        let log = sample_log();
        let p = ClusteredProcessor::new(2, 2, 1.0).unwrap();
        let export = log.export(&p).unwrap();
        assert_eq!(export.core_num, 4);
        assert_eq!(export.makespan, 9);
        assert_eq!(export.task_set[1].core_id, 4);
        assert_eq!(export.task_set[1].task_name, "task_2");
        assert_eq!(export.task_set[1].execution_time, 5);

        let json = serde_json::to_value(&export).unwrap();
        assert_eq!(json["coreNum"], 4);
        assert_eq!(json["taskSet"][0]["coreID"], 1);
        assert_eq!(json["taskSet"][2]["coreID"], 2);
        assert_eq!(json["taskSet"][2]["startTime"], 3);
        assert_eq!(json["taskSet"][2]["executionTime"], 2);
    }
}
