//! Task and dependency model.
//!
//! A task is a unit of computation with a fixed execution cost in ticks.
//! A dependency carries the data-transfer cost between two tasks.
//!
//! # Reference
//! Kwok & Ahmad (1999), "Static scheduling algorithms for allocating directed
//! task graphs to multiprocessors", Sec. 2

use serde::{Deserialize, Serialize};

/// Dense task identifier (index into the owning graph).
pub type TaskId = usize;

/// A task (DAG node).
///
/// Derived fields (`rank`, `pre`) are filled in by the rank utilities and
/// are `None` until computed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    /// Task identifier.
    pub id: TaskId,
    /// Execution cost (ticks).
    pub exec: u64,
    /// Upward rank.
    pub rank: Option<u64>,
    /// Maximum `comm + rank(succ)` over successors.
    pub pre: Option<u64>,
    /// Synthetic zero-cost entry/exit task.
    pub is_virtual: bool,
}

/// A precedence edge with its communication cost.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dependency {
    /// Producing task.
    pub source: TaskId,
    /// Consuming task.
    pub target: TaskId,
    /// Communication cost (ticks) when both ends share a cluster.
    pub comm: u64,
}

impl Task {
    /// Creates a real task.
    pub fn new(id: TaskId, exec: u64) -> Self {
        Self {
            id,
            exec,
            rank: None,
            pre: None,
            is_virtual: false,
        }
    }

    /// Creates a zero-cost virtual task.
    pub fn virtual_task(id: TaskId) -> Self {
        Self {
            is_virtual: true,
            ..Self::new(id, 0)
        }
    }

    /// Sets the upward rank.
    pub fn with_rank(mut self, rank: u64) -> Self {
        self.rank = Some(rank);
        self
    }

    /// Task name used in exported schedules.
    pub fn name(&self) -> String {
        format!("task_{}", self.id)
    }
}

impl Dependency {
    /// Creates a dependency.
    pub fn new(source: TaskId, target: TaskId, comm: u64) -> Self {
        Self {
            source,
            target,
            comm,
        }
    }
}
