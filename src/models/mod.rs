//! Scheduling domain models.
//!
//! Provides the data types shared by every algorithm: the task graph, the
//! clustered processor and the schedule log.
//!
//! | Type | Role |
//! |------|------|
//! | `Task`, `Dependency` | DAG nodes and weighted edges |
//! | `TaskGraph` | Acyclic graph with O(1) neighbour lookup |
//! | `ClusteredProcessor` | Clusters of identical cores with tick clocks |
//! | `ScheduleLog` | Task → (cluster, core, start, finish) |

mod graph;
mod processor;
mod schedule;
mod task;

pub use graph::TaskGraph;
pub use processor::{Cluster, ClusteredProcessor, Core};
pub use schedule::{LogEntry, ScheduleExport, ScheduleLog, TaskRecord};
pub use task::{Dependency, Task, TaskId};
