//! Static DAG scheduling on clustered many-core processors.
//!
//! Task graphs are ordered by one of four algorithms and placed by a
//! discrete-event list scheduler on a processor made of identical clusters,
//! where communication between clusters costs `inout_ratio` times the
//! intra-cluster cost.
//!
//! # Modules
//!
//! - **`models`**: Domain types: `Task`, `Dependency`, `TaskGraph`,
//!   `ClusteredProcessor`, `ScheduleLog`
//! - **`rank`**: Upward rank, `pre` scores, virtual entry/exit, CCR shaping
//! - **`scheduler`**: `ListScheduler` engine and `ScheduleKpi`
//! - **`algorithms`**: HEFT, QL-HEFT and HTSTC orderings
//! - **`ga`**: CQGA-HEFT genetic hybrid
//! - **`validation`**: Graph, scheduling list and schedule checks
//! - **`config`**: JSON-loadable tunables
//! - **`io`**: `.tgff` / `.dot` readers and `.dot` writer
//! - **`evaluation`**: One-shot driver and result lines
//! - **`results`**: Result file sorting
//!
//! # Example
//!
//! ```
//! use cluster_sched::algorithms::rank_ordering;
//! use cluster_sched::models::{ClusteredProcessor, TaskGraph};
//! use cluster_sched::scheduler::ListScheduler;
//!
//! let graph = TaskGraph::from_costs(&[2, 3, 1], &[(0, 1, 4), (0, 2, 1)]).unwrap();
//! let processor = ClusteredProcessor::new(2, 1, 2.0).unwrap();
//! let order = rank_ordering(&graph, processor.inout_ratio());
//!
//! let mut scheduler = ListScheduler::new(graph, processor, order);
//! scheduler.schedule().unwrap();
//! assert!(scheduler.makespan().unwrap() >= 5);
//! ```
//!
//! # References
//!
//! - Topcuoglu et al. (2002), "Performance-effective and low-complexity task
//!   scheduling for heterogeneous computing"
//! - Kwok & Ahmad (1999), "Static scheduling algorithms for allocating
//!   directed task graphs to multiprocessors"

pub mod algorithms;
pub mod config;
pub mod error;
pub mod evaluation;
pub mod ga;
pub mod io;
pub mod models;
pub mod rank;
pub mod results;
pub mod scheduler;
pub mod validation;

pub use error::{Error, Result};
