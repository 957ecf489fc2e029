//! List-scheduling engine and KPI evaluation.
//!
//! # Algorithm
//!
//! `ListScheduler` places tasks, in the order given by a scheduling list, on
//! the cluster where they can start earliest, accounting for inter-cluster
//! communication penalties. The ordering itself comes from an
//! [`OrderingStrategy`](crate::algorithms::OrderingStrategy).
//!
//! # KPI
//!
//! `ScheduleKpi` computes makespan, utilization, cross-cluster traffic,
//! critical-path bound and speedup.
//!
//! # References
//!
//! - Topcuoglu et al. (2002), "Performance-effective and low-complexity task
//!   scheduling for heterogeneous computing", IEEE TPDS 13(3)
//! - Kwok & Ahmad (1999), "Static scheduling algorithms for allocating
//!   directed task graphs to multiprocessors"

mod engine;
mod kpi;

pub use engine::ListScheduler;
pub use kpi::ScheduleKpi;
