//! Schedule quality metrics (KPIs).
//!
//! Computes standard performance indicators from a completed schedule log,
//! the graph it was built from and the processor it ran on.
//!
//! # Metrics
//!
//! | Metric | Definition |
//! |--------|-----------|
//! | Makespan (C_max) | Latest finish time |
//! | Total Busy | Sum of execution ticks |
//! | Core Utilization | busy(core) / makespan |
//! | Avg Utilization | Mean over all cores, idle ones included |
//! | Cross-Cluster Edges | Dependencies whose ends ran in different clusters |
//! | Critical Path | Longest execution-only path (lower bound) |
//! | Speedup | total busy / makespan |
//!
//! # Reference
//! Kwok & Ahmad (1999), "Static scheduling algorithms for allocating directed
//! task graphs to multiprocessors", Sec. 2 (performance measures)

use std::collections::BTreeMap;

use crate::models::{ClusteredProcessor, ScheduleLog, TaskGraph};
use crate::rank::critical_path_length;

/// Schedule performance indicators. All times are in ticks.
#[derive(Debug, Clone)]
pub struct ScheduleKpi {
    /// Latest finish time.
    pub makespan: u64,
    /// Sum of execution ticks over all scheduled tasks.
    pub total_busy: u64,
    /// Per-core utilization keyed by global core id (0.0..1.0).
    pub utilization_by_core: BTreeMap<usize, f64>,
    /// Mean utilization over every core of the processor.
    pub avg_utilization: f64,
    /// Dependencies whose endpoints were placed in different clusters.
    pub cross_cluster_edges: usize,
    /// Longest execution-only path of the graph.
    pub critical_path: u64,
    /// Serial execution time over makespan.
    pub speedup: f64,
}

impl ScheduleKpi {
    /// Computes KPIs for a schedule.
    ///
    /// Tasks missing from the log are ignored; an empty log yields zeros.
    pub fn calculate(graph: &TaskGraph, processor: &ClusteredProcessor, log: &ScheduleLog) -> Self {
        let makespan = log.makespan().unwrap_or(0);

        let mut busy_by_core: BTreeMap<usize, u64> = BTreeMap::new();
        for id in 1..=processor.total_cores() {
            busy_by_core.insert(id, 0);
        }
        let mut total_busy = 0;
        for entry in log.entries() {
            total_busy += entry.duration();
            // entries on cores the processor lacks only count towards total_busy
            if let Ok(id) = processor.global_core_id(entry.cluster_id, entry.core_id) {
                *busy_by_core.entry(id).or_insert(0) += entry.duration();
            }
        }

        let utilization_by_core: BTreeMap<usize, f64> = busy_by_core
            .into_iter()
            .map(|(id, busy)| {
                let u = if makespan == 0 {
                    0.0
                } else {
                    busy as f64 / makespan as f64
                };
                (id, u)
            })
            .collect();
        let avg_utilization = if utilization_by_core.is_empty() {
            0.0
        } else {
            utilization_by_core.values().sum::<f64>() / utilization_by_core.len() as f64
        };

        let cross_cluster_edges = graph
            .dependencies()
            .filter(|d| match (log.get(d.source), log.get(d.target)) {
                (Some(a), Some(b)) => a.cluster_id != b.cluster_id,
                _ => false,
            })
            .count();

        let speedup = if makespan == 0 {
            0.0
        } else {
            total_busy as f64 / makespan as f64
        };

        Self {
            makespan,
            total_busy,
            utilization_by_core,
            avg_utilization,
            cross_cluster_edges,
            critical_path: critical_path_length(graph),
            speedup,
        }
    }

    /// Makespan over the critical-path lower bound (1.0 is optimal).
    pub fn schedule_length_ratio(&self) -> f64 {
        if self.critical_path == 0 {
            0.0
        } else {
            self.makespan as f64 / self.critical_path as f64
        }
    }

    /// Whether the schedule meets the given quality thresholds.
    pub fn meets_thresholds(&self, max_makespan: u64, min_utilization: f64) -> bool {
        self.makespan <= max_makespan && self.avg_utilization >= min_utilization
    }
}
