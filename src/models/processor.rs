//! Clustered many-core processor model.
//!
//! A processor is a set of identical clusters, each holding the same number
//! of cores. Communication between tasks placed in the same cluster costs
//! the edge's communication cost; across clusters it is multiplied by
//! `inout_ratio`.
//!
//! Cluster and core ids are 1-based. They form the global core id of the
//! exported schedule.
//!
//! The model is a logical clock: cores count down remaining ticks when the
//! simulation advances. It never runs anything.

use serde::{Deserialize, Serialize};

use super::TaskId;
use crate::error::{Error, Result};

/// A single core.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Core {
    /// Owning cluster id (1-based).
    pub cluster_id: usize,
    /// Core id within the cluster (1-based).
    pub core_id: usize,
    /// Whether the core has no running task.
    pub idle: bool,
    /// Task currently running.
    pub task: Option<TaskId>,
    /// Ticks until the running task finishes.
    pub remaining: u64,
}

/// A cluster of cores.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cluster {
    /// Cluster id (1-based).
    pub cluster_id: usize,
    /// Cores, ordered by core id.
    pub cores: Vec<Core>,
}

/// Homogeneous clustered processor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClusteredProcessor {
    clusters: Vec<Cluster>,
    cores_per_cluster: usize,
    inout_ratio: f64,
}

impl Core {
    fn new(cluster_id: usize, core_id: usize) -> Self {
        Self {
            cluster_id,
            core_id,
            idle: true,
            task: None,
            remaining: 0,
        }
    }

    /// Marks the core busy with `task` for `ticks`.
    ///
    /// A zero-tick task completes immediately and leaves the core idle.
    pub fn allocate(&mut self, task: TaskId, ticks: u64) -> Result<()> {
        if !self.idle {
            return Err(Error::CoreAllocationConflict {
                cluster: self.cluster_id,
                core: self.core_id,
                task,
            });
        }
        if ticks > 0 {
            self.idle = false;
            self.task = Some(task);
            self.remaining = ticks;
        }
        Ok(())
    }

    /// Advances the core by `ticks`.
    pub fn advance(&mut self, ticks: u64) {
        if self.idle {
            return;
        }
        self.remaining = self.remaining.saturating_sub(ticks);
        if self.remaining == 0 {
            self.idle = true;
            self.task = None;
        }
    }
}

impl Cluster {
    fn new(cluster_id: usize, num_cores: usize) -> Self {
        Self {
            cluster_id,
            cores: (1..=num_cores).map(|c| Core::new(cluster_id, c)).collect(),
        }
    }

    /// Smallest remaining-ticks value and the core holding it.
    ///
    /// Ties go to the lowest core id.
    pub fn shortest_remaining(&self) -> (u64, usize) {
        let mut best = (u64::MAX, 0);
        for core in &self.cores {
            if core.remaining < best.0 {
                best = (core.remaining, core.core_id);
            }
        }
        best
    }

    /// Whether every core is idle.
    pub fn is_idle(&self) -> bool {
        self.cores.iter().all(|c| c.idle)
    }
}

impl ClusteredProcessor {
    /// Creates a processor with `num_clusters` clusters of `num_cores` cores.
    ///
    /// # Errors
    /// `InvalidProcessor` for zero clusters/cores or a negative or
    /// non-finite `inout_ratio`.
    pub fn new(num_clusters: usize, num_cores: usize, inout_ratio: f64) -> Result<Self> {
        if num_clusters == 0 || num_cores == 0 {
            return Err(Error::InvalidProcessor(format!(
                "{num_clusters} clusters x {num_cores} cores"
            )));
        }
        if !inout_ratio.is_finite() || inout_ratio < 0.0 {
            return Err(Error::InvalidProcessor(format!(
                "inout ratio must be finite and >= 0, got {inout_ratio}"
            )));
        }
        Ok(Self {
            clusters: (1..=num_clusters)
                .map(|id| Cluster::new(id, num_cores))
                .collect(),
            cores_per_cluster: num_cores,
            inout_ratio,
        })
    }

    /// Clusters, ordered by id.
    pub fn clusters(&self) -> &[Cluster] {
        &self.clusters
    }

    /// Returns a cluster by id.
    pub fn cluster(&self, cluster_id: usize) -> Result<&Cluster> {
        cluster_id
            .checked_sub(1)
            .and_then(|i| self.clusters.get(i))
            .ok_or(Error::UnknownCluster(cluster_id))
    }

    fn cluster_mut(&mut self, cluster_id: usize) -> Result<&mut Cluster> {
        cluster_id
            .checked_sub(1)
            .and_then(|i| self.clusters.get_mut(i))
            .ok_or(Error::UnknownCluster(cluster_id))
    }

    /// Number of clusters.
    pub fn num_clusters(&self) -> usize {
        self.clusters.len()
    }

    /// Number of cores in each cluster.
    pub fn cores_per_cluster(&self) -> usize {
        self.cores_per_cluster
    }

    /// Total number of cores.
    pub fn total_cores(&self) -> usize {
        self.clusters.len() * self.cores_per_cluster
    }

    /// Inter-cluster communication multiplier.
    pub fn inout_ratio(&self) -> f64 {
        self.inout_ratio
    }

    /// Global 1-based core index, cluster-major.
    ///
    /// # Errors
    /// `UnknownCluster` / `UnknownCore` for ids outside the processor.
    pub fn global_core_id(&self, cluster_id: usize, core_id: usize) -> Result<usize> {
        self.cluster(cluster_id)?;
        if !(1..=self.cores_per_cluster).contains(&core_id) {
            return Err(Error::UnknownCore {
                cluster: cluster_id,
                core: core_id,
            });
        }
        Ok(self.cores_per_cluster * (cluster_id - 1) + core_id)
    }

    /// Communication cost for an edge, given whether both ends share a cluster.
    pub fn comm_cost(&self, comm: u64, same_cluster: bool) -> u64 {
        if same_cluster {
            comm
        } else {
            (comm as f64 * self.inout_ratio) as u64
        }
    }

    /// Advances every core by one tick.
    pub fn advance_one_tick(&mut self) {
        self.advance(1);
    }

    /// Advances every core by `ticks`, same as calling
    /// [`advance_one_tick`](Self::advance_one_tick) `ticks` times.
    pub fn advance(&mut self, ticks: u64) {
        if ticks == 0 {
            return;
        }
        for cluster in &mut self.clusters {
            for core in &mut cluster.cores {
                core.advance(ticks);
            }
        }
    }

    /// Smallest remaining ticks in a cluster and the core id holding it.
    pub fn shortest_remaining(&self, cluster_id: usize) -> Result<(u64, usize)> {
        Ok(self.cluster(cluster_id)?.shortest_remaining())
    }

    /// Allocates `task` on a core for `ticks`.
    ///
    /// # Errors
    /// `CoreAllocationConflict` if the core is busy.
    pub fn allocate(
        &mut self,
        cluster_id: usize,
        core_id: usize,
        task: TaskId,
        ticks: u64,
    ) -> Result<()> {
        let cluster = self.cluster_mut(cluster_id)?;
        let core = core_id
            .checked_sub(1)
            .and_then(|i| cluster.cores.get_mut(i))
            .ok_or(Error::UnknownCore {
                cluster: cluster_id,
                core: core_id,
            })?;
        core.allocate(task, ticks)
    }

    /// Whether every core is idle.
    pub fn is_idle(&self) -> bool {
        self.clusters.iter().all(|c| c.is_idle())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_processor_shape() {
        let p = ClusteredProcessor::new(3, 4, 2.0).unwrap();
        assert_eq!(p.num_clusters(), 3);
        assert_eq!(p.cores_per_cluster(), 4);
        assert_eq!(p.total_cores(), 12);
        assert_eq!(p.clusters()[2].cluster_id, 3);
        assert_eq!(p.clusters()[2].cores[3].core_id, 4);
        assert!(p.is_idle());
    }

    #[test]
    fn test_invalid_processor() {
        assert!(matches!(
            ClusteredProcessor::new(0, 4, 1.0),
            Err(Error::InvalidProcessor(_))
        ));
        assert!(ClusteredProcessor::new(1, 0, 1.0).is_err());
        assert!(ClusteredProcessor::new(1, 1, -0.5).is_err());
        assert!(ClusteredProcessor::new(1, 1, f64::NAN).is_err());
    }

    #[test]
    fn test_allocate_and_tick() {
        let mut p = ClusteredProcessor::new(1, 2, 1.0).unwrap();
        p.allocate(1, 1, 7, 2).unwrap();
        assert_eq!(p.shortest_remaining(1).unwrap(), (0, 2));

        p.allocate(1, 2, 8, 3).unwrap();
        assert_eq!(p.shortest_remaining(1).unwrap(), (2, 1));

        p.advance_one_tick();
        assert_eq!(p.clusters()[0].cores[0].remaining, 1);
        assert_eq!(p.clusters()[0].cores[0].task, Some(7));

        p.advance_one_tick();
        let core = &p.clusters()[0].cores[0];
        assert!(core.idle);
        assert_eq!(core.task, None);
        assert_eq!(p.shortest_remaining(1).unwrap(), (0, 1));
    }

    #[test]
    fn test_allocate_busy_core_conflicts() {
        let mut p = ClusteredProcessor::new(1, 1, 1.0).unwrap();
        p.allocate(1, 1, 0, 5).unwrap();
        let err = p.allocate(1, 1, 1, 5).unwrap_err();
        assert!(matches!(
            err,
            Error::CoreAllocationConflict {
                cluster: 1,
                core: 1,
                task: 1
            }
        ));
    }

    #[test]
    fn test_zero_tick_allocation_stays_idle() {
        let mut p = ClusteredProcessor::new(1, 1, 1.0).unwrap();
        p.allocate(1, 1, 0, 0).unwrap();
        assert!(p.is_idle());
        p.allocate(1, 1, 1, 1).unwrap();
    }

    #[test]
    fn test_advance_matches_ticks() {
        let mut a = ClusteredProcessor::new(2, 2, 1.0).unwrap();
        a.allocate(1, 1, 0, 5).unwrap();
        a.allocate(2, 2, 1, 2).unwrap();
        let mut b = a.clone();

        a.advance(3);
        for _ in 0..3 {
            b.advance_one_tick();
        }
        assert_eq!(a, b);
        assert_eq!(a.clusters()[0].cores[0].remaining, 2);
        assert!(a.clusters()[1].cores[1].idle);
    }

    #[test]
    fn test_unknown_cluster_and_core() {
        let mut p = ClusteredProcessor::new(2, 2, 1.0).unwrap();
        assert!(matches!(p.shortest_remaining(0), Err(Error::UnknownCluster(0))));
        assert!(matches!(p.shortest_remaining(3), Err(Error::UnknownCluster(3))));
        assert!(matches!(
            p.allocate(1, 3, 0, 1),
            Err(Error::UnknownCore { cluster: 1, core: 3 })
        ));
    }

    #[test]
    fn test_comm_cost_and_global_id() {
        let p = ClusteredProcessor::new(2, 4, 1.5).unwrap();
        assert_eq!(p.comm_cost(5, true), 5);
        assert_eq!(p.comm_cost(5, false), 7);
        assert_eq!(p.global_core_id(1, 1).unwrap(), 1);
        assert_eq!(p.global_core_id(2, 3).unwrap(), 7);
        assert!(matches!(p.global_core_id(0, 1), Err(Error::UnknownCluster(0))));
        assert!(matches!(p.global_core_id(3, 1), Err(Error::UnknownCluster(3))));
        assert!(matches!(
            p.global_core_id(1, 5),
            Err(Error::UnknownCore { cluster: 1, core: 5 })
        ));
    }
}
