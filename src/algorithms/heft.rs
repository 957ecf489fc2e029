//! HEFT task ordering for clustered processors.
//!
//! Communication costs are first normalised to the mean of the intra- and
//! inter-cluster cost, since placement is unknown at ordering time. Tasks are
//! then listed by descending upward rank.
//!
//! # Reference
//! Topcuoglu, Hariri & Wu (2002), "Performance-effective and low-complexity
//! task scheduling for heterogeneous computing", IEEE TPDS 13(3), Sec. 4.1

use super::{order_by_descending_score, OrderingStrategy};
use crate::error::Result;
use crate::models::{TaskGraph, TaskId};
use crate::rank::{normalize_comm_for_ranking, upward_rank};

/// Orders the tasks of `graph` by descending upward rank.
///
/// The input graph is left untouched. Deterministic.
pub fn rank_ordering(graph: &TaskGraph, inout_ratio: f64) -> Vec<TaskId> {
    let mut g = graph.clone();
    normalize_comm_for_ranking(&mut g, inout_ratio);
    let ranks = upward_rank(&mut g);
    order_by_descending_score(&g, &ranks)
}

/// HEFT as an [`OrderingStrategy`].
#[derive(Debug, Clone, Copy)]
pub struct Heft {
    inout_ratio: f64,
}

impl Heft {
    /// Creates a HEFT ordering for a processor with the given `inout_ratio`.
    pub fn new(inout_ratio: f64) -> Self {
        Self { inout_ratio }
    }
}

impl OrderingStrategy for Heft {
    fn name(&self) -> &'static str {
        "HEFT"
    }

    fn sched_list(&mut self, graph: &TaskGraph) -> Result<Vec<TaskId>> {
        Ok(rank_ordering(graph, self.inout_ratio))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validation::validate_sched_list;

    #[test]
    fn test_rank_ordering() {
        // ranks with ratio 1.0: [15, 8, 12, 1, 5]
        let g = TaskGraph::from_costs(
            &[2, 3, 4, 1, 5],
            &[(0, 1, 2), (0, 2, 1), (1, 3, 4), (2, 3, 2), (2, 4, 3)],
        )
        .unwrap();
        assert_eq!(rank_ordering(&g, 1.0), vec![0, 2, 1, 4, 3]);
        assert!(g.task(0).unwrap().rank.is_none());
    }

    #[test]
    fn test_normalisation_changes_priorities() {
        // 0 -> 1 (comm 4), 2 -> 3 (comm 0); exec 1,1 and 3,1
        let g = TaskGraph::from_costs(&[1, 1, 3, 1], &[(0, 1, 4), (2, 3, 0)]).unwrap();
        // ratio 0: comm 4 -> 2, rank(0) = 4, rank(2) = 4
        assert_eq!(rank_ordering(&g, 0.0), vec![0, 2, 1, 3]);
        // ratio 2: comm 4 -> 6, rank(0) = 8
        assert_eq!(rank_ordering(&g, 2.0)[0], 0);
        // ratio 0 with no comm at all: 2 first
        let mut flat = g.clone();
        flat.map_comms(|_| 0);
        assert_eq!(rank_ordering(&flat, 0.0), vec![2, 0, 1, 3]);
    }

    #[test]
    fn test_rank_ties_follow_id_order() {
        // 2 -> 0: rank(2) = 2, rank(0) = rank(1) = 1
        let g = TaskGraph::from_costs(&[1, 1, 1], &[(2, 0, 0)]).unwrap();
        assert_eq!(rank_ordering(&g, 1.0), vec![2, 0, 1]);
    }

    #[test]
    fn test_deterministic_and_valid() {
        let g = TaskGraph::from_costs(
            &[3, 2, 2, 4, 1, 1],
            &[(0, 1, 3), (0, 2, 3), (1, 3, 1), (2, 3, 1), (3, 4, 0), (3, 5, 2)],
        )
        .unwrap();
        let mut heft = Heft::new(1.5);
        let a = heft.sched_list(&g).unwrap();
        let b = heft.sched_list(&g).unwrap();
        assert_eq!(a, b);
        assert!(validate_sched_list(&g, &a).is_ok());
        assert_eq!(heft.name(), "HEFT");
    }
}
