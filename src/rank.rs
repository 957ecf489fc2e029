//! Rank and cost-shaping utilities over task graphs.
//!
//! - **Upward rank**: critical-path-to-exit length of each task, the static
//!   priority behind HEFT, QL-HEFT rewards and HTSTC `pre` scores.
//! - **Communication normalisation**: allocation-agnostic edge costs.
//! - **Virtual entry/exit**: single-source, single-sink conversion.
//! - **CCR**: communication-to-computation ratio and shaping towards a target.
//!
//! # Reference
//! Topcuoglu, Hariri & Wu (2002), "Performance-effective and low-complexity
//! task scheduling for heterogeneous computing", IEEE TPDS 13(3)

use crate::error::{Error, Result};
use crate::models::{TaskGraph, TaskId};

/// Computes the upward rank of every task and stores it on the task.
///
/// `rank(t) = exec(t) + max over successors s (comm(t, s) + rank(s))`, and
/// `rank(t) = exec(t)` for exit tasks.
///
/// Returns a dense vector indexed by task id (emptied slots hold 0).
pub fn upward_rank(graph: &mut TaskGraph) -> Vec<u64> {
    let mut ranks = vec![0u64; graph.slot_count()];
    for id in graph.topological_order().into_iter().rev() {
        let tail = graph
            .successors(id)
            .map(|(succ, comm)| comm + ranks[succ])
            .max()
            .unwrap_or(0);
        let exec = graph.task(id).map_or(0, |t| t.exec);
        ranks[id] = exec + tail;
    }
    for task in graph.tasks_mut() {
        task.rank = Some(ranks[task.id]);
    }
    ranks
}

/// Computes upward ranks, then the `pre` score of every task:
/// `max over successors s (comm(t, s) + rank(s))`, 0 without successors.
///
/// Both values are stored on the tasks. Returns the dense `pre` vector.
pub fn pre_scores(graph: &mut TaskGraph) -> Vec<u64> {
    let ranks = upward_rank(graph);
    let mut pre = vec![0u64; graph.slot_count()];
    for id in graph.task_ids().collect::<Vec<_>>() {
        pre[id] = graph
            .successors(id)
            .map(|(succ, comm)| comm + ranks[succ])
            .max()
            .unwrap_or(0);
    }
    for task in graph.tasks_mut() {
        task.pre = Some(pre[task.id]);
    }
    pre
}

/// Rewrites every communication cost to `floor((c + c * inout_ratio) / 2)`.
pub fn normalize_comm_for_ranking(graph: &mut TaskGraph, inout_ratio: f64) {
    graph.map_comms(|c| {
        let c = c as f64;
        ((c + c * inout_ratio) / 2.0) as u64
    });
}

/// Adds a virtual task feeding every current entry task. Returns its id.
pub fn insert_virtual_entry(graph: &mut TaskGraph) -> Result<TaskId> {
    let entries = graph.entry_tasks();
    let virtual_entry = graph.add_virtual_task();
    for entry in entries {
        graph.add_dependency(virtual_entry, entry, 0)?;
    }
    Ok(virtual_entry)
}

/// Adds a virtual task fed by every current exit task. Returns its id.
pub fn insert_virtual_exit(graph: &mut TaskGraph) -> Result<TaskId> {
    let exits = graph.exit_tasks();
    let virtual_exit = graph.add_virtual_task();
    for exit in exits {
        graph.add_dependency(exit, virtual_exit, 0)?;
    }
    Ok(virtual_exit)
}

/// Mean communication cost divided by mean execution cost.
///
/// # Errors
/// `DegenerateGraph` when the graph has no dependency or no execution cost.
pub fn communication_to_computation_ratio(graph: &TaskGraph) -> Result<f64> {
    let edges = graph.dependency_count();
    if edges == 0 {
        return Err(Error::degenerate("graph has no dependencies"));
    }
    let total_exec = graph.total_exec();
    if total_exec == 0 {
        return Err(Error::degenerate("graph has no execution cost"));
    }
    let total_comm: u64 = graph.dependencies().map(|d| d.comm).sum();
    let ave_comm = total_comm as f64 / edges as f64;
    let ave_exec = total_exec as f64 / graph.task_count() as f64;
    Ok(ave_comm / ave_exec)
}

/// Rescales costs until the CCR (rounded to 3 decimals) is within
/// `tolerance` of `target`.
///
/// Each step multiplies communication by 0.98 and execution by 1.02 when the
/// ratio is too high (the reverse when too low), rounding every cost up.
/// Returns the number of steps taken.
///
/// # Errors
/// `NonConvergentShaping` after `max_iterations` steps.
pub fn shape_to_target_ccr(
    graph: &mut TaskGraph,
    target: f64,
    tolerance: f64,
    max_iterations: usize,
) -> Result<usize> {
    let mut iterations = 0;
    loop {
        let ratio = round3(communication_to_computation_ratio(graph)?);
        if (target - ratio).abs() <= tolerance {
            log::debug!("CCR {ratio} reached after {iterations} steps");
            return Ok(iterations);
        }
        if iterations == max_iterations {
            return Err(Error::NonConvergentShaping {
                target,
                iterations,
                ratio,
            });
        }
        let (comm_factor, exec_factor) = if ratio > target {
            (0.98, 1.02)
        } else {
            (1.02, 0.98)
        };
        graph.map_comms(|c| (c as f64 * comm_factor).ceil() as u64);
        graph.map_execs(|e| (e as f64 * exec_factor).ceil() as u64);
        iterations += 1;
    }
}

fn round3(x: f64) -> f64 {
    (x * 1000.0).round() / 1000.0
}

/// Length of the longest execution-only path (communication ignored).
///
/// A lower bound on the makespan of any schedule of the graph.
pub fn critical_path_length(graph: &TaskGraph) -> u64 {
    let mut longest = vec![0u64; graph.slot_count()];
    let mut best = 0;
    for id in graph.topological_order() {
        let head = graph.predecessors(id).map(|p| longest[p]).max().unwrap_or(0);
        longest[id] = head + graph.task(id).map_or(0, |t| t.exec);
        best = best.max(longest[id]);
    }
    best
}
