//! Input and result validation.
//!
//! Checks the structural integrity of graphs, scheduling lists and finished
//! schedules. Every check collects all detected issues instead of stopping
//! at the first one. Detects:
//! - Empty graphs and sparse task ids
//! - Unknown, duplicate or missing tasks in a scheduling list
//! - Precedence violations in a scheduling list
//! - Core overlaps and communication delays in a schedule
//!
//! # Reference
//! Cormen et al. (2009), "Introduction to Algorithms", Ch. 22.4 (Topological Sort)

use std::collections::{BTreeMap, HashSet};
use std::fmt;

use crate::models::{ClusteredProcessor, LogEntry, ScheduleLog, TaskGraph, TaskId};

/// Validation result.
pub type ValidationResult = Result<(), Vec<ValidationError>>;

/// A validation error.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationError {
    /// Error category.
    pub kind: ValidationErrorKind,
    /// Human-readable description.
    pub message: String,
}

/// Categories of validation errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationErrorKind {
    /// The graph has no task.
    EmptyGraph,
    /// Task ids do not cover `0..N`.
    SparseIds,
    /// The list names a task missing from the graph.
    UnknownTask,
    /// The list names a task twice.
    DuplicateTask,
    /// A live task is absent from the list.
    MissingTask,
    /// A task comes before one of its predecessors.
    PrecedenceViolation,
}

impl ValidationError {
    fn new(kind: ValidationErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

/// A constraint broken by a finished schedule.
#[derive(Debug, Clone, PartialEq)]
pub struct Violation {
    /// Violation category.
    pub kind: ViolationKind,
    /// Human-readable description.
    pub message: String,
}

/// Categories of schedule violations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViolationKind {
    /// A live task has no log entry.
    Unscheduled,
    /// An entry names a cluster or core the processor lacks.
    UnknownPlacement,
    /// An entry's duration differs from the task's execution cost.
    DurationMismatch,
    /// Two entries overlap on one core.
    CoreOverlap,
    /// A task starts before its input data can arrive.
    CommunicationDelay,
}

impl Violation {
    fn new(kind: ViolationKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

/// Validates that a graph is non-empty with ids `0..N`.
pub fn validate_graph(graph: &TaskGraph) -> ValidationResult {
    let mut errors = Vec::new();
    if graph.task_count() == 0 {
        errors.push(ValidationError::new(
            ValidationErrorKind::EmptyGraph,
            "Graph has no task",
        ));
    }
    if graph.task_count() != graph.slot_count() {
        let missing: Vec<String> = (0..graph.slot_count())
            .filter(|&id| !graph.contains(id))
            .map(|id| id.to_string())
            .collect();
        errors.push(ValidationError::new(
            ValidationErrorKind::SparseIds,
            format!("Task ids are not contiguous, missing {}", missing.join(", ")),
        ));
    }
    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Validates a scheduling list against a graph.
///
/// Checks:
/// 1. Every id names a live task
/// 2. No id appears twice
/// 3. Every live task appears
/// 4. Every task comes after all of its predecessors
///
/// # Returns
/// `Ok(())` if all checks pass, `Err(errors)` with all detected issues.
pub fn validate_sched_list(graph: &TaskGraph, list: &[TaskId]) -> ValidationResult {
    let mut errors = Vec::new();
    let mut seen: HashSet<TaskId> = HashSet::new();

    for &id in list {
        if !graph.contains(id) {
            errors.push(ValidationError::new(
                ValidationErrorKind::UnknownTask,
                format!("Task {id} is not in the graph"),
            ));
            continue;
        }
        if seen.contains(&id) {
            errors.push(ValidationError::new(
                ValidationErrorKind::DuplicateTask,
                format!("Task {id} is listed more than once"),
            ));
            continue;
        }
        for pred in graph.predecessors(id) {
            if !seen.contains(&pred) {
                errors.push(ValidationError::new(
                    ValidationErrorKind::PrecedenceViolation,
                    format!("Task {id} is listed before its predecessor {pred}"),
                ));
            }
        }
        seen.insert(id);
    }

    for id in graph.task_ids() {
        if !seen.contains(&id) {
            errors.push(ValidationError::new(
                ValidationErrorKind::MissingTask,
                format!("Task {id} is missing from the list"),
            ));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Checks a finished schedule against its graph and processor.
///
/// Returns every violation found; an empty vector means the schedule is
/// feasible.
pub fn check_schedule(
    graph: &TaskGraph,
    processor: &ClusteredProcessor,
    log: &ScheduleLog,
) -> Vec<Violation> {
    let mut violations = Vec::new();

    for id in graph.task_ids() {
        match (log.get(id), graph.task(id)) {
            (None, _) => violations.push(Violation::new(
                ViolationKind::Unscheduled,
                format!("Task {id} was never scheduled"),
            )),
            (Some(e), Some(task)) if e.duration() != task.exec => {
                violations.push(Violation::new(
                    ViolationKind::DurationMismatch,
                    format!(
                        "Task {id} ran for {} ticks, expected {}",
                        e.duration(),
                        task.exec
                    ),
                ))
            }
            _ => {}
        }
    }

    let mut by_core: BTreeMap<(usize, usize), Vec<&LogEntry>> = BTreeMap::new();
    for entry in log.entries() {
        let known_core = processor.cluster(entry.cluster_id).is_ok()
            && (1..=processor.cores_per_cluster()).contains(&entry.core_id);
        if !known_core {
            violations.push(Violation::new(
                ViolationKind::UnknownPlacement,
                format!(
                    "Task {} placed on unknown core {}.{}",
                    entry.task, entry.cluster_id, entry.core_id
                ),
            ));
        }
        by_core
            .entry((entry.cluster_id, entry.core_id))
            .or_default()
            .push(entry);
    }

    for ((cluster, core), mut entries) in by_core {
        entries.sort_by_key(|e| (e.start, e.finish));
        for pair in entries.windows(2) {
            if pair[0].overlaps(pair[1]) {
                violations.push(Violation::new(
                    ViolationKind::CoreOverlap,
                    format!(
                        "Tasks {} and {} overlap on core {cluster}.{core}",
                        pair[0].task, pair[1].task
                    ),
                ));
            }
        }
    }

    for dep in graph.dependencies() {
        let (Some(src), Some(dst)) = (log.get(dep.source), log.get(dep.target)) else {
            continue;
        };
        let delay = processor.comm_cost(dep.comm, src.cluster_id == dst.cluster_id);
        if dst.start < src.finish + delay {
            violations.push(Violation::new(
                ViolationKind::CommunicationDelay,
                format!(
                    "Task {} starts at {} before data from task {} arrives at {}",
                    dep.target,
                    dst.start,
                    dep.source,
                    src.finish + delay
                ),
            ));
        }
    }

    violations
}
