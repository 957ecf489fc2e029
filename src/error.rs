//! Error type shared by the whole crate.

use std::path::PathBuf;

use crate::models::TaskId;

/// Crate-wide result type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised by graph handling, scheduling, configuration and I/O.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A schedule log was queried for a task that has not been allocated yet.
    #[error("task {0} is not allocated")]
    UnscheduledTask(TaskId),

    /// A task id that names no live task.
    #[error("task {0} does not exist in the graph")]
    UnknownTask(TaskId),

    /// A cluster id outside `1..=num_clusters`.
    #[error("cluster {0} does not exist")]
    UnknownCluster(usize),

    /// A core id outside `1..=cores_per_cluster`.
    #[error("core {core} does not exist in cluster {cluster}")]
    UnknownCore { cluster: usize, core: usize },

    /// Engine invariant breach: the selected core was still busy.
    #[error("core {core} of cluster {cluster} is busy, cannot allocate task {task}")]
    CoreAllocationConflict {
        cluster: usize,
        core: usize,
        task: TaskId,
    },

    /// Adding the edge would close a cycle.
    #[error("dependency {pred} -> {succ} would create a cycle")]
    CyclicDependency { pred: TaskId, succ: TaskId },

    /// An edge from a task to itself.
    #[error("task {0} cannot depend on itself")]
    SelfLoop(TaskId),

    /// CCR shaping hit its iteration cap.
    #[error("CCR shaping did not reach {target} after {iterations} iterations (last ratio {ratio})")]
    NonConvergentShaping {
        target: f64,
        iterations: usize,
        ratio: f64,
    },

    /// The graph cannot support the requested operation.
    #[error("degenerate graph: {0}")]
    DegenerateGraph(String),

    /// Makespan of a log without entries.
    #[error("schedule log is empty")]
    EmptySchedule,

    /// Processor construction with zero clusters or cores or a bad ratio.
    #[error("invalid processor: {0}")]
    InvalidProcessor(String),

    /// A scheduling list that is not a valid permutation of the tasks.
    #[error("invalid scheduling list: {0}")]
    InvalidOrdering(String),

    /// A configuration value out of range.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// An algorithm name the driver does not know.
    #[error("unknown algorithm '{0}'")]
    UnknownAlgorithm(String),

    /// A graph file extension without a reader.
    #[error("unsupported graph format: {0}")]
    UnsupportedFormat(String),

    /// Malformed graph or result file content.
    #[error("{}:{line}: {message}", path.display())]
    Parse {
        path: PathBuf,
        line: usize,
        message: String,
    },

    /// Filesystem failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON encoding or decoding failure.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A statement pattern failed to compile.
    #[error("invalid pattern: {0}")]
    Pattern(#[from] regex::Error),
}

impl Error {
    /// Builds a `Parse` error at `line` of `path`.
    pub fn parse<P: Into<PathBuf>, S: Into<String>>(path: P, line: usize, message: S) -> Self {
        Error::Parse {
            path: path.into(),
            line,
            message: message.into(),
        }
    }

    /// Builds a `DegenerateGraph` error.
    pub fn degenerate<S: Into<String>>(msg: S) -> Self {
        Error::DegenerateGraph(msg.into())
    }

    /// Builds an `InvalidConfig` error.
    pub fn invalid_config<S: Into<String>>(msg: S) -> Self {
        Error::InvalidConfig(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        assert_eq!(
            Error::UnknownCore { cluster: 2, core: 7 }.to_string(),
            "core 7 does not exist in cluster 2"
        );
        assert_eq!(
            Error::parse("dag.tgff", 12, "missing cost").to_string(),
            "dag.tgff:12: missing cost"
        );
        assert_eq!(
            Error::invalid_config("episodes must be positive").to_string(),
            "invalid configuration: episodes must be positive"
        );
        assert!(matches!(
            Error::degenerate("no tasks"),
            Error::DegenerateGraph(ref m) if m == "no tasks"
        ));
    }

    #[test]
    fn test_pattern_error_converts() {
        let err: Error = regex::Regex::new("(").unwrap_err().into();
        assert!(matches!(err, Error::Pattern(_)));
        assert!(err.to_string().starts_with("invalid pattern"));
    }
}
