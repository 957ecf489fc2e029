//! Evaluation driver.
//!
//! Runs one ordering algorithm on one graph and processor, schedules the
//! resulting list and reports the makespan together with the time the
//! algorithm spent building its ordering:
//!
//! | Algorithm | Timed section |
//! |-----------|---------------|
//! | HEFT | Rank computation and sort |
//! | QL-HEFT | Q-learning episodes |
//! | CQGA-HEFT | Whole evolution |
//! | HTSTC | Clustering, ordering and merge replay |
//!
//! Results are appended to a comma-separated file, one line per run:
//! `<dag file name>[,<duration secs>][,<makespan>]`.

use std::fmt;
use std::io::Write;
use std::path::Path;
use std::str::FromStr;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

use crate::algorithms::{Heft, HtstcOrdering, OrderingStrategy, QlHeft};
use crate::config::{EvaluationConfig, ShapingConfig};
use crate::error::{Error, Result};
use crate::ga::Cqgaheft;
use crate::models::{ClusteredProcessor, TaskGraph, TaskId};
use crate::rank::shape_to_target_ccr;
use crate::scheduler::{ListScheduler, ScheduleKpi};
use crate::validation::{validate_graph, validate_sched_list};

/// Ordering algorithm selectable by the driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Algorithm {
    /// Upward-rank list scheduling.
    #[serde(rename = "HEFT")]
    Heft,
    /// Q-learning ordering.
    #[serde(rename = "QL-HEFT")]
    QlHeft,
    /// Genetic search over penalised edges decoded by Q-learning.
    #[serde(rename = "CQGA-HEFT")]
    CqgaHeft,
    /// Task clustering before `pre`-score ordering.
    #[serde(rename = "HTSTC")]
    Htstc,
}

impl Algorithm {
    /// All algorithms, in CLI order.
    pub const ALL: [Algorithm; 4] = [
        Algorithm::Heft,
        Algorithm::QlHeft,
        Algorithm::CqgaHeft,
        Algorithm::Htstc,
    ];

    /// Canonical name.
    pub fn name(&self) -> &'static str {
        match self {
            Algorithm::Heft => "HEFT",
            Algorithm::QlHeft => "QL-HEFT",
            Algorithm::CqgaHeft => "CQGA-HEFT",
            Algorithm::Htstc => "HTSTC",
        }
    }
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Algorithm {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Algorithm::ALL
            .into_iter()
            .find(|a| a.name() == s)
            .ok_or_else(|| Error::UnknownAlgorithm(s.to_string()))
    }
}

/// Outcome of one evaluation run.
#[derive(Debug, Clone)]
pub struct Evaluation {
    /// Algorithm that produced the ordering.
    pub algorithm: Algorithm,
    /// Scheduling list handed to the engine.
    pub sched_list: Vec<TaskId>,
    /// Merges applied before scheduling (HTSTC only).
    pub merges: Vec<(TaskId, TaskId)>,
    /// Time spent building the ordering.
    pub duration: Duration,
    /// Schedule length.
    pub makespan: u64,
    /// Finished engine, holding the scheduled graph, processor and log.
    pub scheduler: ListScheduler,
}

impl Evaluation {
    /// KPIs of the finished schedule.
    pub fn kpi(&self) -> ScheduleKpi {
        ScheduleKpi::calculate(
            self.scheduler.graph(),
            self.scheduler.processor(),
            self.scheduler.log(),
        )
    }
}

/// Rescales `graph` in place to the target communication-to-computation
/// ratio. Returns the number of shaping steps.
pub fn shape_graph(graph: &mut TaskGraph, ccr: f64, shaping: &ShapingConfig) -> Result<usize> {
    shape_to_target_ccr(graph, ccr, shaping.tolerance, shaping.max_iterations)
}

/// Evaluates `algorithm` on copies of `graph` and `processor`.
///
/// Without a configured seed the random algorithms draw a fresh one.
///
/// # Errors
/// - `DegenerateGraph` for an empty graph or non-contiguous ids
/// - `InvalidOrdering` if the algorithm returns a list that is not a
///   precedence-valid permutation of the tasks
/// - any error of the algorithm or the engine
pub fn evaluate(
    graph: &TaskGraph,
    processor: &ClusteredProcessor,
    algorithm: Algorithm,
    config: &EvaluationConfig,
) -> Result<Evaluation> {
    validate_graph(graph).map_err(|errors| Error::degenerate(join_messages(&errors)))?;
    let seed = config.seed.unwrap_or_else(rand::random);
    let ratio = processor.inout_ratio();
    log::info!(
        "{algorithm}: {} tasks, {} dependencies, {}x{} cores, inout ratio {ratio}",
        graph.task_count(),
        graph.dependency_count(),
        processor.num_clusters(),
        processor.cores_per_cluster()
    );

    let mut scheduled_graph = graph.clone();
    let mut merges = Vec::new();
    let (sched_list, duration) = match algorithm {
        Algorithm::Heft => {
            let started = Instant::now();
            let list = Heft::new(ratio).sched_list(graph)?;
            (list, started.elapsed())
        }
        Algorithm::QlHeft => {
            let mut strategy = QlHeft::new(config.learning.clone(), ratio, seed);
            let list = strategy.sched_list(graph)?;
            (list, strategy.learning_duration().unwrap_or_default())
        }
        Algorithm::CqgaHeft => {
            let mut ga = Cqgaheft::new(
                graph,
                processor,
                config.learning.clone(),
                config.genetic.clone(),
                seed,
            )?;
            ga.evolution()?;
            let list = ga.sched_list()?;
            (list, ga.duration().unwrap_or_default())
        }
        Algorithm::Htstc => {
            let started = Instant::now();
            let mut strategy = HtstcOrdering::new(ratio);
            let list = strategy.sched_list(graph)?;
            scheduled_graph = strategy.clustered(graph)?;
            merges = strategy.merges().to_vec();
            (list, started.elapsed())
        }
    };

    validate_sched_list(&scheduled_graph, &sched_list)
        .map_err(|errors| Error::InvalidOrdering(join_messages(&errors)))?;

    let mut scheduler = ListScheduler::new(scheduled_graph, processor.clone(), sched_list.clone());
    match algorithm {
        Algorithm::Htstc => scheduler.schedule_using_task_duplication()?,
        _ => scheduler.schedule()?,
    }
    let makespan = scheduler.makespan()?;
    log::info!(
        "{algorithm}: makespan {makespan}, ordering built in {:.3}s",
        duration.as_secs_f64()
    );

    Ok(Evaluation {
        algorithm,
        sched_list,
        merges,
        duration,
        makespan,
        scheduler,
    })
}

fn join_messages<E: fmt::Display>(errors: &[E]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// One line of a result file.
#[derive(Debug, Clone, PartialEq)]
pub struct ResultLine {
    /// File name of the evaluated graph.
    pub dag_name: String,
    /// Ordering time in seconds, when requested.
    pub duration: Option<f64>,
    /// Makespan, when requested.
    pub makespan: Option<u64>,
}

impl ResultLine {
    /// Creates a line with only the graph name.
    pub fn new(dag_name: impl Into<String>) -> Self {
        Self {
            dag_name: dag_name.into(),
            duration: None,
            makespan: None,
        }
    }

    /// Line for `dag_path` with the requested columns of `evaluation`.
    pub fn from_evaluation(
        dag_path: &Path,
        evaluation: &Evaluation,
        write_duration: bool,
        write_makespan: bool,
    ) -> Self {
        let name = dag_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let mut line = Self::new(name);
        if write_duration {
            line = line.with_duration(evaluation.duration.as_secs_f64());
        }
        if write_makespan {
            line = line.with_makespan(evaluation.makespan);
        }
        line
    }

    /// Sets the duration column.
    pub fn with_duration(mut self, secs: f64) -> Self {
        self.duration = Some(secs);
        self
    }

    /// Sets the makespan column.
    pub fn with_makespan(mut self, makespan: u64) -> Self {
        self.makespan = Some(makespan);
        self
    }

    /// Appends the line to `path`, creating the file if needed.
    pub fn append_to<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let mut file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)?;
        writeln!(file, "{self}")?;
        Ok(())
    }
}

impl fmt::Display for ResultLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.dag_name)?;
        if let Some(d) = self.duration {
            write!(f, ",{d}")?;
        }
        if let Some(m) = self.makespan {
            write!(f, ",{m}")?;
        }
        Ok(())
    }
}
