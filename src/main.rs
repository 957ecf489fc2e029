use std::path::PathBuf;

use clap::{Parser, Subcommand};

use cluster_sched::config::EvaluationConfig;
use cluster_sched::evaluation::{evaluate, shape_graph, Algorithm, ResultLine};
use cluster_sched::io::{read_dag, scale_costs_file};
use cluster_sched::models::ClusteredProcessor;
use cluster_sched::results::sort_result_file;

/// Static scheduling evaluator for clustered many-core processors.
#[derive(Parser)]
#[command(version, about)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Schedule one graph with one algorithm and append the result line.
    Eval(EvalArgs),
    /// Multiply every cost of a graph and write it as `<dir>/<stem>.dot`.
    ScaleCosts {
        #[arg(long)]
        dag_file_path: PathBuf,
        /// Factor applied to every execution cost.
        #[arg(long)]
        exec_factor: f64,
        /// Factor applied to every communication cost.
        #[arg(long)]
        comm_factor: f64,
    },
    /// Sort the rows of a result file by graph index.
    SortResults {
        #[arg(long)]
        result_file_path: PathBuf,
    },
}

#[derive(clap::Args)]
struct EvalArgs {
    /// Graph file (.tgff or .dot).
    #[arg(long)]
    dag_file_path: PathBuf,
    /// HEFT, QL-HEFT, CQGA-HEFT or HTSTC.
    #[arg(long)]
    algorithm: Algorithm,
    #[arg(long)]
    num_of_clusters: usize,
    /// Cores in a single cluster.
    #[arg(long)]
    num_of_cores: usize,
    /// Inter-cluster to intra-cluster communication cost ratio.
    #[arg(long)]
    inout_ratio: f64,
    /// Reshape the graph to this communication-to-computation ratio first.
    #[arg(long)]
    ccr: Option<f64>,
    #[arg(long)]
    write_makespan: bool,
    #[arg(long)]
    write_duration: bool,
    /// Result file the line is appended to.
    #[arg(long)]
    dest_file_path: PathBuf,
    /// JSON evaluation config.
    #[arg(long)]
    config: Option<PathBuf>,
    /// Also export the schedule as JSON.
    #[arg(long)]
    schedule_json: Option<PathBuf>,
}

fn setup_logging() {
    if std::env::var("RUST_LOG").is_err() {
        std::env::set_var("RUST_LOG", "info");
    }
    env_logger::builder().format_timestamp_millis().init();
}

fn run_eval(args: EvalArgs) -> cluster_sched::Result<()> {
    let config = match &args.config {
        Some(path) => EvaluationConfig::from_json_file(path)?,
        None => EvaluationConfig::default(),
    };

    let mut graph = read_dag(&args.dag_file_path)?;
    if let Some(ccr) = args.ccr {
        let steps = shape_graph(&mut graph, ccr, &config.shaping)?;
        log::info!("reshaped to CCR {ccr} in {steps} steps");
    }
    let processor =
        ClusteredProcessor::new(args.num_of_clusters, args.num_of_cores, args.inout_ratio)?;

    let evaluation = evaluate(&graph, &processor, args.algorithm, &config)?;
    ResultLine::from_evaluation(
        &args.dag_file_path,
        &evaluation,
        args.write_duration,
        args.write_makespan,
    )
    .append_to(&args.dest_file_path)?;

    if let Some(path) = &args.schedule_json {
        evaluation.scheduler.write_json(path)?;
        log::info!("schedule written to {}", path.display());
    }
    Ok(())
}

fn main() -> cluster_sched::Result<()> {
    let cli = Cli::parse();
    setup_logging();

    match cli.command {
        Command::Eval(args) => run_eval(args),
        Command::ScaleCosts {
            dag_file_path,
            exec_factor,
            comm_factor,
        } => scale_costs_file(&dag_file_path, exec_factor, comm_factor).map(|_| ()),
        Command::SortResults { result_file_path } => sort_result_file(&result_file_path),
    }
}
