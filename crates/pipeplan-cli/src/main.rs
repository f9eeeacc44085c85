//! pipeplan CLI: cluster sizing, join strategy, and quality decisions.

mod logging;

use std::fs;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use clap::{Parser, Subcommand};
use pipeplan_advisor::{
    advise, parse_run_profile, plan_cluster, plan_join, AdviceReport, JobTuning, QualityAssessment,
    QualityScores, QualityWeights,
};
use pipeplan_core::config::{Environment, PipelineConfig};
use pipeplan_core::manifest::AdviceManifest;
use pipeplan_core::volume::VolumeMetrics;
use pipeplan_dag::{standard_pipeline, TaskGraph};

type CliResult<T> = Result<T, Box<dyn std::error::Error>>;

#[derive(Parser)]
#[command(name = "pipeplan")]
#[command(about = "Resource sizing, join strategy, and quality decisions for batch ETL pipelines", long_about = None)]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Target environment (overrides PIPEPLAN_ENVIRONMENT)
    #[arg(long, global = true)]
    environment: Option<Environment>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Recommend a cluster shape for a data volume
    Cluster {
        /// Total input size in MB (fractional values allowed)
        #[arg(long)]
        size_mb: f64,

        /// Print the full cluster request as JSON
        #[arg(long)]
        json: bool,
    },

    /// Pick a join strategy from the two sides' row counts
    Join {
        #[arg(long)]
        left_rows: u64,

        #[arg(long)]
        right_rows: u64,

        /// Broadcast threshold in rows (overrides config)
        #[arg(long)]
        threshold: Option<u64>,
    },

    /// Score data quality from four sub-scores
    Score {
        #[arg(long)]
        completeness: f64,

        #[arg(long)]
        accuracy: f64,

        #[arg(long)]
        consistency: f64,

        #[arg(long)]
        timeliness: f64,

        /// Four comma-separated weights in the same order
        #[arg(long, value_delimiter = ',')]
        weights: Option<Vec<f64>>,
    },

    /// Run every decision for a YAML run profile
    Advise {
        /// Path to the run profile YAML file
        #[arg(short, long)]
        profile: PathBuf,

        /// Print the report as JSON
        #[arg(long)]
        json: bool,

        /// Also print an audit manifest tying the report to the pipeline graph
        #[arg(long)]
        manifest: bool,
    },

    /// Validate a run profile YAML file
    Validate {
        /// Path to the run profile YAML file
        #[arg(short, long)]
        profile: PathBuf,
    },

    /// Print the standard pipeline in execution order
    Graph,
}

fn main() {
    let cli = Cli::parse();
    logging::init_logging(cli.verbose);

    if let Err(e) = run(cli) {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

fn load_config(environment: Option<Environment>) -> CliResult<PipelineConfig> {
    let mut config = PipelineConfig::from_env()?;
    if let Some(env) = environment {
        config.environment = env;
    }
    Ok(config)
}

fn run(cli: Cli) -> CliResult<()> {
    let config = load_config(cli.environment)?;

    match cli.command {
        Commands::Cluster { size_mb, json } => {
            let volume = VolumeMetrics::from_megabytes(size_mb)?;
            let plan = plan_cluster(&volume);
            if json {
                let spec = plan.to_cluster_spec(&config.cluster);
                println!("{}", serde_json::to_string_pretty(&spec)?);
            } else {
                println!(
                    "{} workers x {} ({}), executor memory {}, {} cores",
                    plan.worker_count,
                    plan.worker_class,
                    plan.worker_class.instance_type(),
                    plan.memory_per_executor,
                    plan.core_count
                );
            }
        }
        Commands::Join {
            left_rows,
            right_rows,
            threshold,
        } => {
            let threshold = threshold.unwrap_or(config.broadcast_row_threshold);
            let plan = plan_join(left_rows, right_rows, threshold);
            println!("{}", plan.strategy);
        }
        Commands::Score {
            completeness,
            accuracy,
            consistency,
            timeliness,
            weights,
        } => {
            let scores = QualityScores::new(completeness, accuracy, consistency, timeliness)?;
            let weights = weights.as_deref().map(parse_weights).transpose()?;
            let assessment = QualityAssessment::assess(scores, weights.as_ref(), &config.quality)?;
            println!("{}", render_assessment(&assessment));
        }
        Commands::Advise {
            profile,
            json,
            manifest,
        } => {
            let report = advise_from_file(&profile, &config)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                print!("{}", render_report(&report));
            }
            if manifest {
                let graph = standard_pipeline(&config)?;
                let m = build_manifest(&report, &graph)?;
                println!("{}", serde_json::to_string_pretty(&m)?);
            }
        }
        Commands::Validate { profile } => {
            let src = fs::read_to_string(&profile)?;
            let parsed = parse_run_profile(&src)?;
            parsed.source_stats(&config)?;
            println!("✓ Run profile is valid ({} sources, {} joins)", parsed.sources.len(), parsed.joins.len());
        }
        Commands::Graph => {
            let graph = standard_pipeline(&config)?;
            print!("{}", render_graph(&graph)?);
        }
    }
    Ok(())
}

fn parse_weights(raw: &[f64]) -> CliResult<QualityWeights> {
    match raw {
        [completeness, accuracy, consistency, timeliness] => Ok(QualityWeights {
            completeness: *completeness,
            accuracy: *accuracy,
            consistency: *consistency,
            timeliness: *timeliness,
        }),
        _ => Err(format!("expected 4 weights, got {}", raw.len()).into()),
    }
}

fn advise_from_file(path: &Path, config: &PipelineConfig) -> CliResult<AdviceReport> {
    let src = fs::read_to_string(path)?;
    let profile = parse_run_profile(&src)?;
    Ok(advise(&profile, config)?)
}

fn build_manifest(report: &AdviceReport, graph: &TaskGraph) -> CliResult<AdviceManifest> {
    let created_ms = SystemTime::now().duration_since(UNIX_EPOCH)?.as_millis() as u64;
    Ok(AdviceManifest::new(report.fingerprint()?, created_ms).with_graph(graph.shape_hash()?))
}

fn render_assessment(a: &QualityAssessment) -> String {
    let mut out = format!("{:.2} {}", a.composite, a.status);
    if let Some(alert) = &a.alert {
        out.push_str(&format!(" ({}: {:.2} < {})", alert.message, alert.actual, alert.threshold));
    }
    out
}

fn render_report(report: &AdviceReport) -> String {
    let mut out = String::new();
    if let Some(date) = &report.data_date {
        out.push_str(&format!("Advice for {date}\n"));
    }
    out.push_str(&format!(
        "Volume: {:.1} MB, {} rows\n",
        report.volume.total_mb(),
        report.volume.total_rows.unwrap_or(0)
    ));
    let c = &report.cluster;
    out.push_str(&format!(
        "Cluster: {} x {} ({}), {} per executor, {} cores\n",
        c.worker_count,
        c.worker_class,
        c.worker_class.instance_type(),
        c.memory_per_executor,
        c.core_count
    ));
    for j in &report.joins {
        out.push_str(&format!(
            "Join {}: {} ({} rows vs {} rows, threshold {})\n",
            j.name, j.plan.strategy, j.left_rows, j.right_rows, j.threshold
        ));
    }
    if let Some(q) = &report.quality {
        out.push_str(&format!("Quality: {}\n", render_assessment(q)));
    }
    if let Some(f) = &report.freshness {
        let state = if f.is_fresh { "fresh" } else { "stale" };
        out.push_str(&format!(
            "Freshness: {state} ({}h, window {}h)\n",
            f.hours_since_update, f.threshold_hours
        ));
    }
    for (source, violations) in &report.violations {
        for v in violations {
            out.push_str(&format!("Violation in {source}: {v}\n"));
        }
    }
    out.push_str(&render_tuning(&report.tuning));
    out
}

fn render_tuning(t: &JobTuning) -> String {
    let mut out = String::new();
    if !t.partition_columns.is_empty() {
        out.push_str(&format!("Partition by: {}\n", t.partition_columns.join(", ")));
    }
    if let Some((n, columns)) = t.bucketing() {
        out.push_str(&format!("Bucket by: {} into {n} buckets\n", columns.join(", ")));
    }
    if t.cache_level.is_enabled() {
        out.push_str(&format!("Cache: {}\n", t.cache_level));
    } else {
        out.push_str("Cache: off\n");
    }
    if t.coalesce_partitions > 0 {
        out.push_str(&format!("Coalesce to: {} partitions\n", t.coalesce_partitions));
    }
    if let Some(path) = &t.checkpoint_path {
        out.push_str(&format!("Checkpoint: {path}\n"));
    }
    out
}

fn render_graph(graph: &TaskGraph) -> CliResult<String> {
    let mut out = String::new();
    for (i, task) in graph.topological_order()?.iter().enumerate() {
        let upstream = graph
            .upstream_of(task.id.as_str())?
            .iter()
            .map(|id| id.as_str())
            .collect::<Vec<_>>()
            .join(", ");
        let group = task.group.as_ref().map(|g| format!(" [{g}]")).unwrap_or_default();
        out.push_str(&format!(
            "{:>2}. {}{group} trigger={} retries={} after: {}\n",
            i + 1,
            task.id,
            task.trigger,
            task.retry.retries,
            if upstream.is_empty() { "-" } else { upstream.as_str() }
        ));
    }
    Ok(out)
}
