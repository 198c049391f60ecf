//! Command line interface of the GO enrichment analysis

use std::fs::File;
use std::path::PathBuf;
use std::process;
use std::sync::Mutex;

use clap::{Args, Parser, Subcommand};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use gbsc_enrich::pipeline::{self, Project};
use gbsc_enrich::{Aspect, Config, GoResult};

/// GO enrichment analysis and s-measure ranking of protein clusters
#[derive(Debug, Parser)]
#[command(name = "gbsc-enrich", version, about)]
struct Cli {
    /// Write the log to this file instead of stderr
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Tests all clusters for enriched GO terms and ranks them
    Enrich(EnrichArgs),
    /// Ranks the clusters of a saved enrichment report
    Rank(RankArgs),
}

#[derive(Debug, Args)]
struct EnrichArgs {
    /// Project directory with the GO names and annotations
    #[arg(short, long)]
    project: PathBuf,

    /// Directory with one file per cluster
    #[arg(short, long)]
    clusters: PathBuf,

    /// Annotation file, instead of go_annotations.json of the project
    #[arg(long)]
    annotations: Option<PathBuf>,

    /// Proteins to add to the annotations, one accession per line
    #[arg(long)]
    proteins: Option<PathBuf>,

    /// JSON configuration file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Significance level
    #[arg(short, long)]
    alpha: Option<f64>,

    /// GO aspect: F, P, C or the full name
    #[arg(long)]
    aspect: Option<Aspect>,

    /// Smallest cluster eligible for the ranking
    #[arg(long)]
    min_cluster_size: Option<usize>,

    /// Ignore annotations with this evidence code, e.g. IEA
    #[arg(short = 'e', long = "exclude-evidence")]
    exclude_evidence: Vec<String>,

    /// Number of worker threads
    #[arg(short, long)]
    workers: Option<usize>,
}

#[derive(Debug, Args)]
struct RankArgs {
    /// Enrichment report to rank
    #[arg(short, long)]
    report: PathBuf,

    /// GO name table
    #[arg(short, long)]
    names: PathBuf,

    /// Output file of the ranking
    #[arg(short, long)]
    output: PathBuf,

    /// Smallest cluster eligible for the ranking
    #[arg(long, default_value_t = gbsc_enrich::DEFAULT_MIN_CLUSTER_SIZE)]
    min_cluster_size: usize,
}

impl EnrichArgs {
    /// Loads the configuration file, if any, and applies all flags on top
    fn config(&self) -> GoResult<Config> {
        let mut config = match &self.config {
            Some(path) => Config::from_json_file(path)?,
            None => Config::default(),
        };
        if let Some(alpha) = self.alpha {
            config.alpha = alpha;
        }
        if let Some(aspect) = self.aspect {
            config.aspect = aspect;
        }
        if let Some(size) = self.min_cluster_size {
            config.min_cluster_size = size;
        }
        if self.workers.is_some() {
            config.workers = self.workers;
        }
        config
            .exclude_evidence_codes
            .extend(self.exclude_evidence.iter().cloned());
        Ok(config)
    }
}

fn init_logging(log_file: Option<&PathBuf>) -> GoResult<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    match log_file {
        Some(path) => {
            let file = File::create(path)?;
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .init();
        }
        None => {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
    Ok(())
}

fn enrich(args: &EnrichArgs) -> GoResult<()> {
    let config = args.config()?;
    let mut project = Project::new(&args.project, &args.clusters);
    if let Some(annotations) = &args.annotations {
        project = project.with_annotations(annotations);
    }
    if let Some(proteins) = &args.proteins {
        project = project.with_proteins(proteins);
    }
    info!("Running enrichment with {:?}", config);

    let summary = pipeline::run(&project, &config)?;
    println!(
        "Tested {} of {} clusters, results saved to {}",
        summary.tested_clusters,
        summary.clusters,
        summary.enrichment_report.display()
    );
    println!(
        "s-measure of {} clusters saved to {}",
        summary.ranked,
        summary.ranking_report.display()
    );
    Ok(())
}

fn rank(args: &RankArgs) -> GoResult<()> {
    let ranked = pipeline::rank_report(&args.report, &args.names, &args.output, args.min_cluster_size)?;
    println!("s-measure of {} clusters saved to {}", ranked, args.output.display());
    Ok(())
}

fn main() {
    let cli = Cli::parse();
    if let Err(err) = init_logging(cli.log_file.as_ref()) {
        eprintln!("Error: unable to set up logging: {err}");
        process::exit(1);
    }

    let result = match &cli.command {
        Commands::Enrich(args) => enrich(args),
        Commands::Rank(args) => rank(args),
    };

    if let Err(err) = result {
        error!("{}", err);
        eprintln!("Error: {err}");
        process::exit(1);
    }
}
