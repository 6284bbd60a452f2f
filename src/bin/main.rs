//! pegasvm command line interface
//!
//! Two positional paths, dispatched on what the first one is:
//! a directory of class subdirectories trains a new store at the second
//! path; a BMP file is classified against the store at the second path.

use clap::{Parser, ValueEnum};
use env_logger::Env;
use log::{error, info};
use pegasvm::core::{LearningRate, NormPolicy, Result, StoreError, TrainConfig};
use pegasvm::{classify, BmpFile, ClassPopulation, DirectoryPicker, Trainer, VectorStore};
use std::path::PathBuf;
use std::process;

#[derive(Parser)]
#[command(name = "pegasvm")]
#[command(about = "Out-of-core one-vs-one SVM: train a vector store from a class tree, or classify a BMP against one")]
#[command(version = env!("CARGO_PKG_VERSION"))]
struct Cli {
    /// Class root directory (train) or BMP query file (classify)
    input: PathBuf,

    /// Vector store file: created when training, read when classifying
    store: PathBuf,

    /// Number of training steps (one sample per class per step)
    #[arg(long, default_value = "100")]
    steps: usize,

    /// Regularization constant lambda
    #[arg(long, default_value = "0.0001")]
    lambda: f64,

    /// Learning-rate schedule
    #[arg(long, default_value = "inverse-sqrt")]
    schedule: CliSchedule,

    /// Normalization divisor policy
    #[arg(long, default_value = "euclidean")]
    norm: CliNorm,

    /// Seed for sample selection (random when omitted)
    #[arg(long)]
    seed: Option<u64>,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Enable debug output
    #[arg(short, long)]
    debug: bool,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum CliSchedule {
    /// 1 / sqrt(t + 1)
    #[value(name = "inverse-sqrt")]
    InverseSqrt,
    /// 1 / (1 + t)
    #[value(name = "inverse")]
    Inverse,
}

impl From<CliSchedule> for LearningRate {
    fn from(s: CliSchedule) -> Self {
        match s {
            CliSchedule::InverseSqrt => LearningRate::InverseSqrt,
            CliSchedule::Inverse => LearningRate::Inverse,
        }
    }
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum CliNorm {
    /// Euclidean norm of the raw channel bytes
    #[value(name = "euclidean")]
    Euclidean,
    /// Plain sum of the raw channel bytes
    #[value(name = "byte-sum")]
    ByteSum,
}

impl From<CliNorm> for NormPolicy {
    fn from(n: CliNorm) -> Self {
        match n {
            CliNorm::Euclidean => NormPolicy::Euclidean,
            CliNorm::ByteSum => NormPolicy::ByteSum,
        }
    }
}

fn main() {
    let cli = Cli::parse();

    let log_level = if cli.debug {
        "debug"
    } else if cli.verbose {
        "info"
    } else {
        "warn"
    };
    env_logger::Builder::from_env(Env::default().default_filter_or(log_level)).init();

    if let Err(e) = run(&cli) {
        error!("Error: {e}");
        process::exit(1);
    }
}

fn run(cli: &Cli) -> Result<()> {
    if cli.input.is_dir() {
        train_command(cli)
    } else if cli.input.is_file() {
        classify_command(cli)
    } else {
        Err(StoreError::InvalidParameter(format!(
            "{} is neither a class directory nor a query file",
            cli.input.display()
        )))
    }
}

fn train_command(cli: &Cli) -> Result<()> {
    info!("scanning class tree {}", cli.input.display());
    let population = ClassPopulation::scan(&cli.input)?;
    let shape = population.common_shape()?;
    let names = population.class_names();
    info!("{} classes, shape {shape}", names.len());

    let store = VectorStore::create(&cli.store, shape, names)?;

    let picker = match cli.seed {
        Some(seed) => DirectoryPicker::with_seed(population, seed),
        None => DirectoryPicker::new(population),
    };
    let config = TrainConfig {
        lambda: cli.lambda,
        steps: cli.steps,
        learning_rate: cli.schedule.into(),
        norm: cli.norm.into(),
    };
    Trainer::with_config(&store, picker, config).run()?;

    println!(
        "Trained store {} ({} classes, {} steps)",
        cli.store.display(),
        store.num_classes(),
        cli.steps
    );
    Ok(())
}

fn classify_command(cli: &Cli) -> Result<()> {
    if !cli.store.is_file() {
        return Err(StoreError::InvalidParameter(format!(
            "store file {} does not exist",
            cli.store.display()
        )));
    }

    let store = VectorStore::open(&cli.store)?;
    let mut query = BmpFile::open(&cli.input)?;
    let verdict = classify(&store, &mut query, cli.norm.into())?;

    let winners: Vec<&str> = verdict
        .winners
        .iter()
        .map(|&c| store.class_names()[c].as_str())
        .collect();
    println!(
        "{} -> {} ({:.1}% confidence, {} of {} pairwise votes)",
        cli.input.display(),
        winners.join(", "),
        verdict.confidence(),
        verdict.max_votes,
        store.num_classes() - 1
    );
    Ok(())
}
