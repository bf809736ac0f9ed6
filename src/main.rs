use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;

use ferrite_vision::experiment::{self, Example};
use ferrite_vision::{Evaluation, LabConfig};

/// Trains one of the built-in experiments and saves the model record.
///
/// Datasets are read from `<data-dir>/mnist` and `<data-dir>/cifar10`;
/// verbosity follows `RUST_LOG` (default `info`).
#[derive(Parser, Debug)]
#[command(name = "ferrite-vision", about = "Train image classifiers on MNIST / CIFAR-10")]
struct Args {
    /// mnist-mlp, mnist-cnn, cifar10-cnn or cifar10-resnet
    example: Example,

    /// JSON file with data_dir / artifacts_dir / bind / seed
    #[arg(long)]
    config: Option<PathBuf>,

    #[arg(long)]
    data_dir: Option<PathBuf>,

    #[arg(long)]
    artifacts_dir: Option<PathBuf>,

    #[arg(long)]
    seed: Option<u64>,

    #[arg(long)]
    epochs: Option<usize>,

    #[arg(long)]
    batch_size: Option<usize>,

    #[arg(long)]
    learning_rate: Option<f64>,

    /// Log a batch point every N steps
    #[arg(long)]
    batch_log_every: Option<usize>,

    /// Score on this many test images per epoch instead of the experiment default
    /// (0 = whole test set)
    #[arg(long)]
    eval_size: Option<usize>,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let mut lab = LabConfig::load_or_default(args.config.as_deref())
        .context("failed to read configuration")?;
    if let Some(dir) = args.data_dir {
        lab.data_dir = dir;
    }
    if let Some(dir) = args.artifacts_dir {
        lab.artifacts_dir = dir;
    }
    if let Some(seed) = args.seed {
        lab.seed = seed;
    }

    let mut hyper = args.example.defaults();
    if let Some(epochs) = args.epochs {
        hyper.epochs = epochs;
    }
    if let Some(batch_size) = args.batch_size {
        hyper.batch_size = batch_size;
    }
    if let Some(lr) = args.learning_rate {
        hyper.learning_rate = lr;
    }
    if let Some(every) = args.batch_log_every {
        hyper.batch_log_every = every;
    }
    match args.eval_size {
        Some(0) => hyper.evaluation = Evaluation::Full,
        Some(n) => hyper.evaluation = Evaluation::Sample(n),
        None => {}
    }

    log::info!("{} ({}): {:?}", args.example, args.example.description(), hyper);
    let report = experiment::run(args.example, &hyper, &lab, None, None)
        .with_context(|| format!("{} failed", args.example))?;

    log::info!(
        "done in {:.1}s: {} epoch(s), test loss {:.4}, test accuracy {:.2}%, saved to '{}'",
        report.elapsed_ms as f64 / 1000.0,
        report.epochs_completed,
        report.score.loss,
        report.score.acc * 100.0,
        report.artifacts.display()
    );
    Ok(())
}
