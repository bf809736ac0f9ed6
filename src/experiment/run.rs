use std::fmt::Display;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::AtomicBool;
use std::sync::{mpsc, Arc};
use std::time::Instant;

use burn::module::{AutodiffModule, Module};
use burn::record::{DefaultFileRecorder, FullPrecisionSettings};
use burn::tensor::backend::Backend;
use serde::Serialize;

use crate::backend::{default_device, Device, InnerBackend, TrainBackend};
use crate::config::LabConfig;
use crate::dataset::{Cifar10, ImageDataSet, ImageSource, Mnist};
use crate::error::LabError;
use crate::experiment::example::{Example, Hyperparams};
use crate::model::{CnnConfig, ImageClassifier, MlpConfig, ResNetConfig};
use crate::train::{evaluate_test, train_loop, EpochLog, Score, TrainConfig, TrainEvent};

/// What a finished (or stopped) run produced.
#[derive(Debug, Clone)]
pub struct RunReport {
    pub example: Example,
    /// Score on the evaluation data after the last completed step.
    pub score: Score,
    pub epochs_completed: usize,
    pub stopped: bool,
    pub history: Vec<EpochLog>,
    /// Directory holding `model.mpk` and `labels.json`.
    pub artifacts: PathBuf,
    pub elapsed_ms: u64,
}

#[derive(Serialize)]
struct LabelsFile<'a> {
    example: &'a str,
    dataset: &'a str,
    classes: &'a [String],
}

/// Reads the dataset `example` trains on from `lab.data_dir`.
pub fn load_dataset(example: Example, lab: &LabConfig) -> Result<ImageDataSet, LabError> {
    let dir = lab.dataset_dir(example.dataset());
    let data = match example {
        Example::MnistMlp | Example::MnistCnn => Mnist::load(&dir, lab.seed)?,
        Example::Cifar10Cnn | Example::Cifar10Resnet => Cifar10::load(&dir, lab.seed)?,
    };
    Ok(data)
}

/// Loads the data, trains the experiment's model and saves the result.
///
/// Progress goes to `progress_tx` as `TrainEvent`s and to the log. Setting
/// `stop_flag` ends training early; the partly trained model is still scored
/// and saved.
pub fn run(
    example: Example,
    hyper: &Hyperparams,
    lab: &LabConfig,
    progress_tx: Option<mpsc::Sender<TrainEvent>>,
    stop_flag: Option<Arc<AtomicBool>>,
) -> Result<RunReport, LabError> {
    let started = Instant::now();
    let mut data = load_dataset(example, lab)?;

    let mut config = hyper.train_config(lab.seed);
    config.progress_tx = progress_tx;
    config.stop_flag = stop_flag;

    run_on(example, &mut data, config, lab, started)
}

/// `run` on an already loaded dataset.
pub fn run_on(
    example: Example,
    data: &mut ImageDataSet,
    config: TrainConfig,
    lab: &LabConfig,
    started: Instant,
) -> Result<RunReport, LabError> {
    let shape = data.shape();
    log::info!(
        "{}: train {} x {}, test {} x {}",
        example,
        data.train_len(),
        shape,
        data.test_len(),
        shape
    );
    config.report(TrainEvent::Loaded {
        dataset: data.name().to_string(),
        train: data.train_len(),
        test: data.test_len(),
        shape,
    });

    let device = default_device();
    TrainBackend::seed(&device, config.seed);
    let classes = data.num_classes();

    match example {
        Example::MnistMlp => {
            let model = MlpConfig::new(shape.pixels(), vec![512, 512], classes).init(&device);
            run_with(example, model, data, config, lab, &device, started)
        }
        Example::MnistCnn => {
            let config_cnn = CnnConfig { input: shape, num_classes: classes, ..CnnConfig::mnist() };
            config_cnn.check()?;
            let model = config_cnn.init(&device);
            run_with(example, model, data, config, lab, &device, started)
        }
        Example::Cifar10Cnn => {
            let config_cnn = CnnConfig { input: shape, num_classes: classes, ..CnnConfig::cifar10() };
            config_cnn.check()?;
            let model = config_cnn.init(&device);
            run_with(example, model, data, config, lab, &device, started)
        }
        Example::Cifar10Resnet => {
            let model = ResNetConfig::resnet50(shape.channels, classes).init(&device);
            run_with(example, model, data, config, lab, &device, started)
        }
    }
}

fn run_with<M>(
    example: Example,
    model: M,
    data: &mut ImageDataSet,
    config: TrainConfig,
    lab: &LabConfig,
    device: &Device,
    started: Instant,
) -> Result<RunReport, LabError>
where
    M: ImageClassifier<TrainBackend> + AutodiffModule<TrainBackend> + Display,
    M::InnerModule: ImageClassifier<InnerBackend>,
{
    let summary = model.summary();
    log::info!("{} model:\n{}", example, summary);
    config.report(TrainEvent::Summary {
        model: example.name().to_string(),
        text: summary,
        params: model.num_params(),
    });

    let outcome = train_loop(model, data, &config, device)?;
    if outcome.stopped {
        log::warn!("{} stopped after {} epoch(s)", example, outcome.epochs_completed);
    }

    let trained = outcome.model.valid();
    let score = evaluate_test::<InnerBackend, _>(
        &trained,
        data,
        config.evaluation,
        config.batch_size,
        device,
    )?;
    log::info!(
        "{} final score: loss {:.4}, accuracy {:.4} on {} test images",
        example,
        score.loss,
        score.acc,
        score.examples
    );

    let artifacts = lab.artifacts_dir.join(example.name());
    save_artifacts::<InnerBackend, _>(example, trained, data.class_names(), &artifacts)?;

    let elapsed_ms = started.elapsed().as_millis() as u64;
    config.report(TrainEvent::Finished {
        score,
        epochs_completed: outcome.epochs_completed,
        stopped: outcome.stopped,
        elapsed_ms,
    });

    Ok(RunReport {
        example,
        score,
        epochs_completed: outcome.epochs_completed,
        stopped: outcome.stopped,
        history: outcome.history,
        artifacts,
        elapsed_ms,
    })
}

/// Writes `model.mpk` (full precision record) and `labels.json` into `dir`.
pub fn save_artifacts<B, M>(
    example: Example,
    model: M,
    class_names: &[String],
    dir: &Path,
) -> Result<(), LabError>
where
    B: Backend,
    M: Module<B>,
{
    fs::create_dir_all(dir).map_err(|source| LabError::Io { path: dir.to_path_buf(), source })?;

    let record_path = dir.join("model");
    model
        .save_file(record_path.clone(), &DefaultFileRecorder::<FullPrecisionSettings>::new())
        .map_err(|e| LabError::Record { path: record_path.clone(), reason: format!("{:?}", e) })?;

    let labels_path = dir.join("labels.json");
    let labels = LabelsFile {
        example: example.name(),
        dataset: example.dataset(),
        classes: class_names,
    };
    let json = serde_json::to_string_pretty(&labels)
        .map_err(|e| LabError::Record { path: labels_path.clone(), reason: e.to_string() })?;
    fs::write(&labels_path, json).map_err(|source| LabError::Io { path: labels_path.clone(), source })?;

    log::info!("saved {} to '{}'", example, dir.display());
    Ok(())
}
