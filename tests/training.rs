use std::sync::atomic::AtomicBool;
use std::sync::{mpsc, Arc};
use std::time::Instant;

use burn::backend::{Autodiff, NdArray};

use ferrite_vision::experiment::{run_on, Example};
use ferrite_vision::train::evaluate_test;
use ferrite_vision::{
    Evaluation, ImageDataSet, ImageShape, ImageSplit, LabConfig, MlpConfig, TrainConfig, TrainEvent,
    train_loop,
};

type Inner = NdArray<f32>;
type Train = Autodiff<Inner>;

const SHAPE: ImageShape = ImageShape::new(8, 8, 1);

/// Dark images are class 0, bright images class 1.
fn split(count: usize, offset: usize) -> ImageSplit {
    let mut pixels = Vec::with_capacity(count * SHAPE.pixels());
    let mut labels = Vec::with_capacity(count);
    for i in 0..count {
        let label = ((i + offset) % 2) as u8;
        let base: u8 = if label == 0 { 10 } else { 220 };
        pixels.extend((0..SHAPE.pixels()).map(|p| base + (p % 20) as u8));
        labels.push(label);
    }
    ImageSplit::new(SHAPE, pixels, labels).unwrap()
}

fn dataset() -> ImageDataSet {
    ImageDataSet::new(
        "synthetic",
        vec!["dark".to_string(), "bright".to_string()],
        split(16, 0),
        split(6, 1),
        7,
    )
    .unwrap()
}

fn tiny_mlp(device: &<Train as burn::tensor::backend::Backend>::Device) -> ferrite_vision::Mlp<Train> {
    MlpConfig::new(SHAPE.pixels(), vec![16], 2).with_dropout(0.0).init(device)
}

#[test]
fn training_reports_batches_and_epochs() {
    let device = Default::default();
    let mut data = dataset();
    let (tx, rx) = mpsc::channel();

    let mut config = TrainConfig::new(2, 4);
    config.batch_log_every = 2;
    config.progress_tx = Some(tx);

    let outcome = train_loop(tiny_mlp(&device), &mut data, &config, &device).unwrap();
    drop(config);

    let events: Vec<TrainEvent> = rx.iter().collect();
    let batches = events.iter().filter(|e| matches!(e, TrainEvent::Batch(_))).count();
    let epochs = events.iter().filter(|e| matches!(e, TrainEvent::Epoch(_))).count();

    // 16 images / 4 per batch = 4 steps per epoch, every second one reported.
    assert_eq!(batches, 4);
    assert_eq!(epochs, 2);
    assert_eq!(outcome.epochs_completed, 2);
    assert!(!outcome.stopped);

    let last = outcome.history.last().unwrap();
    assert_eq!((last.epoch, last.total_epochs), (2, 2));
    assert!(last.loss.is_finite());
    assert!(last.val_acc.is_some() && last.val_loss.is_some());
}

#[test]
fn separable_data_is_learned() {
    let device = Default::default();
    let mut data = dataset();

    let mut config = TrainConfig::new(15, 4);
    config.learning_rate = 1e-2;

    let outcome = train_loop(tiny_mlp(&device), &mut data, &config, &device).unwrap();
    let last = outcome.history.last().unwrap();
    assert!(last.val_acc.unwrap() >= 0.99, "val_acc {:?}", last.val_acc);
    assert!(last.loss < outcome.history[0].loss);
}

#[test]
fn stop_flag_ends_training_before_the_first_step() {
    let device = Default::default();
    let mut data = dataset();
    let (tx, rx) = mpsc::channel();

    let mut config = TrainConfig::new(3, 4);
    config.progress_tx = Some(tx);
    config.stop_flag = Some(Arc::new(AtomicBool::new(true)));

    let outcome = train_loop(tiny_mlp(&device), &mut data, &config, &device).unwrap();
    drop(config);

    assert!(outcome.stopped);
    assert_eq!(outcome.epochs_completed, 0);
    assert!(outcome.history.is_empty());
    assert_eq!(rx.iter().count(), 0);
}

#[test]
fn dropped_receiver_ends_training() {
    let device = Default::default();
    let mut data = dataset();
    let (tx, rx) = mpsc::channel();
    drop(rx);

    let mut config = TrainConfig::new(3, 4);
    config.progress_tx = Some(tx);

    let outcome = train_loop(tiny_mlp(&device), &mut data, &config, &device).unwrap();
    assert!(outcome.stopped);
    assert_eq!(outcome.epochs_completed, 0);
}

#[test]
fn zero_batch_size_is_an_error() {
    let device = Default::default();
    let mut data = dataset();
    let config = TrainConfig::new(1, 0);
    assert!(train_loop(tiny_mlp(&device), &mut data, &config, &device).is_err());
}

#[test]
fn evaluation_covers_full_set_or_sample() {
    let device = Default::default();
    let mut data = dataset();
    let model = MlpConfig::new(SHAPE.pixels(), vec![8], 2).init::<Inner>(&device);

    let full = evaluate_test::<Inner, _>(&model, &mut data, Evaluation::Full, 4, &device).unwrap();
    assert_eq!(full.examples, 6);
    assert!((0.0..=1.0).contains(&full.acc));

    let sample = evaluate_test::<Inner, _>(&model, &mut data, Evaluation::Sample(3), 4, &device).unwrap();
    assert_eq!(sample.examples, 3);
}

#[test]
fn experiment_run_reports_in_order_and_saves_artifacts() {
    let dir = std::env::temp_dir().join(format!("ferrite_vision_run_{}", std::process::id()));
    let lab = LabConfig { artifacts_dir: dir.clone(), ..LabConfig::default() };
    let mut data = dataset();
    let (tx, rx) = mpsc::channel();

    let mut hyper = Example::MnistMlp.defaults();
    hyper.epochs = 1;
    hyper.batch_size = 8;
    hyper.batch_log_every = 1;
    let mut config = hyper.train_config(lab.seed);
    config.progress_tx = Some(tx);

    let report = run_on(Example::MnistMlp, &mut data, config, &lab, Instant::now()).unwrap();
    let names: Vec<&str> = rx.iter().map(|e| e.name()).collect();

    assert_eq!(names, ["loaded", "summary", "batch", "batch", "epoch", "finished"]);
    assert_eq!(report.epochs_completed, 1);
    assert_eq!(report.score.examples, 6);
    assert!(report.artifacts.join("model.mpk").is_file());

    let labels: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(report.artifacts.join("labels.json")).unwrap()).unwrap();
    assert_eq!(labels["classes"], serde_json::json!(["dark", "bright"]));
    assert_eq!(labels["example"], "mnist-mlp");

    std::fs::remove_dir_all(&dir).ok();
}
