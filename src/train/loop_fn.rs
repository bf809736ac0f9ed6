use std::time::Instant;

use burn::module::AutodiffModule;
use burn::nn::loss::CrossEntropyLossConfig;
use burn::optim::{AdamConfig, GradientsParams, Optimizer};
use burn::tensor::backend::{AutodiffBackend, Backend};
use burn::tensor::{ElementConversion, Int, Tensor};

use crate::dataset::{ImageBatch, ImageDataSet, Split};
use crate::error::DataError;
use crate::model::ImageClassifier;
use crate::train::logs::{BatchLog, EpochLog, Score, TrainEvent};
use crate::train::train_config::{Evaluation, TrainConfig};

/// Result of a `train_loop` run.
pub struct TrainOutcome<M> {
    pub model: M,
    pub epochs_completed: usize,
    /// One entry per completed epoch.
    pub history: Vec<EpochLog>,
    /// True when the run ended through the stop flag or a dropped receiver.
    pub stopped: bool,
}

#[derive(Default)]
struct RunningStats {
    loss_sum: f64,
    correct: usize,
    examples: usize,
    batches: usize,
}

impl RunningStats {
    fn record(&mut self, loss: f64, correct: usize, examples: usize) {
        self.loss_sum += loss;
        self.correct += correct;
        self.examples += examples;
        self.batches += 1;
    }

    fn loss(&self) -> f64 {
        if self.batches == 0 {
            0.0
        } else {
            self.loss_sum / self.batches as f64
        }
    }

    fn acc(&self) -> f64 {
        if self.examples == 0 {
            0.0
        } else {
            self.correct as f64 / self.examples as f64
        }
    }
}

/// Number of rows whose highest logit is at the target class.
pub fn count_correct<B: Backend>(logits: Tensor<B, 2>, targets: Tensor<B, 1, Int>) -> usize {
    let predicted = logits.argmax(1).squeeze_dim::<1>(1);
    predicted
        .equal(targets)
        .int()
        .sum()
        .into_scalar()
        .elem::<i64>() as usize
}

/// Mean cross-entropy and accuracy over `batches`, weighted by batch size.
pub fn evaluate<B, M, I>(model: &M, batches: I, device: &B::Device) -> Score
where
    B: Backend,
    M: ImageClassifier<B>,
    I: IntoIterator<Item = ImageBatch<B>>,
{
    let loss_fn = CrossEntropyLossConfig::new().init(device);
    let mut loss_sum = 0.0;
    let mut correct = 0;
    let mut examples = 0;

    for batch in batches {
        let n = batch.len();
        let logits = model.forward(batch.images);
        correct += count_correct(logits.clone(), batch.targets.clone());
        let loss = loss_fn.forward(logits, batch.targets).into_scalar().elem::<f64>();
        loss_sum += loss * n as f64;
        examples += n;
    }

    if examples == 0 {
        return Score { loss: 0.0, acc: 0.0, examples: 0 };
    }
    Score {
        loss: loss_sum / examples as f64,
        acc: correct as f64 / examples as f64,
        examples,
    }
}

/// Scores `model` on the test split as `evaluation` prescribes.
///
/// `Evaluation::Sample` advances the test cursor, so consecutive calls see
/// different images.
pub fn evaluate_test<B, M>(
    model: &M,
    data: &mut ImageDataSet,
    evaluation: Evaluation,
    batch_size: usize,
    device: &B::Device,
) -> Result<Score, DataError>
where
    B: Backend,
    M: ImageClassifier<B>,
{
    match evaluation {
        Evaluation::Full => {
            let batches = data.chunks::<B>(Split::Test, batch_size, device)?;
            Ok(evaluate(model, batches, device))
        }
        Evaluation::Sample(n) => {
            let batch = data.next_test_batch::<B>(n, device)?;
            Ok(evaluate(model, [batch], device))
        }
    }
}

/// Trains `model` with Adam and cross-entropy for `config.epochs` epochs.
///
/// Every epoch draws `data.batches_per_epoch(batch_size)` training batches from
/// the dataset's shuffled order, then scores the model on the test split.
///
/// # Early termination
/// The loop ends before the next step if:
/// - `config.stop_flag` is set, **or**
/// - the `progress_tx` receiver has been dropped.
///
/// An interrupted epoch produces no `EpochLog`.
pub fn train_loop<B, M>(
    mut model: M,
    data: &mut ImageDataSet,
    config: &TrainConfig,
    device: &B::Device,
) -> Result<TrainOutcome<M>, DataError>
where
    B: AutodiffBackend,
    M: ImageClassifier<B> + AutodiffModule<B>,
    M::InnerModule: ImageClassifier<B::InnerBackend>,
{
    if config.batch_size == 0 {
        return Err(DataError::ZeroBatchSize);
    }

    B::seed(device, config.seed);
    let mut optimizer = AdamConfig::new().init();
    let loss_fn = CrossEntropyLossConfig::new().init(device);
    let steps = data.batches_per_epoch(config.batch_size);
    let log_every = config.batch_log_every.max(1);

    let mut history = Vec::with_capacity(config.epochs);
    let mut stopped = false;

    'epochs: for epoch in 1..=config.epochs {
        let started = Instant::now();
        let mut stats = RunningStats::default();
        log::info!("epoch {}/{}: {} batches of {}", epoch, config.epochs, steps, config.batch_size);

        for step in 0..steps {
            if config.stop_requested() {
                stopped = true;
                break 'epochs;
            }

            let batch = data.next_train_batch::<B>(config.batch_size, device)?;
            let n = batch.len();

            let logits = model.forward(batch.images);
            let correct = count_correct(logits.clone(), batch.targets.clone());
            let loss = loss_fn.forward(logits, batch.targets);
            let loss_value = loss.clone().into_scalar().elem::<f64>();

            let grads = GradientsParams::from_grads(loss.backward(), &model);
            model = optimizer.step(config.learning_rate, model, grads);

            stats.record(loss_value, correct, n);
            let log = BatchLog { epoch, batch: step, loss: loss_value, acc: correct as f64 / n as f64 };
            log::debug!("batch {} loss {:.4} acc {:.4}", step, log.loss, log.acc);

            if step % log_every == 0 && !config.report(TrainEvent::Batch(log)) {
                stopped = true;
                break 'epochs;
            }
        }

        let valid = model.valid();
        let score = evaluate_test::<B::InnerBackend, _>(
            &valid,
            data,
            config.evaluation,
            config.batch_size,
            device,
        )?;

        let log = EpochLog {
            epoch,
            total_epochs: config.epochs,
            loss: stats.loss(),
            acc: stats.acc(),
            val_loss: Some(score.loss),
            val_acc: Some(score.acc),
            elapsed_ms: started.elapsed().as_millis() as u64,
        };
        log::info!(
            "epoch {:>3}/{:<3} | loss: {:.4} | acc: {:.4} | val_loss: {:.4} | val_acc: {:.4} | {} ms",
            epoch,
            config.epochs,
            log.loss,
            log.acc,
            score.loss,
            score.acc,
            log.elapsed_ms
        );

        history.push(log.clone());
        if !config.report(TrainEvent::Epoch(log)) {
            stopped = true;
            break;
        }
    }

    Ok(TrainOutcome {
        model,
        epochs_completed: history.len(),
        history,
        stopped,
    })
}
