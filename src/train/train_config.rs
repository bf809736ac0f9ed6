use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc};

use serde::{Deserialize, Serialize};

use crate::train::logs::TrainEvent;

/// What the model is scored on at the end of each epoch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Evaluation {
    /// Every test image, in chunks of the training batch size.
    Full,
    /// The next `n` images of the shuffled test order.
    Sample(usize),
}

/// Configuration for a `train_loop` run.
///
/// # Fields
/// - `epochs`         : total number of passes over the training split
/// - `batch_size`     : images per optimisation step
/// - `learning_rate`  : Adam step size
/// - `batch_log_every`: emit a `TrainEvent::Batch` every this many steps
/// - `evaluation`     : test data used for `val_loss` / `val_acc`
/// - `seed`           : backend seed applied before the first step (dropout)
/// - `progress_tx`    : optional channel; if the receiver is dropped the loop
///                      terminates early
/// - `stop_flag`      : optional atomic flag; when set from another thread the
///                      loop terminates after the current step
pub struct TrainConfig {
    pub epochs: usize,
    pub batch_size: usize,
    pub learning_rate: f64,
    pub batch_log_every: usize,
    pub evaluation: Evaluation,
    pub seed: u64,
    pub progress_tx: Option<mpsc::Sender<TrainEvent>>,
    pub stop_flag: Option<Arc<AtomicBool>>,
}

impl TrainConfig {
    /// Adam at 1e-3, every batch logged, full test set evaluation, seed 42, no
    /// channel and no stop flag.
    pub fn new(epochs: usize, batch_size: usize) -> Self {
        TrainConfig {
            epochs,
            batch_size,
            learning_rate: 1e-3,
            batch_log_every: 1,
            evaluation: Evaluation::Full,
            seed: 42,
            progress_tx: None,
            stop_flag: None,
        }
    }

    pub fn stop_requested(&self) -> bool {
        self.stop_flag
            .as_ref()
            .map(|flag| flag.load(Ordering::Relaxed))
            .unwrap_or(false)
    }

    /// Forwards an event to the progress channel. Returns `false` once the
    /// receiver is gone.
    pub fn report(&self, event: TrainEvent) -> bool {
        match &self.progress_tx {
            Some(tx) => tx.send(event).is_ok(),
            None => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::train::logs::BatchLog;

    fn batch_event() -> TrainEvent {
        TrainEvent::Batch(BatchLog { epoch: 1, batch: 0, loss: 1.0, acc: 0.0 })
    }

    #[test]
    fn report_without_channel_always_succeeds() {
        let config = TrainConfig::new(1, 8);
        assert!(config.report(batch_event()));
        assert!(!config.stop_requested());
    }

    #[test]
    fn report_fails_once_receiver_is_dropped() {
        let (tx, rx) = mpsc::channel();
        let mut config = TrainConfig::new(1, 8);
        config.progress_tx = Some(tx);
        assert!(config.report(batch_event()));
        assert_eq!(rx.try_recv().unwrap().name(), "batch");
        drop(rx);
        assert!(!config.report(batch_event()));
    }

    #[test]
    fn stop_flag_is_observed() {
        let flag = Arc::new(AtomicBool::new(false));
        let mut config = TrainConfig::new(1, 8);
        config.stop_flag = Some(flag.clone());
        assert!(!config.stop_requested());
        flag.store(true, Ordering::Relaxed);
        assert!(config.stop_requested());
    }

    #[test]
    fn evaluation_serializes_in_snake_case() {
        let json = serde_json::to_string(&Evaluation::Sample(2000)).unwrap();
        assert_eq!(json, r#"{"sample":2000}"#);
        let full: Evaluation = serde_json::from_str(r#""full""#).unwrap();
        assert_eq!(full, Evaluation::Full);
    }
}
