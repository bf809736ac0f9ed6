use serde::{Deserialize, Serialize};

use crate::dataset::ImageShape;

/// Metrics of one optimisation step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchLog {
    /// 1-based epoch the step belongs to.
    pub epoch: usize,
    /// 0-based step index within the epoch.
    pub batch: usize,
    pub loss: f64,
    /// Fraction of the batch classified correctly.
    pub acc: f64,
}

/// Metrics of one completed epoch.
///
/// `loss` and `acc` are averaged over the epoch's training batches;
/// `val_loss` / `val_acc` come from the evaluation run at the end of the epoch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EpochLog {
    /// 1-based epoch number.
    pub epoch: usize,
    pub total_epochs: usize,
    pub loss: f64,
    pub acc: f64,
    pub val_loss: Option<f64>,
    pub val_acc: Option<f64>,
    /// Wall-clock duration of the epoch, evaluation included.
    pub elapsed_ms: u64,
}

/// Loss and accuracy of a model on a set of examples.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Score {
    pub loss: f64,
    pub acc: f64,
    pub examples: usize,
}

/// Progress reported by a run, in the order it happens.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum TrainEvent {
    Loaded {
        dataset: String,
        train: usize,
        test: usize,
        shape: ImageShape,
    },
    Summary {
        model: String,
        text: String,
        params: usize,
    },
    Batch(BatchLog),
    Epoch(EpochLog),
    Finished {
        score: Score,
        epochs_completed: usize,
        stopped: bool,
        elapsed_ms: u64,
    },
}

impl TrainEvent {
    /// SSE event name for this kind of event.
    pub fn name(&self) -> &'static str {
        match self {
            TrainEvent::Loaded { .. } => "loaded",
            TrainEvent::Summary { .. } => "summary",
            TrainEvent::Batch(_) => "batch",
            TrainEvent::Epoch(_) => "epoch",
            TrainEvent::Finished { .. } => "finished",
        }
    }
}
