use std::path::PathBuf;
use std::sync::{atomic::AtomicBool, Arc, Mutex, MutexGuard};

use serde_json::json;

use ferrite_vision::{ChartKind, ChartLog, Example, Hyperparams, LabConfig, Score, TrainEvent};

use crate::util::sse::format_sse_event;

// ---------------------------------------------------------------------------
// Run settings
// ---------------------------------------------------------------------------

/// Experiment and hyperparameters the next run starts with.
#[derive(Debug, Clone, Copy)]
pub struct RunSettings {
    pub example: Example,
    pub hyper: Hyperparams,
}

impl RunSettings {
    pub fn for_example(example: Example) -> Self {
        RunSettings { example, hyper: example.defaults() }
    }
}

// ---------------------------------------------------------------------------
// Training status
// ---------------------------------------------------------------------------

pub enum TrainingStatus {
    /// No training has been started yet.
    Idle,
    /// A run is loading data or training in a background thread.
    Running {
        example: Example,
        stop_flag: Arc<AtomicBool>,
        total_epochs: usize,
    },
    /// The run finished, naturally or via Stop, and the model was saved.
    Done {
        example: Example,
        artifacts: PathBuf,
        score: Score,
        epochs_completed: usize,
        elapsed_ms: u64,
        was_stopped: bool,
    },
    Failed {
        reason: String,
    },
}

impl TrainingStatus {
    pub fn label(&self) -> &'static str {
        match self {
            TrainingStatus::Idle => "idle",
            TrainingStatus::Running { .. } => "running",
            TrainingStatus::Done { was_stopped: true, .. } => "stopped",
            TrainingStatus::Done { .. } => "done",
            TrainingStatus::Failed { .. } => "failed",
        }
    }
}

// ---------------------------------------------------------------------------
// Flash messages
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub enum FlashKind {
    Success,
    Error,
}

#[derive(Debug, Clone)]
pub struct FlashMessage {
    pub kind: FlashKind,
    pub text: String,
}

impl FlashMessage {
    pub fn success(text: impl Into<String>) -> Self {
        FlashMessage { kind: FlashKind::Success, text: text.into() }
    }
    pub fn error(text: impl Into<String>) -> Self {
        FlashMessage { kind: FlashKind::Error, text: text.into() }
    }
}

// ---------------------------------------------------------------------------
// Main state struct
// ---------------------------------------------------------------------------

pub struct StudioState {
    pub lab: LabConfig,
    pub settings: RunSettings,
    /// Current training lifecycle state.
    pub training: TrainingStatus,
    /// Incremented by every start; lets SSE streams notice a new run.
    pub run_id: u64,
    pub batch_chart: ChartLog,
    pub epoch_chart: ChartLog,
    /// SSE frames of the current run, replayed to every new subscriber.
    pub frames: Vec<String>,
    /// `"<dataset>: <train> train / <test> test, <shape>"` once data is loaded.
    pub data_line: Option<String>,
    /// Model summary of the current run.
    pub summary: Option<String>,
    /// One-shot flash message for the next page render.
    pub flash: Option<FlashMessage>,
}

impl StudioState {
    pub fn new(lab: LabConfig) -> Self {
        StudioState {
            lab,
            settings: RunSettings::for_example(Example::MnistCnn),
            training: TrainingStatus::Idle,
            run_id: 0,
            batch_chart: ChartLog::new(ChartKind::Batch),
            epoch_chart: ChartLog::new(ChartKind::Epoch),
            frames: Vec::new(),
            data_line: None,
            summary: None,
            flash: None,
        }
    }

    pub fn is_running(&self) -> bool {
        matches!(self.training, TrainingStatus::Running { .. })
    }

    /// Clears everything the previous run left behind.
    pub fn begin_run(&mut self) {
        self.run_id += 1;
        self.batch_chart.clear();
        self.epoch_chart.clear();
        self.frames.clear();
        self.data_line = None;
        self.summary = None;
    }

    /// Applies a training event to the charts and queues its SSE frame.
    ///
    /// Batch and epoch frames carry the raw log plus only the new chart point;
    /// the page appends it to the series it loaded from `/charts/*`.
    pub fn record(&mut self, event: &TrainEvent) {
        let payload = match event {
            TrainEvent::Batch(log) => json!({ "log": log, "point": self.batch_chart.push(log) }),
            TrainEvent::Epoch(log) => json!({ "log": log, "point": self.epoch_chart.push(log) }),
            TrainEvent::Loaded { dataset, train, test, shape } => {
                self.data_line = Some(format!("{}: {} train / {} test, {}", dataset, train, test, shape));
                json!(event)
            }
            TrainEvent::Summary { text, .. } => {
                self.summary = Some(text.clone());
                json!(event)
            }
            TrainEvent::Finished { .. } => json!(event),
        };
        self.frames.push(format_sse_event(event.name(), &payload.to_string()));
    }

    /// Takes and returns the current flash message, clearing it.
    pub fn take_flash(&mut self) -> Option<FlashMessage> {
        self.flash.take()
    }
}

/// Shared state type: an `Arc<Mutex<StudioState>>` passed to every handler.
pub type SharedState = Arc<Mutex<StudioState>>;

/// Locks the state; a panic in another handler does not make it unusable.
pub fn lock(state: &SharedState) -> MutexGuard<'_, StudioState> {
    state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ferrite_vision::{BatchLog, EpochLog};

    #[test]
    fn record_updates_charts_and_frames() {
        let mut st = StudioState::new(LabConfig::default());
        st.begin_run();
        st.record(&TrainEvent::Summary { model: "mnist-cnn".into(), text: "Cnn".into(), params: 10 });
        st.record(&TrainEvent::Batch(BatchLog { epoch: 1, batch: 0, loss: 2.3, acc: 0.1 }));
        st.record(&TrainEvent::Epoch(EpochLog {
            epoch: 1,
            total_epochs: 1,
            loss: 2.0,
            acc: 0.2,
            val_loss: Some(1.9),
            val_acc: Some(0.3),
            elapsed_ms: 5,
        }));

        assert_eq!(st.summary.as_deref(), Some("Cnn"));
        assert_eq!(st.batch_chart.len(), 1);
        assert_eq!(st.epoch_chart.len(), 1);
        assert_eq!(st.frames.len(), 3);
        assert!(st.frames[1].starts_with("event: batch\ndata: "));
        assert!(st.frames[1].contains("\"point\":{\"index\":0,"));

        let first_run = st.run_id;
        st.begin_run();
        assert_eq!(st.run_id, first_run + 1);
        assert!(st.frames.is_empty() && st.batch_chart.is_empty() && st.summary.is_none());
    }

    #[test]
    fn batch_frames_stay_small_as_the_run_grows() {
        let mut st = StudioState::new(LabConfig::default());
        st.begin_run();
        for batch in 0..2000 {
            st.record(&TrainEvent::Batch(BatchLog { epoch: 1, batch, loss: 0.123456, acc: 0.654321 }));
        }

        let first = st.frames[0].len();
        let last = st.frames[1999].len();
        assert_eq!(st.batch_chart.len(), 2000);
        assert!(last <= first + 8, "first frame {} bytes, last {} bytes", first, last);
        assert!(st.frames[1999].contains("\"index\":1999"));
    }
}
