pub mod logs;
pub mod loop_fn;
pub mod train_config;

pub use logs::{BatchLog, EpochLog, Score, TrainEvent};
pub use loop_fn::{count_correct, evaluate, evaluate_test, train_loop, TrainOutcome};
pub use train_config::{Evaluation, TrainConfig};
