pub mod example;
pub mod run;

pub use example::{Example, Hyperparams, ParseExampleError};
pub use run::{load_dataset, run, run_on, save_artifacts, RunReport};
