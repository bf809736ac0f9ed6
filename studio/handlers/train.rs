use std::fmt::Display;
use std::io::Cursor;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc};
use std::thread;
use tiny_http::{Request, Response};

use ferrite_vision::experiment;
use ferrite_vision::{Evaluation, Example, Hyperparams, TrainEvent};

use crate::routes::redirect;
use crate::state::{lock, FlashMessage, RunSettings, SharedState, TrainingStatus};
use crate::util::form::{form_get, form_parse, parse_form};

// ---------------------------------------------------------------------------
// POST /train/start
// ---------------------------------------------------------------------------

pub fn handle_start(request: &mut Request, state: SharedState) -> Response<Cursor<Vec<u8>>> {
    let mut body = String::new();
    let _ = request.as_reader().read_to_string(&mut body);
    let pairs = parse_form(&body);

    let settings = match parse_settings(&pairs) {
        Ok(settings) => settings,
        Err(reason) => {
            lock(&state).flash = Some(FlashMessage::error(reason));
            return redirect("/");
        }
    };

    let mut st = lock(&state);
    // If already running, don't start another.
    if st.is_running() {
        st.flash = Some(FlashMessage::error("A run is already in progress."));
        return redirect("/");
    }

    let (tx, rx) = mpsc::channel::<TrainEvent>();
    let stop_flag = Arc::new(AtomicBool::new(false));
    let lab = st.lab.clone();

    st.settings = settings;
    st.begin_run();
    st.training = TrainingStatus::Running {
        example: settings.example,
        stop_flag: stop_flag.clone(),
        total_epochs: settings.hyper.epochs,
    };
    st.flash = Some(FlashMessage::success(format!("Started {}.", settings.example)));
    drop(st);
    log::info!("starting {} with {:?}", settings.example, settings.hyper);

    // Pumps events into the shared state until the run drops its sender.
    let recorder_state = state.clone();
    let recorder = thread::spawn(move || {
        for event in rx {
            lock(&recorder_state).record(&event);
        }
    });

    thread::spawn(move || {
        let run_flag = stop_flag.clone();
        let result = supervise(move || {
            experiment::run(settings.example, &settings.hyper, &lab, Some(tx), Some(run_flag))
        });
        if recorder.join().is_err() {
            log::warn!("event recorder thread panicked");
        }

        let mut st = lock(&state);
        st.training = match result {
            Ok(report) => TrainingStatus::Done {
                example: report.example,
                artifacts: report.artifacts,
                score: report.score,
                epochs_completed: report.epochs_completed,
                elapsed_ms: report.elapsed_ms,
                was_stopped: report.stopped || stop_flag.load(Ordering::Relaxed),
            },
            Err(reason) => {
                log::error!("{} failed: {}", settings.example, reason);
                TrainingStatus::Failed { reason }
            }
        };
    });

    redirect("/")
}

/// Runs `job`, turning both its error and a panic into a failure message so
/// the studio never stays stuck in `Running`.
pub fn supervise<T, E, F>(job: F) -> Result<T, String>
where
    E: Display,
    F: FnOnce() -> Result<T, E>,
{
    match panic::catch_unwind(AssertUnwindSafe(job)) {
        Ok(result) => result.map_err(|e| e.to_string()),
        Err(payload) => {
            let message = payload
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unknown panic".to_string());
            Err(format!("training panicked: {}", message))
        }
    }
}

/// Reads the experiment and hyperparameters from the start form. Blank fields
/// keep the example's defaults.
pub fn parse_settings(pairs: &[(String, String)]) -> Result<RunSettings, String> {
    let example: Example = form_get(pairs, "example")
        .unwrap_or("")
        .parse()
        .map_err(|e| format!("{}", e))?;
    let defaults = example.defaults();

    let epochs = form_parse(pairs, "epochs")?.unwrap_or(defaults.epochs);
    let batch_size = form_parse(pairs, "batch_size")?.unwrap_or(defaults.batch_size);
    let learning_rate = form_parse(pairs, "learning_rate")?.unwrap_or(defaults.learning_rate);
    let batch_log_every = form_parse(pairs, "batch_log_every")?.unwrap_or(defaults.batch_log_every);
    let evaluation = match form_parse::<usize>(pairs, "eval_size")? {
        None => defaults.evaluation,
        Some(0) => Evaluation::Full,
        Some(n) => Evaluation::Sample(n),
    };

    if epochs == 0 || batch_size == 0 || batch_log_every == 0 {
        return Err("Epochs, batch size and chart interval must be at least 1.".into());
    }
    if !(learning_rate > 0.0 && learning_rate.is_finite()) {
        return Err("Learning rate must be a positive number.".into());
    }

    Ok(RunSettings {
        example,
        hyper: Hyperparams { epochs, batch_size, learning_rate, batch_log_every, evaluation },
    })
}

// ---------------------------------------------------------------------------
// POST /train/stop
// ---------------------------------------------------------------------------

pub fn handle_stop(state: SharedState) -> Response<Cursor<Vec<u8>>> {
    let mut st = lock(&state);
    let stopping = match &st.training {
        TrainingStatus::Running { stop_flag, example, .. } => {
            stop_flag.store(true, Ordering::Relaxed);
            Some(*example)
        }
        _ => None,
    };
    if let Some(example) = stopping {
        log::info!("stop requested for {}", example);
        st.flash = Some(FlashMessage::success(format!("Stopping {} after the current batch.", example)));
    }
    drop(st);
    redirect("/")
}
