use std::io::Cursor;
use tiny_http::Response;

use ferrite_vision::{Evaluation, Example};

use crate::render::{html_escape, render_page};
use crate::routes::html_response;
use crate::state::{lock, FlashKind, FlashMessage, SharedState, TrainingStatus};

// ---------------------------------------------------------------------------
// GET /
// ---------------------------------------------------------------------------

pub fn handle_get(state: SharedState) -> Response<Cursor<Vec<u8>>> {
    let mut st = lock(&state);
    let flash = st.take_flash();
    let running = st.is_running();
    let settings = st.settings;
    let status = st.training.label();
    let detail = status_detail(&st.training);
    let data_line = st.data_line.clone().unwrap_or_default();
    let summary = st.summary.clone().unwrap_or_default();
    drop(st);

    let options: String = Example::ALL
        .iter()
        .map(|e| {
            format!(
                r#"<option value="{name}"{sel}>{name} ({desc})</option>"#,
                name = e.name(),
                desc = html_escape(e.description()),
                sel = if *e == settings.example { " selected" } else { "" },
            )
        })
        .collect();

    let eval_size = match settings.hyper.evaluation {
        Evaluation::Full => 0,
        Evaluation::Sample(n) => n,
    };
    let disabled = |yes: bool| if yes { "disabled" } else { "" };

    html_response(render_page(running, |tmpl| {
        tmpl.replace("{{FLASH}}", &render_flash_html(flash.as_ref()))
            .replace("{{EXAMPLE_OPTIONS}}", &options)
            .replace("{{EPOCHS}}", &settings.hyper.epochs.to_string())
            .replace("{{BATCH_SIZE}}", &settings.hyper.batch_size.to_string())
            .replace("{{LEARNING_RATE}}", &settings.hyper.learning_rate.to_string())
            .replace("{{BATCH_LOG_EVERY}}", &settings.hyper.batch_log_every.to_string())
            .replace("{{EVAL_SIZE}}", &eval_size.to_string())
            .replace("{{START_DISABLED}}", disabled(running))
            .replace("{{STOP_DISABLED}}", disabled(!running))
            .replace("{{STATUS}}", status)
            .replace("{{STATUS_DETAIL}}", &html_escape(&detail))
            .replace("{{DATA_LINE}}", &html_escape(&data_line))
            .replace("{{SUMMARY}}", &html_escape(&summary))
    }))
}

/// One line describing the current run, shown under the status badge.
pub fn status_detail(training: &TrainingStatus) -> String {
    match training {
        TrainingStatus::Idle => "Pick an example and start training.".into(),
        TrainingStatus::Running { example, total_epochs, .. } => {
            format!("Training {} for {} epoch(s)...", example, total_epochs)
        }
        TrainingStatus::Done { example, artifacts, score, epochs_completed, elapsed_ms, was_stopped } => {
            format!(
                "{} {} after {} epoch(s) in {:.1}s: test loss {:.4}, test accuracy {:.2}%. Saved to {}",
                example,
                if *was_stopped { "stopped" } else { "finished" },
                epochs_completed,
                *elapsed_ms as f64 / 1000.0,
                score.loss,
                score.acc * 100.0,
                artifacts.display()
            )
        }
        TrainingStatus::Failed { reason } => format!("Training failed: {}", reason),
    }
}

pub fn render_flash_html(flash: Option<&FlashMessage>) -> String {
    match flash {
        None => String::new(),
        Some(f) => {
            let cls = match f.kind {
                FlashKind::Success => "flash-success",
                FlashKind::Error => "flash-error",
            };
            format!(r#"<div class="flash {}">{}</div>"#, cls, html_escape(&f.text))
        }
    }
}
