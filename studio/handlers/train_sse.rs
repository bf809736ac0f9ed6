use std::thread;
use std::time::{Duration, Instant};
use tiny_http::Request;

use serde_json::json;

use crate::handlers::home::status_detail;
use crate::state::{lock, SharedState};
use crate::util::sse::{format_sse_event, format_sse_keepalive, write_sse, SSE_HEAD};

const POLL: Duration = Duration::from_millis(250);
const KEEPALIVE: Duration = Duration::from_secs(5);

/// `GET /train/events`: Server-Sent Events handler.
///
/// This handler consumes `request` (takes ownership so we can call
/// `into_writer`) and drives a long-lived loop that:
/// 1. Replays every frame of the current run recorded so far.
/// 2. Polls the state every 250 ms and forwards new frames.
/// 3. Writes a `: ping` comment when nothing was sent for a while.
/// 4. Once the run is over and every frame is out, writes a `done` event with
///    the final status and closes.
///
/// A new run started while streaming restarts the replay after a `reset`
/// event.
pub fn handle(request: Request, state: SharedState) {
    let mut writer = request.into_writer();
    if !write_sse(&mut writer, SSE_HEAD) {
        return;
    }

    let mut run_id = lock(&state).run_id;
    let mut cursor = 0;
    let mut last_write = Instant::now();

    loop {
        let (pending, finished) = {
            let st = lock(&state);
            if st.run_id != run_id {
                run_id = st.run_id;
                cursor = 0;
                drop(st);
                if !write_sse(&mut writer, &format_sse_event("reset", "{}")) {
                    return;
                }
                continue;
            }

            let pending: Vec<String> = st.frames[cursor.min(st.frames.len())..].to_vec();
            let finished = if st.is_running() {
                None
            } else {
                let payload = json!({
                    "status": st.training.label(),
                    "detail": status_detail(&st.training),
                });
                Some(format_sse_event("done", &payload.to_string()))
            };
            (pending, finished)
        };

        cursor += pending.len();
        for frame in &pending {
            if !write_sse(&mut writer, frame) {
                return;
            }
        }
        if !pending.is_empty() {
            last_write = Instant::now();
        }

        if let Some(done) = finished {
            let _ = write_sse(&mut writer, &done);
            return;
        }

        if last_write.elapsed() >= KEEPALIVE {
            if !write_sse(&mut writer, format_sse_keepalive()) {
                return;
            }
            last_write = Instant::now();
        }
        thread::sleep(POLL);
    }
}
