use std::io::Cursor;
use tiny_http::{Header, Method, Request, Response, StatusCode};

use crate::handlers;
use crate::state::SharedState;

// ---------------------------------------------------------------------------
// Response helpers
// ---------------------------------------------------------------------------

fn header(name: &str, value: &str) -> Option<Header> {
    Header::from_bytes(name.as_bytes(), value.as_bytes()).ok()
}

fn response(status: u16, headers: Vec<Option<Header>>, body: Vec<u8>) -> Response<Cursor<Vec<u8>>> {
    let len = body.len();
    Response::new(
        StatusCode(status),
        headers.into_iter().flatten().collect(),
        Cursor::new(body),
        Some(len),
        None,
    )
}

pub fn html_response(body: String) -> Response<Cursor<Vec<u8>>> {
    response(200, vec![header("Content-Type", "text/html; charset=utf-8")], body.into_bytes())
}

pub fn json_response(body: String) -> Response<Cursor<Vec<u8>>> {
    response(
        200,
        vec![header("Content-Type", "application/json"), header("Cache-Control", "no-cache")],
        body.into_bytes(),
    )
}

pub fn redirect(location: &str) -> Response<Cursor<Vec<u8>>> {
    response(303, vec![header("Location", location)], Vec::new())
}

pub fn not_found() -> Response<Cursor<Vec<u8>>> {
    response(404, vec![header("Content-Type", "text/plain")], b"404 Not Found".to_vec())
}

// ---------------------------------------------------------------------------
// Request dispatcher
// ---------------------------------------------------------------------------

/// Dispatches incoming requests to the appropriate handler.
///
/// Handlers (except SSE) receive a `&mut Request` so that the dispatcher
/// retains ownership and can call `request.respond(response)` at the end.
/// The SSE handler takes ownership to perform long-lived streaming.
pub fn dispatch(mut request: Request, state: SharedState) {
    let method = request.method().clone();
    let url = request.url().to_owned();
    let path = url.split('?').next().unwrap_or("").to_owned();
    log::debug!("{} {}", method, path);

    // SSE is long-lived; handler takes ownership and drives the stream loop.
    if method == Method::Get && path == "/train/events" {
        handlers::train_sse::handle(request, state);
        return;
    }

    let response = match (method, path.as_str()) {
        (Method::Get, "/") => handlers::home::handle_get(state),

        // ── Train ────────────────────────────────────────────────────────
        (Method::Post, "/train/start") => handlers::train::handle_start(&mut request, state),
        (Method::Post, "/train/stop") => handlers::train::handle_stop(state),

        // ── Charts ───────────────────────────────────────────────────────
        (Method::Get, "/charts/batch") => handlers::charts::handle_batch(state),
        (Method::Get, "/charts/epoch") => handlers::charts::handle_epoch(state),

        _ => not_found(),
    };

    if let Err(e) = request.respond(response) {
        log::warn!("failed to send response for {}: {}", path, e);
    }
}
