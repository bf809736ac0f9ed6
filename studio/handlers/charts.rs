use std::io::Cursor;
use tiny_http::Response;

use crate::routes::json_response;
use crate::state::{lock, SharedState};

/// `GET /charts/batch` returns the full ECharts option of the batch chart, data included.
pub fn handle_batch(state: SharedState) -> Response<Cursor<Vec<u8>>> {
    let option = lock(&state).batch_chart.snapshot();
    json_response(option.to_string())
}

/// `GET /charts/epoch`
pub fn handle_epoch(state: SharedState) -> Response<Cursor<Vec<u8>>> {
    let option = lock(&state).epoch_chart.snapshot();
    json_response(option.to_string())
}
