use axum::{response::IntoResponse, response::Response, Json};
use testpulse::{ActiveTestReporter, ReportError};

pub mod health;

pub use active_tests::get_active_tests;
pub use health::health;

pub struct AppState {
    pub reporter: ActiveTestReporter,
    pub start_time: std::time::Instant,
}

impl AppState {
    pub fn new(reporter: ActiveTestReporter) -> Self {
        Self {
            reporter,
            start_time: std::time::Instant::now(),
        }
    }
}

/// `{"message": ...}` body with the status the error maps to.
pub(crate) fn report_error_to_response(err: ReportError) -> Response {
    let status = err.status_code();
    if status.is_server_error() {
        tracing::error!("active tests request failed: {}", err);
    }
    (
        status,
        Json(serde_json::json!({ "message": err.to_string() })),
    )
        .into_response()
}
