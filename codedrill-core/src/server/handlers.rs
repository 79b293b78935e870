//! Route handlers.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use tracing::error;

use crate::catalog::Lesson;
use crate::error::ExecError;
use crate::server::AppState;
use crate::telemetry::ExecutionMetric;
use crate::trainer::Submission;
use crate::verdict::Verdict;

/// JSON error envelope for non-200 responses.
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        #[derive(Serialize)]
        struct Body {
            error: String,
        }
        (
            self.status,
            Json(Body {
                error: self.message,
            }),
        )
            .into_response()
    }
}

pub async fn healthz() -> &'static str {
    "ok"
}

pub async fn list_lessons(State(state): State<AppState>) -> Json<Vec<Lesson>> {
    Json(state.catalog.lessons().to_vec())
}

pub async fn get_lesson(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Lesson>, ApiError> {
    state
        .catalog
        .get(&id)
        .cloned()
        .map(Json)
        .ok_or_else(|| ApiError::new(StatusCode::NOT_FOUND, format!("unknown lesson '{id}'")))
}

/// Executes a submission and returns its verdict.
///
/// Failures the submission caused (compilation, security violation,
/// execution failure, output mismatch) are 200 responses with
/// `success:false`; they are outcomes, not server faults. Unknown lessons
/// are 404 and workspace faults 500.
pub async fn run_submission(
    State(state): State<AppState>,
    Json(submission): Json<Submission>,
) -> Result<Json<Verdict>, ApiError> {
    match state.trainer.execute(&submission).await {
        Ok(output) => Ok(Json(Verdict::pass(output))),
        Err(ExecError::UnknownLesson(id)) => Err(ApiError::new(
            StatusCode::NOT_FOUND,
            format!("unknown lesson '{id}'"),
        )),
        Err(ExecError::Resource(io_err)) => {
            error!(error = %io_err, "submission workspace failure");
            Err(ApiError::new(
                StatusCode::INTERNAL_SERVER_ERROR,
                "internal execution failure",
            ))
        }
        Err(err) => Ok(Json(Verdict::fail(
            err.partial_output().to_owned(),
            err.to_string(),
        ))),
    }
}

/// Accepts client-reported execution metrics. Fire-and-forget: the record
/// goes to the telemetry stream and nothing is read back.
pub async fn report_metrics(Json(metric): Json<ExecutionMetric>) -> StatusCode {
    metric.record();
    StatusCode::ACCEPTED
}
