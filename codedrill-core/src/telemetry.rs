//! Client-reported execution metrics.
//!
//! The browser build executes submissions locally and reports how that went;
//! the native path may report the same shape. Records are emitted to the
//! telemetry stream as JSON lines and never read back by this process.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::info;

/// One completed execution as observed by the client.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionMetric {
    pub lesson_id: String,
    pub exit_code: i32,
    pub duration_ms: u64,
    pub output_bytes: u64,
}

impl ExecutionMetric {
    /// Emits the metric on the `codedrill::metrics` target.
    pub fn record(&self) {
        #[derive(Serialize)]
        struct Stamped<'a> {
            ts: chrono::DateTime<Utc>,
            #[serde(flatten)]
            metric: &'a ExecutionMetric,
        }
        let stamped = Stamped {
            ts: Utc::now(),
            metric: self,
        };
        if let Ok(line) = serde_json::to_string(&stamped) {
            info!(target: "codedrill::metrics", "{line}");
        }
    }
}
