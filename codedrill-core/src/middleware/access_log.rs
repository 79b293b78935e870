//! Structured access logging with anomaly flags.
//!
//! The response body is wrapped so the record carries the bytes actually
//! written and the final status, not whatever a handler intended. One JSON
//! record is emitted per request on the `codedrill::access` tracing target,
//! once the body finishes (or is abandoned by the client).

use std::net::SocketAddr;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Instant;

use axum::body::Body;
use axum::extract::{ConnectInfo, Request};
use axum::http::{header, HeaderMap};
use axum::middleware::Next;
use axum::response::Response;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use http_body::{Body as HttpBody, Frame, SizeHint};
use pin_project_lite::pin_project;
use serde::Serialize;
use tracing::info;

use crate::limiter::client_identity;

/// Known scanner/bot user-agent substrings (lowercased).
const SCANNER_USER_AGENTS: &[&str] = &[
    "nikto", "sqlmap", "masscan", "nmap", "zgrab", "nuclei", "gobuster", "dirb",
    "dirbuster", "wfuzz", "ffuf", "hydra", "metasploit", "acunetix", "nessus",
    "openvas", "skipfish", "libwww-perl", "scrapy", "semrushbot", "ahrefsbot",
    "mj12bot", "dotbot", "petalbot", "bytespider",
];

/// Paths commonly probed by scanners and exploit scripts (lowercased).
const PROBE_PATHS: &[&str] = &[
    "/.env",
    "/.git/",
    "/wp-admin",
    "/wp-login.php",
    "/wp-content/",
    "/phpmyadmin",
    "/.htaccess",
    "/config.php",
    "/backup",
    "/etc/passwd",
    "/cgi-bin/",
    "/xmlrpc.php",
    "/actuator",
    "/.aws/",
    "/.ssh/",
    "/shell.php",
    "/id_rsa",
    "/console",
    "/manager/html",
    "/solr/",
    "/jenkins",
];

/// The standard verb set; anything else is flagged.
const STANDARD_METHODS: &[&str] = &["GET", "HEAD", "POST", "PUT", "DELETE", "OPTIONS", "PATCH"];

/// Per-request anomaly tags. A fixed enumeration rather than free-form
/// strings, so log consumers stay stable as detection grows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AnomalyFlag {
    ScannerUserAgent,
    ScannerPath,
    UnusualMethod,
    ClientError,
    ServerError,
}

/// One access-log record. Constructed after the handler completes, emitted
/// exactly once, never read back.
#[derive(Debug, Serialize)]
struct AccessRecord {
    ts: DateTime<Utc>,
    method: String,
    path: String,
    status: u16,
    latency_ms: u64,
    ip: String,
    ua: String,
    size: u64,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    flags: Vec<AnomalyFlag>,
    #[serde(skip_serializing_if = "Option::is_none")]
    referer: Option<String>,
}

impl AccessRecord {
    fn emit(mut self, size: u64) {
        self.size = size;
        if let Ok(line) = serde_json::to_string(&self) {
            info!(target: "codedrill::access", "{line}");
        }
    }
}

/// Classifies one request/response pair. Flags are additive; an empty result
/// means ordinary traffic.
pub fn detect_flags(method: &str, path: &str, user_agent: &str, status: u16) -> Vec<AnomalyFlag> {
    let mut flags = Vec::new();

    let ua_lower = user_agent.to_lowercase();
    if SCANNER_USER_AGENTS
        .iter()
        .any(|needle| ua_lower.contains(needle))
    {
        flags.push(AnomalyFlag::ScannerUserAgent);
    }

    let path_lower = path.to_lowercase();
    if PROBE_PATHS
        .iter()
        .any(|probe| path_lower.starts_with(probe) || path_lower.contains(probe))
    {
        flags.push(AnomalyFlag::ScannerPath);
    }

    if !STANDARD_METHODS.contains(&method.to_uppercase().as_str()) {
        flags.push(AnomalyFlag::UnusualMethod);
    }

    if (400..500).contains(&status) {
        flags.push(AnomalyFlag::ClientError);
    }
    if status >= 500 {
        flags.push(AnomalyFlag::ServerError);
    }

    flags
}

pin_project! {
    /// Counts bytes as the response body streams out and emits the access
    /// record when the body ends, or on drop, so an aborted client still
    /// produces a record.
    struct CountingBody {
        #[pin]
        inner: Body,
        record: Option<AccessRecord>,
        bytes_sent: u64,
    }

    impl PinnedDrop for CountingBody {
        fn drop(this: Pin<&mut Self>) {
            let this = this.project();
            if let Some(record) = this.record.take() {
                record.emit(*this.bytes_sent);
            }
        }
    }
}

impl HttpBody for CountingBody {
    type Data = Bytes;
    type Error = axum::Error;

    fn poll_frame(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Option<Result<Frame<Self::Data>, Self::Error>>> {
        let this = self.project();
        match this.inner.poll_frame(cx) {
            Poll::Ready(Some(Ok(frame))) => {
                if let Some(data) = frame.data_ref() {
                    *this.bytes_sent += data.len() as u64;
                }
                Poll::Ready(Some(Ok(frame)))
            }
            Poll::Ready(Some(Err(err))) => {
                if let Some(record) = this.record.take() {
                    record.emit(*this.bytes_sent);
                }
                Poll::Ready(Some(Err(err)))
            }
            Poll::Ready(None) => {
                if let Some(record) = this.record.take() {
                    record.emit(*this.bytes_sent);
                }
                Poll::Ready(None)
            }
            Poll::Pending => Poll::Pending,
        }
    }

    fn is_end_stream(&self) -> bool {
        self.inner.is_end_stream()
    }

    fn size_hint(&self) -> SizeHint {
        self.inner.size_hint()
    }
}

fn header_str(headers: &HeaderMap, name: header::HeaderName) -> Option<String> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(str::to_owned)
}

/// Wraps the rest of the chain, recording status, true byte count, latency,
/// client identity, and anomaly flags for every request.
pub async fn access_log(
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    request: Request,
    next: Next,
) -> Response {
    let started = Instant::now();
    let method = request.method().to_string();
    let path = request.uri().path().to_owned();
    let ip = client_identity(request.headers(), peer);
    let ua = header_str(request.headers(), header::USER_AGENT).unwrap_or_default();
    let referer = header_str(request.headers(), header::REFERER);

    let response = next.run(request).await;

    let status = response.status().as_u16();
    let flags = detect_flags(&method, &path, &ua, status);
    let record = AccessRecord {
        ts: Utc::now(),
        method,
        path,
        status,
        latency_ms: u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
        ip,
        ua,
        size: 0,
        flags,
        referer,
    };

    let (parts, body) = response.into_parts();
    Response::from_parts(
        parts,
        Body::new(CountingBody {
            inner: body,
            record: Some(record),
            bytes_sent: 0,
        }),
    )
}
