//! # codedrill-core - runtime for the codedrill trainer service
//!
//! `codedrill-core` powers a small HTTP service that accepts untrusted Python
//! submissions, executes them in a sandbox, and grades their output against a
//! lesson catalog. It provides the reusable building blocks for both halves
//! of that job:
//!
//! - **Execution sandbox**: a static import-policy gate plus two isolation
//!   strategies behind one [`sandbox::Sandbox`] seam: an out-of-process
//!   toolchain runner with per-submission scratch directories and a hard
//!   wall-clock deadline, and (behind the `embedded-interpreter` feature) an
//!   in-process RustPython interpreter whose standard-library surface is
//!   reduced to an explicit allowlist.
//! - **Edge defense**: the middleware chain every request passes through:
//!   protective response headers, a fixed-window rate limiter with a
//!   background sweep, a request body cap, and an anomaly-flagging
//!   structured access log.
//!
//! ## Architecture overview
//!
//! - `config`: `codedrill.toml` loading with defaulted sections.
//! - `catalog`: the lesson collaborator (embedded set or a JSON file).
//! - `gate` / `sandbox` / `verdict` / `trainer`: the execution pipeline.
//! - `limiter` / `middleware`: shared client-facing defenses.
//! - `server`: axum router, handlers, and service startup.
//! - `telemetry`: client-reported execution metric records.
//!
//! ## Quickstart
//!
//! ```rust,ignore
//! use codedrill_core::{catalog::Catalog, config::CoreConfig, server};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = CoreConfig::load(None)?;
//!     let catalog = Catalog::builtin()?;
//!     server::run(config, catalog).await
//! }
//! ```

pub mod catalog;
pub mod config;
pub mod error;
pub mod gate;
pub mod limiter;
pub mod middleware;
pub mod sandbox;
pub mod server;
pub mod telemetry;
pub mod trainer;
pub mod verdict;

pub use catalog::{Catalog, Lesson};
pub use config::CoreConfig;
pub use error::ExecError;
pub use gate::ImportGate;
pub use limiter::FixedWindowLimiter;
pub use sandbox::Sandbox;
pub use trainer::{Submission, Trainer};
pub use verdict::Verdict;
