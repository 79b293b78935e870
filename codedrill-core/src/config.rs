//! Configuration loading.
//!
//! Everything is driven by `codedrill.toml`; every section and field is
//! optional and falls back to the defaults below, so an empty (or absent)
//! file yields a runnable service.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;

/// Default wall-clock budget for one submission, in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 5;
/// Cap on a request body, enforced both by declared length and while reading.
pub const DEFAULT_MAX_BODY_BYTES: usize = 1024 * 1024;
/// Cap on captured execution output.
pub const DEFAULT_MAX_OUTPUT_BYTES: usize = 256 * 1024;

/// Top-level service configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CoreConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub sandbox: SandboxConfig,
    #[serde(default)]
    pub rate_limit: RateLimitConfig,
    #[serde(default)]
    pub request_guard: RequestGuardConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    /// Listen address. Binding failure at startup is the one process-fatal
    /// error in the service.
    #[serde(default = "default_bind")]
    pub bind: SocketAddr,
}

/// Settings for the out-of-process toolchain sandbox.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SandboxConfig {
    /// Toolchain executable invoked inside the scratch directory.
    #[serde(default = "default_program")]
    pub program: String,
    /// Arguments placed before the entry-point file name.
    #[serde(default)]
    pub args: Vec<String>,
    /// File name the submission is written to inside the scratch directory.
    #[serde(default = "default_entry_file")]
    pub entry_file: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_max_output_bytes")]
    pub max_output_bytes: usize,
    /// Parent directory for scratch workspaces; the system temp dir if unset.
    #[serde(default)]
    pub scratch_root: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RateLimitConfig {
    /// Requests allowed per identity within one window.
    #[serde(default = "default_rate_limit")]
    pub limit: u32,
    #[serde(default = "default_window_secs")]
    pub window_secs: u64,
    /// Interval of the background sweep that drops expired windows.
    #[serde(default = "default_sweep_secs")]
    pub sweep_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RequestGuardConfig {
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,
}

impl CoreConfig {
    /// Loads configuration from `path`, or from `codedrill.toml` in the
    /// working directory when it exists, or defaults otherwise.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let candidate = match path {
            Some(explicit) => Some(explicit.to_path_buf()),
            None => {
                let implicit = PathBuf::from("codedrill.toml");
                implicit.exists().then_some(implicit)
            }
        };

        let Some(file) = candidate else {
            return Ok(Self::default());
        };

        let raw = std::fs::read_to_string(&file)
            .with_context(|| format!("failed to read config file {}", file.display()))?;
        let config: Self = toml::from_str(&raw)
            .with_context(|| format!("failed to parse config file {}", file.display()))?;
        Ok(config)
    }
}

impl SandboxConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl RateLimitConfig {
    pub fn window(&self) -> Duration {
        Duration::from_secs(self.window_secs)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_secs)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

impl Default for SandboxConfig {
    fn default() -> Self {
        Self {
            program: default_program(),
            args: Vec::new(),
            entry_file: default_entry_file(),
            timeout_secs: default_timeout_secs(),
            max_output_bytes: default_max_output_bytes(),
            scratch_root: None,
        }
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            limit: default_rate_limit(),
            window_secs: default_window_secs(),
            sweep_secs: default_sweep_secs(),
        }
    }
}

impl Default for RequestGuardConfig {
    fn default() -> Self {
        Self {
            max_body_bytes: default_max_body_bytes(),
        }
    }
}

fn default_bind() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 8080))
}

fn default_program() -> String {
    "python3".to_owned()
}

fn default_entry_file() -> String {
    "main.py".to_owned()
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

fn default_max_output_bytes() -> usize {
    DEFAULT_MAX_OUTPUT_BYTES
}

fn default_rate_limit() -> u32 {
    30
}

fn default_window_secs() -> u64 {
    60
}

fn default_sweep_secs() -> u64 {
    120
}

fn default_max_body_bytes() -> usize {
    DEFAULT_MAX_BODY_BYTES
}
