//! # Optimization Request
//!
//! Input immutabile di una singola invocazione e parametri fissi del protocollo.

use crate::config::CompressionMode;
use std::path::PathBuf;
use std::time::Duration;

/// Short client identifier sent as `plugin_version`
pub const CLIENT_TAG: &str = "DRO10";

/// Server-side wait hints, in seconds
pub const UPLOAD_WAIT_SECS: u64 = 30;
pub const POLL_WAIT_SECS: u64 = 20;

pub const UPLOAD_TIMEOUT: Duration = Duration::from_secs(60);
pub const POLL_TIMEOUT: Duration = Duration::from_secs(60);
pub const DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(60);

pub const POLL_ATTEMPTS: u32 = 3;
pub const POLL_DELAY: Duration = Duration::from_secs(2);

/// Per-invocation input
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OptimizationRequest {
    pub api_key: String,
    pub source_path: PathBuf,
    pub compression_mode: CompressionMode,
}

impl OptimizationRequest {
    pub fn new(
        api_key: impl Into<String>,
        source_path: impl Into<PathBuf>,
        compression_mode: CompressionMode,
    ) -> Self {
        Self {
            api_key: api_key.into(),
            source_path: source_path.into(),
            compression_mode,
        }
    }
}
