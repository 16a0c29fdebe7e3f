use mediaforged_av::interprocess::WatchdogTimings;
use mediaforged_av::probe::ProbeOptions;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub tools: ToolsConfig,

    #[serde(default)]
    pub execution: ExecutionConfig,

    #[serde(default)]
    pub probe: ProbeConfig,
}

/// External tool locations; unset paths are looked up on `PATH`.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ToolsConfig {
    #[serde(default)]
    pub ffmpeg_path: Option<PathBuf>,

    #[serde(default)]
    pub ffprobe_path: Option<PathBuf>,
}

/// Cancellation watchdog cadence.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ExecutionConfig {
    /// Seconds to wait for a child to honour a cancel request before
    /// repeating it.
    #[serde(default = "default_cancel_retry_secs")]
    pub cancel_retry_secs: u64,

    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            cancel_retry_secs: default_cancel_retry_secs(),
            poll_interval_ms: default_poll_interval_ms(),
        }
    }
}

impl ExecutionConfig {
    pub fn watchdog_timings(&self) -> WatchdogTimings {
        WatchdogTimings {
            poll_interval: Duration::from_millis(self.poll_interval_ms),
            retry_interval: Duration::from_secs(self.cancel_retry_secs),
        }
    }
}

fn default_cancel_retry_secs() -> u64 {
    10
}
fn default_poll_interval_ms() -> u64 {
    250
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ProbeConfig {
    #[serde(default = "default_probe_limit")]
    pub analyze_duration: String,

    #[serde(default = "default_probe_limit")]
    pub probe_size: String,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            analyze_duration: default_probe_limit(),
            probe_size: default_probe_limit(),
        }
    }
}

impl ProbeConfig {
    pub fn options(&self) -> ProbeOptions {
        ProbeOptions {
            analyze_duration: self.analyze_duration.clone(),
            probe_size: self.probe_size.clone(),
        }
    }
}

fn default_probe_limit() -> String {
    "100M".to_string()
}
