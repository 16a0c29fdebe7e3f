mod types;

pub use types::*;

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

/// Load configuration from a TOML file
pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {:?}", path))?;

    let config: Config = toml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {:?}", path))?;

    validate_config(&config)?;

    Ok(config)
}

/// Load config from default locations or return default config
pub fn load_config_or_default(custom_path: Option<&Path>) -> Result<Config> {
    if let Some(path) = custom_path {
        return load_config(path);
    }

    // Try default locations
    let default_paths = [
        "./mediaforged.toml",
        "~/.config/mediaforged/config.toml",
        "/etc/mediaforged/config.toml",
    ];

    for path_str in default_paths {
        let path = shellexpand::tilde(path_str);
        let path = Path::new(path.as_ref());
        if path.exists() {
            tracing::debug!("Using config file {:?}", path);
            return load_config(path);
        }
    }

    Ok(Config::default())
}

/// Validate configuration
pub fn validate_config(config: &Config) -> Result<()> {
    if config.execution.cancel_retry_secs == 0 {
        anyhow::bail!("execution.cancel_retry_secs must be greater than 0");
    }
    if config.execution.poll_interval_ms == 0 {
        anyhow::bail!("execution.poll_interval_ms must be greater than 0");
    }

    for (name, path) in [
        ("ffmpeg", &config.tools.ffmpeg_path),
        ("ffprobe", &config.tools.ffprobe_path),
    ] {
        if let Some(path) = path {
            if !path.exists() {
                tracing::warn!("Configured {} path does not exist: {:?}", name, path);
            }
        }
    }

    for (name, value) in [
        ("probe.analyze_duration", &config.probe.analyze_duration),
        ("probe.probe_size", &config.probe.probe_size),
    ] {
        if value.trim().is_empty() {
            anyhow::bail!("{} cannot be empty", name);
        }
    }

    Ok(())
}

/// Resolve the ffmpeg executable from config or `PATH`.
pub fn ffmpeg_path(config: &Config) -> Result<PathBuf> {
    Ok(mediaforged_av::get_tool_path(
        "ffmpeg",
        config.tools.ffmpeg_path.as_deref(),
    )?)
}

/// Resolve the ffprobe executable from config or `PATH`.
pub fn ffprobe_path(config: &Config) -> Result<PathBuf> {
    Ok(mediaforged_av::get_tool_path(
        "ffprobe",
        config.tools.ffprobe_path.as_deref(),
    )?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::time::Duration;
    use tempfile::NamedTempFile;

    fn write_config(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_empty_file_uses_defaults() {
        let file = write_config("");
        let config = load_config(file.path()).unwrap();
        assert_eq!(config.execution.cancel_retry_secs, 10);
        assert_eq!(config.execution.poll_interval_ms, 250);
        assert_eq!(config.probe.analyze_duration, "100M");
        assert!(config.tools.ffmpeg_path.is_none());
    }

    #[test]
    fn test_sections_are_read() {
        let file = write_config(
            r#"
[tools]
ffmpeg_path = "/opt/ffmpeg/bin/ffmpeg"

[execution]
cancel_retry_secs = 3
poll_interval_ms = 50

[probe]
probe_size = "20M"
"#,
        );
        let config = load_config(file.path()).unwrap();
        assert_eq!(
            config.tools.ffmpeg_path.as_deref(),
            Some(Path::new("/opt/ffmpeg/bin/ffmpeg"))
        );
        let timings = config.execution.watchdog_timings();
        assert_eq!(timings.retry_interval, Duration::from_secs(3));
        assert_eq!(timings.poll_interval, Duration::from_millis(50));
        let options = config.probe.options();
        assert_eq!(options.probe_size, "20M");
        assert_eq!(options.analyze_duration, "100M");
    }

    #[test]
    fn test_zero_retry_interval_rejected() {
        let file = write_config("[execution]\ncancel_retry_secs = 0\n");
        let err = load_config(file.path()).unwrap_err();
        assert!(err.to_string().contains("cancel_retry_secs"));
    }

    #[test]
    fn test_zero_poll_interval_rejected() {
        let mut config = Config::default();
        config.execution.poll_interval_ms = 0;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_invalid_toml_reports_path() {
        let file = write_config("[execution\n");
        let err = load_config(file.path()).unwrap_err();
        assert!(err.to_string().contains("Failed to parse config file"));
    }

    #[test]
    fn test_explicit_missing_path_fails() {
        assert!(load_config_or_default(Some(Path::new("/nonexistent/mediaforged.toml"))).is_err());
    }
}
