use std::path::Path;

use anyhow::{Context, Result};
use taskq_core::QueueConfig;
use tracing::debug;

/// Resolve the queue configuration.
/// Priority: CLI flag > env var (profiled first) > config file > defaults.
pub fn resolve(
    file: Option<&Path>,
    profile: &str,
    max: Option<usize>,
    interval_ms: Option<u64>,
) -> Result<QueueConfig> {
    let mut config = match file {
        Some(path) => QueueConfig::from_file(path)
            .with_context(|| format!("failed to load config: {}", path.display()))?,
        None => QueueConfig::default(),
    }
    .with_profile_env(profile);

    if let Some(max) = max {
        config.max = max;
    }
    if let Some(interval_ms) = interval_ms {
        config.interval_ms = interval_ms;
    }

    config
        .validate()
        .context("invalid queue configuration")?;
    debug!(max = config.max, interval_ms = config.interval_ms, "queue config resolved");
    Ok(config)
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    fn config_file(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn defaults_without_file_or_flags() {
        let config = resolve(None, "", None, None).unwrap();
        assert_eq!(config, QueueConfig::default());
    }

    #[test]
    fn file_values_apply() {
        let file = config_file("max = 4\ninterval_ms = 250\n");
        let config = resolve(Some(file.path()), "", None, None).unwrap();
        assert_eq!(config.max, 4);
        assert_eq!(config.interval_ms, 250);
    }

    #[test]
    fn flags_override_file() {
        let file = config_file("max = 4\ninterval_ms = 250\n");
        let config = resolve(Some(file.path()), "", Some(8), None).unwrap();
        assert_eq!(config.max, 8);
        assert_eq!(config.interval_ms, 250);
    }

    #[test]
    fn profiled_env_overrides_file_and_flags_override_env() {
        std::env::set_var("CLITESTA_TASKQ_MAX", "6");
        let file = config_file("max = 4\ninterval_ms = 250\n");

        let config = resolve(Some(file.path()), "clitesta", None, None).unwrap();
        assert_eq!(config.max, 6);
        assert_eq!(config.interval_ms, 250);

        let config = resolve(Some(file.path()), "clitesta", Some(9), None).unwrap();
        assert_eq!(config.max, 9);

        std::env::remove_var("CLITESTA_TASKQ_MAX");
    }

    #[test]
    fn zero_max_flag_is_rejected() {
        assert!(resolve(None, "", Some(0), None).is_err());
    }

    #[test]
    fn missing_file_is_an_error() {
        let err = resolve(Some(Path::new("/nonexistent/taskq.toml")), "", None, None).unwrap_err();
        assert!(format!("{err:#}").contains("failed to load config"));
    }
}
