// src/config/validate.rs

use crate::config::model::{ConfigFile, RawConfigFile};
use crate::errors::{Result, WatchError};
use crate::reload::filter::build_globset;

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = WatchError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        validate_raw_config(&raw)?;
        Ok(ConfigFile::new_unchecked(raw.watch, raw.reload))
    }
}

fn validate_raw_config(cfg: &RawConfigFile) -> Result<()> {
    validate_watch_section(cfg)?;
    validate_include_patterns(cfg)?;
    Ok(())
}

fn validate_watch_section(cfg: &RawConfigFile) -> Result<()> {
    if cfg.watch.poll_timeout_ms == 0 {
        return Err(WatchError::ConfigError(
            "[watch].poll_timeout_ms must be >= 1 (got 0)".to_string(),
        ));
    }
    if let Some(root) = &cfg.watch.root {
        if root.as_os_str().is_empty() {
            return Err(WatchError::ConfigError(
                "[watch].root must not be empty".to_string(),
            ));
        }
    }
    Ok(())
}

fn validate_include_patterns(cfg: &RawConfigFile) -> Result<()> {
    if cfg.reload.include.is_empty() {
        return Ok(());
    }
    build_globset(&cfg.reload.include)
        .map_err(|err| WatchError::ConfigError(format!("[reload].include: {err:#}")))?;
    Ok(())
}
