//! Config file loading and layering onto the built-in presets.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use media_backup::download::MAX_WORKERS;
use media_backup::{BackupConfig, FailurePolicy, Variant};

use crate::cli::Args;

/// Settings read from the config file; `None` keeps the preset value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileConfig {
    pub photo_dir: Option<PathBuf>,
    pub video_dir: Option<PathBuf>,
    pub database: Option<PathBuf>,
    pub client_secrets: Option<PathBuf>,
    pub token_file: Option<PathBuf>,
    pub api_base_url: Option<String>,
    /// Concurrent downloads (1..=64).
    pub workers: Option<u64>,
    /// Items per catalog page (1..=100).
    pub page_size: Option<u64>,
    /// Submissions per 60-second window (>= 1).
    pub per_minute_limit: Option<u64>,
    /// Submissions per run before dispatching stops (>= 1).
    pub daily_cap: Option<u64>,
    pub on_download_failure: Option<FailurePolicy>,
    pub count_archived_toward_cap: Option<bool>,
    /// Database pool max connections (1..=20).
    pub db_max_connections: Option<u32>,
    /// Database busy timeout in milliseconds.
    pub db_busy_timeout_ms: Option<u32>,
}

impl FileConfig {
    /// Validates values against runtime constraints.
    pub fn validate(&self) -> Result<()> {
        if let Some(workers) = self.workers
            && !(1..=MAX_WORKERS as u64).contains(&workers)
        {
            bail!("Invalid config value for `workers`: {workers}. Expected range: 1..={MAX_WORKERS}");
        }
        if let Some(page_size) = self.page_size
            && !(1..=100).contains(&page_size)
        {
            bail!("Invalid config value for `page_size`: {page_size}. Expected range: 1..=100");
        }
        if self.per_minute_limit == Some(0) {
            bail!("Invalid config value for `per_minute_limit`: 0. Expected a positive integer");
        }
        if self.daily_cap == Some(0) {
            bail!("Invalid config value for `daily_cap`: 0. Expected a positive integer");
        }
        if let Some(url) = &self.api_base_url
            && url::Url::parse(url).is_err()
        {
            bail!("Invalid config value for `api_base_url`: '{url}' is not a URL");
        }
        validate_db_max_connections(self.db_max_connections)?;
        validate_db_busy_timeout_ms(self.db_busy_timeout_ms)?;
        Ok(())
    }

    /// Overlays file values onto `config`.
    pub fn apply(&self, config: &mut BackupConfig) -> Result<()> {
        if let Some(dir) = &self.photo_dir {
            config.photo_dir.clone_from(dir);
        }
        if let Some(dir) = &self.video_dir {
            config.video_dir.clone_from(dir);
        }
        if let Some(path) = &self.database {
            config.database.clone_from(path);
        }
        if let Some(path) = &self.client_secrets {
            config.client_secrets.clone_from(path);
        }
        if let Some(path) = &self.token_file {
            config.token_file.clone_from(path);
        }
        if let Some(url) = &self.api_base_url {
            config.api_base_url.clone_from(url);
        }
        if let Some(workers) = self.workers {
            config.workers = usize::try_from(workers).context("`workers` out of range")?;
        }
        if let Some(page_size) = self.page_size {
            config.page_size = u32::try_from(page_size).context("`page_size` out of range")?;
        }
        if let Some(limit) = self.per_minute_limit {
            config.limits.per_window = limit;
        }
        if let Some(cap) = self.daily_cap {
            config.limits.daily_cap = cap;
        }
        if let Some(policy) = self.on_download_failure {
            config.failure_policy = policy;
        }
        if let Some(enabled) = self.count_archived_toward_cap {
            config.count_archived_toward_cap = enabled;
        }
        if let Some(n) = self.db_max_connections {
            config.db.max_connections = n;
        }
        if let Some(ms) = self.db_busy_timeout_ms {
            config.db.busy_timeout_ms = ms;
        }
        Ok(())
    }
}

fn validate_db_max_connections(value: Option<u32>) -> Result<()> {
    let Some(value) = value else {
        return Ok(());
    };
    if !(1..=20).contains(&value) {
        bail!("Invalid config value for `db_max_connections`: {value}. Expected range: 1..=20");
    }
    Ok(())
}

fn validate_db_busy_timeout_ms(value: Option<u32>) -> Result<()> {
    let Some(value) = value else {
        return Ok(());
    };
    if value > 120_000 {
        bail!("Invalid config value for `db_busy_timeout_ms`: {value}. Expected range: 0..=120000");
    }
    Ok(())
}

/// Builds the run config: preset, then config file, then CLI flags.
pub fn resolve(args: &Args) -> Result<(BackupConfig, Option<PathBuf>)> {
    let variant = if args.videos_only {
        Variant::VideosOnly
    } else {
        Variant::AllMedia
    };
    let mut config = BackupConfig::for_variant(variant);

    let path = match &args.config {
        Some(explicit) => {
            if !explicit.exists() {
                bail!("Config file '{}' does not exist", explicit.display());
            }
            Some(explicit.clone())
        }
        None => resolve_default_config_path().filter(|p| p.exists()),
    };
    if let Some(path) = &path {
        load_file_config(path)?.apply(&mut config)?;
    }

    if let Some(workers) = args.workers {
        config.workers = usize::from(workers);
    }
    if let Some(policy) = args.on_download_failure {
        config.failure_policy = policy;
    }
    Ok((config, path))
}

/// Resolves default config path.
///
/// Priority:
/// 1. `$XDG_CONFIG_HOME/media-backup/config.toml`
/// 2. `$HOME/.config/media-backup/config.toml`
#[must_use]
pub fn resolve_default_config_path() -> Option<PathBuf> {
    if let Some(xdg_config_home) = env_var_non_empty_os("XDG_CONFIG_HOME") {
        return Some(
            PathBuf::from(xdg_config_home)
                .join("media-backup")
                .join("config.toml"),
        );
    }

    let home = env_var_non_empty_os("HOME")?;
    Some(
        PathBuf::from(home)
            .join(".config")
            .join("media-backup")
            .join("config.toml"),
    )
}

fn env_var_non_empty_os(name: &str) -> Option<std::ffi::OsString> {
    let value = env::var_os(name)?;
    if value.is_empty() { None } else { Some(value) }
}

fn load_file_config(path: &Path) -> Result<FileConfig> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file '{}'", path.display()))?;
    parse_config_str(&raw)
        .with_context(|| format!("Failed to parse config file '{}'", path.display()))
}

fn parse_config_str(raw: &str) -> Result<FileConfig> {
    let mut cfg = FileConfig::default();
    for (line_index, raw_line) in raw.lines().enumerate() {
        let line_no = line_index + 1;
        let line = strip_inline_comment(raw_line).trim();
        if line.is_empty() {
            continue;
        }

        let Some((raw_key, raw_value)) = line.split_once('=') else {
            bail!("Invalid config syntax on line {line_no}: expected key = value");
        };

        let key = raw_key.trim();
        let value = raw_value.trim();
        let invalid = || format!("Invalid `{key}` value on line {line_no}");

        match key {
            "photo_dir" => cfg.photo_dir = Some(parse_path(value).with_context(invalid)?),
            "video_dir" => cfg.video_dir = Some(parse_path(value).with_context(invalid)?),
            "database" => cfg.database = Some(parse_path(value).with_context(invalid)?),
            "client_secrets" => {
                cfg.client_secrets = Some(parse_path(value).with_context(invalid)?);
            }
            "token_file" => cfg.token_file = Some(parse_path(value).with_context(invalid)?),
            "api_base_url" => {
                cfg.api_base_url = Some(parse_string_literal(value).with_context(invalid)?);
            }
            "workers" => cfg.workers = Some(parse_integer_u64(value).with_context(invalid)?),
            "page_size" => cfg.page_size = Some(parse_integer_u64(value).with_context(invalid)?),
            "per_minute_limit" => {
                cfg.per_minute_limit = Some(parse_integer_u64(value).with_context(invalid)?);
            }
            "daily_cap" => cfg.daily_cap = Some(parse_integer_u64(value).with_context(invalid)?),
            "on_download_failure" => {
                let parsed = parse_string_literal(value).with_context(invalid)?;
                cfg.on_download_failure = Some(parsed.parse().with_context(invalid)?);
            }
            "count_archived_toward_cap" => {
                cfg.count_archived_toward_cap = Some(parse_boolean(value).with_context(invalid)?);
            }
            "db_max_connections" => {
                let parsed = parse_integer_u64(value).with_context(invalid)?;
                let n = u32::try_from(parsed)
                    .map_err(|_| anyhow::anyhow!("db_max_connections out of range for u32"))?;
                cfg.db_max_connections = Some(n);
            }
            "db_busy_timeout_ms" => {
                let parsed = parse_integer_u64(value).with_context(invalid)?;
                let n = u32::try_from(parsed)
                    .map_err(|_| anyhow::anyhow!("db_busy_timeout_ms out of range for u32"))?;
                cfg.db_busy_timeout_ms = Some(n);
            }
            unknown => {
                bail!("Unknown configuration key: '{unknown}' on line {line_no}");
            }
        }
    }
    cfg.validate()?;
    Ok(cfg)
}

fn strip_inline_comment(line: &str) -> &str {
    let mut in_string = false;
    for (index, ch) in line.char_indices() {
        match ch {
            '"' => in_string = !in_string,
            '#' if !in_string => return &line[..index],
            _ => {}
        }
    }
    line
}

fn parse_string_literal(raw_value: &str) -> Result<String> {
    if raw_value.len() < 2 || !raw_value.starts_with('"') || !raw_value.ends_with('"') {
        bail!("Expected double-quoted string");
    }
    Ok(raw_value[1..raw_value.len() - 1].to_string())
}

fn parse_path(raw_value: &str) -> Result<PathBuf> {
    let value = parse_string_literal(raw_value)?;
    if value.is_empty() {
        bail!("Expected a non-empty path");
    }
    Ok(PathBuf::from(value))
}

fn parse_integer_u64(raw_value: &str) -> Result<u64> {
    let token = raw_value.trim();
    if token.is_empty() {
        bail!("Expected integer value");
    }
    let value = token.parse::<i128>()?;
    if value < 0 {
        bail!("Expected non-negative integer");
    }
    u64::try_from(value).map_err(|_| anyhow::anyhow!("Integer value out of range for u64"))
}

fn parse_boolean(raw_value: &str) -> Result<bool> {
    match raw_value.trim() {
        "true" => Ok(true),
        "false" => Ok(false),
        _ => bail!("Expected 'true' or 'false'"),
    }
}
