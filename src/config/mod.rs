//! Configuration layer: typed settings with layered precedence (file → env → CLI).

use std::{path::PathBuf, str::FromStr};

use clap::{Args, Parser, Subcommand, ValueHint, builder::BoolishValueParser};
use config::{Config, Environment, File};
use serde::Deserialize;
use thiserror::Error;
use tracing::level_filters::LevelFilter;

const DEFAULT_CONFIG_BASENAME: &str = "config/default";
const LOCAL_CONFIG_BASENAME: &str = "vetrina";
const DEFAULT_FIGMA_API_BASE_URL: &str = "https://api.figma.com";
const DEFAULT_IMAGE_SCALE: u8 = 2;
const MAX_IMAGE_SCALE: u8 = 4;
const DEFAULT_OUTPUT_DIR: &str = "build";
const DEFAULT_NOT_FOUND_IMAGE: &str = "media/page-not-found.png";
const DEFAULT_ERROR_IMAGE: &str = "media/no-content.png";
const DEFAULT_SCHEMAS_DIR: &str = "schemas";
const DEFAULT_CONCURRENCY: usize = 1;
const MAX_CONCURRENCY: usize = 32;

/// Command-line arguments for the Vetrina binary.
#[derive(Debug, Parser)]
#[command(
    name = "vetrina",
    version,
    about = "Synchronize Figma view renders into a Confluence design inventory"
)]
pub struct CliArgs {
    /// Optional path to a configuration file.
    #[arg(long = "config-file", env = "VETRINA_CONFIG_FILE", value_name = "PATH")]
    pub config_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Run the full synchronization pipeline.
    Sync(Box<SyncArgs>),
    /// Validate schema documents without touching any remote service.
    Check(CheckArgs),
}

#[derive(Debug, Args, Default, Clone)]
pub struct SyncArgs {
    #[command(flatten)]
    pub overrides: SyncOverrides,

    /// Only process objects whose name matches (repeatable,
    /// case-insensitive).
    #[arg(long = "only", value_name = "NAME")]
    pub only: Vec<String>,
}

#[derive(Debug, Args, Clone)]
pub struct CheckArgs {
    #[command(flatten)]
    pub overrides: CheckOverrides,

    /// Only process objects whose name matches (repeatable,
    /// case-insensitive).
    #[arg(long = "only", value_name = "NAME")]
    pub only: Vec<String>,
}

#[derive(Debug, Args, Default, Clone)]
pub struct SyncOverrides {
    /// Override the directory holding object schema documents.
    #[arg(long = "schemas-dir", value_name = "PATH", value_hint = ValueHint::DirPath)]
    pub schemas_dir: Option<PathBuf>,

    /// Override the local output directory for rendered artifacts.
    #[arg(long = "output-dir", value_name = "PATH", value_hint = ValueHint::DirPath)]
    pub output_dir: Option<PathBuf>,

    /// Override the per-phase worker width.
    #[arg(long = "concurrency", value_name = "COUNT")]
    pub concurrency: Option<usize>,

    /// Reuse images already on disk instead of calling the export service.
    #[arg(
        long = "offline",
        value_name = "BOOL",
        num_args = 0..=1,
        default_missing_value = "true",
        value_parser = BoolishValueParser::new()
    )]
    pub offline: Option<bool>,

    /// Skip the attachment cleanup phase.
    #[arg(
        long = "skip-attachment-cleanup",
        value_name = "BOOL",
        num_args = 0..=1,
        default_missing_value = "true",
        value_parser = BoolishValueParser::new()
    )]
    pub skip_attachment_cleanup: Option<bool>,

    /// Skip the attachment upload phase.
    #[arg(
        long = "skip-upload",
        value_name = "BOOL",
        num_args = 0..=1,
        default_missing_value = "true",
        value_parser = BoolishValueParser::new()
    )]
    pub skip_upload: Option<bool>,

    /// Skip page body updates (page titles are still fetched).
    #[arg(
        long = "skip-page-update",
        value_name = "BOOL",
        num_args = 0..=1,
        default_missing_value = "true",
        value_parser = BoolishValueParser::new()
    )]
    pub skip_page_update: Option<bool>,

    /// Override the base log level (trace|debug|info|warn|error).
    #[arg(long = "log-level", value_name = "LEVEL")]
    pub log_level: Option<String>,

    /// Toggle JSON logging.
    #[arg(
        long = "log-json",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new()
    )]
    pub log_json: Option<bool>,
}

#[derive(Debug, Args, Default, Clone)]
pub struct CheckOverrides {
    /// Override the directory holding object schema documents.
    #[arg(long = "schemas-dir", value_name = "PATH", value_hint = ValueHint::DirPath)]
    pub schemas_dir: Option<PathBuf>,

    /// Override the base log level (trace|debug|info|warn|error).
    #[arg(long = "log-level", value_name = "LEVEL")]
    pub log_level: Option<String>,

    /// Toggle JSON logging.
    #[arg(
        long = "log-json",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new()
    )]
    pub log_json: Option<bool>,
}

/// Fully-resolved settings after precedence resolution and validation.
#[derive(Debug, Clone)]
pub struct Settings {
    pub logging: LoggingSettings,
    pub figma: FigmaSettings,
    pub confluence: ConfluenceSettings,
    pub output: OutputSettings,
    pub sync: SyncSettings,
}

#[derive(Debug, Clone)]
pub struct LoggingSettings {
    pub level: LevelFilter,
    pub format: LogFormat,
}

#[derive(Debug, Clone, Copy)]
pub enum LogFormat {
    Json,
    Compact,
}

#[derive(Debug, Clone)]
pub struct FigmaSettings {
    pub token: Option<String>,
    pub api_base_url: String,
    pub image_scale: u8,
}

#[derive(Debug, Clone)]
pub struct ConfluenceSettings {
    pub base_url: Option<String>,
    pub username: Option<String>,
    pub token: Option<String>,
    pub summary_page_url: Option<String>,
    pub overviews: OverviewPageUrls,
}

/// One Confluence page per overview grouping.
#[derive(Debug, Clone, Default)]
pub struct OverviewPageUrls {
    pub state_diagrams: Option<String>,
    pub desktop_grids: Option<String>,
    pub desktop_details: Option<String>,
    pub desktop_infocards: Option<String>,
    pub desktop_spotlight: Option<String>,
    pub mobile_list: Option<String>,
    pub mobile_details: Option<String>,
    pub email_notifications: Option<String>,
}

#[derive(Debug, Clone)]
pub struct OutputSettings {
    pub directory: PathBuf,
    pub not_found_image: PathBuf,
    pub error_image: PathBuf,
}

#[derive(Debug, Clone)]
pub struct SyncSettings {
    pub schemas_dir: PathBuf,
    pub concurrency: usize,
    pub offline: bool,
    pub skip_attachment_cleanup: bool,
    pub skip_upload: bool,
    pub skip_page_update: bool,
}

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to build configuration: {0}")]
    Build(#[from] config::ConfigError),
    #[error("invalid configuration for `{key}`: {reason}")]
    Invalid { key: &'static str, reason: String },
}

impl LoadError {
    fn invalid(key: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            key,
            reason: reason.into(),
        }
    }
}

/// Load settings using the configured precedence (file → environment → CLI).
pub fn load(cli: &CliArgs) -> Result<Settings, LoadError> {
    let mut builder = Config::builder()
        .add_source(File::with_name(DEFAULT_CONFIG_BASENAME).required(false))
        .add_source(File::with_name(LOCAL_CONFIG_BASENAME).required(false));

    if let Some(path) = cli.config_file.as_ref() {
        builder = builder.add_source(File::from(path.as_path()).required(true));
    }

    builder = builder.add_source(Environment::with_prefix("VETRINA").separator("__"));

    let mut raw: RawSettings = builder.build()?.try_deserialize()?;

    match cli.command.as_ref() {
        Some(Command::Sync(args)) => raw.apply_sync_overrides(&args.overrides),
        Some(Command::Check(args)) => raw.apply_check_overrides(&args.overrides),
        None => raw.apply_sync_overrides(&SyncOverrides::default()),
    }

    Settings::from_raw(raw)
}

/// Resolve configuration using the supplied CLI arguments, returning both
/// for downstream use.
pub fn load_with_cli() -> Result<(CliArgs, Settings), LoadError> {
    let args = CliArgs::parse();
    let settings = load(&args)?;
    Ok((args, settings))
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawSettings {
    logging: RawLoggingSettings,
    figma: RawFigmaSettings,
    confluence: RawConfluenceSettings,
    output: RawOutputSettings,
    sync: RawSyncSettings,
}

impl RawSettings {
    fn apply_sync_overrides(&mut self, overrides: &SyncOverrides) {
        if let Some(dir) = overrides.schemas_dir.as_ref() {
            self.sync.schemas_dir = Some(dir.clone());
        }
        if let Some(dir) = overrides.output_dir.as_ref() {
            self.output.directory = Some(dir.clone());
        }
        if let Some(width) = overrides.concurrency {
            self.sync.concurrency = Some(width);
        }
        if let Some(offline) = overrides.offline {
            self.sync.offline = Some(offline);
        }
        if let Some(skip) = overrides.skip_attachment_cleanup {
            self.sync.skip_attachment_cleanup = Some(skip);
        }
        if let Some(skip) = overrides.skip_upload {
            self.sync.skip_upload = Some(skip);
        }
        if let Some(skip) = overrides.skip_page_update {
            self.sync.skip_page_update = Some(skip);
        }
        if let Some(level) = overrides.log_level.as_ref() {
            self.logging.level = Some(level.clone());
        }
        if let Some(json) = overrides.log_json {
            self.logging.json = Some(json);
        }
    }

    fn apply_check_overrides(&mut self, overrides: &CheckOverrides) {
        if let Some(dir) = overrides.schemas_dir.as_ref() {
            self.sync.schemas_dir = Some(dir.clone());
        }
        if let Some(level) = overrides.log_level.as_ref() {
            self.logging.level = Some(level.clone());
        }
        if let Some(json) = overrides.log_json {
            self.logging.json = Some(json);
        }
    }
}

impl Settings {
    fn from_raw(raw: RawSettings) -> Result<Self, LoadError> {
        let RawSettings {
            logging,
            figma,
            confluence,
            output,
            sync,
        } = raw;

        let logging = build_logging_settings(logging)?;
        let figma = build_figma_settings(figma)?;
        let confluence = build_confluence_settings(confluence);
        let output = build_output_settings(output)?;
        let sync = build_sync_settings(sync)?;

        Ok(Self {
            logging,
            figma,
            confluence,
            output,
            sync,
        })
    }
}

fn build_logging_settings(logging: RawLoggingSettings) -> Result<LoggingSettings, LoadError> {
    let level = match logging.level {
        Some(level) => LevelFilter::from_str(level.as_str()).map_err(|err| {
            LoadError::invalid("logging.level", format!("failed to parse: {err}"))
        })?,
        None => LevelFilter::INFO,
    };

    let format = if logging.json.unwrap_or(false) {
        LogFormat::Json
    } else {
        LogFormat::Compact
    };

    Ok(LoggingSettings { level, format })
}

fn build_figma_settings(figma: RawFigmaSettings) -> Result<FigmaSettings, LoadError> {
    let token = figma.token.and_then(non_empty);

    let api_base_url = figma
        .api_base_url
        .and_then(non_empty)
        .unwrap_or_else(|| DEFAULT_FIGMA_API_BASE_URL.to_string());

    let image_scale = figma.image_scale.unwrap_or(DEFAULT_IMAGE_SCALE);
    if image_scale == 0 || image_scale > MAX_IMAGE_SCALE {
        return Err(LoadError::invalid(
            "figma.image_scale",
            format!("must be between 1 and {MAX_IMAGE_SCALE}"),
        ));
    }

    Ok(FigmaSettings {
        token,
        api_base_url,
        image_scale,
    })
}

fn build_confluence_settings(confluence: RawConfluenceSettings) -> ConfluenceSettings {
    let overviews = confluence.overviews;
    ConfluenceSettings {
        base_url: confluence.base_url.and_then(non_empty),
        username: confluence.username.and_then(non_empty),
        token: confluence.token.and_then(non_empty),
        summary_page_url: confluence.summary_page_url.and_then(non_empty),
        overviews: OverviewPageUrls {
            state_diagrams: overviews.state_diagrams.and_then(non_empty),
            desktop_grids: overviews.desktop_grids.and_then(non_empty),
            desktop_details: overviews.desktop_details.and_then(non_empty),
            desktop_infocards: overviews.desktop_infocards.and_then(non_empty),
            desktop_spotlight: overviews.desktop_spotlight.and_then(non_empty),
            mobile_list: overviews.mobile_list.and_then(non_empty),
            mobile_details: overviews.mobile_details.and_then(non_empty),
            email_notifications: overviews.email_notifications.and_then(non_empty),
        },
    }
}

fn build_output_settings(output: RawOutputSettings) -> Result<OutputSettings, LoadError> {
    let directory = output
        .directory
        .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT_DIR));
    if directory.as_os_str().is_empty() {
        return Err(LoadError::invalid(
            "output.directory",
            "path must not be empty",
        ));
    }

    let not_found_image = output
        .not_found_image
        .unwrap_or_else(|| PathBuf::from(DEFAULT_NOT_FOUND_IMAGE));
    let error_image = output
        .error_image
        .unwrap_or_else(|| PathBuf::from(DEFAULT_ERROR_IMAGE));

    Ok(OutputSettings {
        directory,
        not_found_image,
        error_image,
    })
}

fn build_sync_settings(sync: RawSyncSettings) -> Result<SyncSettings, LoadError> {
    let schemas_dir = sync
        .schemas_dir
        .unwrap_or_else(|| PathBuf::from(DEFAULT_SCHEMAS_DIR));
    if schemas_dir.as_os_str().is_empty() {
        return Err(LoadError::invalid(
            "sync.schemas_dir",
            "path must not be empty",
        ));
    }

    let concurrency = sync.concurrency.unwrap_or(DEFAULT_CONCURRENCY);
    if concurrency == 0 || concurrency > MAX_CONCURRENCY {
        return Err(LoadError::invalid(
            "sync.concurrency",
            format!("must be between 1 and {MAX_CONCURRENCY}"),
        ));
    }

    Ok(SyncSettings {
        schemas_dir,
        concurrency,
        offline: sync.offline.unwrap_or(false),
        skip_attachment_cleanup: sync.skip_attachment_cleanup.unwrap_or(false),
        skip_upload: sync.skip_upload.unwrap_or(false),
        skip_page_update: sync.skip_page_update.unwrap_or(false),
    })
}

fn non_empty(value: String) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawLoggingSettings {
    level: Option<String>,
    json: Option<bool>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawFigmaSettings {
    token: Option<String>,
    api_base_url: Option<String>,
    image_scale: Option<u8>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawConfluenceSettings {
    base_url: Option<String>,
    username: Option<String>,
    token: Option<String>,
    summary_page_url: Option<String>,
    overviews: RawOverviewPageUrls,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawOverviewPageUrls {
    state_diagrams: Option<String>,
    desktop_grids: Option<String>,
    desktop_details: Option<String>,
    desktop_infocards: Option<String>,
    desktop_spotlight: Option<String>,
    mobile_list: Option<String>,
    mobile_details: Option<String>,
    email_notifications: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawOutputSettings {
    directory: Option<PathBuf>,
    not_found_image: Option<PathBuf>,
    error_image: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawSyncSettings {
    schemas_dir: Option<PathBuf>,
    concurrency: Option<usize>,
    offline: Option<bool>,
    skip_attachment_cleanup: Option<bool>,
    skip_upload: Option<bool>,
    skip_page_update: Option<bool>,
}

#[cfg(test)]
mod tests;
