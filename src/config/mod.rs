//! Configuration layer: typed settings with layered precedence (file → env → CLI).

use std::{net::SocketAddr, path::PathBuf, str::FromStr, time::Duration};

use clap::{Args, Parser, Subcommand, builder::BoolishValueParser};
use config::{Config, Environment, File};
use indexmap::IndexMap;
use serde::Deserialize;
use thiserror::Error;
use tracing::level_filters::LevelFilter;

use crate::{
    domain::{
        error::ConfigurationError,
        value::{ContainerAttributes, Language, Region},
    },
    infra::sources::{SourceOptions, SourceText},
};

const DEFAULT_CONFIG_BASENAME: &str = "config/default";
const LOCAL_CONFIG_BASENAME: &str = "exhibition";
const ENV_PREFIX: &str = "EXHIBITION";
const DEFAULT_HOST: &str = "127.0.0.1";
const DEFAULT_PORT: u16 = 4000;
const DEFAULT_OUTPUT_DIR: &str = "preview";

/// Command-line arguments for the exhibition binary.
#[derive(Debug, Parser)]
#[command(
    name = "exhibition",
    version,
    about = "Assemble contributed sources into a preview document"
)]
pub struct CliArgs {
    /// Optional path to a configuration file.
    #[arg(long = "config-file", env = "EXHIBITION_CONFIG_FILE", value_name = "PATH")]
    pub config_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Publish the configured sources once into the output directory.
    Render(RenderArgs),
    /// Run the HTTP preview server.
    Serve(ServeArgs),
}

impl Default for Command {
    fn default() -> Self {
        Command::Render(RenderArgs::default())
    }
}

#[derive(Debug, Args, Default, Clone)]
pub struct CommonOverrides {
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

    /// Override how long a publish waits for the surface to load.
    #[arg(long = "settle-timeout-ms", value_name = "MILLIS")]
    pub settle_timeout_ms: Option<u64>,
}

#[derive(Debug, Args, Default, Clone)]
pub struct RenderArgs {
    #[command(flatten)]
    pub common: CommonOverrides,

    /// Override the directory the render is written to.
    #[arg(long = "output-dir", value_name = "PATH")]
    pub output_dir: Option<PathBuf>,
}

#[derive(Debug, Args, Default, Clone)]
pub struct ServeArgs {
    #[command(flatten)]
    pub common: CommonOverrides,

    /// Override the listener host.
    #[arg(long = "server-host", value_name = "HOST")]
    pub server_host: Option<String>,

    /// Override the listener port.
    #[arg(long = "server-port", value_name = "PORT")]
    pub server_port: Option<u16>,
}

/// Fully-resolved settings after precedence resolution and validation.
#[derive(Debug, Clone)]
pub struct Settings {
    pub server: ServerSettings,
    pub logging: LoggingSettings,
    pub publisher: PublisherSettings,
    pub output: OutputSettings,
    pub transpiler: Option<TranspilerSettings>,
    pub sources: Vec<SourceSettings>,
}

#[derive(Debug, Clone)]
pub struct ServerSettings {
    pub addr: SocketAddr,
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
pub struct PublisherSettings {
    pub settle_timeout: Option<Duration>,
    pub refresh_on_init: bool,
    pub refresh_on_add: bool,
}

#[derive(Debug, Clone)]
pub struct OutputSettings {
    pub directory: PathBuf,
}

#[derive(Debug, Clone)]
pub struct TranspilerSettings {
    pub command: PathBuf,
    pub args: Vec<String>,
}

/// One configured content source, in declaration order.
#[derive(Debug, Clone)]
pub struct SourceSettings {
    pub name: String,
    pub text: SourceText,
    pub options: SourceOptions,
}

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to build configuration: {0}")]
    Build(#[from] config::ConfigError),
    #[error("invalid configuration for `{key}`: {reason}")]
    Invalid { key: &'static str, reason: String },
    #[error("invalid source configuration: {0}")]
    Source(#[from] ConfigurationError),
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

    builder = builder.add_source(Environment::with_prefix(ENV_PREFIX).separator("__"));

    let mut raw: RawSettings = builder.build()?.try_deserialize()?;

    match cli.command.as_ref() {
        Some(Command::Serve(args)) => raw.apply_serve_overrides(args),
        Some(Command::Render(args)) => raw.apply_render_overrides(args),
        None => raw.apply_render_overrides(&RenderArgs::default()),
    }

    Settings::from_raw(raw)
}

/// Resolve configuration using the supplied CLI arguments, returning both for downstream use.
pub fn load_with_cli() -> Result<(CliArgs, Settings), LoadError> {
    let args = CliArgs::parse();
    let settings = load(&args)?;
    Ok((args, settings))
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawSettings {
    server: RawServerSettings,
    logging: RawLoggingSettings,
    publisher: RawPublisherSettings,
    output: RawOutputSettings,
    transpiler: RawTranspilerSettings,
    sources: Vec<RawSourceSettings>,
}

impl RawSettings {
    fn apply_common_overrides(&mut self, overrides: &CommonOverrides) {
        if let Some(level) = overrides.log_level.as_ref() {
            self.logging.level = Some(level.clone());
        }
        if let Some(json) = overrides.log_json {
            self.logging.json = Some(json);
        }
        if let Some(millis) = overrides.settle_timeout_ms {
            self.publisher.settle_timeout_ms = Some(millis);
        }
    }

    fn apply_render_overrides(&mut self, args: &RenderArgs) {
        self.apply_common_overrides(&args.common);
        if let Some(directory) = args.output_dir.as_ref() {
            self.output.directory = Some(directory.clone());
        }
    }

    fn apply_serve_overrides(&mut self, args: &ServeArgs) {
        self.apply_common_overrides(&args.common);
        if let Some(host) = args.server_host.as_ref() {
            self.server.host = Some(host.clone());
        }
        if let Some(port) = args.server_port {
            self.server.port = Some(port);
        }
    }
}

impl Settings {
    fn from_raw(raw: RawSettings) -> Result<Self, LoadError> {
        let RawSettings {
            server,
            logging,
            publisher,
            output,
            transpiler,
            sources,
        } = raw;

        let sources = sources
            .into_iter()
            .enumerate()
            .map(|(index, source)| build_source_settings(index, source))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            server: build_server_settings(server)?,
            logging: build_logging_settings(logging)?,
            publisher: build_publisher_settings(publisher)?,
            output: build_output_settings(output),
            transpiler: build_transpiler_settings(transpiler)?,
            sources,
        })
    }
}

fn build_server_settings(server: RawServerSettings) -> Result<ServerSettings, LoadError> {
    let host = server.host.unwrap_or_else(|| DEFAULT_HOST.to_string());
    let port = server.port.unwrap_or(DEFAULT_PORT);
    if port == 0 {
        return Err(LoadError::invalid(
            "server.port",
            "port must be greater than zero",
        ));
    }

    let candidate = format!("{host}:{port}");
    let addr = candidate.parse().map_err(|err| {
        LoadError::invalid("server.addr", format!("invalid address `{candidate}`: {err}"))
    })?;
    Ok(ServerSettings { addr })
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

fn build_publisher_settings(
    publisher: RawPublisherSettings,
) -> Result<PublisherSettings, LoadError> {
    let settle_timeout = match publisher.settle_timeout_ms {
        Some(0) => {
            return Err(LoadError::invalid(
                "publisher.settle_timeout_ms",
                "must be greater than zero; omit it to wait indefinitely",
            ));
        }
        Some(millis) => Some(Duration::from_millis(millis)),
        None => None,
    };

    Ok(PublisherSettings {
        settle_timeout,
        refresh_on_init: publisher.refresh_on_init.unwrap_or(true),
        refresh_on_add: publisher.refresh_on_add.unwrap_or(false),
    })
}

fn build_output_settings(output: RawOutputSettings) -> OutputSettings {
    OutputSettings {
        directory: output
            .directory
            .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT_DIR)),
    }
}

fn build_transpiler_settings(
    transpiler: RawTranspilerSettings,
) -> Result<Option<TranspilerSettings>, LoadError> {
    let Some(command) = transpiler.command else {
        if !transpiler.args.is_empty() {
            return Err(LoadError::invalid(
                "transpiler.args",
                "arguments given without a transpiler command",
            ));
        }
        return Ok(None);
    };
    if command.as_os_str().is_empty() {
        return Err(LoadError::invalid("transpiler.command", "must not be empty"));
    }
    Ok(Some(TranspilerSettings {
        command,
        args: transpiler.args,
    }))
}

fn build_source_settings(index: usize, raw: RawSourceSettings) -> Result<SourceSettings, LoadError> {
    let name = raw
        .name
        .map(|name| name.trim().to_string())
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| format!("source-{index}"));

    let text = match (raw.path, raw.content) {
        (Some(path), None) => SourceText::File(path),
        (None, Some(content)) => SourceText::Inline(content),
        _ => return Err(ConfigurationError::ambiguous_source(&name).into()),
    };

    let language = raw
        .language
        .as_deref()
        .map(Language::from_str)
        .transpose()?;
    let region = raw
        .region
        .as_deref()
        .map(Region::try_from)
        .transpose()?
        .unwrap_or(Region::Body);
    let attributes = raw
        .attributes
        .map(|attributes| attributes.into_iter().collect::<ContainerAttributes>());

    Ok(SourceSettings {
        name,
        text,
        options: SourceOptions {
            language,
            region,
            priority: raw.priority.unwrap_or(0),
            attributes,
            trim_default_value: raw.trim_default_value.unwrap_or(true),
        },
    })
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawServerSettings {
    host: Option<String>,
    port: Option<u16>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawLoggingSettings {
    level: Option<String>,
    json: Option<bool>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawPublisherSettings {
    settle_timeout_ms: Option<u64>,
    refresh_on_init: Option<bool>,
    refresh_on_add: Option<bool>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawOutputSettings {
    directory: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawTranspilerSettings {
    command: Option<PathBuf>,
    args: Vec<String>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawSourceSettings {
    name: Option<String>,
    language: Option<String>,
    path: Option<PathBuf>,
    content: Option<String>,
    region: Option<String>,
    priority: Option<i32>,
    attributes: Option<IndexMap<String, String>>,
    trim_default_value: Option<bool>,
}
