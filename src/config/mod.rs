//! Configuration layer: typed settings with layered precedence (file → env → CLI).

mod cli;

pub use cli::{CliArgs, Command, ConvertArgs, LogOverrides, RenderArgs, ServeArgs, ServeOverrides};

use std::{
    net::SocketAddr,
    num::NonZeroUsize,
    path::PathBuf,
    str::FromStr,
    time::Duration,
};

use clap::Parser;
use config::{Config, Environment, File};
use serde::Deserialize;
use thiserror::Error;
use tracing::level_filters::LevelFilter;
use uuid::Uuid;

use crate::application::convert::HeadingStyle;

const DEFAULT_CONFIG_BASENAME: &str = "config/default";
const LOCAL_CONFIG_BASENAME: &str = "mdtoggle";
const DEFAULT_HOST: &str = "127.0.0.1";
const DEFAULT_ADMIN_HOST: &str = "127.0.0.1";
const DEFAULT_PUBLIC_PORT: u16 = 3000;
const DEFAULT_ADMIN_PORT: u16 = 3001;
const DEFAULT_GRACEFUL_SHUTDOWN_SECS: u64 = 30;
const DEFAULT_RENDER_CACHE_LIMIT: usize = 512;
const DEFAULT_NONCE_LIFETIME_SECS: u64 = 24 * 60 * 60;
const MIN_NONCE_SECRET_LEN: usize = 16;
const DEFAULT_PRINCIPAL: &str = "admin";
const DEFAULT_TEXTAREA_ID: &str = "content";
const DEFAULT_SUPPORTED_SCREENS: &[&str] = &["post-edit", "post-new"];

/// Fully-resolved deployment settings after precedence resolution and validation.
#[derive(Debug, Clone)]
pub struct Settings {
    pub server: ServerSettings,
    pub logging: LoggingSettings,
    pub markdown: MarkdownSettings,
    pub editor: EditorScreenSettings,
    pub cache: CacheSettings,
    pub security: SecuritySettings,
    pub admin: AdminSettings,
    pub content: ContentSettings,
}

#[derive(Debug, Clone)]
pub struct ServerSettings {
    pub public_addr: SocketAddr,
    pub admin_addr: SocketAddr,
    pub graceful_shutdown: Duration,
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
pub struct MarkdownSettings {
    /// Default for posts without an explicit flag.
    pub auto_enable: bool,
    pub sanitize: bool,
    pub heading_style: HeadingStyle,
}

#[derive(Debug, Clone)]
pub struct EditorScreenSettings {
    pub supported_screens: Vec<String>,
    pub code_editor_enabled: bool,
    pub textarea_id: String,
}

#[derive(Debug, Clone)]
pub struct CacheSettings {
    pub render_limit: NonZeroUsize,
}

#[derive(Debug, Clone)]
pub struct SecuritySettings {
    pub nonce_secret: String,
    /// Set when no secret was configured and one was generated for this process.
    pub nonce_secret_generated: bool,
    pub nonce_lifetime: Duration,
}

#[derive(Debug, Clone)]
pub struct AdminSettings {
    pub default_principal: String,
    pub editors: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct ContentSettings {
    pub seed_file: Option<PathBuf>,
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

    builder = builder.add_source(
        Environment::with_prefix("MDTOGGLE")
            .separator("__")
            .list_separator(",")
            .with_list_parse_key("editor.supported_screens")
            .with_list_parse_key("admin.editors")
            .try_parsing(true),
    );

    let mut raw: RawSettings = builder.build()?.try_deserialize()?;

    match cli.command.as_ref() {
        Some(Command::Serve(args)) => raw.apply_serve_overrides(&args.overrides),
        Some(Command::Render(args)) => raw.apply_render_overrides(args),
        Some(Command::Convert(args)) => raw.apply_convert_overrides(args),
        None => raw.apply_serve_overrides(&ServeOverrides::default()),
    }

    Settings::from_raw(raw)
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawSettings {
    server: RawServerSettings,
    logging: RawLoggingSettings,
    markdown: RawMarkdownSettings,
    editor: RawEditorSettings,
    cache: RawCacheSettings,
    security: RawSecuritySettings,
    admin: RawAdminSettings,
    content: RawContentSettings,
}

impl RawSettings {
    fn apply_serve_overrides(&mut self, overrides: &ServeOverrides) {
        self.apply_log_overrides(&overrides.log);

        if let Some(host) = overrides.server_host.as_ref() {
            self.server.host = Some(host.clone());
        }
        if let Some(host) = overrides.server_admin_host.as_ref() {
            self.server.admin_host = Some(host.clone());
        }
        if let Some(port) = overrides.public_port {
            self.server.public_port = Some(port);
        }
        if let Some(port) = overrides.admin_port {
            self.server.admin_port = Some(port);
        }
        if let Some(seconds) = overrides.server_graceful_shutdown_seconds {
            self.server.graceful_shutdown_seconds = Some(seconds);
        }
        if let Some(enabled) = overrides.markdown_auto_enable {
            self.markdown.auto_enable = Some(enabled);
        }
        if let Some(limit) = overrides.cache_render_limit {
            self.cache.render_limit = Some(limit);
        }
        if let Some(path) = overrides.content_seed_file.as_ref() {
            self.content.seed_file = Some(path.clone());
        }
    }

    fn apply_render_overrides(&mut self, args: &RenderArgs) {
        self.apply_log_overrides(&args.log);
        if let Some(sanitize) = args.markdown_sanitize {
            self.markdown.sanitize = Some(sanitize);
        }
    }

    fn apply_convert_overrides(&mut self, args: &ConvertArgs) {
        self.apply_log_overrides(&args.log);
        if args.setext {
            self.markdown.heading_style = Some(HeadingStyle::Setext);
        }
    }

    fn apply_log_overrides(&mut self, overrides: &LogOverrides) {
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
            server,
            logging,
            markdown,
            editor,
            cache,
            security,
            admin,
            content,
        } = raw;

        Ok(Self {
            server: build_server_settings(server)?,
            logging: build_logging_settings(logging)?,
            markdown: build_markdown_settings(markdown),
            editor: build_editor_settings(editor)?,
            cache: build_cache_settings(cache)?,
            security: build_security_settings(security)?,
            admin: build_admin_settings(admin)?,
            content: build_content_settings(content),
        })
    }
}

fn build_server_settings(server: RawServerSettings) -> Result<ServerSettings, LoadError> {
    let host = server.host.unwrap_or_else(|| DEFAULT_HOST.to_string());
    let admin_host = server
        .admin_host
        .unwrap_or_else(|| DEFAULT_ADMIN_HOST.to_string());

    let public_port = server.public_port.unwrap_or(DEFAULT_PUBLIC_PORT);
    if public_port == 0 {
        return Err(LoadError::invalid(
            "server.public_port",
            "port must be greater than zero",
        ));
    }

    let admin_port = server.admin_port.unwrap_or(DEFAULT_ADMIN_PORT);
    if admin_port == 0 {
        return Err(LoadError::invalid(
            "server.admin_port",
            "port must be greater than zero",
        ));
    }

    let public_addr = parse_socket_addr(&host, public_port)
        .map_err(|reason| LoadError::invalid("server.public_addr", reason))?;
    let admin_addr = parse_socket_addr(&admin_host, admin_port)
        .map_err(|reason| LoadError::invalid("server.admin_addr", reason))?;

    let graceful_secs = server
        .graceful_shutdown_seconds
        .unwrap_or(DEFAULT_GRACEFUL_SHUTDOWN_SECS);
    if graceful_secs == 0 {
        return Err(LoadError::invalid(
            "server.graceful_shutdown_seconds",
            "must be greater than zero",
        ));
    }

    Ok(ServerSettings {
        public_addr,
        admin_addr,
        graceful_shutdown: Duration::from_secs(graceful_secs),
    })
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

fn build_markdown_settings(markdown: RawMarkdownSettings) -> MarkdownSettings {
    MarkdownSettings {
        auto_enable: markdown.auto_enable.unwrap_or(false),
        sanitize: markdown.sanitize.unwrap_or(false),
        heading_style: markdown.heading_style.unwrap_or_default(),
    }
}

fn build_editor_settings(editor: RawEditorSettings) -> Result<EditorScreenSettings, LoadError> {
    let supported_screens = match editor.supported_screens {
        Some(screens) => normalize_names(screens),
        None => DEFAULT_SUPPORTED_SCREENS
            .iter()
            .map(|screen| screen.to_string())
            .collect(),
    };
    if supported_screens.is_empty() {
        return Err(LoadError::invalid(
            "editor.supported_screens",
            "at least one screen is required",
        ));
    }

    let textarea_id = editor
        .textarea_id
        .map(|id| id.trim().to_string())
        .unwrap_or_else(|| DEFAULT_TEXTAREA_ID.to_string());
    if textarea_id.is_empty() || textarea_id.contains(char::is_whitespace) {
        return Err(LoadError::invalid(
            "editor.textarea_id",
            "must be a non-empty id without whitespace",
        ));
    }

    Ok(EditorScreenSettings {
        supported_screens,
        code_editor_enabled: editor.code_editor_enabled.unwrap_or(true),
        textarea_id,
    })
}

fn build_cache_settings(cache: RawCacheSettings) -> Result<CacheSettings, LoadError> {
    let limit = cache.render_limit.unwrap_or(DEFAULT_RENDER_CACHE_LIMIT);
    let render_limit = NonZeroUsize::new(limit)
        .ok_or_else(|| LoadError::invalid("cache.render_limit", "must be greater than zero"))?;
    Ok(CacheSettings { render_limit })
}

fn build_security_settings(security: RawSecuritySettings) -> Result<SecuritySettings, LoadError> {
    let configured = security
        .nonce_secret
        .map(|secret| secret.trim().to_string())
        .filter(|secret| !secret.is_empty());

    let (nonce_secret, nonce_secret_generated) = match configured {
        Some(secret) if secret.len() < MIN_NONCE_SECRET_LEN => {
            return Err(LoadError::invalid(
                "security.nonce_secret",
                format!("must be at least {MIN_NONCE_SECRET_LEN} characters"),
            ));
        }
        Some(secret) => (secret, false),
        None => (Uuid::new_v4().simple().to_string(), true),
    };

    let lifetime_secs = security
        .nonce_lifetime_seconds
        .unwrap_or(DEFAULT_NONCE_LIFETIME_SECS);
    if lifetime_secs < 2 {
        return Err(LoadError::invalid(
            "security.nonce_lifetime_seconds",
            "must be at least two seconds",
        ));
    }

    Ok(SecuritySettings {
        nonce_secret,
        nonce_secret_generated,
        nonce_lifetime: Duration::from_secs(lifetime_secs),
    })
}

fn build_admin_settings(admin: RawAdminSettings) -> Result<AdminSettings, LoadError> {
    let default_principal = admin
        .default_principal
        .map(|name| name.trim().to_string())
        .unwrap_or_else(|| DEFAULT_PRINCIPAL.to_string());

    let editors = match admin.editors {
        Some(editors) => normalize_names(editors),
        None => vec![DEFAULT_PRINCIPAL.to_string()],
    };
    if editors.is_empty() {
        return Err(LoadError::invalid(
            "admin.editors",
            "at least one editor is required",
        ));
    }

    Ok(AdminSettings {
        default_principal,
        editors,
    })
}

fn build_content_settings(content: RawContentSettings) -> ContentSettings {
    ContentSettings {
        seed_file: content
            .seed_file
            .filter(|path| !path.as_os_str().is_empty()),
    }
}

fn normalize_names(names: Vec<String>) -> Vec<String> {
    let mut normalized: Vec<String> = Vec::with_capacity(names.len());
    for name in names {
        let trimmed = name.trim();
        if !trimmed.is_empty() && !normalized.iter().any(|existing| existing == trimmed) {
            normalized.push(trimmed.to_string());
        }
    }
    normalized
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawServerSettings {
    host: Option<String>,
    admin_host: Option<String>,
    public_port: Option<u16>,
    admin_port: Option<u16>,
    graceful_shutdown_seconds: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawLoggingSettings {
    level: Option<String>,
    json: Option<bool>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawMarkdownSettings {
    auto_enable: Option<bool>,
    sanitize: Option<bool>,
    heading_style: Option<HeadingStyle>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawEditorSettings {
    supported_screens: Option<Vec<String>>,
    code_editor_enabled: Option<bool>,
    textarea_id: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawCacheSettings {
    render_limit: Option<usize>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawSecuritySettings {
    nonce_secret: Option<String>,
    nonce_lifetime_seconds: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawAdminSettings {
    default_principal: Option<String>,
    editors: Option<Vec<String>>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawContentSettings {
    seed_file: Option<PathBuf>,
}

fn parse_socket_addr(host: &str, port: u16) -> Result<SocketAddr, String> {
    let candidate = format!("{host}:{port}");
    candidate
        .parse()
        .map_err(|err| format!("invalid address `{candidate}`: {err}"))
}

/// Resolve configuration using the supplied CLI arguments, returning both for downstream use.
pub fn load_with_cli() -> Result<(CliArgs, Settings), LoadError> {
    let args = CliArgs::parse();
    let settings = load(&args)?;
    Ok((args, settings))
}
