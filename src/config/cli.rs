use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueHint, builder::BoolishValueParser};

/// Command-line arguments for the mdtoggle binary.
#[derive(Debug, Parser)]
#[command(
    name = "mdtoggle",
    version,
    about = "Per-post Markdown authoring for a CMS host"
)]
pub struct CliArgs {
    /// Optional path to a configuration file.
    #[arg(long = "config-file", env = "MDTOGGLE_CONFIG_FILE", value_name = "PATH")]
    pub config_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Run the admin and public HTTP services over the in-memory store.
    Serve(Box<ServeArgs>),
    /// Render a Markdown file to HTML on stdout.
    Render(RenderArgs),
    /// Convert an HTML file to Markdown on stdout.
    Convert(ConvertArgs),
}

#[derive(Debug, Args, Default, Clone)]
pub struct ServeArgs {
    #[command(flatten)]
    pub overrides: ServeOverrides,
}

#[derive(Debug, Args, Default, Clone)]
pub struct LogOverrides {
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
pub struct ServeOverrides {
    #[command(flatten)]
    pub log: LogOverrides,

    /// Override the public listener host.
    #[arg(long = "server-host", value_name = "HOST")]
    pub server_host: Option<String>,

    /// Override the administrative listener host.
    #[arg(long = "server-admin-host", value_name = "HOST")]
    pub server_admin_host: Option<String>,

    /// Override the public listener port.
    #[arg(long = "server-public-port", value_name = "PORT")]
    pub public_port: Option<u16>,

    /// Override the administrative listener port.
    #[arg(long = "server-admin-port", value_name = "PORT")]
    pub admin_port: Option<u16>,

    /// Override the graceful shutdown timeout.
    #[arg(long = "server-graceful-shutdown-seconds", value_name = "SECONDS")]
    pub server_graceful_shutdown_seconds: Option<u64>,

    /// Enable Markdown for posts without an explicit flag.
    #[arg(
        long = "markdown-auto-enable",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new()
    )]
    pub markdown_auto_enable: Option<bool>,

    /// Override the number of rendered bodies kept in memory.
    #[arg(long = "cache-render-limit", value_name = "COUNT")]
    pub cache_render_limit: Option<usize>,

    /// Override the TOML file posts are seeded from.
    #[arg(long = "content-seed-file", value_name = "PATH", value_hint = ValueHint::FilePath)]
    pub content_seed_file: Option<PathBuf>,
}

#[derive(Debug, Args, Clone)]
pub struct RenderArgs {
    #[command(flatten)]
    pub log: LogOverrides,

    /// Clean the rendered HTML with the sanitizer allow-list.
    #[arg(
        long = "markdown-sanitize",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new()
    )]
    pub markdown_sanitize: Option<bool>,

    /// Markdown file to render.
    #[arg(value_name = "FILE", value_hint = ValueHint::FilePath)]
    pub file: PathBuf,
}

#[derive(Debug, Args, Clone)]
pub struct ConvertArgs {
    #[command(flatten)]
    pub log: LogOverrides,

    /// Underline level one and two headings instead of prefixing them.
    #[arg(long, action = clap::ArgAction::SetTrue)]
    pub setext: bool,

    /// HTML file to convert.
    #[arg(value_name = "FILE", value_hint = ValueHint::FilePath)]
    pub file: PathBuf,
}
