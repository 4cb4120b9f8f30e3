use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueHint, builder::BoolishValueParser};
use uuid::Uuid;

/// Command-line arguments for the wger binary.
#[derive(Debug, Parser)]
#[command(name = "wger", version, about = "wger exercise catalogue server")]
pub struct CliArgs {
    /// Optional path to a configuration file.
    #[arg(long = "config-file", env = "WGER_CONFIG_FILE", value_name = "PATH")]
    pub config_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Run the HTTP server.
    Serve(Box<ServeArgs>),
    /// Apply pending database migrations and exit.
    #[command(name = "migrate")]
    Migrate(DatabaseArgs),
    /// Load languages, equipment and exercises from a TOML fixture.
    #[command(name = "load-fixture")]
    LoadFixture(LoadFixtureArgs),
    /// Issue an API key and print its token once.
    #[command(name = "issue-key")]
    IssueKey(IssueKeyArgs),
    /// Revoke an API key by id.
    #[command(name = "revoke-key")]
    RevokeKey(RevokeKeyArgs),
    /// List API keys without their secrets.
    #[command(name = "list-keys")]
    ListKeys(DatabaseArgs),
}

#[derive(Debug, Args, Default, Clone)]
pub struct DatabaseOverride {
    /// Override the database connection URL.
    #[arg(long = "database-url", value_name = "URL")]
    pub database_url: Option<String>,
}

#[derive(Debug, Args, Default, Clone)]
pub struct DatabaseArgs {
    #[command(flatten)]
    pub database: DatabaseOverride,
}

#[derive(Debug, Args, Default, Clone)]
pub struct ServeArgs {
    #[command(flatten)]
    pub overrides: ServeOverrides,
}

#[derive(Debug, Args, Default, Clone)]
pub struct ServeOverrides {
    /// Override the listener host.
    #[arg(long = "server-host", value_name = "HOST")]
    pub server_host: Option<String>,

    /// Override the listener port.
    #[arg(long = "server-port", value_name = "PORT")]
    pub server_port: Option<u16>,

    /// Override the graceful shutdown timeout.
    #[arg(long = "server-graceful-shutdown-seconds", value_name = "SECONDS")]
    pub server_graceful_shutdown_seconds: Option<u64>,

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

    /// Override the database connection URL.
    #[arg(long = "database-url", value_name = "URL")]
    pub database_url: Option<String>,

    /// Override the database pool size.
    #[arg(long = "database-max-connections", value_name = "COUNT")]
    pub database_max_connections: Option<u32>,

    /// Toggle the fragment cache.
    #[arg(
        long = "cache-fragments",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new()
    )]
    pub cache_fragments: Option<bool>,

    /// Override the default language short name.
    #[arg(long = "default-language", value_name = "CODE")]
    pub default_language: Option<String>,
}

#[derive(Debug, Args, Clone)]
pub struct LoadFixtureArgs {
    #[command(flatten)]
    pub database: DatabaseOverride,

    /// Fixture file to load.
    #[arg(value_name = "FILE", value_hint = ValueHint::FilePath)]
    pub file: PathBuf,
}

#[derive(Debug, Args, Clone)]
pub struct IssueKeyArgs {
    #[command(flatten)]
    pub database: DatabaseOverride,

    /// Display name of the key.
    #[arg(long, value_name = "NAME")]
    pub name: String,

    /// Scopes granted to the key (equipment_write, exercise_write).
    #[arg(long = "scope", value_name = "SCOPE", required = true)]
    pub scopes: Vec<String>,

    /// Lifetime of the key in days; keys never expire when omitted.
    #[arg(long = "expires-in-days", value_name = "DAYS")]
    pub expires_in_days: Option<u32>,
}

#[derive(Debug, Args, Clone)]
pub struct RevokeKeyArgs {
    #[command(flatten)]
    pub database: DatabaseOverride,

    /// Id of the key, as printed by `list-keys`.
    #[arg(value_name = "ID")]
    pub id: Uuid,
}
