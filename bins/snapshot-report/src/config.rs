use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{DateTime, Utc};
use clap::{Args, Parser};
use serde::Deserialize;

use ledger_api::Query;
use mixin_source::DEFAULT_API_BASE;

use crate::error::ReportError;
use crate::render::{DEFAULT_FORMAT, Layout, Template};

pub const DEFAULT_OAUTH_BASE: &str = "https://mixin-oauth.fox.one";

#[derive(Parser)]
#[command(
    name = "snapshot-report",
    about = "Count and total a counterparty's ledger snapshots for one asset"
)]
pub struct Cli {
    #[command(flatten)]
    pub args: ReportArgs,
}

// ═══════════════════════════════════════════════════════════════
//  Config file (TOML)
// ═══════════════════════════════════════════════════════════════

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    pub token: Option<String>,
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub asset: Option<String>,
    pub opponent: Option<String>,
    pub start: Option<String>,
    pub end: Option<String>,
    pub output: Option<String>,
    pub ids_output: Option<String>,
    pub format: Option<String>,
    pub verbose: Option<bool>,
    pub by_asset: Option<bool>,
    pub dedup: Option<bool>,
    pub api_base: Option<String>,
    pub oauth_base: Option<String>,
    pub timeout_secs: Option<u64>,
}

pub fn load_config(path: &str) -> Result<Config, ReportError> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| ReportError::config("read", format!("'{path}': {e}")))?;
    toml::from_str(&content).map_err(|e| ReportError::config("parse", format!("'{path}': {e}")))
}

// ═══════════════════════════════════════════════════════════════
//  CLI args
// ═══════════════════════════════════════════════════════════════

#[derive(Args, Clone, Debug)]
pub struct ReportArgs {
    /// Path to the TOML config file
    #[arg(long, default_value = "snapshot-report.toml", env = "SNAPSHOT_REPORT_CONFIG")]
    pub config: String,

    /// Access token; skips the OAuth flow
    #[arg(long, env = "MIXIN_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    /// OAuth client id
    #[arg(long = "client")]
    pub client_id: Option<String>,

    /// OAuth client secret
    #[arg(long = "secret", env = "MIXIN_CLIENT_SECRET", hide_env_values = true)]
    pub client_secret: Option<String>,

    /// Asset id (UUID)
    #[arg(long)]
    pub asset: Option<String>,

    /// Counterparty id (UUID)
    #[arg(long)]
    pub opponent: Option<String>,

    /// Start time, RFC3339, inclusive
    #[arg(long)]
    pub start: Option<String>,

    /// End time, RFC3339; records created after it stop the scan
    #[arg(long)]
    pub end: Option<String>,

    /// Write the report here instead of stdout
    #[arg(long)]
    pub output: Option<String>,

    /// Write the quoted, comma-joined record ids here
    #[arg(long)]
    pub ids_output: Option<String>,

    /// Per-record line format: {id} {asset} {opponent} {amount} {created_at} {memo}
    #[arg(long)]
    pub format: Option<String>,

    /// List every record before the summary
    #[arg(long, short)]
    pub verbose: bool,

    /// Add a summary line per asset
    #[arg(long)]
    pub by_asset: bool,

    /// Drop records repeated across page boundaries
    #[arg(long)]
    pub dedup: bool,

    /// Ledger API root
    #[arg(long, env = "MIXIN_API_BASE")]
    pub api_base: Option<String>,

    /// OAuth authorize page
    #[arg(long)]
    pub oauth_base: Option<String>,

    /// Per-request timeout in seconds
    #[arg(long)]
    pub timeout: Option<u64>,
}

// ═══════════════════════════════════════════════════════════════
//  Effective: merged config
// ═══════════════════════════════════════════════════════════════

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Credential {
    Token(String),
    Client { id: String, secret: String },
}

/// Итоговая конфигурация после мержа: config.toml < env/CLI.
/// Everything here is validated; no network call has been made yet.
#[derive(Debug)]
pub struct Effective {
    pub credential: Credential,
    pub query: Query,
    pub layout: Layout,
    pub output: Option<PathBuf>,
    pub ids_output: Option<PathBuf>,
    pub dedup: bool,
    pub api_base: String,
    pub oauth_base: String,
    pub timeout: Duration,
}

impl Effective {
    pub fn new(args: &ReportArgs) -> Result<Self, ReportError> {
        let cfg = match load_config(&args.config) {
            Ok(c) => c,
            Err(e) => {
                if Path::new(&args.config).exists() {
                    return Err(e);
                }
                Config::default()
            }
        };

        let asset = args.asset.clone().or(cfg.asset);
        let opponent = args.opponent.clone().or(cfg.opponent);
        let asset = require_uuid("asset", asset)?;
        let opponent = require_uuid("opponent", opponent)?;

        let start = args.start.clone().or(cfg.start).map(|s| parse_time("start", &s)).transpose()?;
        let end = args.end.clone().or(cfg.end).map(|s| parse_time("end", &s)).transpose()?;
        if let (Some(s), Some(e)) = (start, end) {
            if e < s {
                return Err(ReportError::config("window", "end must not be before start"));
            }
        }

        let mut query = Query::new(asset, opponent);
        query.start_time = start;
        query.end_time = end;

        let credential = resolve_credential(
            non_empty(args.token.clone().or(cfg.token)),
            non_empty(args.client_id.clone().or(cfg.client_id)),
            non_empty(args.client_secret.clone().or(cfg.client_secret)),
        )?;

        let format = args.format.clone().or(cfg.format);
        let template = Template::parse(format.as_deref().unwrap_or(DEFAULT_FORMAT))?;

        Ok(Self {
            credential,
            query,
            layout: Layout {
                template,
                verbose: args.verbose || cfg.verbose.unwrap_or(false),
                by_asset: args.by_asset || cfg.by_asset.unwrap_or(false),
            },
            output: args.output.clone().or(cfg.output).map(PathBuf::from),
            ids_output: args.ids_output.clone().or(cfg.ids_output).map(PathBuf::from),
            dedup: args.dedup || cfg.dedup.unwrap_or(false),
            api_base: args
                .api_base
                .clone()
                .or(cfg.api_base)
                .unwrap_or_else(|| DEFAULT_API_BASE.into()),
            oauth_base: args
                .oauth_base
                .clone()
                .or(cfg.oauth_base)
                .unwrap_or_else(|| DEFAULT_OAUTH_BASE.into()),
            timeout: Duration::from_secs(args.timeout.or(cfg.timeout_secs).unwrap_or(30).max(1)),
        })
    }
}

fn non_empty(v: Option<String>) -> Option<String> {
    v.filter(|s| !s.trim().is_empty())
}

fn require_uuid(name: &'static str, value: Option<String>) -> Result<String, ReportError> {
    let value = non_empty(value).ok_or_else(|| ReportError::config(name, format!("--{name} is required")))?;
    uuid::Uuid::try_parse(value.trim())
        .map(|id| id.hyphenated().to_string())
        .map_err(|e| ReportError::config(name, format!("'{value}' is not a UUID: {e}")))
}

fn parse_time(name: &'static str, value: &str) -> Result<DateTime<Utc>, ReportError> {
    DateTime::parse_from_rfc3339(value.trim())
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| ReportError::config(name, format!("'{value}' is not RFC3339: {e}")))
}

fn resolve_credential(
    token: Option<String>,
    client_id: Option<String>,
    client_secret: Option<String>,
) -> Result<Credential, ReportError> {
    match (token, client_id, client_secret) {
        (Some(token), _, _) => Ok(Credential::Token(token)),
        (None, Some(id), Some(secret)) => Ok(Credential::Client { id, secret }),
        _ => Err(ReportError::config(
            "auth",
            "you must set one of --token and (--client + --secret)",
        )),
    }
}
