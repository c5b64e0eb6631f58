use catalog_access::access::engine;
use catalog_access::access::loader::load_policies;
use catalog_access::access::parser::{parse_access_rule, parse_entry_query};
use catalog_access::access::query::{Timestamp, TIMESTAMP_FORMAT};
use catalog_access::access::types::{CheckResponse, ParseResponse};
use catalog_access::access::AccessPolicy;
use catalog_access::settings::Settings;
use chrono::NaiveDateTime;
use clap::{Parser, Subcommand};
use miette::{miette, IntoDiagnostic, Result};
use serde::Serialize;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser, Debug)]
#[command(
    name = "catalog-access",
    version,
    about = "Access control for tree-structured course catalogs"
)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "config.toml")]
    config: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Decide whether a user may see one catalog path
    Check {
        /// Slash-separated entry names, e.g. /kurzy/daweb
        #[arg(long)]
        path: String,
        /// Login of the caller; anonymous when omitted
        #[arg(long)]
        user: Option<String>,
        /// Evaluate at this instant (YYYY-MM-DDTHH:mm) instead of now
        #[arg(long, value_parser = parse_timestamp)]
        at: Option<Timestamp>,
    },
    /// Parse an entry query, or an access rule with --rule
    Parse {
        #[arg(long)]
        rule: bool,
        text: String,
    },
    /// List every path a user may see
    Tree {
        #[arg(long)]
        user: Option<String>,
        #[arg(long, value_parser = parse_timestamp)]
        at: Option<Timestamp>,
    },
}

fn parse_timestamp(text: &str) -> std::result::Result<Timestamp, String> {
    NaiveDateTime::parse_from_str(text, TIMESTAMP_FORMAT)
        .map_err(|e| format!("expected YYYY-MM-DDTHH:mm: {e}"))
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // load settings
    let settings = Settings::load(&cli.config)?;

    // logging
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&settings.logging.filter))
        .into_diagnostic()?;
    fmt().with_env_filter(env_filter).init();
    tracing::debug!(?settings, "Loaded configuration");

    let mode = settings.rules.match_mode;
    match cli.command {
        Command::Check { path, user, at } => {
            let policy = load_policies(&settings.policy.dir)?;
            let cursor = policy
                .catalog
                .locate(&path)
                .ok_or_else(|| miette!("no catalog entry at `{path}`"))?;
            let caller = policy.caller(user.as_deref());
            let allowed = engine::check(&policy, &cursor, &caller, now_or(at), mode);
            print_json(&CheckResponse {
                path: cursor.link_path(),
                allowed,
            })?;
        }
        Command::Parse { rule, text } => {
            if rule {
                let parsed = parse_access_rule(&text)?;
                print_parsed(parsed.to_string(), parsed)?;
            } else {
                let parsed = parse_entry_query(&text)?;
                print_parsed(parsed.to_string(), parsed)?;
            }
        }
        Command::Tree { user, at } => {
            let policy: AccessPolicy = load_policies(&settings.policy.dir)?;
            let caller = policy.caller(user.as_deref());
            for path in engine::visible_paths(&policy, &caller, now_or(at), mode) {
                println!("{path}");
            }
        }
    }
    Ok(())
}

fn now_or(at: Option<Timestamp>) -> Timestamp {
    at.unwrap_or_else(|| chrono::Local::now().naive_local())
}

fn print_parsed<T: Serialize>(canonical: String, parsed: T) -> Result<()> {
    println!("{canonical}");
    print_json(&ParseResponse { canonical, parsed })
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value).into_diagnostic()?;
    println!("{json}");
    Ok(())
}
