//! Data-quality profiler for PostgreSQL tables and views.
//!
//! This binary connects to a database, enumerates schemas and relations,
//! and profiles one table or view at a time: structural metadata, grants,
//! completeness / primary-key uniqueness / duplicate-row metrics, optional
//! regex conformity checks, and numeric distribution summaries. Reports are
//! JSON; the snapshot can additionally be exported as CSV.

use clap::{Args, Parser, Subcommand};
use dbprofiler_core::{
    ConformityReport, DistributionSummary, PostgresCatalog, ProfileSession, ProfilerError,
    Result, TableProfile, init_logging, redact_database_url, write_csv,
};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{error, info};

#[derive(Parser)]
#[command(name = "dbprofiler")]
#[command(about = "Data-quality profiler for PostgreSQL tables and views")]
#[command(version)]
#[command(long_about = "
dbprofiler - data-quality profiling for PostgreSQL

Profiles one table or view at a time against a snapshot fetched at
selection time:
- Columns, types, nullability, comments, primary keys
- Grantees and their privileges
- Completeness, primary-key uniqueness, duplicate rows
- Regex conformity per column (start-anchored matching)
- Histogram and density summaries for numeric columns

All database operations are read-only and credentials never appear in
logs or error output.

EXAMPLES:
  dbprofiler schemas
  dbprofiler tables public
  dbprofiler profile public users --output users.json
  dbprofiler profile public users --check email='[^@]+@[^@]+' --csv users.csv
  dbprofiler profile public orders --histogram amount --bins 20
")]
struct Cli {
    #[command(flatten)]
    global: GlobalArgs,

    #[command(subcommand)]
    command: Command,
}

#[derive(Args)]
struct GlobalArgs {
    /// Database connection URL
    #[arg(
        long,
        env = "DATABASE_URL",
        global = true,
        help = "Database connection string (credentials are sanitized in logs)"
    )]
    database_url: Option<String>,

    /// Increase verbosity
    #[arg(
        short,
        long,
        global = true,
        action = clap::ArgAction::Count,
        help = "Increase verbosity (-v, -vv)"
    )]
    verbose: u8,

    /// Suppress output
    #[arg(short, long, global = true, help = "Suppress all output except errors")]
    quiet: bool,
}

#[derive(Subcommand)]
enum Command {
    /// List user schemas
    Schemas,
    /// List tables and views in a schema
    Tables {
        /// Schema to enumerate
        schema: String,
    },
    /// Profile one table or view
    Profile(ProfileArgs),
}

#[derive(Args)]
struct ProfileArgs {
    /// Schema of the relation
    schema: String,

    /// Table or view name
    table: String,

    /// Report output path; stdout when omitted
    #[arg(short, long, help = "Write the JSON report to this path")]
    output: Option<PathBuf>,

    /// CSV export path for the snapshot
    #[arg(long, help = "Export the full snapshot as CSV to this path")]
    csv: Option<PathBuf>,

    /// Conformity check, format: COLUMN=PATTERN
    #[arg(
        long,
        value_name = "COLUMN=PATTERN",
        help = "Check a column against a start-anchored regex"
    )]
    check: Option<String>,

    /// Numeric column to summarize
    #[arg(long, value_name = "COLUMN", help = "Summarize a numeric column's distribution")]
    histogram: Option<String>,

    /// Histogram bin count
    #[arg(long, default_value_t = dbprofiler_core::DEFAULT_BIN_COUNT, help = "Number of histogram bins")]
    bins: usize,
}

/// Full report emitted by the `profile` command.
#[derive(Serialize)]
struct ProfileReport {
    #[serde(flatten)]
    profile: TableProfile,
    #[serde(skip_serializing_if = "Option::is_none")]
    conformity: Option<ConformityReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    distribution: Option<DistributionSummary>,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        error!("{e}");
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    init_logging(cli.global.verbose, cli.global.quiet)?;

    let database_url = cli.global.database_url.as_deref().ok_or_else(|| {
        ProfilerError::configuration(
            "Database URL is required (--database-url or DATABASE_URL)",
        )
    })?;

    let catalog = PostgresCatalog::connect(database_url).await?;
    catalog.test_connection().await?;
    info!("Connected to {}", redact_database_url(database_url));

    let mut session = ProfileSession::new(Box::new(catalog));

    let result = match &cli.command {
        Command::Schemas => list_schemas(&session).await,
        Command::Tables { schema } => list_tables(&session, schema).await,
        Command::Profile(args) => profile_table(&mut session, args).await,
    };

    session.close().await;
    result
}

/// Prints user schemas, one per line.
async fn list_schemas(session: &ProfileSession) -> Result<()> {
    let schemas = session.list_schemas().await?;
    for schema in schemas {
        println!("{schema}");
    }
    Ok(())
}

/// Prints tables and views of one schema with their kind.
async fn list_tables(session: &ProfileSession, schema: &str) -> Result<()> {
    let tables = session.list_tables(schema).await?;
    for (name, kind) in tables {
        println!("{kind}\t{name}");
    }
    Ok(())
}

/// Profiles one relation and emits the JSON report.
async fn profile_table(session: &mut ProfileSession, args: &ProfileArgs) -> Result<()> {
    let profile = session.select_table(&args.schema, &args.table).await?;

    let conformity = match &args.check {
        Some(check) => {
            let (column, pattern) = parse_check(check)?;
            Some(session.check_conformity(column, pattern)?)
        }
        None => None,
    };

    let distribution = match &args.histogram {
        Some(column) => Some(session.summarize_distribution(column, args.bins)?),
        None => None,
    };

    if let Some(csv_path) = &args.csv {
        let snapshot = session
            .snapshot()
            .ok_or(ProfilerError::NoSelection)?;
        write_csv(snapshot, csv_path).await?;
    }

    let report = ProfileReport {
        profile,
        conformity,
        distribution,
    };
    let json = serde_json::to_string_pretty(&report)
        .map_err(|e| ProfilerError::serialization("Failed to render report", e))?;

    match &args.output {
        Some(path) => {
            write_report(&json, path).await?;
            info!("Report written to {}", path.display());
        }
        None => println!("{json}"),
    }

    Ok(())
}

/// Splits a `COLUMN=PATTERN` argument at the first equals sign.
fn parse_check(check: &str) -> Result<(&str, &str)> {
    check
        .split_once('=')
        .filter(|(column, _)| !column.is_empty())
        .ok_or_else(|| {
            ProfilerError::configuration(
                "Invalid --check argument; expected COLUMN=PATTERN",
            )
        })
}

/// Writes the rendered report to a file.
async fn write_report(json: &str, path: &Path) -> Result<()> {
    tokio::fs::write(path, json).await.map_err(|e| {
        ProfilerError::io(format!("Failed to write report to {}", path.display()), e)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_check_splits_on_first_equals() {
        let (column, pattern) = parse_check("email=[^@]+@[^@]+").unwrap();
        assert_eq!(column, "email");
        assert_eq!(pattern, "[^@]+@[^@]+");

        // Patterns may themselves contain '='
        let (column, pattern) = parse_check("v=a=b").unwrap();
        assert_eq!(column, "v");
        assert_eq!(pattern, "a=b");
    }

    #[test]
    fn test_parse_check_rejects_malformed() {
        assert!(parse_check("no-equals").is_err());
        assert!(parse_check("=pattern").is_err());
    }

    #[test]
    fn test_cli_parses_profile_command() {
        let cli = Cli::parse_from([
            "dbprofiler",
            "--database-url",
            "postgres://localhost/db",
            "profile",
            "public",
            "users",
            "--check",
            "email=.+",
            "--histogram",
            "score",
            "--bins",
            "12",
        ]);

        match cli.command {
            Command::Profile(args) => {
                assert_eq!(args.schema, "public");
                assert_eq!(args.table, "users");
                assert_eq!(args.check.as_deref(), Some("email=.+"));
                assert_eq!(args.histogram.as_deref(), Some("score"));
                assert_eq!(args.bins, 12);
            }
            _ => panic!("expected profile command"),
        }
    }
}
