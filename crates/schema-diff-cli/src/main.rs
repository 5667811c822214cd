//! schema-diff CLI - compare two relational schemas and generate migration DDL.

mod prompt;

use clap::{Args, Parser, Subcommand, ValueEnum};
use colored::Colorize;
use schema_diff::{
    compare_refs, to_mariadb, to_postgres, ConnectionRef, DiffError, DiffResult, Direction,
    GenerateOptions, NormalizeOptions,
};
use std::path::PathBuf;
use std::process::ExitCode;
use tokio_util::sync::CancellationToken;
use tracing::{info, Level};

#[derive(Parser)]
#[command(name = "schema-diff")]
#[command(about = "Compare two PostgreSQL/MariaDB schemas and generate migration DDL")]
#[command(version)]
struct Cli {
    /// Log format: text or json
    #[arg(long, default_value = "text")]
    log_format: String,

    /// Log verbosity: debug, info, warn, error
    #[arg(long, default_value = "warn")]
    verbosity: String,

    #[command(subcommand)]
    command: Commands,
}

/// Connection arguments shared by every subcommand.
#[derive(Args)]
struct ConnArgs {
    /// Connection URL of the A side:
    /// {postgres|mariadb}://user[:pass]@host[:port]/db?schema=NAME[&ssl=true]
    #[arg(long)]
    from: String,

    /// Connection URL of the B side
    #[arg(long)]
    to: String,

    /// Schema name applied to both sides (overrides ?schema= in the URLs)
    #[arg(long)]
    schema: Option<String>,

    /// Canonicalize default expressions before diffing
    #[arg(long)]
    normalize_defaults: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Compare two schemas and print the diff
    Compare {
        #[command(flatten)]
        conn: ConnArgs,

        /// Emit the diff and summary as JSON
        #[arg(long)]
        json: bool,
    },

    /// Generate a migration script from the comparison
    Generate {
        #[command(flatten)]
        conn: ConnArgs,

        /// Target dialect for the generated script
        #[arg(long, value_enum)]
        target: Target,

        /// Which side the script treats as the desired end state
        #[arg(long, value_enum, default_value = "AtoB")]
        direction: DirectionArg,

        /// Bracket the script in a transaction
        #[arg(long)]
        with_transaction: bool,

        /// Emit destructive statements commented out
        #[arg(long)]
        safe: bool,

        /// Append CASCADE to drops where the dialect supports it
        #[arg(long)]
        cascade: bool,

        /// Emit IF EXISTS on drops
        #[arg(long)]
        if_exists: bool,

        /// Also write the script to this file
        #[arg(long)]
        out: Option<PathBuf>,
    },

    /// Emit a Markdown review prompt for the comparison
    Prompt {
        #[command(flatten)]
        conn: ConnArgs,

        /// Target dialect for the DDL snippet
        #[arg(long, value_enum, default_value = "postgres")]
        target: Target,

        /// Which side the DDL snippet treats as the desired end state
        #[arg(long, value_enum, default_value = "AtoB")]
        direction: DirectionArg,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Target {
    Postgres,
    Mariadb,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum DirectionArg {
    #[value(name = "AtoB")]
    AToB,
    #[value(name = "BtoA")]
    BToA,
}

impl From<DirectionArg> for Direction {
    fn from(arg: DirectionArg) -> Self {
        match arg {
            DirectionArg::AToB => Direction::AtoB,
            DirectionArg::BToA => Direction::BtoA,
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}", e.format_detailed().red());
            ExitCode::from(e.exit_code())
        }
    }
}

async fn run() -> Result<(), DiffError> {
    let cli = Cli::parse();

    setup_logging(&cli.verbosity, &cli.log_format)
        .map_err(|e| DiffError::Config(e.to_string()))?;

    let cancel = setup_signal_handler();

    match cli.command {
        Commands::Compare { conn, json } => {
            let diff = load_diff(&conn, &cancel).await?;
            if json {
                let summary = diff.summary();
                let doc = serde_json::json!({
                    "diff": diff,
                    "summary": summary,
                });
                println!("{}", serde_json::to_string_pretty(&doc)?);
            } else {
                print_summary(&diff);
            }
        }

        Commands::Generate {
            conn,
            target,
            direction,
            with_transaction,
            safe,
            cascade,
            if_exists,
            out,
        } => {
            let diff = load_diff(&conn, &cancel).await?;
            let opts = GenerateOptions {
                direction: direction.into(),
                with_transaction,
                safe_mode: safe,
                cascade,
                if_exists,
            };
            let script = match target {
                Target::Postgres => to_postgres(&diff, &opts),
                Target::Mariadb => to_mariadb(&diff, &opts),
            };

            println!("{}", script);
            if let Some(path) = out {
                std::fs::write(&path, &script)?;
                info!("Wrote script to {:?}", path);
            }
        }

        Commands::Prompt {
            conn,
            target,
            direction,
        } => {
            let diff = load_diff(&conn, &cancel).await?;
            let opts = GenerateOptions {
                direction: direction.into(),
                ..GenerateOptions::default()
            };
            let script = match target {
                Target::Postgres => to_postgres(&diff, &opts),
                Target::Mariadb => to_mariadb(&diff, &opts),
            };
            let diff_json = serde_json::to_string_pretty(&diff)?;
            println!("{}", prompt::build_review_prompt(&diff_json, &script));
        }
    }

    Ok(())
}

/// Resolve both connection descriptors and run the comparison pipeline.
async fn load_diff(conn: &ConnArgs, cancel: &CancellationToken) -> Result<DiffResult, DiffError> {
    let mut from = ConnectionRef::from_url(&conn.from)?;
    let mut to = ConnectionRef::from_url(&conn.to)?;
    if let Some(schema) = &conn.schema {
        from = from.with_schema(schema.clone());
        to = to.with_schema(schema.clone());
    }
    // Fail on a missing or refused schema before opening any connection.
    from.validate()?;
    to.validate()?;

    let options = NormalizeOptions {
        normalize_defaults: conn.normalize_defaults,
        ..NormalizeOptions::default()
    };
    compare_refs(&from, &to, &options, cancel).await
}

fn print_summary(diff: &DiffResult) {
    let summary = diff.summary();
    let row = |name: &str, counts: schema_diff::diff::BucketCounts| {
        println!(
            "  {:<10} +{} -{} ~{}",
            name, counts.added, counts.removed, counts.changed
        );
    };
    if diff.is_empty() {
        println!("Schemas match.");
        return;
    }
    println!("Differences:");
    row("tables", summary.tables);
    row("views", summary.views);
    row("routines", summary.routines);
    row("triggers", summary.triggers);
}

/// Cancel the pipeline on Ctrl-C; a second signal kills the process.
fn setup_signal_handler() -> CancellationToken {
    let cancel = CancellationToken::new();
    let handler = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            handler.cancel();
        }
    });
    cancel
}

fn setup_logging(verbosity: &str, format: &str) -> Result<(), Box<dyn std::error::Error>> {
    let level = match verbosity {
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        other => return Err(format!("invalid verbosity '{}'", other).into()),
    };

    let builder = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr);

    match format {
        "json" => builder.json().init(),
        "text" => builder.init(),
        other => return Err(format!("invalid log format '{}'", other).into()),
    }

    Ok(())
}
