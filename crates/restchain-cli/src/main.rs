//! restchain - Chained REST-query metadata extraction CLI

use std::io::Write;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use restchain_core::{CancelToken, ExecMode, ExecOptions, FailurePolicy};
use restchain_mode::{DashboardMetadata, ModeArgs, ModeConfig, ModeDashboardExtractor};

#[derive(Parser)]
#[command(name = "restchain")]
#[command(about = "Chained REST-query metadata extraction")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Suppress info logs (only warnings and errors)
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Enable debug logging
    #[arg(long, global = true)]
    debug: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Extract Mode dashboard metadata as NDJSON
    Dashboards(DashboardArgs),
}

#[derive(Parser)]
struct DashboardArgs {
    /// Mode organization (or MODE_ORGANIZATION env var)
    #[arg(long)]
    organization: Option<String>,

    /// Mode API user token (or MODE_USER_TOKEN env var)
    #[arg(long)]
    user_token: Option<String>,

    /// Mode API password token (or MODE_PASSWORD_TOKEN env var)
    #[arg(long)]
    password_token: Option<String>,

    /// Output file (default: stdout)
    #[arg(long)]
    output: Option<PathBuf>,

    /// Fetch child calls for this many parent records in parallel
    /// (0 = sequential)
    #[arg(long, default_value_t = 0)]
    workers: usize,

    /// Log and skip per-record HTTP/projection failures instead of aborting
    #[arg(long)]
    skip_errors: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    restchain_core::init_logging(cli.quiet, cli.debug);

    match cli.command {
        Command::Dashboards(args) => run_dashboards(args),
    }
}

fn run_dashboards(args: DashboardArgs) -> Result<()> {
    let config = ModeConfig::try_from(ModeArgs {
        organization: args.organization,
        user_token: args.user_token,
        password_token: args.password_token,
    })?;

    let failure_policy = if args.skip_errors {
        FailurePolicy::SkipAndWarn
    } else {
        FailurePolicy::Abort
    };
    let extractor = ModeDashboardExtractor::new(&config, failure_policy)?;

    let options = ExecOptions {
        mode: if args.workers > 1 {
            ExecMode::Concurrent {
                workers: args.workers,
            }
        } else {
            ExecMode::Sequential
        },
        cancel: CancelToken::new(),
    };

    let mut out: Box<dyn Write> = match &args.output {
        Some(path) => Box::new(std::io::BufWriter::new(
            std::fs::File::create(path)
                .with_context(|| format!("Cannot create {}", path.display()))?,
        )),
        None => Box::new(std::io::BufWriter::new(std::io::stdout())),
    };

    log::info!("Extracting dashboards for organization '{}'", config.organization);
    let mut count = 0usize;
    for dashboard in extractor.extract(options) {
        let dashboard: DashboardMetadata = dashboard?;
        serde_json::to_writer(&mut out, &dashboard).context("Cannot serialize dashboard")?;
        out.write_all(b"\n").context("Cannot write output")?;
        count += 1;
    }
    out.flush().context("Cannot flush output")?;
    log::info!("Extracted {count} dashboards");

    Ok(())
}
