//! Ferry CLI: completeness checks and transfers of component version graphs.

mod commands;
mod config;

use std::path::PathBuf;
use std::process;

use clap::{ArgAction, Parser, Subcommand};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use ferry_check::CheckOptions;
use ferry_core::Printer;

#[derive(Parser)]
#[command(name = "ferry", version, about = "Check and transfer component version graphs")]
struct Cli {
    /// More log output (-v, -vv, -vvv)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,
    /// Only log errors and suppress progress output
    #[arg(short, long, global = true)]
    quiet: bool,
    /// Configuration file (default: nearest ferry.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check component versions for unresolvable references
    Check {
        /// Directory repository holding the component versions
        #[arg(long)]
        repo: PathBuf,
        /// Component versions to check (name:version); all if omitted
        roots: Vec<String>,
        /// Report resources whose content is not stored as a local blob
        #[arg(long)]
        local_resources: bool,
        /// Report sources whose content is not stored as a local blob
        #[arg(long)]
        local_sources: bool,
        /// Exit with an error if any component version is not OK
        #[arg(long)]
        fail_on_error: bool,
        /// Output format (table, wide, json)
        #[arg(short, long)]
        output: Option<String>,
        /// Additional repository to resolve references from (repeatable)
        #[arg(long, value_name = "DIR")]
        lookup: Vec<PathBuf>,
    },
    /// Transfer component versions into another repository
    Transfer {
        /// Source directory repository
        source: PathBuf,
        /// Target directory repository (created if missing)
        target: PathBuf,
        /// Component version to transfer (name:version); all if omitted
        #[arg(short = 'c', long = "component", value_name = "NAME:VERSION")]
        components: Vec<String>,
        /// Transfer referenced component versions too
        #[arg(short, long)]
        recursive: bool,
        /// Copy the content of all resources
        #[arg(long)]
        copy_resources: bool,
        /// Copy the content of resources with a local relation
        #[arg(long)]
        copy_local_resources: bool,
        /// Copy the content of all sources
        #[arg(long)]
        copy_sources: bool,
        /// Replace versions already present in the target
        #[arg(long)]
        overwrite: bool,
        /// Transfer even if versions are already present
        #[arg(long)]
        enforce: bool,
        /// Set a transfer option by name, e.g. keep-global-access or skip-update=false
        #[arg(short = 'o', long = "option", value_name = "NAME[=BOOL]")]
        options: Vec<String>,
        /// Additional repository to resolve references from (repeatable)
        #[arg(long, value_name = "DIR")]
        lookup: Vec<PathBuf>,
    },
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.quiet);

    let result = run(cli);
    if let Err(e) = result {
        eprintln!("error: {e:#}");
        process::exit(1);
    }
}

/// Logs go to stderr so they never mix with reports and progress output.
fn init_tracing(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("warn"),
            1 => EnvFilter::new("info"),
            2 => EnvFilter::new("debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .with(filter)
        .init();
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let cwd = std::env::current_dir()?;
    let quiet = cli.quiet;
    let (config, base) = config::load(cli.config.as_deref(), &cwd)?;
    let mut lookup = config.lookup_paths(&base);

    match cli.command {
        Commands::Check {
            repo,
            roots,
            local_resources,
            local_sources,
            fail_on_error,
            output,
            lookup: extra,
        } => {
            lookup.extend(extra);
            let options = CheckOptions::new()
                .local_resources(local_resources)
                .local_sources(local_sources);
            commands::check::run(
                &repo,
                &lookup,
                &roots,
                options,
                output.as_deref(),
                fail_on_error,
            )
        }

        Commands::Transfer {
            source,
            target,
            components,
            recursive,
            copy_resources,
            copy_local_resources,
            copy_sources,
            overwrite,
            enforce,
            options,
            lookup: extra,
        } => {
            lookup.extend(extra);
            let options = commands::transfer::apply_overrides(
                config.transfer,
                &[
                    ("recursive", recursive),
                    ("resources-by-value", copy_resources),
                    ("local-resources-by-value", copy_local_resources),
                    ("sources-by-value", copy_sources),
                    ("overwrite", overwrite),
                    ("enforce-transport", enforce),
                ],
                &options,
            )?;
            let printer = if quiet { Printer::null() } else { Printer::stdout() };
            let copied = commands::transfer::run(
                &source,
                &target,
                &lookup,
                &components,
                &options,
                printer,
            )?;
            if !quiet {
                println!("{} component version(s) transferred", copied.len());
            }
            Ok(())
        }
    }
}
