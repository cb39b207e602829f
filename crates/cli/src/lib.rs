//! Command line interface for ausdex.

use clap::{ArgAction, CommandFactory, Parser, Subcommand};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::prelude::*;

mod common;
mod docs;
mod inflation;
mod plot;
mod repo;
mod seifa_vic;

pub use common::run_cli_async;

/// Crates whose logs a plain `AUSDEX_LOG` level applies to
const LOG_TARGETS: [&str; 3] = ["ausdex_cli", "ausdex_core", "ausdex_common"];

#[derive(Parser, Debug)]
#[command(
    name = "ausdex",
    version,
    disable_version_flag = true,
    about = "Australian economic indexes: CPI inflation adjustment and SEIFA scores"
)]
struct Cli {
    #[allow(dead_code)]
    #[arg(short = 'v', long = "version", action = ArgAction::Version, help = "Print version")]
    version: (),

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Adjust a dollar value for inflation
    Inflation(inflation::InflationArgs),
    /// Plot what a dollar value is worth over time
    PlotInflation(plot::PlotInflationArgs),
    /// Plot the consumer price index over time
    PlotCpi(plot::PlotCpiArgs),
    /// Plot the annual percentage change in the CPI
    PlotCpiChange(plot::PlotCpiArgs),
    /// SEIFA scores for Victorian suburbs
    #[command(subcommand)]
    SeifaVic(SeifaVicCommands),
    /// Open the documentation
    Docs(docs::DocsArgs),
    /// Open the source code repository in a browser
    Repo,
}

#[derive(Subcommand, Debug)]
enum SeifaVicCommands {
    /// Interpolate a SEIFA score for a suburb at a year
    Interpolate(seifa_vic::InterpolateArgs),
    /// Build the preprocessed SEIFA table from an overlay table
    Build(seifa_vic::BuildArgs),
}

/// Parse `args` (including the program name), run the command and return the exit code.
pub fn run_cli(args: Vec<String>) -> i32 {
    init_tracing();

    let runtime = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(err) => {
            eprintln!("Failed to create tokio runtime: {err}");
            return 1;
        }
    };

    runtime.block_on(dispatch(args))
}

async fn dispatch(args: Vec<String>) -> i32 {
    match Cli::try_parse_from(args) {
        Ok(cli) => match cli.command {
            Some(Commands::Inflation(args)) => inflation::run(args).await,
            Some(Commands::PlotInflation(args)) => plot::run_inflation(args).await,
            Some(Commands::PlotCpi(args)) => plot::run_cpi(args).await,
            Some(Commands::PlotCpiChange(args)) => plot::run_cpi_change(args).await,
            Some(Commands::SeifaVic(seifa_cmd)) => match seifa_cmd {
                SeifaVicCommands::Interpolate(args) => seifa_vic::run_interpolate(args).await,
                SeifaVicCommands::Build(args) => seifa_vic::run_build(args).await,
            },
            Some(Commands::Docs(args)) => docs::run(args).await,
            Some(Commands::Repo) => repo::run().await,
            None => {
                let mut cmd = Cli::command();
                let _ = cmd.print_help();
                println!();
                0
            }
        },
        Err(e) => {
            let code = e.exit_code();
            let _ = e.print();
            code
        }
    }
}

fn init_tracing() {
    // AUSDEX_LOG takes a level ("debug") or a full filter spec ("ausdex_core=debug,reqwest=info")
    let filter = match std::env::var("AUSDEX_LOG") {
        Ok(level) if is_plain_level(&level) => level_filter(&level),
        Ok(spec) => spec,
        Err(_) => level_filter("warn"),
    };

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_filter(EnvFilter::new(filter));

    if tracing_subscriber::registry()
        .with(fmt_layer)
        .try_init()
        .is_err()
    {
        eprintln!("Warning: tracing subscriber already initialized");
    }
}

fn level_filter(level: &str) -> String {
    LOG_TARGETS
        .iter()
        .map(|target| format!("{target}={level}"))
        .collect::<Vec<_>>()
        .join(",")
}

fn is_plain_level(s: &str) -> bool {
    matches!(
        s.to_ascii_lowercase().as_str(),
        "trace" | "debug" | "info" | "warn" | "error"
    )
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic, clippy::float_cmp)]
mod tests {
    use super::*;
    use clap::error::ErrorKind;

    fn parse(args: &[&str]) -> Result<Cli, clap::Error> {
        Cli::try_parse_from(std::iter::once("ausdex").chain(args.iter().copied()))
    }

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_version_flags() {
        for flag in ["-v", "--version"] {
            let err = parse(&[flag]).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::DisplayVersion);
        }
    }

    #[test]
    fn test_inflation_args() {
        let cli = parse(&[
            "inflation",
            "13",
            "March 1991",
            "--evaluation-date",
            "June 2010",
            "--location",
            "sydney",
        ])
        .unwrap();
        match cli.command {
            Some(Commands::Inflation(args)) => {
                assert_eq!(args.value, 13.0);
                assert_eq!(args.original_date, "March 1991");
                assert_eq!(args.evaluation_date.as_deref(), Some("June 2010"));
                assert_eq!(args.location, ausdex_common::Location::Sydney);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_unknown_location_rejected() {
        let err = parse(&["inflation", "1", "2000", "--location", "Auckland"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ValueValidation);
    }

    #[test]
    fn test_plot_show_flags() {
        let cli = parse(&["plot-cpi", "--no-show", "--location", "Perth", "--location", "Hobart"])
            .unwrap();
        match cli.command {
            Some(Commands::PlotCpi(args)) => {
                assert!(!args.output.show());
                assert_eq!(args.location.len(), 2);
            }
            other => panic!("unexpected command: {other:?}"),
        }

        let cli = parse(&["plot-cpi-change", "--no-show", "--show"]).unwrap();
        match cli.command {
            Some(Commands::PlotCpiChange(args)) => assert!(args.output.show()),
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_seifa_interpolate_args() {
        let cli = parse(&[
            "seifa-vic",
            "interpolate",
            "2020",
            "ascot",
            "ier_score",
            "--lga",
            "ballarat",
            "--fill-value",
            "boundary_value",
        ])
        .unwrap();
        match cli.command {
            Some(Commands::SeifaVic(SeifaVicCommands::Interpolate(args))) => {
                assert_eq!(args.metric, ausdex_core::Metric::Ier);
                assert_eq!(args.fill_value, ausdex_core::FillValue::BoundaryValue);
                assert_eq!(args.lga.as_deref(), Some("ballarat"));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_level_filter() {
        assert_eq!(
            level_filter("debug"),
            "ausdex_cli=debug,ausdex_core=debug,ausdex_common=debug"
        );
        assert!(is_plain_level("WARN"));
        assert!(!is_plain_level("ausdex_core=debug"));
    }
}
