use anyhow::Context;
use clap::Parser;
use profkit::cli::{Cli, Command};
use profkit::error::exit_code;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

profkit_trace::profiler!();

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::from(exit_code::SUCCESS as u8),
        Err(e) => {
            eprintln!("Error: {e:#}");
            if let Some(profkit_err) = e.downcast_ref::<profkit::Error>() {
                ExitCode::from(profkit_err.exit_code() as u8)
            } else if e.downcast_ref::<InvalidArguments>().is_some() {
                ExitCode::from(exit_code::INVALID_ARGUMENTS as u8)
            } else {
                ExitCode::from(exit_code::GENERAL_ERROR as u8)
            }
        }
    }
}

/// Argument combinations clap itself cannot reject
#[derive(Debug, thiserror::Error)]
#[error("{0}")]
struct InvalidArguments(String);

fn init_logging(cli: &Cli) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(cli.default_log_filter()));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(&cli);

    // Validate CLI arguments
    cli.validate()
        .map_err(InvalidArguments)
        .context("Invalid arguments")?;

    match cli.command {
        Command::Seed { store, force } => {
            profkit::commands::seed::run(&store.to_config(), force)
                .context("Failed to seed credential store")?;
        }
        Command::Login {
            store,
            cases,
            seed,
            lines,
            compare_schemes,
            sort,
            top,
            output,
        } => {
            let options = profkit::commands::login::LoginOptions {
                cases,
                seed,
                lines,
                compare_schemes,
                sort,
                top,
            };
            let output = profkit::commands::profile_path(output, "login");
            profkit::commands::login::run(&store.to_config(), &options, output.as_deref())
                .context("Login workload failed")?;
        }
        Command::Encode {
            events,
            stream,
            top,
            output,
        } => {
            let output = profkit::commands::profile_path(output, "encode");
            profkit::commands::encode::run(events, stream.as_deref(), top, output.as_deref())
                .context("Encode workload failed")?;
        }
        Command::Timeit {
            number,
            repeat,
            budget,
        } => {
            profkit::commands::timeit::run(number, repeat, budget)?;
        }
        Command::Top {
            metric,
            file,
            top,
            sort,
            json,
            csv,
        } => {
            profkit::commands::top::run(&file, metric, top, sort, json, csv)?;
        }
        Command::Query { file, sql } => {
            profkit::commands::query::run(&file, &sql)?;
        }
        Command::List { dir } => {
            profkit::commands::list::run(dir.as_deref())?;
        }
        Command::Completions { shell } => {
            use clap::CommandFactory;
            let mut cmd = Cli::command();
            clap_complete::generate(shell, &mut cmd, "profkit", &mut std::io::stdout());
        }
    }

    Ok(())
}
