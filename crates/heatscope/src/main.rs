use anyhow::Context;
use clap::Parser;
use heatscope::cli::{Cli, Command, ViewArgs};
use heatscope::error::exit_code;
use std::process::ExitCode;

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::from(exit_code::SUCCESS as u8),
        Err(e) => {
            eprintln!("Error: {e:#}");
            if let Some(err) = e.downcast_ref::<heatscope::Error>() {
                ExitCode::from(err.exit_code() as u8)
            } else {
                ExitCode::from(exit_code::GENERAL_ERROR as u8)
            }
        }
    }
}

fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();

    cli.validate().context("Invalid arguments")?;

    let _log_guard = heatscope::logging::init(&cli.log_file, cli.verbose)
        .with_context(|| format!("Failed to open log file {}", cli.log_file.display()))?;

    match &cli.command {
        Some(Command::View { args, actions_out }) => {
            heatscope::commands::view::run(&cli.db, args, actions_out.as_deref())?;
        }
        Some(Command::Dump { args, json, csv }) => {
            heatscope::commands::dump::run(&cli.db, args, *json, *csv)?;
        }
        Some(Command::Query { sql }) => {
            heatscope::commands::query::run(&cli.db, sql)?;
        }
        Some(Command::Seed {
            span,
            rate,
            cluster,
            seed,
        }) => {
            heatscope::commands::seed::run(&cli.db, *span, *rate, cluster, *seed)?;
        }
        Some(Command::Completions { shell }) => {
            use clap::CommandFactory;
            let mut cmd = Cli::command();
            clap_complete::generate(*shell, &mut cmd, "heatscope", &mut std::io::stdout());
        }
        None => {
            heatscope::commands::view::run(&cli.db, &ViewArgs::default(), None)?;
        }
    }

    Ok(())
}
