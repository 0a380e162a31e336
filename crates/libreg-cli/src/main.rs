use std::process::ExitCode;

use clap::Parser;
use libreg_config::LibregConfig;

mod cli;
mod pipeline;

fn main() -> ExitCode {
    match run() {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(error) => {
            eprintln!("libreg error: {error:#}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> anyhow::Result<bool> {
    let cli = cli::Cli::parse();
    init_tracing(cli.quiet, cli.verbose)?;

    let mut config = LibregConfig::load(cli.config.as_deref())?;
    cli.apply_to(&mut config);
    config.validate()?;

    let summary = pipeline::run(
        &cli.sources,
        &config,
        cli.output.as_deref(),
        cli.dump_json.as_deref(),
    )?;

    if summary.clean {
        if let Some(path) = &summary.written {
            tracing::info!(
                functions = summary.functions,
                path = %path.display(),
                "registration source generated"
            );
        }
        return Ok(true);
    }

    eprintln!(
        "libreg: {} error(s) in {} file(s); registration source not written",
        summary.errors, summary.files
    );
    Ok(false)
}

fn init_tracing(quiet: bool, verbose: bool) -> anyhow::Result<()> {
    let level = if quiet {
        "error"
    } else if verbose {
        "debug"
    } else {
        "warn"
    };

    let filter = tracing_subscriber::EnvFilter::try_from_env("LIBREG_LOG")
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|error| anyhow::anyhow!("failed to initialize tracing subscriber: {error}"))?;

    Ok(())
}
