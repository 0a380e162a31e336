//! Scan every source, then render and write the registration file.

use std::path::{Path, PathBuf};

use anyhow::Context;
use libreg_codegen::{GeneratorOptions, generate};
use libreg_config::LibregConfig;
use libreg_core::{Diagnostics, RecorderCollection};
use libreg_parser::{FrontEnd, ScanOptions, ScanSession};
use serde::Serialize;

/// What one run produced.
#[derive(Debug)]
pub struct RunSummary {
    pub files: usize,
    pub functions: u32,
    pub errors: usize,
    /// False when an entry was invalidated or an error was reported.
    pub clean: bool,
    /// Set once the generated source has been written to a file.
    pub written: Option<PathBuf>,
}

#[derive(Serialize)]
struct RegistryDump<'a> {
    registry: &'a RecorderCollection,
    diagnostics: &'a Diagnostics,
}

/// Run the whole pipeline.
///
/// The generated source goes to `output`, or to stdout when `None`. Nothing
/// is written when the scan is not clean.
///
/// # Errors
/// Fails on unreadable inputs, invalid generator options, or write errors.
/// Scan problems are not errors: they are counted in the summary.
pub fn run(
    sources: &[PathBuf],
    config: &LibregConfig,
    output: Option<&Path>,
    dump_json: Option<&Path>,
) -> anyhow::Result<RunSummary> {
    let front = front_end(config)?;
    let mut session = ScanSession::new(config.scan.macro_prefix.as_str());

    for source in sources {
        front
            .scan_path(&mut session, source)
            .with_context(|| format!("failed to scan {}", source.display()))?;
    }

    let clean = session.is_clean();
    let (collection, diagnostics) = session.into_parts();
    tracing::info!(
        files = sources.len(),
        functions = collection.function_count(),
        errors = diagnostics.error_count(),
        "scan finished"
    );

    if let Some(path) = dump_json {
        let dump = RegistryDump {
            registry: &collection,
            diagnostics: &diagnostics,
        };
        let json = serde_json::to_string_pretty(&dump).context("failed to serialize registry")?;
        std::fs::write(path, json)
            .with_context(|| format!("failed to write {}", path.display()))?;
    }

    let mut summary = RunSummary {
        files: sources.len(),
        functions: collection.function_count(),
        errors: diagnostics.error_count(),
        clean,
        written: None,
    };
    if !clean {
        return Ok(summary);
    }

    let options = generator_options(config);
    options.validate()?;
    let text = generate(&collection, &options)?;

    match output {
        Some(path) => {
            std::fs::write(path, text)
                .with_context(|| format!("failed to write {}", path.display()))?;
            tracing::debug!(path = %path.display(), "registration source written");
            summary.written = Some(path.to_path_buf());
        }
        None => print!("{text}"),
    }
    Ok(summary)
}

fn front_end(config: &LibregConfig) -> anyhow::Result<FrontEnd> {
    let mut front = FrontEnd::new(ScanOptions {
        state_type: config.scan.state_type_filter().map(str::to_string),
    });
    for header in &config.scan.type_headers {
        front
            .add_type_header_file(header)
            .with_context(|| format!("failed to load type header {}", header.display()))?;
    }
    Ok(front)
}

fn generator_options(config: &LibregConfig) -> GeneratorOptions {
    GeneratorOptions {
        includes: config.output.includes.clone(),
        entry_point: config.output.entry_point.clone(),
        register_prefix: config.output.register_prefix.clone(),
        skip_foreign_registration: config.output.skip_foreign_registration,
    }
}
