use std::path::PathBuf;

use clap::Parser;
use libreg_config::LibregConfig;

/// Top-level CLI parser for the `libreg` binary.
#[derive(Debug, Parser)]
#[command(
    name = "libreg",
    version,
    about = "Scan annotated C library sources and generate registration code"
)]
pub struct Cli {
    /// Annotated C source files, scanned in the given order
    #[arg(required = true)]
    pub sources: Vec<PathBuf>,

    /// Write the generated source here instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Config file (defaults to ./libreg.toml)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Extra header included by the generated file (repeatable)
    #[arg(short = 'I', long = "include")]
    pub includes: Vec<String>,

    /// C header parsed only to resolve field accessor types (repeatable)
    #[arg(short, long = "types")]
    pub type_headers: Vec<PathBuf>,

    /// Annotation macro prefix
    #[arg(long)]
    pub macro_prefix: Option<String>,

    /// Parameter type of registered functions; empty accepts every function
    #[arg(long)]
    pub state_type: Option<String>,

    /// Name of the generated entry point
    #[arg(long)]
    pub entry_point: Option<String>,

    /// Leave cdata types out of the entry point
    #[arg(long)]
    pub skip_foreign_registration: bool,

    /// Also write the collected registry as JSON
    #[arg(long, value_name = "PATH")]
    pub dump_json: Option<PathBuf>,

    /// Quiet mode (errors only)
    #[arg(short, long, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Verbose mode (debug logging)
    #[arg(short, long)]
    pub verbose: bool,
}

impl Cli {
    /// Overlay the flags that were given on top of the loaded config.
    pub fn apply_to(&self, config: &mut LibregConfig) {
        if let Some(prefix) = &self.macro_prefix {
            config.scan.macro_prefix.clone_from(prefix);
        }
        if let Some(state_type) = &self.state_type {
            config.scan.state_type.clone_from(state_type);
        }
        config.scan.type_headers.extend(self.type_headers.iter().cloned());

        config.output.includes.extend(self.includes.iter().cloned());
        if let Some(entry_point) = &self.entry_point {
            config.output.entry_point.clone_from(entry_point);
        }
        if self.skip_foreign_registration {
            config.output.skip_foreign_registration = true;
        }
    }
}
