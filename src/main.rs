//! defsync — synchronize generated API documentation into wrapper bindings.
//!
//! Keeps two independently-maintained artifacts consistent: the native API
//! docs (Doxygen XML) and the exposed wrapper call sites (`.def("name", ...)`
//! declarations). One batch pass per run:
//!
//! 1. **generate** — invoke the doc generator (fatal on failure)
//! 2. **extract** — build the documentation index from its XML records
//! 3. **patch** — locate call sites, insert/update docstring literals
//! 4. **format** — pipe the result through the source formatter
//! 5. **write** — persist only when the formatted text really differs
//!
//! `sync --check` performs the same computation without writing and exits 1
//! when changes are pending, 2 on any fatal tool/parse error — for CI gating.

mod arity;
mod bindings;
mod docs;
mod error;
mod inspect;
mod patch;
mod pipeline;
mod scan;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use pipeline::{SyncOptions, SyncReport};

#[derive(Parser)]
#[command(
    name = "defsync",
    about = "Synchronize generated API documentation into wrapper binding declarations"
)]
struct Cli {
    #[command(subcommand)]
    command: Cmd,

    /// Enable debug-level diagnostics
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Cmd {
    /// Regenerate docs, patch binding docstrings, format, write if changed
    Sync {
        /// Wrapper source file containing the .def("name", ...) declarations
        #[arg(long)]
        bindings: PathBuf,

        /// Target class whose documentation is synchronized
        #[arg(long)]
        class: String,

        /// Directory the doc generator writes XML records into
        #[arg(long = "xml-dir")]
        xml_dir: PathBuf,

        /// Generator config file, appended to the generator command line
        #[arg(long)]
        doxyfile: Option<PathBuf>,

        /// Marker token anchoring the docstring literal in each call site
        #[arg(long, default_value = "RGIL")]
        marker: String,

        /// Doc generator command
        #[arg(long = "doc-generator", default_value = "doxygen")]
        doc_generator: String,

        /// Source formatter command (reads stdin, writes stdout)
        #[arg(long, default_value = "clang-format --style=file")]
        formatter: String,

        /// Reuse existing XML records instead of running the generator
        #[arg(long = "skip-generate")]
        skip_generate: bool,

        /// Compute changes but never write; exit 1 if changes are pending
        #[arg(long)]
        check: bool,

        /// Print the report as JSON on stdout
        #[arg(long)]
        json: bool,
    },

    /// List existing docstring literals with their line/column spans
    Inspect {
        /// Binding source file to scan
        file: PathBuf,

        /// Directory for resolving #include "..." fragments (repeatable)
        #[arg(short = 'I', long = "include-dir")]
        include_dirs: Vec<PathBuf>,

        /// Marker token anchoring the docstring literal
        #[arg(long, default_value = "RGIL")]
        marker: String,

        /// Print entries as JSON on stdout
        #[arg(long)]
        json: bool,
    },
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let code = match run(cli.command) {
        Ok(code) => code,
        Err(e) => {
            error!("{e:#}");
            2
        }
    };
    std::process::exit(code);
}

fn run(cmd: Cmd) -> Result<i32> {
    match cmd {
        Cmd::Sync {
            bindings,
            class,
            xml_dir,
            doxyfile,
            marker,
            doc_generator,
            formatter,
            skip_generate,
            check,
            json,
        } => {
            let opts = SyncOptions {
                bindings,
                class,
                xml_dir,
                doxyfile,
                marker,
                doc_generator,
                formatter,
                skip_generate,
                check,
            };
            let report = pipeline::run(&opts)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                log_report(&report);
            }
            Ok(if check && report.pending() { 1 } else { 0 })
        }

        Cmd::Inspect {
            file,
            include_dirs,
            marker,
            json,
        } => {
            let entries = inspect::inspect_file(&file, &include_dirs, &marker)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&entries)?);
            } else {
                for e in &entries {
                    println!(
                        "{}:{}:{}-{}:{}  {}  {:?}",
                        e.file, e.line, e.column, e.end_line, e.end_column, e.binding, e.text
                    );
                }
            }
            Ok(0)
        }
    }
}

fn log_report(report: &SyncReport) {
    if !report.added.is_empty() {
        info!("added docstrings to:");
        for name in &report.added {
            info!("  {name}");
        }
    }
    if !report.updated.is_empty() {
        info!("updated docstrings for:");
        for name in &report.updated {
            info!("  {name}");
        }
    }
    if !report.skipped.is_empty() {
        info!("{} sites without matching documentation", report.skipped.len());
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "defsync=debug" } else { "defsync=info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}
