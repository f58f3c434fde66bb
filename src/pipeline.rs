//! The sync orchestrator: one batch pass wiring extraction, location and
//! patching together, with the two external collaborators at either end.
//!
//! All mutation is deferred to the very last step — any tool failure or
//! unparsable statement aborts before the bindings file is touched, so a
//! partially-run pipeline never leaves output behind.

use serde::Serialize;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use tracing::{debug, info, warn};

use crate::bindings::{BindingLocator, CallSite};
use crate::docs::{DocExtractor, DocIndex};
use crate::error::SyncError;
use crate::patch::{self, Outcome};

/// Configuration for one sync run.
pub struct SyncOptions {
    /// Wrapper source file with the `.def("name", ...)` declarations.
    pub bindings: PathBuf,
    /// Target class whose documentation is synchronized.
    pub class: String,
    /// Directory the doc generator writes XML records into.
    pub xml_dir: PathBuf,
    /// Generator config file, appended to the generator command line.
    pub doxyfile: Option<PathBuf>,
    /// Token anchoring the docstring literal inside each call site.
    pub marker: String,
    /// Doc generator command line (whitespace-split).
    pub doc_generator: String,
    /// Source formatter command line (whitespace-split); reads stdin,
    /// writes stdout.
    pub formatter: String,
    /// Reuse existing XML records instead of running the generator.
    pub skip_generate: bool,
    /// Compute everything but never write.
    pub check: bool,
}

/// Structured outcome of a run. The caller decides how (or whether) to
/// print it; exit-code policy lives in the binary.
#[derive(Debug, Default, Serialize)]
pub struct SyncReport {
    /// Binding names that received a new docstring literal.
    pub added: Vec<String>,
    /// Binding names whose stale literal was replaced.
    pub updated: Vec<String>,
    /// Binding names left untouched for lack of a symbol or documentation.
    pub skipped: Vec<String>,
    /// Whether the bindings file was rewritten.
    pub wrote: bool,
}

impl SyncReport {
    /// True when an effective change exists (or would exist in check mode).
    pub fn pending(&self) -> bool {
        !self.added.is_empty() || !self.updated.is_empty()
    }
}

/// Execute one full sync pass.
pub fn run(opts: &SyncOptions) -> Result<SyncReport, SyncError> {
    if opts.skip_generate {
        debug!("reusing existing records in {}", opts.xml_dir.display());
    } else {
        generate_docs(opts)?;
    }

    let index = DocExtractor::new(&opts.class).extract_dir(&opts.xml_dir);
    if index.is_empty() {
        warn!("no documentation collected for {} - nothing to patch", opts.class);
        return Ok(SyncReport::default());
    }
    info!("collected {} documented {} entries", index.len(), opts.class);

    let original = std::fs::read_to_string(&opts.bindings)?;
    let sites = BindingLocator::new(&opts.marker).locate(&original)?;
    let (patched, mut report) = apply_patches(&original, &sites, &index, &opts.marker);

    if patched == original {
        info!("no changes needed in {}", opts.bindings.display());
        return Ok(report);
    }

    let formatted = format_source(&opts.formatter, &patched)?;
    if formatted == original {
        // formatting-only churn: every pending change was whitespace
        info!(
            "no effective changes after formatting in {}",
            opts.bindings.display()
        );
        report.added.clear();
        report.updated.clear();
        return Ok(report);
    }

    if opts.check {
        info!(
            "{} pending docstring changes in {} (check mode, not writing)",
            report.added.len() + report.updated.len(),
            opts.bindings.display()
        );
    } else {
        std::fs::write(&opts.bindings, &formatted)?;
        report.wrote = true;
        info!(
            "updated {} ({} new, {} updated docstrings)",
            opts.bindings.display(),
            report.added.len(),
            report.updated.len()
        );
    }
    Ok(report)
}

/// Patch every located site and splice the results back into the source.
/// Pure text-to-text; the gaps between sites are carried over byte-exact.
pub fn apply_patches(
    source: &str,
    sites: &[CallSite],
    index: &DocIndex,
    marker: &str,
) -> (String, SyncReport) {
    let mut out = String::with_capacity(source.len() + 4096);
    let mut report = SyncReport::default();
    let mut cursor = 0;

    for site in sites {
        out.push_str(&source[cursor..site.start]);
        let patched = patch::patch_site(site, index, marker);
        match patched.outcome {
            Outcome::Added => report.added.push(site.binding_name.clone()),
            Outcome::Updated => report.updated.push(site.binding_name.clone()),
            Outcome::Skipped => report.skipped.push(site.binding_name.clone()),
            Outcome::Unchanged => {}
        }
        debug!("{}: {}", site.binding_name, patched.outcome);
        out.push_str(&patched.text);
        cursor = site.end;
    }
    out.push_str(&source[cursor..]);
    (out, report)
}

/// Run the external doc generator; fatal on any failure, and fatal if it
/// succeeds without producing records.
fn generate_docs(opts: &SyncOptions) -> Result<(), SyncError> {
    let (program, args) = split_command(&opts.doc_generator);
    let mut cmd = Command::new(program);
    cmd.args(args);
    if let Some(doxyfile) = &opts.doxyfile {
        cmd.arg(doxyfile);
        // generators resolve relative paths against their config file
        if let Some(dir) = doxyfile.parent().filter(|d| !d.as_os_str().is_empty()) {
            cmd.current_dir(dir);
        }
    }

    info!("running doc generator: {}", opts.doc_generator);
    let status = cmd.status().map_err(|source| SyncError::ToolLaunch {
        tool: program.to_string(),
        source,
    })?;
    if !status.success() {
        return Err(SyncError::ToolFailed {
            tool: program.to_string(),
            status,
        });
    }

    if !has_records(&opts.xml_dir) {
        return Err(SyncError::NoRecords {
            dir: opts.xml_dir.clone(),
        });
    }
    Ok(())
}

fn has_records(dir: &Path) -> bool {
    glob::glob(&dir.join("*.xml").to_string_lossy())
        .map(|mut paths| paths.any(|p| p.is_ok()))
        .unwrap_or(false)
}

/// Pipe `text` through the formatter command, returning its stdout.
fn format_source(formatter: &str, text: &str) -> Result<String, SyncError> {
    let (program, args) = split_command(formatter);
    let launch = |source| SyncError::ToolLaunch {
        tool: program.to_string(),
        source,
    };

    let mut child = Command::new(program)
        .args(args)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .spawn()
        .map_err(launch)?;

    // write on a separate thread so a formatter that streams output early
    // cannot deadlock against a full stdin pipe
    let mut stdin = child.stdin.take().expect("stdin was piped");
    let input = text.as_bytes().to_vec();
    let writer = std::thread::spawn(move || stdin.write_all(&input));

    let output = child.wait_with_output().map_err(launch)?;
    writer
        .join()
        .expect("stdin writer panicked")
        .map_err(launch)?;

    if !output.status.success() {
        return Err(SyncError::ToolFailed {
            tool: program.to_string(),
            status: output.status,
        });
    }
    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

/// Split a command-line option value into program and arguments.
fn split_command(cmd: &str) -> (&str, Vec<&str>) {
    let mut parts = cmd.split_whitespace();
    let program = parts.next().unwrap_or(cmd);
    (program, parts.collect())
}
