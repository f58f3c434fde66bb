//! Error taxonomy for the sync pipeline.
//!
//! Two classes of failure exist: source-integrity errors (external tool
//! failures, unbalanced statements) which must abort before any write, and
//! per-record extraction problems which are logged and skipped in `docs`.

use std::path::PathBuf;
use std::process::ExitStatus;
use thiserror::Error;

use crate::scan::ScanError;

/// Fatal pipeline errors. Any of these prevents mutation of the bindings file.
#[derive(Error, Debug)]
pub enum SyncError {
    /// An external collaborator (doc generator, formatter) could not be spawned.
    #[error("failed to launch `{tool}`: {source}")]
    ToolLaunch {
        tool: String,
        source: std::io::Error,
    },

    /// An external collaborator exited with a non-zero status.
    #[error("`{tool}` exited with {status}")]
    ToolFailed { tool: String, status: ExitStatus },

    /// The doc generator ran but its output directory holds no records.
    #[error("doc generator succeeded but produced no XML records in {}", dir.display())]
    NoRecords { dir: PathBuf },

    /// A binding statement never closes — halting beats emitting corrupt source.
    #[error("unparsable call site: {0}")]
    UnparsableCallSite(#[from] ScanError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
