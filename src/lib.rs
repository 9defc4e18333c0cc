//! Files crash reports as GitHub issues.
//!
//! A host application loads its install with [`Reporter::from_install_dir`]
//! (which refuses to start on a missing, undecryptable or incomplete
//! configuration) and wraps its work in [`Reporter::run`]. Panics and errors
//! that escape are shown to the user, enriched with a diagnostic snapshot and
//! posted to the configured repository. When the tracker cannot be reached
//! the report is saved as a local JSON file instead.

pub mod collector;
pub mod config;
pub mod console;
pub mod delivery;
pub mod error;
pub mod fallback;
pub mod formatter;
pub mod incident;
pub mod logging;
pub mod secrets;
pub mod setup;
pub mod shell;

#[cfg(test)]
mod test_utils;

pub use config::{InstallPaths, ReporterConfig};
pub use delivery::{DeliveryFailure, DeliveryOutcome};
pub use error::{ReporterError, Result};
pub use incident::Incident;
pub use shell::Reporter;
