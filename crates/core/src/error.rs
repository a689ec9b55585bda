//! Error types for HDF scheduling.

use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

use crate::key::RateKey;

/// Result type alias for HDF scheduling operations.
pub type Result<T> = std::result::Result<T, HdfError>;

/// Main error type for HDF scheduling.
#[derive(Debug, Error, Diagnostic)]
pub enum HdfError {
    #[error("No valid schedule for unit '{unit}' under rates [{rates}]")]
    #[diagnostic(
        code(hdf::scheduling_inconsistency),
        help("the balance equations for these port rates have no periodic solution")
    )]
    SchedulingInconsistency {
        unit: String,
        rates: RateKey,
        #[source]
        source: ScheduleError,
    },

    #[error("Schedule of '{parent}' has no positive firing count for nested unit '{entity}'")]
    #[diagnostic(code(hdf::structural_inconsistency))]
    StructuralInconsistency { parent: String, entity: String },

    #[error("Unit '{unit}' contains no entity named '{entity}'")]
    EntityNotFound { unit: String, entity: String },

    #[error("'{owner}' has no port named '{port}'")]
    PortNotFound { owner: String, port: String },

    #[error("Mode controller '{unit}' has no mode named '{mode}'")]
    ModeNotFound { unit: String, mode: String },

    #[error("Mode controller '{0}' has no modes")]
    NoModes(String),

    #[error("Firing multiplier of '{entity}' inside '{unit}' overflows")]
    MultiplierOverflow { unit: String, entity: String },

    #[error("Failed to read file: {path}")]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid configuration: {0}")]
    Config(String),
}

/// Failure reported by a schedule provider.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScheduleError {
    /// The balance equations have no non-trivial solution.
    #[error("inconsistent rates: {0}")]
    Inconsistent(String),

    /// A solution exists but no firing order can make progress.
    #[error("deadlock: {0}")]
    Deadlock(String),
}
