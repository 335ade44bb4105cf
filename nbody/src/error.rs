//! Error taxonomy for a simulation run
//!
//! Every variant is fatal: a failed phase or a lost snapshot invalidates the
//! rest of the trajectory, so nothing here is retried or recovered locally.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum NbodyError {
    /// The state buffer could not be obtained
    #[error("cannot allocate state buffer of {reals} reals")]
    Allocation { reals: usize },

    /// A parallel phase could not be scheduled or failed while running
    #[error("compute dispatch failed: {0}")]
    ComputeDispatch(String),

    /// A snapshot file could not be created or written
    #[error("cannot write snapshot {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Run parameters that cannot describe a simulation
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Scenario file could not be parsed
    #[error("cannot parse scenario: {0}")]
    Config(#[from] serde_yaml::Error),
}

pub type Result<T> = std::result::Result<T, NbodyError>;
