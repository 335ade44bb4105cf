//! Configuration types for runs and scenarios.
//!
//! A run is fully described by [`RunConfig`]; the command line builds one
//! from its positional counts. A [`ScenarioConfig`] adds initial conditions and
//! can be loaded from YAML:
//!
//! ```yaml
//! run:
//!   particles: 2            # n
//!   outer_steps: 1          # t, one snapshot each
//!   substeps: 1             # s per outer step
//!   layout: aos             # "aos" or "soa"
//!   threads: 2              # optional, defaults to one per core
//!   output_dir: "."         # where NNNNNN.raw files go
//!
//! seed: 42                  # optional, seeds random initial positions
//!
//! bodies:                   # optional explicit initial state
//!   - x: [ -0.5, 0.0, 0.0 ]
//!     v: [  0.0, 0.0, 0.0 ]
//!   - x: [  0.5, 0.0, 0.0 ]
//!     v: [  0.0, 0.0, 0.0 ]
//! ```
//!
//! Without `bodies`, positions are drawn uniformly from [-1, 1] and
//! velocities start at zero.

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{NbodyError, Result};
use crate::simulation::params::Parameters;
use crate::simulation::states::{Layout, Real};

/// Everything needed to start a run
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct RunConfig {
    pub particles: usize, // particle count n
    pub outer_steps: usize, // outer loop count t
    pub substeps: usize, // inner loop count s

    #[serde(default)]
    pub layout: Layout, // state buffer layout

    #[serde(default)]
    pub threads: Option<usize>, // worker threads, None = one per core

    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf, // snapshot directory
}

fn default_output_dir() -> PathBuf {
    PathBuf::from(".")
}

impl Default for RunConfig {
    fn default() -> Self {
        let p = Parameters::default();
        Self {
            particles: p.n,
            outer_steps: p.t,
            substeps: p.s,
            layout: Layout::default(),
            threads: None,
            output_dir: default_output_dir(),
        }
    }
}

impl RunConfig {
    pub fn parameters(&self) -> Parameters {
        Parameters {
            n: self.particles,
            t: self.outer_steps,
            s: self.substeps,
        }
    }
}

/// Initial state of a single particle
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct BodyConfig {
    pub x: [Real; 3], // position
    #[serde(default)]
    pub v: [Real; 3], // velocity, zero when omitted
}

/// Top-level scenario loaded from YAML
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ScenarioConfig {
    pub run: RunConfig,

    #[serde(default)]
    pub seed: Option<u64>, // seed for random initial positions

    #[serde(default)]
    pub bodies: Vec<BodyConfig>, // explicit initial state, overrides random init
}

impl ScenarioConfig {
    pub fn from_yaml_str(src: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(src)?)
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        Ok(serde_yaml::from_reader(reader)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|source| NbodyError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_reader(BufReader::new(file))
    }
}
