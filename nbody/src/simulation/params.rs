//! Run parameters and the simulation clock
//!
//! `Parameters` holds the three invocation counts:
//! - particle count `n`,
//! - outer steps `t` (one snapshot each),
//! - substeps `s` per outer step.
//!
//! `Clock` derives the fixed timestep `dt = 1/(s*t)` from them, so the whole
//! run always covers one unit of simulated time.

use crate::error::{NbodyError, Result};
use crate::simulation::states::Real;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Parameters {
    pub n: usize, // number of particles
    pub t: usize, // number of outer steps
    pub s: usize, // number of substeps per outer step
}

impl Default for Parameters {
    fn default() -> Self {
        Self {
            n: 256,
            t: 32,
            s: 128,
        }
    }
}

impl Parameters {
    /// Reject counts that cannot describe a run
    pub fn validate(&self) -> Result<()> {
        if self.n == 0 {
            return Err(NbodyError::InvalidConfig("particle count must be positive".into()));
        }
        if self.t == 0 {
            return Err(NbodyError::InvalidConfig("outer step count must be positive".into()));
        }
        if self.s == 0 {
            return Err(NbodyError::InvalidConfig("substep count must be positive".into()));
        }
        if self.s.checked_mul(self.t).is_none() {
            return Err(NbodyError::InvalidConfig(format!(
                "{} x {} steps overflows the step counter",
                self.t, self.s
            )));
        }
        Ok(())
    }
}

/// Fixed global timestep of a run
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Clock {
    pub outer_steps: usize, // T
    pub substeps: usize, // S
    pub dt: Real, // full step
    pub half_dt: Real, // dt / 2, used by both drifts
}

impl Clock {
    pub fn new(outer_steps: usize, substeps: usize) -> Self {
        let dt = (1.0 / (substeps * outer_steps) as f64) as Real;
        Self {
            outer_steps,
            substeps,
            dt,
            half_dt: 0.5 * dt,
        }
    }

    pub fn from_parameters(params: &Parameters) -> Self {
        Self::new(params.t, params.s)
    }

    /// Simulated time reached after substep `j` of outer step `i` has finished
    pub fn time_at(&self, i: usize, j: usize) -> f64 {
        (i * self.substeps + j + 1) as f64 * self.dt as f64
    }
}
