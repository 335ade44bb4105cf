//! Conserved quantities of the particle state
//!
//! All particles carry unit mass. The potential is the plain pairwise `-G/r`,
//! so the energy is only approximately the one the softened force conserves;
//! it is meant for drift monitoring, not as an exact invariant.

use rayon::prelude::*;

use super::forces::G;
use super::states::{NVec3, StateBuffer};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Diagnostics {
    pub momentum: NVec3, // total momentum
    pub kinetic: f64, // sum of v^2 / 2
    pub potential: f64, // sum over pairs of -G / r
}

impl Diagnostics {
    pub fn energy(&self) -> f64 {
        self.kinetic + self.potential
    }

    /// |E - E0| / |E0|, or the absolute error when E0 is zero
    pub fn relative_energy_error(&self, initial: &Diagnostics) -> f64 {
        let e0 = initial.energy();
        let de = (self.energy() - e0).abs();
        if e0 == 0.0 {
            de
        } else {
            de / e0.abs()
        }
    }
}

/// Sum of all particle velocities
pub fn total_momentum(state: &StateBuffer) -> NVec3 {
    (0..state.particle_count())
        .map(|i| state.velocity_vec(i))
        .fold(NVec3::zeros(), |p, v| p + v)
}

pub fn kinetic_energy(state: &StateBuffer) -> f64 {
    (0..state.particle_count())
        .map(|i| 0.5 * state.velocity_vec(i).norm_squared() as f64)
        .sum()
}

pub fn potential_energy(state: &StateBuffer) -> f64 {
    let n = state.particle_count();
    (0..n)
        .into_par_iter()
        .map(|i| {
            let xi = state.position_vec(i);
            // each unordered pair once
            ((i + 1)..n)
                .map(|j| {
                    let r = (xi - state.position_vec(j)).norm() as f64;
                    if r > 0.0 {
                        -(G as f64) / r
                    } else {
                        0.0
                    }
                })
                .sum::<f64>()
        })
        .sum()
}

pub fn measure(state: &StateBuffer) -> Diagnostics {
    Diagnostics {
        momentum: total_momentum(state),
        kinetic: kinetic_energy(state),
        potential: potential_energy(state),
    }
}
