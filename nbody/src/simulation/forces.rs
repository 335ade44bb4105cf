//! Force evaluation for the N-body kernel
//!
//! Defines the [`ForceEvaluator`] trait and the direct O(N^2) softened
//! Newtonian gravity used by the integrator's kick phase

use rayon::prelude::*;

use crate::simulation::states::{NVec3, Real, StateBuffer};

/// Gravitational constant in normalized units
pub const G: Real = 1.0;

/// Softening added to the cubed distance
pub const SOFTENING: Real = 1.0e-6;

/// Source of per-particle accelerations
///
/// Implementations only read the state, so one evaluator can be shared by
/// every worker of a parallel sweep
pub trait ForceEvaluator: Sync {
    /// Net acceleration on particle `k` from every other particle
    fn acceleration(&self, state: &StateBuffer, k: usize) -> NVec3;

    /// Evaluate every particle in parallel, `out[k]` receives particle `k`
    fn accumulate_accels(&self, state: &StateBuffer, out: &mut [NVec3]) {
        debug_assert_eq!(out.len(), state.particle_count());
        out.par_iter_mut()
            .enumerate()
            .for_each(|(k, a)| *a = self.acceleration(state, k));
    }
}

/// Direct-sum Newtonian gravity with cubed-distance softening
///
/// a_k = sum_{l != k} -G (r_k - r_l) / (|r_k - r_l|^3 + softening)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DirectGravity {
    pub g: Real, // gravitational constant
    pub softening: Real, // added to rr * sqrt(rr)
}

impl Default for DirectGravity {
    fn default() -> Self {
        Self {
            g: G,
            softening: SOFTENING,
        }
    }
}

impl DirectGravity {
    /// Acceleration that a source at `xl` exerts on a target at `xk`
    #[inline]
    pub fn pair_acceleration(&self, xk: NVec3, xl: NVec3) -> NVec3 {
        // displacement from source to target
        let d = xk - xl;

        // squared separation, summed in x, y, z order
        let rr = d.x * d.x + d.y * d.y + d.z * d.z;

        // softening goes on the cubed distance, not inside the power
        let f = -self.g / (rr * rr.sqrt() + self.softening);

        f * d
    }
}

impl ForceEvaluator for DirectGravity {
    fn acceleration(&self, state: &StateBuffer, k: usize) -> NVec3 {
        let n = state.particle_count();
        let xk = state.position_vec(k);

        let mut a = NVec3::zeros();
        for l in 0..n {
            // self interaction is skipped, not left to the softening
            if l != k {
                a += self.pair_acceleration(xk, state.position_vec(l));
            }
        }
        a
    }
}
