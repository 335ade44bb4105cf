//! Particle state store for the N-body kernel.
//!
//! All positions and velocities live in one flat buffer of `6n` reals. The
//! buffer layout is described by two strides:
//! - particle stride `ps` (distance between consecutive particles)
//! - value stride `vs` (distance between consecutive components)
//!
//! Position component `j` of particle `i` sits at `i*ps + j*vs`, velocity
//! component `j` at `i*ps + (3+j)*vs`. Two layouts are supported:
//! - `Layout::ArrayOfStructs`: `ps = 6`, `vs = 1`
//! - `Layout::StructOfArrays`: `ps = 1`, `vs = n`
//!
//! The layout only changes memory order, never results.

use nalgebra::Vector3;
use rand::Rng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::{NbodyError, Result};

/// Floating point type of the whole simulation, fixed at build time
#[cfg(not(feature = "f32"))]
pub type Real = f64;
#[cfg(feature = "f32")]
pub type Real = f32;

pub type NVec3 = Vector3<Real>;

pub const DIM: usize = 3; // spatial dimensions
pub const ORDER: usize = 2; // position + velocity
pub const REALS_PER_PARTICLE: usize = ORDER * DIM;

/// Memory layout of the state buffer
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Layout {
    #[default]
    #[serde(rename = "aos")] // x0 y0 z0 vx0 vy0 vz0 x1 ...
    ArrayOfStructs,

    #[serde(rename = "soa")] // x0 x1 ... y0 y1 ... vz(n-1)
    StructOfArrays,
}

impl Layout {
    /// Particle stride `ps`, the same for every particle count
    pub fn particle_stride(self) -> usize {
        match self {
            Layout::ArrayOfStructs => REALS_PER_PARTICLE,
            Layout::StructOfArrays => 1,
        }
    }

    /// Value stride `vs` for `n` particles
    pub fn value_stride(self, n: usize) -> usize {
        match self {
            Layout::ArrayOfStructs => 1,
            Layout::StructOfArrays => n,
        }
    }
}

/// Flat buffer holding the positions and velocities of all particles
#[derive(Debug, Clone, PartialEq)]
pub struct StateBuffer {
    data: Vec<Real>, // 6n reals in layout order
    n: usize, // particle count, fixed for the run
    layout: Layout,
    ps: usize, // particle stride
    vs: usize, // value stride
}

impl StateBuffer {
    /// Allocate a zeroed buffer for `n` particles
    pub fn allocate(n: usize, layout: Layout) -> Result<Self> {
        let reals = n
            .checked_mul(REALS_PER_PARTICLE)
            .ok_or(NbodyError::Allocation { reals: usize::MAX })?;

        let mut data = Vec::new();
        data.try_reserve_exact(reals)
            .map_err(|_| NbodyError::Allocation { reals })?;
        data.resize(reals, 0.0);

        log::debug!("allocated {} reals for {} particles ({:?})", reals, n, layout);

        Ok(Self {
            data,
            n,
            layout,
            ps: layout.particle_stride(),
            vs: layout.value_stride(n),
        })
    }

    /// Number of particles
    pub fn particle_count(&self) -> usize {
        self.n
    }

    /// Number of reals in the buffer, always `6n`
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn layout(&self) -> Layout {
        self.layout
    }

    /// `(ps, vs)` stride pair of this buffer
    pub fn strides(&self) -> (usize, usize) {
        (self.ps, self.vs)
    }

    #[inline]
    fn position_index(&self, i: usize, j: usize) -> usize {
        debug_assert!(i < self.n, "particle index {i} out of range for {} particles", self.n);
        debug_assert!(j < DIM, "component index {j} out of range");
        i * self.ps + j * self.vs
    }

    #[inline]
    fn velocity_index(&self, i: usize, j: usize) -> usize {
        debug_assert!(i < self.n, "particle index {i} out of range for {} particles", self.n);
        debug_assert!(j < DIM, "component index {j} out of range");
        i * self.ps + (DIM + j) * self.vs
    }

    /// Position component `j` of particle `i`
    #[inline]
    pub fn position(&self, i: usize, j: usize) -> Real {
        self.data[self.position_index(i, j)]
    }

    #[inline]
    pub fn position_mut(&mut self, i: usize, j: usize) -> &mut Real {
        let idx = self.position_index(i, j);
        &mut self.data[idx]
    }

    /// Velocity component `j` of particle `i`
    #[inline]
    pub fn velocity(&self, i: usize, j: usize) -> Real {
        self.data[self.velocity_index(i, j)]
    }

    #[inline]
    pub fn velocity_mut(&mut self, i: usize, j: usize) -> &mut Real {
        let idx = self.velocity_index(i, j);
        &mut self.data[idx]
    }

    /// Position triple of particle `i`
    #[inline]
    pub fn position_vec(&self, i: usize) -> NVec3 {
        NVec3::new(self.position(i, 0), self.position(i, 1), self.position(i, 2))
    }

    /// Velocity triple of particle `i`
    #[inline]
    pub fn velocity_vec(&self, i: usize) -> NVec3 {
        NVec3::new(self.velocity(i, 0), self.velocity(i, 1), self.velocity(i, 2))
    }

    /// Overwrite both triples of particle `i`
    pub fn set_particle(&mut self, i: usize, x: NVec3, v: NVec3) {
        for j in 0..DIM {
            *self.position_mut(i, j) = x[j];
            *self.velocity_mut(i, j) = v[j];
        }
    }

    /// Raw buffer in layout order
    pub fn as_slice(&self) -> &[Real] {
        &self.data
    }

    /// Raw buffer as native-endian bytes
    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.data)
    }

    /// Fill positions with uniform values in [-1, 1] and zero all velocities
    ///
    /// Particles are drawn in index order, three position components each, so a
    /// seeded `rng` always reproduces the same state.
    pub fn initialize<R: Rng>(&mut self, rng: &mut R) {
        for i in 0..self.n {
            for j in 0..DIM {
                *self.position_mut(i, j) = rng.random_range(-1.0..=1.0);
                *self.velocity_mut(i, j) = 0.0;
            }
        }
    }

    /// [`StateBuffer::initialize`] with the thread-local random source
    pub fn initialize_random(&mut self) {
        self.initialize(&mut rand::rng());
    }

    // =========================================================================================
    // Parallel sweeps used by the integrator phases
    // =========================================================================================

    /// Drift: `x += h * v` for every particle and component
    pub(crate) fn drift(&mut self, h: Real) {
        let n = self.n;
        match self.layout {
            Layout::ArrayOfStructs => {
                self.data
                    .par_chunks_mut(REALS_PER_PARTICLE)
                    .for_each(|p| {
                        for l in 0..DIM {
                            p[l] += h * p[DIM + l];
                        }
                    });
            }
            Layout::StructOfArrays => {
                // all positions come before all velocities, component blocks line up
                let (x, v) = self.data.split_at_mut(DIM * n);
                x.par_iter_mut()
                    .zip(v.par_iter())
                    .for_each(|(x, v)| *x += h * *v);
            }
        }
    }

    /// Kick: `v += dt * a[k]` for every particle `k`
    pub(crate) fn kick(&mut self, dt: Real, accels: &[NVec3]) {
        let n = self.n;
        debug_assert_eq!(accels.len(), n);
        match self.layout {
            Layout::ArrayOfStructs => {
                self.data
                    .par_chunks_mut(REALS_PER_PARTICLE)
                    .zip(accels.par_iter())
                    .for_each(|(p, a)| {
                        for l in 0..DIM {
                            p[DIM + l] += dt * a[l];
                        }
                    });
            }
            Layout::StructOfArrays => {
                if n == 0 {
                    return;
                }
                self.data[DIM * n..]
                    .par_chunks_mut(n)
                    .enumerate()
                    .for_each(|(l, component)| {
                        for (v, a) in component.iter_mut().zip(accels) {
                            *v += dt * a[l];
                        }
                    });
            }
        }
    }
}
