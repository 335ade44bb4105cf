//! Drift-kick-drift leapfrog integrator
//!
//! Advances the state through `T` outer steps of `S` substeps each. Every
//! substep is three parallel phases over the particle index space:
//! - Drift1: `x += dt/2 * v`
//! - Kick:   `v += dt * a(x)`, with `a` evaluated on the drifted positions
//! - Drift2: `x += dt/2 * v`, with the kicked velocities
//!
//! Each phase is a blocking rayon call, so it has finished for every particle
//! before the next one starts. A snapshot is written before the first step and
//! after each outer step.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::time::{Duration, Instant};

use rayon::{ThreadPool, ThreadPoolBuilder};

use super::diagnostics;
use super::forces::{DirectGravity, ForceEvaluator};
use super::params::{Clock, Parameters};
use super::states::{NVec3, StateBuffer};
use crate::error::{NbodyError, Result};
use crate::output::snapshot::SnapshotSink;

/// One of the three ordered phases of a substep
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Drift1,
    Kick,
    Drift2,
}

/// Where the integrator is in its run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntegratorStatus {
    Uninitialized,
    Running { step: usize, substep: usize, phase: Phase },
    Checkpointing { snapshot: usize },
    Done,
}

/// Wall time spent in one outer step
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StepTiming {
    pub step: usize, // outer step index
    pub compute: Duration, // all substeps
    pub io: Duration, // snapshot write
}

/// Summary of a finished run
#[derive(Debug, Clone, Default)]
pub struct RunReport {
    pub initial_io: Duration, // time to write snapshot 0
    pub steps: Vec<StepTiming>,
    pub snapshots: usize, // snapshots written, including snapshot 0
}

impl RunReport {
    pub fn total_compute(&self) -> Duration {
        self.steps.iter().map(|s| s.compute).sum()
    }

    pub fn total_io(&self) -> Duration {
        self.initial_io + self.steps.iter().map(|s| s.io).sum::<Duration>()
    }
}

/// Leapfrog integrator owning the worker pool and the kick scratch buffer
pub struct Integrator<F: ForceEvaluator = DirectGravity> {
    clock: Clock,
    forces: F,
    pool: ThreadPool,
    accels: Vec<NVec3>, // per-particle accelerations of the current kick
    status: IntegratorStatus,
}

impl Integrator<DirectGravity> {
    /// Integrator with direct softened gravity on the default thread count
    pub fn new(params: &Parameters) -> Result<Self> {
        Self::with_forces(params, DirectGravity::default(), None)
    }
}

impl<F: ForceEvaluator> Integrator<F> {
    /// Integrator with a custom force evaluator
    /// - `threads`: worker count, `None` for one per core
    pub fn with_forces(params: &Parameters, forces: F, threads: Option<usize>) -> Result<Self> {
        params.validate()?;

        let pool = ThreadPoolBuilder::new()
            .num_threads(threads.unwrap_or(0))
            .thread_name(|i| format!("nbody-worker-{i}"))
            .build()
            .map_err(|e| NbodyError::ComputeDispatch(e.to_string()))?;

        let mut accels = Vec::new();
        accels
            .try_reserve_exact(params.n)
            .map_err(|_| NbodyError::Allocation { reals: 3 * params.n })?;
        accels.resize(params.n, NVec3::zeros());

        log::debug!(
            "integrator ready: {} workers, dt = {:e}",
            pool.current_num_threads(),
            Clock::from_parameters(params).dt
        );

        Ok(Self {
            clock: Clock::from_parameters(params),
            forces,
            pool,
            accels,
            status: IntegratorStatus::Uninitialized,
        })
    }

    pub fn clock(&self) -> &Clock {
        &self.clock
    }

    pub fn forces(&self) -> &F {
        &self.forces
    }

    pub fn status(&self) -> IntegratorStatus {
        self.status
    }

    pub fn threads(&self) -> usize {
        self.pool.current_num_threads()
    }

    fn check_state(&self, state: &StateBuffer) -> Result<()> {
        if state.particle_count() != self.accels.len() {
            return Err(NbodyError::InvalidConfig(format!(
                "state holds {} particles, integrator was built for {}",
                state.particle_count(),
                self.accels.len()
            )));
        }
        Ok(())
    }

    /// Advance by one drift-kick-drift substep (`j` of outer step `i`)
    pub fn substep(&mut self, state: &mut StateBuffer, i: usize, j: usize) -> Result<()> {
        self.check_state(state)?;

        let Self {
            clock,
            forces,
            pool,
            accels,
            status,
        } = self;
        let forces: &F = forces;
        let dt = clock.dt;
        let half_dt = clock.half_dt;

        // Drift: x_{n+1/2} = x_n + (dt/2) v_n
        *status = IntegratorStatus::Running { step: i, substep: j, phase: Phase::Drift1 };
        dispatch(pool, Phase::Drift1, || state.drift(half_dt))?;

        // Kick: v_{n+1} = v_n + dt a(x_{n+1/2})
        // every acceleration is in before any velocity changes
        *status = IntegratorStatus::Running { step: i, substep: j, phase: Phase::Kick };
        dispatch(pool, Phase::Kick, || {
            forces.accumulate_accels(state, accels);
            state.kick(dt, accels);
        })?;

        // Drift: x_{n+1} = x_{n+1/2} + (dt/2) v_{n+1}
        *status = IntegratorStatus::Running { step: i, substep: j, phase: Phase::Drift2 };
        dispatch(pool, Phase::Drift2, || state.drift(half_dt))?;

        Ok(())
    }

    /// Advance by all `S` substeps of outer step `i`
    pub fn step(&mut self, state: &mut StateBuffer, i: usize) -> Result<()> {
        for j in 0..self.clock.substeps {
            self.substep(state, i, j)?;
        }
        Ok(())
    }

    /// Run all outer steps, writing snapshot `0` first and `i+1` after step `i`
    ///
    /// Any failure ends the run, the state is not valid past the failed step
    pub fn run<S: SnapshotSink + ?Sized>(
        &mut self,
        state: &mut StateBuffer,
        sink: &mut S,
    ) -> Result<RunReport> {
        self.check_state(state)?;

        let mut report = RunReport::default();
        let baseline = log::log_enabled!(log::Level::Debug).then(|| diagnostics::measure(state));

        self.status = IntegratorStatus::Checkpointing { snapshot: 0 };
        let t0 = Instant::now();
        sink.write_snapshot(0, state)?;
        report.initial_io = t0.elapsed();
        report.snapshots += 1;

        for i in 0..self.clock.outer_steps {
            let t0 = Instant::now();
            self.step(state, i)?;
            let compute = t0.elapsed();

            self.status = IntegratorStatus::Checkpointing { snapshot: i + 1 };
            let t1 = Instant::now();
            sink.write_snapshot(i + 1, state)?;
            let io = t1.elapsed();
            report.snapshots += 1;

            log::info!(
                "{:6}: compute: {:.3} sec; I/O: {:.3} sec",
                i,
                compute.as_secs_f64(),
                io.as_secs_f64()
            );
            if let Some(initial) = &baseline {
                let now = diagnostics::measure(state);
                log::debug!(
                    "{:6}: |p| = {:.3e}, dE/E = {:.3e}",
                    i,
                    now.momentum.norm(),
                    now.relative_energy_error(initial)
                );
            }

            report.steps.push(StepTiming { step: i, compute, io });
        }

        self.status = IntegratorStatus::Done;
        Ok(report)
    }
}

/// Run one phase on the pool; a panicking worker fails the phase
fn dispatch<R: Send>(pool: &ThreadPool, phase: Phase, op: impl FnOnce() -> R + Send) -> Result<R> {
    pool.install(|| panic::catch_unwind(AssertUnwindSafe(op)))
        .map_err(|payload| {
            NbodyError::ComputeDispatch(format!("{phase:?} phase failed: {}", panic_message(&*payload)))
        })
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&str>() {
        *s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.as_str()
    } else {
        "unknown panic"
    }
}
