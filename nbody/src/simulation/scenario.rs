//! Build ready-to-run simulations from configuration
//!
//! Takes a `ScenarioConfig` (YAML-facing) or a bare `RunConfig` (command line)
//! and produces a `Scenario` bundling:
//! - run settings (`RunConfig`)
//! - validated counts (`Parameters`)
//! - the initialized state buffer (`StateBuffer`)

use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::configuration::config::{RunConfig, ScenarioConfig};
use crate::error::{NbodyError, Result};
use crate::output::snapshot::{RawFileWriter, SnapshotSink};
use crate::simulation::integrator::{Integrator, RunReport};
use crate::simulation::params::Parameters;
use crate::simulation::states::{NVec3, StateBuffer};

/// A fully initialized simulation, not yet integrated
#[derive(Debug, Clone)]
pub struct Scenario {
    pub config: RunConfig,
    pub parameters: Parameters,
    pub state: StateBuffer,
}

impl Scenario {
    /// Random initial conditions from the process-wide random source
    pub fn random(config: RunConfig) -> Result<Self> {
        let mut scenario = Self::zeroed(config)?;
        scenario.state.initialize_random();
        Ok(scenario)
    }

    /// Random initial conditions from a fixed seed
    pub fn seeded(config: RunConfig, seed: u64) -> Result<Self> {
        let mut scenario = Self::zeroed(config)?;
        scenario.state.initialize(&mut StdRng::seed_from_u64(seed));
        Ok(scenario)
    }

    pub fn build_scenario(cfg: ScenarioConfig) -> Result<Self> {
        if cfg.bodies.is_empty() {
            return match cfg.seed {
                Some(seed) => Self::seeded(cfg.run, seed),
                None => Self::random(cfg.run),
            };
        }

        if cfg.seed.is_some() {
            return Err(NbodyError::InvalidConfig(
                "scenario sets both a seed and explicit bodies".into(),
            ));
        }

        if cfg.bodies.len() != cfg.run.particles {
            return Err(NbodyError::InvalidConfig(format!(
                "scenario lists {} bodies but run.particles is {}",
                cfg.bodies.len(),
                cfg.run.particles
            )));
        }

        let mut scenario = Self::zeroed(cfg.run)?;
        for (i, body) in cfg.bodies.iter().enumerate() {
            scenario
                .state
                .set_particle(i, NVec3::from(body.x), NVec3::from(body.v));
        }
        Ok(scenario)
    }

    /// Validated counts and an allocated, all-zero state
    pub fn zeroed(config: RunConfig) -> Result<Self> {
        let parameters = config.parameters();
        parameters.validate()?;
        let state = StateBuffer::allocate(parameters.n, config.layout)?;
        Ok(Self {
            config,
            parameters,
            state,
        })
    }

    /// Integrator matching this scenario's counts and thread setting
    pub fn integrator(&self) -> Result<Integrator> {
        Integrator::with_forces(&self.parameters, Default::default(), self.config.threads)
    }

    /// Integrate into `sink`
    pub fn run_with<S: SnapshotSink + ?Sized>(&mut self, sink: &mut S) -> Result<RunReport> {
        let mut integrator = self.integrator()?;
        integrator.run(&mut self.state, sink)
    }

    /// Integrate, writing raw snapshots into `config.output_dir`
    pub fn run(&mut self) -> Result<RunReport> {
        let mut writer = RawFileWriter::new(&self.config.output_dir);
        self.run_with(&mut writer)
    }
}
