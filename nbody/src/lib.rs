pub mod error;
pub mod simulation;
pub mod configuration;
pub mod output;
pub mod benchmark;

pub use error::{NbodyError, Result};

pub use simulation::states::{Layout, NVec3, Real, StateBuffer};
pub use simulation::forces::{DirectGravity, ForceEvaluator, G, SOFTENING};
pub use simulation::params::{Clock, Parameters};
pub use simulation::integrator::{Integrator, IntegratorStatus, Phase, RunReport, StepTiming};
pub use simulation::scenario::Scenario;
pub use simulation::diagnostics::Diagnostics;

pub use configuration::config::{BodyConfig, RunConfig, ScenarioConfig};

pub use output::snapshot::{snapshot_file_name, MemorySink, RawFileWriter, SnapshotSink};

pub use benchmark::benchmark::{bench_force, bench_substep, BenchRow};
