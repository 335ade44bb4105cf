use nbody::{RawFileWriter, RunConfig, Scenario};

use anyhow::{Context, Result};
use clap::Parser;

use std::time::Instant;

/// Direct-sum N-body integrator, writes one NNNNNN.raw snapshot per outer step
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// Number of particles
    #[arg(default_value_t = 256)]
    n: usize,

    /// Number of outer steps (snapshots)
    #[arg(default_value_t = 32)]
    t: usize,

    /// Number of substeps per outer step
    #[arg(default_value_t = 128)]
    s: usize,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    log::info!("nbody: direct-sum leapfrog tester");
    log::info!("Configurations:\t{}-body with {} x {} steps", args.n, args.t, args.s);

    let timer = Instant::now();

    let config = RunConfig {
        particles: args.n,
        outer_steps: args.t,
        substeps: args.s,
        ..Default::default()
    };
    let mut scenario = Scenario::zeroed(config).context("failed to allocate particle state")?;
    let mut integrator = scenario.integrator().context("failed to start worker pool")?;
    log::info!("Instantized:\t{:.3} sec", timer.elapsed().as_secs_f64());

    let timer = Instant::now();
    scenario.state.initialize_random();
    log::info!("Initialized:\t{:.3} sec", timer.elapsed().as_secs_f64());

    let mut writer = RawFileWriter::new(&scenario.config.output_dir);
    let report = integrator
        .run(&mut scenario.state, &mut writer)
        .context("simulation aborted")?;
    log::info!(
        "Done:\t{} snapshots, compute: {:.3} sec; I/O: {:.3} sec",
        report.snapshots,
        report.total_compute().as_secs_f64(),
        report.total_io().as_secs_f64()
    );

    Ok(())
}
