use std::time::Instant;

use crate::error::Result;
use crate::simulation::forces::{DirectGravity, ForceEvaluator};
use crate::simulation::integrator::Integrator;
use crate::simulation::params::Parameters;
use crate::simulation::states::{Layout, NVec3, Real, StateBuffer};

/// One timing sample, in milliseconds
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BenchRow {
    pub n: usize,
    pub aos_ms: f64,
    pub soa_ms: f64,
}

/// Helper to build a deterministic state of size `n`, no rand needed
fn make_state(n: usize, layout: Layout) -> Result<StateBuffer> {
    let mut state = StateBuffer::allocate(n, layout)?;
    for i in 0..n {
        let i_f = i as Real;
        let x = NVec3::new((i_f * 0.37).sin(), (i_f * 0.13).cos(), (i_f * 0.07).sin());
        state.set_particle(i, x, NVec3::zeros());
    }
    Ok(state)
}

/// Time one full force sweep for each `n`, both layouts
pub fn bench_force(ns: &[usize]) -> Result<Vec<BenchRow>> {
    let gravity = DirectGravity::default();
    let mut rows = Vec::with_capacity(ns.len());

    println!("N,aos_force_ms,soa_force_ms");
    for &n in ns {
        let mut out = vec![NVec3::zeros(); n];
        let mut time_layout = |layout| -> Result<f64> {
            let state = make_state(n, layout)?;
            // Warm up
            gravity.accumulate_accels(&state, &mut out);

            let t0 = Instant::now();
            gravity.accumulate_accels(&state, &mut out);
            Ok(t0.elapsed().as_secs_f64() * 1000.0)
        };

        let aos_ms = time_layout(Layout::ArrayOfStructs)?;
        let soa_ms = time_layout(Layout::StructOfArrays)?;
        println!("{},{:.6},{:.6}", n, aos_ms, soa_ms);
        rows.push(BenchRow { n, aos_ms, soa_ms });
    }
    Ok(rows)
}

/// Time full drift-kick-drift substeps for each `n`, both layouts
/// Paste output directly into a spreadsheet to graph
pub fn bench_substep(ns: &[usize], steps: usize) -> Result<Vec<BenchRow>> {
    let steps = steps.max(1);
    let mut rows = Vec::with_capacity(ns.len());

    println!("N,aos_step_ms,soa_step_ms");
    for &n in ns {
        let params = Parameters { n, t: 1, s: steps };
        let mut integrator = Integrator::new(&params)?;

        let mut time_layout = |layout| -> Result<f64> {
            let mut state = make_state(n, layout)?;
            // Warm up
            integrator.substep(&mut state, 0, 0)?;

            let t0 = Instant::now();
            integrator.step(&mut state, 0)?;
            Ok(t0.elapsed().as_secs_f64() * 1000.0 / steps as f64)
        };

        let aos_ms = time_layout(Layout::ArrayOfStructs)?;
        let soa_ms = time_layout(Layout::StructOfArrays)?;
        println!("{},{:.6},{:.6}", n, aos_ms, soa_ms);
        rows.push(BenchRow { n, aos_ms, soa_ms });
    }
    Ok(rows)
}
