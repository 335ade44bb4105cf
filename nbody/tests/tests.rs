use std::path::PathBuf;

use nbody::simulation::diagnostics::{self, Diagnostics};
use nbody::{
    snapshot_file_name, DirectGravity, ForceEvaluator, Integrator, Layout, MemorySink, NVec3,
    NbodyError, Parameters, RawFileWriter, Real, RunConfig, Scenario, ScenarioConfig,
    SnapshotSink, StateBuffer, SOFTENING,
};
use rand::rngs::StdRng;
use rand::SeedableRng;

/// Path of a bundled scenario file
fn scenario_path(file_name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("scenarios")
        .join(file_name)
}

/// Two particles at rest separated by `dist` along the x-axis
fn two_body_state(dist: Real, layout: Layout) -> StateBuffer {
    let mut state = StateBuffer::allocate(2, layout).unwrap();
    state.set_particle(0, NVec3::new(-dist / 2.0, 0.0, 0.0), NVec3::zeros());
    state.set_particle(1, NVec3::new(dist / 2.0, 0.0, 0.0), NVec3::zeros());
    state
}

/// Seeded random state
fn seeded_state(n: usize, layout: Layout, seed: u64) -> StateBuffer {
    let mut state = StateBuffer::allocate(n, layout).unwrap();
    state.initialize(&mut StdRng::seed_from_u64(seed));
    state
}

/// Run a seeded simulation into memory
fn run_seeded(params: Parameters, layout: Layout, seed: u64) -> (StateBuffer, MemorySink) {
    let mut state = seeded_state(params.n, layout, seed);
    let mut sink = MemorySink::new();
    Integrator::new(&params)
        .unwrap()
        .run(&mut state, &mut sink)
        .unwrap();
    (state, sink)
}

/// Decode a raw snapshot back into reals
fn decode(bytes: &[u8]) -> Vec<Real> {
    bytes
        .chunks_exact(std::mem::size_of::<Real>())
        .map(|c| Real::from_ne_bytes(c.try_into().unwrap()))
        .collect()
}

/// Records conserved quantities at every checkpoint
#[derive(Default)]
struct DiagnosticsLog {
    samples: Vec<(usize, Diagnostics)>,
}

impl SnapshotSink for DiagnosticsLog {
    fn write_snapshot(&mut self, index: usize, state: &StateBuffer) -> nbody::Result<()> {
        self.samples.push((index, diagnostics::measure(state)));
        Ok(())
    }
}

/// Scratch directory unique to this test process
fn scratch_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("nbody-{}-{}", std::process::id(), name));
    let _ = std::fs::remove_dir_all(&dir);
    std::fs::create_dir_all(&dir).unwrap();
    dir
}

// ==================================================================================
// Gravity tests
// ==================================================================================

#[test]
fn gravity_pairs_are_equal_and_opposite() {
    let state = seeded_state(24, Layout::ArrayOfStructs, 3);
    let gravity = DirectGravity::default();

    for k in 0..24 {
        for l in 0..24 {
            if k == l {
                continue;
            }
            let a_kl = gravity.pair_acceleration(state.position_vec(k), state.position_vec(l));
            let a_lk = gravity.pair_acceleration(state.position_vec(l), state.position_vec(k));
            assert_eq!(a_kl, -a_lk, "pair ({k}, {l}) not antisymmetric");
        }
    }
}

#[test]
fn gravity_points_toward_other_body() {
    let state = two_body_state(2.0, Layout::ArrayOfStructs);
    let gravity = DirectGravity::default();

    let a0 = gravity.acceleration(&state, 0);
    let dx = state.position_vec(1) - state.position_vec(0);

    assert!(a0.dot(&dx) > 0.0, "Acceleration is not toward second body");
}

#[test]
fn gravity_magnitude_is_softened_inverse_square() {
    let gravity = DirectGravity::default();

    for r in [0.5, 1.0, 2.0, 3.0] {
        let state = two_body_state(r, Layout::ArrayOfStructs);
        let a0 = gravity.acceleration(&state, 0);

        // r / (r^3 + softening), toward +x
        let rr: Real = r * r;
        let expected = (-1.0 / (rr * rr.sqrt() + SOFTENING)) * -r;
        assert_eq!(a0, NVec3::new(expected, 0.0, 0.0), "separation {r}");
    }
}

#[test]
fn net_force_of_a_cloud_is_near_zero() {
    let state = seeded_state(50, Layout::StructOfArrays, 11);
    let mut accels = vec![NVec3::zeros(); 50];
    DirectGravity::default().accumulate_accels(&state, &mut accels);

    let net = accels.iter().fold(NVec3::zeros(), |s, a| s + a);

    // pair terms cancel exactly, only summation rounding is left
    let gravity = DirectGravity::default();
    let mut scale: Real = 0.0;
    for k in 0..50 {
        for l in 0..50 {
            if k != l {
                scale += gravity
                    .pair_acceleration(state.position_vec(k), state.position_vec(l))
                    .norm();
            }
        }
    }
    let bound = 256.0 * Real::EPSILON * scale.max(1.0);
    assert!(net.norm() < bound, "net force {net:?} above {bound:e}");
}

// ==================================================================================
// Integrator tests
// ==================================================================================

#[test]
fn two_body_closed_form_first_checkpoint() {
    let cfg = ScenarioConfig::load(scenario_path("two_body.yaml")).unwrap();
    let mut scenario = Scenario::build_scenario(cfg).unwrap();
    let mut sink = MemorySink::new();
    scenario.run_with(&mut sink).unwrap();

    // t = s = 1, so dt = 1
    let v = 1.0 / (1.0 + SOFTENING);
    let x = -0.5 + 0.5 * v;

    let state = &scenario.state;
    assert_eq!(state.velocity_vec(0), NVec3::new(v, 0.0, 0.0));
    assert_eq!(state.velocity_vec(1), NVec3::new(-v, 0.0, 0.0));
    assert_eq!(state.position_vec(0), NVec3::new(x, 0.0, 0.0));
    assert_eq!(state.position_vec(1), NVec3::new(-x, 0.0, 0.0));

    // snapshot 1 holds exactly that state, AoS order
    assert_eq!(sink.snapshots.len(), 2);
    let raw = decode(&sink.snapshots[1].1);
    assert_eq!(raw, vec![x, 0.0, 0.0, v, 0.0, 0.0, -x, 0.0, 0.0, -v, 0.0, 0.0]);
}

#[test]
fn two_body_momentum_conserved_at_every_checkpoint() {
    let params = Parameters { n: 2, t: 16, s: 32 };
    let mut state = seeded_state(2, Layout::ArrayOfStructs, 21);
    let mut recorder = DiagnosticsLog::default();
    Integrator::new(&params)
        .unwrap()
        .run(&mut state, &mut recorder)
        .unwrap();

    assert_eq!(recorder.samples.len(), 17);
    for (i, d) in &recorder.samples {
        assert!(d.momentum.norm() < 1e-12, "momentum drifted at checkpoint {i}: {:?}", d.momentum);
    }
}

#[test]
fn circular_orbit_energy_stays_bounded() {
    let cfg = ScenarioConfig::load(scenario_path("circular_orbit.yaml")).unwrap();
    let mut scenario = Scenario::build_scenario(cfg).unwrap();
    let mut recorder = DiagnosticsLog::default();
    scenario.run_with(&mut recorder).unwrap();

    let initial = recorder.samples[0].1;
    for (i, d) in &recorder.samples {
        let err = d.relative_energy_error(&initial);
        assert!(err < 1e-4, "energy error {err:e} at checkpoint {i}");
    }

    let state = &scenario.state;
    let r = (state.position_vec(1) - state.position_vec(0)).norm();
    assert!((r - 1.0).abs() < 1e-3, "separation drifted to {r}");
}

#[test]
fn leapfrog_differs_from_euler() {
    let params = Parameters { n: 8, t: 1, s: 16 };
    let mut leapfrog = seeded_state(8, Layout::ArrayOfStructs, 5);
    let mut euler = leapfrog.clone();

    let mut integrator = Integrator::new(&params).unwrap();
    integrator.step(&mut leapfrog, 0).unwrap();

    // single-phase update: x += dt v, v += dt a(x), same inputs
    let dt = integrator.clock().dt;
    let gravity = DirectGravity::default();
    let mut accels = vec![NVec3::zeros(); 8];
    for _ in 0..params.s {
        gravity.accumulate_accels(&euler, &mut accels);
        for k in 0..8 {
            let x = euler.position_vec(k) + dt * euler.velocity_vec(k);
            let v = euler.velocity_vec(k) + dt * accels[k];
            euler.set_particle(k, x, v);
        }
    }

    let max_diff = (0..8)
        .map(|k| (leapfrog.position_vec(k) - euler.position_vec(k)).norm())
        .fold(0.0, Real::max);
    assert!(max_diff > 1e-6, "leapfrog and Euler agree to {max_diff:e}");
}

#[test]
fn substeps_compose_into_outer_step() {
    let params = Parameters { n: 6, t: 1, s: 4 };
    let mut by_step = seeded_state(6, Layout::ArrayOfStructs, 8);
    let mut by_substep = by_step.clone();

    let mut integrator = Integrator::new(&params).unwrap();
    integrator.step(&mut by_step, 0).unwrap();
    for j in 0..4 {
        integrator.substep(&mut by_substep, 0, j).unwrap();
    }
    assert_eq!(by_step, by_substep);
}

#[test]
fn layouts_produce_identical_trajectories() {
    let params = Parameters { n: 20, t: 3, s: 8 };
    let (aos, _) = run_seeded(params, Layout::ArrayOfStructs, 77);
    let (soa, _) = run_seeded(params, Layout::StructOfArrays, 77);

    for i in 0..20 {
        assert_eq!(aos.position_vec(i), soa.position_vec(i));
        assert_eq!(aos.velocity_vec(i), soa.velocity_vec(i));
    }
}

#[test]
fn thread_count_does_not_change_results() {
    let params = Parameters { n: 40, t: 2, s: 4 };
    let mut serial = seeded_state(40, Layout::ArrayOfStructs, 13);
    let mut parallel = serial.clone();

    Integrator::with_forces(&params, DirectGravity::default(), Some(1))
        .unwrap()
        .run(&mut serial, &mut MemorySink::new())
        .unwrap();
    Integrator::with_forces(&params, DirectGravity::default(), Some(4))
        .unwrap()
        .run(&mut parallel, &mut MemorySink::new())
        .unwrap();

    assert_eq!(serial, parallel);
}

// ==================================================================================
// Boundary cases
// ==================================================================================

#[test]
fn single_particle_never_moves() {
    let params = Parameters { n: 1, t: 5, s: 7 };
    let initial = seeded_state(1, Layout::ArrayOfStructs, 1);
    let (state, sink) = run_seeded(params, Layout::ArrayOfStructs, 1);

    assert_eq!(state.position_vec(0), initial.position_vec(0));
    assert_eq!(state.velocity_vec(0), NVec3::zeros());

    assert_eq!(sink.snapshots.len(), 6);
    let first = &sink.snapshots[0].1;
    assert!(sink.snapshots.iter().all(|(_, bytes)| bytes == first));
}

#[test]
fn zero_counts_abort_before_running() {
    for run in [
        RunConfig { particles: 0, ..Default::default() },
        RunConfig { outer_steps: 0, ..Default::default() },
        RunConfig { substeps: 0, ..Default::default() },
    ] {
        assert!(matches!(Scenario::random(run), Err(NbodyError::InvalidConfig(_))));
    }
}

// ==================================================================================
// Snapshot tests
// ==================================================================================

#[test]
fn seeded_runs_are_byte_identical() {
    let params = Parameters { n: 32, t: 3, s: 4 };
    let (_, a) = run_seeded(params, Layout::ArrayOfStructs, 42);
    let (_, b) = run_seeded(params, Layout::ArrayOfStructs, 42);

    assert_eq!(a.snapshots.len(), 4);
    assert_eq!(a.snapshots, b.snapshots);
}

#[test]
fn snapshot_zero_is_the_initial_state() {
    let params = Parameters { n: 10, t: 1, s: 1 };
    let initial = seeded_state(10, Layout::StructOfArrays, 4);
    let (_, sink) = run_seeded(params, Layout::StructOfArrays, 4);

    assert_eq!(sink.snapshots[0], (0, initial.as_bytes().to_vec()));
    assert_eq!(decode(&sink.snapshots[0].1), initial.as_slice());
}

#[test]
fn raw_files_are_named_and_sized() {
    let dir = scratch_dir("raw-files");
    let cfg = RunConfig {
        particles: 12,
        outer_steps: 3,
        substeps: 2,
        output_dir: dir.clone(),
        ..Default::default()
    };
    let mut scenario = Scenario::seeded(cfg, 99).unwrap();
    let report = scenario.run().unwrap();
    assert_eq!(report.snapshots, 4);
    assert_eq!(report.steps.len(), 3);

    let expected_len = 6 * 12 * std::mem::size_of::<Real>();
    for i in 0..4 {
        let path = dir.join(snapshot_file_name(i));
        let bytes = std::fs::read(&path).unwrap();
        assert_eq!(bytes.len(), expected_len, "{}", path.display());
    }
    assert!(!dir.join(snapshot_file_name(4)).exists());

    let last = std::fs::read(dir.join("000003.raw")).unwrap();
    assert_eq!(last, scenario.state.as_bytes());

    std::fs::remove_dir_all(&dir).unwrap();
}

#[test]
fn seeded_file_runs_match_byte_for_byte() {
    let cfg = ScenarioConfig::load(scenario_path("random_cloud.yaml")).unwrap();
    let dirs = [scratch_dir("repeat-a"), scratch_dir("repeat-b")];

    for dir in &dirs {
        let mut run_cfg = cfg.clone();
        run_cfg.run.output_dir = dir.clone();
        Scenario::build_scenario(run_cfg).unwrap().run().unwrap();
    }

    for i in 0..=cfg.run.outer_steps {
        let name = snapshot_file_name(i);
        let a = std::fs::read(dirs[0].join(&name)).unwrap();
        let b = std::fs::read(dirs[1].join(&name)).unwrap();
        assert_eq!(a, b, "snapshot {name} differs");
    }

    for dir in &dirs {
        std::fs::remove_dir_all(dir).unwrap();
    }
}

#[test]
fn unwritable_output_aborts_the_run() {
    let dir = scratch_dir("unwritable").join("missing");
    let mut state = seeded_state(4, Layout::ArrayOfStructs, 0);
    let err = Integrator::new(&Parameters { n: 4, t: 2, s: 2 })
        .unwrap()
        .run(&mut state, &mut RawFileWriter::new(&dir))
        .unwrap_err();
    assert!(matches!(err, NbodyError::Io { .. }));
}

// ==================================================================================
// Scenario files
// ==================================================================================

#[test]
fn bundled_scenarios_load() {
    for file in ["two_body.yaml", "circular_orbit.yaml", "random_cloud.yaml"] {
        let cfg = ScenarioConfig::load(scenario_path(file)).unwrap();
        let scenario = Scenario::build_scenario(cfg).unwrap();
        assert_eq!(scenario.state.len(), 6 * scenario.parameters.n);
    }
}
