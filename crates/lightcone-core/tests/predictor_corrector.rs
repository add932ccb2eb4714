//! Integrator runs with Bloch dynamics and retarded coupling.

use std::sync::Arc;

use approx::assert_abs_diff_eq;
use nalgebra::Vector3;
use ndarray::{array, Array1, ArrayView1};
use num_complex::Complex64;

use lightcone_compute::CpuBackend;
use lightcone_core::expansion::LeastSquaresExpansionSolver;
use lightcone_core::grid::Grid;
use lightcone_core::history::{History, RHO_00, RHO_01};
use lightcone_core::integrator::bloch::{BlochParams, BlochRhs};
use lightcone_core::integrator::{Integrator, Rhs, Weights};
use lightcone_core::interaction::aim::{AimInteraction, AimParams};
use lightcone_core::interaction::Interaction;
use lightcone_core::pulse::GaussianPulse;
use lightcone_core::types::QuantumDot;
use lightcone_core::SimulationError;

fn ground() -> Array1<Complex64> {
    array![Complex64::new(1.0, 0.0), Complex64::new(0.0, 0.0)]
}

/// Seed every emitter in the ground state with its derivative at time 0.
fn seed_ground<R: Rhs>(history: &mut History, rhs: &R) {
    history.fill(&ground());
    for e in 0..history.num_emitters() {
        let d = rhs.derivative(e, 0.0, ground().view(), Complex64::new(0.0, 0.0));
        history.set(e, 0, History::DERIVATIVE, &d);
    }
}

fn aim_for(dots: &mut [QuantumDot], params: &AimParams) -> AimInteraction {
    let grid = Grid::new(Vector3::repeat(1.0), dots, params.expansion_order).unwrap();
    let expansions = LeastSquaresExpansionSolver::get_expansions(params.expansion_order, &grid, dots).unwrap();
    AimInteraction::new(params, grid, expansions, Arc::new(CpuBackend::new()), None).unwrap()
}

#[test]
fn test_rabi_oscillation() {
    let dt = 0.01;
    let num_steps = 314;
    let pulse = GaussianPulse {
        amplitude: 1.0,
        delay: 0.0,
        width: 1e6,
        frequency: 0.0,
        wavevector: Vector3::zeros(),
        polarization: Vector3::x(),
    };
    let dot = QuantumDot::new(Vector3::zeros(), Vector3::x());
    let rhs = BlochRhs::new(vec![dot], Some(pulse), BlochParams::default());

    let mut history = History::new(1, 0, num_steps);
    seed_ground(&mut history, &rhs);

    let mut integrator = Integrator::new(history, Weights::new(4, dt).unwrap(), dt, rhs, Vec::new()).unwrap();
    integrator.run().unwrap();

    for step in [50i64, 157, 314] {
        let t = step as f64 * dt;
        let rho = integrator.history().get(0, step, History::VALUE);
        assert_abs_diff_eq!(rho[RHO_00].re, (1.0 + t.cos()) / 2.0, epsilon = 1e-5);
        assert_abs_diff_eq!(rho[RHO_01].im, -t.sin() / 2.0, epsilon = 1e-5);
    }
}

#[test]
fn test_retarded_coupling_is_causal() {
    let params = AimParams::new(1.0, 1.0);
    let mut dots = vec![
        QuantumDot::new(Vector3::zeros(), Vector3::z()),
        QuantumDot::new(Vector3::new(3.0, 0.0, 0.0), Vector3::z()),
    ];
    let aim = aim_for(&mut dots, &params);
    let depth = aim.history_depth();

    // Emitter 0 ramps up from t = 0; emitter 1 integrates the field it sees.
    let rhs = |e: usize, _t: f64, _y: ArrayView1<'_, Complex64>, field: Complex64| {
        if e == 0 {
            array![Complex64::new(0.0, 0.0), Complex64::new(1.0, 0.0)]
        } else {
            array![Complex64::new(0.0, 0.0), field]
        }
    };

    let history = History::new(2, depth, 20);
    let mut integrator = Integrator::new(
        history,
        Weights::new(4, params.dt).unwrap(),
        params.dt,
        rhs,
        vec![Box::new(aim) as Box<dyn Interaction>],
    )
    .unwrap();

    for _ in 0..3 {
        integrator.step().unwrap();
        assert!(integrator.history().get(0, integrator.now(), History::VALUE)[RHO_01].re > 0.0);
        assert!(integrator.history().get(1, integrator.now(), History::VALUE)[RHO_01].norm() < 1e-12);
    }

    integrator.step().unwrap();
    assert!(integrator.field()[1].re > 0.1);
    assert!(integrator.history().get(1, 4, History::VALUE)[RHO_01].re > 1e-3);
}

#[test]
fn test_identical_dots_stay_identical() {
    let dt = 0.1;
    let num_steps = 200;
    let params = AimParams::new(1.0, dt);
    let mut dots = vec![
        QuantumDot::new(Vector3::zeros(), Vector3::x()).with_damping(20.0, 10.0),
        QuantumDot::new(Vector3::new(2.0, 0.0, 0.0), Vector3::x()).with_damping(20.0, 10.0),
    ];
    let aim = aim_for(&mut dots, &params);
    let depth = aim.history_depth();

    // Propagating along z, the pulse reaches both dots at once.
    let pulse = GaussianPulse {
        amplitude: 0.5,
        delay: 5.0,
        width: 1.0,
        frequency: 1.0,
        wavevector: Vector3::new(0.0, 0.0, 1.0),
        polarization: Vector3::x(),
    };
    let rhs = BlochRhs::new(
        dots.clone(),
        Some(pulse),
        BlochParams {
            laser_frequency: 0.0,
            coupling: 0.05,
        },
    );

    let mut history = History::new(2, depth, num_steps);
    seed_ground(&mut history, &rhs);

    let mut integrator = Integrator::new(
        history,
        Weights::new(4, dt).unwrap(),
        dt,
        rhs,
        vec![Box::new(aim) as Box<dyn Interaction>],
    )
    .unwrap();
    integrator.run().unwrap();

    let history = integrator.history();
    let mut excited = false;
    for step in 0..=num_steps as i64 {
        let a = history.get(0, step, History::VALUE);
        let b = history.get(1, step, History::VALUE);
        assert_abs_diff_eq!(a[RHO_00].re, b[RHO_00].re, epsilon = 1e-10);
        assert_abs_diff_eq!(a[RHO_01].re, b[RHO_01].re, epsilon = 1e-10);
        assert_abs_diff_eq!(a[RHO_01].im, b[RHO_01].im, epsilon = 1e-10);
        assert!(a[RHO_00].re <= 1.0 + 1e-9 && a[RHO_00].re >= -1e-9);
        excited |= a[RHO_00].re < 0.99;
    }
    assert!(excited);
}

#[test]
fn test_shallow_history_is_rejected() {
    let params = AimParams::new(1.0, 1.0);
    let mut dots = vec![
        QuantumDot::new(Vector3::zeros(), Vector3::z()),
        QuantumDot::new(Vector3::new(3.0, 0.0, 0.0), Vector3::z()),
    ];
    let aim = aim_for(&mut dots, &params);
    let history = History::new(2, aim.history_depth() - 1, 20);
    let rhs = |_: usize, _: f64, y: ArrayView1<'_, Complex64>, _: Complex64| y.to_owned();

    let result = Integrator::new(
        history,
        Weights::new(4, 1.0).unwrap(),
        1.0,
        rhs,
        vec![Box::new(aim) as Box<dyn Interaction>],
    );
    assert!(matches!(result, Err(SimulationError::UninitializedHistory { .. })));
}
