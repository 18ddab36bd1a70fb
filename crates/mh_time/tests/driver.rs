// crates/mh_time/tests/driver.rs

//! run_until 推进驱动

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use mh_config::{RunConfig, TimeControlConfig};
use mh_dsl::prelude::*;
use mh_foundation::{MhError, MhResult};
use mh_runtime::{CpuBackend, Field};
use mh_time::{run_until, ForwardEuler, RungeKutta, StepReport, TimeIntegrator};

type B = CpuBackend<f64>;

#[test]
fn lands_exactly_on_end_time() {
    let exec = B::new();
    let expr = Term::temporal(&exec, Ddt) + Term::explicit(&exec, LinearSource::new(-1.0));
    let mut u = Field::filled(&exec, 4, 1.0);
    let control = TimeControlConfig {
        start_time: 0.0,
        end_time: 1.0,
        dt: 0.15,
        max_dt_halvings: 4,
    };
    let mut rk = RungeKutta::default();

    let summary = run_until(&mut rk, &expr, &mut u, &control).unwrap();
    assert_eq!(summary.final_time, 1.0);
    assert_eq!(summary.steps, 7);
    assert_eq!(summary.retries, 0);
    assert!(summary.rhs_evaluations > 0);
    assert!((summary.min_dt - 0.1).abs() < 1e-12);

    let expected = (-1.0f64).exp();
    assert!(u.as_slice().iter().all(|v| (v - expected).abs() < 1e-6));
}

#[test]
fn empty_interval_does_nothing() {
    let exec = B::new();
    let expr = Expression::from(Term::explicit(&exec, ConstantSource::new(1.0)));
    let mut u = Field::filled(&exec, 2, 7.0);
    let control = TimeControlConfig {
        start_time: 2.0,
        end_time: 2.0,
        ..TimeControlConfig::default()
    };
    let summary = run_until(&mut ForwardEuler::new(), &expr, &mut u, &control).unwrap();
    assert_eq!(summary.steps, 0);
    assert_eq!(summary.final_time, 2.0);
    assert!(u.equal_value(7.0));
}

#[test]
fn works_through_boxed_integrator() {
    let exec = B::new();
    let expr = Expression::from(Term::explicit(&exec, ConstantSource::new(1.0)));
    let mut u = Field::new(&exec, 2);
    let config = RunConfig::default();
    let mut integrator: Box<dyn TimeIntegrator<B>> = Box::new(ForwardEuler::new());

    let summary = run_until(integrator.as_mut(), &expr, &mut u, &config.time_control).unwrap();
    assert_eq!(summary.final_time, config.time_control.end_time);
    assert!(u.as_slice().iter().all(|v| (v - 1.0).abs() < 1e-9));
}

/// 步长超过阈值时报告失败的积分器
#[derive(Debug, Clone)]
struct Picky {
    inner: ForwardEuler<B>,
    max_dt: f64,
    failures: Arc<AtomicUsize>,
}

impl TimeIntegrator<B> for Picky {
    fn name(&self) -> &'static str {
        "picky"
    }

    fn doc(&self) -> &'static str {
        "forward Euler that refuses large steps"
    }

    fn schema(&self) -> &'static str {
        "none"
    }

    fn solve(
        &mut self,
        expr: &Expression<B>,
        field: &mut Field<B>,
        t: f64,
        dt: f64,
    ) -> MhResult<StepReport> {
        if dt > self.max_dt {
            self.failures.fetch_add(1, Ordering::Relaxed);
            return Err(MhError::step_failure(t, dt, "步长过大"));
        }
        self.inner.solve(expr, field, t, dt)
    }

    fn time(&self) -> f64 {
        self.inner.time()
    }

    fn clone_box(&self) -> Box<dyn TimeIntegrator<B>> {
        Box::new(self.clone())
    }
}

#[test]
fn step_failure_halves_dt() {
    let exec = B::new();
    let expr = Expression::from(Term::explicit(&exec, ConstantSource::new(1.0)));
    let mut u = Field::new(&exec, 2);
    let failures = Arc::new(AtomicUsize::new(0));
    let mut picky = Picky {
        inner: ForwardEuler::new(),
        max_dt: 0.3,
        failures: Arc::clone(&failures),
    };
    let control = TimeControlConfig {
        start_time: 0.0,
        end_time: 1.0,
        dt: 1.0,
        max_dt_halvings: 3,
    };

    let summary = run_until(&mut picky, &expr, &mut u, &control).unwrap();
    assert_eq!(summary.final_time, 1.0);
    // 1.0 -> 0.5 -> 0.25 | 0.75 -> 0.375 -> 0.1875 | 0.5625 -> 0.28125 | 0.28125
    assert_eq!(summary.steps, 4);
    assert_eq!(summary.retries, 5);
    assert_eq!(summary.min_dt, 0.1875);
    assert_eq!(failures.load(Ordering::Relaxed), summary.retries);
    assert!(u.as_slice().iter().all(|v| (v - 1.0).abs() < 1e-12));
}

#[test]
fn exhausted_halvings_propagate_failure() {
    let exec = B::new();
    let expr = Expression::from(Term::explicit(&exec, ConstantSource::new(1.0)));
    let mut u = Field::filled(&exec, 2, 3.0);
    let mut picky = Picky {
        inner: ForwardEuler::new(),
        max_dt: 0.01,
        failures: Arc::new(AtomicUsize::new(0)),
    };
    let control = TimeControlConfig {
        start_time: 0.0,
        end_time: 1.0,
        dt: 1.0,
        max_dt_halvings: 2,
    };

    let err = run_until(&mut picky, &expr, &mut u, &control).unwrap_err();
    assert!(err.is_step_failure());
    assert_eq!(picky.failures.load(Ordering::Relaxed), 3);
    assert!(u.equal_value(3.0));
}
