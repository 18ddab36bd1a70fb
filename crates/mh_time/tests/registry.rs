// crates/mh_time/tests/registry.rs

//! 进程级积分器注册中心
//!
//! 各测试使用不同的后端类型，互不干扰（同一测试二进制内的测试并行执行）。

use mh_config::TimeIntegrationConfig;
use mh_dsl::prelude::*;
use mh_foundation::{MhError, MhResult};
use mh_runtime::{CpuBackend, Field};
use mh_time::{
    clear_integrators, create_from_config, create_integrator, describe_integrator,
    register_builtin_integrators, register_integrator, registered_integrators, ForwardEuler,
    TimeIntegrator,
};

#[test]
fn builtin_registration_and_lookup() {
    type B = CpuBackend<f64>;
    register_builtin_integrators::<B>().unwrap();
    // 重复调用不报错
    register_builtin_integrators::<B>().unwrap();

    let names = registered_integrators::<B>();
    assert!(names.contains(&"Runge-Kutta".to_string()));
    assert!(names.contains(&"forwardEuler".to_string()));

    let config = TimeIntegrationConfig::default();
    let mut rk = create_integrator::<B>("Runge-Kutta", &config).unwrap();
    assert_eq!(rk.name(), "Runge-Kutta");
    assert_eq!(
        describe_integrator::<B>("Runge-Kutta").unwrap(),
        ("Explicit time integration using the Runge-Kutta method.", "none")
    );

    let exec = B::new();
    let expr = Expression::from(Term::explicit(&exec, ConstantSource::new(2.0)));
    let mut u = Field::new(&exec, 3);
    rk.solve(&expr, &mut u, 0.0, 0.5).unwrap();
    assert!(u.as_slice().iter().all(|v| (v - 1.0).abs() < 1e-12));

    // Box<dyn TimeIntegrator> 可深拷贝
    let copy = rk.clone();
    assert_eq!(copy.time(), rk.time());

    let fe = create_from_config::<B>(&TimeIntegrationConfig::new("forwardEuler", "Forward-Euler"))
        .unwrap();
    assert_eq!(fe.name(), "forwardEuler");
}

#[test]
fn unknown_name_lists_valid_names() {
    type B = CpuBackend<f64>;
    register_builtin_integrators::<B>().unwrap();

    let err = create_integrator::<B>("crankNicolson", &TimeIntegrationConfig::default())
        .unwrap_err();
    match &err {
        MhError::NotFound { name, available, .. } => {
            assert_eq!(name, "crankNicolson");
            assert!(available.contains(&"Runge-Kutta".to_string()));
            assert!(available.contains(&"forwardEuler".to_string()));
        }
        other => panic!("意外错误: {other:?}"),
    }
    let message = err.to_string();
    assert!(message.contains("crankNicolson"));
    assert!(message.contains("forwardEuler"));
}

#[test]
fn invalid_method_surfaces_from_constructor() {
    type B = CpuBackend<f64>;
    register_builtin_integrators::<B>().unwrap();
    let config = TimeIntegrationConfig::new("Runge-Kutta", "Leapfrog");
    assert!(matches!(
        create_integrator::<B>("Runge-Kutta", &config),
        Err(MhError::NotFound { .. })
    ));
}

fn build_custom(_: &TimeIntegrationConfig) -> MhResult<Box<dyn TimeIntegrator<CpuBackend<f32>>>> {
    Ok(Box::new(ForwardEuler::new()))
}

#[test]
fn custom_registration_and_teardown() {
    // f32 后端只在本测试中使用
    type B = CpuBackend<f32>;
    assert!(registered_integrators::<B>().is_empty());
    assert!(matches!(
        create_integrator::<B>("custom", &TimeIntegrationConfig::default()),
        Err(MhError::NotFound { .. })
    ));

    register_integrator::<B>("custom", build_custom, "custom euler", "none").unwrap();
    assert!(matches!(
        register_integrator::<B>("custom", build_custom, "again", "none"),
        Err(MhError::AlreadyRegistered { .. })
    ));
    register_builtin_integrators::<B>().unwrap();
    assert_eq!(
        registered_integrators::<B>(),
        vec!["Runge-Kutta".to_string(), "custom".to_string(), "forwardEuler".to_string()]
    );

    let integrator = create_integrator::<B>("custom", &TimeIntegrationConfig::default()).unwrap();
    assert_eq!(integrator.name(), "forwardEuler");

    assert_eq!(clear_integrators::<B>(), 3);
    assert!(registered_integrators::<B>().is_empty());
    assert_eq!(clear_integrators::<B>(), 0);
}
