// crates/mh_time/tests/context_lifetime.rs

//! ODE 上下文的释放时机
//!
//! `OdeContext::live_contexts()` 是进程级计数，本文件只含一个测试函数，
//! 避免与其他测试并行创建上下文。

use mh_dsl::prelude::*;
use mh_runtime::{CpuBackend, Field};
use mh_time::ode::OdeContext;
use mh_time::{InitStage, RungeKutta, TimeIntegrator};

type B = CpuBackend<f64>;

#[test]
fn context_released_when_last_holder_drops() {
    let exec = B::new();
    let expr = Term::temporal(&exec, Ddt) + Term::explicit(&exec, LinearSource::new(-1.0));
    let base = OdeContext::live_contexts();

    // 原对象与副本共享上下文：两者都析构后才释放
    {
        let mut u = Field::filled(&exec, 3, 1.0);
        let mut rk = RungeKutta::default();
        rk.solve(&expr, &mut u, 0.0, 0.1).unwrap();
        assert_eq!(OdeContext::live_contexts(), base + 1);

        let copy = rk.clone();
        assert_eq!(OdeContext::live_contexts(), base + 1);

        drop(rk);
        assert_eq!(OdeContext::live_contexts(), base + 1);
        assert_eq!(copy.context_refs(), 1);

        drop(copy);
        assert_eq!(OdeContext::live_contexts(), base);
    }

    // take：源对象不再持有上下文，转出的对象析构时释放
    {
        let mut u = Field::filled(&exec, 3, 1.0);
        let mut rk = RungeKutta::default();
        rk.solve(&expr, &mut u, 0.0, 0.1).unwrap();

        let moved = rk.take();
        assert_eq!(rk.stage(), InitStage::Uninitialized);
        assert_eq!(OdeContext::live_contexts(), base + 1);

        drop(rk);
        assert_eq!(OdeContext::live_contexts(), base + 1);

        drop(moved);
        assert_eq!(OdeContext::live_contexts(), base);
    }

    // 尺寸变化只重建向量与内存，不新建上下文
    {
        let mut rk = RungeKutta::default();
        let mut small = Field::filled(&exec, 2, 1.0);
        rk.solve(&expr, &mut small, 0.0, 0.1).unwrap();
        let mut large = Field::filled(&exec, 5, 1.0);
        rk.solve(&expr, &mut large, 0.0, 0.1).unwrap();
        assert_eq!(OdeContext::live_contexts(), base + 1);
    }
    assert_eq!(OdeContext::live_contexts(), base);
}
