// crates/mh_time/src/driver.rs

//! 时间推进驱动
//!
//! [`run_until`] 以固定名义步长从 `start_time` 推进到 `end_time`：
//!
//! - 最后一步截断，恰好落在 `end_time`
//! - 单步返回 `StepFailure` 时步长减半重试，每步最多减半
//!   `max_dt_halvings` 次，仍失败则把最后的错误返回给调用方
//! - 其他错误（上下文不匹配、初始化顺序等）立即返回，不重试

use mh_config::TimeControlConfig;
use mh_dsl::Expression;
use mh_foundation::error::{MhError, MhResult};
use mh_runtime::{Backend, Field};

use crate::integrator::TimeIntegrator;

/// 推进统计
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RunSummary {
    /// 到达时间
    pub final_time: f64,
    /// 成功步数
    pub steps: usize,
    /// 步长减半重试次数
    pub retries: usize,
    /// 导数回调总次数
    pub rhs_evaluations: usize,
    /// 实际使用的最小步长
    pub min_dt: f64,
}

// 相对于 end_time 的落点容差
const LANDING_EPS: f64 = 1e-12;

/// 把 `field` 从 `control.start_time` 推进到 `control.end_time`
pub fn run_until<B, I>(
    integrator: &mut I,
    expr: &Expression<B>,
    field: &mut Field<B>,
    control: &TimeControlConfig,
) -> MhResult<RunSummary>
where
    B: Backend,
    I: TimeIntegrator<B> + ?Sized,
{
    control
        .validate()
        .map_err(|e| MhError::invalid_input(e.to_string()))?;

    let end = control.end_time;
    let tol = LANDING_EPS * end.abs().max(1.0);
    let mut t = control.start_time;
    let mut summary = RunSummary {
        final_time: t,
        min_dt: control.dt,
        ..RunSummary::default()
    };

    log::debug!(
        "{}: 推进 t={} -> {}, dt={}",
        integrator.name(),
        t,
        end,
        control.dt
    );

    while end - t > tol {
        let mut dt = control.dt.min(end - t);
        let mut halvings = 0u32;
        let report = loop {
            match integrator.solve(expr, field, t, dt) {
                Ok(report) => break report,
                Err(err) if err.is_step_failure() && halvings < control.max_dt_halvings => {
                    halvings += 1;
                    summary.retries += 1;
                    dt *= 0.5;
                    log::warn!(
                        "{}: t={} 时间步失败，步长减半为 {} ({}/{})",
                        integrator.name(),
                        t,
                        dt,
                        halvings,
                        control.max_dt_halvings
                    );
                }
                Err(err) => return Err(err),
            }
        };

        // 截断的最后一步直接落在终点，避免累积舍入
        t = if end - (t + dt) <= tol { end } else { t + dt };
        summary.steps += 1;
        summary.rhs_evaluations += report.rhs_evaluations;
        summary.min_dt = summary.min_dt.min(dt);
        summary.final_time = t;
    }

    log::debug!(
        "{}: 完成 t={}, 步数={}, 重试={}",
        integrator.name(),
        summary.final_time,
        summary.steps,
        summary.retries
    );
    Ok(summary)
}
