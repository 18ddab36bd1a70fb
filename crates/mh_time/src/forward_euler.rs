// crates/mh_time/src/forward_euler.rs

//! 前向欧拉积分器
//!
//! 不经过 ODE 库，直接在后端上计算 `y ← y + dt · f(t, y)`。
//! 候选解先写入工作区，全部有限后才写回解场。

use mh_dsl::Expression;
use mh_foundation::error::{MhError, MhResult};
use mh_runtime::{Backend, Field, RuntimeScalar};

use crate::integrator::{validate_step, StepReport, TimeIntegrator};

/// 前向欧拉积分器
#[derive(Debug, Clone)]
pub struct ForwardEuler<B: Backend> {
    time: f64,
    rhs: Option<Field<B>>,
    candidate: Option<Field<B>>,
}

impl<B: Backend> ForwardEuler<B> {
    /// 注册名称
    pub const NAME: &'static str = "forwardEuler";
    /// 简要说明
    pub const DOC: &'static str = "Explicit time integration using the forward Euler method.";
    /// 配置模式
    pub const SCHEMA: &'static str = "none";

    /// 创建
    pub fn new() -> Self {
        Self {
            time: 0.0,
            rhs: None,
            candidate: None,
        }
    }

    // 工作区尺寸或上下文变化时重新分配
    fn workspace<'a>(slot: &'a mut Option<Field<B>>, like: &Field<B>) -> &'a mut Field<B> {
        let fits = slot
            .as_ref()
            .is_some_and(|w| w.len() == like.len() && w.exec().same_context(like.exec()));
        if !fits {
            *slot = None;
        }
        slot.get_or_insert_with(|| Field::new(like.exec(), like.len()))
    }
}

impl<B: Backend> Default for ForwardEuler<B> {
    fn default() -> Self {
        Self::new()
    }
}

impl<B: Backend> TimeIntegrator<B> for ForwardEuler<B> {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn doc(&self) -> &'static str {
        Self::DOC
    }

    fn schema(&self) -> &'static str {
        Self::SCHEMA
    }

    fn solve(
        &mut self,
        expr: &Expression<B>,
        field: &mut Field<B>,
        t: f64,
        dt: f64,
    ) -> MhResult<StepReport> {
        validate_step(expr, field, t, dt)?;
        if dt == 0.0 {
            return Ok(StepReport {
                time: t,
                ..StepReport::default()
            });
        }

        let rhs = Self::workspace(&mut self.rhs, field);
        rhs.fill(B::Scalar::ZERO);
        expr.explicit_operation_at(field, t, rhs)?;

        let candidate = Self::workspace(&mut self.candidate, field);
        candidate.copy_from(field)?;
        candidate.axpy(B::Scalar::from_config(dt), rhs)?;

        if !candidate.is_finite() {
            log::warn!("{}: 时间步失败 t={} dt={}", Self::NAME, t, dt);
            return Err(MhError::step_failure(t, dt, "候选解含非有限值"));
        }
        field.copy_from(candidate)?;
        self.time = t + dt;

        Ok(StepReport {
            time: self.time,
            dt,
            rhs_evaluations: 1,
            accepted_substeps: 1,
            rejected_substeps: 0,
        })
    }

    fn time(&self) -> f64 {
        self.time
    }

    fn clone_box(&self) -> Box<dyn TimeIntegrator<B>> {
        Box::new(self.clone())
    }
}
