// crates/mh_time/src/runge_kutta.rs

//! 显式 Runge-Kutta 积分器
//!
//! 以嵌入式 ODE 库（[`crate::ode`]）推进解场，表达式的显式贡献即导数函数。
//!
//! ## 资源生命周期
//!
//! ```text
//! Uninitialized ─> ContextReady ─> VectorsReady ─> InitialConditionsReady ─> SolverReady ─> Stepping
//!                  init_context    init_vectors    init_initial_conditions    init_ode_memory   solve
//! ```
//!
//! - 资源严格按 上下文 → 向量 → 初始条件 → 求解器内存 的顺序获取，
//!   前置阶段未就绪时调用后续阶段返回 `OrderViolation`
//! - 释放顺序严格相反（`Drop` 中显式执行）
//! - 首次 `solve` 或解场尺寸变化时自动补齐缺失阶段
//!
//! ## 复制与移动
//!
//! - `clone`: 向量、求解器内存与表达式深拷贝；ODE 上下文通过 `Arc`
//!   共享，最后一个持有者析构时释放
//! - [`RungeKutta::take`]: 转移全部句柄，源对象回到 `Uninitialized`
//!
//! 导数回调在每次 `solve` 内按调用构造，只借用本实例持有的表达式，
//! 从不保存，因此复制或移动后不存在指向其他实例的回调。

use std::sync::Arc;

use mh_config::TimeIntegrationConfig;
use mh_dsl::Expression;
use mh_foundation::error::{MhError, MhResult};
use mh_foundation::require;
use mh_runtime::{Backend, Field, RuntimeScalar};

use crate::integrator::{validate_step, StepReport, TimeIntegrator};
use crate::ode::{ButcherTable, ErkMemory, ErkSettings, ErkStats, NVector, OdeContext, StepOutcome};

/// 初始化阶段
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum InitStage {
    /// 未持有任何资源
    Uninitialized,
    /// 已创建 ODE 上下文
    ContextReady,
    /// 已创建解向量与初始条件向量
    VectorsReady,
    /// 已写入初始条件
    InitialConditionsReady,
    /// 已创建求解器内存
    SolverReady,
    /// 已完成至少一步
    Stepping,
}

/// 显式 Runge-Kutta 积分器
#[derive(Debug)]
pub struct RungeKutta<B: Backend> {
    table: ButcherTable,
    settings: ErkSettings,
    stage: InitStage,
    time: f64,
    pde_expr: Option<Expression<B>>,
    // 以下按获取顺序排列，释放顺序相反
    context: Option<Arc<OdeContext>>,
    solution: Option<NVector<B>>,
    initial_conditions: Option<NVector<B>>,
    ode_memory: Option<ErkMemory<B>>,
}

impl<B: Backend> RungeKutta<B> {
    /// 注册名称
    pub const NAME: &'static str = "Runge-Kutta";
    /// 简要说明
    pub const DOC: &'static str = "Explicit time integration using the Runge-Kutta method.";
    /// 配置模式
    pub const SCHEMA: &'static str = "none";

    /// 以指定 Butcher 表与设置创建（未初始化）
    pub fn new(table: ButcherTable, settings: ErkSettings) -> Self {
        Self {
            table,
            settings,
            stage: InitStage::Uninitialized,
            time: 0.0,
            pde_expr: None,
            context: None,
            solution: None,
            initial_conditions: None,
            ode_memory: None,
        }
    }

    /// 从配置创建，`method` 为 Butcher 表名称
    pub fn from_config(config: &TimeIntegrationConfig) -> MhResult<Self> {
        config
            .validate()
            .map_err(|e| MhError::invalid_input(e.to_string()))?;
        let table = ButcherTable::by_name(&config.method)?;
        Ok(Self::new(table, ErkSettings::from_config(config)))
    }

    /// 转移全部资源，源对象回到 `Uninitialized`（保留方法与设置）
    pub fn take(&mut self) -> Self {
        let fresh = Self::new(self.table.clone(), self.settings);
        std::mem::replace(self, fresh)
    }

    // =========================================================================
    // 状态查询
    // =========================================================================

    /// 当前初始化阶段
    pub fn stage(&self) -> InitStage {
        self.stage
    }

    /// Butcher 表
    pub fn table(&self) -> &ButcherTable {
        &self.table
    }

    /// 求解器设置
    pub fn settings(&self) -> &ErkSettings {
        &self.settings
    }

    /// 共享同一 ODE 上下文的持有者数量（未创建时为 0）
    pub fn context_refs(&self) -> usize {
        self.context.as_ref().map_or(0, Arc::strong_count)
    }

    /// ODE 上下文编号
    pub fn context_id(&self) -> Option<u64> {
        self.context.as_ref().map(|c| c.id())
    }

    /// 解向量
    pub fn solution(&self) -> Option<&Field<B>> {
        self.solution.as_ref().map(NVector::as_field)
    }

    /// 求解器累计统计
    pub fn stats(&self) -> Option<ErkStats> {
        self.ode_memory.as_ref().map(ErkMemory::stats)
    }

    // =========================================================================
    // 初始化阶段
    // =========================================================================

    fn reach(&mut self, stage: InitStage) {
        self.stage = stage;
        log::trace!("{}: 进入阶段 {:?}", Self::NAME, stage);
    }

    /// 阶段 1：创建 ODE 上下文（已存在时保持不变）
    pub fn init_context(&mut self) -> MhResult<()> {
        if self.context.is_none() {
            self.context = Some(OdeContext::create());
        }
        if self.stage < InitStage::ContextReady {
            self.reach(InitStage::ContextReady);
        }
        Ok(())
    }

    /// 阶段 2：创建长度为 `n` 的解向量与初始条件向量
    ///
    /// 已有的求解器内存与向量先按逆序释放。
    pub fn init_vectors(&mut self, exec: &B, n: usize) -> MhResult<()> {
        self.release_vectors();
        let ctx = require!(
            self.context.as_ref(),
            MhError::order_violation("vectors", "context")
        );
        self.solution = Some(NVector::zeros(ctx, exec, n));
        self.initial_conditions = Some(NVector::zeros(ctx, exec, n));
        log::debug!("{}: 创建 ODE 向量 n={} ({})", Self::NAME, n, exec.name());
        self.reach(InitStage::VectorsReady);
        Ok(())
    }

    /// 阶段 3：把 `field` 写入初始条件向量与解向量
    pub fn init_initial_conditions(&mut self, field: &Field<B>) -> MhResult<()> {
        if self.stage < InitStage::VectorsReady {
            return Err(MhError::order_violation("initial conditions", "vectors"));
        }
        let ic = require!(
            self.initial_conditions.as_mut(),
            MhError::order_violation("initial conditions", "vectors")
        );
        ic.as_field_mut().copy_from(field)?;
        let y = require!(
            self.solution.as_mut(),
            MhError::order_violation("initial conditions", "vectors")
        );
        y.as_field_mut().copy_from(field)?;
        if self.stage < InitStage::InitialConditionsReady {
            self.reach(InitStage::InitialConditionsReady);
        }
        Ok(())
    }

    /// 阶段 4：在时间 `t` 创建求解器内存
    pub fn init_ode_memory(&mut self, t: f64) -> MhResult<()> {
        if self.stage < InitStage::InitialConditionsReady {
            return Err(MhError::order_violation("solver memory", "initial conditions"));
        }
        self.release_solver();
        let ctx = require!(
            self.context.as_ref(),
            MhError::order_violation("solver memory", "context")
        );
        let ic = require!(
            self.initial_conditions.as_ref(),
            MhError::order_violation("solver memory", "initial conditions")
        );
        let memory = ErkMemory::create(ctx, self.table.clone(), t, ic, self.settings)?;
        self.ode_memory = Some(memory);
        self.time = t;
        self.reach(InitStage::SolverReady);
        Ok(())
    }

    /// 按需补齐初始化阶段；解场尺寸或执行上下文变化时重建向量与内存
    fn ensure_initialized(&mut self, field: &Field<B>, t: f64) -> MhResult<()> {
        let stale = self
            .solution
            .as_ref()
            .map(|y| (y.len(), y.len() != field.len() || !y.exec().same_context(field.exec())));
        if let Some((old_len, true)) = stale {
            log::debug!(
                "{}: 解场变化 {} -> {}，重建 ODE 向量",
                Self::NAME,
                old_len,
                field.len()
            );
            self.release_vectors();
            self.stage = self.stage.min(InitStage::ContextReady);
        }
        if self.stage < InitStage::ContextReady {
            self.init_context()?;
        }
        if self.stage < InitStage::VectorsReady {
            self.init_vectors(field.exec(), field.len())?;
        }
        if self.stage < InitStage::InitialConditionsReady {
            self.init_initial_conditions(field)?;
        }
        if self.stage < InitStage::SolverReady {
            self.init_ode_memory(t)?;
        }
        Ok(())
    }

    // =========================================================================
    // 释放（逆序）
    // =========================================================================

    fn release_solver(&mut self) {
        if self.ode_memory.take().is_some() {
            log::trace!("{}: 释放求解器内存", Self::NAME);
        }
    }

    fn release_vectors(&mut self) {
        self.release_solver();
        if self.initial_conditions.take().is_some() {
            log::trace!("{}: 释放初始条件向量", Self::NAME);
        }
        if self.solution.take().is_some() {
            log::trace!("{}: 释放解向量", Self::NAME);
        }
    }

    fn release_all(&mut self) {
        self.release_vectors();
        if self.context.take().is_some() {
            log::trace!("{}: 释放 ODE 上下文句柄", Self::NAME);
        }
        self.stage = InitStage::Uninitialized;
    }
}

impl<B: Backend> Default for RungeKutta<B> {
    fn default() -> Self {
        Self::new(ButcherTable::dormand_prince(), ErkSettings::default())
    }
}

impl<B: Backend> Clone for RungeKutta<B> {
    fn clone(&self) -> Self {
        Self {
            table: self.table.clone(),
            settings: self.settings,
            stage: self.stage,
            time: self.time,
            pde_expr: self.pde_expr.clone(),
            context: self.context.clone(),
            solution: self.solution.clone(),
            initial_conditions: self.initial_conditions.clone(),
            ode_memory: self.ode_memory.clone(),
        }
    }
}

impl<B: Backend> Drop for RungeKutta<B> {
    fn drop(&mut self) {
        self.release_all();
    }
}

impl<B: Backend> TimeIntegrator<B> for RungeKutta<B> {
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
            // 仅首次调用时完成初始化（时间取 t），此后零步长不改变任何状态
            if self.stage < InitStage::SolverReady {
                self.pde_expr = Some(expr.clone());
                self.ensure_initialized(field, t)?;
            }
            return Ok(StepReport {
                time: t,
                ..StepReport::default()
            });
        }
        self.pde_expr = Some(expr.clone());
        self.ensure_initialized(field, t)?;

        let Self {
            pde_expr,
            solution,
            ode_memory,
            ..
        } = self;
        let expr = require!(pde_expr.as_ref(), MhError::order_violation("solve", "expression"));
        let y = require!(solution.as_mut(), MhError::order_violation("solve", "vectors"));
        let memory = require!(
            ode_memory.as_mut(),
            MhError::order_violation("solve", "solver memory")
        );

        y.as_field_mut().copy_from(field)?;
        let before = memory.stats();

        let rhs = |time: f64, state: &Field<B>, ydot: &mut Field<B>| -> MhResult<()> {
            ydot.fill(B::Scalar::ZERO);
            expr.explicit_operation_at(state, time, ydot)
        };
        let (t_reached, outcome) = memory.step(&rhs, t, dt, y)?;
        let after = memory.stats();

        let report = StepReport {
            time: t_reached,
            dt,
            rhs_evaluations: after.rhs_evaluations - before.rhs_evaluations,
            accepted_substeps: after.accepted_steps - before.accepted_steps,
            rejected_substeps: after.rejected_steps - before.rejected_steps,
        };

        match outcome {
            StepOutcome::Success => {
                field.copy_from(y.as_field())?;
                self.time = t + dt;
                if self.stage < InitStage::Stepping {
                    self.reach(InitStage::Stepping);
                }
                log::trace!(
                    "{}: t={} -> {}, rhs={}, 接受={}, 拒绝={}",
                    Self::NAME,
                    t,
                    self.time,
                    report.rhs_evaluations,
                    report.accepted_substeps,
                    report.rejected_substeps
                );
                Ok(report)
            }
            StepOutcome::Rejected => {
                log::warn!(
                    "{}: 时间步失败 t={} dt={}，停在 t={}",
                    Self::NAME,
                    t,
                    dt,
                    t_reached
                );
                Err(MhError::step_failure(
                    t,
                    dt,
                    format!(
                        "{} 在 t={} 处放弃 (接受 {} / 拒绝 {} 子步)",
                        self.table.name(),
                        t_reached,
                        report.accepted_substeps,
                        report.rejected_substeps
                    ),
                ))
            }
        }
    }

    fn time(&self) -> f64 {
        self.time
    }

    fn clone_box(&self) -> Box<dyn TimeIntegrator<B>> {
        Box::new(self.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mh_dsl::{ConstantSource, Term};
    use mh_runtime::CpuBackend;

    type B = CpuBackend<f64>;

    #[test]
    fn test_stage_order_enforced() {
        let exec = B::new();
        let field = Field::new(&exec, 4);
        let mut rk = RungeKutta::<B>::default();

        assert!(matches!(
            rk.init_vectors(&exec, 4),
            Err(MhError::OrderViolation { stage: "vectors", .. })
        ));
        assert!(matches!(
            rk.init_initial_conditions(&field),
            Err(MhError::OrderViolation { .. })
        ));
        assert!(matches!(
            rk.init_ode_memory(0.0),
            Err(MhError::OrderViolation { .. })
        ));
        assert_eq!(rk.stage(), InitStage::Uninitialized);
    }

    #[test]
    fn test_manual_stages_in_order() {
        let exec = B::new();
        let field = Field::filled(&exec, 4, 2.0);
        let mut rk = RungeKutta::<B>::default();

        rk.init_context().unwrap();
        assert_eq!(rk.stage(), InitStage::ContextReady);
        rk.init_vectors(&exec, 4).unwrap();
        assert_eq!(rk.stage(), InitStage::VectorsReady);
        rk.init_initial_conditions(&field).unwrap();
        assert_eq!(rk.stage(), InitStage::InitialConditionsReady);
        rk.init_ode_memory(0.0).unwrap();
        assert_eq!(rk.stage(), InitStage::SolverReady);
        assert!(rk.solution().unwrap().equal_value(2.0));
    }

    #[test]
    fn test_reinit_vectors_drops_solver() {
        let exec = B::new();
        let mut field = Field::new(&exec, 4);
        let expr = Expression::from(Term::explicit(&exec, ConstantSource::new(1.0)));
        let mut rk = RungeKutta::<B>::default();
        rk.solve(&expr, &mut field, 0.0, 0.1).unwrap();

        rk.init_vectors(&exec, 2).unwrap();
        assert_eq!(rk.stage(), InitStage::VectorsReady);
        assert!(rk.stats().is_none());
        assert!(matches!(
            rk.init_ode_memory(0.0),
            Err(MhError::OrderViolation { .. })
        ));
    }

    #[test]
    fn test_metadata() {
        let rk = RungeKutta::<B>::default();
        assert_eq!(rk.name(), "Runge-Kutta");
        assert_eq!(
            rk.doc(),
            "Explicit time integration using the Runge-Kutta method."
        );
        assert_eq!(rk.schema(), "none");
    }
}
