// crates/mh_time/src/integrator.rs

//! 时间积分器 trait
//!
//! 积分器消费一个 [`Expression`] 与解场，把表达式的显式贡献作为
//! 导数函数推进一个时间步。trait 对象安全，注册中心以
//! `Box<dyn TimeIntegrator<B>>` 返回实例。

use std::fmt;

use mh_dsl::Expression;
use mh_foundation::error::{MhError, MhResult};
use mh_runtime::{Backend, Field};

/// 单步报告
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct StepReport {
    /// 步末时间
    pub time: f64,
    /// 实际步长
    pub dt: f64,
    /// 本步导数回调次数
    pub rhs_evaluations: usize,
    /// 本步接受的子步
    pub accepted_substeps: usize,
    /// 本步拒绝的子步
    pub rejected_substeps: usize,
}

/// 时间积分器
pub trait TimeIntegrator<B: Backend>: fmt::Debug + Send + Sync {
    /// 注册名称
    fn name(&self) -> &'static str;

    /// 简要说明
    fn doc(&self) -> &'static str;

    /// 配置模式
    fn schema(&self) -> &'static str;

    /// 把 `field` 从 `t` 推进到 `t + dt`
    ///
    /// 失败时返回 `StepFailure`，`field` 保持调用前的值；
    /// `dt == 0` 时 `field` 与时间均不变。
    fn solve(
        &mut self,
        expr: &Expression<B>,
        field: &mut Field<B>,
        t: f64,
        dt: f64,
    ) -> MhResult<StepReport>;

    /// 最近一次成功步的步末时间
    fn time(&self) -> f64;

    /// 深拷贝
    fn clone_box(&self) -> Box<dyn TimeIntegrator<B>>;
}

impl<B: Backend> Clone for Box<dyn TimeIntegrator<B>> {
    fn clone(&self) -> Self {
        self.clone_box()
    }
}

/// 积分器共用的参数检查
pub(crate) fn validate_step<B: Backend>(
    expr: &Expression<B>,
    field: &Field<B>,
    t: f64,
    dt: f64,
) -> MhResult<()> {
    MhError::check_finite("t", t)?;
    if !dt.is_finite() || dt < 0.0 {
        return Err(MhError::invalid_input(format!(
            "时间步长必须为非负有限值: {dt}"
        )));
    }
    if !expr.exec().same_context(field.exec()) {
        return Err(MhError::context_mismatch(
            expr.exec().name(),
            field.exec().name(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use mh_runtime::CpuBackend;

    #[test]
    fn test_validate_step() {
        let exec = CpuBackend::<f64>::serial();
        let expr = Expression::new(&exec);
        let field = Field::new(&exec, 2);
        assert!(validate_step(&expr, &field, 0.0, 0.0).is_ok());
        assert!(validate_step(&expr, &field, 0.0, -0.1).is_err());
        assert!(validate_step(&expr, &field, f64::NAN, 0.1).is_err());

        let other = Field::new(&CpuBackend::<f64>::parallel(), 2);
        assert!(matches!(
            validate_step(&expr, &other, 0.0, 0.1),
            Err(MhError::ContextMismatch { .. })
        ));
    }
}
