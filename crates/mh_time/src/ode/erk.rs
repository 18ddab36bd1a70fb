// crates/mh_time/src/ode/erk.rs

//! 显式 Runge-Kutta 求解器内存与单步推进
//!
//! [`ErkMemory`] 保存 Butcher 表、容差设置、各级导数缓冲区、
//! 步长提示与统计量。[`ErkMemory::step`] 把解向量从 `t` 推进到 `t + dt`：
//!
//! - 无嵌入解的表：一个定步长，结果非有限则判为 `Rejected`
//! - 有嵌入解的表：自适应子步，误差范数
//!
//! ```text
//! err = sqrt( (1/n) Σ_i ( e_i / (atol + rtol * max(|y_i|, |ŷ_i|)) )² )
//! ```
//!
//!   `err <= 1` 接受子步；步长因子 `safety * err^(-1/(q+1))` 限制在
//!   `[0.2, 5]`，`q` 为嵌入解阶数。子步数超过 `max_substeps`
//!   或步长低于 `min_step` 时判为 `Rejected`。
//!
//! 导数回调 `rhs(t, y, ydot)` 必须完整写出 `ydot`，且只依赖 `(t, y)`。

use mh_foundation::error::{MhError, MhResult};
use mh_runtime::{Backend, Field, RuntimeScalar};

use super::butcher::ButcherTable;
use super::context::OdeContext;
use super::nvector::NVector;

/// 子步缩小下限
const MIN_FACTOR: f64 = 0.2;
/// 子步放大上限
const MAX_FACTOR: f64 = 5.0;

/// 导数回调 `rhs(t, y, ydot)`
pub type RhsFn<'a, B> = dyn Fn(f64, &Field<B>, &mut Field<B>) -> MhResult<()> + 'a;

/// 单步结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    /// 到达目标时间
    Success,
    /// 求解器放弃，解向量停留在返回的时间
    Rejected,
}

/// 求解器设置
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ErkSettings {
    /// 相对容差
    pub relative_tolerance: f64,
    /// 绝对容差
    pub absolute_tolerance: f64,
    /// 最小子步长
    pub min_step: f64,
    /// 单次 `step` 的最大子步数
    pub max_substeps: usize,
    /// 安全系数
    pub safety: f64,
}

impl Default for ErkSettings {
    fn default() -> Self {
        Self {
            relative_tolerance: 1e-6,
            absolute_tolerance: 1e-9,
            min_step: 1e-12,
            max_substeps: 500,
            safety: 0.9,
        }
    }
}

impl ErkSettings {
    /// 从配置层转换
    pub fn from_config(config: &mh_config::TimeIntegrationConfig) -> Self {
        Self {
            relative_tolerance: config.relative_tolerance,
            absolute_tolerance: config.absolute_tolerance,
            min_step: config.min_step,
            max_substeps: config.max_substeps,
            safety: config.safety,
        }
    }
}

/// 累计统计
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ErkStats {
    /// 导数回调次数
    pub rhs_evaluations: usize,
    /// 接受的子步
    pub accepted_steps: usize,
    /// 拒绝的子步
    pub rejected_steps: usize,
}

/// 显式 Runge-Kutta 求解器内存
#[derive(Debug)]
pub struct ErkMemory<B: Backend> {
    context_id: u64,
    table: ButcherTable,
    settings: ErkSettings,
    current_time: f64,
    step_hint: Option<f64>,
    k: Vec<Field<B>>,
    y_stage: Field<B>,
    y_new: Field<B>,
    stats: ErkStats,
}

impl<B: Backend> Clone for ErkMemory<B> {
    fn clone(&self) -> Self {
        Self {
            context_id: self.context_id,
            table: self.table.clone(),
            settings: self.settings,
            current_time: self.current_time,
            step_hint: self.step_hint,
            k: self.k.clone(),
            y_stage: self.y_stage.clone(),
            y_new: self.y_new.clone(),
            stats: self.stats,
        }
    }
}

impl<B: Backend> ErkMemory<B> {
    /// 在 `t0` 处以 `y0` 的尺寸创建求解器内存
    pub fn create(
        ctx: &OdeContext,
        table: ButcherTable,
        t0: f64,
        y0: &NVector<B>,
        settings: ErkSettings,
    ) -> MhResult<Self> {
        if y0.context_id() != ctx.id() {
            return Err(MhError::context_mismatch(
                format!("ODE 上下文 #{}", ctx.id()),
                format!("ODE 上下文 #{}", y0.context_id()),
            ));
        }
        let exec = y0.exec();
        let n = y0.len();
        let k = (0..table.stages()).map(|_| Field::new(exec, n)).collect();
        log::debug!(
            "创建 ERK 内存: 方法={}, 级数={}, n={}, t0={}",
            table.name(),
            table.stages(),
            n,
            t0
        );
        Ok(Self {
            context_id: ctx.id(),
            table,
            settings,
            current_time: t0,
            step_hint: None,
            k,
            y_stage: Field::new(exec, n),
            y_new: Field::new(exec, n),
            stats: ErkStats::default(),
        })
    }

    /// Butcher 表
    pub fn table(&self) -> &ButcherTable {
        &self.table
    }

    /// 设置
    pub fn settings(&self) -> &ErkSettings {
        &self.settings
    }

    /// 累计统计
    pub fn stats(&self) -> ErkStats {
        self.stats
    }

    /// 最后到达的时间
    pub fn current_time(&self) -> f64 {
        self.current_time
    }

    /// 问题规模
    pub fn len(&self) -> usize {
        self.y_new.len()
    }

    /// 问题规模是否为零
    pub fn is_empty(&self) -> bool {
        self.y_new.is_empty()
    }

    /// 把 `y` 从 `t` 推进到 `t + dt`
    ///
    /// 返回 `(到达时间, 结果)`。`dt == 0` 时不调用回调，直接返回 `(t, Success)`。
    pub fn step(
        &mut self,
        rhs: &RhsFn<'_, B>,
        t: f64,
        dt: f64,
        y: &mut NVector<B>,
    ) -> MhResult<(f64, StepOutcome)> {
        if y.context_id() != self.context_id {
            return Err(MhError::context_mismatch(
                format!("ODE 上下文 #{}", self.context_id),
                format!("ODE 上下文 #{}", y.context_id()),
            ));
        }
        MhError::check_size("ode vector", self.len(), y.len())?;
        if !dt.is_finite() || dt < 0.0 {
            return Err(MhError::invalid_input(format!("步长必须为非负有限值: {dt}")));
        }

        if dt == 0.0 {
            self.current_time = t;
            return Ok((t, StepOutcome::Success));
        }

        if self.table.is_adaptive() {
            self.step_adaptive(rhs, t, dt, y)
        } else {
            self.step_fixed(rhs, t, dt, y)
        }
    }

    fn step_fixed(
        &mut self,
        rhs: &RhsFn<'_, B>,
        t: f64,
        h: f64,
        y: &mut NVector<B>,
    ) -> MhResult<(f64, StepOutcome)> {
        self.attempt(rhs, t, h, y.as_field())?;
        if !self.y_new.is_finite() {
            self.stats.rejected_steps += 1;
            log::warn!("{}: t={} h={} 结果非有限", self.table.name(), t, h);
            return Ok((t, StepOutcome::Rejected));
        }
        y.as_field_mut().copy_from(&self.y_new)?;
        self.stats.accepted_steps += 1;
        self.current_time = t + h;
        Ok((self.current_time, StepOutcome::Success))
    }

    fn step_adaptive(
        &mut self,
        rhs: &RhsFn<'_, B>,
        t: f64,
        dt: f64,
        y: &mut NVector<B>,
    ) -> MhResult<(f64, StepOutcome)> {
        let t_end = t + dt;
        // 误差估计的阶取两解中较低者
        let order = self.table.order();
        let q = self.table.embedded_order().map_or(order, |e| e.min(order));
        let exponent = -1.0 / (f64::from(q) + 1.0);
        let safety = self.settings.safety;

        let mut t_cur = t;
        let mut h = self.step_hint.map_or(dt, |hint| hint.min(dt));
        let mut substeps = 0usize;

        while t_cur < t_end {
            if substeps >= self.settings.max_substeps {
                log::warn!(
                    "{}: 子步数达到上限 {} (t={}, 目标={})",
                    self.table.name(),
                    self.settings.max_substeps,
                    t_cur,
                    t_end
                );
                self.current_time = t_cur;
                return Ok((t_cur, StepOutcome::Rejected));
            }

            let remaining = t_end - t_cur;
            let proposed = h;
            let last = h >= remaining;
            if last {
                h = remaining;
            }

            let err = self.attempt(rhs, t_cur, h, y.as_field())?;
            substeps += 1;

            if err.is_finite() && err <= 1.0 && self.y_new.is_finite() {
                y.as_field_mut().copy_from(&self.y_new)?;
                t_cur = if last { t_end } else { t_cur + h };
                self.stats.accepted_steps += 1;

                let factor = if err == 0.0 {
                    MAX_FACTOR
                } else {
                    (safety * err.powf(exponent)).clamp(MIN_FACTOR, MAX_FACTOR)
                };
                let next = h * factor;
                // 末子步被截短时，提示不小于截短前的试探步长
                self.step_hint = Some(if last { proposed.max(next) } else { next });
                h = next;
            } else {
                self.stats.rejected_steps += 1;
                let factor = if err.is_finite() {
                    (safety * err.powf(exponent)).clamp(MIN_FACTOR, 1.0)
                } else {
                    MIN_FACTOR
                };
                h *= factor;
                log::trace!(
                    "{}: 拒绝子步 t={} err={:.3e}, 新步长 {:.3e}",
                    self.table.name(),
                    t_cur,
                    err,
                    h
                );
                if h < self.settings.min_step {
                    log::warn!(
                        "{}: 步长 {:.3e} 低于下限 {:.3e} (t={})",
                        self.table.name(),
                        h,
                        self.settings.min_step,
                        t_cur
                    );
                    self.step_hint = None;
                    self.current_time = t_cur;
                    return Ok((t_cur, StepOutcome::Rejected));
                }
            }
        }

        self.current_time = t_end;
        Ok((t_end, StepOutcome::Success))
    }

    /// 以步长 `h` 计算各级导数与候选解 `y_new`，返回误差范数（无嵌入解时为 0）
    fn attempt(&mut self, rhs: &RhsFn<'_, B>, t: f64, h: f64, y: &Field<B>) -> MhResult<f64> {
        let stages = self.table.stages();
        for i in 0..stages {
            self.y_stage.copy_from(y)?;
            for (j, &a) in self.table.a_row(i).iter().enumerate() {
                if a != 0.0 {
                    self.y_stage.axpy(B::Scalar::from_config(h * a), &self.k[j])?;
                }
            }
            let t_stage = t + self.table.c()[i] * h;
            rhs(t_stage, &self.y_stage, &mut self.k[i])?;
            self.stats.rhs_evaluations += 1;
        }

        self.y_new.copy_from(y)?;
        for (i, &b) in self.table.b().iter().enumerate() {
            if b != 0.0 {
                self.y_new.axpy(B::Scalar::from_config(h * b), &self.k[i])?;
            }
        }

        let Some(weights) = self.table.error_weights() else {
            return Ok(0.0);
        };
        Ok(self.error_norm(&weights, h, y))
    }

    fn error_norm(&self, weights: &[f64], h: f64, y: &Field<B>) -> f64 {
        let n = y.len();
        if n == 0 {
            return 0.0;
        }
        let rtol = self.settings.relative_tolerance;
        let atol = self.settings.absolute_tolerance;
        let ks: Vec<&[B::Scalar]> = self.k.iter().map(|k| k.as_slice()).collect();
        let y0 = y.as_slice();
        let y1 = self.y_new.as_slice();

        let mut sum = 0.0;
        for idx in 0..n {
            let e: f64 = weights
                .iter()
                .zip(&ks)
                .map(|(w, k)| w * k[idx].to_config())
                .sum::<f64>()
                * h;
            let scale = atol + rtol * y0[idx].to_config().abs().max(y1[idx].to_config().abs());
            let r = if scale > 0.0 { e / scale } else { e / f64::MIN_POSITIVE };
            sum += r * r;
        }
        (sum / n as f64).sqrt()
    }
}
