// crates/mh_dsl/src/models.rs

//! 内置离散模型
//!
//! | 模型 | 显式贡献 `source[i] +=` | 需要状态 |
//! |------|------------------------|----------|
//! | [`ConstantSource`] | `c * value` | 否 |
//! | [`FieldSource`] | `c * values[i]` | 否 |
//! | [`LinearSource`] | `c * rate * u[i]` | 是 |
//! | [`FnSource`] | `c * f(t, i)` | 否 |
//! | [`Ddt`] | 无 | 否 |
//!
//! 所有模型都经由后端的 `parallel_for` 遍历 `[0, n)`。

use std::fmt;
use std::sync::Arc;

use mh_foundation::error::{MhError, MhResult};
use mh_runtime::{Backend, Field, RuntimeScalar};

use crate::term::{TermContext, TermModel};

/// 常值源项
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConstantSource {
    value: f64,
}

impl ConstantSource {
    /// 创建常值源项
    pub fn new(value: f64) -> Self {
        Self { value }
    }

    /// 源项强度
    pub fn value(&self) -> f64 {
        self.value
    }
}

impl<B: Backend> TermModel<B> for ConstantSource {
    fn name(&self) -> &str {
        "constantSource"
    }

    fn explicit_operation(
        &self,
        _ctx: &TermContext<'_, B>,
        source: &mut Field<B>,
        coeff: B::Scalar,
    ) -> MhResult<()> {
        let contribution = coeff * B::Scalar::from_config(self.value);
        let n = source.len();
        source.apply(0..n, |_, s| s + contribution);
        Ok(())
    }

    fn clone_box(&self) -> Box<dyn TermModel<B>> {
        Box::new(*self)
    }
}

/// 逐单元给定的源项
#[derive(Debug, Clone, PartialEq)]
pub struct FieldSource {
    values: Vec<f64>,
}

impl FieldSource {
    /// 创建逐单元源项
    pub fn new(values: Vec<f64>) -> Self {
        Self { values }
    }
}

impl<B: Backend> TermModel<B> for FieldSource {
    fn name(&self) -> &str {
        "fieldSource"
    }

    fn explicit_operation(
        &self,
        _ctx: &TermContext<'_, B>,
        source: &mut Field<B>,
        coeff: B::Scalar,
    ) -> MhResult<()> {
        MhError::check_size("fieldSource", self.values.len(), source.len())?;
        let values = &self.values;
        let n = source.len();
        source.apply(0..n, |i, s| s + coeff * B::Scalar::from_config(values[i]));
        Ok(())
    }

    fn clone_box(&self) -> Box<dyn TermModel<B>> {
        Box::new(self.clone())
    }
}

/// 线性源项 `rate * u`
///
/// 需要当前状态，无状态调用返回 `StateRequired`。
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinearSource {
    rate: f64,
}

impl LinearSource {
    /// 创建线性源项
    pub fn new(rate: f64) -> Self {
        Self { rate }
    }
}

impl<B: Backend> TermModel<B> for LinearSource {
    fn name(&self) -> &str {
        "linearSource"
    }

    fn explicit_operation(
        &self,
        ctx: &TermContext<'_, B>,
        source: &mut Field<B>,
        coeff: B::Scalar,
    ) -> MhResult<()> {
        let state = ctx
            .state
            .ok_or_else(|| MhError::state_required(<Self as TermModel<B>>::name(self)))?;
        MhError::check_size("linearSource", state.len(), source.len())?;
        let u = state.as_slice();
        let k = coeff * B::Scalar::from_config(self.rate);
        let n = source.len();
        source.apply(0..n, |i, s| s + k * u[i]);
        Ok(())
    }

    fn clone_box(&self) -> Box<dyn TermModel<B>> {
        Box::new(*self)
    }
}

/// 时间与单元相关的源项 `f(t, i)`
#[derive(Clone)]
pub struct FnSource {
    name: String,
    func: Arc<dyn Fn(f64, usize) -> f64 + Send + Sync>,
}

impl FnSource {
    /// 创建函数源项
    pub fn new<F>(name: impl Into<String>, func: F) -> Self
    where
        F: Fn(f64, usize) -> f64 + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            func: Arc::new(func),
        }
    }
}

impl fmt::Debug for FnSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnSource").field("name", &self.name).finish()
    }
}

impl<B: Backend> TermModel<B> for FnSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn explicit_operation(
        &self,
        ctx: &TermContext<'_, B>,
        source: &mut Field<B>,
        coeff: B::Scalar,
    ) -> MhResult<()> {
        let t = ctx.time;
        let func = &self.func;
        let n = source.len();
        source.apply(0..n, |i, s| s + coeff * B::Scalar::from_config(func(t, i)));
        Ok(())
    }

    fn clone_box(&self) -> Box<dyn TermModel<B>> {
        Box::new(self.clone())
    }
}

/// 时间导数标记 `d/dt`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Ddt;

impl<B: Backend> TermModel<B> for Ddt {
    fn name(&self) -> &str {
        "ddt"
    }

    fn explicit_operation(
        &self,
        _ctx: &TermContext<'_, B>,
        _source: &mut Field<B>,
        _coeff: B::Scalar,
    ) -> MhResult<()> {
        Ok(())
    }

    fn clone_box(&self) -> Box<dyn TermModel<B>> {
        Box::new(*self)
    }
}
