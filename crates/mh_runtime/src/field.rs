// crates/mh_runtime/src/field.rs

//! Field - 绑定执行上下文的单元场
//!
//! `Field<B>` 是一段 `B::Scalar` 连续存储加上创建它的后端实例。
//! 所有逐元素运算都通过 [`Backend::parallel_for`] 执行，
//! 二元运算在执行前检查长度与执行上下文。
//!
//! ```
//! use mh_runtime::{CpuBackend, Field};
//!
//! let exec = CpuBackend::<f64>::new();
//! let mut a = Field::filled(&exec, 4, 1.0);
//! let b = Field::from_slice(&exec, &[1.0, 2.0, 3.0, 4.0]);
//! a.add_assign(&b).unwrap();
//! assert_eq!(a.copy_to_host(), vec![2.0, 3.0, 4.0, 5.0]);
//! ```

use std::fmt;
use std::ops::Range;

use mh_foundation::error::{MhError, MhResult};

use crate::backend::Backend;
use crate::buffer::DeviceBuffer;
use crate::scalar::RuntimeScalar;

/// 单元场
pub struct Field<B: Backend> {
    exec: B,
    data: B::Buffer<B::Scalar>,
}

impl<B: Backend> Clone for Field<B> {
    fn clone(&self) -> Self {
        Self {
            exec: self.exec.clone(),
            data: self.data.clone(),
        }
    }
}

impl<B: Backend> fmt::Debug for Field<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Field")
            .field("exec", &self.exec)
            .field("len", &self.len())
            .finish()
    }
}

impl<B: Backend> Field<B> {
    /// 零初始化场
    pub fn new(exec: &B, n: usize) -> Self {
        Self {
            exec: exec.clone(),
            data: exec.alloc(n),
        }
    }

    /// 常值场
    pub fn filled(exec: &B, n: usize, value: B::Scalar) -> Self {
        Self {
            exec: exec.clone(),
            data: exec.alloc_init(n, value),
        }
    }

    /// 从主机数据创建
    pub fn from_slice(exec: &B, values: &[B::Scalar]) -> Self {
        Self {
            exec: exec.clone(),
            data: exec.alloc_from_slice(values),
        }
    }

    /// 单元数
    #[inline]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// 是否为空
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// 执行上下文
    #[inline]
    pub fn exec(&self) -> &B {
        &self.exec
    }

    /// 连续只读视图
    #[inline]
    pub fn as_slice(&self) -> &[B::Scalar] {
        self.data.as_slice()
    }

    /// 连续可变视图
    #[inline]
    pub fn as_slice_mut(&mut self) -> &mut [B::Scalar] {
        self.data.as_slice_mut()
    }

    /// 同步后复制到主机
    pub fn copy_to_host(&self) -> Vec<B::Scalar> {
        self.exec.synchronize();
        self.data.copy_to_vec()
    }

    // =========================================================================
    // 填充与赋值
    // =========================================================================

    /// 全场填充
    pub fn fill(&mut self, value: B::Scalar) {
        let n = self.len();
        self.apply(0..n, |_, _| value);
    }

    /// 区间 `[start, end)` 填充
    pub fn fill_range(&mut self, value: B::Scalar, range: Range<usize>) -> MhResult<()> {
        if range.start > range.end || range.end > self.len() {
            return Err(MhError::invalid_input(format!(
                "填充区间 {}..{} 超出场长度 {}",
                range.start,
                range.end,
                self.len()
            )));
        }
        self.apply(range, |_, _| value);
        Ok(())
    }

    /// 以等长主机数据覆盖
    pub fn set_from_slice(&mut self, values: &[B::Scalar]) -> MhResult<()> {
        MhError::check_size("field", self.len(), values.len())?;
        self.data.copy_from_slice(values);
        Ok(())
    }

    /// 以另一场的值覆盖
    pub fn copy_from(&mut self, other: &Self) -> MhResult<()> {
        self.check_compatible(other)?;
        self.exec.copy(&other.data, &mut self.data);
        Ok(())
    }

    // =========================================================================
    // 逐元素运算
    // =========================================================================

    /// 对区间内每个元素执行 `x[i] = f(i, x[i])`
    pub fn apply<K>(&mut self, range: Range<usize>, kernel: K)
    where
        K: Fn(usize, B::Scalar) -> B::Scalar + Send + Sync,
    {
        let Self { exec, data } = self;
        exec.parallel_for(data.as_slice_mut(), range, kernel);
    }

    /// x *= s
    pub fn scalar_mul(&mut self, s: B::Scalar) {
        self.exec.scale(s, &mut self.data);
    }

    /// x += alpha * other
    pub fn axpy(&mut self, alpha: B::Scalar, other: &Self) -> MhResult<()> {
        self.check_compatible(other)?;
        self.exec.axpy(alpha, &other.data, &mut self.data);
        Ok(())
    }

    /// x += other
    pub fn add_assign(&mut self, other: &Self) -> MhResult<()> {
        self.binary_op(other, |a, b| a + b)
    }

    /// x -= other
    pub fn sub_assign(&mut self, other: &Self) -> MhResult<()> {
        self.binary_op(other, |a, b| a - b)
    }

    /// x *= other（逐元素）
    pub fn mul_assign(&mut self, other: &Self) -> MhResult<()> {
        self.binary_op(other, |a, b| a * b)
    }

    fn binary_op<F>(&mut self, other: &Self, op: F) -> MhResult<()>
    where
        F: Fn(B::Scalar, B::Scalar) -> B::Scalar + Send + Sync,
    {
        self.check_compatible(other)?;
        let rhs = other.as_slice();
        let n = self.len();
        self.apply(0..n, |i, a| op(a, rhs[i]));
        Ok(())
    }

    fn check_compatible(&self, other: &Self) -> MhResult<()> {
        if !self.exec.same_context(&other.exec) {
            log::debug!("场运算跨执行上下文: {} / {}", self.exec.name(), other.exec.name());
            return Err(MhError::context_mismatch(
                self.exec.name(),
                other.exec.name(),
            ));
        }
        MhError::check_size("field", self.len(), other.len())
    }

    // =========================================================================
    // 比较与检查
    // =========================================================================

    /// 所有元素是否都等于 `value`
    pub fn equal_value(&self, value: B::Scalar) -> bool {
        self.as_slice().iter().all(|&v| v == value)
    }

    /// 是否与主机数据逐元素相等
    pub fn equal_slice(&self, values: &[B::Scalar]) -> bool {
        self.as_slice() == values
    }

    /// 是否与另一场逐元素相等（上下文不同视为不等）
    pub fn equal(&self, other: &Self) -> bool {
        self.exec.same_context(&other.exec) && self.as_slice() == other.as_slice()
    }

    /// 是否全部有限
    pub fn is_finite(&self) -> bool {
        B::Scalar::validate_slice(self.as_slice()).is_ok()
    }
}
