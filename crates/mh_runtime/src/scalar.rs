// crates/mh_runtime/src/scalar.rs

//! RuntimeScalar - 密封的标量类型抽象
//!
//! 场数据与项系数共用的标量类型，只允许 f32/f64。
//! 配置层与时间轴一律使用 f64，进入计算核心时经 `from_config` 转换。

use std::fmt::{Debug, Display};
use std::iter::Sum;

use bytemuck::Pod;
use num_traits::{Float, FromPrimitive, NumAssign, ToPrimitive};

/// 密封模块，禁止外部实现
mod private {
    /// 密封 trait
    pub trait Sealed {}
    impl Sealed for f32 {}
    impl Sealed for f64 {}
}

/// 运行时标量类型（密封，仅 f32/f64 可实现）
///
/// - `f32`: 内存占用减半，适合大规模场
/// - `f64`: 默认精度
pub trait RuntimeScalar:
    private::Sealed
    + Pod
    + Float
    + FromPrimitive
    + ToPrimitive
    + NumAssign
    + Debug
    + Display
    + Default
    + Send
    + Sync
    + Sum
    + 'static
{
    /// 零值
    const ZERO: Self;

    /// 从配置层 f64 转换（f32 时舍入到最近值）
    fn from_config(v: f64) -> Self;

    /// 转回 f64，用于误差范数与日志
    fn to_config(self) -> f64;

    /// 检查是否有限（非 NaN、非 Inf）
    #[inline]
    fn is_safe(self) -> bool {
        self.is_finite()
    }

    /// 批量验证切片中所有值是否有限，返回首个非有限值的位置
    fn validate_slice(data: &[Self]) -> Result<(), (usize, Self)> {
        for (i, &v) in data.iter().enumerate() {
            if !v.is_safe() {
                return Err((i, v));
            }
        }
        Ok(())
    }
}

impl RuntimeScalar for f32 {
    const ZERO: f32 = 0.0;

    #[inline]
    fn from_config(v: f64) -> Self {
        v as f32
    }

    #[inline]
    fn to_config(self) -> f64 {
        self as f64
    }
}

impl RuntimeScalar for f64 {
    const ZERO: f64 = 0.0;

    #[inline]
    fn from_config(v: f64) -> Self {
        v
    }

    #[inline]
    fn to_config(self) -> f64 {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constants() {
        assert_eq!(f32::ZERO, 0.0f32);
        assert_eq!(f64::ZERO, 0.0f64);
    }

    #[test]
    fn test_from_config() {
        assert_eq!(<f32 as RuntimeScalar>::from_config(9.81), 9.81f32);
        assert_eq!(<f64 as RuntimeScalar>::from_config(9.81), 9.81f64);
        assert_eq!(2.5f32.to_config(), 2.5f64);
    }

    #[test]
    fn test_validate_slice() {
        assert!(f64::validate_slice(&[1.0, 2.0, 3.0]).is_ok());
        let err = f64::validate_slice(&[1.0, f64::NAN, 3.0]).unwrap_err();
        assert_eq!(err.0, 1);
    }
}
