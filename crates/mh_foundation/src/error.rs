// crates/mh_foundation/src/error.rs

//! 错误处理模块，定义统一错误类型
//!
//! 提供 `MhError` 枚举和 `MhResult` 类型别名，供表达式组装、
//! 时间积分与注册中心共用。
//!
//! # 错误分类
//!
//! - **组合错误**: [`MhError::ContextMismatch`]，跨执行上下文组合项或表达式
//! - **生命周期错误**: [`MhError::OrderViolation`]，初始化阶段调用顺序错误（编程错误，不可重试）
//! - **求解错误**: [`MhError::StepFailure`]，ODE 求解器无法完成一个时间步（由调用方决定是否缩步重试）
//! - **查找错误**: [`MhError::NotFound`]，注册中心中不存在该名称，消息中列出全部合法名称
//!
//! # 示例
//!
//! ```
//! use mh_foundation::error::{MhError, MhResult};
//!
//! fn lookup(name: &str) -> MhResult<()> {
//!     Err(MhError::not_found("时间积分器", name, vec!["Runge-Kutta".into()]))
//! }
//!
//! let err = lookup("Euler").unwrap_err();
//! assert!(err.to_string().contains("Runge-Kutta"));
//! ```

use thiserror::Error;

/// 统一结果类型
pub type MhResult<T> = Result<T, MhError>;

/// MariHydro 错误类型
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MhError {
    // ========================================================================
    // 组合错误
    // ========================================================================
    /// 执行上下文不匹配
    #[error("执行上下文不匹配: 期望 {expected}, 实际 {actual}")]
    ContextMismatch {
        /// 接收方的执行上下文
        expected: String,
        /// 传入对象的执行上下文
        actual: String,
    },

    // ========================================================================
    // 生命周期错误
    // ========================================================================
    /// 初始化顺序错误
    #[error("初始化顺序错误: 阶段 {stage} 需要先完成 {requires}")]
    OrderViolation {
        /// 被调用的阶段
        stage: &'static str,
        /// 尚未就绪的前置阶段
        requires: &'static str,
    },

    // ========================================================================
    // 求解错误
    // ========================================================================
    /// 时间步失败
    #[error("时间步失败: t={time}, dt={dt}: {reason}")]
    StepFailure {
        /// 步起始时间
        time: f64,
        /// 请求的步长
        dt: f64,
        /// 失败原因
        reason: String,
    },

    /// 数值错误（NaN/Inf）
    #[error("数值错误: {message}")]
    Numerical {
        /// 错误描述
        message: String,
    },

    // ========================================================================
    // 查找与注册
    // ========================================================================
    /// 名称未找到
    #[error(
        "未找到{kind} '{name}', 合法名称共 {} 个: {}",
        .available.len(),
        .available.join(", ")
    )]
    NotFound {
        /// 查找对象的类别
        kind: &'static str,
        /// 查找的名称
        name: String,
        /// 全部已注册名称
        available: Vec<String>,
    },

    /// 重复注册
    #[error("{kind} '{name}' 已注册")]
    AlreadyRegistered {
        /// 注册对象的类别
        kind: &'static str,
        /// 重复的名称
        name: String,
    },

    // ========================================================================
    // 数据错误
    // ========================================================================
    /// 数组大小不匹配
    #[error("数组大小不匹配: {name} 期望{expected}, 实际{actual}")]
    SizeMismatch {
        /// 数据名称
        name: &'static str,
        /// 期望大小
        expected: usize,
        /// 实际大小
        actual: usize,
    },

    /// 项需要状态场
    #[error("项 '{term}' 需要当前状态场才能计算显式贡献")]
    StateRequired {
        /// 项名称
        term: String,
    },

    /// 无效输入
    #[error("无效的输入数据: {message}")]
    InvalidInput {
        /// 说明无效原因
        message: String,
    },
}

// ========================================================================
// 便捷构造方法
// ========================================================================

impl MhError {
    /// 执行上下文不匹配
    pub fn context_mismatch(expected: impl Into<String>, actual: impl Into<String>) -> Self {
        Self::ContextMismatch {
            expected: expected.into(),
            actual: actual.into(),
        }
    }

    /// 初始化顺序错误
    pub fn order_violation(stage: &'static str, requires: &'static str) -> Self {
        Self::OrderViolation { stage, requires }
    }

    /// 时间步失败
    pub fn step_failure(time: f64, dt: f64, reason: impl Into<String>) -> Self {
        Self::StepFailure {
            time,
            dt,
            reason: reason.into(),
        }
    }

    /// 数值错误
    pub fn numerical(message: impl Into<String>) -> Self {
        Self::Numerical {
            message: message.into(),
        }
    }

    /// 名称未找到
    pub fn not_found(kind: &'static str, name: impl Into<String>, available: Vec<String>) -> Self {
        Self::NotFound {
            kind,
            name: name.into(),
            available,
        }
    }

    /// 重复注册
    pub fn already_registered(kind: &'static str, name: impl Into<String>) -> Self {
        Self::AlreadyRegistered {
            kind,
            name: name.into(),
        }
    }

    /// 数组大小不匹配
    pub fn size_mismatch(name: &'static str, expected: usize, actual: usize) -> Self {
        Self::SizeMismatch {
            name,
            expected,
            actual,
        }
    }

    /// 项需要状态场
    pub fn state_required(term: impl Into<String>) -> Self {
        Self::StateRequired { term: term.into() }
    }

    /// 无效输入
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: message.into(),
        }
    }

    /// 是否为可由调用方缩步重试的错误
    pub fn is_step_failure(&self) -> bool {
        matches!(self, Self::StepFailure { .. })
    }
}

// ========================================================================
// 验证辅助方法
// ========================================================================

impl MhError {
    /// 检查数组大小是否匹配
    #[inline]
    pub fn check_size(name: &'static str, expected: usize, actual: usize) -> MhResult<()> {
        if expected != actual {
            Err(Self::size_mismatch(name, expected, actual))
        } else {
            Ok(())
        }
    }

    /// 检查值是否有限
    #[inline]
    pub fn check_finite(name: &str, value: f64) -> MhResult<()> {
        if value.is_finite() {
            Ok(())
        } else {
            Err(Self::numerical(format!("{name} 非有限值: {value}")))
        }
    }
}

// ========================================================================
// 宏
// ========================================================================

/// 条件不满足时提前返回错误
///
/// ```
/// use mh_foundation::{ensure, MhError, MhResult};
///
/// fn positive(v: f64) -> MhResult<f64> {
///     ensure!(v > 0.0, MhError::invalid_input("必须为正"));
///     Ok(v)
/// }
/// assert!(positive(-1.0).is_err());
/// ```
#[macro_export]
macro_rules! ensure {
    ($cond:expr, $err:expr $(,)?) => {
        if !($cond) {
            return ::core::result::Result::Err(::core::convert::From::from($err));
        }
    };
}

/// 解包 `Option`，为 `None` 时提前返回错误
#[macro_export]
macro_rules! require {
    ($opt:expr, $err:expr $(,)?) => {
        match $opt {
            ::core::option::Option::Some(v) => v,
            ::core::option::Option::None => {
                return ::core::result::Result::Err(::core::convert::From::from($err))
            }
        }
    };
}

// ========================================================================
// 测试
// ========================================================================
