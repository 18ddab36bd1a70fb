// crates/mh_dsl/src/expression.rs

//! 表达式：按类别分区的有序项集合
//!
//! `Expression` 把项分别存入 时间导数 / 隐式 / 显式 三个有序序列：
//!
//! - `add_term` 按类别追加，保持插入顺序
//! - `add_expression` 逐类别把对方序列接在己方之后，不交错、不重排
//! - 所有项必须与表达式共享同一执行上下文，否则返回 `ContextMismatch`
//!
//! 显式求值只遍历显式序列（按插入顺序累加），时间导数项与隐式项不参与。
//!
//! # 运算符
//!
//! | 表达式 | 含义 |
//! |--------|------|
//! | `E + E` | `add_expression` |
//! | `E + T` | `add_term` |
//! | `T + T` | 左操作数上下文上的新表达式 |
//! | `E - E`, `E - T`, `T - T` | 右操作数乘以 -1 后相加 |
//! | `c * E` | 三类所有项系数乘 c，顺序不变 |
//!
//! 运算符在上下文不一致时 panic（组合错误属于致命的编程错误），
//! 需要可恢复错误时使用 `add_term` / `add_expression`。

use std::fmt;
use std::ops::{Add, Mul, Neg, Sub};

use mh_foundation::error::{MhError, MhResult};
use mh_runtime::{Backend, Field};

use crate::term::{Term, TermContext, TermKind};

/// 按类别分区的项集合
pub struct Expression<B: Backend> {
    exec: B,
    temporal: Vec<Term<B>>,
    implicit: Vec<Term<B>>,
    explicit: Vec<Term<B>>,
}

impl<B: Backend> Expression<B> {
    /// 绑定执行上下文的空表达式
    pub fn new(exec: &B) -> Self {
        Self {
            exec: exec.clone(),
            temporal: Vec::new(),
            implicit: Vec::new(),
            explicit: Vec::new(),
        }
    }

    /// 执行上下文
    #[inline]
    pub fn exec(&self) -> &B {
        &self.exec
    }

    /// 项总数
    pub fn size(&self) -> usize {
        self.temporal.len() + self.implicit.len() + self.explicit.len()
    }

    /// 是否不含任何项
    pub fn is_empty(&self) -> bool {
        self.size() == 0
    }

    fn check_context(&self, other: &B) -> MhResult<()> {
        if self.exec.same_context(other) {
            Ok(())
        } else {
            log::debug!("拒绝跨执行上下文组合: 表达式 {:?}, 项 {:?}", self.exec, other);
            Err(MhError::context_mismatch(self.exec.name(), other.name()))
        }
    }

    fn bucket_mut(&mut self, kind: TermKind) -> &mut Vec<Term<B>> {
        match kind {
            TermKind::Temporal => &mut self.temporal,
            TermKind::Implicit => &mut self.implicit,
            TermKind::Explicit => &mut self.explicit,
        }
    }

    /// 按类别追加一项
    pub fn add_term(&mut self, term: Term<B>) -> MhResult<()> {
        self.check_context(term.exec())?;
        self.bucket_mut(term.kind()).push(term);
        Ok(())
    }

    /// 逐类别追加另一表达式的全部项
    pub fn add_expression(&mut self, other: &Expression<B>) -> MhResult<()> {
        self.check_context(&other.exec)?;
        self.temporal.extend(other.temporal.iter().cloned());
        self.implicit.extend(other.implicit.iter().cloned());
        self.explicit.extend(other.explicit.iter().cloned());
        Ok(())
    }

    /// 与 `add_expression` 相同，但消耗 `other`
    pub fn append(&mut self, other: Expression<B>) -> MhResult<()> {
        self.check_context(&other.exec)?;
        let Expression {
            temporal,
            implicit,
            explicit,
            ..
        } = other;
        self.temporal.extend(temporal);
        self.implicit.extend(implicit);
        self.explicit.extend(explicit);
        Ok(())
    }

    /// 所有项系数乘 `c`，顺序不变
    pub fn scale(&self, c: f64) -> Self {
        let mut scaled = self.clone();
        scaled.scale_in_place(c);
        scaled
    }

    /// 原地缩放
    pub fn scale_in_place(&mut self, c: f64) {
        for kind in TermKind::ALL {
            for term in self.bucket_mut(kind) {
                term.scale_in_place(c);
            }
        }
    }

    // =========================================================================
    // 显式求值
    // =========================================================================

    /// 在新的零场上累加全部显式项
    pub fn explicit_operation(&self, n_cells: usize) -> MhResult<Field<B>> {
        let mut source = Field::new(&self.exec, n_cells);
        self.explicit_operation_into(&mut source)?;
        Ok(source)
    }

    /// 在调用方提供的场上累加全部显式项
    pub fn explicit_operation_into(&self, source: &mut Field<B>) -> MhResult<()> {
        self.accumulate(&TermContext::stateless(), source)
    }

    /// 以 `state` 为当前状态、`time` 为当前时间累加全部显式项
    ///
    /// 时间积分器的导数回调使用此入口。
    pub fn explicit_operation_at(
        &self,
        state: &Field<B>,
        time: f64,
        source: &mut Field<B>,
    ) -> MhResult<()> {
        self.accumulate(&TermContext::with_state(state, time), source)
    }

    fn accumulate(&self, ctx: &TermContext<'_, B>, source: &mut Field<B>) -> MhResult<()> {
        self.check_context(source.exec())?;
        for term in &self.explicit {
            term.explicit_operation_with(ctx, source)?;
        }
        Ok(())
    }

    // =========================================================================
    // 访问器
    // =========================================================================

    /// 指定类别的项
    pub fn terms(&self, kind: TermKind) -> &[Term<B>] {
        match kind {
            TermKind::Temporal => &self.temporal,
            TermKind::Implicit => &self.implicit,
            TermKind::Explicit => &self.explicit,
        }
    }

    /// 时间导数项
    pub fn temporal_terms(&self) -> &[Term<B>] {
        &self.temporal
    }

    /// 隐式项
    pub fn implicit_terms(&self) -> &[Term<B>] {
        &self.implicit
    }

    /// 显式项
    pub fn explicit_terms(&self) -> &[Term<B>] {
        &self.explicit
    }

    /// 可变时间导数项
    pub fn temporal_terms_mut(&mut self) -> &mut Vec<Term<B>> {
        &mut self.temporal
    }

    /// 可变隐式项
    pub fn implicit_terms_mut(&mut self) -> &mut Vec<Term<B>> {
        &mut self.implicit
    }

    /// 可变显式项
    pub fn explicit_terms_mut(&mut self) -> &mut Vec<Term<B>> {
        &mut self.explicit
    }
}

impl<B: Backend> Clone for Expression<B> {
    fn clone(&self) -> Self {
        Self {
            exec: self.exec.clone(),
            temporal: self.temporal.clone(),
            implicit: self.implicit.clone(),
            explicit: self.explicit.clone(),
        }
    }
}

impl<B: Backend> fmt::Debug for Expression<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Expression")
            .field("exec", &self.exec)
            .field("temporal", &self.temporal)
            .field("implicit", &self.implicit)
            .field("explicit", &self.explicit)
            .finish()
    }
}

impl<B: Backend> From<Term<B>> for Expression<B> {
    fn from(term: Term<B>) -> Self {
        let mut expr = Expression::new(term.exec());
        expr.bucket_mut(term.kind()).push(term);
        expr
    }
}

// =============================================================================
// 运算符
// =============================================================================

fn or_panic<T>(result: MhResult<T>) -> T {
    match result {
        Ok(v) => v,
        Err(e) => panic!("{e}"),
    }
}

/// # Panics
///
/// 执行上下文不一致时 panic。
impl<B: Backend> Add for Expression<B> {
    type Output = Expression<B>;

    fn add(mut self, rhs: Expression<B>) -> Expression<B> {
        or_panic(self.append(rhs));
        self
    }
}

/// # Panics
///
/// 执行上下文不一致时 panic。
impl<B: Backend> Add<Term<B>> for Expression<B> {
    type Output = Expression<B>;

    fn add(mut self, rhs: Term<B>) -> Expression<B> {
        or_panic(self.add_term(rhs));
        self
    }
}

/// # Panics
///
/// 执行上下文不一致时 panic。
impl<B: Backend> Add for Term<B> {
    type Output = Expression<B>;

    fn add(self, rhs: Term<B>) -> Expression<B> {
        Expression::from(self) + rhs
    }
}

impl<B: Backend> Sub for Expression<B> {
    type Output = Expression<B>;

    fn sub(self, rhs: Expression<B>) -> Expression<B> {
        self + (-1.0 * rhs)
    }
}

impl<B: Backend> Sub<Term<B>> for Expression<B> {
    type Output = Expression<B>;

    fn sub(self, rhs: Term<B>) -> Expression<B> {
        self + (-rhs)
    }
}

impl<B: Backend> Sub for Term<B> {
    type Output = Expression<B>;

    fn sub(self, rhs: Term<B>) -> Expression<B> {
        self + (-1.0 * rhs)
    }
}

impl<B: Backend> Mul<Expression<B>> for f64 {
    type Output = Expression<B>;

    fn mul(self, mut rhs: Expression<B>) -> Expression<B> {
        rhs.scale_in_place(self);
        rhs
    }
}

impl<B: Backend> Neg for Expression<B> {
    type Output = Expression<B>;

    fn neg(self) -> Expression<B> {
        -1.0 * self
    }
}
