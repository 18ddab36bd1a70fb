// crates/mh_dsl/src/term.rs

//! 离散项
//!
//! [`Term`] 是一个离散化后的 PDE 贡献：类别（时间导数 / 隐式 / 显式）、
//! 标量系数、执行上下文，以及类型擦除的离散模型 [`TermModel`]。
//!
//! 项创建后只能通过缩放改变系数，类别、上下文与模型保持不变。
//! 取负等价于 `scale(-1)`。

use std::fmt;
use std::ops::{Mul, Neg};

use mh_foundation::error::MhResult;
use mh_runtime::{Backend, Field, RuntimeScalar};

/// 项类别
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TermKind {
    /// 时间导数项
    Temporal,
    /// 隐式项（形成矩阵，显式求值时不参与）
    Implicit,
    /// 显式项
    Explicit,
}

impl TermKind {
    /// 全部类别，按表达式内部存储顺序
    pub const ALL: [TermKind; 3] = [TermKind::Temporal, TermKind::Implicit, TermKind::Explicit];

    /// 类别名称
    pub fn name(&self) -> &'static str {
        match self {
            Self::Temporal => "temporal",
            Self::Implicit => "implicit",
            Self::Explicit => "explicit",
        }
    }
}

impl fmt::Display for TermKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// 显式求值上下文
///
/// 时间积分器调用导数回调时会提供当前状态与时间；
/// 直接调用 `explicit_operation` 时状态为空。
#[derive(Debug, Clone, Copy)]
pub struct TermContext<'a, B: Backend> {
    /// 当前时间
    pub time: f64,
    /// 当前状态场
    pub state: Option<&'a Field<B>>,
}

impl<'a, B: Backend> TermContext<'a, B> {
    /// 无状态上下文
    pub fn stateless() -> Self {
        Self {
            time: 0.0,
            state: None,
        }
    }

    /// 带状态上下文
    pub fn with_state(state: &'a Field<B>, time: f64) -> Self {
        Self {
            time,
            state: Some(state),
        }
    }
}

/// 离散模型 trait
///
/// 实现者把 `coeff` 乘以自身贡献后累加到 `source`（不覆盖）。
pub trait TermModel<B: Backend>: fmt::Debug + Send + Sync {
    /// 模型名称
    fn name(&self) -> &str;

    /// 累加显式贡献
    fn explicit_operation(
        &self,
        ctx: &TermContext<'_, B>,
        source: &mut Field<B>,
        coeff: B::Scalar,
    ) -> MhResult<()>;

    /// 深拷贝
    fn clone_box(&self) -> Box<dyn TermModel<B>>;
}

/// 离散项
pub struct Term<B: Backend> {
    kind: TermKind,
    coeff: f64,
    exec: B,
    model: Box<dyn TermModel<B>>,
}

impl<B: Backend> Term<B> {
    /// 创建项，系数为 1
    pub fn new<M>(kind: TermKind, exec: &B, model: M) -> Self
    where
        M: TermModel<B> + 'static,
    {
        Self {
            kind,
            coeff: 1.0,
            exec: exec.clone(),
            model: Box::new(model),
        }
    }

    /// 时间导数项
    pub fn temporal<M: TermModel<B> + 'static>(exec: &B, model: M) -> Self {
        Self::new(TermKind::Temporal, exec, model)
    }

    /// 隐式项
    pub fn implicit<M: TermModel<B> + 'static>(exec: &B, model: M) -> Self {
        Self::new(TermKind::Implicit, exec, model)
    }

    /// 显式项
    pub fn explicit<M: TermModel<B> + 'static>(exec: &B, model: M) -> Self {
        Self::new(TermKind::Explicit, exec, model)
    }

    /// 类别
    #[inline]
    pub fn kind(&self) -> TermKind {
        self.kind
    }

    /// 系数
    #[inline]
    pub fn coefficient(&self) -> f64 {
        self.coeff
    }

    /// 执行上下文
    #[inline]
    pub fn exec(&self) -> &B {
        &self.exec
    }

    /// 模型名称
    pub fn name(&self) -> &str {
        self.model.name()
    }

    /// 缩放后的新项
    pub fn scale(&self, c: f64) -> Self {
        let mut scaled = self.clone();
        scaled.coeff *= c;
        scaled
    }

    /// 原地缩放
    pub fn scale_in_place(&mut self, c: f64) {
        self.coeff *= c;
    }

    /// 将显式贡献累加到 `source`
    pub fn explicit_operation(&self, source: &mut Field<B>) -> MhResult<()> {
        self.explicit_operation_with(&TermContext::stateless(), source)
    }

    /// 带状态与时间的显式贡献
    pub fn explicit_operation_at(
        &self,
        state: &Field<B>,
        time: f64,
        source: &mut Field<B>,
    ) -> MhResult<()> {
        self.explicit_operation_with(&TermContext::with_state(state, time), source)
    }

    pub(crate) fn explicit_operation_with(
        &self,
        ctx: &TermContext<'_, B>,
        source: &mut Field<B>,
    ) -> MhResult<()> {
        let coeff = B::Scalar::from_config(self.coeff);
        self.model.explicit_operation(ctx, source, coeff)
    }
}

impl<B: Backend> Clone for Term<B> {
    fn clone(&self) -> Self {
        Self {
            kind: self.kind,
            coeff: self.coeff,
            exec: self.exec.clone(),
            model: self.model.clone_box(),
        }
    }
}

impl<B: Backend> fmt::Debug for Term<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Term")
            .field("kind", &self.kind)
            .field("name", &self.model.name())
            .field("coeff", &self.coeff)
            .field("exec", &self.exec)
            .finish()
    }
}

impl<B: Backend> Neg for Term<B> {
    type Output = Term<B>;

    fn neg(mut self) -> Term<B> {
        self.coeff = -self.coeff;
        self
    }
}

impl<B: Backend> Mul<Term<B>> for f64 {
    type Output = Term<B>;

    fn mul(self, mut rhs: Term<B>) -> Term<B> {
        rhs.coeff *= self;
        rhs
    }
}
