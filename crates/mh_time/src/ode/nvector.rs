// crates/mh_time/src/ode/nvector.rs

//! ODE 向量
//!
//! `NVector` 接管一个 [`Field`] 的存储（不复制），并记录所属上下文。
//! 向量独占其存储，`clone` 是显式的深拷贝，不存在别名。

use mh_runtime::{Backend, Field};

use super::context::OdeContext;

/// ODE 向量
#[derive(Debug)]
pub struct NVector<B: Backend> {
    context_id: u64,
    data: Field<B>,
}

impl<B: Backend> NVector<B> {
    /// 接管场存储作为 ODE 向量
    pub fn wrap(ctx: &OdeContext, data: Field<B>) -> Self {
        Self {
            context_id: ctx.id(),
            data,
        }
    }

    /// 零向量
    pub fn zeros(ctx: &OdeContext, exec: &B, n: usize) -> Self {
        Self::wrap(ctx, Field::new(exec, n))
    }

    /// 所属上下文编号
    #[inline]
    pub fn context_id(&self) -> u64 {
        self.context_id
    }

    /// 长度
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
        self.data.exec()
    }

    /// 以场的形式访问
    #[inline]
    pub fn as_field(&self) -> &Field<B> {
        &self.data
    }

    /// 以场的形式可变访问
    #[inline]
    pub fn as_field_mut(&mut self) -> &mut Field<B> {
        &mut self.data
    }

    /// 归还存储
    pub fn into_field(self) -> Field<B> {
        self.data
    }
}

impl<B: Backend> Clone for NVector<B> {
    fn clone(&self) -> Self {
        Self {
            context_id: self.context_id,
            data: self.data.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mh_runtime::CpuBackend;

    #[test]
    fn test_clone_is_deep() {
        let ctx = OdeContext::create();
        let exec = CpuBackend::<f64>::new();
        let a = NVector::wrap(&ctx, Field::from_slice(&exec, &[1.0, 2.0]));
        let mut b = a.clone();
        b.as_field_mut().fill(9.0);

        assert!(a.as_field().equal_slice(&[1.0, 2.0]));
        assert!(b.as_field().equal_value(9.0));
        assert_eq!(a.context_id(), ctx.id());
    }
}
