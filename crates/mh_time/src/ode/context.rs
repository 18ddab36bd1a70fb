// crates/mh_time/src/ode/context.rs

//! ODE 库上下文
//!
//! 上下文是向量与求解器内存的归属者。它以 `Arc` 共享，
//! 引用计数原子更新，最后一个持有者释放时恰好销毁一次。

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

static NEXT_ID: AtomicU64 = AtomicU64::new(1);
static LIVE: AtomicUsize = AtomicUsize::new(0);

/// ODE 库上下文
#[derive(Debug)]
pub struct OdeContext {
    id: u64,
}

impl OdeContext {
    /// 创建新上下文
    pub fn create() -> Arc<Self> {
        let id = NEXT_ID.fetch_add(1, Ordering::Relaxed);
        LIVE.fetch_add(1, Ordering::AcqRel);
        log::debug!("创建 ODE 上下文 #{id}");
        Arc::new(Self { id })
    }

    /// 上下文编号（进程内唯一）
    #[inline]
    pub fn id(&self) -> u64 {
        self.id
    }

    /// 当前存活的上下文数量
    pub fn live_contexts() -> usize {
        LIVE.load(Ordering::Acquire)
    }
}

impl Drop for OdeContext {
    fn drop(&mut self) {
        LIVE.fetch_sub(1, Ordering::AcqRel);
        log::trace!("释放 ODE 上下文 #{}", self.id);
    }
}
