// crates/mh_runtime/src/backend.rs

//! Backend - 计算后端（执行上下文）抽象
//!
//! 后端实例就是项与表达式绑定的"执行上下文"：两个后端值相等
//! 当且仅当它们在同一设备上以同一方式执行核函数。表达式组合时
//! 通过 `PartialEq` 检查上下文一致性。
//!
//! 除 BLAS-1 操作外，后端提供一个数据并行原语
//! [`Backend::parallel_for`]：对 `[start, end)` 中每个下标恰好调用一次
//! 核函数，调用方视角下同步完成。

use std::fmt;
use std::marker::PhantomData;
use std::ops::Range;

use bytemuck::Pod;
use rayon::prelude::*;

use crate::buffer::DeviceBuffer;
use crate::scalar::RuntimeScalar;

/// 计算后端 Trait
///
/// # 类型参数
///
/// - `Scalar`: 标量类型（f32 或 f64）
/// - `Buffer<T>`: 关联的缓冲区类型
pub trait Backend: Clone + PartialEq + fmt::Debug + Send + Sync + 'static {
    /// 标量类型
    type Scalar: RuntimeScalar;
    /// 缓冲区类型
    type Buffer<T: Pod + Clone + Send + Sync>: DeviceBuffer<T>;

    /// 后端名称，用于日志与上下文不匹配错误
    fn name(&self) -> &'static str;

    /// 分配零初始化缓冲区
    fn alloc<T: Pod + Clone + Default + Send + Sync>(&self, len: usize) -> Self::Buffer<T>;

    /// 分配并初始化缓冲区
    fn alloc_init<T: Pod + Clone + Default + Send + Sync>(
        &self,
        len: usize,
        value: T,
    ) -> Self::Buffer<T> {
        let mut buf = self.alloc(len);
        buf.fill(value);
        buf
    }

    /// 从主机切片创建缓冲区
    fn alloc_from_slice<T: Pod + Clone + Default + Send + Sync>(
        &self,
        data: &[T],
    ) -> Self::Buffer<T> {
        let mut buf = self.alloc(data.len());
        buf.copy_from_slice(data);
        buf
    }

    /// 同步操作（GPU 后端需要）
    fn synchronize(&self) {}

    /// 与另一上下文是否相同
    #[inline]
    fn same_context(&self, other: &Self) -> bool {
        self == other
    }

    // =========================================================================
    // 数据并行原语
    // =========================================================================

    /// 对 `range` 中每个下标 `i` 执行 `data[i] = kernel(i, data[i])`
    ///
    /// 返回前所有下标均已完成。
    fn parallel_for<K>(&self, data: &mut [Self::Scalar], range: Range<usize>, kernel: K)
    where
        K: Fn(usize, Self::Scalar) -> Self::Scalar + Send + Sync;

    // =========================================================================
    // BLAS Level 1 操作
    // =========================================================================

    /// y = alpha * x + y (AXPY)
    fn axpy(
        &self,
        alpha: Self::Scalar,
        x: &Self::Buffer<Self::Scalar>,
        y: &mut Self::Buffer<Self::Scalar>,
    );

    /// 复制: dst = src
    fn copy(&self, src: &Self::Buffer<Self::Scalar>, dst: &mut Self::Buffer<Self::Scalar>);

    /// 缩放: x = alpha * x
    fn scale(&self, alpha: Self::Scalar, x: &mut Self::Buffer<Self::Scalar>);
}

// =============================================================================
// CPU 后端
// =============================================================================

/// CPU 执行方式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ExecutionMode {
    /// 单线程顺序执行
    #[default]
    Serial,
    /// rayon 线程池并行执行
    Parallel,
}

/// CPU 后端
///
/// 串行与并行实例是两个不同的执行上下文，彼此比较不相等。
#[derive(Clone, Copy, PartialEq, Default)]
pub struct CpuBackend<S: RuntimeScalar> {
    mode: ExecutionMode,
    _marker: PhantomData<S>,
}

impl<S: RuntimeScalar> CpuBackend<S> {
    /// 创建串行 CPU 后端
    pub fn new() -> Self {
        Self::with_mode(ExecutionMode::Serial)
    }

    /// 串行 CPU 后端
    pub fn serial() -> Self {
        Self::with_mode(ExecutionMode::Serial)
    }

    /// rayon 并行 CPU 后端
    pub fn parallel() -> Self {
        Self::with_mode(ExecutionMode::Parallel)
    }

    /// 指定执行方式
    pub fn with_mode(mode: ExecutionMode) -> Self {
        Self {
            mode,
            _marker: PhantomData,
        }
    }

    /// 执行方式
    pub fn mode(&self) -> ExecutionMode {
        self.mode
    }
}

impl<S: RuntimeScalar> fmt::Debug for CpuBackend<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl<S: RuntimeScalar> fmt::Display for CpuBackend<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl<S: RuntimeScalar> Backend for CpuBackend<S> {
    type Scalar = S;
    type Buffer<T: Pod + Clone + Send + Sync> = Vec<T>;

    fn name(&self) -> &'static str {
        let single = std::mem::size_of::<S>() == 4;
        match (self.mode, single) {
            (ExecutionMode::Serial, true) => "CPU-serial-f32",
            (ExecutionMode::Serial, false) => "CPU-serial-f64",
            (ExecutionMode::Parallel, true) => "CPU-parallel-f32",
            (ExecutionMode::Parallel, false) => "CPU-parallel-f64",
        }
    }

    fn alloc<T: Pod + Clone + Default + Send + Sync>(&self, len: usize) -> Vec<T> {
        vec![T::default(); len]
    }

    fn parallel_for<K>(&self, data: &mut [S], range: Range<usize>, kernel: K)
    where
        K: Fn(usize, S) -> S + Send + Sync,
    {
        let start = range.start;
        let window = &mut data[range];
        match self.mode {
            ExecutionMode::Serial => {
                for (k, x) in window.iter_mut().enumerate() {
                    *x = kernel(start + k, *x);
                }
            }
            ExecutionMode::Parallel => {
                window
                    .par_iter_mut()
                    .enumerate()
                    .for_each(|(k, x)| *x = kernel(start + k, *x));
            }
        }
    }

    fn axpy(&self, alpha: S, x: &Vec<S>, y: &mut Vec<S>) {
        let n = y.len();
        self.parallel_for(y, 0..n, |i, yi| yi + alpha * x[i]);
    }

    fn copy(&self, src: &Vec<S>, dst: &mut Vec<S>) {
        dst.copy_from_slice(src);
    }

    fn scale(&self, alpha: S, x: &mut Vec<S>) {
        let n = x.len();
        self.parallel_for(x, 0..n, |_, xi| alpha * xi);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cpu_backend_names() {
        assert_eq!(CpuBackend::<f64>::serial().name(), "CPU-serial-f64");
        assert_eq!(CpuBackend::<f32>::parallel().name(), "CPU-parallel-f32");
    }

    #[test]
    fn test_context_identity() {
        let a = CpuBackend::<f64>::serial();
        assert!(a.same_context(&CpuBackend::<f64>::new()));
        assert!(!a.same_context(&CpuBackend::<f64>::parallel()));
    }

    #[test]
    fn test_parallel_for_visits_range_once() {
        for backend in [CpuBackend::<f64>::serial(), CpuBackend::<f64>::parallel()] {
            let mut data = vec![0.0; 8];
            backend.parallel_for(&mut data, 2..6, |i, v| v + i as f64);
            assert_eq!(data, vec![0.0, 0.0, 2.0, 3.0, 4.0, 5.0, 0.0, 0.0]);
        }
    }

    #[test]
    fn test_axpy() {
        let backend = CpuBackend::<f64>::new();
        let x = vec![1.0, 2.0, 3.0];
        let mut y = vec![1.0, 1.0, 1.0];
        backend.axpy(2.0, &x, &mut y);
        assert_eq!(y, vec![3.0, 5.0, 7.0]);
    }
}
