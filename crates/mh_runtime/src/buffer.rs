// crates/mh_runtime/src/buffer.rs

//! DeviceBuffer - 设备缓冲区抽象
//!
//! 场与 ODE 向量的底层存储。CPU 实现为 `Vec<T>`，
//! 连续内存可直接以切片形式访问。

use bytemuck::Pod;

/// 设备缓冲区 Trait
pub trait DeviceBuffer<T: Pod + Clone + Send + Sync>: Clone + Send + Sync {
    /// 返回缓冲区长度
    fn len(&self) -> usize;

    /// 检查是否为空
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// 只读连续视图
    fn as_slice(&self) -> &[T];

    /// 可变连续视图
    fn as_slice_mut(&mut self) -> &mut [T];

    /// 用指定值填充
    fn fill(&mut self, value: T) {
        self.as_slice_mut().fill(value);
    }

    /// 从等长切片复制数据
    ///
    /// # Panics
    ///
    /// 长度不一致时 panic，调用方负责先检查长度。
    fn copy_from_slice(&mut self, src: &[T]) {
        self.as_slice_mut().copy_from_slice(src);
    }

    /// 复制到主机 Vec
    fn copy_to_vec(&self) -> Vec<T> {
        self.as_slice().to_vec()
    }
}

impl<T: Pod + Clone + Send + Sync> DeviceBuffer<T> for Vec<T> {
    #[inline]
    fn len(&self) -> usize {
        Vec::len(self)
    }

    #[inline]
    fn as_slice(&self) -> &[T] {
        self
    }

    #[inline]
    fn as_slice_mut(&mut self) -> &mut [T] {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vec_buffer() {
        let mut buf: Vec<f64> = vec![0.0; 4];
        DeviceBuffer::fill(&mut buf, 2.0);
        assert_eq!(buf.copy_to_vec(), vec![2.0; 4]);

        DeviceBuffer::copy_from_slice(&mut buf, &[1.0, 2.0, 3.0, 4.0]);
        assert_eq!(buf.as_slice()[3], 4.0);
        assert!(!DeviceBuffer::is_empty(&buf));
    }
}
