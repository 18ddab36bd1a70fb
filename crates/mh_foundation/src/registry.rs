// crates/mh_foundation/src/registry.rs

//! 按名称索引的类注册表
//!
//! 保存 名称 → 构造器 的映射，用于运行时按名称选择实现
//! （例如时间积分器）。注册表本身不是全局的：上层可以用
//! `RwLock` 包装出进程级实例，并显式调用注册与清理函数。
//!
//! 名称按字典序存储，因此 [`ClassRegistry::names`] 与
//! `NotFound` 错误中的列表顺序是确定的。

use std::collections::BTreeMap;

use crate::error::{MhError, MhResult};

/// 注册条目
#[derive(Debug, Clone)]
pub struct RegistryEntry<F> {
    /// 构造器
    pub constructor: F,
    /// 简要说明
    pub doc: &'static str,
    /// 配置模式描述
    pub schema: &'static str,
}

/// 名称 → 构造器 注册表
#[derive(Debug, Clone)]
pub struct ClassRegistry<F> {
    kind: &'static str,
    entries: BTreeMap<String, RegistryEntry<F>>,
}

impl<F> ClassRegistry<F> {
    /// 创建空注册表，`kind` 用于错误信息（如 "时间积分器"）
    pub const fn new(kind: &'static str) -> Self {
        Self {
            kind,
            entries: BTreeMap::new(),
        }
    }

    /// 注册类别描述
    pub fn kind(&self) -> &'static str {
        self.kind
    }

    /// 注册构造器，名称重复时返回 `AlreadyRegistered`
    pub fn register(&mut self, name: impl Into<String>, entry: RegistryEntry<F>) -> MhResult<()> {
        let name = name.into();
        if self.entries.contains_key(&name) {
            return Err(MhError::already_registered(self.kind, name));
        }
        self.entries.insert(name, entry);
        Ok(())
    }

    /// 按名称查找，未注册时返回列出全部合法名称的 `NotFound`
    pub fn get(&self, name: &str) -> MhResult<&RegistryEntry<F>> {
        self.entries
            .get(name)
            .ok_or_else(|| MhError::not_found(self.kind, name, self.names()))
    }

    /// 是否已注册
    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// 移除条目
    pub fn unregister(&mut self, name: &str) -> Option<RegistryEntry<F>> {
        self.entries.remove(name)
    }

    /// 全部已注册名称（字典序）
    pub fn names(&self) -> Vec<String> {
        self.entries.keys().cloned().collect()
    }

    /// 条目数量
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// 是否为空
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// 清空
    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
