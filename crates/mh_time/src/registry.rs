// crates/mh_time/src/registry.rs

//! 进程级时间积分器注册中心
//!
//! 每种后端类型 `B` 各有一张 名称 → 构造器 表，存放在同一个
//! `RwLock` 保护的映射中（以 `TypeId` 区分）。注册中心没有隐式初始化：
//!
//! ```text
//! 启动  register_builtin_integrators::<B>()   // 注册 "Runge-Kutta"、"forwardEuler"
//! 运行  create_integrator::<B>(name, &config)
//! 退出  clear_integrators::<B>()
//! ```
//!
//! 未注册的名称返回 `NotFound`，错误信息包含合法名称的数量与列表。

use std::any::{Any, TypeId};
use std::collections::BTreeMap;

use parking_lot::RwLock;

use mh_config::TimeIntegrationConfig;
use mh_foundation::error::{MhError, MhResult};
use mh_foundation::registry::{ClassRegistry, RegistryEntry};
use mh_runtime::Backend;

use crate::forward_euler::ForwardEuler;
use crate::integrator::TimeIntegrator;
use crate::runge_kutta::RungeKutta;

/// 积分器构造器
pub type IntegratorCtor<B> = fn(&TimeIntegrationConfig) -> MhResult<Box<dyn TimeIntegrator<B>>>;

type IntegratorRegistry<B> = ClassRegistry<IntegratorCtor<B>>;

const KIND: &str = "时间积分器";

static REGISTRIES: RwLock<BTreeMap<TypeId, Box<dyn Any + Send + Sync>>> =
    parking_lot::const_rwlock(BTreeMap::new());

fn downcast_failure<B: Backend>() -> MhError {
    MhError::invalid_input(format!(
        "积分器注册表类型错误: {}",
        std::any::type_name::<B>()
    ))
}

fn with_registry<B: Backend, R>(
    f: impl FnOnce(Option<&IntegratorRegistry<B>>) -> R,
) -> MhResult<R> {
    let guard = REGISTRIES.read();
    match guard.get(&TypeId::of::<B>()) {
        None => Ok(f(None)),
        Some(any) => any
            .downcast_ref::<IntegratorRegistry<B>>()
            .map(|reg| f(Some(reg)))
            .ok_or_else(downcast_failure::<B>),
    }
}

fn with_registry_mut<B: Backend, R>(
    f: impl FnOnce(&mut IntegratorRegistry<B>) -> R,
) -> MhResult<R> {
    let mut guard = REGISTRIES.write();
    let any = guard.entry(TypeId::of::<B>()).or_insert_with(|| {
        Box::new(IntegratorRegistry::<B>::new(KIND)) as Box<dyn Any + Send + Sync>
    });
    any.downcast_mut::<IntegratorRegistry<B>>()
        .map(f)
        .ok_or_else(downcast_failure::<B>)
}

/// 注册积分器构造器，名称重复时返回 `AlreadyRegistered`
pub fn register_integrator<B: Backend>(
    name: &str,
    constructor: IntegratorCtor<B>,
    doc: &'static str,
    schema: &'static str,
) -> MhResult<()> {
    with_registry_mut::<B, _>(|reg| {
        reg.register(
            name,
            RegistryEntry {
                constructor,
                doc,
                schema,
            },
        )
    })??;
    log::debug!("注册时间积分器 '{}' ({})", name, std::any::type_name::<B>());
    Ok(())
}

fn build_runge_kutta<B: Backend>(
    config: &TimeIntegrationConfig,
) -> MhResult<Box<dyn TimeIntegrator<B>>> {
    Ok(Box::new(RungeKutta::<B>::from_config(config)?))
}

fn build_forward_euler<B: Backend>(
    _config: &TimeIntegrationConfig,
) -> MhResult<Box<dyn TimeIntegrator<B>>> {
    Ok(Box::new(ForwardEuler::<B>::new()))
}

/// 注册内置积分器；已存在的名称跳过，可重复调用
pub fn register_builtin_integrators<B: Backend>() -> MhResult<()> {
    let builtins: [(&str, IntegratorCtor<B>, &'static str, &'static str); 2] = [
        (
            RungeKutta::<B>::NAME,
            build_runge_kutta::<B>,
            RungeKutta::<B>::DOC,
            RungeKutta::<B>::SCHEMA,
        ),
        (
            ForwardEuler::<B>::NAME,
            build_forward_euler::<B>,
            ForwardEuler::<B>::DOC,
            ForwardEuler::<B>::SCHEMA,
        ),
    ];
    with_registry_mut::<B, _>(|reg| {
        for (name, constructor, doc, schema) in builtins {
            if reg.contains(name) {
                continue;
            }
            reg.register(
                name,
                RegistryEntry {
                    constructor,
                    doc,
                    schema,
                },
            )?;
            log::debug!("注册内置时间积分器 '{}'", name);
        }
        Ok(())
    })?
}

/// 按名称创建积分器
///
/// 构造器在读锁之外调用，构造过程中可以再次访问注册中心。
pub fn create_integrator<B: Backend>(
    name: &str,
    config: &TimeIntegrationConfig,
) -> MhResult<Box<dyn TimeIntegrator<B>>> {
    let ctor = with_registry::<B, _>(|reg| match reg {
        Some(reg) => reg.get(name).map(|e| e.constructor),
        None => Err(MhError::not_found(KIND, name, Vec::new())),
    })??;
    let integrator = ctor(config)?;
    log::debug!("创建时间积分器 '{}'", integrator.name());
    Ok(integrator)
}

/// 以配置中的 `integrator` 字段创建积分器
pub fn create_from_config<B: Backend>(
    config: &TimeIntegrationConfig,
) -> MhResult<Box<dyn TimeIntegrator<B>>> {
    create_integrator::<B>(&config.integrator, config)
}

/// 已注册名称（字典序）
pub fn registered_integrators<B: Backend>() -> Vec<String> {
    with_registry::<B, _>(|reg| reg.map(ClassRegistry::names).unwrap_or_default())
        .unwrap_or_default()
}

/// 名称对应的 `(doc, schema)`
pub fn describe_integrator<B: Backend>(name: &str) -> MhResult<(&'static str, &'static str)> {
    with_registry::<B, _>(|reg| match reg {
        Some(reg) => reg.get(name).map(|e| (e.doc, e.schema)),
        None => Err(MhError::not_found(KIND, name, Vec::new())),
    })?
}

/// 清空后端 `B` 的注册表，返回移除的条目数
pub fn clear_integrators<B: Backend>() -> usize {
    let removed = REGISTRIES
        .write()
        .remove(&TypeId::of::<B>())
        .and_then(|any| any.downcast::<IntegratorRegistry<B>>().ok())
        .map_or(0, |reg| reg.len());
    log::debug!(
        "清空时间积分器注册表 ({}): {} 项",
        std::any::type_name::<B>(),
        removed
    );
    removed
}
