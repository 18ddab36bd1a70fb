// crates/mh_config/src/lib.rs

//! MariHydro Config Layer (Layer 4)
//!
//! 配置层，提供时间积分与时间推进的 JSON 配置。
//! 本层完全无泛型，所有数值使用 f64，进入计算核心时再转换到目标精度。
//!
//! # 模块概览
//!
//! - [`time_integration`]: TimeIntegrationConfig / TimeControlConfig / RunConfig
//! - [`error`]: 配置错误类型

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod time_integration;

/// 层级标识
pub const LAYER: u8 = 4;

// 重导出核心类型
pub use error::ConfigError;
pub use time_integration::{RunConfig, TimeControlConfig, TimeIntegrationConfig};
