// crates/mh_config/src/time_integration.rs

//! 时间积分配置（全 f64）
//!
//! - [`TimeIntegrationConfig`]: 积分器名称、Runge-Kutta 方法与自适应控制参数
//! - [`TimeControlConfig`]: 起止时间、初始步长与失败缩步次数
//! - [`RunConfig`]: 以上两者的组合，对应一个 JSON 配置文件
//!
//! ```json
//! {
//!   "time_integration": { "integrator": "Runge-Kutta", "method": "Bogacki-Shampine" },
//!   "time_control": { "end_time": 2.0, "dt": 0.1 }
//! }
//! ```

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::ConfigError;

/// 时间积分器配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeIntegrationConfig {
    /// 注册表中的积分器名称
    #[serde(default = "default_integrator")]
    pub integrator: String,

    /// Runge-Kutta Butcher 表名称
    #[serde(default = "default_method")]
    pub method: String,

    /// 相对容差
    #[serde(default = "default_rtol")]
    pub relative_tolerance: f64,

    /// 绝对容差
    #[serde(default = "default_atol")]
    pub absolute_tolerance: f64,

    /// 单个时间步内允许的最大子步数
    #[serde(default = "default_max_substeps")]
    pub max_substeps: usize,

    /// 最小子步长 [s]
    #[serde(default = "default_min_step")]
    pub min_step: f64,

    /// 步长控制安全系数
    #[serde(default = "default_safety")]
    pub safety: f64,
}

fn default_integrator() -> String { "Runge-Kutta".to_string() }
fn default_method() -> String { "Dormand-Prince".to_string() }
fn default_rtol() -> f64 { 1e-6 }
fn default_atol() -> f64 { 1e-9 }
fn default_max_substeps() -> usize { 500 }
fn default_min_step() -> f64 { 1e-12 }
fn default_safety() -> f64 { 0.9 }

impl Default for TimeIntegrationConfig {
    fn default() -> Self {
        Self {
            integrator: default_integrator(),
            method: default_method(),
            relative_tolerance: default_rtol(),
            absolute_tolerance: default_atol(),
            max_substeps: default_max_substeps(),
            min_step: default_min_step(),
            safety: default_safety(),
        }
    }
}

impl TimeIntegrationConfig {
    /// 指定积分器与方法，其余取默认值
    pub fn new(integrator: impl Into<String>, method: impl Into<String>) -> Self {
        Self {
            integrator: integrator.into(),
            method: method.into(),
            ..Self::default()
        }
    }

    /// 验证配置有效性
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.integrator.trim().is_empty() {
            return Err(ConfigError::invalid("integrator", "", "积分器名称不能为空"));
        }
        if self.method.trim().is_empty() {
            return Err(ConfigError::invalid("method", "", "方法名称不能为空"));
        }
        if self.relative_tolerance.is_nan() || self.relative_tolerance <= 0.0 {
            return Err(ConfigError::invalid(
                "relative_tolerance",
                self.relative_tolerance,
                "相对容差必须为正",
            ));
        }
        if self.absolute_tolerance.is_nan() || self.absolute_tolerance < 0.0 {
            return Err(ConfigError::invalid(
                "absolute_tolerance",
                self.absolute_tolerance,
                "绝对容差不能为负",
            ));
        }
        if self.max_substeps == 0 {
            return Err(ConfigError::invalid("max_substeps", 0, "至少允许一个子步"));
        }
        if self.min_step.is_nan() || self.min_step < 0.0 {
            return Err(ConfigError::invalid("min_step", self.min_step, "最小步长不能为负"));
        }
        if self.safety.is_nan() || self.safety <= 0.0 || self.safety > 1.0 {
            return Err(ConfigError::invalid(
                "safety",
                self.safety,
                "安全系数必须在 (0, 1] 范围内",
            ));
        }
        Ok(())
    }
}

/// 时间推进控制
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeControlConfig {
    /// 起始时间 [s]
    #[serde(default)]
    pub start_time: f64,

    /// 结束时间 [s]
    #[serde(default = "default_end_time")]
    pub end_time: f64,

    /// 初始时间步长 [s]
    #[serde(default = "default_dt")]
    pub dt: f64,

    /// 单步失败时允许的步长减半次数
    #[serde(default = "default_max_dt_halvings")]
    pub max_dt_halvings: u32,
}

fn default_end_time() -> f64 { 1.0 }
fn default_dt() -> f64 { 0.01 }
fn default_max_dt_halvings() -> u32 { 8 }

impl Default for TimeControlConfig {
    fn default() -> Self {
        Self {
            start_time: 0.0,
            end_time: default_end_time(),
            dt: default_dt(),
            max_dt_halvings: default_max_dt_halvings(),
        }
    }
}

impl TimeControlConfig {
    /// 验证配置有效性
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.start_time.is_finite() {
            return Err(ConfigError::invalid("start_time", self.start_time, "必须为有限值"));
        }
        if !self.end_time.is_finite() || self.end_time < self.start_time {
            return Err(ConfigError::invalid(
                "end_time",
                self.end_time,
                "结束时间不能早于起始时间",
            ));
        }
        if !self.dt.is_finite() || self.dt <= 0.0 {
            return Err(ConfigError::invalid("dt", self.dt, "时间步长必须为有限正数"));
        }
        Ok(())
    }
}

/// 运行配置
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunConfig {
    /// 时间积分器
    #[serde(default)]
    pub time_integration: TimeIntegrationConfig,

    /// 时间推进控制
    #[serde(default)]
    pub time_control: TimeControlConfig,
}

impl RunConfig {
    /// 从 JSON 字符串解析并验证
    pub fn from_json_str(content: &str) -> Result<Self, ConfigError> {
        let config: RunConfig = serde_json::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// 从文件加载配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_json_str(&content)
    }

    /// 验证配置有效性
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.time_integration.validate()?;
        self.time_control.validate()
    }

    /// 保存配置到文件
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}
