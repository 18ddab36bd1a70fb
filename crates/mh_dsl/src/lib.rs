// crates/mh_dsl/src/lib.rs

//! MariHydro 项组合层 (Layer 3)
//!
//! 把离散化后的 PDE 项组合为单一代数对象 [`Expression`]，
//! 并计算其显式贡献，供时间积分器作为导数函数使用。
//!
//! # 模块概览
//!
//! - [`term`]: `TermKind`、`TermModel` 与 `Term`
//! - [`expression`]: 按类别分区的 `Expression` 及其运算符
//! - [`models`]: 内置离散模型（常值、逐单元、线性、函数源项与 `Ddt`）
//!
//! # 示例
//!
//! ```
//! use mh_dsl::prelude::*;
//! use mh_runtime::CpuBackend;
//!
//! let exec = CpuBackend::<f64>::new();
//! let expr = Term::temporal(&exec, Ddt)
//!     + Term::explicit(&exec, ConstantSource::new(5.0));
//!
//! let source = expr.explicit_operation(4).unwrap();
//! assert_eq!(source.copy_to_host(), vec![5.0; 4]);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod expression;
pub mod models;
pub mod term;

/// 层级标识
pub const LAYER: u8 = 3;

pub use expression::Expression;
pub use models::{ConstantSource, Ddt, FieldSource, FnSource, LinearSource};
pub use term::{Term, TermContext, TermKind, TermModel};

/// Prelude 模块
pub mod prelude {
    //! 常用类型预导入
    pub use crate::expression::Expression;
    pub use crate::models::{ConstantSource, Ddt, FieldSource, FnSource, LinearSource};
    pub use crate::term::{Term, TermContext, TermKind, TermModel};
}
