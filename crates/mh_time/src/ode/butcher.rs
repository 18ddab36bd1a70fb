// crates/mh_time/src/ode/butcher.rs

//! 显式 Runge-Kutta Butcher 表
//!
//! ```text
//!  c_0 |
//!  c_1 | a_10
//!  c_2 | a_20 a_21
//!  ... | ...
//! -----+---------------
//!      | b_0  b_1  ...      (推进解，order 阶)
//!      | b̂_0  b̂_1  ...      (嵌入解，embedded_order 阶，可选)
//! ```
//!
//! 带嵌入解的表用于自适应子步：局部误差估计为
//! `h * Σ (b_i - b̂_i) k_i`。无嵌入解的表每次调用只走一个定步长。

use mh_foundation::error::{MhError, MhResult};

/// Butcher 表
#[derive(Debug, Clone, PartialEq)]
pub struct ButcherTable {
    name: &'static str,
    order: u8,
    embedded_order: Option<u8>,
    c: Vec<f64>,
    a: Vec<Vec<f64>>,
    b: Vec<f64>,
    b_hat: Option<Vec<f64>>,
}

impl ButcherTable {
    /// 全部内置表名称
    pub const NAMES: [&'static str; 5] = [
        "Forward-Euler",
        "Midpoint",
        "Heun",
        "Bogacki-Shampine",
        "Dormand-Prince",
    ];

    /// 按名称查找，未知名称返回列出全部合法名称的 `NotFound`
    pub fn by_name(name: &str) -> MhResult<Self> {
        match name {
            "Forward-Euler" => Ok(Self::forward_euler()),
            "Midpoint" => Ok(Self::midpoint()),
            "Heun" => Ok(Self::heun_euler()),
            "Bogacki-Shampine" => Ok(Self::bogacki_shampine()),
            "Dormand-Prince" => Ok(Self::dormand_prince()),
            _ => Err(MhError::not_found(
                "Runge-Kutta 方法",
                name,
                Self::NAMES.iter().map(|s| s.to_string()).collect(),
            )),
        }
    }

    /// 前向欧拉，一阶
    pub fn forward_euler() -> Self {
        Self {
            name: "Forward-Euler",
            order: 1,
            embedded_order: None,
            c: vec![0.0],
            a: vec![vec![]],
            b: vec![1.0],
            b_hat: None,
        }
    }

    /// 显式中点法，二阶
    pub fn midpoint() -> Self {
        Self {
            name: "Midpoint",
            order: 2,
            embedded_order: None,
            c: vec![0.0, 0.5],
            a: vec![vec![], vec![0.5]],
            b: vec![0.0, 1.0],
            b_hat: None,
        }
    }

    /// Heun-Euler 2(1)
    pub fn heun_euler() -> Self {
        Self {
            name: "Heun",
            order: 2,
            embedded_order: Some(1),
            c: vec![0.0, 1.0],
            a: vec![vec![], vec![1.0]],
            b: vec![0.5, 0.5],
            b_hat: Some(vec![1.0, 0.0]),
        }
    }

    /// Bogacki-Shampine 3(2)
    pub fn bogacki_shampine() -> Self {
        Self {
            name: "Bogacki-Shampine",
            order: 3,
            embedded_order: Some(2),
            c: vec![0.0, 0.5, 0.75, 1.0],
            a: vec![
                vec![],
                vec![0.5],
                vec![0.0, 0.75],
                vec![2.0 / 9.0, 1.0 / 3.0, 4.0 / 9.0],
            ],
            b: vec![2.0 / 9.0, 1.0 / 3.0, 4.0 / 9.0, 0.0],
            b_hat: Some(vec![7.0 / 24.0, 0.25, 1.0 / 3.0, 0.125]),
        }
    }

    /// Dormand-Prince 5(4)
    pub fn dormand_prince() -> Self {
        Self {
            name: "Dormand-Prince",
            order: 5,
            embedded_order: Some(4),
            c: vec![0.0, 0.2, 0.3, 0.8, 8.0 / 9.0, 1.0, 1.0],
            a: vec![
                vec![],
                vec![0.2],
                vec![3.0 / 40.0, 9.0 / 40.0],
                vec![44.0 / 45.0, -56.0 / 15.0, 32.0 / 9.0],
                vec![
                    19372.0 / 6561.0,
                    -25360.0 / 2187.0,
                    64448.0 / 6561.0,
                    -212.0 / 729.0,
                ],
                vec![
                    9017.0 / 3168.0,
                    -355.0 / 33.0,
                    46732.0 / 5247.0,
                    49.0 / 176.0,
                    -5103.0 / 18656.0,
                ],
                vec![
                    35.0 / 384.0,
                    0.0,
                    500.0 / 1113.0,
                    125.0 / 192.0,
                    -2187.0 / 6784.0,
                    11.0 / 84.0,
                ],
            ],
            b: vec![
                35.0 / 384.0,
                0.0,
                500.0 / 1113.0,
                125.0 / 192.0,
                -2187.0 / 6784.0,
                11.0 / 84.0,
                0.0,
            ],
            b_hat: Some(vec![
                5179.0 / 57600.0,
                0.0,
                7571.0 / 16695.0,
                393.0 / 640.0,
                -92097.0 / 339200.0,
                187.0 / 2100.0,
                1.0 / 40.0,
            ]),
        }
    }

    /// 表名称
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// 级数
    pub fn stages(&self) -> usize {
        self.b.len()
    }

    /// 推进解阶数
    pub fn order(&self) -> u8 {
        self.order
    }

    /// 嵌入解阶数
    pub fn embedded_order(&self) -> Option<u8> {
        self.embedded_order
    }

    /// 是否支持自适应子步
    pub fn is_adaptive(&self) -> bool {
        self.b_hat.is_some()
    }

    /// 节点 c_i
    pub fn c(&self) -> &[f64] {
        &self.c
    }

    /// 第 i 行系数 a_ij (j < i)
    pub fn a_row(&self, i: usize) -> &[f64] {
        &self.a[i]
    }

    /// 权重 b_i
    pub fn b(&self) -> &[f64] {
        &self.b
    }

    /// 误差权重 b_i - b̂_i
    pub fn error_weights(&self) -> Option<Vec<f64>> {
        self.b_hat
            .as_ref()
            .map(|b_hat| self.b.iter().zip(b_hat).map(|(b, bh)| b - bh).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn check_consistency(table: &ButcherTable) {
        let s = table.stages();
        assert_eq!(table.c().len(), s, "{}", table.name());
        for i in 0..s {
            let row = table.a_row(i);
            assert_eq!(row.len(), i, "{} 第 {i} 行", table.name());
            let sum: f64 = row.iter().sum();
            assert!((sum - table.c()[i]).abs() < 1e-14, "{} 行和 != c_{i}", table.name());
        }
        let b_sum: f64 = table.b().iter().sum();
        assert!((b_sum - 1.0).abs() < 1e-14, "{} Σb != 1", table.name());
        if let Some(w) = table.error_weights() {
            let w_sum: f64 = w.iter().sum();
            assert!(w_sum.abs() < 1e-14, "{} Σ(b - b̂) != 0", table.name());
        }
    }

    #[test]
    fn test_all_tables_consistent() {
        for name in ButcherTable::NAMES {
            let table = ButcherTable::by_name(name).unwrap();
            assert_eq!(table.name(), name);
            check_consistency(&table);
        }
    }

    #[test]
    fn test_adaptivity() {
        assert!(!ButcherTable::forward_euler().is_adaptive());
        assert!(!ButcherTable::midpoint().is_adaptive());
        assert!(ButcherTable::dormand_prince().is_adaptive());
        assert_eq!(ButcherTable::dormand_prince().order(), 5);
        assert_eq!(ButcherTable::bogacki_shampine().embedded_order(), Some(2));
    }

    #[test]
    fn test_unknown_method() {
        match ButcherTable::by_name("RK4") {
            Err(MhError::NotFound { available, .. }) => {
                assert_eq!(available.len(), ButcherTable::NAMES.len());
            }
            other => panic!("意外结果: {other:?}"),
        }
    }
}
