//! # 分子物性数据库
//!
//! 提供谱线展宽所需的分子质量和碰撞半径。
//!
//! ## 数据来源
//! - 质量：IUPAC 标准原子量
//! - 碰撞半径：动力学直径的一半（Lorentz 展宽的硬球模型）
//!
//! ## 依赖关系
//! - 被 `models/atmosphere.rs` 解析物种时调用
//! - 纯静态数据，无外部依赖

use std::collections::HashMap;
use std::sync::LazyLock;

/// 分子物性参数
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MoleculeProperties {
    /// 分子质量 (amu)
    pub mass: f64,
    /// 碰撞半径 (Å)
    pub radius: f64,
}

/// 分子物性数据库
pub static MOLECULES: LazyLock<HashMap<&'static str, MoleculeProperties>> = LazyLock::new(|| {
    let mut m = HashMap::new();

    let mut add = |name: &'static str, mass: f64, radius: f64| {
        m.insert(name, MoleculeProperties { mass, radius });
    };

    // 原子
    add("H", 1.00794, 0.5);
    add("He", 4.002602, 1.095);
    add("Na", 22.98977, 2.27);
    add("K", 39.0983, 2.75);

    // 双原子分子
    add("H2", 2.01588, 1.445);
    add("N2", 28.0134, 1.87);
    add("O2", 31.9988, 1.73);
    add("CO", 28.0101, 1.69);
    add("NO", 30.0061, 1.585);
    add("OH", 17.00734, 1.4);
    add("VO", 66.9409, 1.8);
    add("TiO", 63.8664, 1.8);

    // 多原子分子
    add("H2O", 18.01528, 1.6);
    add("CO2", 44.0095, 1.9);
    add("O3", 47.9982, 1.9);
    add("N2O", 44.0128, 1.9);
    add("CH4", 16.0425, 1.9);
    add("NH3", 17.03052, 1.65);
    add("HCN", 27.02534, 1.8);
    add("C2H2", 26.0373, 1.65);
    add("H2S", 34.08088, 1.8);
    add("SO2", 64.0638, 2.0);
    add("PH3", 33.99758, 1.9);

    m
});

/// 查找分子物性
pub fn lookup(name: &str) -> Option<MoleculeProperties> {
    MOLECULES.get(name).copied()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_known_molecules() {
        let h2 = lookup("H2").unwrap();
        assert!((h2.mass - 2.01588).abs() < 1e-10);
        assert!((h2.radius - 1.445).abs() < 1e-10);
        assert!(lookup("H2O").is_some());
        assert!(lookup("Unobtainium").is_none());
    }
}
