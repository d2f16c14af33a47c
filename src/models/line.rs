//! # 谱线跃迁数据模型
//!
//! ## 依赖关系
//! - 被 `database/` 读取并生成
//! - 被 `extinction/` 累加消光系数时使用

use serde::{Deserialize, Serialize};

/// 一条谱线跃迁记录（读取后不可变）
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LineRecord {
    /// 中心波数 (cm⁻¹)
    pub wavenumber: f64,
    /// 下能级能量 (cm⁻¹)
    pub elow: f64,
    /// 加权振子强度 gf
    pub gf: f64,
    /// 同位素在所属数据库同位素列表中的索引
    pub isotope: usize,
}

/// 同位素信息
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IsotopeInfo {
    /// 同位素表中的分子编号
    pub molecule_id: u32,
    /// 分子名称
    pub molecule: String,
    /// 同位素名称（HITRAN 或 ExoMol 命名）
    pub name: String,
    /// 质量 (amu)
    pub mass: f64,
    /// 地球丰度比
    pub ratio: f64,
}

/// 一组按列存储的谱线（构建阶段只读共享）
#[derive(Debug, Clone, Default)]
pub struct LineList {
    pub wavenumber: Vec<f64>,
    pub elow: Vec<f64>,
    pub gf: Vec<f64>,
    /// 全局同位素索引（跨数据库）
    pub isotope: Vec<usize>,
}

impl LineList {
    pub fn len(&self) -> usize {
        self.wavenumber.len()
    }

    pub fn is_empty(&self) -> bool {
        self.wavenumber.is_empty()
    }

    /// 追加一条记录，同位素索引替换为全局索引
    pub fn push(&mut self, record: &LineRecord, isotope: usize) {
        self.wavenumber.push(record.wavenumber);
        self.elow.push(record.elow);
        self.gf.push(record.gf);
        self.isotope.push(isotope);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_uses_global_isotope() {
        let records = vec![
            LineRecord {
                wavenumber: 10.0,
                elow: 1.0,
                gf: 0.1,
                isotope: 0,
            },
            LineRecord {
                wavenumber: 11.0,
                elow: 2.0,
                gf: 0.2,
                isotope: 1,
            },
        ];
        let mut list = LineList::default();
        for rec in &records {
            list.push(rec, rec.isotope + 3);
        }

        assert_eq!(list.len(), 2);
        assert_eq!(list.isotope, vec![3, 4]);
        assert_eq!(list.gf, vec![0.1, 0.2]);
    }
}
