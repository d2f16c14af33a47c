//! # 有界区间搜索
//!
//! 在按关键字升序排列的记录中定位窗口边界：先二分，再沿指定方向线性细化
//! （跨过重复值），最后截断到 `[imin, imax]`。
//!
//! ## 约定
//! - `Down`：第一个满足 `key >= target` 的记录（窗口下界，含端点）
//! - `Up`：最后一个满足 `key <= target` 的记录（窗口上界，含端点）
//! - 中点使用向下取整 `lo + (hi - lo) / 2`
//!
//! 目标值完全落在文件关键字范围之外时，由调用方事先比较首尾关键字来判断，
//! 而不是依赖搜索失败。
//!
//! ## 依赖关系
//! - 被 `database/mod.rs` 的 `query_range` 调用

use crate::error::Result;

/// 搜索方向
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchDirection {
    /// 下界：第一个 `key >= target`
    Down,
    /// 上界：最后一个 `key <= target`
    Up,
}

/// 在 `[imin, imax]` 内搜索 `target` 的边界索引
///
/// `key_at` 随机读取第 i 条记录的关键字，每次迭代只读一次。
pub fn bounded_search<F>(
    mut key_at: F,
    target: f64,
    imin: usize,
    imax: usize,
    direction: SearchDirection,
) -> Result<usize>
where
    F: FnMut(usize) -> Result<f64>,
{
    if imax <= imin {
        return Ok(imin);
    }

    // 二分：保持 key(lo) <= target < key(hi)（端点除外）
    let mut lo = imin;
    let mut hi = imax;
    while hi - lo > 1 {
        let mid = lo + (hi - lo) / 2;
        if key_at(mid)? > target {
            hi = mid;
        } else {
            lo = mid;
        }
    }

    // 线性细化
    let index = match direction {
        SearchDirection::Down => {
            let mut irec = if key_at(lo)? < target { hi } else { lo };
            while irec > imin && key_at(irec - 1)? >= target {
                irec -= 1;
            }
            irec
        }
        SearchDirection::Up => {
            let mut irec = if key_at(hi)? <= target { hi } else { lo };
            while irec < imax && key_at(irec + 1)? <= target {
                irec += 1;
            }
            irec
        }
    };

    Ok(index.clamp(imin, imax))
}
