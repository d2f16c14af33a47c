//! # 自然三次样条
//!
//! 在采样点处精确重现采样值，区间外不外推（返回 `None`）。
//!
//! ## 依赖关系
//! - 被 `partition/mod.rs` 使用
//! - 无外部模块依赖

/// 自然三次样条（端点二阶导数为零）
#[derive(Debug, Clone)]
pub struct CubicSpline {
    x: Vec<f64>,
    y: Vec<f64>,
    /// 各节点处的二阶导数
    m: Vec<f64>,
}

impl CubicSpline {
    /// 构造样条，要求至少两个点且 x 严格递增
    pub fn new(x: Vec<f64>, y: Vec<f64>) -> Result<Self, String> {
        let n = x.len();
        if n < 2 {
            return Err(format!("need at least 2 samples, got {}", n));
        }
        if y.len() != n {
            return Err(format!("{} abscissae but {} values", n, y.len()));
        }
        if x.windows(2).any(|w| !(w[1] > w[0])) {
            return Err("sample abscissae must be strictly increasing".to_string());
        }

        // 三对角方程组（Thomas 算法）
        let mut m = vec![0.0; n];
        if n > 2 {
            let mut c_prime = vec![0.0; n];
            let mut d_prime = vec![0.0; n];
            for i in 1..n - 1 {
                let h0 = x[i] - x[i - 1];
                let h1 = x[i + 1] - x[i];
                let a = h0;
                let b = 2.0 * (h0 + h1);
                let c = h1;
                let d = 6.0 * ((y[i + 1] - y[i]) / h1 - (y[i] - y[i - 1]) / h0);
                let denom = b - a * c_prime[i - 1];
                c_prime[i] = c / denom;
                d_prime[i] = (d - a * d_prime[i - 1]) / denom;
            }
            for i in (1..n - 1).rev() {
                m[i] = d_prime[i] - c_prime[i] * m[i + 1];
            }
        }

        Ok(Self { x, y, m })
    }

    /// 定义域 [min, max]
    pub fn domain(&self) -> (f64, f64) {
        (self.x[0], self.x[self.x.len() - 1])
    }

    /// 在 `t` 处求值；区间外返回 `None`
    pub fn eval(&self, t: f64) -> Option<f64> {
        let (lo, hi) = self.domain();
        if !(t >= lo && t <= hi) {
            return None;
        }
        // 满足 x[i] <= t 的最后一个区间
        let i = self
            .x
            .partition_point(|&xi| xi <= t)
            .saturating_sub(1)
            .min(self.x.len() - 2);

        let h = self.x[i + 1] - self.x[i];
        let a = (self.x[i + 1] - t) / h;
        let b = (t - self.x[i]) / h;
        Some(
            a * self.y[i]
                + b * self.y[i + 1]
                + ((a * a * a - a) * self.m[i] + (b * b * b - b) * self.m[i + 1]) * h * h / 6.0,
        )
    }
}
