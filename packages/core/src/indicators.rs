//! 技术指标计算模块
//!
//! 提供跨平台的技术指标算法实现，确保所有平台计算结果一致。
//!
//! 所有函数都是纯函数：无共享状态、无 I/O，对合法数值输入永不失败。
//! 历史数据不足时对应位置输出 `None`（派生序列与输入序列始终等长），
//! 序列整体过短时返回全 `None` 序列而不是错误。

use crate::models::DerivedSeries;

/// 技术指标计算器
#[derive(Debug, Clone)]
pub struct IndicatorEngine {
    precision: usize,
}

impl IndicatorEngine {
    /// 创建新的技术指标计算器
    pub fn new() -> Self {
        Self { precision: 4 }
    }

    /// 设置计算精度
    pub fn with_precision(precision: usize) -> Self {
        Self { precision }
    }

    /// 计算简单移动平均线 (SMA)
    ///
    /// 位置 i 为截至 i（含）最近 `window` 个收盘价的算术平均，
    /// 仅在 i >= window - 1 时有定义。序列长度不足 `window` 时全部为 `None`。
    pub fn calculate_sma(&self, prices: &[f64], window: usize) -> DerivedSeries {
        let mut sma = vec![None; prices.len()];
        if window == 0 || prices.len() < window {
            return sma;
        }

        // 滑动窗口求和
        let mut sum: f64 = prices[..window].iter().sum();
        sma[window - 1] = Some((sum / window as f64).round_to(self.precision));

        for i in window..prices.len() {
            sum = sum - prices[i - window] + prices[i];
            sma[i] = Some((sum / window as f64).round_to(self.precision));
        }

        sma
    }

    /// 计算指数移动平均线 (EMA)
    ///
    /// 采用 adjust=false 递推：ema[0] = prices[0]，
    /// ema[i] = α·prices[i] + (1-α)·ema[i-1]，α = 2/(span+1)。
    /// 每个位置都有定义（无 `None` 前缀），与 SMA 类指标不同。
    pub fn calculate_ema(&self, prices: &[f64], span: usize) -> Vec<f64> {
        if prices.is_empty() {
            return vec![];
        }

        let mut ema = vec![0.0; prices.len()];
        let multiplier = 2.0 / (span + 1) as f64;

        ema[0] = prices[0];
        for i in 1..prices.len() {
            ema[i] = ((prices[i] - ema[i - 1]) * multiplier + ema[i - 1]).round_to(self.precision);
        }

        ema
    }

    /// 计算相对强弱指标 (RSI)
    ///
    /// 涨跌幅平滑采用 `period` 窗口的简单滚动平均而非 Wilder 指数平滑，
    /// 与仪表盘各端保持一致，不要按教科书公式"修正"。
    ///
    /// 位置 i 在累计到 `period` 个差分后才有定义（即 i >= period）。
    /// 窗口内平均跌幅为 0 时 RSI 恒为 100（rs 视为正无穷，不产生 NaN）。
    pub fn calculate_rsi(&self, prices: &[f64], period: usize) -> DerivedSeries {
        let mut rsi = vec![None; prices.len()];
        if period == 0 || prices.len() < period + 1 {
            return rsi;
        }

        // 差分序列：deltas[j] 对应位置 j+1
        let deltas: Vec<f64> = prices.windows(2).map(|w| w[1] - w[0]).collect();

        for i in period..prices.len() {
            // 每个位置在窗口切片上直接求和。滑动累加会留下浮点残差，
            // 使真实跌幅全为零的窗口测不出 avg_loss == 0。
            let window = &deltas[i - period..i];
            let gain_sum: f64 = window.iter().map(|d| d.max(0.0)).sum();
            let loss_sum: f64 = window.iter().map(|d| (-d).max(0.0)).sum();

            rsi[i] = if loss_sum == 0.0 {
                Some(100.0)
            } else {
                let avg_gain = gain_sum / period as f64;
                let avg_loss = loss_sum / period as f64;
                let rs = avg_gain / avg_loss;
                Some((100.0 - 100.0 / (1.0 + rs)).round_to(self.precision))
            };
        }

        rsi
    }

    /// 计算移动平均收敛散度 (MACD)
    ///
    /// 返回 (MACD 线, 信号线)。两条序列在每个位置都有定义。
    pub fn calculate_macd(
        &self,
        prices: &[f64],
        fast: usize,
        slow: usize,
        signal: usize,
    ) -> (Vec<f64>, Vec<f64>) {
        let ema_fast = self.calculate_ema(prices, fast);
        let ema_slow = self.calculate_ema(prices, slow);

        let macd_line: Vec<f64> = ema_fast
            .iter()
            .zip(ema_slow.iter())
            .map(|(f, s)| (f - s).round_to(self.precision))
            .collect();

        let signal_line = self.calculate_ema(&macd_line, signal);

        (macd_line, signal_line)
    }

    /// 计算布林带 (Bollinger Bands)
    ///
    /// 返回 (中轨, 上轨, 下轨)。中轨即 SMA(window)；
    /// 上下轨为中轨 ± num_std 倍的样本标准差（分母 window - 1）。
    /// 中轨或标准差无定义的位置输出 `None`；window < 2 时上下轨全部为 `None`。
    pub fn calculate_bollinger_bands(
        &self,
        prices: &[f64],
        window: usize,
        num_std: f64,
    ) -> (DerivedSeries, DerivedSeries, DerivedSeries) {
        let mid = self.calculate_sma(prices, window);
        let mut upper = vec![None; prices.len()];
        let mut lower = vec![None; prices.len()];

        if window < 2 || prices.len() < window {
            return (mid, upper, lower);
        }

        for i in window - 1..prices.len() {
            let Some(mean) = mid[i] else { continue };

            let variance = prices[i + 1 - window..=i]
                .iter()
                .map(|&price| (price - mean).powi(2))
                .sum::<f64>()
                / (window - 1) as f64;
            let std_deviation = variance.sqrt();

            upper[i] = Some((mean + num_std * std_deviation).round_to(self.precision));
            lower[i] = Some((mean - num_std * std_deviation).round_to(self.precision));
        }

        (mid, upper, lower)
    }

    /// 计算百分比收益率
    ///
    /// 位置 i 为 (prices[i] - prices[i-1]) / prices[i-1] × 100，
    /// 位置 0 无前值，输出 `None`。不做任何平滑，也不做精度截断：
    /// 收益率按公式逐位精确输出，由渲染端决定展示精度。
    pub fn calculate_pct_return(&self, prices: &[f64]) -> DerivedSeries {
        let mut returns = vec![None; prices.len()];

        for i in 1..prices.len() {
            let prev = prices[i - 1];
            returns[i] = Some((prices[i] - prev) / prev * 100.0);
        }

        returns
    }
}

/// 浮点数精度处理辅助 trait
trait RoundTo {
    fn round_to(self, precision: usize) -> Self;
}

impl RoundTo for f64 {
    fn round_to(self, precision: usize) -> Self {
        let multiplier = 10_f64.powi(precision as i32);
        (self * multiplier).round() / multiplier
    }
}

impl Default for IndicatorEngine {
    fn default() -> Self {
        Self::new()
    }
}
