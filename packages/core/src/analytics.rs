//! 分析引擎模块
//!
//! 把一条历史行情序列加工成仪表盘需要的全部派生序列和摘要指标。
//! 纯同步计算，每次渲染基于新拉取的数据重新构建，核心层不做缓存。

use chrono::Utc;

use crate::errors::{VistaError, VistaResult};
use crate::indicators::IndicatorEngine;
use crate::models::{AnalysisResult, IndicatorSeries, PriceSeries, SummaryMetrics};

/// 仪表盘使用的标准指标参数
const SMA_SHORT: usize = 20;
const SMA_LONG: usize = 50;
const RSI_PERIOD: usize = 14;
const MACD_FAST: usize = 12;
const MACD_SLOW: usize = 26;
const MACD_SIGNAL: usize = 9;
const BB_WINDOW: usize = 20;
const BB_NUM_STD: f64 = 2.0;

/// 市场数据分析引擎
#[derive(Debug, Clone)]
pub struct AnalysisEngine {
    indicators: IndicatorEngine,
}

impl AnalysisEngine {
    /// 创建新的分析引擎
    pub fn new() -> Self {
        Self {
            indicators: IndicatorEngine::new(),
        }
    }

    /// 带精度的分析引擎
    pub fn with_precision(precision: usize) -> Self {
        Self {
            indicators: IndicatorEngine::with_precision(precision),
        }
    }

    /// 分析单只股票的历史行情
    ///
    /// 输出的每条指标序列都与输入按位置对齐、长度一致；
    /// 历史不足的位置是 `None`，渲染端无需做"数据够不够"的分支判断。
    /// 唯一的错误是空序列。
    pub fn analyze(&self, series: &PriceSeries) -> VistaResult<AnalysisResult> {
        if series.is_empty() {
            return Err(VistaError::invalid_input("Empty price series"));
        }

        let closes = series.closes();
        let timestamps = series.timestamps();
        let mut indicators = Vec::new();

        // 趋势均线
        indicators.push(IndicatorSeries::new(
            "SMA(20)",
            self.indicators.calculate_sma(&closes, SMA_SHORT),
        ));
        indicators.push(IndicatorSeries::new(
            "SMA(50)",
            self.indicators.calculate_sma(&closes, SMA_LONG),
        ));

        // RSI
        indicators.push(IndicatorSeries::new(
            "RSI(14)",
            self.indicators.calculate_rsi(&closes, RSI_PERIOD),
        ));

        // MACD 及信号线：每个位置都有定义
        let (macd_line, signal_line) =
            self.indicators
                .calculate_macd(&closes, MACD_FAST, MACD_SLOW, MACD_SIGNAL);
        indicators.push(IndicatorSeries::new(
            "MACD",
            macd_line.into_iter().map(Some).collect(),
        ));
        indicators.push(IndicatorSeries::new(
            "MACD_Signal",
            signal_line.into_iter().map(Some).collect(),
        ));

        // 布林带
        let (bb_mid, bb_upper, bb_lower) =
            self.indicators
                .calculate_bollinger_bands(&closes, BB_WINDOW, BB_NUM_STD);
        indicators.push(IndicatorSeries::new("BB_Mid", bb_mid));
        indicators.push(IndicatorSeries::new("BB_Upper", bb_upper));
        indicators.push(IndicatorSeries::new("BB_Lower", bb_lower));

        // 日收益率
        indicators.push(IndicatorSeries::new(
            "Daily_Return",
            self.indicators.calculate_pct_return(&closes),
        ));

        Ok(AnalysisResult {
            symbol: series.symbol.clone(),
            analyzed_at: Utc::now(),
            timestamps,
            indicators,
            summary: self.summarize(series),
        })
    }

    /// 从最后一根 K 线提取摘要指标
    fn summarize(&self, series: &PriceSeries) -> SummaryMetrics {
        // analyze 已保证序列非空
        let last = &series.candles[series.candles.len() - 1];
        SummaryMetrics {
            latest_close: last.close,
            day_high: last.high,
            day_low: last.low,
            volume: last.volume,
        }
    }
}

impl Default for AnalysisEngine {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Candle;
    use chrono::{Duration, Utc};

    fn sample_series(n: usize) -> PriceSeries {
        let base = Utc::now() - Duration::days(n as i64);
        let candles = (0..n)
            .map(|i| {
                let close = 100.0 + (i as f64 * 0.4).sin() * 8.0;
                Candle::new(
                    base + Duration::days(i as i64),
                    close - 0.5,
                    close + 1.0,
                    close - 1.0,
                    close,
                    1_000 + i as u64 * 10,
                )
            })
            .collect();
        PriceSeries::new("AAPL".to_string(), candles)
    }

    #[test]
    fn test_analyze_full_bundle() {
        let engine = AnalysisEngine::new();
        let series = sample_series(60);
        let result = engine.analyze(&series).unwrap();

        assert_eq!(result.symbol, "AAPL");
        assert_eq!(result.timestamps.len(), 60);
        for indicator in &result.indicators {
            assert_eq!(indicator.values.len(), 60, "{}", indicator.name);
        }

        // SMA(50) 在第 50 根之前无定义
        let sma50 = result.indicator("SMA(50)").unwrap();
        assert_eq!(sma50.values[48], None);
        assert!(sma50.values[49].is_some());

        // MACD 从头到尾都有定义
        let macd = result.indicator("MACD").unwrap();
        assert!(macd.values.iter().all(|v| v.is_some()));

        // 布林带中轨与 SMA(20) 完全一致
        let bb_mid = result.indicator("BB_Mid").unwrap();
        let sma20 = result.indicator("SMA(20)").unwrap();
        assert_eq!(bb_mid.values, sma20.values);
    }

    #[test]
    fn test_analyze_short_series_is_not_an_error() {
        let engine = AnalysisEngine::new();
        let series = sample_series(5);
        let result = engine.analyze(&series).unwrap();

        // 数据不足表现为全 None 序列，而不是失败
        let sma50 = result.indicator("SMA(50)").unwrap();
        assert!(sma50.values.iter().all(|v| v.is_none()));
        let rsi = result.indicator("RSI(14)").unwrap();
        assert!(rsi.values.iter().all(|v| v.is_none()));
    }

    #[test]
    fn test_analyze_empty_series() {
        let engine = AnalysisEngine::new();
        let series = PriceSeries::new("AAPL".to_string(), vec![]);
        assert!(engine.analyze(&series).is_err());
    }

    #[test]
    fn test_summary_metrics() {
        let engine = AnalysisEngine::new();
        let series = sample_series(10);
        let last = series.candles.last().unwrap().clone();
        let result = engine.analyze(&series).unwrap();

        assert_eq!(result.summary.latest_close, last.close);
        assert_eq!(result.summary.day_high, last.high);
        assert_eq!(result.summary.day_low, last.low);
        assert_eq!(result.summary.volume, last.volume);
    }
}
