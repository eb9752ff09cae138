//! 跨平台数据模型定义

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::{VistaError, VistaResult};

/// 派生序列：与输入序列等长，按位置对齐
///
/// `None` 表示该位置历史数据不足、指标尚未定义（不是 0，也不是错误）。
pub type DerivedSeries = Vec<Option<f64>>;

/// K 线数据 (OHLCV)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Candle {
    /// 时间戳
    pub timestamp: DateTime<Utc>,
    /// 开盘价
    pub open: f64,
    /// 最高价
    pub high: f64,
    /// 最低价
    pub low: f64,
    /// 收盘价
    pub close: f64,
    /// 成交量
    pub volume: u64,
}

impl Candle {
    pub fn new(
        timestamp: DateTime<Utc>,
        open: f64,
        high: f64,
        low: f64,
        close: f64,
        volume: u64,
    ) -> Self {
        Self {
            timestamp,
            open,
            high,
            low,
            close,
            volume,
        }
    }
}

/// 历史行情序列
///
/// 时间戳严格递增由数据获取层保证，核心层不做校验。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PriceSeries {
    /// 股票代码
    pub symbol: String,
    /// 按时间顺序排列的 K 线
    pub candles: Vec<Candle>,
}

impl PriceSeries {
    pub fn new(symbol: String, candles: Vec<Candle>) -> Self {
        Self { symbol, candles }
    }

    /// 收盘价投影：指标引擎消费的按位置索引的序列
    pub fn closes(&self) -> Vec<f64> {
        self.candles.iter().map(|c| c.close).collect()
    }

    /// 时间戳序列，与收盘价投影按位置对齐
    pub fn timestamps(&self) -> Vec<DateTime<Utc>> {
        self.candles.iter().map(|c| c.timestamp).collect()
    }

    pub fn len(&self) -> usize {
        self.candles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candles.is_empty()
    }
}

/// 命名的指标序列，交付给渲染端
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndicatorSeries {
    /// 指标名称，如 "SMA(20)"
    pub name: String,
    /// 指标值，与输入序列按位置对齐
    pub values: DerivedSeries,
}

impl IndicatorSeries {
    pub fn new(name: impl Into<String>, values: DerivedSeries) -> Self {
        Self {
            name: name.into(),
            values,
        }
    }
}

/// 最新行情摘要指标
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SummaryMetrics {
    /// 最新收盘价
    pub latest_close: f64,
    /// 当期最高价
    pub day_high: f64,
    /// 当期最低价
    pub day_low: f64,
    /// 当期成交量
    pub volume: u64,
}

/// 单只股票的完整分析结果
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisResult {
    /// 股票代码
    pub symbol: String,
    /// 分析时间
    pub analyzed_at: DateTime<Utc>,
    /// 时间序列，与各指标按位置对齐
    pub timestamps: Vec<DateTime<Utc>>,
    /// 技术指标结果
    pub indicators: Vec<IndicatorSeries>,
    /// 摘要指标
    pub summary: SummaryMetrics,
}

impl AnalysisResult {
    /// 按名称查找指标序列
    pub fn indicator(&self, name: &str) -> Option<&IndicatorSeries> {
        self.indicators.iter().find(|i| i.name == name)
    }
}

/// 采样间隔
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum Interval {
    /// 日线
    #[serde(rename = "1d")]
    Day,
    /// 小时线
    #[serde(rename = "1h")]
    Hour,
    /// 15 分钟线
    #[serde(rename = "15m")]
    Min15,
    /// 5 分钟线
    #[serde(rename = "5m")]
    Min5,
    /// 周线
    #[serde(rename = "1wk")]
    Week,
}

impl Interval {
    pub fn as_str(&self) -> &'static str {
        match self {
            Interval::Day => "1d",
            Interval::Hour => "1h",
            Interval::Min15 => "15m",
            Interval::Min5 => "5m",
            Interval::Week => "1wk",
        }
    }
}

impl std::str::FromStr for Interval {
    type Err = VistaError;

    fn from_str(s: &str) -> VistaResult<Self> {
        match s {
            "1d" => Ok(Interval::Day),
            "1h" => Ok(Interval::Hour),
            "15m" => Ok(Interval::Min15),
            "5m" => Ok(Interval::Min5),
            "1wk" => Ok(Interval::Week),
            other => Err(VistaError::invalid_input(format!(
                "Unknown interval: {}",
                other
            ))),
        }
    }
}

/// 时间区间
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimeRange {
    /// 开始时间
    pub start: DateTime<Utc>,
    /// 结束时间
    pub end: DateTime<Utc>,
}

impl TimeRange {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self { start, end }
    }

    pub fn duration(&self) -> chrono::Duration {
        self.end - self.start
    }
}

/// 同行市值数据，供市值占比图使用
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PeerMarketCap {
    /// 股票代码
    pub symbol: String,
    /// 市值（美元）
    pub market_cap: u64,
}
