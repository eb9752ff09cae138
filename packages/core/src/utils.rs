//! 工具函数模块

use crate::errors::VistaResult;
use chrono::{DateTime, Utc};

/// 时间工具函数
pub mod time {
    use super::*;

    /// 获取当前时间戳 (毫秒)
    pub fn current_timestamp_ms() -> i64 {
        Utc::now().timestamp_millis()
    }

    /// 时间戳转换为 DateTime
    pub fn timestamp_to_datetime(timestamp: i64) -> VistaResult<DateTime<Utc>> {
        DateTime::from_timestamp_millis(timestamp)
            .ok_or_else(|| crate::errors::VistaError::invalid_input("Invalid timestamp"))
    }
}

/// 数值工具函数
pub mod numeric {
    /// 保留指定位数的小数
    pub fn round_to(value: f64, precision: usize) -> f64 {
        let multiplier = 10_f64.powi(precision as i32);
        (value * multiplier).round() / multiplier
    }

    /// 计算百分比变化
    pub fn percent_change(old_value: f64, new_value: f64) -> f64 {
        if old_value == 0.0 {
            return 0.0;
        }
        ((new_value - old_value) / old_value) * 100.0
    }

    /// 安全除法，避免除零错误
    pub fn safe_divide(numerator: f64, denominator: f64, default: f64) -> f64 {
        if denominator.abs() < f64::EPSILON {
            default
        } else {
            numerator / denominator
        }
    }
}

/// 数据验证工具
///
/// 核心层假设输入序列干净有序；这些检查由数据获取层在边界处调用。
pub mod validation {
    use crate::errors::{VistaError, VistaResult};
    use crate::models::PriceSeries;

    /// 检查是否为有效的股票代码
    pub fn is_valid_symbol(symbol: &str) -> bool {
        !symbol.is_empty()
            && symbol.len() <= 10
            && symbol.chars().all(|c| c.is_alphanumeric() || c == '.')
    }

    /// 验证序列时间戳严格递增
    pub fn validate_chronological(series: &PriceSeries) -> VistaResult<()> {
        for pair in series.candles.windows(2) {
            if pair[1].timestamp <= pair[0].timestamp {
                return Err(VistaError::invalid_input(format!(
                    "Timestamps not strictly increasing at {}",
                    pair[1].timestamp
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Candle, PriceSeries};
    use chrono::Duration;

    #[test]
    fn test_numeric_utils() {
        assert_eq!(numeric::round_to(3.14159, 2), 3.14);
        assert_eq!(numeric::percent_change(100.0, 110.0), 10.0);
        assert_eq!(numeric::safe_divide(10.0, 2.0, 0.0), 5.0);
        assert_eq!(numeric::safe_divide(10.0, 0.0, -1.0), -1.0);
    }

    #[test]
    fn test_time_utils() {
        let now = Utc::now();
        let timestamp = time::current_timestamp_ms();
        let dt = time::timestamp_to_datetime(timestamp).unwrap();

        // 时间戳应该在合理范围内
        assert!((now - dt).abs() < Duration::seconds(1));
    }

    #[test]
    fn test_symbol_validation() {
        assert!(validation::is_valid_symbol("AAPL"));
        assert!(validation::is_valid_symbol("BRK.B"));
        assert!(!validation::is_valid_symbol(""));
        assert!(!validation::is_valid_symbol("TOO_LONG_SYMBOL_12345"));
    }

    #[test]
    fn test_chronological_validation() {
        let base = Utc::now();
        let candle = |offset: i64| {
            Candle::new(base + Duration::days(offset), 10.0, 11.0, 9.0, 10.5, 1000)
        };

        let ordered = PriceSeries::new("AAPL".to_string(), vec![candle(0), candle(1), candle(2)]);
        assert!(validation::validate_chronological(&ordered).is_ok());

        let duplicated = PriceSeries::new("AAPL".to_string(), vec![candle(0), candle(0)]);
        assert!(validation::validate_chronological(&duplicated).is_err());
    }
}
