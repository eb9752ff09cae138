//! Vista Finance 跨平台核心库
//!
//! 提供仪表盘各端共享的数据模型、技术指标算法和工具函数

pub mod models;
pub mod indicators;
pub mod analytics;
pub mod utils;
pub mod errors;

// 重新导出主要类型
pub use models::*;
pub use indicators::IndicatorEngine;
pub use analytics::AnalysisEngine;
pub use errors::*;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_core_functionality() {
        // 基础功能测试
        let engine = IndicatorEngine::new();
        let closes = vec![100.0, 101.0, 102.0, 103.0, 104.0];

        let sma = engine.calculate_sma(&closes, 3);
        assert_eq!(sma.len(), closes.len());
        assert!(sma[4].is_some());
    }
}
