//! 统一错误定义
//!
//! 指标引擎本身永不返回错误（数据不足输出全 `None` 序列），
//! 这里的错误类型服务于数据获取和服务层。

use thiserror::Error;

/// Vista Finance 统一错误类型
#[derive(Debug, Clone, Error)]
pub enum VistaError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Data not found: {0}")]
    DataNotFound(String),

    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Internal error: {0}")]
    InternalError(String),
}

/// 统一结果类型
pub type VistaResult<T> = Result<T, VistaError>;

impl VistaError {
    /// 创建网络错误
    pub fn network(msg: impl Into<String>) -> Self {
        Self::NetworkError(msg.into())
    }

    /// 创建数据未找到错误
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::DataNotFound(msg.into())
    }

    /// 创建无效输入错误
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    /// 创建内部错误
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::InternalError(msg.into())
    }
}

// 为常见外部错误类型实现转换
impl From<serde_json::Error> for VistaError {
    fn from(err: serde_json::Error) -> Self {
        Self::SerializationError(err.to_string())
    }
}

impl From<chrono::ParseError> for VistaError {
    fn from(err: chrono::ParseError) -> Self {
        Self::InvalidInput(format!("Date parsing error: {}", err))
    }
}
