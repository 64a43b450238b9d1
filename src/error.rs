//! 错误类型定义
//!
//! 这个模块定义了库中使用的所有错误类型，使用 thiserror 提供丰富的错误信息。

/// 批量导出工具的结果类型
pub type Result<T> = std::result::Result<T, BulkError>;

/// 批量导出错误类型
#[derive(Debug, thiserror::Error)]
pub enum BulkError {
    /// IO错误
    #[error("IO错误: {0}")]
    Io(#[from] std::io::Error),

    /// TOML 配置解析错误
    #[error("TOML解析错误: {0}")]
    Toml(#[from] toml::de::Error),

    /// TOML 序列化错误
    #[error("TOML序列化错误: {0}")]
    TomlSer(#[from] toml::ser::Error),

    /// JSON 序列化错误
    #[error("JSON序列化错误: {0}")]
    Json(#[from] serde_json::Error),

    /// 压缩包读取错误
    #[error("压缩包错误: {0}")]
    Zip(#[from] zip::result::ZipError),

    /// Parquet 写入错误
    #[error("Parquet错误: {0}")]
    Parquet(#[from] parquet::errors::ParquetError),

    /// Arrow 数据构造错误
    #[error("Arrow错误: {0}")]
    Arrow(#[from] arrow_schema::ArrowError),

    /// 配置错误
    #[error("配置错误: {0}")]
    Config(String),

    /// 解析错误
    #[error("解析错误: {message}")]
    Parse { message: String },

    /// 其他错误
    #[error("未知错误: {0}")]
    Other(String),
}

impl BulkError {
    /// 创建一个配置错误
    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Config(message.into())
    }

    /// 创建一个解析错误
    pub fn parse_error<S: Into<String>>(message: S) -> Self {
        Self::Parse { message: message.into() }
    }

    /// 创建一个其他类型错误
    pub fn other<S: Into<String>>(message: S) -> Self {
        Self::Other(message.into())
    }

    /// 检查是否为 IO 错误
    pub fn is_io_error(&self) -> bool {
        matches!(self, BulkError::Io(_))
    }

    /// 检查是否为配置错误
    pub fn is_config_error(&self) -> bool {
        matches!(self, BulkError::Config(_))
    }

    /// 检查是否为解析错误
    pub fn is_parse_error(&self) -> bool {
        matches!(self, BulkError::Parse { .. })
    }
}
