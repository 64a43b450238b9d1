//! 配置管理模块
//!
//! 提供统一的配置文件读取和管理功能

use crate::error::{BulkError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// 输出模式，决定每个作业的记录流被路由到哪个输出器
///
/// 整个运行期间固定不变，在配置加载时解析为封闭枚举，
/// 分发处穷尽匹配，不做字符串比较。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputMode {
    /// 每条记录的原始 XML 原样落盘
    Xml,
    /// 每条记录序列化为一个 JSON 文件
    Json,
    /// 每个压缩包汇总为一个 Parquet 文件
    Parquet,
    /// 仅写出说明书正文（非生产路径）
    Html,
    /// 不输出，仅排空记录流
    None,
}

/// Parquet 压缩编码
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParquetCompression {
    /// 不压缩
    #[serde(rename = "no-compress")]
    NoCompress,
    /// Snappy
    Snappy,
    /// Gzip
    Gzip,
    /// LZ4
    Lz4,
    /// Zstd
    Zstd,
}

/// 主配置结构体
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// 必填项
    pub required: RequiredConfig,
    /// 调优项
    #[serde(default)]
    pub tuning: TuningConfig,
    /// 输出项
    #[serde(default)]
    pub output: OutputConfig,
    /// 日志项
    #[serde(default)]
    pub log: LogConfig,
    /// 开发项
    #[serde(default)]
    pub dev: DevConfig,
}

/// 必填配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequiredConfig {
    /// 输入目录（递归扫描其中的 .zip 文件）
    pub input_dir: String,
    /// 输出目录
    pub output_dir: String,
    /// 输出模式
    pub output_mode: OutputMode,
}

/// 调优配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TuningConfig {
    /// 同时处理的压缩包上限，0 表示按 CPU 数自动计算
    pub max_concurrent_archives: usize,
    /// 记录流通道容量
    pub channel_buffer_size: usize,
}

/// 输出配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Parquet 压缩编码
    pub parquet_compression: ParquetCompression,
}

/// 日志配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogConfig {
    /// 是否启用控制台输出
    pub enable_stdout: bool,
    /// 日志输出目录
    pub log_dir: String,
    /// 日志级别 (trace, debug, info, warn, error)
    pub level: String,
}

/// 开发配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DevConfig {
    /// 运行成功后清理输出目录
    pub clean_output: bool,
    /// 非 xml 模式下是否仍要求解析方保留原始序列化内容
    pub parser_returns_raw: bool,
}

impl Config {
    /// 从文件加载配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// 从字符串加载配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// 保存配置到文件
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// 验证配置的有效性
    pub fn validate(&self) -> Result<()> {
        if self.required.input_dir.is_empty() {
            return Err(BulkError::config("输入目录不能为空"));
        }
        if self.required.output_dir.is_empty() {
            return Err(BulkError::config("输出目录不能为空"));
        }

        // 验证日志级别
        match self.log.level.as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            _ => {
                return Err(BulkError::config(format!(
                    "无效的日志级别: {}",
                    self.log.level
                )));
            }
        }

        // 验证通道容量
        if self.tuning.channel_buffer_size == 0 {
            return Err(BulkError::config("通道容量不能为0"));
        }

        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            required: RequiredConfig {
                input_dir: "data/bulkfiles".to_string(),
                output_dir: "data/filesout".to_string(),
                output_mode: OutputMode::None,
            },
            tuning: TuningConfig::default(),
            output: OutputConfig::default(),
            log: LogConfig::default(),
            dev: DevConfig::default(),
        }
    }
}

impl Default for TuningConfig {
    fn default() -> Self {
        Self { max_concurrent_archives: 0, channel_buffer_size: 100 }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self { parquet_compression: ParquetCompression::Snappy }
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            enable_stdout: true,
            log_dir: "data/logfiles".to_string(),
            level: "warn".to_string(),
        }
    }
}

impl Default for DevConfig {
    fn default() -> Self {
        Self { clean_output: false, parser_returns_raw: false }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_validation() {
        let mut config = Config::default();
        assert!(config.validate().is_ok());

        // 测试无效日志级别
        config.log.level = "invalid".to_string();
        assert!(config.validate().is_err());

        // 测试空输入目录
        config.log.level = "info".to_string();
        config.required.input_dir = String::new();
        assert!(config.validate().is_err());

        // 测试通道容量为0
        config.required.input_dir = "data/bulkfiles".to_string();
        config.tuning.channel_buffer_size = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_serialization() {
        let config = Config::default();
        let toml_str = toml::to_string(&config).unwrap();
        let parsed_config: Config = toml::from_str(&toml_str).unwrap();
        assert_eq!(config.log.level, parsed_config.log.level);
        assert_eq!(
            config.required.output_mode,
            parsed_config.required.output_mode
        );
    }

    #[test]
    fn test_output_mode_parsing() {
        let config = Config::from_toml_str(
            r#"
            [required]
            input_dir = "in"
            output_dir = "out"
            output_mode = "parquet"

            [output]
            parquet_compression = "no-compress"
            "#,
        )
        .unwrap();
        assert_eq!(config.required.output_mode, OutputMode::Parquet);
        assert_eq!(
            config.output.parquet_compression,
            ParquetCompression::NoCompress
        );
    }

    #[test]
    fn test_unknown_output_mode_rejected() {
        let result = Config::from_toml_str(
            r#"
            [required]
            input_dir = "in"
            output_dir = "out"
            output_mode = "csv"
            "#,
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_sections_have_defaults() {
        let config = Config::from_toml_str(
            r#"
            [required]
            input_dir = "in"
            output_dir = "out"
            output_mode = "json"
            "#,
        )
        .unwrap();
        assert_eq!(config.tuning.max_concurrent_archives, 0);
        assert_eq!(config.tuning.channel_buffer_size, 100);
        assert_eq!(
            config.output.parquet_compression,
            ParquetCompression::Snappy
        );
        assert!(!config.dev.parser_returns_raw);
    }
}
