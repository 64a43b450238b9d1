//! USPTO 专利批量压缩包的拆分与多格式导出工具库
//!
//! 核心是编排层：有界并发的作业调度、每作业记录流到输出器的一对一分发、
//! 以及集中式的错误聚合与跳过报告。文档解析通过 [`parser::DocumentParser`]
//! 接口交给协作方完成。

pub mod aggregator;
pub mod concurrency;
pub mod config;
pub mod controller;
pub mod dispatch;
pub mod document;
pub mod error;
pub mod events;
pub mod gate;
pub mod logging;
pub mod parser;
pub mod writer;

pub use config::{Config, OutputMode, ParquetCompression};
pub use controller::{RunSummary, run};
pub use document::PatentDoc;
pub use error::{BulkError, Result};
pub use events::{ErrorEvent, SkipNotice};
