//! 输出器模块
//!
//! 每种输出格式一个子模块。输出器统一消费记录流直到通道关闭，
//! 单条坏记录不中止余下的流（跳过并继续）。

pub mod html;
pub mod json;
pub mod parquet;
pub mod xml;

pub use html::write_html_files;
pub use json::write_json_files;
pub use parquet::write_parquet_file;
pub use xml::write_xml_files;

/// 单个输出器的写出统计
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct WriteSummary {
    /// 成功写出的记录数
    pub written: usize,
    /// 被丢弃的记录数（缺少命名信息，或写入中止后排空的记录）
    pub dropped: usize,
}

impl WriteSummary {
    /// 合并另一份统计
    pub fn merge(&mut self, other: WriteSummary) {
        self.written += other.written;
        self.dropped += other.dropped;
    }

    /// 总记录数
    pub fn total(&self) -> usize {
        self.written + self.dropped
    }
}

/// 去掉文件名末尾的 .XML/.xml 后缀
pub(crate) fn trim_xml_suffix(name: &str) -> &str {
    name.strip_suffix(".XML")
        .or_else(|| name.strip_suffix(".xml"))
        .unwrap_or(name)
}
