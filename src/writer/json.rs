//! JSON 输出器：把结构化记录序列化为独立的 JSON 文件

use crate::document::PatentDoc;
use crate::writer::{WriteSummary, trim_xml_suffix};
use std::fs;
use std::path::Path;
use std::sync::mpsc::Receiver;
use tracing::{debug, error, info};

/// 消费记录流，把每条记录美化序列化为一个 JSON 文件
///
/// 文件名由著录文件名去掉 XML 后缀派生；缺少著录文件名的记录
/// 记录日志后丢弃。
pub fn write_json_files(
    output_dir: &Path,
    docs: Receiver<PatentDoc>,
) -> WriteSummary {
    info!("JSON 输出器启动");

    let mut summary = WriteSummary::default();

    for doc in docs.iter() {
        let filename = doc.patent.meta_file_name.clone();
        if filename.is_empty() {
            error!("记录缺少著录文件名，无法派生输出文件名");
            summary.dropped += 1;
            continue;
        }

        let output_file_name = format!("{}.json", trim_xml_suffix(&filename));
        let output_path = output_dir.join(output_file_name);

        let json = match serde_json::to_vec_pretty(&doc) {
            Ok(json) => json,
            Err(e) => {
                error!("记录序列化为 JSON 失败: {filename}: {e}");
                summary.dropped += 1;
                continue;
            }
        };

        match fs::write(&output_path, json) {
            Ok(()) => {
                summary.written += 1;
                debug!("文档已保存: {filename}");
            }
            Err(e) => {
                error!("文档写盘失败: {filename}: {e}");
                summary.dropped += 1;
            }
        }
    }

    summary
}
