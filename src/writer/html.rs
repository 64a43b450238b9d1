//! HTML 输出器：只写出说明书正文
//!
//! 非生产路径，勿在正式流程中使用。

use crate::document::PatentDoc;
use crate::writer::{WriteSummary, trim_xml_suffix};
use std::fs;
use std::path::Path;
use std::sync::mpsc::Receiver;
use tracing::{debug, error, info};

/// 消费记录流，把说明书正文写为独立的 HTML 文件
pub fn write_html_files(
    output_dir: &Path,
    docs: Receiver<PatentDoc>,
) -> WriteSummary {
    info!("HTML 输出器启动");

    let mut summary = WriteSummary::default();

    for doc in docs.iter() {
        let filename = doc.metadata.index_name.clone();
        if filename.is_empty() {
            error!("记录缺少序号名，无法派生输出文件名");
            summary.dropped += 1;
            continue;
        }

        let output_file_name = format!("{}.html", trim_xml_suffix(&filename));
        let output_path = output_dir.join(output_file_name);

        match fs::write(&output_path, doc.patent.description.as_bytes()) {
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{DocMetadata, Patent, PatentDoc};
    use std::sync::mpsc;
    use tempfile::tempdir;

    #[test]
    fn test_description_is_the_body() {
        let dir = tempdir().unwrap();
        let (tx, rx) = mpsc::sync_channel(1);

        tx.send(PatentDoc {
            metadata: DocMetadata {
                index_name: "US1.XML".to_string(),
                ..Default::default()
            },
            patent: Patent {
                description: "正文内容".to_string(),
                ..Default::default()
            },
            raw: None,
        })
        .unwrap();
        drop(tx);

        let summary = write_html_files(dir.path(), rx);
        assert_eq!(summary.written, 1);

        let content = fs::read_to_string(dir.path().join("US1.html")).unwrap();
        assert_eq!(content, "正文内容");
    }
}
