//! XML 输出器：把每条记录的原始序列化内容原样落盘

use crate::document::PatentDoc;
use crate::writer::WriteSummary;
use std::fs;
use std::path::Path;
use std::sync::mpsc::Receiver;
use tracing::{debug, error, info};

/// 消费记录流，把原始 XML 写为独立文件
///
/// 文件名取记录的序号名；缺少序号名或原始内容的记录记录日志后丢弃，
/// 不会中止余下的流。
pub fn write_xml_files(
    output_dir: &Path,
    docs: Receiver<PatentDoc>,
) -> WriteSummary {
    info!("XML 输出器启动");

    let mut summary = WriteSummary::default();

    for doc in docs.iter() {
        let filename = doc.metadata.index_name.clone();

        let Some(raw) = doc.raw.as_deref() else {
            error!("记录缺少原始序列化内容: {filename}");
            summary.dropped += 1;
            continue;
        };

        // 尾部闭合标签检查，仅记录日志
        if raw.last() != Some(&b'>') {
            error!("文档不以闭合标签结尾: {filename}");
        }

        if filename.is_empty() {
            error!("记录缺少序号名，无法派生输出文件名");
            summary.dropped += 1;
            continue;
        }

        let full_path = output_dir.join(&filename);
        match fs::write(&full_path, raw) {
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
    use crate::document::{DocMetadata, PatentDoc};
    use std::sync::mpsc;
    use tempfile::tempdir;

    fn doc_with_raw(index_name: &str, raw: &[u8]) -> PatentDoc {
        PatentDoc {
            metadata: DocMetadata {
                origin_zip: "bulk.zip".to_string(),
                index_name: index_name.to_string(),
                document_type: "us-patent-grant".to_string(),
            },
            raw: Some(raw.to_vec()),
            ..Default::default()
        }
    }

    #[test]
    fn test_raw_bytes_written_verbatim() {
        let dir = tempdir().unwrap();
        let (tx, rx) = mpsc::sync_channel(4);

        tx.send(doc_with_raw("US1.XML", b"<doc>one</doc>")).unwrap();
        tx.send(doc_with_raw("US2.XML", b"<doc>two</doc>")).unwrap();
        drop(tx);

        let summary = write_xml_files(dir.path(), rx);
        assert_eq!(summary.written, 2);
        assert_eq!(summary.dropped, 0);

        let content = fs::read(dir.path().join("US1.XML")).unwrap();
        assert_eq!(content, b"<doc>one</doc>");
    }

    #[test]
    fn test_missing_name_or_raw_is_dropped() {
        let dir = tempdir().unwrap();
        let (tx, rx) = mpsc::sync_channel(4);

        // 缺少序号名
        tx.send(doc_with_raw("", b"<doc>anon</doc>")).unwrap();
        // 缺少原始内容
        tx.send(PatentDoc {
            metadata: DocMetadata {
                index_name: "US3.XML".to_string(),
                ..Default::default()
            },
            ..Default::default()
        })
        .unwrap();
        // 正常记录
        tx.send(doc_with_raw("US4.XML", b"<doc>ok</doc>")).unwrap();
        drop(tx);

        let summary = write_xml_files(dir.path(), rx);
        assert_eq!(summary.written, 1);
        assert_eq!(summary.dropped, 2);
        assert_eq!(summary.total(), 3);
        assert!(dir.path().join("US4.XML").exists());
    }
}
