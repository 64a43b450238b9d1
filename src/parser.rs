//! 文档解析协作方接口与默认实现
//!
//! 解析方拿到一个压缩包路径，返回记录流与错误流两条通道，
//! 压缩包耗尽后由解析方关闭两条通道。调度器只依赖 [`DocumentParser`]
//! 接口；默认实现按压缩包条目拆分串联的 XML 文档并抽取著录字段。

use crate::document::{DocMetadata, Patent, PatentDoc};
use crate::error::{BulkError, Result};
use crate::events::ErrorEvent;
use quick_xml::Reader;
use quick_xml::events::Event;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver, SyncSender};
use std::thread;
use tracing::{debug, trace};

/// 解析请求
#[derive(Debug, Clone)]
pub struct ParseRequest {
    /// 压缩包路径
    pub archive_path: PathBuf,
    /// 是否在记录中保留原始序列化内容
    pub keep_raw: bool,
}

/// 解析方返回的两条流
///
/// 记录流与错误流相互独立，压缩包耗尽后双双关闭。
pub struct DocumentStream {
    /// 记录流
    pub docs: Receiver<PatentDoc>,
    /// 错误流
    pub errors: Receiver<ErrorEvent>,
}

/// 文档解析协作方接口
///
/// 同步返回错误表示解析根本无法启动（如压缩包无法打开）；
/// 启动成功后的一切问题都通过错误流报告。
pub trait DocumentParser: Send + Sync {
    /// 启动对单个压缩包的解析
    fn parse(&self, request: ParseRequest) -> Result<DocumentStream>;
}

/// 默认解析实现：拆分压缩包内串联的 XML 文档
pub struct ZipDocumentParser {
    /// 记录流通道容量
    buffer_size: usize,
}

impl ZipDocumentParser {
    /// 创建解析器，`buffer_size` 为记录流通道容量
    pub fn new(buffer_size: usize) -> Self {
        Self { buffer_size: buffer_size.max(1) }
    }
}

impl DocumentParser for ZipDocumentParser {
    fn parse(&self, request: ParseRequest) -> Result<DocumentStream> {
        // 同步验证压缩包可以打开，打不开视为启动失败
        let file = File::open(&request.archive_path)?;
        let archive = zip::ZipArchive::new(file)?;

        let (doc_tx, doc_rx) = mpsc::sync_channel(self.buffer_size);
        let (err_tx, err_rx) = mpsc::sync_channel(self.buffer_size);

        // 生产线程持有两个发送端，线程结束即关闭两条流
        thread::spawn(move || {
            split_archive(archive, &request, &doc_tx, &err_tx);
        });

        Ok(DocumentStream { docs: doc_rx, errors: err_rx })
    }
}

/// 遍历压缩包条目，把每个 XML 条目拆成若干文档发往记录流
fn split_archive(
    mut archive: zip::ZipArchive<File>,
    request: &ParseRequest,
    doc_tx: &SyncSender<PatentDoc>,
    err_tx: &SyncSender<ErrorEvent>,
) {
    let zip_name = request
        .archive_path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    debug!("开始拆分压缩包: {zip_name}");

    let mut seq = 0usize;
    for i in 0..archive.len() {
        let mut entry = match archive.by_index(i) {
            Ok(entry) => entry,
            Err(e) => {
                let _ = err_tx.send(ErrorEvent::skipped(
                    "document",
                    format!("{zip_name}#{i}"),
                    "reading an archive entry",
                    e.to_string(),
                ));
                continue;
            }
        };
        if entry.is_dir() {
            continue;
        }
        let entry_name = entry.name().to_string();
        if !entry_name.to_ascii_lowercase().ends_with(".xml") {
            trace!("跳过非 XML 条目: {entry_name}");
            continue;
        }

        let mut content = Vec::new();
        if let Err(e) = entry.read_to_end(&mut content) {
            let _ = err_tx.send(ErrorEvent::skipped(
                "document",
                entry_name.clone(),
                "reading an archive entry",
                e.to_string(),
            ));
            continue;
        }

        for segment in split_documents(&content) {
            seq += 1;
            match build_doc(
                &zip_name,
                &entry_name,
                seq,
                segment,
                request.keep_raw,
            ) {
                Ok(doc) => {
                    // 消费端退出时停止生产
                    if doc_tx.send(doc).is_err() {
                        return;
                    }
                }
                Err(e) => {
                    let _ = err_tx.send(ErrorEvent::skipped(
                        "document",
                        format!("{entry_name}#{seq}"),
                        "extracting document fields",
                        e.to_string(),
                    ));
                }
            }
        }
    }

    debug!("压缩包拆分完成: {zip_name}, 共 {seq} 个文档");
}

/// 按 XML 声明把条目内容切成独立文档
///
/// 批量条目通常是多个完整文档首尾相接；没有声明时整个条目视为一个文档。
fn split_documents(content: &[u8]) -> Vec<&[u8]> {
    const MARKER: &[u8] = b"<?xml";

    let mut starts = Vec::new();
    let mut pos = 0;
    while pos + MARKER.len() <= content.len() {
        match content[pos..].windows(MARKER.len()).position(|w| w == MARKER) {
            Some(offset) => {
                starts.push(pos + offset);
                pos += offset + MARKER.len();
            }
            None => break,
        }
    }

    if starts.is_empty() {
        if content.trim_ascii().is_empty() {
            return Vec::new();
        }
        return vec![content];
    }

    let mut segments = Vec::with_capacity(starts.len());
    for (idx, &start) in starts.iter().enumerate() {
        let end = starts.get(idx + 1).copied().unwrap_or(content.len());
        segments.push(&content[start..end]);
    }
    segments
}

/// 把单个文档片段组装成记录
fn build_doc(
    zip_name: &str,
    entry_name: &str,
    seq: usize,
    segment: &[u8],
    keep_raw: bool,
) -> Result<PatentDoc> {
    let (patent, root) = extract_patent(segment)?;

    // 优先用著录文件名作为序号名，缺失时从条目名派生
    let index_name = if patent.meta_file_name.is_empty() {
        let stem = Path::new(entry_name)
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "document".to_string());
        format!("{stem}-{seq:06}.xml")
    } else {
        patent.meta_file_name.clone()
    };

    Ok(PatentDoc {
        metadata: DocMetadata {
            origin_zip: zip_name.to_string(),
            index_name,
            document_type: root,
        },
        patent,
        raw: keep_raw.then(|| segment.to_vec()),
    })
}

/// 事件驱动地抽取著录与正文字段，返回专利字段与根元素名
fn extract_patent(segment: &[u8]) -> Result<(Patent, String)> {
    let mut reader = Reader::from_reader(segment);
    reader.config_mut().trim_text(true);

    let mut patent = Patent::default();
    let mut root = String::new();
    let mut path: Vec<String> = Vec::new();
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => {
                let name =
                    String::from_utf8_lossy(e.name().as_ref()).into_owned();
                if root.is_empty() {
                    root = name.clone();
                    // 根元素属性携带文档级著录信息
                    for attr in e.attributes().flatten() {
                        let value =
                            String::from_utf8_lossy(&attr.value).into_owned();
                        match attr.key.as_ref() {
                            b"file" => patent.meta_file_name = value,
                            b"date-produced" => patent.date_produced = value,
                            b"date-publ" => patent.date_publ = value,
                            b"country" => patent.country = value,
                            _ => {}
                        }
                    }
                }
                path.push(name);
            }
            Ok(Event::End(_)) => {
                path.pop();
            }
            Ok(Event::Text(t)) => {
                if let Ok(text) = t.unescape() {
                    assign_text(&mut patent, &path, &text);
                }
            }
            Ok(Event::CData(t)) => {
                let text = String::from_utf8_lossy(&t).into_owned();
                assign_text(&mut patent, &path, &text);
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(BulkError::parse_error(format!(
                    "XML 解析失败: {e}"
                )));
            }
            Ok(_) => {}
        }
        buf.clear();
    }

    Ok((patent, root))
}

/// 根据当前元素路径把文本归入对应字段
fn assign_text(patent: &mut Patent, path: &[String], text: &str) {
    let text = text.trim();
    if text.is_empty() {
        return;
    }
    let Some(current) = path.last() else {
        return;
    };

    let in_pub_ref = path.iter().any(|p| p == "publication-reference");
    let in_class_nat = path.iter().any(|p| p == "classification-national");

    match current.as_str() {
        "invention-title" => append_section(&mut patent.invention_title, text),
        "number-of-claims" => {
            patent.number_of_claims = text.parse().unwrap_or(0);
        }
        "country" if in_pub_ref => {
            patent.publication_reference.country = text.to_string();
        }
        "doc-number" if in_pub_ref => {
            patent.publication_reference.doc_number = text.to_string();
        }
        "kind" if in_pub_ref => {
            patent.publication_reference.kind_code = text.to_string();
        }
        "date" if in_pub_ref => {
            patent.publication_reference.date = text.to_string();
        }
        "country" if in_class_nat => {
            patent.classification_national.country = text.to_string();
        }
        "main-classification" if in_class_nat => {
            patent.classification_national.main_classification =
                text.to_string();
        }
        "further-classification" if in_class_nat => {
            patent.classification_national.further_classification =
                text.to_string();
        }
        _ => {
            // 正文三大段按所在小节累积
            if path.iter().any(|p| p == "abstract") {
                append_section(&mut patent.abstract_text, text);
            } else if path.iter().any(|p| p == "description") {
                append_section(&mut patent.description, text);
            } else if path.iter().any(|p| p == "claims") {
                append_section(&mut patent.claims, text);
            }
        }
    }
}

/// 向正文小节追加一段文本，段落间以空格分隔
fn append_section(section: &mut String, text: &str) {
    if !section.is_empty() {
        section.push(' ');
    }
    section.push_str(text);
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<us-patent-grant file="US12345678-20230124.XML" date-produced="20230117" date-publ="20230124" country="US">
  <us-bibliographic-data-grant>
    <publication-reference>
      <document-id>
        <country>US</country>
        <doc-number>12345678</doc-number>
        <kind>B2</kind>
        <date>20230124</date>
      </document-id>
    </publication-reference>
    <classification-national>
      <country>US</country>
      <main-classification>PLT263</main-classification>
    </classification-national>
    <invention-title>Test widget</invention-title>
    <number-of-claims>7</number-of-claims>
  </us-bibliographic-data-grant>
  <abstract><p>A widget.</p></abstract>
  <description><p>Long text here.</p></description>
  <claims><claim><claim-text>What is claimed is a widget.</claim-text></claim></claims>
</us-patent-grant>"#;

    #[test]
    fn test_extract_patent_fields() {
        let (patent, root) = extract_patent(SAMPLE.as_bytes()).unwrap();
        assert_eq!(root, "us-patent-grant");
        assert_eq!(patent.meta_file_name, "US12345678-20230124.XML");
        assert_eq!(patent.date_produced, "20230117");
        assert_eq!(patent.date_publ, "20230124");
        assert_eq!(patent.country, "US");
        assert_eq!(patent.invention_title, "Test widget");
        assert_eq!(patent.number_of_claims, 7);
        assert_eq!(patent.publication_reference.doc_number, "12345678");
        assert_eq!(patent.publication_reference.kind_code, "B2");
        assert_eq!(
            patent.classification_national.main_classification,
            "PLT263"
        );
        assert_eq!(patent.abstract_text, "A widget.");
        assert_eq!(patent.description, "Long text here.");
        assert_eq!(patent.claims, "What is claimed is a widget.");
    }

    #[test]
    fn test_split_documents_concatenated() {
        let content = format!("{SAMPLE}\n{SAMPLE}");
        let segments = split_documents(content.as_bytes());
        assert_eq!(segments.len(), 2);
        assert!(segments[0].starts_with(b"<?xml"));
        assert!(segments[1].starts_with(b"<?xml"));
    }

    #[test]
    fn test_split_documents_without_declaration() {
        let content = b"<doc>plain</doc>";
        let segments = split_documents(content);
        assert_eq!(segments.len(), 1);

        assert!(split_documents(b"   \n ").is_empty());
    }

    #[test]
    fn test_build_doc_index_name_fallback() {
        let doc = build_doc(
            "bulk.zip",
            "inner/docs.xml",
            3,
            b"<doc><p>no file attr</p></doc>",
            false,
        )
        .unwrap();
        assert_eq!(doc.metadata.index_name, "docs-000003.xml");
        assert_eq!(doc.metadata.origin_zip, "bulk.zip");
        assert!(doc.raw.is_none());
    }

    #[test]
    fn test_build_doc_keeps_raw_when_requested() {
        let doc =
            build_doc("bulk.zip", "d.xml", 1, SAMPLE.as_bytes(), true).unwrap();
        assert_eq!(doc.raw.as_deref(), Some(SAMPLE.as_bytes()));
        assert_eq!(doc.metadata.index_name, "US12345678-20230124.XML");
    }
}
