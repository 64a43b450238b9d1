//! Parquet 输出器：把单个压缩包的全部记录汇总为一个列式文件
//!
//! 记录先经过独立的转换线程投影到固定的扁平模式，
//! 写入循环按批组装 RecordBatch 落盘，两个阶段通过有界通道衔接。

use crate::config::ParquetCompression;
use crate::document::PatentDoc;
use crate::error::Result;
use crate::events::ErrorEvent;
use crate::writer::WriteSummary;
use arrow_array::{ArrayRef, Int64Array, RecordBatch, StringArray};
use arrow_schema::{DataType, Field, Schema};
use parquet::arrow::ArrowWriter;
use parquet::basic::{Compression, GzipLevel, ZstdLevel};
use parquet::file::properties::WriterProperties;
use std::fs::File;
use std::path::Path;
use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, SyncSender};
use std::thread;
use tracing::{debug, error, info};

/// 行组大小（行数）
const ROW_GROUP_SIZE: usize = 128 * 1024;
/// 数据页大小目标（字节）
const PAGE_SIZE: usize = 8 * 1024;
/// 转换线程与写入循环之间的通道容量
const CONVERT_BUFFER: usize = 100;
/// 单次写入的批大小（行数）
const WRITE_BATCH: usize = 1024;

/// 投影到 Parquet 模式的单行
#[derive(Debug, Clone, Default)]
struct ParquetRow {
    document_name: String,
    document_type: String,
    date_produced: String,
    date_publ: String,
    country: String,
    invention_title: String,
    number_of_claims: i64,
    abstract_text: String,
    description: String,
    claims: String,
    pub_ref_country: String,
    pub_ref_doc_number: String,
    pub_ref_kind_code: String,
    pub_ref_date: String,
    class_nat_country: String,
    class_nat_main_classification: String,
    class_nat_further_classification: String,
}

impl From<&PatentDoc> for ParquetRow {
    fn from(doc: &PatentDoc) -> Self {
        let patent = &doc.patent;
        Self {
            document_name: patent.meta_file_name.clone(),
            document_type: doc.metadata.document_type.clone(),
            date_produced: patent.date_produced.clone(),
            date_publ: patent.date_publ.clone(),
            country: patent.country.clone(),
            invention_title: patent.invention_title.clone(),
            number_of_claims: patent.number_of_claims,
            abstract_text: patent.abstract_text.clone(),
            description: patent.description.clone(),
            claims: patent.claims.clone(),
            pub_ref_country: patent.publication_reference.country.clone(),
            pub_ref_doc_number: patent
                .publication_reference
                .doc_number
                .clone(),
            pub_ref_kind_code: patent.publication_reference.kind_code.clone(),
            pub_ref_date: patent.publication_reference.date.clone(),
            class_nat_country: patent.classification_national.country.clone(),
            class_nat_main_classification: patent
                .classification_national
                .main_classification
                .clone(),
            class_nat_further_classification: patent
                .classification_national
                .further_classification
                .clone(),
        }
    }
}

/// 配置的压缩编码对应的 Parquet 编码
fn codec(compression: ParquetCompression) -> Compression {
    match compression {
        ParquetCompression::NoCompress => Compression::UNCOMPRESSED,
        ParquetCompression::Snappy => Compression::SNAPPY,
        ParquetCompression::Gzip => Compression::GZIP(GzipLevel::default()),
        ParquetCompression::Lz4 => Compression::LZ4,
        ParquetCompression::Zstd => Compression::ZSTD(ZstdLevel::default()),
    }
}

/// 固定的扁平输出模式
fn patent_schema() -> Schema {
    Schema::new(vec![
        Field::new("document_name", DataType::Utf8, false),
        Field::new("document_type", DataType::Utf8, false),
        Field::new("date_produced", DataType::Utf8, false),
        Field::new("date_publ", DataType::Utf8, false),
        Field::new("country", DataType::Utf8, false),
        Field::new("invention_title", DataType::Utf8, false),
        Field::new("number_of_claims", DataType::Int64, false),
        Field::new("abstract", DataType::Utf8, false),
        Field::new("description", DataType::Utf8, false),
        Field::new("claims", DataType::Utf8, false),
        Field::new("pub_ref_country", DataType::Utf8, false),
        Field::new("pub_ref_doc_number", DataType::Utf8, false),
        Field::new("pub_ref_kind_code", DataType::Utf8, false),
        Field::new("pub_ref_date", DataType::Utf8, false),
        Field::new("class_nat_country", DataType::Utf8, false),
        Field::new("class_nat_main_classification", DataType::Utf8, false),
        Field::new("class_nat_further_classification", DataType::Utf8, false),
    ])
}

/// 去掉压缩包名末尾的 .zip 后缀
fn trim_zip_suffix(name: &str) -> &str {
    name.strip_suffix(".zip")
        .or_else(|| name.strip_suffix(".ZIP"))
        .unwrap_or(name)
}

/// 转换线程：把记录流投影为行
///
/// 写入循环退出后继续排空记录流，避免生产端阻塞；返回接收的记录总数。
fn convert_rows(
    docs: Receiver<PatentDoc>,
    rows_tx: SyncSender<ParquetRow>,
) -> usize {
    debug!("Parquet 转换线程启动");

    let mut received = 0usize;
    let mut writer_gone = false;
    for doc in docs.iter() {
        received += 1;
        if writer_gone {
            continue;
        }
        if rows_tx.send(ParquetRow::from(&doc)).is_err() {
            // 写入循环已中止，此后仅排空
            writer_gone = true;
        }
    }
    received
}

/// 把累积的行组装成 RecordBatch
fn rows_to_batch(
    schema: &Arc<Schema>,
    rows: &[ParquetRow],
) -> Result<RecordBatch> {
    fn strings<F>(rows: &[ParquetRow], field: F) -> ArrayRef
    where
        F: Fn(&ParquetRow) -> &str,
    {
        Arc::new(StringArray::from_iter_values(rows.iter().map(field)))
    }

    let columns: Vec<ArrayRef> = vec![
        strings(rows, |r| &r.document_name),
        strings(rows, |r| &r.document_type),
        strings(rows, |r| &r.date_produced),
        strings(rows, |r| &r.date_publ),
        strings(rows, |r| &r.country),
        strings(rows, |r| &r.invention_title),
        Arc::new(Int64Array::from_iter_values(
            rows.iter().map(|r| r.number_of_claims),
        )),
        strings(rows, |r| &r.abstract_text),
        strings(rows, |r| &r.description),
        strings(rows, |r| &r.claims),
        strings(rows, |r| &r.pub_ref_country),
        strings(rows, |r| &r.pub_ref_doc_number),
        strings(rows, |r| &r.pub_ref_kind_code),
        strings(rows, |r| &r.pub_ref_date),
        strings(rows, |r| &r.class_nat_country),
        strings(rows, |r| &r.class_nat_main_classification),
        strings(rows, |r| &r.class_nat_further_classification),
    ];

    Ok(RecordBatch::try_new(Arc::clone(schema), columns)?)
}

/// 写出累积的批次并清空缓冲
fn flush_batch(
    writer: &mut ArrowWriter<File>,
    schema: &Arc<Schema>,
    buffer: &mut Vec<ParquetRow>,
    written: &mut usize,
) -> Result<()> {
    if buffer.is_empty() {
        return Ok(());
    }
    let batch = rows_to_batch(schema, buffer)?;
    writer.write(&batch)?;
    *written += buffer.len();
    buffer.clear();
    Ok(())
}

/// 初始化失败或中止后排空记录流，保证生产端不被阻塞
fn drain_docs(docs: Receiver<PatentDoc>) -> WriteSummary {
    let mut dropped = 0usize;
    for _ in docs.iter() {
        dropped += 1;
    }
    WriteSummary { written: 0, dropped }
}

/// 消费单个压缩包的记录流并写出一个 Parquet 文件
///
/// 打开输出文件或初始化写入器失败时，整个作业的输出不可写，
/// 上报一个跳过事件；写入中途失败则中止余下写入并上报。
/// 任何路径下记录流都会被消费到关闭为止。
pub fn write_parquet_file(
    output_dir: &Path,
    compression: ParquetCompression,
    origin_zip_name: &str,
    docs: Receiver<PatentDoc>,
    error_tx: &SyncSender<ErrorEvent>,
) -> WriteSummary {
    info!("Parquet 输出器启动: {origin_zip_name}");

    let output_file_name =
        format!("{}.parquet", trim_zip_suffix(origin_zip_name));
    let output_path = output_dir.join(&output_file_name);

    let file = match File::create(&output_path) {
        Ok(file) => file,
        Err(e) => {
            error!("初始化 Parquet 输出文件失败: {e}");
            let _ = error_tx.send(ErrorEvent::skipped(
                "parquet",
                &output_file_name,
                "initializing the parquet output file",
                e.to_string(),
            ));
            return drain_docs(docs);
        }
    };

    let props = WriterProperties::builder()
        .set_compression(codec(compression))
        .set_max_row_group_size(ROW_GROUP_SIZE)
        .set_data_page_size_limit(PAGE_SIZE)
        .build();

    let schema = Arc::new(patent_schema());
    let mut writer =
        match ArrowWriter::try_new(file, Arc::clone(&schema), Some(props)) {
            Ok(writer) => writer,
            Err(e) => {
                error!("初始化 Parquet 写入器失败: {e}");
                let _ = error_tx.send(ErrorEvent::skipped(
                    "parquet",
                    &output_file_name,
                    "initializing the Parquet writer",
                    e.to_string(),
                ));
                return drain_docs(docs);
            }
        };

    // 转换阶段与写入循环并行运行
    let (rows_tx, rows_rx) = mpsc::sync_channel(CONVERT_BUFFER);
    let convert_handle = thread::spawn(move || convert_rows(docs, rows_tx));

    let mut buffer: Vec<ParquetRow> = Vec::with_capacity(WRITE_BATCH);
    let mut written = 0usize;
    let mut aborted = false;

    for row in rows_rx.iter() {
        buffer.push(row);
        if buffer.len() >= WRITE_BATCH {
            if let Err(e) =
                flush_batch(&mut writer, &schema, &mut buffer, &mut written)
            {
                error!("写入 Parquet 批次失败: {e}");
                let _ = error_tx.send(ErrorEvent::skipped(
                    "parquet",
                    &output_file_name,
                    "writing a record batch",
                    e.to_string(),
                ));
                aborted = true;
                break;
            }
        }
    }
    // 中止路径下关闭接收端，让转换线程只排空
    drop(rows_rx);

    if !aborted {
        if let Err(e) =
            flush_batch(&mut writer, &schema, &mut buffer, &mut written)
        {
            error!("写入 Parquet 批次失败: {e}");
            let _ = error_tx.send(ErrorEvent::skipped(
                "parquet",
                &output_file_name,
                "writing a record batch",
                e.to_string(),
            ));
            aborted = true;
        }
    }

    if !aborted {
        // 显式收尾，保证页脚落盘
        if let Err(e) = writer.close() {
            error!("收尾 Parquet 文件失败: {e}");
            let _ = error_tx.send(ErrorEvent::skipped(
                "parquet",
                &output_file_name,
                "finalizing the parquet file",
                e.to_string(),
            ));
        }
    }

    let received = match convert_handle.join() {
        Ok(received) => received,
        Err(e) => {
            error!("Parquet 转换线程异常退出: {e:?}");
            written
        }
    };

    info!("Parquet 输出完成: {output_file_name}, 写出 {written} 条");
    WriteSummary { written, dropped: received.saturating_sub(written) }
}
