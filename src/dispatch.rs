//! 输出分发模块
//!
//! 按输出模式把单个作业的记录流路由到唯一的输出器，一对一分发，
//! 不做多路复用。none 模式下仅排空记录流，避免生产端阻塞。

use crate::config::{OutputMode, ParquetCompression};
use crate::document::PatentDoc;
use crate::events::ErrorEvent;
use crate::writer::{self, WriteSummary};
use std::path::Path;
use std::sync::mpsc::{Receiver, SyncSender};
use tracing::debug;

/// 把记录流完整交给所选输出器，返回写出统计
///
/// 无论哪种模式，返回前记录流都会被消费到关闭为止。
pub fn dispatch_output(
    mode: OutputMode,
    output_dir: &Path,
    compression: ParquetCompression,
    origin_zip_name: &str,
    docs: Receiver<PatentDoc>,
    error_tx: &SyncSender<ErrorEvent>,
) -> WriteSummary {
    debug!("开始分发输出: {origin_zip_name}");

    match mode {
        OutputMode::Xml => writer::write_xml_files(output_dir, docs),
        OutputMode::Json => writer::write_json_files(output_dir, docs),
        OutputMode::Parquet => writer::write_parquet_file(
            output_dir,
            compression,
            origin_zip_name,
            docs,
            error_tx,
        ),
        OutputMode::Html => writer::write_html_files(output_dir, docs),
        OutputMode::None => {
            // 不输出，仅排空
            let mut drained = 0usize;
            for _ in docs.iter() {
                drained += 1;
            }
            debug!("none 模式排空 {drained} 条记录: {origin_zip_name}");
            WriteSummary::default()
        }
    }
}
