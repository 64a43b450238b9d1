//! 作业调度模块
//!
//! 递归扫描输入目录，在并发门闸约束下为每个压缩包启动独立作业，
//! 作业全部结束后关闭共享错误流并等待聚合器退出。
//! 返回时不存在任何仍在运行的作业线程。

use crate::aggregator::{self, REPORT_DIR};
use crate::concurrency::resolve_max_concurrency;
use crate::config::{Config, OutputMode, ParquetCompression};
use crate::dispatch::dispatch_output;
use crate::error::{BulkError, Result};
use crate::events::ErrorEvent;
use crate::gate::AdmissionGate;
use crate::parser::{DocumentParser, ParseRequest};
use crate::writer::WriteSummary;
use chrono::Local;
use std::fs;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, SyncSender};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Instant;
use tracing::{debug, error, info};
use walkdir::WalkDir;

/// 每个并发名额预留的错误流容量
///
/// 留得足够宽裕，避免聚合器落盘偶发变慢时同时拖住多个生产者。
const ERROR_BUFFER_PER_SLOT: usize = 100;

/// 一次运行的汇总结果
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// 启动的作业数（匹配到的压缩包数）
    pub archives: usize,
    /// 成功写出的记录数
    pub written: usize,
    /// 被丢弃的记录数
    pub dropped: usize,
    /// 记入跳过报告的条数
    pub skipped: usize,
}

/// 单个作业的上下文
struct JobContext {
    archive_path: PathBuf,
    archive_name: String,
    output_dir: PathBuf,
    mode: OutputMode,
    compression: ParquetCompression,
    keep_raw: bool,
}

/// 调度一次完整运行
///
/// 输出目录创建失败是致命错误；单个条目的遍历错误只记录日志并跳过，
/// 输入根目录本身不可读会在所有在途作业结束后向调用方传播。
/// `stop` 被置位后不再接纳新的作业，在途作业正常收尾。
pub fn run(
    cfg: &Config,
    parser: Arc<dyn DocumentParser>,
    stop: &Arc<AtomicBool>,
) -> Result<RunSummary> {
    let start = Instant::now();

    let output_dir = PathBuf::from(&cfg.required.output_dir);
    fs::create_dir_all(&output_dir)?;

    let limit = resolve_max_concurrency(cfg.tuning.max_concurrent_archives);
    info!("本次运行并发上限: {limit}");

    // 共享错误流：多生产者单消费者，通道本身保证了写入的串行化
    let (error_tx, error_rx) =
        mpsc::sync_channel::<ErrorEvent>(limit * ERROR_BUFFER_PER_SLOT);

    // 聚合器必须先于任何作业启动
    let run_time = Local::now();
    let report_dir = PathBuf::from(REPORT_DIR);
    let aggregator_handle = thread::spawn(move || {
        aggregator::run_error_aggregator(&report_dir, run_time, error_rx)
    });

    let gate = AdmissionGate::new(limit);
    let totals = Arc::new(Mutex::new(WriteSummary::default()));
    let mut job_handles = Vec::new();
    let mut archives = 0usize;
    let mut walk_error: Option<BulkError> = None;

    for entry in WalkDir::new(&cfg.required.input_dir) {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                // 根目录本身不可读视为致命，其余条目仅跳过
                if e.depth() == 0 {
                    error!("遍历输入目录失败: {e}");
                    walk_error = Some(BulkError::other(format!(
                        "遍历输入目录失败: {e}"
                    )));
                } else {
                    error!("遍历目录条目失败: {e}");
                }
                continue;
            }
        };

        if !entry.file_type().is_file() {
            continue;
        }
        if !entry
            .path()
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("zip"))
        {
            continue;
        }

        if stop.load(Ordering::SeqCst) {
            info!("停止标志被触发，不再接纳新的作业");
            break;
        }

        // 先取得名额再启动作业；许可随作业线程走，任何退出路径都会归还
        let permit = gate.acquire();
        archives += 1;

        let job = JobContext {
            archive_path: entry.path().to_path_buf(),
            archive_name: entry.file_name().to_string_lossy().into_owned(),
            output_dir: output_dir.clone(),
            mode: cfg.required.output_mode,
            compression: cfg.output.parquet_compression,
            // xml 模式必须保留原始序列化内容，其余模式由开发开关决定
            keep_raw: cfg.required.output_mode == OutputMode::Xml
                || cfg.dev.parser_returns_raw,
        };
        let parser = Arc::clone(&parser);
        let error_tx = error_tx.clone();
        let totals = Arc::clone(&totals);

        let handle = thread::spawn(move || {
            let _permit = permit;
            let summary = process_archive(&job, parser.as_ref(), &error_tx);
            totals.lock().unwrap().merge(summary);
        });
        job_handles.push(handle);
    }

    // 等待所有作业结束（包括各自的输出器）
    for handle in job_handles {
        if let Err(e) = handle.join() {
            error!("作业线程异常退出: {e:?}");
        }
    }

    // 关闭共享错误流，通知聚合器退出
    drop(error_tx);
    let skipped = match aggregator_handle.join() {
        Ok(count) => count,
        Err(e) => {
            error!("聚合器线程异常退出: {e:?}");
            0
        }
    };

    if let Some(e) = walk_error {
        return Err(e);
    }

    let write_totals = *totals.lock().unwrap();
    let summary = RunSummary {
        archives,
        written: write_totals.written,
        dropped: write_totals.dropped,
        skipped,
    };
    info!(
        "调度完成: {} 个压缩包, 写出 {} 条, 丢弃 {} 条, 跳过 {} 条, 耗时 {:.2?}",
        summary.archives,
        summary.written,
        summary.dropped,
        summary.skipped,
        start.elapsed()
    );

    Ok(summary)
}

/// 处理单个压缩包：调用解析方，转发错误流，分发记录流
///
/// 解析启动失败只跳过本压缩包，不影响其余作业。
fn process_archive(
    job: &JobContext,
    parser: &dyn DocumentParser,
    error_tx: &SyncSender<ErrorEvent>,
) -> WriteSummary {
    debug!("作业启动: {}", job.archive_name);

    let request = ParseRequest {
        archive_path: job.archive_path.clone(),
        keep_raw: job.keep_raw,
    };

    let stream = match parser.parse(request) {
        Ok(stream) => stream,
        Err(e) => {
            error!("调用文档解析方失败: {}: {e}", job.archive_name);
            let _ = error_tx.send(ErrorEvent::skipped(
                "zip",
                &job.archive_name,
                "invoking the document parser",
                e.to_string(),
            ));
            return WriteSummary::default();
        }
    };

    // 把解析方的错误流转发进共享错误流，与记录流互不阻塞
    let forward_tx = error_tx.clone();
    let parser_errors = stream.errors;
    let forwarder = thread::spawn(move || {
        for event in parser_errors.iter() {
            if forward_tx.send(event).is_err() {
                break;
            }
        }
    });

    let summary = dispatch_output(
        job.mode,
        &job.output_dir,
        job.compression,
        &job.archive_name,
        stream.docs,
        error_tx,
    );

    // 解析方关闭错误流后转发线程随之退出
    if forwarder.join().is_err() {
        error!("错误转发线程异常退出: {}", job.archive_name);
    }

    debug!("作业结束: {}", job.archive_name);
    summary
}
