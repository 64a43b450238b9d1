//! 错误聚合模块
//!
//! 单一消费者排空共享错误流，把跳过类事件逐行追加到本次运行的跳过报告。
//! 聚合器在任何作业启动前就已运行，错误流关闭是唯一的退出条件。

use crate::events::{ErrorEvent, SkipNotice};
use chrono::{DateTime, Local};
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::mpsc::Receiver;
use tracing::{debug, error};

/// 跳过报告的固定存放目录
pub const REPORT_DIR: &str = "data/runreports";

/// 由运行开始时间派生报告文件路径
pub fn report_path(report_dir: &Path, run_time: DateTime<Local>) -> PathBuf {
    let file_name =
        format!("SkippedFiles-{}.txt", run_time.format("%Y-%m-%dT%H-%M-%S"));
    report_dir.join(file_name)
}

/// 格式化单条跳过报告
pub fn format_skip_line(notice: &SkipNotice, at: DateTime<Local>) -> String {
    format!(
        "{} file skipped [{}] due to error encountered while {}.\n    At Time: {}.\n    Error: {}\n\n",
        notice.unit,
        notice.name,
        notice.whence,
        at.format("T%H-%M-%S"),
        notice.cause,
    )
}

/// 排空错误流直到通道关闭，返回记入报告的跳过条数
///
/// 报告目录或文件不可用时降级为只计数，不中断运行；
/// 单行写入失败同样只记录日志。
pub fn run_error_aggregator(
    report_dir: &Path,
    run_time: DateTime<Local>,
    events: Receiver<ErrorEvent>,
) -> usize {
    debug!("错误聚合器启动");

    let mut report = open_report(report_dir, run_time);
    let mut skipped = 0usize;

    for event in events.iter() {
        match event {
            ErrorEvent::Failed { name, whence, .. } => {
                // 来源处已有日志，这里直接丢弃
                debug!("丢弃非跳过事件: {name} ({whence})");
            }
            ErrorEvent::Skipped(notice) => {
                skipped += 1;
                let line = format_skip_line(&notice, Local::now());
                error!("{line}");
                if let Some(file) = report.as_mut() {
                    if let Err(e) = file.write_all(line.as_bytes()) {
                        error!("追加跳过报告失败: {e}");
                    }
                }
            }
        }
    }

    debug!("错误聚合器退出，共记录 {skipped} 条跳过");
    skipped
}

/// 创建报告目录并以追加模式打开本次运行的报告文件
fn open_report(
    report_dir: &Path,
    run_time: DateTime<Local>,
) -> Option<File> {
    if let Err(e) = fs::create_dir_all(report_dir) {
        error!("创建报告目录失败: {}: {e}", report_dir.display());
        return None;
    }

    let path = report_path(report_dir, run_time);
    match OpenOptions::new().append(true).create(true).open(&path) {
        Ok(file) => Some(file),
        Err(e) => {
            error!("打开跳过报告失败: {}: {e}", path.display());
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::sync::mpsc;
    use std::thread;
    use tempfile::tempdir;

    fn notice(name: &str) -> SkipNotice {
        SkipNotice {
            unit: "zip".to_string(),
            name: name.to_string(),
            whence: "invoking the document parser".to_string(),
            cause: "io error".to_string(),
        }
    }

    #[test]
    fn test_skip_line_format() {
        let at = Local.with_ymd_and_hms(2024, 3, 1, 9, 30, 5).unwrap();
        let line = format_skip_line(&notice("a.zip"), at);
        assert_eq!(
            line,
            "zip file skipped [a.zip] due to error encountered while \
             invoking the document parser.\n    At Time: T09-30-05.\n    \
             Error: io error\n\n"
        );
    }

    #[test]
    fn test_report_path_from_run_time() {
        let run_time = Local.with_ymd_and_hms(2024, 3, 1, 9, 30, 5).unwrap();
        let path = report_path(Path::new("reports"), run_time);
        assert_eq!(
            path,
            Path::new("reports").join("SkippedFiles-2024-03-01T09-30-05.txt")
        );
    }

    #[test]
    fn test_only_skip_events_are_persisted() {
        let dir = tempdir().unwrap();
        let run_time = Local::now();
        let (tx, rx) = mpsc::sync_channel(8);

        tx.send(ErrorEvent::failed("a.zip", "writing", "disk full")).unwrap();
        tx.send(ErrorEvent::Skipped(notice("b.zip"))).unwrap();
        drop(tx);

        let skipped = run_error_aggregator(dir.path(), run_time, rx);
        assert_eq!(skipped, 1);

        let content =
            fs::read_to_string(report_path(dir.path(), run_time)).unwrap();
        assert_eq!(content.matches("file skipped").count(), 1);
        assert!(content.contains("[b.zip]"));
        assert!(!content.contains("a.zip"));
    }

    #[test]
    fn test_concurrent_skips_produce_whole_lines() {
        let dir = tempdir().unwrap();
        let run_time = Local::now();
        let (tx, rx) = mpsc::sync_channel(8);

        // 两个并发生产者，各上报一个不同单元的跳过
        let senders: Vec<_> = ["x.zip", "y.zip"]
            .into_iter()
            .map(|name| {
                let tx = tx.clone();
                thread::spawn(move || {
                    tx.send(ErrorEvent::Skipped(notice(name))).unwrap();
                })
            })
            .collect();
        for sender in senders {
            sender.join().unwrap();
        }
        drop(tx);

        let skipped = run_error_aggregator(dir.path(), run_time, rx);
        assert_eq!(skipped, 2);

        let content =
            fs::read_to_string(report_path(dir.path(), run_time)).unwrap();
        // 两条完整、互不交错的报告
        assert_eq!(content.matches("file skipped [").count(), 2);
        assert_eq!(content.matches("\n\n").count(), 2);
        assert!(content.contains("[x.zip]"));
        assert!(content.contains("[y.zip]"));
    }

    #[test]
    fn test_unwritable_report_dir_degrades_to_counting() {
        let dir = tempdir().unwrap();
        // 用一个普通文件占住报告目录的位置
        let blocked = dir.path().join("blocked");
        fs::write(&blocked, b"x").unwrap();

        let (tx, rx) = mpsc::sync_channel(2);
        tx.send(ErrorEvent::Skipped(notice("a.zip"))).unwrap();
        drop(tx);

        // 不会 panic，也不会中断：仍然返回计数
        let skipped = run_error_aggregator(&blocked, Local::now(), rx);
        assert_eq!(skipped, 1);
    }
}
