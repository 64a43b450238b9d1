use anyhow::{Context, Result};
use std::env;
use std::fs;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::time::Instant;
use tracing::{error, info};
use uspto_bulk_export::config::Config;
use uspto_bulk_export::parser::ZipDocumentParser;
use uspto_bulk_export::{controller, logging};

fn main() -> Result<()> {
    let start = Instant::now();

    // 配置文件路径：唯一可选的位置参数，缺省为当前目录下的 config.toml
    let config_path =
        env::args().nth(1).unwrap_or_else(|| "config.toml".to_string());
    let cfg = Config::from_file(&config_path)
        .with_context(|| format!("加载配置失败: {config_path}"))?;

    let _log_guard =
        logging::init_logging(&cfg.log).context("初始化日志失败")?;

    let stop = Arc::new(AtomicBool::new(false));
    let parser =
        Arc::new(ZipDocumentParser::new(cfg.tuning.channel_buffer_size));
    let summary = controller::run(&cfg, parser, &stop)?;

    // 按需清理输出目录
    if cfg.dev.clean_output {
        if let Err(e) = fs::remove_dir_all(&cfg.required.output_dir) {
            error!("清理输出目录失败: {e}");
        } else {
            info!("输出目录已清理");
        }
    }

    info!(
        "执行完成, 共处理 {} 个压缩包, 写出 {} 条, 跳过 {} 条, 耗时 {:.2?}",
        summary.archives,
        summary.written,
        summary.skipped,
        start.elapsed()
    );
    Ok(())
}
