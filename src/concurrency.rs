//! 并发上限计算模块
//!
//! 每次运行开始前解析一次，整个运行期间不变。

use sysinfo::System;
use tracing::{info, warn};

/// 根据配置覆盖值与 CPU 数计算并发上限
///
/// 覆盖值大于 0 时按原样返回（运维意图优先）；
/// 否则取 CPU 数减一，下限为 1（单核机器也要能工作）。
pub fn effective_limit(configured: usize, cpu_count: usize) -> usize {
    if configured > 0 {
        return configured;
    }
    cpu_count.saturating_sub(1).max(1)
}

/// 解析本次运行的最大并发压缩包数
///
/// 内存探测仅作记录参考，探测失败不影响返回值，也不向调用方报错。
pub fn resolve_max_concurrency(configured: usize) -> usize {
    if configured > 0 {
        info!("并发上限由配置指定: {configured}");
        return configured;
    }

    info!("配置未指定并发上限，按系统 CPU 数计算");
    let cpu_count = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    let limit = effective_limit(0, cpu_count);

    // TODO: 按可用内存细化上限，Parquet 模式下每包的驻留内存远高于其他模式
    let mut sys = System::new();
    sys.refresh_memory();
    if sys.total_memory() == 0 {
        warn!("无法探测系统内存信息");
    } else {
        info!(
            "系统内存: 总量 {} 字节, 可用 {} 字节",
            sys.total_memory(),
            sys.available_memory()
        );
    }

    limit
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_override_wins() {
        assert_eq!(effective_limit(4, 8), 4);
        assert_eq!(effective_limit(1, 1), 1);
        assert_eq!(effective_limit(64, 2), 64);
    }

    #[test]
    fn test_auto_is_cpu_minus_one() {
        assert_eq!(effective_limit(0, 8), 7);
        assert_eq!(effective_limit(0, 2), 1);
    }

    #[test]
    fn test_auto_never_below_one() {
        assert_eq!(effective_limit(0, 1), 1);
        assert_eq!(effective_limit(0, 0), 1);
    }

    #[test]
    fn test_resolve_with_override() {
        assert_eq!(resolve_max_concurrency(3), 3);
    }

    #[test]
    fn test_resolve_auto_is_positive() {
        assert!(resolve_max_concurrency(0) >= 1);
    }
}
