//! 共享错误流上的事件类型
//!
//! 所有作业通过同一条错误通道把事件交给聚合器。
//! 聚合器只对跳过类事件落盘，其余事件在来源处记录日志后即被丢弃。

/// 跳过通知：某个处理单元被整体跳过，需要向运维人员报告
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkipNotice {
    /// 单元类型（如 zip、parquet、document）
    pub unit: String,
    /// 单元名称（压缩包名或文档名）
    pub name: String,
    /// 发生阶段的描述
    pub whence: String,
    /// 底层原因
    pub cause: String,
}

/// 错误流事件
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ErrorEvent {
    /// 单元被跳过，处理继续；聚合器会把它写入跳过报告
    Skipped(SkipNotice),
    /// 一般失败，来源处已记录日志，聚合器直接丢弃
    Failed {
        /// 单元名称
        name: String,
        /// 发生阶段的描述
        whence: String,
        /// 底层原因
        cause: String,
    },
}

impl ErrorEvent {
    /// 创建一个跳过事件
    pub fn skipped<U, N, W, C>(unit: U, name: N, whence: W, cause: C) -> Self
    where
        U: Into<String>,
        N: Into<String>,
        W: Into<String>,
        C: Into<String>,
    {
        Self::Skipped(SkipNotice {
            unit: unit.into(),
            name: name.into(),
            whence: whence.into(),
            cause: cause.into(),
        })
    }

    /// 创建一个失败事件
    pub fn failed<N, W, C>(name: N, whence: W, cause: C) -> Self
    where
        N: Into<String>,
        W: Into<String>,
        C: Into<String>,
    {
        Self::Failed {
            name: name.into(),
            whence: whence.into(),
            cause: cause.into(),
        }
    }

    /// 是否为跳过事件
    pub fn is_skipped(&self) -> bool {
        matches!(self, ErrorEvent::Skipped(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_skipped_event() {
        let event =
            ErrorEvent::skipped("zip", "a.zip", "opening the archive", "io");
        assert!(event.is_skipped());

        if let ErrorEvent::Skipped(notice) = event {
            assert_eq!(notice.unit, "zip");
            assert_eq!(notice.name, "a.zip");
            assert_eq!(notice.whence, "opening the archive");
            assert_eq!(notice.cause, "io");
        }
    }

    #[test]
    fn test_failed_event_is_not_skipped() {
        let event = ErrorEvent::failed("a.zip", "writing", "disk full");
        assert!(!event.is_skipped());
    }
}
