//! 作业准入门闸
//!
//! 限制同时处理的压缩包数量。许可在 Drop 时归还名额，
//! 保证正常、跳过、出错任何退出路径都不会泄漏名额。

use std::sync::{Arc, Condvar, Mutex};

struct GateState {
    active: usize,
    peak: usize,
}

struct GateInner {
    limit: usize,
    state: Mutex<GateState>,
    cond: Condvar,
}

/// 计数型准入门闸
#[derive(Clone)]
pub struct AdmissionGate {
    inner: Arc<GateInner>,
}

/// 准入许可，离开作用域时自动释放名额
pub struct AdmissionPermit {
    inner: Arc<GateInner>,
}

impl AdmissionGate {
    /// 创建容量为 `limit` 的门闸
    ///
    /// # Panics
    /// `limit` 为 0 时 panic（并发规划器保证至少为 1）。
    pub fn new(limit: usize) -> Self {
        assert!(limit > 0, "门闸容量必须大于 0");
        Self {
            inner: Arc::new(GateInner {
                limit,
                state: Mutex::new(GateState { active: 0, peak: 0 }),
                cond: Condvar::new(),
            }),
        }
    }

    /// 阻塞直到获得一个名额
    pub fn acquire(&self) -> AdmissionPermit {
        let mut state = self.inner.state.lock().unwrap();
        while state.active >= self.inner.limit {
            state = self.inner.cond.wait(state).unwrap();
        }
        state.active += 1;
        state.peak = state.peak.max(state.active);
        AdmissionPermit { inner: Arc::clone(&self.inner) }
    }

    /// 门闸容量
    pub fn limit(&self) -> usize {
        self.inner.limit
    }

    /// 当前占用的名额数
    pub fn active(&self) -> usize {
        self.inner.state.lock().unwrap().active
    }

    /// 运行期间的峰值占用，用于验证并发上限从未被突破
    pub fn peak(&self) -> usize {
        self.inner.state.lock().unwrap().peak
    }
}

impl Drop for AdmissionPermit {
    fn drop(&mut self) {
        let mut state = self.inner.state.lock().unwrap();
        state.active -= 1;
        self.inner.cond.notify_one();
    }
}
