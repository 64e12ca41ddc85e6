//! 失败收集器 - 业务能力层
//!
//! 所有完成回调共享的唯一可变状态。
//! 锁由收集器自己持有，调用方无论跑在单线程还是多线程执行器上都不需要额外同步。

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::services::checks::Mismatch;

/// 一条失败记录
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct Failure {
    pub document_id: u64,
    /// 发现问题的探测地址
    pub url: String,
    pub message: Mismatch,
}

/// 失败收集器
///
/// `Clone` 共享同一份数据
#[derive(Debug, Clone, Default)]
pub struct FailureCollector {
    failures: Arc<Mutex<Vec<Failure>>>,
}

impl FailureCollector {
    pub fn new() -> Self {
        Self::default()
    }

    /// 追加一条失败
    pub fn append(&self, document_id: u64, url: &str, mismatch: Mismatch) {
        self.lock().push(Failure {
            document_id,
            url: url.to_string(),
            message: mismatch,
        });
    }

    /// 追加一次检查产生的全部失败
    ///
    /// 只加锁一次，同一次检查的多条记录保持原有顺序且相邻
    pub fn append_all(&self, document_id: u64, url: &str, mismatches: Vec<Mismatch>) {
        if mismatches.is_empty() {
            return;
        }
        let mut failures = self.lock();
        failures.extend(mismatches.into_iter().map(|message| Failure {
            document_id,
            url: url.to_string(),
            message,
        }));
    }

    /// 当前已收集的失败（快照）
    pub fn results(&self) -> Vec<Failure> {
        self.lock().clone()
    }

    pub fn report(&self) -> FailureReport {
        FailureReport::new(self.results())
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    // 回调只做 push，持锁期间 panic 也不会留下半写的数据
    fn lock(&self) -> MutexGuard<'_, Vec<Failure>> {
        self.failures.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// 一次运行的最终报告
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FailureReport {
    failures: Vec<Failure>,
}

impl FailureReport {
    pub fn new(failures: Vec<Failure>) -> Self {
        Self { failures }
    }

    pub fn is_empty(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn len(&self) -> usize {
        self.failures.len()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Failure> {
        self.failures.iter()
    }

    pub fn failures(&self) -> &[Failure] {
        &self.failures
    }

    /// 有失败的文档（去重，按 id 排序）
    pub fn document_ids(&self) -> Vec<u64> {
        let mut ids: Vec<u64> = self.failures.iter().map(|f| f.document_id).collect();
        ids.sort_unstable();
        ids.dedup();
        ids
    }

    /// 按 (文档 id, 探测地址) 稳定排序后的副本，同一次检查内部顺序不变。
    /// 不同探测之间的顺序取决于执行时序，比较两次运行时用这个
    pub fn sorted(&self) -> Self {
        let mut failures = self.failures.clone();
        failures.sort_by(|a, b| (a.document_id, &a.url).cmp(&(b.document_id, &b.url)));
        Self { failures }
    }
}

impl<'a> IntoIterator for &'a FailureReport {
    type Item = &'a Failure;
    type IntoIter = std::slice::Iter<'a, Failure>;

    fn into_iter(self) -> Self::IntoIter {
        self.failures.iter()
    }
}
