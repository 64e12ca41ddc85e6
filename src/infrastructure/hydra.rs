//! 有界并发探测引擎 - 基础设施层
//!
//! ## 职责
//!
//! - 持有待执行的探测队列
//! - 用 Semaphore 限制同时在途的请求数（限制的是在途请求，不是总量）
//! - 每个请求都有超时，与 `Fetch` 的实现无关
//! - 请求完成后调用它自带的完成回调
//! - 回调可以返回新的探测（fan-out），新探测进入同一个引擎，计入同一次运行
//! - 回调 panic 时交给 `PanicHandler`，其他探测照常执行
//!
//! `queue` 从不阻塞；`run` 一直等到队列为空且没有在途请求才返回。

use std::any::Any;
use std::collections::VecDeque;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, error};

use crate::infrastructure::http_fetcher::{Fetch, ProbeOutcome, TransportFailure};

/// 完成回调，返回值为需要追加的探测
pub type CompletionHandler = Box<dyn FnOnce(ProbeOutcome) -> Vec<ProbeRequest> + Send + 'static>;

/// 回调 panic 时调用，参数为 (文档 id, 探测地址, panic 信息)
pub type PanicHandler = Arc<dyn Fn(u64, &str, &str) + Send + Sync>;

/// 一个待执行的探测
///
/// 创建时绑定到一个文档，之后不会改变
pub struct ProbeRequest {
    document_id: u64,
    url: String,
    on_complete: CompletionHandler,
}

impl ProbeRequest {
    pub fn new<F>(document_id: u64, url: impl Into<String>, on_complete: F) -> Self
    where
        F: FnOnce(ProbeOutcome) -> Vec<ProbeRequest> + Send + 'static,
    {
        Self {
            document_id,
            url: url.into(),
            on_complete: Box::new(on_complete),
        }
    }

    pub fn document_id(&self) -> u64 {
        self.document_id
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// 消费请求，执行完成回调
    pub fn complete(self, outcome: ProbeOutcome) -> Vec<ProbeRequest> {
        (self.on_complete)(outcome)
    }
}

impl fmt::Debug for ProbeRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProbeRequest")
            .field("document_id", &self.document_id)
            .field("url", &self.url)
            .finish_non_exhaustive()
    }
}

/// 一次运行的统计
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RunStats {
    /// 完成的探测数（含 fan-out）
    pub completed: usize,
    /// 回调追加的探测数
    pub fan_out: usize,
    /// 回调 panic 的探测数
    pub panicked: usize,
}

/// 单个探测任务的结果
enum TaskResult {
    Completed(Vec<ProbeRequest>),
    Panicked {
        document_id: u64,
        url: String,
        message: String,
    },
}

/// 探测引擎
pub struct Hydra {
    fetcher: Arc<dyn Fetch>,
    max_concurrency: usize,
    request_timeout: Option<Duration>,
    on_panic: Option<PanicHandler>,
    queued: VecDeque<ProbeRequest>,
}

impl Hydra {
    /// `max_concurrency` 为 0 时按 1 处理
    pub fn new(fetcher: Arc<dyn Fetch>, max_concurrency: usize) -> Self {
        Self {
            fetcher,
            max_concurrency: max_concurrency.max(1),
            request_timeout: None,
            on_panic: None,
            queued: VecDeque::new(),
        }
    }

    /// 每个探测的超时，超时后回调收到 `TransportFailure::Timeout`
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = Some(timeout);
        self
    }

    pub fn with_panic_handler(mut self, handler: PanicHandler) -> Self {
        self.on_panic = Some(handler);
        self
    }

    pub fn max_concurrency(&self) -> usize {
        self.max_concurrency
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout
    }

    /// 加入队列，不会阻塞
    pub fn queue(&mut self, request: ProbeRequest) {
        self.queued.push_back(request);
    }

    /// 队列中等待执行的探测
    pub fn queued_requests(&self) -> &VecDeque<ProbeRequest> {
        &self.queued
    }

    /// 执行直到队列和在途请求全部清空
    pub async fn run(&mut self) -> RunStats {
        let semaphore = Arc::new(Semaphore::new(self.max_concurrency));
        let mut in_flight = JoinSet::new();
        let mut stats = RunStats::default();

        loop {
            while let Some(request) = self.queued.pop_front() {
                // Semaphore 不会被 close，acquire 只会成功
                let Ok(permit) = semaphore.clone().acquire_owned().await else {
                    error!("并发控制信号量已关闭，剩余 {} 个探测未执行", self.queued.len() + 1);
                    return stats;
                };
                let fetcher = self.fetcher.clone();
                let timeout = self.request_timeout;

                in_flight.spawn(async move {
                    let outcome = {
                        let _permit = permit;
                        fetch_with_timeout(fetcher.as_ref(), request.url.clone(), timeout).await
                    };
                    complete_isolated(request, outcome)
                });
            }

            match in_flight.join_next().await {
                Some(Ok(TaskResult::Completed(follow_ups))) => {
                    stats.completed += 1;
                    if !follow_ups.is_empty() {
                        debug!("回调追加了 {} 个探测", follow_ups.len());
                        stats.fan_out += follow_ups.len();
                        self.queued.extend(follow_ups);
                    }
                }
                Some(Ok(TaskResult::Panicked {
                    document_id,
                    url,
                    message,
                })) => {
                    stats.completed += 1;
                    stats.panicked += 1;
                    error!("[文档 #{}] 💥 完成回调 panic ({}): {}", document_id, url, message);
                    if let Some(on_panic) = &self.on_panic {
                        on_panic(document_id, &url, &message);
                    }
                }
                Some(Err(e)) => {
                    stats.completed += 1;
                    stats.panicked += 1;
                    error!("探测任务异常结束: {}", e);
                }
                None => break,
            }
        }

        stats
    }
}

/// 发出请求；`Fetch` 实现自身 panic 时记为传输失败
async fn fetch_with_timeout(fetcher: &dyn Fetch, url: String, timeout: Option<Duration>) -> ProbeOutcome {
    let request = AssertUnwindSafe(fetcher.fetch(url)).catch_unwind();

    let result = match timeout {
        Some(after) => match tokio::time::timeout(after, request).await {
            Ok(result) => result,
            Err(_) => return Err(TransportFailure::Timeout { after }),
        },
        None => request.await,
    };

    result.unwrap_or_else(|payload| {
        Err(TransportFailure::Other(format!(
            "fetch panicked: {}",
            panic_message(payload.as_ref())
        )))
    })
}

/// 执行完成回调，panic 不会越过任务边界
fn complete_isolated(request: ProbeRequest, outcome: ProbeOutcome) -> TaskResult {
    let document_id = request.document_id;
    let url = request.url.clone();

    match panic::catch_unwind(AssertUnwindSafe(|| request.complete(outcome))) {
        Ok(follow_ups) => TaskResult::Completed(follow_ups),
        Err(payload) => TaskResult::Panicked {
            document_id,
            url,
            message: panic_message(payload.as_ref()),
        },
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
