//! 同步检查运行 - 编排层
//!
//! ## 职责
//!
//! 1. **校验输入**：配置和每个文档检查都必须合法，否则在发出任何请求之前失败
//! 2. **构建队列**：每个文档检查一个 `RequestQueue`
//! 3. **提交请求**：按输入顺序把所有探测放入 `Hydra`
//! 4. **执行**：等待引擎清空（包括回调追加的探测）
//! 5. **汇总**：返回失败收集器中的全部结果
//!
//! ## 状态
//!
//! ```text
//! Idle → Building → Running → Complete
//! ```
//!
//! `run` 消费 `SyncCheck`，运行结束后报告不能再被修改。

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info};

use crate::config::Config;
use crate::error::AppResult;
use crate::infrastructure::{Fetch, HttpFetcher, Hydra, PanicHandler, RunStats};
use crate::models::DocumentCheck;
use crate::services::renderer::{ExplanationRenderer, ParagraphRenderer};
use crate::services::{FailureCollector, FailureReport};
use crate::workflow::{describe_handler_panic, QueueContext, RequestQueue};

/// 运行状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Idle,
    Building,
    Running,
    Complete,
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RunState::Idle => "idle",
            RunState::Building => "building",
            RunState::Running => "running",
            RunState::Complete => "complete",
        };
        f.write_str(name)
    }
}

/// 可替换的协作者
///
/// 全部为空时使用新的失败收集器、reqwest 探测器和默认渲染器
#[derive(Default)]
pub struct SyncCheckOptions {
    pub failures: Option<FailureCollector>,
    pub fetcher: Option<Arc<dyn Fetch>>,
    pub renderer: Option<Arc<dyn ExplanationRenderer>>,
}

impl SyncCheckOptions {
    pub fn with_failures(mut self, failures: FailureCollector) -> Self {
        self.failures = Some(failures);
        self
    }

    pub fn with_fetcher(mut self, fetcher: Arc<dyn Fetch>) -> Self {
        self.fetcher = Some(fetcher);
        self
    }

    pub fn with_renderer(mut self, renderer: Arc<dyn ExplanationRenderer>) -> Self {
        self.renderer = Some(renderer);
        self
    }
}

/// 一次同步检查
pub struct SyncCheck {
    checks: Vec<DocumentCheck>,
    config: Config,
    failures: FailureCollector,
    fetcher: Option<Arc<dyn Fetch>>,
    renderer: Arc<dyn ExplanationRenderer>,
    state: RunState,
    stats: RunStats,
}

impl SyncCheck {
    pub fn new(checks: Vec<DocumentCheck>, config: Config, options: SyncCheckOptions) -> Self {
        Self {
            checks,
            config,
            failures: options.failures.unwrap_or_default(),
            fetcher: options.fetcher,
            renderer: options
                .renderer
                .unwrap_or_else(|| Arc::new(ParagraphRenderer::new())),
            state: RunState::Idle,
            stats: RunStats::default(),
        }
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    pub fn failures(&self) -> &FailureCollector {
        &self.failures
    }

    /// 执行检查，返回最终报告
    pub async fn run(self) -> AppResult<FailureReport> {
        self.run_with_stats().await.map(|(report, _)| report)
    }

    /// 同 `run`，额外返回引擎统计
    pub async fn run_with_stats(mut self) -> AppResult<(FailureReport, RunStats)> {
        let mut hydra = self.build()?;

        self.transition(RunState::Running);
        info!(
            "🚀 开始探测: {} 个请求, 最大并发 {}",
            hydra.queued_requests().len(),
            hydra.max_concurrency()
        );
        self.stats = hydra.run().await;

        self.transition(RunState::Complete);
        let report = self.failures.report();
        info!(
            "✓ 探测完成: {} 个请求 (追加 {}), {} 处不一致",
            self.stats.completed,
            self.stats.fan_out,
            report.len()
        );

        Ok((report, self.stats))
    }

    /// 阻塞当前线程直到运行结束
    ///
    /// 会创建新的 tokio 运行时，不能在异步上下文中调用
    pub fn run_blocking(self) -> AppResult<FailureReport> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()?;
        runtime.block_on(self.run())
    }

    /// 校验输入并构建引擎，不发出任何请求
    fn build(&mut self) -> AppResult<Hydra> {
        self.transition(RunState::Building);

        self.config.validate()?;
        for check in &self.checks {
            check.validate()?;
        }

        let fetcher: Arc<dyn Fetch> = match self.fetcher.take() {
            Some(fetcher) => fetcher,
            None => Arc::new(HttpFetcher::new(&self.config)?),
        };

        // 回调 panic 也要在报告中留下一条记录
        let failures = self.failures.clone();
        let on_panic: PanicHandler = Arc::new(move |document_id: u64, url: &str, message: &str| {
            failures.append(document_id, url, describe_handler_panic(url, message));
        });

        let mut hydra = Hydra::new(fetcher, self.config.max_concurrency)
            .with_request_timeout(Duration::from_secs(self.config.request_timeout_secs))
            .with_panic_handler(on_panic);
        let context = Arc::new(QueueContext::new(&self.config, self.renderer.clone()));

        for check in self.checks.drain(..) {
            let queue = RequestQueue::new(Arc::new(check), self.failures.clone(), context.clone());
            let document = queue.document();
            debug!(
                "[文档 {}] 构建请求队列 ({}, {} 个语言版本)",
                document.id,
                document.expectation.label(),
                document.locales.len()
            );
            for request in queue.requests() {
                hydra.queue(request);
            }
        }

        Ok(hydra)
    }

    fn transition(&mut self, next: RunState) {
        debug!("同步检查状态: {} → {}", self.state, next);
        self.state = next;
    }
}
