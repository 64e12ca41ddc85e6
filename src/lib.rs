//! # Sync Checker
//!
//! 发布后同步检查：并发探测下游 content store，核对每个文档的实际状态是否符合预期
//!
//! ## 架构设计
//!
//! 本系统采用严格的四层架构：
//!
//! ### ① 基础设施层（Infrastructure）
//! - `infrastructure/` - 持有稀缺资源（HTTP 客户端、并发额度），只暴露能力
//! - `HttpFetcher` - 唯一的 HTTP 客户端 owner，提供 fetch() 能力
//! - `Hydra` - 有界并发探测引擎，吸收回调追加的探测
//!
//! ### ② 业务能力层（Services）
//! - `services/` - 描述"我能检查什么"，只处理单个响应
//! - `checks` - Unpublished / Published / Redirect / Gone 四种检查
//! - `ParagraphRenderer` - 把撤回说明渲染成 HTML
//! - `markup` - HTML 片段等价比较
//! - `FailureCollector` - 线程安全的失败收集
//!
//! ### ③ 流程层（Workflow）
//! - `workflow/` - 定义"一个文档"的完整探测流程
//! - `ProbeCtx` - 上下文封装（document_id + locale + url）
//! - `RequestQueue` - 每个语言版本一个探测，结果交给检查，失败写入收集器
//!
//! ### ④ 编排层（Orchestration）
//! - `orchestrator/app` - 应用入口，加载检查列表并输出统计
//! - `orchestrator/sync_check` - 单次运行的状态机
//!
//! ## 模块结构

pub mod config;
pub mod error;
pub mod infrastructure;
pub mod logger;
pub mod models;
pub mod orchestrator;
pub mod services;
pub mod utils;
pub mod workflow;

// 重新导出常用类型
pub use config::Config;
pub use error::{AppResult, CheckerError};
pub use infrastructure::{Fetch, HttpFetcher, Hydra, ProbeOutcome, ProbeRequest, ProbeResponse, TransportFailure};
pub use models::{load_checks, AttachableState, DocumentCheck, Expectation, Unpublishing, UnpublishingReason};
pub use orchestrator::{App, RunState, SyncCheck, SyncCheckOptions};
pub use services::{ExplanationRenderer, Failure, FailureCollector, FailureReport, ParagraphRenderer};
pub use workflow::{ProbeCtx, RequestQueue};
