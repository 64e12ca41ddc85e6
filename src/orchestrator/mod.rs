//! 编排层（Orchestration Layer）
//!
//! ## 职责
//!
//! 本层负责一次同步检查的生命周期和调度，是整个系统的"指挥中心"。
//!
//! ## 模块划分
//!
//! ### `app` - 应用入口
//! - 校验配置、输出启动信息
//! - 加载检查列表（Vec<DocumentCheck>）
//! - 输出全局统计信息
//!
//! ### `sync_check` - 单次运行
//! - 校验每个文档检查，失败时不发出任何请求
//! - 为每个文档检查创建 RequestQueue
//! - 把全部探测交给 Hydra 并等待清空
//! - 返回 FailureReport
//!
//! ## 层次关系
//!
//! ```text
//! app (处理 Vec<DocumentCheck>)
//!     ↓
//! sync_check (Idle → Building → Running → Complete)
//!     ↓
//! workflow::RequestQueue (处理单个 DocumentCheck 的各个语言版本)
//!     ↓
//! services (能力层：checks / renderer / failure_collector)
//!     ↓
//! infrastructure (基础设施：HttpFetcher / Hydra)
//! ```
//!
//! ## 设计原则
//!
//! 1. **单一职责**：app 管输入输出，sync_check 管一次运行
//! 2. **资源隔离**：只有编排层决定使用哪个 Fetch 实现
//! 3. **向下依赖**：编排层 → workflow → services → infrastructure
//! 4. **无业务逻辑**：只做调度和统计，不做具体检查判断

pub mod app;
pub mod sync_check;

// 重新导出主要类型
pub use app::App;
pub use sync_check::{RunState, SyncCheck, SyncCheckOptions};
