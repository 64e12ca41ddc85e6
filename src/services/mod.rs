//! 业务能力层（Services）
//!
//! - `checks` - 每种期望状态的一致性判断
//! - `failure_collector` - 线程安全的失败收集
//! - `renderer` - 撤回说明渲染
//! - `markup` - HTML 片段结构化比较

pub mod checks;
pub mod failure_collector;
pub mod markup;
pub mod renderer;

pub use checks::{build_check, Check, CheckContext, Mismatch};
pub use failure_collector::{Failure, FailureCollector, FailureReport};
pub use renderer::{ExplanationRenderer, ParagraphRenderer};
