//! 一致性检查 - 业务能力层
//!
//! 每种期望状态对应一个 `Check` 实现。
//!
//! ## 约定
//!
//! - `evaluate` 是纯函数：同一个 payload 永远得到同样的结果，不做任何 I/O
//! - 返回空列表表示一致
//! - 无法识别的 payload 记为一条 mismatch，不能 panic，也不能中断整个运行

pub mod gone;
pub mod published;
pub mod redirect;
pub mod unpublished;

use std::sync::Arc;

use crate::config::Config;
use crate::models::{DecodeError, Expectation, ObservedPayload};
use crate::services::renderer::ExplanationRenderer;

pub use gone::GoneCheck;
pub use published::PublishedCheck;
pub use redirect::RedirectCheck;
pub use unpublished::UnpublishedCheck;

/// 一条不一致描述
pub type Mismatch = String;

/// 一致性检查
pub trait Check: Send + Sync {
    /// 对比期望状态与观察到的 payload
    fn evaluate(&self, payload: &ObservedPayload) -> Vec<Mismatch>;

    /// 非 2xx 且响应体无法解码时，这个状态码是否仍交给 `evaluate` 判断。
    /// 默认不接受，由请求队列记为传输失败
    fn accepts_status(&self, _status: u16) -> bool {
        false
    }
}

/// 构造检查所需的共享参数
#[derive(Clone)]
pub struct CheckContext {
    pub redirect_schema: String,
    pub gone_schema: String,
    pub renderer: Arc<dyn ExplanationRenderer>,
}

impl CheckContext {
    pub fn new(config: &Config, renderer: Arc<dyn ExplanationRenderer>) -> Self {
        Self {
            redirect_schema: config.redirect_schema.clone(),
            gone_schema: config.gone_schema.clone(),
            renderer,
        }
    }
}

impl std::fmt::Debug for CheckContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CheckContext")
            .field("redirect_schema", &self.redirect_schema)
            .field("gone_schema", &self.gone_schema)
            .finish_non_exhaustive()
    }
}

/// 根据期望状态选择检查
pub fn build_check(expectation: &Expectation, ctx: &CheckContext) -> Arc<dyn Check> {
    match expectation {
        Expectation::Unpublished(state) => Arc::new(UnpublishedCheck::new(
            state.clone(),
            ctx.redirect_schema.clone(),
            ctx.renderer.clone(),
        )),
        Expectation::Published { schema_name } => Arc::new(PublishedCheck::new(
            schema_name.clone(),
            ctx.redirect_schema.clone(),
            ctx.gone_schema.clone(),
        )),
        Expectation::Redirected { destination } => Arc::new(RedirectCheck::new(
            destination.clone(),
            ctx.redirect_schema.clone(),
        )),
        Expectation::Gone => Arc::new(GoneCheck::new(ctx.gone_schema.clone())),
    }
}

/// 解码失败时的统一描述
pub(crate) fn unrecognised(error: &DecodeError) -> Mismatch {
    format!("unrecognised content item: {}", error)
}
