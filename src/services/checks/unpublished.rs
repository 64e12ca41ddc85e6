//! HTML 附件的撤回/下架检查
//!
//! 附件跟随所属文档（attachable）的状态：
//! - 文档没有下架记录：不检查
//! - 文档已撤回：附件必须带有等价的撤回说明
//! - 文档已下架回草稿且策略为重定向：附件必须是重定向条目
//!
//! 后两种情况互斥，撤回优先。

use std::sync::Arc;

use crate::models::{AttachableState, ContentItem, ObservedPayload, Unpublishing};
use crate::services::checks::{unrecognised, Check, Mismatch};
use crate::services::markup;
use crate::services::renderer::ExplanationRenderer;

pub struct UnpublishedCheck {
    state: AttachableState,
    redirect_schema: String,
    renderer: Arc<dyn ExplanationRenderer>,
}

impl UnpublishedCheck {
    pub fn new(
        state: AttachableState,
        redirect_schema: impl Into<String>,
        renderer: Arc<dyn ExplanationRenderer>,
    ) -> Self {
        Self {
            state,
            redirect_schema: redirect_schema.into(),
            renderer,
        }
    }

    fn check_for_withdrawn_notice(&self, unpublishing: &Unpublishing, item: &ContentItem) -> Option<Mismatch> {
        let observed = item.withdrawn_explanation();
        if unpublishing.explanation.trim().is_empty() && observed.trim().is_empty() {
            return None;
        }

        let expected = self.renderer.render(&unpublishing.explanation);
        if markup::equivalent(&expected, observed) {
            None
        } else {
            Some(format!(
                "expected withdrawn notice: '{}' but got '{}'",
                expected, observed
            ))
        }
    }

    fn check_for_redirect_to_parent(&self, item: &ContentItem) -> Option<Mismatch> {
        if item.schema_name.as_deref() == Some(self.redirect_schema.as_str()) {
            None
        } else {
            Some("attachment should redirect to parent".to_string())
        }
    }
}

impl Check for UnpublishedCheck {
    fn evaluate(&self, payload: &ObservedPayload) -> Vec<Mismatch> {
        let Some(unpublishing) = &self.state.unpublishing else {
            return Vec::new();
        };

        let withdrawn = self.state.has_been_withdrawn();
        let must_redirect = !withdrawn && self.state.has_been_unpublished() && self.state.redirects();
        if !withdrawn && !must_redirect {
            return Vec::new();
        }

        let item = match &payload.content {
            Ok(item) => item,
            Err(e) => return vec![unrecognised(e)],
        };

        let failure = if withdrawn {
            self.check_for_withdrawn_notice(unpublishing, item)
        } else {
            self.check_for_redirect_to_parent(item)
        };

        failure.into_iter().collect()
    }
}
