//! 文档检查模型
//!
//! 描述"要检查哪个文档、期望它在下游处于什么状态"。
//! 构造后不可变，由调用方持有，请求队列只读引用。

use serde::Deserialize;

use crate::error::{AppResult, CheckerError};

/// 下架原因
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnpublishingReason {
    /// 误发布
    PublishedInError,
    /// 已合并到其他页面
    Consolidated,
    /// 撤回（保留页面并显示说明）
    Withdrawn,
}

/// 下架记录
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Unpublishing {
    pub reason: UnpublishingReason,
    /// 下架说明（govspeak/纯文本）
    #[serde(default)]
    pub explanation: String,
    #[serde(default)]
    pub alternative_url: Option<String>,
    /// true = 重定向到 alternative_url；false = 直接移除
    #[serde(default)]
    pub redirect: bool,
}

/// 附件所属文档（attachable）的发布状态
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct AttachableState {
    #[serde(default)]
    pub draft: bool,
    #[serde(default)]
    pub withdrawn: bool,
    #[serde(default)]
    pub unpublishing: Option<Unpublishing>,
}

impl AttachableState {
    /// 已撤回
    pub fn has_been_withdrawn(&self) -> bool {
        self.withdrawn
    }

    /// 已下架回草稿
    pub fn has_been_unpublished(&self) -> bool {
        self.draft && self.unpublishing.is_some()
    }

    /// 下架策略为重定向
    pub fn redirects(&self) -> bool {
        self.unpublishing.as_ref().is_some_and(|u| u.redirect)
    }
}

/// 期望的下游终态
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Expectation {
    /// HTML 附件的撤回/下架检查
    Unpublished(AttachableState),
    /// 正常发布
    Published {
        #[serde(default)]
        schema_name: Option<String>,
    },
    /// 重定向到指定路径
    Redirected { destination: String },
    /// 已删除
    Gone,
}

impl Expectation {
    /// 日志用的简短名称
    pub fn label(&self) -> &'static str {
        match self {
            Expectation::Unpublished(_) => "unpublished",
            Expectation::Published { .. } => "published",
            Expectation::Redirected { .. } => "redirected",
            Expectation::Gone => "gone",
        }
    }
}

fn default_locales() -> Vec<String> {
    vec!["en".to_string()]
}

/// 文档检查
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DocumentCheck {
    pub id: u64,
    pub base_path: String,
    /// 每个语言版本单独探测一次
    #[serde(default = "default_locales")]
    pub locales: Vec<String>,
    pub expectation: Expectation,
}

impl DocumentCheck {
    /// 创建只有默认语言的文档检查
    pub fn new(id: u64, base_path: impl Into<String>, expectation: Expectation) -> Self {
        Self {
            id,
            base_path: base_path.into(),
            locales: default_locales(),
            expectation,
        }
    }

    pub fn with_locales<I, S>(mut self, locales: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.locales = locales.into_iter().map(Into::into).collect();
        self
    }

    /// 校验输入
    ///
    /// 不合法的输入是调用方的 bug，必须在发出任何请求之前失败
    pub fn validate(&self) -> AppResult<()> {
        let fail = |reason: &str| Err(CheckerError::invalid_check(self.id, reason));

        if self.base_path.is_empty() {
            return fail("base_path 为空");
        }
        if !self.base_path.starts_with('/') {
            return fail("base_path 必须以 '/' 开头");
        }
        if self.base_path.chars().any(char::is_whitespace) {
            return fail("base_path 不能包含空白字符");
        }
        if self.locales.is_empty() {
            return fail("至少需要一个 locale");
        }
        if self.locales.iter().any(|l| l.trim().is_empty()) {
            return fail("locale 不能为空字符串");
        }

        match &self.expectation {
            Expectation::Redirected { destination } if !destination.starts_with('/') => {
                fail("重定向目标必须是以 '/' 开头的路径")
            }
            Expectation::Unpublished(state) if state.withdrawn && state.unpublishing.is_none() => {
                fail("已撤回的文档必须带有下架记录")
            }
            _ => Ok(()),
        }
    }
}
