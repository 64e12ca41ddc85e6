//! 探测上下文
//!
//! 封装"这个探测属于哪个文档、哪个语言版本、打到哪个地址"这一信息

use std::fmt::Display;

/// 探测上下文
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeCtx {
    pub document_id: u64,
    pub locale: String,
    pub url: String,

    /// 0 为直接探测，1 为回调追加的探测
    pub depth: u8,

    /// 追加探测的失败描述前缀
    pub label: Option<String>,
}

impl ProbeCtx {
    /// 创建直接探测的上下文
    pub fn new(document_id: u64, locale: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            document_id,
            locale: locale.into(),
            url: url.into(),
            depth: 0,
            label: None,
        }
    }

    /// 派生一个追加探测的上下文
    pub fn follow(&self, url: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            document_id: self.document_id,
            locale: self.locale.clone(),
            url: url.into(),
            depth: self.depth + 1,
            label: Some(label.into()),
        }
    }

    /// 给失败描述加上前缀
    pub fn describe(&self, mismatch: String) -> String {
        match &self.label {
            Some(label) => format!("{}: {}", label, mismatch),
            None => mismatch,
        }
    }
}

impl Display for ProbeCtx {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[文档 #{} {} {}]", self.document_id, self.locale, self.url)
    }
}
