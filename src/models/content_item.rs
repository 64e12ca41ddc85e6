//! 下游 content item 的类型化解码
//!
//! 响应体先解析为 JSON，再解析为 `ContentItem`。
//! 任何一步失败都得到 `DecodeError`，由各个 Check 决定如何报告，而不是直接报错退出。

use serde::Deserialize;
use serde_json::Value as JsonValue;
use thiserror::Error;

/// 撤回说明
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct WithdrawnNotice {
    #[serde(default)]
    pub explanation: Option<String>,
    #[serde(default)]
    pub withdrawn_at: Option<String>,
}

/// 重定向路由
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RedirectRoute {
    #[serde(default)]
    pub path: Option<String>,
    pub destination: String,
}

/// content store 返回的条目
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ContentItem {
    #[serde(default)]
    pub base_path: Option<String>,
    #[serde(default)]
    pub locale: Option<String>,
    #[serde(default)]
    pub schema_name: Option<String>,
    #[serde(default)]
    pub details: JsonValue,
    #[serde(default)]
    pub withdrawn_notice: Option<WithdrawnNotice>,
    #[serde(default)]
    pub redirects: Vec<RedirectRoute>,
}

impl ContentItem {
    /// 解码响应体
    pub fn from_body(body: &str) -> Result<Self, DecodeError> {
        let value: JsonValue =
            serde_json::from_str(body).map_err(|e| DecodeError::NotJson(e.to_string()))?;

        if !value.is_object() {
            return Err(DecodeError::NotAnObject(json_type_name(&value)));
        }

        serde_json::from_value(value).map_err(|e| DecodeError::Shape(e.to_string()))
    }

    /// 撤回说明文本，缺失时为空字符串
    pub fn withdrawn_explanation(&self) -> &str {
        self.withdrawn_notice
            .as_ref()
            .and_then(|n| n.explanation.as_deref())
            .unwrap_or("")
    }

    /// 是否带有非空的撤回说明
    pub fn has_withdrawn_notice(&self) -> bool {
        !self.withdrawn_explanation().trim().is_empty()
    }

    /// 第一个重定向目标
    pub fn redirect_destination(&self) -> Option<&str> {
        self.redirects.first().map(|r| r.destination.as_str())
    }
}

/// 解码失败原因
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("body is not JSON: {0}")]
    NotJson(String),
    #[error("body is a JSON {0}, not an object")]
    NotAnObject(&'static str),
    #[error("unexpected content item shape: {0}")]
    Shape(String),
}

fn json_type_name(value: &JsonValue) -> &'static str {
    match value {
        JsonValue::Null => "null",
        JsonValue::Bool(_) => "bool",
        JsonValue::Number(_) => "number",
        JsonValue::String(_) => "string",
        JsonValue::Array(_) => "array",
        JsonValue::Object(_) => "object",
    }
}

/// 一次探测观察到的下游状态
///
/// 只在一次完成回调期间存在
#[derive(Debug, Clone, PartialEq)]
pub struct ObservedPayload {
    pub url: String,
    pub status: u16,
    pub content: Result<ContentItem, DecodeError>,
}

impl ObservedPayload {
    pub fn new(url: impl Into<String>, status: u16, body: &str) -> Self {
        Self {
            url: url.into(),
            status,
            content: ContentItem::from_body(body),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn schema_name(&self) -> Option<&str> {
        self.content.as_ref().ok().and_then(|c| c.schema_name.as_deref())
    }
}
