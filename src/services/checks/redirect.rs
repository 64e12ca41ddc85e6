//! 重定向检查：条目必须是重定向条目，且目标与期望一致（payload 带有目标时）

use crate::models::ObservedPayload;
use crate::services::checks::{unrecognised, Check, Mismatch};

pub struct RedirectCheck {
    destination: String,
    redirect_schema: String,
}

impl RedirectCheck {
    pub fn new(destination: impl Into<String>, redirect_schema: impl Into<String>) -> Self {
        Self {
            destination: destination.into(),
            redirect_schema: redirect_schema.into(),
        }
    }
}

impl Check for RedirectCheck {
    fn evaluate(&self, payload: &ObservedPayload) -> Vec<Mismatch> {
        let item = match &payload.content {
            Ok(item) => item,
            Err(e) => return vec![unrecognised(e)],
        };

        let schema = item.schema_name.as_deref().unwrap_or("");
        if schema != self.redirect_schema {
            return vec![format!(
                "expected redirect to '{}' but got schema '{}'",
                self.destination, schema
            )];
        }

        match item.redirect_destination() {
            Some(actual) if destination_path(actual) != destination_path(&self.destination) => {
                vec![format!(
                    "expected redirect to '{}' but redirects to '{}'",
                    self.destination, actual
                )]
            }
            _ => Vec::new(),
        }
    }
}

/// 取出目标的路径部分，去掉协议、主机、查询串和锚点
pub fn destination_path(destination: &str) -> &str {
    let without_scheme = destination
        .strip_prefix("https://")
        .or_else(|| destination.strip_prefix("http://"));

    let path = match without_scheme {
        Some(rest) => rest.find('/').map_or("/", |i| &rest[i..]),
        None => destination,
    };

    let end = path.find(['?', '#']).unwrap_or(path.len());
    &path[..end]
}
