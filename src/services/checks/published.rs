//! 正常发布检查：条目必须可访问、不是重定向/删除条目、不带撤回说明

use crate::models::ObservedPayload;
use crate::services::checks::{unrecognised, Check, Mismatch};

pub struct PublishedCheck {
    schema_name: Option<String>,
    redirect_schema: String,
    gone_schema: String,
}

impl PublishedCheck {
    pub fn new(
        schema_name: Option<String>,
        redirect_schema: impl Into<String>,
        gone_schema: impl Into<String>,
    ) -> Self {
        Self {
            schema_name,
            redirect_schema: redirect_schema.into(),
            gone_schema: gone_schema.into(),
        }
    }
}

impl Check for PublishedCheck {
    fn evaluate(&self, payload: &ObservedPayload) -> Vec<Mismatch> {
        if !payload.is_success() {
            return vec![format!(
                "expected a live content item but got HTTP {}",
                payload.status
            )];
        }

        let item = match &payload.content {
            Ok(item) => item,
            Err(e) => return vec![unrecognised(e)],
        };

        let mut failures = Vec::new();

        match item.schema_name.as_deref() {
            None => failures.push("content item has no schema_name".to_string()),
            Some(schema) if schema == self.redirect_schema || schema == self.gone_schema => {
                failures.push(format!(
                    "expected a live content item but found a '{}' item",
                    schema
                ));
            }
            Some(schema) => {
                if let Some(expected) = &self.schema_name {
                    if schema != expected {
                        failures.push(format!(
                            "expected schema_name '{}' but got '{}'",
                            expected, schema
                        ));
                    }
                }
            }
        }

        if item.has_withdrawn_notice() {
            failures.push(format!(
                "unexpected withdrawn notice: '{}'",
                item.withdrawn_explanation()
            ));
        }

        failures
    }
}
