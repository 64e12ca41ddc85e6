//! 删除检查：条目必须返回 404/410，或者是 gone 条目

use crate::models::ObservedPayload;
use crate::services::checks::{unrecognised, Check, Mismatch};

pub struct GoneCheck {
    gone_schema: String,
}

impl GoneCheck {
    pub fn new(gone_schema: impl Into<String>) -> Self {
        Self {
            gone_schema: gone_schema.into(),
        }
    }
}

impl Check for GoneCheck {
    fn evaluate(&self, payload: &ObservedPayload) -> Vec<Mismatch> {
        if self.accepts_status(payload.status) {
            return Vec::new();
        }

        let item = match &payload.content {
            Ok(item) => item,
            Err(e) => return vec![unrecognised(e)],
        };

        match item.schema_name.as_deref() {
            Some(schema) if schema == self.gone_schema => Vec::new(),
            schema => vec![format!(
                "expected item to be gone but got schema '{}' (HTTP {})",
                schema.unwrap_or(""),
                payload.status
            )],
        }
    }

    fn accepts_status(&self, status: u16) -> bool {
        status == 404 || status == 410
    }
}
