use thiserror::Error;

/// 检查器错误类型
///
/// 只覆盖"运行本身失败"的情况：配置错误、输入错误、客户端/运行时创建失败。
/// 单个探测的网络错误和内容不一致不会出现在这里，它们会被记录为 mismatch。
#[derive(Debug, Error)]
pub enum CheckerError {
    /// 配置错误
    #[error("配置错误 ({field}): {reason}")]
    Config { field: String, reason: String },

    /// 输入的文档检查不合法
    #[error("文档 {document_id} 的检查不合法: {reason}")]
    InvalidCheck { document_id: u64, reason: String },

    /// HTTP 客户端创建失败
    #[error("HTTP 客户端创建失败: {0}")]
    Client(#[from] reqwest::Error),

    /// 异步运行时创建失败
    #[error("运行时创建失败: {0}")]
    Runtime(#[from] std::io::Error),
}

// ========== 便捷构造函数 ==========

impl CheckerError {
    /// 创建配置错误
    pub fn config(field: impl Into<String>, reason: impl Into<String>) -> Self {
        CheckerError::Config {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// 创建输入错误
    pub fn invalid_check(document_id: u64, reason: impl Into<String>) -> Self {
        CheckerError::InvalidCheck {
            document_id,
            reason: reason.into(),
        }
    }
}

// ========== Result 类型别名 ==========

/// 检查器结果类型
pub type AppResult<T> = Result<T, CheckerError>;
