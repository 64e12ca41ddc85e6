use crate::error::{AppResult, CheckerError};

/// 程序配置
#[derive(Clone, Debug)]
pub struct Config {
    /// content store 的根地址，探测 URL = base_url + base_path
    pub content_store_url: String,
    /// 同时在途的探测请求上限
    pub max_concurrency: usize,
    /// 单个探测请求的超时（秒）
    pub request_timeout_secs: u64,
    /// 重定向检查是否继续探测目标地址
    pub follow_redirects: bool,
    /// 默认语言，该语言的 URL 不带 locale 后缀
    pub default_locale: String,
    /// 重定向条目的 schema_name
    pub redirect_schema: String,
    /// 已删除条目的 schema_name
    pub gone_schema: String,
    /// 待检查文档列表（TOML）
    pub checks_file: String,
    /// 是否显示详细日志
    pub verbose_logging: bool,
    /// 请求头中的 User-Agent
    pub user_agent: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            content_store_url: "http://localhost:3068/content".to_string(),
            max_concurrency: 20,
            request_timeout_secs: 10,
            follow_redirects: false,
            default_locale: "en".to_string(),
            redirect_schema: "redirect".to_string(),
            gone_schema: "gone".to_string(),
            checks_file: "sync_checks.toml".to_string(),
            verbose_logging: false,
            user_agent: concat!("sync-checker/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        let default = Self::default();
        Self {
            content_store_url: std::env::var("CONTENT_STORE_URL").unwrap_or(default.content_store_url),
            max_concurrency: std::env::var("MAX_CONCURRENCY").ok().and_then(|v| v.parse().ok()).unwrap_or(default.max_concurrency),
            request_timeout_secs: std::env::var("REQUEST_TIMEOUT_SECS").ok().and_then(|v| v.parse().ok()).unwrap_or(default.request_timeout_secs),
            follow_redirects: std::env::var("FOLLOW_REDIRECTS").ok().and_then(|v| v.parse().ok()).unwrap_or(default.follow_redirects),
            default_locale: std::env::var("DEFAULT_LOCALE").unwrap_or(default.default_locale),
            redirect_schema: std::env::var("REDIRECT_SCHEMA").unwrap_or(default.redirect_schema),
            gone_schema: std::env::var("GONE_SCHEMA").unwrap_or(default.gone_schema),
            checks_file: std::env::var("CHECKS_FILE").unwrap_or(default.checks_file),
            verbose_logging: std::env::var("VERBOSE_LOGGING").ok().and_then(|v| v.parse().ok()).unwrap_or(default.verbose_logging),
            user_agent: std::env::var("USER_AGENT").unwrap_or(default.user_agent),
        }
    }

    /// 校验配置，在发出任何请求之前调用
    pub fn validate(&self) -> AppResult<()> {
        if self.max_concurrency == 0 {
            return Err(CheckerError::config("max_concurrency", "must be at least 1"));
        }
        if self.request_timeout_secs == 0 {
            return Err(CheckerError::config("request_timeout_secs", "must be at least 1"));
        }
        if !(self.content_store_url.starts_with("http://") || self.content_store_url.starts_with("https://")) {
            return Err(CheckerError::config(
                "content_store_url",
                format!("'{}' is not an http(s) URL", self.content_store_url),
            ));
        }
        if self.default_locale.trim().is_empty() {
            return Err(CheckerError::config("default_locale", "must not be empty"));
        }
        Ok(())
    }

    /// 拼接探测地址
    pub fn url_for(&self, base_path: &str, locale: &str) -> String {
        let root = self.content_store_url.trim_end_matches('/');
        if locale == self.default_locale {
            format!("{}{}", root, base_path)
        } else {
            format!("{}{}.{}", root, base_path, locale)
        }
    }
}
