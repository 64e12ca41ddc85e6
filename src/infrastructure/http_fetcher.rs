//! HTTP 探测 - 基础设施层
//!
//! 持有唯一的 HTTP 客户端，只暴露"GET 一个 URL"的能力

use futures::future::{BoxFuture, FutureExt};
use reqwest::header::ACCEPT;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

use crate::config::Config;
use crate::error::AppResult;

/// 探测响应
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeResponse {
    pub status: u16,
    pub body: String,
}

impl ProbeResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }
}

/// 传输层失败：请求没有得到可用的响应
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportFailure {
    #[error("timed out after {}s", .after.as_secs())]
    Timeout { after: Duration },
    #[error("connection failed: {0}")]
    Connect(String),
    #[error("{0}")]
    Other(String),
}

/// 一次探测的结果
pub type ProbeOutcome = Result<ProbeResponse, TransportFailure>;

/// 探测能力
///
/// 返回 `'static` future，可以直接交给执行器 spawn
pub trait Fetch: Send + Sync + 'static {
    fn fetch(&self, url: String) -> BoxFuture<'static, ProbeOutcome>;
}

/// 基于 reqwest 的探测器
///
/// 职责：
/// - 持有 HTTP 客户端（内部连接池）
/// - 每个请求带超时
/// - 不认识 DocumentCheck / Check
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
    timeout: Duration,
}

impl HttpFetcher {
    /// 创建新的探测器
    pub fn new(config: &Config) -> AppResult<Self> {
        let timeout = Duration::from_secs(config.request_timeout_secs);
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(config.user_agent.as_str())
            .build()?;

        Ok(Self { client, timeout })
    }

    fn classify(&self, error: reqwest::Error) -> TransportFailure {
        if error.is_timeout() {
            TransportFailure::Timeout {
                after: self.timeout,
            }
        } else if error.is_connect() {
            TransportFailure::Connect(error.to_string())
        } else {
            TransportFailure::Other(error.to_string())
        }
    }

    async fn get(self, url: String) -> ProbeOutcome {
        debug!("GET {}", url);

        let response = self
            .client
            .get(&url)
            .header(ACCEPT, "application/json")
            .send()
            .await
            .map_err(|e| self.classify(e))?;

        let status = response.status().as_u16();
        let body = response.text().await.map_err(|e| self.classify(e))?;

        debug!("GET {} -> {} ({} bytes)", url, status, body.len());
        Ok(ProbeResponse { status, body })
    }
}

impl Fetch for HttpFetcher {
    fn fetch(&self, url: String) -> BoxFuture<'static, ProbeOutcome> {
        self.clone().get(url).boxed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fetcher_builds_from_default_config() {
        assert!(HttpFetcher::new(&Config::default()).is_ok());
    }

    #[test]
    fn test_timeout_message() {
        let failure = TransportFailure::Timeout {
            after: Duration::from_secs(10),
        };
        assert_eq!(failure.to_string(), "timed out after 10s");
    }

    #[tokio::test]
    async fn test_unreachable_host_is_a_transport_failure() {
        let config = Config {
            request_timeout_secs: 2,
            ..Config::default()
        };
        let fetcher = HttpFetcher::new(&config).unwrap();

        // 端口 9 (discard) 在测试环境中不会有 HTTP 服务
        let outcome = fetcher.fetch("http://127.0.0.1:9/content/a".to_string()).await;
        assert!(outcome.is_err());
    }
}
