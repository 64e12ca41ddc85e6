//! 请求队列 - 流程层
//!
//! 核心职责：把"一个文档检查"展开为具体的探测请求，并给每个请求绑定完成回调
//!
//! 回调流程：
//! 1. 传输失败 → 记为一条 mismatch
//! 2. 非 2xx 且响应体不可用（检查也不接受该状态码）→ 记为一条 mismatch
//! 3. 解码 → Check 判断 → 有 mismatch 则写入失败收集器
//! 4. 重定向检查开启 follow_redirects 时，追加一个探测验证目标页面可访问
//!
//! 回调里的任何失败都只会变成 mismatch，不会影响同一次运行中的其他探测

use std::sync::Arc;

use tracing::{debug, warn};

use crate::config::Config;
use crate::infrastructure::{ProbeOutcome, ProbeRequest, TransportFailure};
use crate::models::{DocumentCheck, Expectation, ObservedPayload};
use crate::services::checks::redirect::destination_path;
use crate::services::checks::{build_check, Check, CheckContext, Mismatch, PublishedCheck};
use crate::services::renderer::ExplanationRenderer;
use crate::services::FailureCollector;
use crate::utils::logging::truncate_text;
use crate::workflow::probe_ctx::ProbeCtx;

/// 所有请求队列共享的只读参数
pub struct QueueContext {
    pub config: Config,
    pub checks: CheckContext,
}

impl QueueContext {
    pub fn new(config: &Config, renderer: Arc<dyn ExplanationRenderer>) -> Self {
        Self {
            config: config.clone(),
            checks: CheckContext::new(config, renderer),
        }
    }
}

/// 请求队列
///
/// - 一个文档检查对应一个队列
/// - 每个语言版本一个探测
/// - 不持有网络资源，返回的请求尚未提交
pub struct RequestQueue {
    document: Arc<DocumentCheck>,
    check: Arc<dyn Check>,
    failures: FailureCollector,
    context: Arc<QueueContext>,
}

impl RequestQueue {
    /// 创建新的请求队列
    pub fn new(
        document: Arc<DocumentCheck>,
        failures: FailureCollector,
        context: Arc<QueueContext>,
    ) -> Self {
        let check = build_check(&document.expectation, &context.checks);
        Self {
            document,
            check,
            failures,
            context,
        }
    }

    pub fn document(&self) -> &DocumentCheck {
        &self.document
    }

    /// 构造全部探测请求
    pub fn requests(&self) -> Vec<ProbeRequest> {
        self.document
            .locales
            .iter()
            .map(|locale| {
                let url = self.context.config.url_for(&self.document.base_path, locale);
                let ctx = ProbeCtx::new(self.document.id, locale.as_str(), url);
                self.binding().bind(ctx, self.check.clone())
            })
            .collect()
    }

    fn binding(&self) -> Binding {
        Binding {
            document: self.document.clone(),
            failures: self.failures.clone(),
            context: self.context.clone(),
        }
    }
}

/// 回调持有的共享数据
#[derive(Clone)]
struct Binding {
    document: Arc<DocumentCheck>,
    failures: FailureCollector,
    context: Arc<QueueContext>,
}

impl Binding {
    fn bind(self, ctx: ProbeCtx, check: Arc<dyn Check>) -> ProbeRequest {
        let document_id = ctx.document_id;
        let url = ctx.url.clone();
        ProbeRequest::new(document_id, url, move |outcome| {
            self.complete(&ctx, check.as_ref(), outcome)
        })
    }

    fn complete(&self, ctx: &ProbeCtx, check: &dyn Check, outcome: ProbeOutcome) -> Vec<ProbeRequest> {
        let mut follow_ups = Vec::new();

        let mismatches: Vec<Mismatch> = match outcome {
            Err(failure) => vec![describe_transport_failure(&ctx.url, &failure)],
            Ok(response) => {
                let payload = ObservedPayload::new(ctx.url.as_str(), response.status, &response.body);

                if !payload.is_success() && payload.content.is_err() && !check.accepts_status(payload.status) {
                    vec![format!(
                        "request to {} returned HTTP {} with no usable body",
                        ctx.url, payload.status
                    )]
                } else {
                    follow_ups.extend(self.follow_redirect(ctx, &payload));
                    check.evaluate(&payload)
                }
            }
        };

        if mismatches.is_empty() {
            debug!("{} ✓ 一致", ctx);
        } else {
            for mismatch in &mismatches {
                warn!("{} ⚠️ {}", ctx, truncate_text(mismatch, 200));
            }
            let described = mismatches.into_iter().map(|m| ctx.describe(m)).collect();
            self.failures.append_all(ctx.document_id, &ctx.url, described);
        }

        follow_ups
    }

    /// 重定向目标探测，只追加一层
    fn follow_redirect(&self, ctx: &ProbeCtx, payload: &ObservedPayload) -> Option<ProbeRequest> {
        let config = &self.context.config;
        if !config.follow_redirects || ctx.depth > 0 {
            return None;
        }
        let Expectation::Redirected { destination } = &self.document.expectation else {
            return None;
        };
        if payload.schema_name() != Some(config.redirect_schema.as_str()) {
            return None;
        }

        let target = payload
            .content
            .as_ref()
            .ok()
            .and_then(|item| item.redirect_destination())
            .unwrap_or(destination.as_str());
        let path = destination_path(target);

        let next = ctx.follow(
            config.url_for(path, &ctx.locale),
            format!("redirect destination {}", path),
        );
        debug!("{} ↪ 追加探测重定向目标 {}", ctx, next.url);

        let check: Arc<dyn Check> = Arc::new(PublishedCheck::new(
            None,
            config.redirect_schema.clone(),
            config.gone_schema.clone(),
        ));
        Some(self.clone().bind(next, check))
    }
}

/// 传输失败的描述
pub fn describe_transport_failure(url: &str, failure: &TransportFailure) -> Mismatch {
    match failure {
        TransportFailure::Timeout { .. } => format!("request to {} {}", url, failure),
        _ => format!("request to {} failed: {}", url, failure),
    }
}

/// 完成回调 panic 的描述
pub fn describe_handler_panic(url: &str, message: &str) -> Mismatch {
    format!("completion handler for {} panicked: {}", url, message)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::ProbeResponse;
    use crate::models::{AttachableState, Unpublishing, UnpublishingReason};
    use crate::services::renderer::ParagraphRenderer;
    use std::time::Duration;

    fn context(config: Config) -> Arc<QueueContext> {
        Arc::new(QueueContext::new(&config, Arc::new(ParagraphRenderer::new())))
    }

    fn withdrawn_check(id: u64) -> DocumentCheck {
        DocumentCheck::new(
            id,
            "/government/publications/a/html-a",
            Expectation::Unpublished(AttachableState {
                draft: false,
                withdrawn: true,
                unpublishing: Some(Unpublishing {
                    reason: UnpublishingReason::Withdrawn,
                    explanation: "Withdrawnificated".to_string(),
                    alternative_url: None,
                    redirect: false,
                }),
            }),
        )
    }

    fn queue(document: DocumentCheck, config: Config) -> (RequestQueue, FailureCollector) {
        let failures = FailureCollector::new();
        let queue = RequestQueue::new(Arc::new(document), failures.clone(), context(config));
        (queue, failures)
    }

    #[test]
    fn test_one_request_per_locale() {
        let document = withdrawn_check(1).with_locales(["en", "cy", "fr"]);
        let (queue, _) = queue(document, Config::default());

        let requests = queue.requests();
        let urls: Vec<_> = requests.iter().map(|r| r.url().to_string()).collect();
        assert_eq!(
            urls,
            vec![
                "http://localhost:3068/content/government/publications/a/html-a",
                "http://localhost:3068/content/government/publications/a/html-a.cy",
                "http://localhost:3068/content/government/publications/a/html-a.fr",
            ]
        );
        assert!(requests.iter().all(|r| r.document_id() == 1));
    }

    #[test]
    fn test_requests_do_not_touch_the_collector() {
        let (queue, failures) = queue(withdrawn_check(1), Config::default());
        let first = queue.requests();
        let second = queue.requests();
        assert_eq!(first.len(), second.len());
        assert!(failures.is_empty());
    }

    #[test]
    fn test_consistent_response_records_nothing() {
        let (queue, failures) = queue(withdrawn_check(1), Config::default());
        let request = queue.requests().pop().unwrap();

        let follow_ups = request.complete(Ok(ProbeResponse::new(
            200,
            r#"{"withdrawn_notice": {"explanation": "<p>Withdrawnificated</p>"}}"#,
        )));

        assert!(follow_ups.is_empty());
        assert!(failures.is_empty());
    }

    #[test]
    fn test_mismatch_is_recorded_with_document_and_url() {
        let (queue, failures) = queue(withdrawn_check(7), Config::default());
        let request = queue.requests().pop().unwrap();
        let url = request.url().to_string();

        request.complete(Ok(ProbeResponse::new(200, r#"{"withdrawn_notice": {}}"#)));

        let results = failures.results();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].document_id, 7);
        assert_eq!(results[0].url, url);
        assert_eq!(
            results[0].message,
            "expected withdrawn notice: '<p>Withdrawnificated</p>' but got ''"
        );
    }

    #[test]
    fn test_timeout_becomes_exactly_one_mismatch() {
        let (queue, failures) = queue(withdrawn_check(2), Config::default());
        let request = queue.requests().pop().unwrap();
        let url = request.url().to_string();

        request.complete(Err(TransportFailure::Timeout {
            after: Duration::from_secs(10),
        }));

        let results = failures.results();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].message, format!("request to {} timed out after 10s", url));
    }

    #[test]
    fn test_connection_refused_becomes_exactly_one_mismatch() {
        let (queue, failures) = queue(withdrawn_check(2), Config::default());
        let request = queue.requests().pop().unwrap();

        request.complete(Err(TransportFailure::Connect("connection refused".to_string())));

        let results = failures.results();
        assert_eq!(results.len(), 1);
        assert!(results[0].message.ends_with("failed: connection failed: connection refused"));
    }

    #[test]
    fn test_error_status_without_body_is_a_transport_mismatch() {
        let (queue, failures) = queue(withdrawn_check(3), Config::default());
        let request = queue.requests().pop().unwrap();

        request.complete(Ok(ProbeResponse::new(502, "<html>Bad Gateway</html>")));

        let results = failures.results();
        assert_eq!(results.len(), 1);
        assert!(results[0].message.contains("returned HTTP 502 with no usable body"));
    }

    #[test]
    fn test_gone_check_accepts_not_found_without_body() {
        let document = DocumentCheck::new(4, "/government/news/deleted", Expectation::Gone);
        let (queue, failures) = queue(document, Config::default());
        let request = queue.requests().pop().unwrap();

        request.complete(Ok(ProbeResponse::new(404, "")));

        assert!(failures.is_empty());
    }

    fn redirect_check() -> DocumentCheck {
        DocumentCheck::new(
            5,
            "/government/old",
            Expectation::Redirected {
                destination: "/government/new".to_string(),
            },
        )
    }

    #[test]
    fn test_redirect_follow_up_probes_the_destination() {
        let config = Config {
            follow_redirects: true,
            ..Config::default()
        };
        let (queue, failures) = queue(redirect_check(), config);
        let request = queue.requests().pop().unwrap();

        let mut follow_ups = request.complete(Ok(ProbeResponse::new(
            200,
            r#"{"schema_name": "redirect", "redirects": [{"path": "/government/old", "destination": "/government/new"}]}"#,
        )));
        assert!(failures.is_empty());
        assert_eq!(follow_ups.len(), 1);

        let follow_up = follow_ups.pop().unwrap();
        assert_eq!(follow_up.document_id(), 5);
        assert_eq!(follow_up.url(), "http://localhost:3068/content/government/new");

        // 目标页面已删除
        let nested = follow_up.complete(Ok(ProbeResponse::new(200, r#"{"schema_name": "gone"}"#)));
        assert!(nested.is_empty());

        let results = failures.results();
        assert_eq!(results.len(), 1);
        assert_eq!(
            results[0].message,
            "redirect destination /government/new: expected a live content item but found a 'gone' item"
        );
    }

    #[test]
    fn test_no_follow_up_when_disabled() {
        let (queue, _) = queue(redirect_check(), Config::default());
        let request = queue.requests().pop().unwrap();

        let follow_ups = request.complete(Ok(ProbeResponse::new(200, r#"{"schema_name": "redirect"}"#)));
        assert!(follow_ups.is_empty());
    }

    #[test]
    fn test_describe_handler_panic() {
        assert_eq!(
            describe_handler_panic("http://x/a", "boom"),
            "completion handler for http://x/a panicked: boom"
        );
    }

    #[test]
    fn test_describe_transport_failure() {
        let failure = TransportFailure::Other("dns error".to_string());
        assert_eq!(
            describe_transport_failure("http://x/a", &failure),
            "request to http://x/a failed: dns error"
        );
    }
}
