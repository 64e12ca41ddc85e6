//! 日志工具模块
//!
//! 提供日志格式化和输出的辅助函数

use std::time::Duration;
use tracing::{error, info};

use crate::config::Config;
use crate::infrastructure::RunStats;
use crate::models::DocumentCheck;
use crate::services::FailureReport;

/// 记录程序启动信息
pub fn log_startup(config: &Config) {
    info!("{}", "=".repeat(60));
    info!("🚀 程序启动 - 发布后同步检查");
    info!("🌐 Content store: {}", config.content_store_url);
    info!("📊 最大并发数: {}", config.max_concurrency);
    info!("⏱️ 请求超时: {}s", config.request_timeout_secs);
    if config.follow_redirects {
        info!("↪️ 将继续探测重定向目标");
    }
    info!("{}", "=".repeat(60));
}

/// 记录检查加载信息
///
/// # 参数
/// - `checks`: 本次运行的全部文档检查
/// - `max_concurrent`: 最大并发数
pub fn log_checks_loaded(checks: &[DocumentCheck], max_concurrent: usize) {
    let probes: usize = checks.iter().map(|c| c.locales.len()).sum();
    info!("✓ 找到 {} 个待检查的文档, 共 {} 个语言版本", checks.len(), probes);
    info!("📋 同时在途的请求不超过 {} 个\n", max_concurrent);
}

/// 逐条输出不一致
pub fn log_failures(report: &FailureReport) {
    for failure in report.sorted().iter() {
        error!(
            "[文档 #{}] ❌ {} ({})",
            failure.document_id,
            truncate_text(&failure.message, 300),
            failure.url
        );
    }
}

/// 打印最终统计信息
///
/// # 参数
/// - `report`: 最终报告
/// - `total`: 文档检查总数
/// - `stats`: 引擎统计
/// - `elapsed`: 总耗时
pub fn print_final_stats(report: &FailureReport, total: usize, stats: &RunStats, elapsed: Duration) {
    let failed = report.document_ids().len();

    info!("\n{}", "=".repeat(60));
    info!("📊 同步检查完成统计");
    info!(
        "完成时间: {}",
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
    );
    info!("耗时: {:.1}s", elapsed.as_secs_f64());
    info!("{}", "=".repeat(60));
    info!("🔎 请求: {} (追加 {})", stats.completed, stats.fan_out);
    info!("✅ 一致: {}/{}", total.saturating_sub(failed), total);
    info!("❌ 不一致: {} 个文档, {} 处", failed, report.len());
    if stats.panicked > 0 {
        error!("💥 检查回调异常: {}", stats.panicked);
    }
    info!("{}", "=".repeat(60));
}

/// 截断长文本用于日志显示
///
/// # 参数
/// - `text`: 原始文本
/// - `max_len`: 最大长度
///
/// # 返回
/// 返回截断后的文本
pub fn truncate_text(text: &str, max_len: usize) -> String {
    if text.chars().count() > max_len {
        text.chars().take(max_len).collect::<String>() + "..."
    } else {
        text.to_string()
    }
}
