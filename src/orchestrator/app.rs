//! 应用入口 - 编排层
//!
//! ## 职责
//!
//! 1. **应用初始化**：校验配置，输出启动信息
//! 2. **加载检查**：从 TOML 文件或目录读取 `Vec<DocumentCheck>`
//! 3. **委托执行**：交给 `SyncCheck` 完成一次运行
//! 4. **全局统计**：输出耗时、请求数和不一致数量

use anyhow::Result;
use std::time::Instant;
use tracing::{error, info, warn};

use crate::config::Config;
use crate::models::DocumentCheck;
use crate::orchestrator::sync_check::{SyncCheck, SyncCheckOptions};
use crate::services::FailureReport;
use crate::utils::logging::{log_checks_loaded, log_failures, log_startup, print_final_stats};

/// 应用主结构
pub struct App {
    config: Config,
}

impl App {
    /// 初始化应用
    pub fn initialize(config: Config) -> Result<Self> {
        config.validate()?;
        log_startup(&config);
        Ok(Self { config })
    }

    /// 从配置的检查文件加载并运行
    pub async fn run(&self) -> Result<FailureReport> {
        let checks = self.load_checks().await?;
        if checks.is_empty() {
            warn!("⚠️ 没有找到待检查的文档，程序结束");
            return Ok(FailureReport::default());
        }
        self.run_checks(checks, SyncCheckOptions::default()).await
    }

    /// 运行给定的检查
    pub async fn run_checks(
        &self,
        checks: Vec<DocumentCheck>,
        options: SyncCheckOptions,
    ) -> Result<FailureReport> {
        let total = checks.len();
        log_checks_loaded(&checks, self.config.max_concurrency);

        let started = Instant::now();
        let (report, stats) = SyncCheck::new(checks, self.config.clone(), options)
            .run_with_stats()
            .await
            .map_err(|e| {
                error!("❌ 同步检查未能开始: {}", e);
                e
            })?;

        log_failures(&report);
        print_final_stats(&report, total, &stats, started.elapsed());

        Ok(report)
    }

    async fn load_checks(&self) -> Result<Vec<DocumentCheck>> {
        info!("\n📁 正在读取待检查的文档: {}", self.config.checks_file);
        crate::models::load_checks(&self.config.checks_file).await
    }
}
