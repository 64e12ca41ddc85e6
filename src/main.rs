use sync_checker::{logger, App, Config};
use tracing::error;

#[tokio::main]
async fn main() {
    // 加载配置
    let config = Config::from_env();

    // 初始化日志
    logger::init(config.verbose_logging);

    // 初始化并运行应用
    let result = match App::initialize(config) {
        Ok(app) => app.run().await,
        Err(e) => Err(e),
    };

    match result {
        Ok(report) if report.is_empty() => {}
        Ok(_) => std::process::exit(1),
        Err(e) => {
            error!("❌ {:#}", e);
            std::process::exit(2);
        }
    }
}
