use std::process::ExitCode;

use slot_scraper::{CheckRequest, CheckService, CheckerConfig, Reporter};
use tower::Service;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    // ログ設定
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,chromiumoxide=warn")),
        )
        .init();

    // 必須項目がなければブラウザを起動せずに終了
    let config = match CheckerConfig::load() {
        Ok(config) => config,
        Err(e) => {
            error!("Configuration error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let reporter = match Reporter::from_config(&config) {
        Ok(reporter) => reporter,
        Err(e) => {
            error!("Failed to build notifier: {}", e);
            return ExitCode::FAILURE;
        }
    };

    info!(
        "Run mode: {}",
        if config.automated { "automated" } else { "manual" }
    );

    let mut service = CheckService::new();
    let outcome = match service.call(CheckRequest::new(config)).await {
        Ok(outcome) => outcome,
        Err(e) => {
            error!("Check failed: {}", e);
            return ExitCode::FAILURE;
        }
    };

    // 通知の成否は終了コードに影響しない
    reporter.report(&outcome.slots()).await;

    ExitCode::SUCCESS
}
