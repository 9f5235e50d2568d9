use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Instant;

use tower::Service;
use tracing::info;

use crate::browser::ChromeDriver;
use crate::checker::{CheckOutcome, SlotChecker};
use crate::config::CheckerConfig;
use crate::error::CheckerError;
use crate::window::CutoffWindow;

/// チェックリクエスト
#[derive(Debug, Clone)]
pub struct CheckRequest {
    pub config: CheckerConfig,
    /// リクエスト作成時点で一度だけ計算する
    pub window: CutoffWindow,
}

impl CheckRequest {
    pub fn new(config: CheckerConfig) -> Self {
        let window = CutoffWindow::from_now(config.window_days);
        Self { config, window }
    }
}

impl From<CheckerConfig> for CheckRequest {
    fn from(config: CheckerConfig) -> Self {
        Self::new(config)
    }
}

/// tower::Serviceを実装したチェックサービス
#[derive(Debug, Clone, Default)]
pub struct CheckService {}

impl CheckService {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Service<CheckRequest> for CheckService {
    type Response = CheckOutcome;
    type Error = CheckerError;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: CheckRequest) -> Self::Future {
        info!(
            "チェックリクエスト受信: centres={}, days={}",
            req.config.centers.len(),
            req.window.days
        );

        Box::pin(async move {
            let run_timeout = req.config.run_timeout;
            let started = Instant::now();

            // 起動時間も全体の制限に含める
            let driver = tokio::time::timeout(run_timeout, ChromeDriver::launch(&req.config))
                .await
                .map_err(|_| {
                    CheckerError::Timeout(format!(
                        "ブラウザ起動が{:?}以内に完了しませんでした",
                        run_timeout
                    ))
                })??;

            let remaining = run_timeout.saturating_sub(started.elapsed());
            let mut checker = SlotChecker::new(driver, req.config);
            let outcome = checker.run_within(&req.window, remaining).await?;

            info!("チェック完了: {}件の空き枠", outcome.slots().len());
            Ok(outcome)
        })
    }
}
