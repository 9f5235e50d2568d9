use std::time::Duration;

use tracing::{debug, info, warn};

use crate::config::CheckerConfig;
use crate::error::CheckerError;
use crate::flow::{run_flow, StepReport};
use crate::probe::{collect_slots, probe_centers, CenterProbe, Slot};
use crate::traits::PageDriver;
use crate::window::CutoffWindow;

/// 1回の実行結果
#[derive(Debug, Clone)]
pub struct CheckOutcome {
    pub steps: Vec<StepReport>,
    pub probes: Vec<CenterProbe>,
}

impl CheckOutcome {
    /// 見つかった空き枠（センターの確認順）
    pub fn slots(&self) -> Vec<Slot> {
        collect_slots(&self.probes)
    }
}

/// フォーム遷移 → センター確認 → 終了 をひとつのブラウザセッションで行う
pub struct SlotChecker<D: PageDriver> {
    driver: D,
    config: CheckerConfig,
}

impl<D: PageDriver> SlotChecker<D> {
    pub fn new(driver: D, config: CheckerConfig) -> Self {
        Self { driver, config }
    }

    pub async fn navigate(&self) -> Result<Vec<StepReport>, CheckerError> {
        run_flow(&self.driver, &self.config).await
    }

    pub async fn probe(&self, window: &CutoffWindow) -> Vec<CenterProbe> {
        probe_centers(&self.driver, &self.config, window).await
    }

    /// 一括実行。遷移に失敗した場合もブラウザは閉じてからエラーを返す
    pub async fn run(&mut self, window: &CutoffWindow) -> Result<CheckOutcome, CheckerError> {
        info!(
            "Checking {} centres for slots up to {}",
            self.config.centers.len(),
            window.cutoff.format("%Y-%m-%d %H:%M")
        );

        let steps = match self.navigate().await {
            Ok(steps) => steps,
            Err(e) => {
                self.close_quietly().await;
                return Err(e);
            }
        };

        let probes = self.probe(window).await;
        self.close_quietly().await;

        let outcome = CheckOutcome { steps, probes };
        info!("Check finished: {} slots found", outcome.slots().len());
        Ok(outcome)
    }

    /// `run` を時間制限付きで実行する。時間切れでもブラウザは閉じる
    pub async fn run_within(
        &mut self,
        window: &CutoffWindow,
        limit: Duration,
    ) -> Result<CheckOutcome, CheckerError> {
        match tokio::time::timeout(limit, self.run(window)).await {
            Ok(result) => result,
            Err(_) => {
                warn!("Run exceeded {:?}, abandoning", limit);
                self.close_quietly().await;
                Err(CheckerError::Timeout(format!(
                    "実行が{:?}以内に完了しませんでした",
                    limit
                )))
            }
        }
    }

    async fn close_quietly(&mut self) {
        if let Err(e) = self.driver.close().await {
            debug!("Failed to close driver: {}", e);
        }
    }
}
