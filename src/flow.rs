//! 予約変更フォームの遷移
//!
//! サイト側は前の手順が終わるまで次のコントロールを有効にしないため、
//! 手順は順番固定で、飛ばすこともできない（同意ダイアログのみ任意）。

use std::fmt;
use std::time::Duration;

use tracing::{debug, error, info, warn};

use crate::config::CheckerConfig;
use crate::error::CheckerError;
use crate::site;
use crate::traits::PageDriver;

/// Cookie同意ダイアログを待つ時間
const CONSENT_WAIT: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FlowStep {
    LoadStartPage,
    DismissConsent,
    SubmitVehicle,
    Acknowledge,
    ConfirmVehicle,
    ManageBooking,
    SubmitBookingId,
    ConfirmBooking,
    RevealCenters,
}

impl FlowStep {
    /// 実行順
    pub const ALL: [FlowStep; 9] = [
        FlowStep::LoadStartPage,
        FlowStep::DismissConsent,
        FlowStep::SubmitVehicle,
        FlowStep::Acknowledge,
        FlowStep::ConfirmVehicle,
        FlowStep::ManageBooking,
        FlowStep::SubmitBookingId,
        FlowStep::ConfirmBooking,
        FlowStep::RevealCenters,
    ];

    pub fn name(self) -> &'static str {
        match self {
            FlowStep::LoadStartPage => "load start page",
            FlowStep::DismissConsent => "dismiss consent prompt",
            FlowStep::SubmitVehicle => "submit vehicle registration",
            FlowStep::Acknowledge => "tick acknowledgements",
            FlowStep::ConfirmVehicle => "confirm vehicle",
            FlowStep::ManageBooking => "manage existing booking",
            FlowStep::SubmitBookingId => "submit booking id",
            FlowStep::ConfirmBooking => "confirm booking",
            FlowStep::RevealCenters => "reveal centre list",
        }
    }

    /// 失敗しても実行を止めない手順か
    pub fn is_optional(self) -> bool {
        matches!(self, FlowStep::DismissConsent)
    }

    async fn perform<D: PageDriver + ?Sized>(
        self,
        driver: &D,
        config: &CheckerConfig,
    ) -> Result<StepOutcome, CheckerError> {
        match self {
            FlowStep::LoadStartPage => {
                driver.goto(&config.start_url).await?;
                driver.wait_for_network_idle().await?;
            }
            FlowStep::DismissConsent => return Ok(dismiss_consent(driver).await),
            FlowStep::SubmitVehicle => {
                driver
                    .fill(site::REGISTRATION_INPUT, &config.car_registration)
                    .await?;
                driver.click(site::REGISTRATION_SUBMIT).await?;
                driver.wait_for_network_idle().await?;
            }
            FlowStep::Acknowledge => {
                for checkbox in site::ACKNOWLEDGEMENT_CHECKBOXES {
                    driver.check(checkbox).await?;
                }
            }
            FlowStep::ConfirmVehicle => {
                driver.click(site::CONFIRM_VEHICLE).await?;
                driver.wait_for_network_idle().await?;
            }
            FlowStep::ManageBooking => {
                driver.click(site::MANAGE_BOOKING).await?;
                driver.wait_for_network_idle().await?;
            }
            FlowStep::SubmitBookingId => {
                driver.fill(site::BOOKING_ID_INPUT, &config.booking_id).await?;
                driver.click(site::BOOKING_ID_SUBMIT).await?;
                driver.wait_for_network_idle().await?;
            }
            FlowStep::ConfirmBooking => {
                driver.click(site::CONFIRM_BOOKING).await?;
                driver.wait_for_network_idle().await?;
            }
            FlowStep::RevealCenters => {
                reveal_centers(driver, config.step_timeout).await?;
            }
        }
        Ok(StepOutcome::Completed)
    }
}

impl fmt::Display for FlowStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepOutcome {
    Completed,
    /// 任意手順を実行しなかった（理由付き）
    Skipped(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepReport {
    pub step: FlowStep,
    pub outcome: StepOutcome,
}

/// 同意ダイアログがあれば閉じる。なくてもエラーにしない
async fn dismiss_consent<D: PageDriver + ?Sized>(driver: &D) -> StepOutcome {
    if let Err(e) = driver
        .wait_for_visible(site::CONSENT_BUTTON, CONSENT_WAIT)
        .await
    {
        debug!("consent prompt not shown: {}", e);
        return StepOutcome::Skipped("consent prompt not shown".to_string());
    }

    match driver.click(site::CONSENT_BUTTON).await {
        Ok(()) => StepOutcome::Completed,
        Err(e) => {
            debug!("consent prompt could not be dismissed: {}", e);
            StepOutcome::Skipped(format!("consent click failed: {}", e))
        }
    }
}

/// センター一覧を拡張表示し、選択欄が表示されるまで待つ
///
/// 各センターの確認後にも同じ状態へ戻すために使う。
pub async fn reveal_centers<D: PageDriver + ?Sized>(
    driver: &D,
    timeout: Duration,
) -> Result<(), CheckerError> {
    driver.click(site::SHOW_MORE_CENTERS).await?;
    driver.wait_for_visible(site::CENTER_SELECT, timeout).await
}

/// 全手順を順番に実行する
///
/// 最初に失敗した手順で中断し、`CheckerError::Step` として返す。
pub async fn run_flow<D: PageDriver + ?Sized>(
    driver: &D,
    config: &CheckerConfig,
) -> Result<Vec<StepReport>, CheckerError> {
    let mut reports = Vec::with_capacity(FlowStep::ALL.len());

    for (index, step) in FlowStep::ALL.into_iter().enumerate() {
        info!("[{}/{}] {}", index + 1, FlowStep::ALL.len(), step);

        match step.perform(driver, config).await {
            Ok(outcome) => {
                if let StepOutcome::Skipped(reason) = &outcome {
                    info!("step '{}' skipped: {}", step, reason);
                }
                reports.push(StepReport { step, outcome });
            }
            Err(e) => {
                error!("step '{}' failed: {}", step, e);

                // デバッグスクリーンショット
                if config.debug {
                    match driver.screenshot_base64().await {
                        Some(encoded) => {
                            debug!("Failure screenshot: data:image/png;base64,{}", encoded)
                        }
                        None => warn!("failure screenshot unavailable"),
                    }
                }

                return Err(CheckerError::Step {
                    step,
                    source: Box::new(e),
                });
            }
        }
    }

    info!("Booking form completed, centre selection is available");
    Ok(reports)
}
