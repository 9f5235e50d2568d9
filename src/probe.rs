//! センターごとの空き確認

use std::fmt;

use chrono::NaiveDate;
use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::config::CheckerConfig;
use crate::error::CheckerError;
use crate::flow::reveal_centers;
use crate::site;
use crate::traits::PageDriver;
use crate::window::{display_date, parse_offered_date, CutoffWindow};

/// 期間内に見つかった空き枠
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Slot {
    pub center: String,
    pub date: NaiveDate,
}

impl Slot {
    pub fn display_date(&self) -> String {
        display_date(self.date)
    }
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.center, self.display_date())
    }
}

/// 空き枠なしの理由
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NoSlotReason {
    /// 日付候補がひとつもない
    NoDates,
    /// 日時文字列が `DD/MM/YYYY` 形式でない
    Unparseable(String),
    /// 最も早い日付が期間外
    OutsideWindow { date: NaiveDate, days_until: i64 },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeOutcome {
    Slot(Slot),
    NoSlot(NoSlotReason),
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CenterProbe {
    pub center: String,
    pub outcome: ProbeOutcome,
}

impl CenterProbe {
    pub fn slot(&self) -> Option<&Slot> {
        match &self.outcome {
            ProbeOutcome::Slot(slot) => Some(slot),
            _ => None,
        }
    }
}

/// 確認結果から空き枠だけを取り出す（センターの確認順のまま）
pub fn collect_slots(probes: &[CenterProbe]) -> Vec<Slot> {
    probes.iter().filter_map(|p| p.slot().cloned()).collect()
}

/// 最も早い日時文字列を期間判定する
pub fn evaluate(center: &str, raw: &str, window: &CutoffWindow) -> ProbeOutcome {
    let Some(date) = parse_offered_date(raw) else {
        warn!("{}: unusable date value {:?}", center, raw);
        return ProbeOutcome::NoSlot(NoSlotReason::Unparseable(raw.to_string()));
    };

    if window.qualifies(date) {
        ProbeOutcome::Slot(Slot {
            center: center.to_string(),
            date,
        })
    } else {
        let days_until = window.days_until(date);
        info!(
            "{}: earliest date {} is {} days away, outside the {}-day window",
            center,
            display_date(date),
            days_until,
            window.days
        );
        ProbeOutcome::NoSlot(NoSlotReason::OutsideWindow { date, days_until })
    }
}

/// センターを選択して最初の日付候補を読む
async fn read_earliest<D: PageDriver + ?Sized>(
    driver: &D,
    center: &str,
    config: &CheckerConfig,
    window: &CutoffWindow,
) -> Result<ProbeOutcome, CheckerError> {
    driver.select_by_label(site::CENTER_SELECT, center).await?;
    driver.wait_for_network_idle().await?;

    // ネットワークアイドル後の描画を待つ
    sleep(config.settle_delay).await;

    let values = driver
        .attribute_values(site::DATE_OPTIONS, site::DATE_ATTRIBUTE)
        .await?;
    debug!("{}: {} date options", center, values.len());

    // サイトは昇順で返す前提。並べ替えはしない
    let Some(first) = values.into_iter().next() else {
        return Ok(ProbeOutcome::NoSlot(NoSlotReason::NoDates));
    };

    let raw = first.ok_or_else(|| {
        CheckerError::ElementNotFound(format!(
            "{} attribute on first date option",
            site::DATE_ATTRIBUTE
        ))
    })?;

    Ok(evaluate(center, &raw, window))
}

/// 1センター分の確認。エラーは結果に変換し、呼び出し側へは返さない
pub async fn probe_center<D: PageDriver + ?Sized>(
    driver: &D,
    center: &str,
    config: &CheckerConfig,
    window: &CutoffWindow,
) -> CenterProbe {
    info!("Checking centre: {}", center);

    let outcome = match read_earliest(driver, center, config, window).await {
        Ok(outcome) => outcome,
        Err(e) => {
            warn!("{}: probe failed: {}", center, e);
            ProbeOutcome::Failed(e.to_string())
        }
    };

    // 結果に関係なく次のセンターのために一覧表示へ戻す
    if let Err(e) = reveal_centers(driver, config.step_timeout).await {
        warn!("{}: could not return to centre list: {}", center, e);
    }

    if let ProbeOutcome::Slot(slot) = &outcome {
        info!("Slot found: {}", slot);
    }

    CenterProbe {
        center: center.to_string(),
        outcome,
    }
}

/// 設定されたセンターを順番に確認する
pub async fn probe_centers<D: PageDriver + ?Sized>(
    driver: &D,
    config: &CheckerConfig,
    window: &CutoffWindow,
) -> Vec<CenterProbe> {
    let mut probes = Vec::with_capacity(config.centers.len());
    for center in &config.centers {
        probes.push(probe_center(driver, center, config, window).await);
    }
    probes
}
