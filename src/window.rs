//! 空き日付の期間判定
//!
//! サイトの日時文字列（`DD/MM/YYYY HH:MM:SS`）から日付を取り出し、
//! 「現在 + N日」以内かどうかを判定する。

use std::sync::LazyLock;

use chrono::{Duration, Local, NaiveDate, NaiveDateTime, NaiveTime};
use regex::Regex;

/// 日付部分のみを見る。時刻部分は無視
static DATE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*(\d{2})/(\d{2})/(\d{4})(?:\s|$)").expect("valid regex"));

/// `DD/MM/YYYY[ ...]` を日付に変換する
///
/// 形式が違う場合や存在しない日付（31/02 など）は `None`。
pub fn parse_offered_date(raw: &str) -> Option<NaiveDate> {
    let caps = DATE_RE.captures(raw)?;
    let day: u32 = caps[1].parse().ok()?;
    let month: u32 = caps[2].parse().ok()?;
    let year: i32 = caps[3].parse().ok()?;

    // chronoの月は1始まりなので、サイトの表記をそのまま渡す
    NaiveDate::from_ymd_opt(year, month, day)
}

/// 表示用の日付（例: `Thu 07 May 2026`）
pub fn display_date(date: NaiveDate) -> String {
    date.format("%a %d %b %Y").to_string()
}

/// 今回の実行で使う判定期間
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CutoffWindow {
    pub now: NaiveDateTime,
    pub cutoff: NaiveDateTime,
    pub days: u32,
}

impl CutoffWindow {
    /// 期限が表現できる範囲を超える場合は最大値に丸める
    pub fn starting_at(now: NaiveDateTime, days: u32) -> Self {
        let cutoff = now
            .checked_add_signed(Duration::days(i64::from(days)))
            .unwrap_or(NaiveDateTime::MAX);
        Self { now, cutoff, days }
    }

    pub fn from_now(days: u32) -> Self {
        Self::starting_at(Local::now().naive_local(), days)
    }

    /// 日付（0時0分）が期限以下なら対象。過去の日付も対象になる
    pub fn qualifies(&self, date: NaiveDate) -> bool {
        date.and_time(NaiveTime::MIN) <= self.cutoff
    }

    /// 今日から何日後か（診断ログ用）
    pub fn days_until(&self, date: NaiveDate) -> i64 {
        (date - self.now.date()).num_days()
    }
}
