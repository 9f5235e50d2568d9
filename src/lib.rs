//! NCT予約サイト 空き枠チェッカー
//!
//! - 車両登録番号と予約番号で予約変更フォームを進める
//! - 対象センターごとに最も早い空き日付を読み取る
//! - 「現在 + N日」以内の枠を標準出力とWebhookに通知
//!
//! # 使用例
//!
//! ```rust,ignore
//! use slot_scraper::{CheckRequest, CheckService, CheckerConfig, Reporter};
//! use tower::Service;
//!
//! #[tokio::main]
//! async fn main() {
//!     let config = CheckerConfig::load().unwrap();
//!     let reporter = Reporter::from_config(&config).unwrap();
//!
//!     let mut service = CheckService::new();
//!     let outcome = service.call(CheckRequest::new(config)).await.unwrap();
//!
//!     reporter.report(&outcome.slots()).await;
//! }
//! ```

pub mod browser;
pub mod checker;
pub mod config;
pub mod error;
pub mod flow;
pub mod probe;
pub mod report;
pub mod service;
pub mod site;
pub mod traits;
pub mod window;

// 主要な型をリエクスポート
pub use browser::ChromeDriver;
pub use checker::{CheckOutcome, SlotChecker};
pub use config::CheckerConfig;
pub use error::CheckerError;
pub use flow::{FlowStep, StepOutcome, StepReport};
pub use probe::{CenterProbe, NoSlotReason, ProbeOutcome, Slot};
pub use report::{NotificationStatus, Reporter, SkipReason, WebhookNotifier};
pub use service::{CheckRequest, CheckService};
pub use traits::PageDriver;
pub use window::CutoffWindow;
