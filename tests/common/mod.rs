#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use slot_scraper::{site, CheckerConfig, CheckerError, CutoffWindow, PageDriver};

#[derive(Default)]
struct State {
    calls: Vec<String>,
    consent_shown: bool,
    failing_selectors: HashSet<String>,
    failing_centers: HashSet<String>,
    dates: HashMap<String, Vec<Option<String>>>,
    selected: Option<String>,
    idle_hangs: bool,
    closed: bool,
}

/// 呼び出しを記録するだけのドライバ
#[derive(Clone, Default)]
pub struct FakeDriver {
    state: Arc<Mutex<State>>,
}

impl FakeDriver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_consent(self) -> Self {
        self.state.lock().unwrap().consent_shown = true;
        self
    }

    pub fn with_dates(self, center: &str, dates: &[&str]) -> Self {
        self.state.lock().unwrap().dates.insert(
            center.to_string(),
            dates.iter().map(|d| Some(d.to_string())).collect(),
        );
        self
    }

    pub fn with_missing_attribute(self, center: &str) -> Self {
        self.state
            .lock()
            .unwrap()
            .dates
            .insert(center.to_string(), vec![None]);
        self
    }

    pub fn failing_on(self, selector: &str) -> Self {
        self.state
            .lock()
            .unwrap()
            .failing_selectors
            .insert(selector.to_string());
        self
    }

    /// ネットワークアイドル待ちが返らないページ
    pub fn hanging_on_idle(self) -> Self {
        self.state.lock().unwrap().idle_hangs = true;
        self
    }

    pub fn failing_center(self, center: &str) -> Self {
        self.state
            .lock()
            .unwrap()
            .failing_centers
            .insert(center.to_string());
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn count(&self, call: &str) -> usize {
        self.calls().iter().filter(|c| c.as_str() == call).count()
    }

    pub fn is_closed(&self) -> bool {
        self.state.lock().unwrap().closed
    }

    fn record(&self, call: String) {
        self.state.lock().unwrap().calls.push(call);
    }

    fn guard(&self, selector: &str) -> Result<(), CheckerError> {
        if self
            .state
            .lock()
            .unwrap()
            .failing_selectors
            .contains(selector)
        {
            Err(CheckerError::ElementNotFound(selector.to_string()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl PageDriver for FakeDriver {
    async fn goto(&self, url: &str) -> Result<(), CheckerError> {
        self.record(format!("goto {}", url));
        Ok(())
    }

    async fn wait_for_network_idle(&self) -> Result<(), CheckerError> {
        self.record("idle".to_string());
        let hangs = self.state.lock().unwrap().idle_hangs;
        if hangs {
            std::future::pending::<()>().await;
        }
        Ok(())
    }

    async fn wait_for_visible(
        &self,
        selector: &str,
        _timeout: Duration,
    ) -> Result<(), CheckerError> {
        self.record(format!("visible {}", selector));
        if selector == site::CONSENT_BUTTON && !self.state.lock().unwrap().consent_shown {
            return Err(CheckerError::Timeout(selector.to_string()));
        }
        self.guard(selector)
    }

    async fn click(&self, selector: &str) -> Result<(), CheckerError> {
        self.record(format!("click {}", selector));
        self.guard(selector)
    }

    async fn fill(&self, selector: &str, value: &str) -> Result<(), CheckerError> {
        self.record(format!("fill {}={}", selector, value));
        self.guard(selector)
    }

    async fn check(&self, selector: &str) -> Result<(), CheckerError> {
        self.record(format!("check {}", selector));
        self.guard(selector)
    }

    async fn select_by_label(&self, selector: &str, label: &str) -> Result<(), CheckerError> {
        self.record(format!("select {}", label));
        self.guard(selector)?;

        let mut state = self.state.lock().unwrap();
        if state.failing_centers.contains(label) {
            state.selected = None;
            return Err(CheckerError::Timeout(format!("centre {} did not load", label)));
        }
        state.selected = Some(label.to_string());
        Ok(())
    }

    async fn attribute_values(
        &self,
        selector: &str,
        attribute: &str,
    ) -> Result<Vec<Option<String>>, CheckerError> {
        self.record(format!("attrs {} {}", selector, attribute));
        let state = self.state.lock().unwrap();
        Ok(state
            .selected
            .as_ref()
            .and_then(|center| state.dates.get(center))
            .cloned()
            .unwrap_or_default())
    }

    async fn close(&mut self) -> Result<(), CheckerError> {
        self.record("close".to_string());
        self.state.lock().unwrap().closed = true;
        Ok(())
    }
}

pub fn test_config() -> CheckerConfig {
    CheckerConfig::new("191-D-12345", "B0012345")
        .with_start_url("https://booking.test/start")
        .with_settle_delay(Duration::ZERO)
        .with_step_timeout(Duration::from_millis(10))
}

/// 2026-10-17 12:00 から14日間
pub fn test_window() -> CutoffWindow {
    let now = NaiveDate::from_ymd_opt(2026, 10, 17)
        .unwrap()
        .and_hms_opt(12, 0, 0)
        .unwrap();
    CutoffWindow::starting_at(now, 14)
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}
