//! chromiumoxide による [`PageDriver`] 実装

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use base64::Engine;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::page::ScreenshotParams;
use chromiumoxide::Page;
use futures::StreamExt;
use serde::de::DeserializeOwned;
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::config::CheckerConfig;
use crate::error::CheckerError;
use crate::traits::PageDriver;

/// ネットワークアイドル待機のタイムアウト（ミリ秒）
const NETWORK_IDLE_TIMEOUT_MS: u64 = 30000;
/// ネットワークアイドル判定のインターバル（ミリ秒）
const NETWORK_IDLE_CHECK_INTERVAL_MS: u64 = 500;
/// 連続でアイドルと判定された回数がこれに達したら完了
const REQUIRED_IDLE_CHECKS: u32 = 3;
/// 表示待ちのポーリング間隔（ミリ秒）
const VISIBLE_POLL_INTERVAL_MS: u64 = 250;

/// JSに埋め込む文字列リテラル
fn js_string(value: &str) -> String {
    serde_json::Value::from(value).to_string()
}

/// 起動ごとに作るプロファイルディレクトリを削除する
async fn remove_profile_dir(path: &Path) {
    match tokio::fs::remove_dir_all(path).await {
        Ok(()) => debug!("Removed profile directory {}", path.display()),
        Err(e) => debug!(
            "Failed to remove profile directory {}: {}",
            path.display(),
            e
        ),
    }
}

pub struct ChromeDriver {
    browser: Browser,
    page: Page,
    handler: JoinHandle<()>,
    user_data_dir: PathBuf,
}

impl ChromeDriver {
    /// ブラウザを起動して空のページを開く
    pub async fn launch(config: &CheckerConfig) -> Result<Self, CheckerError> {
        info!("Launching browser (headless={})...", config.headless);

        // ユニークなユーザーデータディレクトリを生成
        let unique_id = format!(
            "{}-{}",
            std::process::id(),
            std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .unwrap_or_default()
                .as_nanos()
        );
        let user_data_dir = std::env::temp_dir().join(format!("slot-scraper-{}", unique_id));

        let mut builder = BrowserConfig::builder()
            .user_data_dir(&user_data_dir)
            .window_size(1280, 900);

        if let Some(path) = &config.chrome_path {
            builder = builder.chrome_executable(path);
        }

        if !config.headless {
            builder = builder.with_head();
        }

        builder = builder
            .no_sandbox()
            .request_timeout(Duration::from_secs(60))
            .arg("--disable-blink-features=AutomationControlled")
            .arg("--disable-dev-shm-usage")
            .arg("--disable-gpu");

        if config.debug {
            builder = builder.arg("--enable-logging=stderr").arg("--v=1");
        }

        let browser_config = builder
            .build()
            .map_err(|e| CheckerError::BrowserInit(format!("ブラウザ設定エラー: {}", e)))?;

        let (mut browser, mut handler) = match Browser::launch(browser_config).await {
            Ok(launched) => launched,
            Err(e) => {
                remove_profile_dir(&user_data_dir).await;
                return Err(CheckerError::BrowserInit(e.to_string()));
            }
        };

        // ブラウザイベントハンドラをバックグラウンドで実行
        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    debug!("Browser event error: {:?}", e);
                }
            }
        });

        let page = match browser.new_page("about:blank").await {
            Ok(page) => page,
            Err(e) => {
                if let Err(close_err) = browser.close().await {
                    debug!("Failed to close browser: {}", close_err);
                }
                handler.abort();
                remove_profile_dir(&user_data_dir).await;
                return Err(CheckerError::BrowserInit(e.to_string()));
            }
        };

        info!("Browser ready");
        Ok(Self {
            browser,
            page,
            handler,
            user_data_dir,
        })
    }

    async fn eval<T: DeserializeOwned>(&self, script: &str) -> Result<T, CheckerError> {
        self.page
            .evaluate(script)
            .await
            .map_err(|e| CheckerError::JavaScript(e.to_string()))?
            .into_value::<T>()
            .map_err(|e| CheckerError::JavaScript(e.to_string()))
    }

    async fn is_visible(&self, selector: &str) -> Result<bool, CheckerError> {
        let script = format!(
            r#"
            (() => {{
                const el = document.querySelector({});
                if (!el) return false;
                const style = window.getComputedStyle(el);
                const rect = el.getBoundingClientRect();
                return style.display !== 'none' &&
                       style.visibility !== 'hidden' &&
                       (rect.width > 0 || rect.height > 0);
            }})()
            "#,
            js_string(selector)
        );
        self.eval(&script).await
    }
}

#[async_trait]
impl PageDriver for ChromeDriver {
    async fn goto(&self, url: &str) -> Result<(), CheckerError> {
        debug!("goto {}", url);
        self.page
            .goto(url)
            .await
            .map_err(|e| CheckerError::Navigation(e.to_string()))?;
        self.page
            .wait_for_navigation()
            .await
            .map_err(|e| CheckerError::Navigation(e.to_string()))?;
        Ok(())
    }

    /// Performance API でアクティブなリクエストを監視し、連続でアイドルなら完了
    async fn wait_for_network_idle(&self) -> Result<(), CheckerError> {
        let start = Instant::now();
        let timeout = Duration::from_millis(NETWORK_IDLE_TIMEOUT_MS);
        let mut idle_count = 0;

        while start.elapsed() < timeout {
            let result = self
                .eval::<bool>(
                    r#"
                    (() => {
                        if (document.readyState !== 'complete') return false;
                        const entries = performance.getEntriesByType('resource');
                        const now = performance.now();

                        // 直近500ms以内に開始されて未完了のリクエスト
                        const recentRequests = entries.filter(e => {
                            return (now - e.startTime) < 500 && e.duration === 0;
                        });
                        return recentRequests.length === 0;
                    })()
                    "#,
                )
                .await;

            match result {
                Ok(true) => {
                    idle_count += 1;
                    if idle_count >= REQUIRED_IDLE_CHECKS {
                        debug!("Network idle after {:?}", start.elapsed());
                        return Ok(());
                    }
                }
                Ok(false) => idle_count = 0,
                Err(e) => {
                    // 遷移中は評価に失敗することがある
                    debug!("Network idle check error: {}", e);
                    idle_count = 0;
                }
            }

            sleep(Duration::from_millis(NETWORK_IDLE_CHECK_INTERVAL_MS)).await;
        }

        warn!(
            "Network idle timeout after {:?}, proceeding anyway",
            start.elapsed()
        );
        Ok(())
    }

    async fn wait_for_visible(
        &self,
        selector: &str,
        timeout: Duration,
    ) -> Result<(), CheckerError> {
        let start = Instant::now();

        loop {
            match self.is_visible(selector).await {
                Ok(true) => return Ok(()),
                Ok(false) => {}
                Err(e) => debug!("visibility check error for {}: {}", selector, e),
            }

            if start.elapsed() >= timeout {
                return Err(CheckerError::Timeout(format!(
                    "{} が{:?}以内に表示されませんでした",
                    selector, timeout
                )));
            }

            sleep(Duration::from_millis(VISIBLE_POLL_INTERVAL_MS)).await;
        }
    }

    async fn click(&self, selector: &str) -> Result<(), CheckerError> {
        debug!("click {}", selector);
        self.page
            .find_element(selector)
            .await
            .map_err(|e| CheckerError::ElementNotFound(format!("{}: {}", selector, e)))?
            .click()
            .await
            .map_err(|e| CheckerError::Navigation(format!("{} クリック: {}", selector, e)))?;
        Ok(())
    }

    async fn fill(&self, selector: &str, value: &str) -> Result<(), CheckerError> {
        debug!("fill {}", selector);

        // 既存の値をクリア
        let script = format!(
            r#"
            (() => {{
                const el = document.querySelector({});
                if (!el) return false;
                el.value = '';
                return true;
            }})()
            "#,
            js_string(selector)
        );
        if !self.eval::<bool>(&script).await? {
            return Err(CheckerError::ElementNotFound(selector.to_string()));
        }

        self.page
            .find_element(selector)
            .await
            .map_err(|e| CheckerError::ElementNotFound(format!("{}: {}", selector, e)))?
            .click()
            .await
            .map_err(|e| CheckerError::Navigation(format!("{} クリック: {}", selector, e)))?
            .type_str(value)
            .await
            .map_err(|e| CheckerError::JavaScript(format!("{} 入力: {}", selector, e)))?;
        Ok(())
    }

    async fn check(&self, selector: &str) -> Result<(), CheckerError> {
        debug!("check {}", selector);
        let script = format!(
            r#"
            (() => {{
                const el = document.querySelector({});
                if (!el) return false;
                if (!el.checked) el.click();
                return el.checked === true;
            }})()
            "#,
            js_string(selector)
        );

        if self.eval::<bool>(&script).await? {
            Ok(())
        } else {
            Err(CheckerError::ElementNotFound(format!(
                "{} (チェックできません)",
                selector
            )))
        }
    }

    async fn select_by_label(&self, selector: &str, label: &str) -> Result<(), CheckerError> {
        debug!("select {:?} in {}", label, selector);
        let script = format!(
            r#"
            (() => {{
                const select = document.querySelector({});
                if (!select) return false;
                const label = {};
                const option = Array.from(select.options).find(o => o.text.trim() === label);
                if (!option) return false;
                select.value = option.value;
                select.dispatchEvent(new Event('input', {{ bubbles: true }}));
                select.dispatchEvent(new Event('change', {{ bubbles: true }}));
                return true;
            }})()
            "#,
            js_string(selector),
            js_string(label)
        );

        if self.eval::<bool>(&script).await? {
            Ok(())
        } else {
            Err(CheckerError::ElementNotFound(format!(
                "{} の選択肢 '{}'",
                selector, label
            )))
        }
    }

    async fn attribute_values(
        &self,
        selector: &str,
        attribute: &str,
    ) -> Result<Vec<Option<String>>, CheckerError> {
        let script = format!(
            "Array.from(document.querySelectorAll({})).map(el => el.getAttribute({}))",
            js_string(selector),
            js_string(attribute)
        );
        self.eval(&script).await
    }

    async fn screenshot_base64(&self) -> Option<String> {
        match self
            .page
            .screenshot(ScreenshotParams::builder().full_page(true).build())
            .await
        {
            Ok(png) => Some(base64::engine::general_purpose::STANDARD.encode(png)),
            Err(e) => {
                debug!("Failed to capture screenshot: {}", e);
                None
            }
        }
    }

    async fn close(&mut self) -> Result<(), CheckerError> {
        info!("Closing browser...");
        if let Err(e) = self.browser.close().await {
            debug!("Failed to close browser: {}", e);
        }
        if let Err(e) = self.browser.wait().await {
            debug!("Failed to wait for browser exit: {}", e);
        }
        self.handler.abort();
        remove_profile_dir(&self.user_data_dir).await;
        Ok(())
    }
}
