use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use tracing::debug;

use crate::error::CheckerError;
use crate::site;

/// 読み込む.envファイル（優先度の高い順）
pub const DEFAULT_ENV_FILES: [&str; 2] = [".env.local", ".env"];

/// `WINDOW_DAYS` の上限（約10年）
pub const MAX_WINDOW_DAYS: u32 = 3650;

#[derive(Debug, Clone)]
pub struct CheckerConfig {
    pub car_registration: String,
    pub booking_id: String,
    pub webhook_url: Option<String>,
    /// 定期実行（CI）かどうか。falseのときは通知しない
    pub automated: bool,
    pub headless: bool,
    pub chrome_path: Option<PathBuf>,
    pub window_days: u32,
    /// センター選択後、ネットワークアイドルの後に追加で待つ時間
    pub settle_delay: Duration,
    /// 要素の表示待ちの上限
    pub step_timeout: Duration,
    /// 1回の実行全体の上限
    pub run_timeout: Duration,
    pub debug: bool,
    pub start_url: String,
    pub centers: Vec<String>,
}

impl Default for CheckerConfig {
    fn default() -> Self {
        Self {
            car_registration: String::new(),
            booking_id: String::new(),
            webhook_url: None,
            automated: false,
            headless: true,
            chrome_path: None,
            window_days: 14,
            settle_delay: Duration::from_millis(2000),
            step_timeout: Duration::from_secs(30),
            run_timeout: Duration::from_secs(300),
            debug: false,
            start_url: site::START_URL.to_string(),
            centers: site::CENTERS.iter().map(|c| c.to_string()).collect(),
        }
    }
}

impl CheckerConfig {
    pub fn new(car_registration: impl Into<String>, booking_id: impl Into<String>) -> Self {
        Self {
            car_registration: car_registration.into(),
            booking_id: booking_id.into(),
            ..Default::default()
        }
    }

    pub fn with_webhook_url(mut self, url: impl Into<String>) -> Self {
        self.webhook_url = Some(url.into());
        self
    }

    pub fn with_automated(mut self, automated: bool) -> Self {
        self.automated = automated;
        self
    }

    pub fn with_headless(mut self, headless: bool) -> Self {
        self.headless = headless;
        self
    }

    pub fn with_window_days(mut self, days: u32) -> Self {
        self.window_days = days;
        self
    }

    pub fn with_settle_delay(mut self, delay: Duration) -> Self {
        self.settle_delay = delay;
        self
    }

    pub fn with_step_timeout(mut self, timeout: Duration) -> Self {
        self.step_timeout = timeout;
        self
    }

    pub fn with_run_timeout(mut self, timeout: Duration) -> Self {
        self.run_timeout = timeout;
        self
    }

    pub fn with_start_url(mut self, url: impl Into<String>) -> Self {
        self.start_url = url.into();
        self
    }

    pub fn with_centers<I, S>(mut self, centers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.centers = centers.into_iter().map(Into::into).collect();
        self
    }

    /// プロセス環境変数と `.env.local` / `.env` から設定を読み込む
    ///
    /// プロセスの環境変数は書き換えない。
    pub fn load() -> Result<Self, CheckerError> {
        let files = EnvFiles::load(&DEFAULT_ENV_FILES)?;
        Self::from_lookup(|key| files.resolve(key, std::env::var(key).ok()))
    }

    /// 任意のルックアップ関数から設定を組み立てる
    pub fn from_lookup<F>(lookup: F) -> Result<Self, CheckerError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |var: &str| -> Option<String> {
            lookup(var)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let require = |var: &str| -> Result<String, CheckerError> {
            non_empty(var).ok_or_else(|| CheckerError::MissingEnvVar(var.to_string()))
        };

        let parse_u64 = |var: &str, default: u64| -> Result<u64, CheckerError> {
            match non_empty(var) {
                Some(raw) => raw.parse::<u64>().map_err(|e| CheckerError::InvalidEnvVar {
                    var: var.to_string(),
                    reason: e.to_string(),
                }),
                None => Ok(default),
            }
        };

        let parse_flag = |var: &str, default: bool| -> Result<bool, CheckerError> {
            match non_empty(var) {
                Some(raw) => parse_bool(&raw).ok_or_else(|| CheckerError::InvalidEnvVar {
                    var: var.to_string(),
                    reason: format!("真偽値として解釈できません: {}", raw),
                }),
                None => Ok(default),
            }
        };

        let defaults = Self::default();

        let car_registration = require("CAR_REGISTRATION")?;
        let booking_id = require("BOOKING_ID")?;
        let webhook_url = non_empty("SLACK_WEBHOOK_URL");

        // CIの値が想定外でも実行は止めず、手動実行として扱う
        let automated = non_empty("GITHUB_ACTIONS")
            .and_then(|raw| parse_bool(&raw))
            .unwrap_or(false);

        let window_days = match non_empty("WINDOW_DAYS") {
            Some(raw) => raw.parse::<u32>().map_err(|e| CheckerError::InvalidEnvVar {
                var: "WINDOW_DAYS".to_string(),
                reason: e.to_string(),
            })?,
            None => defaults.window_days,
        };
        if window_days > MAX_WINDOW_DAYS {
            return Err(CheckerError::InvalidEnvVar {
                var: "WINDOW_DAYS".to_string(),
                reason: format!("{}日を超えています: {}", MAX_WINDOW_DAYS, window_days),
            });
        }

        let chrome_path = non_empty("CHROME_PATH")
            .or_else(|| non_empty("CHROMIUM_PATH"))
            .map(PathBuf::from);

        Ok(Self {
            car_registration,
            booking_id,
            webhook_url,
            automated,
            headless: parse_flag("HEADLESS", defaults.headless)?,
            chrome_path,
            window_days,
            settle_delay: Duration::from_millis(parse_u64("SETTLE_DELAY_MS", 2000)?),
            step_timeout: Duration::from_secs(parse_u64("STEP_TIMEOUT_SECS", 30)?),
            run_timeout: Duration::from_secs(parse_u64("RUN_TIMEOUT_SECS", 300)?),
            debug: parse_flag("SCRAPER_DEBUG", defaults.debug)?,
            ..defaults
        })
    }
}

/// `true`/`1`/`yes`/`on` などの真偽値表現を解釈する
pub fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// 優先度順に読み込んだ.envファイルの内容
///
/// 先に読み込んだファイルの値が優先される。プロセス環境変数は常にファイルより優先。
#[derive(Debug, Default, Clone)]
pub struct EnvFiles {
    layers: Vec<HashMap<String, String>>,
}

impl EnvFiles {
    pub fn load<P: AsRef<Path>>(paths: &[P]) -> Result<Self, CheckerError> {
        let mut layers = Vec::new();

        for path in paths {
            let path = path.as_ref();
            if !path.is_file() {
                debug!("env file not found, skipping: {}", path.display());
                continue;
            }

            let iter = dotenvy::from_path_iter(path).map_err(|e| CheckerError::EnvFile {
                path: path.display().to_string(),
                reason: e.to_string(),
            })?;

            let mut layer = HashMap::new();
            for item in iter {
                let (key, value) = item.map_err(|e| CheckerError::EnvFile {
                    path: path.display().to_string(),
                    reason: e.to_string(),
                })?;
                layer.entry(key).or_insert(value);
            }

            debug!("loaded {} entries from {}", layer.len(), path.display());
            layers.push(layer);
        }

        Ok(Self { layers })
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.layers
            .iter()
            .find_map(|layer| layer.get(key))
            .map(String::as_str)
    }

    /// プロセス側の値があればそれを、なければファイルの値を返す
    pub fn resolve(&self, key: &str, process_value: Option<String>) -> Option<String> {
        process_value.or_else(|| self.get(key).map(ToOwned::to_owned))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    fn temp_dir(name: &str) -> PathBuf {
        let unique = format!(
            "slot-scraper-{}-{}-{}",
            name,
            std::process::id(),
            std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .unwrap_or_default()
                .as_nanos()
        );
        let dir = std::env::temp_dir().join(unique);
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn test_required_fields_and_defaults() {
        let config = CheckerConfig::from_lookup(lookup_from(&[
            ("CAR_REGISTRATION", "191-D-12345"),
            ("BOOKING_ID", "B0012345"),
        ]))
        .unwrap();

        assert_eq!(config.car_registration, "191-D-12345");
        assert_eq!(config.booking_id, "B0012345");
        assert_eq!(config.webhook_url, None);
        assert!(!config.automated);
        assert!(config.headless);
        assert_eq!(config.window_days, 14);
        assert_eq!(config.centers.len(), 5);
        assert_eq!(config.start_url, site::START_URL);
    }

    #[test]
    fn test_missing_registration_is_fatal() {
        let err = CheckerConfig::from_lookup(lookup_from(&[("BOOKING_ID", "B1")])).unwrap_err();
        assert!(matches!(err, CheckerError::MissingEnvVar(ref v) if v == "CAR_REGISTRATION"));
    }

    #[test]
    fn test_blank_booking_id_counts_as_missing() {
        let err = CheckerConfig::from_lookup(lookup_from(&[
            ("CAR_REGISTRATION", "191-D-12345"),
            ("BOOKING_ID", "   "),
        ]))
        .unwrap_err();
        assert!(matches!(err, CheckerError::MissingEnvVar(ref v) if v == "BOOKING_ID"));
    }

    #[test]
    fn test_webhook_and_automation_flag() {
        let config = CheckerConfig::from_lookup(lookup_from(&[
            ("CAR_REGISTRATION", "191-D-12345"),
            ("BOOKING_ID", "B1"),
            ("SLACK_WEBHOOK_URL", "https://hooks.slack.com/services/T/B/X"),
            ("GITHUB_ACTIONS", "true"),
        ]))
        .unwrap();

        assert_eq!(
            config.webhook_url.as_deref(),
            Some("https://hooks.slack.com/services/T/B/X")
        );
        assert!(config.automated);
    }

    #[test]
    fn test_unrecognised_automation_flag_means_manual_run() {
        let config = CheckerConfig::from_lookup(lookup_from(&[
            ("CAR_REGISTRATION", "191-D-12345"),
            ("BOOKING_ID", "B1"),
            ("GITHUB_ACTIONS", "maybe"),
        ]))
        .unwrap();
        assert!(!config.automated);
    }

    #[test]
    fn test_invalid_numeric_setting() {
        let err = CheckerConfig::from_lookup(lookup_from(&[
            ("CAR_REGISTRATION", "191-D-12345"),
            ("BOOKING_ID", "B1"),
            ("WINDOW_DAYS", "two weeks"),
        ]))
        .unwrap_err();
        assert!(matches!(err, CheckerError::InvalidEnvVar { ref var, .. } if var == "WINDOW_DAYS"));
    }

    #[test]
    fn test_window_days_out_of_range() {
        let err = CheckerConfig::from_lookup(lookup_from(&[
            ("CAR_REGISTRATION", "191-D-12345"),
            ("BOOKING_ID", "B1"),
            ("WINDOW_DAYS", "4000000000"),
        ]))
        .unwrap_err();
        assert!(matches!(err, CheckerError::InvalidEnvVar { ref var, .. } if var == "WINDOW_DAYS"));

        let config = CheckerConfig::from_lookup(lookup_from(&[
            ("CAR_REGISTRATION", "191-D-12345"),
            ("BOOKING_ID", "B1"),
            ("WINDOW_DAYS", "3650"),
        ]))
        .unwrap();
        assert_eq!(config.window_days, MAX_WINDOW_DAYS);
    }

    #[test]
    fn test_ambient_settings() {
        let config = CheckerConfig::from_lookup(lookup_from(&[
            ("CAR_REGISTRATION", "191-D-12345"),
            ("BOOKING_ID", "B1"),
            ("HEADLESS", "false"),
            ("WINDOW_DAYS", "21"),
            ("SETTLE_DELAY_MS", "500"),
            ("RUN_TIMEOUT_SECS", "60"),
            ("CHROMIUM_PATH", "/usr/bin/chromium"),
        ]))
        .unwrap();

        assert!(!config.headless);
        assert_eq!(config.window_days, 21);
        assert_eq!(config.settle_delay, Duration::from_millis(500));
        assert_eq!(config.run_timeout, Duration::from_secs(60));
        assert_eq!(config.chrome_path, Some(PathBuf::from("/usr/bin/chromium")));
    }

    #[test]
    fn test_parse_bool() {
        assert_eq!(parse_bool("TRUE"), Some(true));
        assert_eq!(parse_bool(" 1 "), Some(true));
        assert_eq!(parse_bool("off"), Some(false));
        assert_eq!(parse_bool("sometimes"), None);
    }

    #[test]
    fn test_env_files_precedence() {
        let dir = temp_dir("precedence");
        let local = dir.join(".env.local");
        let shared = dir.join(".env");
        std::fs::write(&local, "BOOKING_ID=from-local\n").unwrap();
        std::fs::write(
            &shared,
            "BOOKING_ID=from-shared\nCAR_REGISTRATION=from-shared\n",
        )
        .unwrap();

        let files = EnvFiles::load(&[&local, &shared]).unwrap();

        assert_eq!(files.get("BOOKING_ID"), Some("from-local"));
        assert_eq!(files.get("CAR_REGISTRATION"), Some("from-shared"));
        assert_eq!(files.get("SLACK_WEBHOOK_URL"), None);

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_process_value_beats_env_file() {
        let dir = temp_dir("process");
        let shared = dir.join(".env");
        std::fs::write(&shared, "CAR_REGISTRATION=from-file\n").unwrap();

        let files = EnvFiles::load(&[&shared]).unwrap();

        assert_eq!(
            files.resolve("CAR_REGISTRATION", Some("from-process".to_string())),
            Some("from-process".to_string())
        );
        assert_eq!(
            files.resolve("CAR_REGISTRATION", None),
            Some("from-file".to_string())
        );

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_missing_env_files_are_skipped() {
        let dir = temp_dir("missing");
        let files = EnvFiles::load(&[dir.join(".env.local"), dir.join(".env")]).unwrap();
        assert_eq!(files.get("BOOKING_ID"), None);
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_config_builder() {
        let config = CheckerConfig::new("191-D-12345", "B1")
            .with_webhook_url("http://localhost/hook")
            .with_automated(true)
            .with_headless(false)
            .with_window_days(7)
            .with_centers(["Fonthill"]);

        assert_eq!(config.webhook_url.as_deref(), Some("http://localhost/hook"));
        assert!(config.automated);
        assert!(!config.headless);
        assert_eq!(config.window_days, 7);
        assert_eq!(config.centers, vec!["Fonthill".to_string()]);
    }
}
