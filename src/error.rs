use thiserror::Error;

use crate::flow::FlowStep;

#[derive(Error, Debug)]
pub enum CheckerError {
    #[error("環境変数が設定されていません: {0}")]
    MissingEnvVar(String),

    #[error("環境変数の値が不正です: {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },

    #[error(".envファイル読み込みエラー: {path}: {reason}")]
    EnvFile { path: String, reason: String },

    #[error("ブラウザ初期化エラー: {0}")]
    BrowserInit(String),

    #[error("ナビゲーションエラー: {0}")]
    Navigation(String),

    #[error("要素が見つかりません: {0}")]
    ElementNotFound(String),

    #[error("JavaScript実行エラー: {0}")]
    JavaScript(String),

    #[error("タイムアウト: {0}")]
    Timeout(String),

    #[error("フォーム手順 '{step}' で失敗: {source}")]
    Step {
        step: FlowStep,
        #[source]
        source: Box<CheckerError>,
    },

    #[error("通知エラー: {0}")]
    Notification(String),
}

impl CheckerError {
    /// フォーム手順の失敗であれば、その手順を返す
    pub fn failed_step(&self) -> Option<FlowStep> {
        match self {
            CheckerError::Step { step, .. } => Some(*step),
            _ => None,
        }
    }
}
