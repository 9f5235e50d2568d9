use std::time::Duration;

use async_trait::async_trait;

use crate::error::CheckerError;

/// 予約フローが必要とするページ操作
///
/// 本番は [`crate::browser::ChromeDriver`]、テストでは記録用のフェイクを使う。
#[async_trait]
pub trait PageDriver: Send + Sync {
    /// URLへ遷移
    async fn goto(&self, url: &str) -> Result<(), CheckerError>;

    /// ネットワークリクエストが落ち着くまで待機
    async fn wait_for_network_idle(&self) -> Result<(), CheckerError>;

    /// 要素が表示されるまで待機（上限を超えたら `Timeout`）
    async fn wait_for_visible(&self, selector: &str, timeout: Duration)
        -> Result<(), CheckerError>;

    async fn click(&self, selector: &str) -> Result<(), CheckerError>;

    /// 入力欄をクリアしてから値を入力
    async fn fill(&self, selector: &str, value: &str) -> Result<(), CheckerError>;

    /// チェックボックスをオンにする（既にオンなら何もしない）
    async fn check(&self, selector: &str) -> Result<(), CheckerError>;

    /// 表示ラベルが完全一致する選択肢を選ぶ
    async fn select_by_label(&self, selector: &str, label: &str) -> Result<(), CheckerError>;

    /// 一致する要素すべての属性値（ドキュメント順、属性なしは `None`）
    async fn attribute_values(
        &self,
        selector: &str,
        attribute: &str,
    ) -> Result<Vec<Option<String>>, CheckerError>;

    /// デバッグ用スクリーンショット（PNGのbase64）
    async fn screenshot_base64(&self) -> Option<String> {
        None
    }

    /// リソース解放
    async fn close(&mut self) -> Result<(), CheckerError>;
}
