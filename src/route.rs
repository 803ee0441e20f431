//! ルート情報の参照用ビュー

use std::sync::Arc;
use crate::common::{require_context, ContextAccessor, HostContext, Request};
use crate::error::Error;

/// ルート値とURL構成要素を読み取るためのビュー
pub struct RouteView {
    ctx: Arc<dyn HostContext>,
}

impl RouteView {
    /// ホストコンテキストから作成（無ければ設定エラー）
    pub fn new(accessor: &dyn ContextAccessor) -> Result<Self, Error> {
        Ok(Self::from_context(require_context(accessor, "RouteView")?))
    }

    /// コンテキストから直接作成
    pub fn from_context(ctx: Arc<dyn HostContext>) -> Self {
        Self { ctx }
    }

    fn request(&self) -> &Request {
        self.ctx.request()
    }

    /// ルート値（空のキーはNone）
    pub fn route_value(&self, key: &str) -> Option<&str> {
        if key.is_empty() {
            return None;
        }
        self.request()
            .route_values
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// 全てのルート値
    pub fn all_route_values(&self) -> &[(String, String)] {
        &self.request().route_values
    }

    /// リクエストパス
    pub fn request_path(&self) -> &str {
        &self.request().path
    }

    /// アプリケーションのベースパス
    pub fn base_path(&self) -> &str {
        &self.request().path_base
    }

    /// スキーム
    pub fn request_scheme(&self) -> &str {
        &self.request().scheme
    }

    /// ホスト名（不明な場合は空文字）
    pub fn host(&self) -> &str {
        self.request().host.as_deref().unwrap_or("")
    }

    /// ポート番号
    pub fn port(&self) -> Option<u16> {
        self.request().port
    }

    /// 完全なURL（scheme://host[:port]{base}{path}[?query]）
    pub fn full_url(&self) -> String {
        let req = self.request();
        let mut url = format!("{}://{}", req.scheme, self.host());
        if let Some(port) = req.port {
            url.push_str(&format!(":{}", port));
        }
        url.push_str(&req.path_base);
        url.push_str(&req.path);
        if !req.raw_query.is_empty() {
            url.push('?');
            url.push_str(&req.raw_query);
        }
        url
    }

    /// コントローラー名（ルート値 `controller`）
    pub fn controller_name(&self) -> Option<&str> {
        self.route_value("controller")
    }

    /// アクション名（ルート値 `action`）
    pub fn action_name(&self) -> Option<&str> {
        self.route_value("action")
    }

    /// エリア名（ルート値 `area`）
    pub fn area_name(&self) -> Option<&str> {
        self.route_value("area")
    }
}
