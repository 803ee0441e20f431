//! リクエストの参照用ビュー

use std::sync::Arc;
use serde::de::DeserializeOwned;
use log::debug;
use crate::common::{parse_cookie_header, parse_query_string, require_context, ContextAccessor, HostContext, Method, Request};
use crate::error::Error;

/// ホストのリクエストを読み取るためのビュー
pub struct RequestView {
    ctx: Arc<dyn HostContext>,
}

impl RequestView {
    /// ホストコンテキストから作成（無ければ設定エラー）
    pub fn new(accessor: &dyn ContextAccessor) -> Result<Self, Error> {
        Ok(Self::from_context(require_context(accessor, "RequestView")?))
    }

    /// コンテキストから直接作成
    pub fn from_context(ctx: Arc<dyn HostContext>) -> Self {
        Self { ctx }
    }

    fn request(&self) -> &Request {
        self.ctx.request()
    }

    /// HTTPメソッド（ホストが渡した文字列）
    pub fn http_method(&self) -> &str {
        &self.request().method
    }

    /// HTTPメソッド（既知のもののみ）
    pub fn method(&self) -> Option<Method> {
        Method::from_str(&self.request().method)
    }

    /// ヘッダー値（大文字小文字を区別しない、複数値はカンマ連結）
    pub fn header(&self, key: &str) -> Option<String> {
        self.request().header(key)
    }

    /// ヘッダーが存在するか
    pub fn has_header(&self, key: &str) -> bool {
        self.request().headers.contains_key(key)
    }

    /// 全てのヘッダー（名前は小文字）
    pub fn all_headers(&self) -> Vec<(String, String)> {
        let request = self.request();
        request
            .headers
            .keys()
            .filter_map(|name| {
                request
                    .header(name.as_str())
                    .map(|value| (name.as_str().to_string(), value))
            })
            .collect()
    }

    /// クエリパラメータの値（無ければデフォルト）
    pub fn query_string(&self, key: &str, default: Option<&str>) -> Option<String> {
        parse_query_string(&self.request().raw_query)
            .into_iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v)
            .or_else(|| default.map(str::to_string))
    }

    /// 全てのクエリパラメータ
    pub fn all_query_strings(&self) -> Vec<(String, String)> {
        parse_query_string(&self.request().raw_query)
    }

    /// クッキーの値
    pub fn cookie(&self, key: &str) -> Option<String> {
        self.all_cookies()
            .into_iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v)
    }

    /// クッキーが存在するか
    pub fn has_cookie(&self, key: &str) -> bool {
        self.cookie(key).is_some()
    }

    /// 全てのクッキー（同名は先勝ち）
    pub fn all_cookies(&self) -> Vec<(String, String)> {
        let mut cookies: Vec<(String, String)> = Vec::new();
        for header in self.request().headers.get_all(http::header::COOKIE) {
            let Ok(header) = header.to_str() else { continue };
            for (name, value) in parse_cookie_header(header) {
                if !cookies.iter().any(|(k, _)| *k == name) {
                    cookies.push((name, value));
                }
            }
        }
        cookies
    }

    /// ボディを文字列として取得（何度でも読める）
    pub fn body_as_string(&self) -> String {
        String::from_utf8_lossy(&self.request().body).into_owned()
    }

    /// ボディをJSONとして取得（空・解析失敗はNone）
    pub fn body_as_json<T: DeserializeOwned>(&self) -> Option<T> {
        if self.body_as_string().trim().is_empty() {
            return None;
        }
        match self.try_body_as_json() {
            Ok(value) => Some(value),
            Err(e) => {
                debug!("RequestView::body_as_json failed: {}", e);
                None
            }
        }
    }

    /// ボディをJSONとして取得（失敗理由を返す）
    pub fn try_body_as_json<T: DeserializeOwned>(&self) -> Result<T, Error> {
        self.request().json()
    }

    /// User-Agentヘッダー
    pub fn user_agent(&self) -> Option<String> {
        self.header("User-Agent")
    }

    /// クライアントのIPアドレス
    ///
    /// 接続元アドレスを優先し、無ければ X-Forwarded-For の先頭を使う。
    pub fn client_ip_address(&self) -> Option<String> {
        if let Some(addr) = self.request().remote_addr.as_deref().filter(|a| !a.is_empty()) {
            return Some(addr.to_string());
        }
        self.header("X-Forwarded-For")
            .and_then(|v| v.split(',').next().map(|s| s.trim().to_string()))
            .filter(|s| !s.is_empty())
    }

    /// XMLHttpRequestによるリクエストか
    pub fn is_ajax_request(&self) -> bool {
        self.header("X-Requested-With")
            .map(|v| v.eq_ignore_ascii_case("XMLHttpRequest"))
            .unwrap_or(false)
    }

    /// Content-Typeヘッダー
    pub fn content_type(&self) -> Option<String> {
        self.header("Content-Type")
    }
}
