//! HTTPクッキー関連の実装

use chrono::{DateTime, Utc};
use crate::error::Error;
use super::utils::{validate_cookie_name_value, is_header_value_valid};

/// HTTPクッキー（Set-Cookie出力用）
///
/// レスポンスAPIから設定できるのは名前・値・有効期限のみ。
/// パスとHttpOnlyはセッションクッキーの発行でのみ使用する。
#[derive(Debug, Clone, PartialEq)]
pub struct Cookie {
    pub name: String,
    pub value: String,
    pub expires: Option<DateTime<Utc>>,
    pub path: Option<String>,
    pub http_only: bool,
}

impl Cookie {
    /// 新しいクッキーをResultで作成（無効な文字は拒否）
    pub fn try_new(name: impl Into<String>, value: impl Into<String>) -> Result<Self, Error> {
        let n = name.into();
        let v = value.into();
        validate_cookie_name_value(&n, &v)?;
        Ok(Self {
            name: n,
            value: v,
            expires: None,
            path: None,
            http_only: false,
        })
    }

    /// 有効期限を設定
    pub fn with_expires(mut self, expires: DateTime<Utc>) -> Self {
        self.expires = Some(expires);
        self
    }

    /// パスを設定
    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    /// HttpOnlyフラグを設定
    pub fn http_only(mut self, http_only: bool) -> Self {
        self.http_only = http_only;
        self
    }

    /// Set-Cookieヘッダー値を生成
    pub fn to_header_value(&self) -> String {
        let mut cookie_str = format!("{}={}", self.name, self.value);

        if let Some(path) = &self.path {
            if is_header_value_valid(path) && !path.contains(';') {
                cookie_str.push_str(&format!("; Path={}", path));
            } else {
                log::warn!("Cookie::to_header_value skipped invalid Path value: {:?}", path);
            }
        }

        if let Some(expires) = &self.expires {
            cookie_str.push_str(&format!("; Expires={}", expires.format("%a, %d %b %Y %H:%M:%S GMT")));
        }

        if self.http_only {
            cookie_str.push_str("; HttpOnly");
        }

        cookie_str
    }
}
