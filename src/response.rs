//! レスポンス操作用ビュー

use std::sync::Arc;
use chrono::{DateTime, Utc};
use crate::common::{is_header_value_valid, require_context, validate_header, ContextAccessor, Cookie, HostContext, HostResponse, StatusCode};
use crate::error::Error;

/// 書き込み時のデフォルトContent-Type
pub const DEFAULT_CONTENT_TYPE: &str = "text/plain";

/// ホストのレスポンスを操作するためのビュー
///
/// 各操作はそのままホストのレスポンスに反映される。
pub struct ResponseView {
    ctx: Arc<dyn HostContext>,
}

impl ResponseView {
    /// ホストコンテキストから作成（無ければ設定エラー）
    pub fn new(accessor: &dyn ContextAccessor) -> Result<Self, Error> {
        Ok(Self::from_context(require_context(accessor, "ResponseView")?))
    }

    /// コンテキストから直接作成
    pub fn from_context(ctx: Arc<dyn HostContext>) -> Self {
        Self { ctx }
    }

    fn response(&self) -> &dyn HostResponse {
        self.ctx.response()
    }

    /// ステータスコードを設定
    pub fn set_status_code(&self, status: u16) -> Result<(), Error> {
        if !(100..=599).contains(&status) {
            return Err(Error::InvalidArgument(format!("status code out of range: {}", status)));
        }
        self.response().set_status(status);
        Ok(())
    }

    /// 既知のステータスコードを設定
    pub fn set_status(&self, status: StatusCode) {
        self.response().set_status(status.as_u16());
    }

    /// ヘッダーを設定（同名は置き換え）
    pub fn set_header(&self, key: &str, value: &str) -> Result<(), Error> {
        validate_header(key, value)?;
        self.response().set_header(key, value);
        Ok(())
    }

    /// クッキーを設定
    ///
    /// 設定できるのは名前・値・有効期限のみ（Domain / Path / Secure / HttpOnly は指定不可）。
    pub fn set_cookie(&self, name: &str, value: &str, expires: Option<DateTime<Utc>>) -> Result<(), Error> {
        let mut cookie = Cookie::try_new(name, value)?;
        if let Some(expires) = expires {
            cookie = cookie.with_expires(expires);
        }
        self.response().append_cookie(&cookie);
        Ok(())
    }

    /// 302でリダイレクト
    pub fn redirect(&self, url: &str) -> Result<(), Error> {
        if url.is_empty() || !is_header_value_valid(url) {
            return Err(Error::InvalidHeader("redirect url contains invalid characters".into()));
        }
        self.response().redirect(url);
        Ok(())
    }

    /// ボディに書き込む（Content-Typeの既定は text/plain）
    pub fn write(&self, content: &str, content_type: Option<&str>) -> Result<(), Error> {
        self.set_content_type(content_type.unwrap_or(DEFAULT_CONTENT_TYPE))?;
        self.response().write(content.as_bytes());
        Ok(())
    }

    /// バイト列をボディに書き込む
    pub fn write_bytes(&self, content: &[u8], content_type: &str) -> Result<(), Error> {
        self.set_content_type(content_type)?;
        self.response().write(content);
        Ok(())
    }

    /// Content-Typeを設定
    pub fn set_content_type(&self, content_type: &str) -> Result<(), Error> {
        validate_header("Content-Type", content_type)?;
        self.response().set_content_type(content_type);
        Ok(())
    }

    /// ボディ・ヘッダー・Content-Typeを破棄（ステータスは維持）
    pub fn clear(&self) {
        self.response().clear();
    }

    /// レスポンスを確定する（以降の書き込みは無視される）
    pub fn end(&self) {
        self.response().end();
    }

    /// 確定済みかどうか
    pub fn is_ended(&self) -> bool {
        self.response().snapshot().ended
    }
}
