//! コアトレイト定義（ホストコンテキスト、レスポンス、セッション、ハンドラー）

use std::sync::Arc;
use async_trait::async_trait;
use crate::error::Error;
use super::cookie::Cookie;
use super::http::{Request, Response};

/// ホスト側レスポンスへの書き込み口
///
/// 各操作はホストのレスポンスへ即時に反映される。
pub trait HostResponse: Send + Sync {
    /// ステータスコードを設定
    fn set_status(&self, status: u16);

    /// ヘッダーを設定（同名は置き換え）
    fn set_header(&self, key: &str, value: &str);

    /// Set-Cookieを追加
    fn append_cookie(&self, cookie: &Cookie);

    /// リダイレクト（302 + Location）
    fn redirect(&self, url: &str);

    /// Content-Typeを設定
    fn set_content_type(&self, content_type: &str);

    /// ボディに追記
    fn write(&self, content: &[u8]);

    /// ボディ・ヘッダー・Content-Typeを破棄
    fn clear(&self);

    /// レスポンスを確定（以降の書き込みは無視）
    fn end(&self);

    /// 現在のレスポンス内容を取得
    fn snapshot(&self) -> Response;
}

/// ホストが所有するセッション領域
#[cfg_attr(test, mockall::automock)]
pub trait SessionBag: Send + Sync {
    /// 値を取得
    fn get(&self, key: &str) -> Option<String>;

    /// 値を設定
    fn set(&self, key: &str, value: String);

    /// 値を削除
    fn remove(&self, key: &str);

    /// 全て削除
    fn clear(&self);

    /// 全てのキーを取得
    fn keys(&self) -> Vec<String>;
}

/// リクエスト単位のホストコンテキスト
pub trait HostContext: Send + Sync {
    /// ホスト種別名（ログ用）
    fn host_name(&self) -> &'static str;

    /// リクエストのスナップショット
    fn request(&self) -> &Request;

    /// レスポンスの書き込み口
    fn response(&self) -> &dyn HostResponse;

    /// セッション（ホストが提供しない場合はNone）
    fn session(&self) -> Option<Arc<dyn SessionBag>>;
}

/// ホストコンテキストを提供するアクセサ
///
/// 各ファサードは構築時にこれを受け取り、コンテキストが無ければ設定エラーで失敗する。
#[cfg_attr(test, mockall::automock)]
pub trait ContextAccessor: Send + Sync {
    /// 現在のホストコンテキストを取得
    fn context(&self) -> Option<Arc<dyn HostContext>>;
}

impl ContextAccessor for Arc<dyn HostContext> {
    fn context(&self) -> Option<Arc<dyn HostContext>> {
        Some(Arc::clone(self))
    }
}

/// アクセサからコンテキストを取り出す（無ければ設定エラー）
pub fn require_context(accessor: &dyn ContextAccessor, component: &str) -> Result<Arc<dyn HostContext>, Error> {
    accessor.context().ok_or_else(|| {
        log::error!("{}: host context is not available", component);
        Error::ConfigurationError(format!("{}: host context is not available", component))
    })
}

/// リクエストを処理するハンドラー
///
/// ホストのランナー（CGI / actix-web）から1リクエストにつき1回呼ばれる。
#[async_trait]
pub trait Handler: Send + Sync {
    /// リクエストを処理し、コンテキストのレスポンスに結果を書き込む
    async fn handle(&self, ctx: Arc<dyn HostContext>) -> Result<(), Error>;
}
