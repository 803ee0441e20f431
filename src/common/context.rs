//! ホスト共通のコンテキスト部品（レスポンス記録、設定可能なアクセサ）

use std::sync::{Arc, Mutex, MutexGuard};
use log::warn;
use super::cookie::Cookie;
use super::http::{Response, StatusCode};
use super::traits::{ContextAccessor, HostContext, HostResponse};

/// Mutexで保護されたレスポンス記録
///
/// ホストはリクエスト処理後にこの内容を自身の形式へ変換して出力する。
#[derive(Debug, Default)]
pub struct ResponseSlot {
    inner: Mutex<Response>,
}

impl ResponseSlot {
    /// 新しいResponseSlotを作成（200 OK）
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Response> {
        // 他スレッドのpanicで汚染されていても記録内容は利用する
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// 記録を取り出して初期状態に戻す
    pub fn take(&self) -> Response {
        std::mem::take(&mut *self.lock())
    }
}

impl HostResponse for ResponseSlot {
    fn set_status(&self, status: u16) {
        let mut res = self.lock();
        if res.ended {
            warn!("set_status ignored: response already ended");
            return;
        }
        res.status = status;
    }

    fn set_header(&self, key: &str, value: &str) {
        let mut res = self.lock();
        if res.ended {
            warn!("set_header ignored: response already ended");
            return;
        }
        res.set_header(key, value);
    }

    fn append_cookie(&self, cookie: &Cookie) {
        let mut res = self.lock();
        if res.ended {
            warn!("append_cookie ignored: response already ended");
            return;
        }
        res.cookies.push(cookie.to_header_value());
    }

    fn redirect(&self, url: &str) {
        let mut res = self.lock();
        if res.ended {
            warn!("redirect ignored: response already ended");
            return;
        }
        res.status = StatusCode::Found.as_u16();
        res.set_header("Location", url);
    }

    fn set_content_type(&self, content_type: &str) {
        let mut res = self.lock();
        if res.ended {
            warn!("set_content_type ignored: response already ended");
            return;
        }
        res.content_type = Some(content_type.to_string());
    }

    fn write(&self, content: &[u8]) {
        let mut res = self.lock();
        if res.ended {
            warn!("write ignored: response already ended");
            return;
        }
        res.body.extend_from_slice(content);
    }

    fn clear(&self) {
        let mut res = self.lock();
        if res.ended {
            warn!("clear ignored: response already ended");
            return;
        }
        res.headers.clear();
        res.cookies.clear();
        res.content_type = None;
        res.body.clear();
    }

    fn end(&self) {
        self.lock().ended = true;
    }

    fn snapshot(&self) -> Response {
        self.lock().clone()
    }
}

/// 後からコンテキストを設定できるアクセサ
#[derive(Default, Clone)]
pub struct ContextSlot {
    context: Option<Arc<dyn HostContext>>,
}

impl ContextSlot {
    /// コンテキスト付きで作成
    pub fn new(context: Arc<dyn HostContext>) -> Self {
        Self { context: Some(context) }
    }

    /// 空のアクセサを作成
    pub fn empty() -> Self {
        Self::default()
    }

    /// コンテキストを設定
    pub fn set(&mut self, context: Arc<dyn HostContext>) {
        self.context = Some(context);
    }
}

impl ContextAccessor for ContextSlot {
    fn context(&self) -> Option<Arc<dyn HostContext>> {
        self.context.clone()
    }
}
