//! インメモリのホスト実装（テストや組み込み用）

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use bytes::Bytes;
use crate::common::{HostContext, HostResponse, Request, Response, ResponseSlot, SessionBag};

/// Mutexで保護されたインメモリのセッション
#[derive(Debug, Default)]
pub struct MemorySession {
    values: Mutex<HashMap<String, String>>,
}

impl MemorySession {
    /// 空のセッションを作成
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, String>> {
        self.values.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// 保存されている値の数
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// 空かどうか
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}

impl SessionBag for MemorySession {
    fn get(&self, key: &str) -> Option<String> {
        self.lock().get(key).cloned()
    }

    fn set(&self, key: &str, value: String) {
        self.lock().insert(key.to_string(), value);
    }

    fn remove(&self, key: &str) {
        self.lock().remove(key);
    }

    fn clear(&self) {
        self.lock().clear();
    }

    fn keys(&self) -> Vec<String> {
        self.lock().keys().cloned().collect()
    }
}

/// インメモリのホストコンテキスト
pub struct MemoryContext {
    request: Request,
    response: ResponseSlot,
    session: Option<Arc<dyn SessionBag>>,
}

impl std::fmt::Debug for MemoryContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryContext")
            .field("request", &self.request)
            .field("response", &self.response)
            .field("has_session", &self.session.is_some())
            .finish()
    }
}

impl MemoryContext {
    /// ビルダーを作成
    pub fn builder() -> MemoryContextBuilder {
        MemoryContextBuilder::default()
    }

    /// リクエストから作成（セッションなし）
    pub fn new(request: Request) -> Self {
        Self {
            request,
            response: ResponseSlot::new(),
            session: None,
        }
    }

    /// 記録されたレスポンス
    pub fn response_snapshot(&self) -> Response {
        self.response.snapshot()
    }
}

impl HostContext for MemoryContext {
    fn host_name(&self) -> &'static str {
        "memory"
    }

    fn request(&self) -> &Request {
        &self.request
    }

    fn response(&self) -> &dyn HostResponse {
        &self.response
    }

    fn session(&self) -> Option<Arc<dyn SessionBag>> {
        self.session.clone()
    }
}

/// MemoryContextのビルダー
pub struct MemoryContextBuilder {
    request: Request,
    session: Option<Arc<dyn SessionBag>>,
}

impl Default for MemoryContextBuilder {
    fn default() -> Self {
        Self {
            request: Request::new("GET", "/"),
            session: None,
        }
    }
}

impl MemoryContextBuilder {
    /// HTTPメソッドを設定
    pub fn method(mut self, method: impl Into<String>) -> Self {
        self.request.method = method.into();
        self
    }

    /// パスを設定
    pub fn path(mut self, path: impl Into<String>) -> Self {
        self.request.path = path.into();
        self
    }

    /// ベースパスを設定
    pub fn path_base(mut self, path_base: impl Into<String>) -> Self {
        self.request = self.request.with_path_base(path_base);
        self
    }

    /// スキームを設定
    pub fn scheme(mut self, scheme: impl Into<String>) -> Self {
        self.request = self.request.with_scheme(scheme);
        self
    }

    /// ホスト名とポートを設定
    pub fn host(mut self, host: impl Into<String>, port: Option<u16>) -> Self {
        self.request = self.request.with_host(host, port);
        self
    }

    /// クエリ文字列を設定
    pub fn query(mut self, raw_query: impl Into<String>) -> Self {
        self.request = self.request.with_query(raw_query);
        self
    }

    /// ヘッダーを追加
    pub fn header(mut self, key: &str, value: &str) -> Self {
        self.request.append_header(key, value);
        self
    }

    /// ボディを設定
    pub fn body(mut self, body: impl Into<Bytes>) -> Self {
        self.request = self.request.with_body(body);
        self
    }

    /// 接続元アドレスを設定
    pub fn remote_addr(mut self, addr: impl Into<String>) -> Self {
        self.request = self.request.with_remote_addr(addr);
        self
    }

    /// ルート値を追加
    pub fn route_value(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.request = self.request.with_route_value(key, value);
        self
    }

    /// リクエスト全体を差し替え
    pub fn request(mut self, request: Request) -> Self {
        self.request = request;
        self
    }

    /// セッションを設定
    pub fn with_session(self, session: impl SessionBag + 'static) -> Self {
        self.with_shared_session(Arc::new(session))
    }

    /// 共有セッションを設定
    pub fn with_shared_session(mut self, session: Arc<dyn SessionBag>) -> Self {
        self.session = Some(session);
        self
    }

    /// MemoryContextを作成
    pub fn build_context(self) -> MemoryContext {
        MemoryContext {
            request: self.request,
            response: ResponseSlot::new(),
            session: self.session,
        }
    }

    /// 共有可能なホストコンテキストとして作成
    pub fn build(self) -> Arc<dyn HostContext> {
        Arc::new(self.build_context())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_sets_request_fields() {
        let ctx = MemoryContext::builder()
            .method("POST")
            .path("/items/3")
            .path_base("/app")
            .scheme("https")
            .host("example.com", Some(8443))
            .query("?a=1")
            .header("X-Test", "yes")
            .body("payload")
            .remote_addr("10.0.0.1")
            .route_value("id", "3")
            .build();

        let req = ctx.request();
        assert_eq!(req.method, "POST");
        assert_eq!(req.path, "/items/3");
        assert_eq!(req.path_base, "/app");
        assert_eq!(req.scheme, "https");
        assert_eq!(req.host.as_deref(), Some("example.com"));
        assert_eq!(req.port, Some(8443));
        assert_eq!(req.raw_query, "a=1");
        assert_eq!(req.header("x-test").as_deref(), Some("yes"));
        assert_eq!(&req.body[..], b"payload");
        assert_eq!(req.remote_addr.as_deref(), Some("10.0.0.1"));
        assert_eq!(req.route_values, vec![("id".to_string(), "3".to_string())]);
        assert_eq!(ctx.host_name(), "memory");
        assert!(ctx.session().is_none());
    }

    #[test]
    fn test_response_is_recorded() {
        let ctx = MemoryContext::builder().build_context();
        ctx.response().set_status(404);
        ctx.response().write(b"missing");
        let res = ctx.response_snapshot();
        assert_eq!(res.status, 404);
        assert_eq!(res.body_text(), "missing");
    }

    #[test]
    fn test_shared_session() {
        let bag: Arc<dyn SessionBag> = Arc::new(MemorySession::new());
        let first = MemoryContext::builder().with_shared_session(Arc::clone(&bag)).build();
        let second = MemoryContext::builder().with_shared_session(Arc::clone(&bag)).build();

        first.session().unwrap().set("user", "alice".to_string());
        assert_eq!(second.session().unwrap().get("user"), Some("alice".to_string()));
    }

    #[test]
    fn test_memory_session_operations() {
        let session = MemorySession::new();
        session.set("a", "1".to_string());
        session.set("a", "2".to_string());
        assert_eq!(session.get("a"), Some("2".to_string()));
        assert_eq!(session.len(), 1);
        session.remove("a");
        assert!(session.is_empty());
        session.set("b", "1".to_string());
        session.clear();
        assert!(session.keys().is_empty());
    }
}
