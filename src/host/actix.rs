//! actix-web（Cloud Run / 常駐HTTPサーバー）向けのホスト実装
//!
//! リクエストごとにコンテキストを作り、クッキーで識別するインメモリのセッションを提供する。

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};
use log::{debug, error, info, warn};
use actix_web::{web, App, HttpRequest, HttpResponse, HttpServer};
use actix_web::http::StatusCode as ActixStatusCode;
use actix_web::web::Bytes;
use uuid::Uuid;

use crate::common::{
    get_max_body_size, get_session_cookie_name, parse_cookie_header, split_host_port, Cookie, Handler,
    HostContext, HostResponse, Request, Response, ResponseSlot, SessionBag,
};
use crate::error::Error;
use crate::host::memory::MemorySession;
use crate::host::route::RouteTable;

/// キャッチオールルートの残りパスを受けるセグメント名（ルート値には含めない）
const CATCH_ALL: &str = "tail";

/// actix-webのリクエストに対応するホストコンテキスト
pub struct ActixContext {
    request: Request,
    response: ResponseSlot,
    session: Option<Arc<dyn SessionBag>>,
}

impl ActixContext {
    /// actix-webのリクエストとボディから作成
    pub fn new(req: &HttpRequest, body: Bytes, session: Option<Arc<dyn SessionBag>>) -> Self {
        let (scheme, host) = {
            let info = req.connection_info();
            (info.scheme().to_string(), info.host().to_string())
        };
        let (host, port) = split_host_port(&host);

        let mut request = Request::new(req.method().as_str(), req.path())
            .with_query(req.query_string())
            .with_scheme(scheme)
            .with_host(host, port)
            .with_body(body);
        for (name, value) in req.headers().iter() {
            match value.to_str() {
                Ok(value) => {
                    request.append_header(name.as_str(), value);
                }
                Err(_) => warn!("Non-ASCII header skipped: {}", name),
            }
        }
        if let Some(peer) = req.peer_addr() {
            request.remote_addr = Some(peer.ip().to_string());
        }
        for (key, value) in req.match_info().iter() {
            if key != CATCH_ALL {
                request = request.with_route_value(key, value);
            }
        }

        Self {
            request,
            response: ResponseSlot::new(),
            session,
        }
    }

    /// ルートテーブルでパスを解決し、ルート値を設定する
    pub fn with_routes(mut self, routes: &RouteTable) -> Self {
        if let Some(values) = routes.resolve(&self.request.path) {
            self.request.route_values = values;
        }
        self
    }

    /// 記録されたレスポンスを取り出す
    pub fn take_response(&self) -> Response {
        self.response.take()
    }

    /// 記録されたレスポンスをactix-webのレスポンスに変換する
    pub fn into_http_response(self) -> HttpResponse {
        to_http_response(&self.response.take())
    }
}

impl HostContext for ActixContext {
    fn host_name(&self) -> &'static str {
        "actix"
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

/// 共通形式のResponseからactix-webのHttpResponseに変換
pub fn to_http_response(response: &Response) -> HttpResponse {
    let status = ActixStatusCode::from_u16(response.status).unwrap_or_else(|_| {
        warn!("Unsupported status code {}, sending 500", response.status);
        ActixStatusCode::INTERNAL_SERVER_ERROR
    });
    let mut builder = HttpResponse::build(status);

    for (key, value) in &response.headers {
        builder.insert_header((key.as_str(), value.as_str()));
    }
    if let Some(content_type) = &response.content_type {
        builder.content_type(content_type.as_str());
    }
    for cookie in &response.cookies {
        builder.append_header(("Set-Cookie", cookie.as_str()));
    }

    if response.body.is_empty() {
        builder.finish()
    } else {
        builder.body(response.body.clone())
    }
}

/// 最終アクセスからセッションを破棄するまでの既定時間
const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_secs(30 * 60);

/// 保持するセッション数の既定上限
const DEFAULT_CAPACITY: usize = 10_000;

struct SessionEntry {
    session: Arc<MemorySession>,
    last_access: Instant,
}

/// セッションIDごとのインメモリセッション
///
/// セッションは値が書き込まれたリクエストの終了時に登録され、そのときにだけIDのクッキーを発行する。
/// 一定時間アクセスの無いセッションは破棄し、上限に達したら最も古いものから追い出す。
pub struct SessionRegistry {
    cookie_name: String,
    idle_timeout: Duration,
    capacity: usize,
    sessions: Mutex<HashMap<String, SessionEntry>>,
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::with_cookie_name(get_session_cookie_name())
    }
}

impl SessionRegistry {
    /// クッキー名を環境変数から読み込んで作成
    pub fn new() -> Self {
        Self::default()
    }

    /// クッキー名を指定して作成
    pub fn with_cookie_name(cookie_name: impl Into<String>) -> Self {
        Self {
            cookie_name: cookie_name.into(),
            idle_timeout: DEFAULT_IDLE_TIMEOUT,
            capacity: DEFAULT_CAPACITY,
            sessions: Mutex::new(HashMap::new()),
        }
    }

    /// 無アクセスのセッションを破棄するまでの時間を設定
    pub fn with_idle_timeout(mut self, idle_timeout: Duration) -> Self {
        self.idle_timeout = idle_timeout;
        self
    }

    /// 保持するセッション数の上限を設定（最小1）
    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity.max(1);
        self
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, SessionEntry>> {
        self.sessions.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// セッションIDを保持するクッキー名
    pub fn cookie_name(&self) -> &str {
        &self.cookie_name
    }

    /// 保持しているセッション数
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// 空かどうか
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// リクエストのセッションを取得する
    ///
    /// 有効な既知のIDならそのセッションとIDを返す。
    /// 未知・期限切れ・未指定なら未登録の新しいセッションを返す（登録は [`commit`](Self::commit) で行う）。
    pub fn resolve(&self, request: &Request) -> (Arc<MemorySession>, Option<String>) {
        let requested = request
            .headers
            .get_all(http::header::COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .flat_map(parse_cookie_header)
            .find(|(name, _)| *name == self.cookie_name)
            .map(|(_, value)| value);

        if let Some(id) = requested {
            let mut sessions = self.lock();
            let now = Instant::now();
            match sessions.get_mut(&id) {
                Some(entry) if now.duration_since(entry.last_access) < self.idle_timeout => {
                    entry.last_access = now;
                    return (Arc::clone(&entry.session), Some(id));
                }
                Some(_) => {
                    debug!("Session expired, discarding");
                    sessions.remove(&id);
                }
                None => debug!("Unknown session id ignored"),
            }
        }
        (Arc::new(MemorySession::new()), None)
    }

    /// リクエスト終了時に未登録のセッションを登録する
    ///
    /// 値が書き込まれていれば新しいIDで登録してそのIDを返す。既知のセッションや空のセッションは `None`。
    pub fn commit(&self, session: &Arc<MemorySession>, known: Option<&str>) -> Option<String> {
        if known.is_some() || session.is_empty() {
            return None;
        }

        let mut sessions = self.lock();
        let now = Instant::now();
        let idle_timeout = self.idle_timeout;
        sessions.retain(|_, entry| now.duration_since(entry.last_access) < idle_timeout);
        while sessions.len() >= self.capacity {
            let oldest = sessions
                .iter()
                .min_by_key(|(_, entry)| entry.last_access)
                .map(|(id, _)| id.clone());
            match oldest {
                Some(id) => {
                    debug!("Session capacity reached, evicting the least recently used");
                    sessions.remove(&id);
                }
                None => break,
            }
        }

        let id = Uuid::new_v4().simple().to_string();
        sessions.insert(
            id.clone(),
            SessionEntry {
                session: Arc::clone(session),
                last_access: now,
            },
        );
        Some(id)
    }

    /// 新しいセッションIDを通知するクッキー
    fn session_cookie(&self, id: &str) -> Result<Cookie, Error> {
        Ok(Cookie::try_new(self.cookie_name.as_str(), id)?
            .with_path("/")
            .http_only(true))
    }
}

/// actix-webのアプリケーションで共有する状態
pub struct ActixState {
    handler: Arc<dyn Handler>,
    routes: RouteTable,
    sessions: SessionRegistry,
}

impl ActixState {
    /// ハンドラから作成
    pub fn new<H: Handler + 'static>(handler: H) -> Self {
        Self {
            handler: Arc::new(handler),
            routes: RouteTable::new(),
            sessions: SessionRegistry::new(),
        }
    }

    /// ルートテーブルを設定
    pub fn with_routes(mut self, routes: RouteTable) -> Self {
        self.routes = routes;
        self
    }

    /// セッションのレジストリを差し替える
    pub fn with_sessions(mut self, sessions: SessionRegistry) -> Self {
        self.sessions = sessions;
        self
    }

    pub fn sessions(&self) -> &SessionRegistry {
        &self.sessions
    }
}

/// 全てのパス・メソッドを処理するactix-web用ハンドラー
pub async fn handle_request(req: HttpRequest, body: Bytes, state: web::Data<ActixState>) -> HttpResponse {
    let method = req.method().as_str().to_string();
    let path = req.path().to_string();
    info!("Received request: {} {}", method, path);

    let max = get_max_body_size();
    if body.len() > max {
        warn!("Request body too large: {} bytes (limit {})", body.len(), max);
        return to_http_response(&Response::from_error(&Error::PayloadTooLarge(format!(
            "Request body exceeds {} bytes",
            max
        ))));
    }

    let mut ctx = ActixContext::new(&req, body, None).with_routes(&state.routes);
    let (session, known) = state.sessions.resolve(&ctx.request);
    ctx.session = Some(Arc::clone(&session) as Arc<dyn SessionBag>);
    let ctx = Arc::new(ctx);

    let host_ctx: Arc<dyn HostContext> = ctx.clone();
    let mut response = match state.handler.handle(host_ctx).await {
        Ok(()) => ctx.take_response(),
        Err(e) => {
            error!("Handler error at {} {}: {}", method, path, e);
            Response::from_error(&e)
        }
    };

    if let Some(id) = state.sessions.commit(&session, known.as_deref()) {
        match state.sessions.session_cookie(&id) {
            Ok(cookie) => response.cookies.push(cookie.to_header_value()),
            Err(e) => error!("Failed to issue session cookie: {}", e),
        }
    }

    debug!("Request processed: {} {} -> {}", method, path, response.status);
    to_http_response(&response)
}

/// アプリケーションにキャッチオールのルートとボディ上限を登録する
pub fn configure(state: web::Data<ActixState>) -> impl FnOnce(&mut web::ServiceConfig) {
    move |cfg| {
        cfg.app_data(state)
            .app_data(web::PayloadConfig::new(get_max_body_size()))
            .route(&format!("/{{{}:.*}}", CATCH_ALL), web::route().to(handle_request));
    }
}

/// ハンドラをHTTPサーバーとして実行
pub async fn run_cloud_run<H: Handler + 'static>(handler: H, host: &str, port: u16) -> std::io::Result<()> {
    run_cloud_run_with_state(ActixState::new(handler), host, port).await
}

/// 構築済みの状態でHTTPサーバーを実行
pub async fn run_cloud_run_with_state(state: ActixState, host: &str, port: u16) -> std::io::Result<()> {
    info!("Starting HTTP server on {}:{}", host, port);
    let state = web::Data::new(state);

    HttpServer::new(move || App::new().configure(configure(state.clone())))
        .bind((host, port))?
        .run()
        .await
}
