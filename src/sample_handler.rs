//! サンプルハンドラの実装
//!
//! ルート値 `controller` で処理を振り分ける。CGI / HTTPサーバーの両方のバイナリから使う。

use std::sync::Arc;
use async_trait::async_trait;
use log::{info, warn};
use serde::{Deserialize, Serialize};

use hostbridge::host::RouteTable;
use hostbridge::{Error, Handler, HostContext, QueryStore, RequestView, ResponseView, RouteView, SessionStore};

/// サンプルのルートテーブル（`/{controller}/{action}`）
pub fn routes() -> Result<RouteTable, Error> {
    RouteTable::new().route(
        r"^/(?P<controller>[^/]*)(?:/(?P<action>[^/]+))?/?$",
        &[("controller", "home"), ("action", "index")],
    )
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
struct Greeting {
    message: String,
    version: String,
}

/// リクエスト情報の要約
#[derive(Debug, Serialize)]
struct Echo {
    method: String,
    url: String,
    client_ip: Option<String>,
    ajax: bool,
    query: Vec<(String, String)>,
    cookies: Vec<(String, String)>,
    body: String,
}

/// サンプルのハンドラ
pub struct SampleHandler;

impl SampleHandler {
    pub fn new() -> Self {
        Self
    }

    fn hello(&self, ctx: &Arc<dyn HostContext>) -> Result<(), Error> {
        let query = QueryStore::new(ctx)?;
        let name = query.get_or("name", "World");
        let message = match query.get("lang") {
            Some("ja") => format!("こんにちは、{}!", name),
            _ => format!("Hello, {}!", name),
        };
        let body = serde_json::to_string(&Greeting {
            message,
            version: env!("CARGO_PKG_VERSION").to_string(),
        })?;
        ResponseView::new(ctx)?.write(&body, Some("application/json"))
    }

    fn echo(&self, ctx: &Arc<dyn HostContext>) -> Result<(), Error> {
        let req = RequestView::new(ctx)?;
        let route = RouteView::new(ctx)?;
        let echo = Echo {
            method: req.http_method().to_string(),
            url: route.full_url(),
            client_ip: req.client_ip_address(),
            ajax: req.is_ajax_request(),
            query: req.all_query_strings(),
            cookies: req.all_cookies(),
            body: req.body_as_string(),
        };
        ResponseView::new(ctx)?.write(&serde_json::to_string(&echo)?, Some("application/json"))
    }

    fn visits(&self, ctx: &Arc<dyn HostContext>) -> Result<(), Error> {
        let res = ResponseView::new(ctx)?;
        let session = match SessionStore::new(ctx) {
            Ok(session) => session,
            Err(e) => {
                warn!("Session is not available: {}", e);
                res.set_status_code(501)?;
                return res.write("Sessions are not supported on this host", None);
            }
        };
        let visits = session.get_encrypted("visits", 0u64) + 1;
        session.set_encrypted("visits", &visits)?;
        res.write(&format!("visits: {}", visits), None)
    }
}

impl Default for SampleHandler {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Handler for SampleHandler {
    async fn handle(&self, ctx: Arc<dyn HostContext>) -> Result<(), Error> {
        let route = RouteView::new(&ctx)?;
        let controller = route.controller_name().unwrap_or("home").to_string();
        info!("Handling {} {}", route.request_path(), controller);

        match controller.as_str() {
            "home" => self.hello(&ctx),
            "echo" => self.echo(&ctx),
            "visits" => self.visits(&ctx),
            "login" => ResponseView::new(&ctx)?.redirect("/visits"),
            "panic" => panic!("Test panic from handler"),
            _ => {
                let res = ResponseView::new(&ctx)?;
                res.set_status_code(404)?;
                res.write("Not Found", None)
            }
        }
    }
}
