//! CGI環境のホスト実装
//!
//! 環境変数と標準入力からリクエストを構築し、
//! 標準出力にCGIレスポンス形式で出力する。セッションは提供しない。

pub mod error_logging;
pub mod request;
pub mod response;
pub mod runner;


use std::io::Read;
use std::sync::Arc;

use crate::common::{HostContext, HostResponse, Request, Response, ResponseSlot, SessionBag};
use crate::error::Error;
use crate::host::route::RouteTable;

pub use response::{write_response, write_response_to};
pub use runner::{process_cgi, run_cgi, run_cgi_with_routes, serve_cgi};

/// CGIプロセスのホストコンテキスト
pub struct CgiContext {
    request: Request,
    response: ResponseSlot,
}

impl CgiContext {
    /// 環境変数と標準入力から作成
    pub fn from_env() -> Result<Self, Error> {
        Self::from_env_with_input(&mut std::io::stdin().lock())
    }

    /// 環境変数と任意の入力から作成
    pub fn from_env_with_input<R: Read>(input: &mut R) -> Result<Self, Error> {
        Ok(Self::from_request(request::request_from_env(input)?))
    }

    /// 構築済みのリクエストから作成
    pub fn from_request(request: Request) -> Self {
        Self {
            request,
            response: ResponseSlot::new(),
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
}

impl HostContext for CgiContext {
    fn host_name(&self) -> &'static str {
        "cgi"
    }

    fn request(&self) -> &Request {
        &self.request
    }

    fn response(&self) -> &dyn HostResponse {
        &self.response
    }

    fn session(&self) -> Option<Arc<dyn SessionBag>> {
        None
    }
}
