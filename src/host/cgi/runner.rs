//! CGIの実行ループ（1プロセス1リクエスト）

use std::io::{self, Read, Write};
use std::sync::Arc;
use log::{debug, error, info};
use tokio::task;

use crate::common::{Handler, HostContext, Response};
use crate::error::Error;
use crate::host::route::RouteTable;
use super::error_logging::{gather_cgi_panic_context, log_error_to_file};
use super::response::write_response_to;
use super::CgiContext;

/// 標準入出力でCGIリクエストを1件処理する
pub async fn run_cgi<H: Handler + 'static>(handler: H) -> Result<(), Error> {
    run_cgi_with_routes(handler, RouteTable::new()).await
}

/// ルートテーブル付きでCGIリクエストを1件処理する
///
/// 標準入出力のロックはハンドラの実行中には保持しない。
pub async fn run_cgi_with_routes<H: Handler + 'static>(handler: H, routes: RouteTable) -> Result<(), Error> {
    let response = process_cgi(Arc::new(handler), &routes, &mut io::stdin()).await?;
    let mut out = io::stdout().lock();
    write_response_to(&response, &mut out)?;
    out.flush().map_err(|e| Error::InternalServerError(format!("Failed to flush stdout: {}", e)))
}

/// 任意の入出力でCGIリクエストを1件処理する
///
/// リクエストの読み込みに失敗した場合（上限超過・読み込みエラー）はエラーレスポンスを出力して `Ok` を返す。
/// CGI環境変数が無い場合は何も出力せずにエラーを返す。
pub async fn serve_cgi<R: Read, W: Write>(
    handler: Arc<dyn Handler>,
    routes: &RouteTable,
    input: &mut R,
    out: &mut W,
) -> Result<(), Error> {
    let response = process_cgi(handler, routes, input).await?;
    write_response_to(&response, out)
}

/// CGIリクエストを読み込み、ハンドラを実行してレスポンスを返す
///
/// `Err` になるのはCGI環境変数が無い場合のみ。
pub async fn process_cgi<R: Read>(
    handler: Arc<dyn Handler>,
    routes: &RouteTable,
    input: &mut R,
) -> Result<Response, Error> {
    let ctx = match CgiContext::from_env_with_input(input) {
        Ok(ctx) => ctx,
        Err(e @ Error::ConfigurationError(_)) => return Err(e),
        Err(e) => {
            error!("Failed to read CGI request: {}", e);
            return Ok(Response::from_error(&e));
        }
    };
    let ctx = Arc::new(ctx.with_routes(routes));
    let method = ctx.request().method.clone();
    let path = ctx.request().path.clone();
    debug!("Processing CGI request: {} {}", method, path);

    // ハンドラ内でのpanicを検知するためにspawnしてJoinErrorを検査
    let host_ctx: Arc<dyn HostContext> = ctx.clone();
    let task_result = task::spawn(async move { handler.handle(host_ctx).await }).await;

    let response = match task_result {
        Ok(Ok(())) => ctx.take_response(),
        Ok(Err(err)) => {
            error!("Handler returned error: {}", err);
            log_error_to_file(&format!("Handler returned error at {} {}: {:?}", method, path, err));
            Response::from_error(&err)
        }
        Err(join_err) => {
            let panic_info = if join_err.is_panic() {
                "panic occurred in handler".to_string()
            } else {
                format!("task cancelled: {}", join_err)
            };
            error!("{}", panic_info);
            log_error_to_file(&format!("{} at {} {}", panic_info, method, path));
            if join_err.is_panic() {
                log_error_to_file(&gather_cgi_panic_context(&method, &path));
            }
            Response::from_error(&Error::InternalServerError(panic_info))
        }
    };

    info!("CGI request processed: {} {} -> {}", method, path, response.status);
    Ok(response)
}
