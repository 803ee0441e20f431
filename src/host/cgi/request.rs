//! CGI環境変数と標準入力からのリクエスト構築

use std::env;
use std::io::Read;
use bytes::Bytes;

use crate::common::{get_max_body_size, split_host_port, Request};
use crate::error::Error;

/// `HTTP_X_AUTH_TOKEN` -> `X-Auth-Token` のようにヘッダー名へ変換する
fn meta_variable_to_header_name(name: &str) -> String {
    name.split('_')
        .map(|part| {
            let mut chars = part.chars();
            match chars.next() {
                None => String::new(),
                Some(c) => c.to_ascii_uppercase().to_string() + &chars.as_str().to_ascii_lowercase(),
            }
        })
        .collect::<Vec<String>>()
        .join("-")
}

/// 環境変数からHTTPヘッダーを取得する（名前順）
///
/// `CONTENT_TYPE` / `CONTENT_LENGTH` は同名の `HTTP_*` より優先する。
pub fn cgi_headers() -> Vec<(String, String)> {
    let mut headers: Vec<(String, u8, String)> = env::vars()
        .filter_map(|(key, value)| {
            let (name, rank) = if let Some(rest) = key.strip_prefix("HTTP_") {
                (meta_variable_to_header_name(rest), 1)
            } else if key == "CONTENT_TYPE" || key == "CONTENT_LENGTH" {
                (meta_variable_to_header_name(&key), 0)
            } else {
                return None;
            };
            if name.is_empty() {
                return None;
            }
            Some((name, rank, value))
        })
        .collect();
    headers.sort_by(|a, b| {
        a.0.to_ascii_lowercase()
            .cmp(&b.0.to_ascii_lowercase())
            .then(a.1.cmp(&b.1))
    });
    headers.dedup_by(|later, earlier| later.0.eq_ignore_ascii_case(&earlier.0));
    headers.into_iter().map(|(name, _, value)| (name, value)).collect()
}

/// `HTTPS` / `REQUEST_SCHEME` からスキームを決定する
pub fn cgi_scheme() -> String {
    let https = env::var("HTTPS").unwrap_or_default();
    if https.eq_ignore_ascii_case("on") || https == "1" {
        return "https".to_string();
    }
    env::var("REQUEST_SCHEME")
        .ok()
        .map(|s| s.to_ascii_lowercase())
        .filter(|s| s == "http" || s == "https")
        .unwrap_or_else(|| "http".to_string())
}

/// Hostヘッダー（無ければ `SERVER_NAME` / `SERVER_PORT`）からホストとポートを決定する
///
/// `SERVER_PORT` がスキームの既定ポートの場合は省略する。
pub fn cgi_host(scheme: &str) -> (Option<String>, Option<u16>) {
    if let Some(host_header) = env::var("HTTP_HOST").ok().filter(|h| !h.is_empty()) {
        let (host, port) = split_host_port(&host_header);
        return (Some(host), port);
    }

    let host = env::var("SERVER_NAME").ok().filter(|s| !s.is_empty());
    let default_port = if scheme == "https" { 443 } else { 80 };
    let port = env::var("SERVER_PORT")
        .ok()
        .and_then(|p| p.parse::<u16>().ok())
        .filter(|p| *p != default_port);
    (host, port)
}

/// リクエストボディを読み込む（`CONTENT_LENGTH` 分、上限超過は413）
pub fn read_request_body<R: Read>(input: &mut R) -> Result<Bytes, Error> {
    let content_length = env::var("CONTENT_LENGTH")
        .ok()
        .and_then(|s| s.trim().parse::<usize>().ok())
        .unwrap_or(0);
    if content_length == 0 {
        return Ok(Bytes::new());
    }

    let max_body_size = get_max_body_size();
    if content_length > max_body_size {
        return Err(Error::PayloadTooLarge(format!(
            "Request body size {} bytes exceeds maximum allowed size {} bytes",
            content_length, max_body_size
        )));
    }

    let mut buffer = vec![0u8; content_length];
    input.read_exact(&mut buffer).map_err(|e| {
        Error::InvalidRequestBody(format!("Failed to read request body: {}", e))
    })?;
    Ok(Bytes::from(buffer))
}

/// CGI環境変数と入力からリクエストを構築する
pub fn request_from_env<R: Read>(input: &mut R) -> Result<Request, Error> {
    let method = env::var("REQUEST_METHOD").map_err(|_| {
        Error::ConfigurationError("REQUEST_METHOD environment variable not set".to_string())
    })?;
    let path = env::var("PATH_INFO")
        .ok()
        .filter(|p| !p.is_empty())
        .unwrap_or_else(|| "/".to_string());
    let script_name = env::var("SCRIPT_NAME").unwrap_or_default();
    let query_string = env::var("QUERY_STRING").unwrap_or_default();
    let scheme = cgi_scheme();
    let (host, port) = cgi_host(&scheme);

    let mut request = Request::new(method, path)
        .with_path_base(script_name)
        .with_scheme(scheme)
        .with_query(query_string);
    request.host = host;
    request.port = port;
    request.remote_addr = env::var("REMOTE_ADDR").ok().filter(|a| !a.is_empty());

    for (name, value) in cgi_headers() {
        request.append_header(&name, &value);
    }

    request.body = read_request_body(input)?;
    Ok(request)
}
