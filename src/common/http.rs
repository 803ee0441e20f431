//! HTTP関連の基本型（ホスト非依存のリクエスト/レスポンス表現）

use std::fmt;
use bytes::Bytes;
use http::header::{HeaderMap, HeaderName, HeaderValue};
use log::warn;
use serde::de::DeserializeOwned;
use crate::error::Error;

/// HTTPステータスコード
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusCode {
    // 2xx Success
    Ok = 200,
    Created = 201,
    NoContent = 204,

    // 3xx Redirection
    MovedPermanently = 301,
    Found = 302,
    SeeOther = 303,
    NotModified = 304,
    TemporaryRedirect = 307,

    // 4xx Client Error
    BadRequest = 400,
    Unauthorized = 401,
    Forbidden = 403,
    NotFound = 404,
    MethodNotAllowed = 405,
    Conflict = 409,
    PayloadTooLarge = 413,
    UnprocessableEntity = 422,
    TooManyRequests = 429,

    // 5xx Server Error
    InternalServerError = 500,
    NotImplemented = 501,
    BadGateway = 502,
    ServiceUnavailable = 503,
}

impl StatusCode {
    /// u16の値を取得
    pub fn as_u16(&self) -> u16 {
        *self as u16
    }

    /// u16から既知のステータスコードに変換
    pub fn from_u16(code: u16) -> Option<Self> {
        let status = match code {
            200 => StatusCode::Ok,
            201 => StatusCode::Created,
            204 => StatusCode::NoContent,
            301 => StatusCode::MovedPermanently,
            302 => StatusCode::Found,
            303 => StatusCode::SeeOther,
            304 => StatusCode::NotModified,
            307 => StatusCode::TemporaryRedirect,
            400 => StatusCode::BadRequest,
            401 => StatusCode::Unauthorized,
            403 => StatusCode::Forbidden,
            404 => StatusCode::NotFound,
            405 => StatusCode::MethodNotAllowed,
            409 => StatusCode::Conflict,
            413 => StatusCode::PayloadTooLarge,
            422 => StatusCode::UnprocessableEntity,
            429 => StatusCode::TooManyRequests,
            500 => StatusCode::InternalServerError,
            501 => StatusCode::NotImplemented,
            502 => StatusCode::BadGateway,
            503 => StatusCode::ServiceUnavailable,
            _ => return None,
        };
        Some(status)
    }

    /// 理由句を取得
    pub fn reason_phrase(&self) -> &'static str {
        match self {
            StatusCode::Ok => "OK",
            StatusCode::Created => "Created",
            StatusCode::NoContent => "No Content",
            StatusCode::MovedPermanently => "Moved Permanently",
            StatusCode::Found => "Found",
            StatusCode::SeeOther => "See Other",
            StatusCode::NotModified => "Not Modified",
            StatusCode::TemporaryRedirect => "Temporary Redirect",
            StatusCode::BadRequest => "Bad Request",
            StatusCode::Unauthorized => "Unauthorized",
            StatusCode::Forbidden => "Forbidden",
            StatusCode::NotFound => "Not Found",
            StatusCode::MethodNotAllowed => "Method Not Allowed",
            StatusCode::Conflict => "Conflict",
            StatusCode::PayloadTooLarge => "Payload Too Large",
            StatusCode::UnprocessableEntity => "Unprocessable Entity",
            StatusCode::TooManyRequests => "Too Many Requests",
            StatusCode::InternalServerError => "Internal Server Error",
            StatusCode::NotImplemented => "Not Implemented",
            StatusCode::BadGateway => "Bad Gateway",
            StatusCode::ServiceUnavailable => "Service Unavailable",
        }
    }

    /// 成功ステータスかどうか判定
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.as_u16())
    }

    /// リダイレクトかどうか判定
    pub fn is_redirection(&self) -> bool {
        (300..400).contains(&self.as_u16())
    }

    /// クライアントエラーかどうか判定
    pub fn is_client_error(&self) -> bool {
        (400..500).contains(&self.as_u16())
    }

    /// サーバーエラーかどうか判定
    pub fn is_server_error(&self) -> bool {
        (500..600).contains(&self.as_u16())
    }
}

impl From<StatusCode> for u16 {
    fn from(status: StatusCode) -> u16 {
        status.as_u16()
    }
}

/// 任意のステータスコードの理由句（未知のものは "Unknown"）
pub fn reason_phrase_for(code: u16) -> &'static str {
    StatusCode::from_u16(code).map_or("Unknown", |s| s.reason_phrase())
}

/// HTTPメソッド
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum Method {
    GET,
    POST,
    PUT,
    DELETE,
    PATCH,
    HEAD,
    OPTIONS,
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Method::GET => write!(f, "GET"),
            Method::POST => write!(f, "POST"),
            Method::PUT => write!(f, "PUT"),
            Method::DELETE => write!(f, "DELETE"),
            Method::PATCH => write!(f, "PATCH"),
            Method::HEAD => write!(f, "HEAD"),
            Method::OPTIONS => write!(f, "OPTIONS"),
        }
    }
}

impl Method {
    /// 文字列からMethodに変換
    pub fn from_str(method: &str) -> Option<Self> {
        match method.to_uppercase().as_str() {
            "GET" => Some(Method::GET),
            "POST" => Some(Method::POST),
            "PUT" => Some(Method::PUT),
            "DELETE" => Some(Method::DELETE),
            "PATCH" => Some(Method::PATCH),
            "HEAD" => Some(Method::HEAD),
            "OPTIONS" => Some(Method::OPTIONS),
            _ => None,
        }
    }
}

/// ホストから取り込んだHTTPリクエストのスナップショット
///
/// 各ホストはプラットフォーム固有のリクエストをこの形に変換する。
/// ボディは `Bytes` で保持するため、何度読んでも消費されない。
#[derive(Debug, Clone)]
pub struct Request {
    /// HTTPメソッド（ホストが渡した文字列のまま）
    pub method: String,
    /// リクエストパス
    pub path: String,
    /// アプリケーションのベースパス
    pub path_base: String,
    /// スキーム（http / https）
    pub scheme: String,
    /// ホスト名（ポートを含まない）
    pub host: Option<String>,
    /// ポート番号
    pub port: Option<u16>,
    /// 生のクエリ文字列（先頭の `?` を含まない）
    pub raw_query: String,
    /// HTTPヘッダー（名前は大文字小文字を区別しない）
    pub headers: HeaderMap,
    /// リクエストボディ
    pub body: Bytes,
    /// 接続元アドレス
    pub remote_addr: Option<String>,
    /// ルート値（テンプレートのキャプチャなど）
    pub route_values: Vec<(String, String)>,
}

impl Request {
    /// 新しいリクエストを作成
    pub fn new(method: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            path: path.into(),
            path_base: String::new(),
            scheme: "http".to_string(),
            host: None,
            port: None,
            raw_query: String::new(),
            headers: HeaderMap::new(),
            body: Bytes::new(),
            remote_addr: None,
            route_values: Vec::new(),
        }
    }

    /// ヘッダーを追加（無効な名前・値は無視してログに残す）
    pub fn with_header(mut self, key: impl AsRef<str>, value: impl AsRef<str>) -> Self {
        self.append_header(key.as_ref(), value.as_ref());
        self
    }

    /// ヘッダーを追加（同名ヘッダーは複数値として保持）
    pub fn append_header(&mut self, key: &str, value: &str) -> bool {
        match (HeaderName::from_bytes(key.as_bytes()), HeaderValue::from_str(value)) {
            (Ok(name), Ok(value)) => {
                self.headers.append(name, value);
                true
            }
            _ => {
                warn!("Request header skipped (invalid name or value): {:?}", key);
                false
            }
        }
    }

    /// 生のクエリ文字列を設定（先頭の `?` は取り除く）
    pub fn with_query(mut self, raw_query: impl Into<String>) -> Self {
        let raw: String = raw_query.into();
        self.raw_query = raw.strip_prefix('?').map(str::to_string).unwrap_or(raw);
        self
    }

    /// ボディを追加
    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    /// ベースパスを設定
    pub fn with_path_base(mut self, path_base: impl Into<String>) -> Self {
        self.path_base = path_base.into();
        self
    }

    /// スキームを設定
    pub fn with_scheme(mut self, scheme: impl Into<String>) -> Self {
        self.scheme = scheme.into();
        self
    }

    /// ホスト名とポートを設定
    pub fn with_host(mut self, host: impl Into<String>, port: Option<u16>) -> Self {
        self.host = Some(host.into());
        self.port = port;
        self
    }

    /// 接続元アドレスを設定
    pub fn with_remote_addr(mut self, addr: impl Into<String>) -> Self {
        self.remote_addr = Some(addr.into());
        self
    }

    /// ルート値を追加（同名は上書き）
    pub fn with_route_value(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        let key = key.into();
        let value = value.into();
        match self.route_values.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = value,
            None => self.route_values.push((key, value)),
        }
        self
    }

    /// ヘッダー値を取得（複数値はカンマで連結）
    pub fn header(&self, key: &str) -> Option<String> {
        let values: Vec<&str> = self
            .headers
            .get_all(key)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .collect();
        if values.is_empty() {
            None
        } else {
            Some(values.join(","))
        }
    }

    /// ボディをJSONとしてパース
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, Error> {
        if self.body.is_empty() {
            return Err(Error::InvalidRequestBody("No request body".to_string()));
        }
        serde_json::from_slice(&self.body)
            .map_err(|e| Error::InvalidRequestBody(e.to_string()))
    }
}

/// ホストへ書き戻すHTTPレスポンスの記録
#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    /// HTTPステータスコード
    pub status: u16,
    /// HTTPヘッダー（Content-Type と Set-Cookie を除く）
    pub headers: Vec<(String, String)>,
    /// Set-Cookieヘッダー値
    pub cookies: Vec<String>,
    /// Content-Type
    pub content_type: Option<String>,
    /// レスポンスボディ
    pub body: Vec<u8>,
    /// レスポンスが確定済みかどうか
    pub ended: bool,
}

impl Default for Response {
    fn default() -> Self {
        Self::new(200)
    }
}

impl Response {
    /// 新しいレスポンスを作成
    pub fn new(status: u16) -> Self {
        Self {
            status,
            headers: Vec::new(),
            cookies: Vec::new(),
            content_type: None,
            body: Vec::new(),
            ended: false,
        }
    }

    /// StatusCodeから新しいレスポンスを作成
    pub fn with_status(status: StatusCode) -> Self {
        Self::new(status.as_u16())
    }

    /// 200 OKレスポンスを作成
    pub fn ok() -> Self {
        Self::new(200)
    }

    /// 404 Not Foundレスポンスを作成
    pub fn not_found() -> Self {
        Self::new(404)
    }

    /// 500 Internal Server Errorレスポンスを作成
    pub fn internal_server_error() -> Self {
        Self::new(500)
    }

    /// ヘッダーを追加（無効な値は無視）
    pub fn with_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        let key = key.into();
        let value = value.into();
        if super::utils::validate_header(&key, &value).is_ok() {
            self.set_header(key, value);
        } else {
            warn!("Response header skipped (invalid name or value): {:?}", key);
        }
        self
    }

    /// ボディを追加
    pub fn with_body(mut self, body: Vec<u8>) -> Self {
        self.body = body;
        self
    }

    /// Content-Typeを設定
    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    /// ヘッダーを設定（同名ヘッダーは大文字小文字を無視して置き換える）
    pub fn set_header(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        if key.eq_ignore_ascii_case("Content-Type") {
            self.content_type = Some(value);
            return;
        }
        if key.eq_ignore_ascii_case("Set-Cookie") {
            self.cookies.push(value);
            return;
        }
        match self.headers.iter_mut().find(|(k, _)| k.eq_ignore_ascii_case(&key)) {
            Some(entry) => entry.1 = value,
            None => self.headers.push((key, value)),
        }
    }

    /// ヘッダー値を取得（大文字小文字を区別しない）
    pub fn header(&self, key: &str) -> Option<&str> {
        if key.eq_ignore_ascii_case("Content-Type") {
            return self.content_type.as_deref();
        }
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, v)| v.as_str())
    }

    /// 出力用のヘッダー一覧（Content-Type と Set-Cookie を含む）
    pub fn header_lines(&self) -> Vec<(String, String)> {
        let mut lines = self.headers.clone();
        if let Some(ct) = &self.content_type {
            lines.push(("Content-Type".to_string(), ct.clone()));
        }
        for cookie in &self.cookies {
            lines.push(("Set-Cookie".to_string(), cookie.clone()));
        }
        lines
    }

    /// ボディを文字列として取得
    pub fn body_text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    /// Error型から固定メッセージのレスポンスを生成
    pub fn from_error(error: &Error) -> Self {
        let status = error.status_code();
        let message = match status {
            400 => "Bad Request",
            401 => "Unauthorized",
            403 => "Forbidden",
            404 => "Not Found",
            413 => "Payload Too Large",
            500 | 502 => "Internal Server Error",
            _ => "Error",
        };
        Response::new(status)
            .with_content_type("text/plain")
            .with_body(message.as_bytes().to_vec())
    }
}
