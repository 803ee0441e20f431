//! 共通ユーティリティ関数群（URLエンコード/デコード、クエリ解析、環境設定 等）

use std::env;
use crate::error::Error;

/// セッションIDクッキー名のデフォルト
pub const DEFAULT_SESSION_COOKIE: &str = "hostbridge_session";

/// URLエンコーディングのデコード関数
pub fn percent_decode(input: &str) -> String {
    let bytes = input.as_bytes();
    let mut result = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' && i + 2 < bytes.len() {
            if let (Some(h), Some(l)) = (from_hex(bytes[i + 1]), from_hex(bytes[i + 2])) {
                result.push(h * 16 + l);
                i += 3;
                continue;
            }
        } else if bytes[i] == b'+' {
            result.push(b' ');
            i += 1;
            continue;
        }
        result.push(bytes[i]);
        i += 1;
    }
    String::from_utf8_lossy(&result).into_owned()
}

/// 16進数文字をバイト値に変換するヘルパー関数
fn from_hex(byte: u8) -> Option<u8> {
    match byte {
        b'0'..=b'9' => Some(byte - b'0'),
        b'a'..=b'f' => Some(byte - b'a' + 10),
        b'A'..=b'F' => Some(byte - b'A' + 10),
        _ => None,
    }
}

/// フォーム形式でURLエンコードする（空白は `+`）
pub fn form_encode(input: &str) -> String {
    urlencoding::encode(input).replace("%20", "+")
}

/// クエリ文字列を順序付きのキー/値リストにパースする
///
/// 先頭の `?` は読み飛ばし、`=` のない項目は空文字の値として扱う。
/// 重複キーは最後の値で上書きし、位置は最初の出現を維持する。
pub fn parse_query_string(query_string: &str) -> Vec<(String, String)> {
    let mut params: Vec<(String, String)> = Vec::new();
    let query_string = query_string.strip_prefix('?').unwrap_or(query_string);

    if query_string.is_empty() {
        return params;
    }

    for pair in query_string.split('&') {
        if pair.is_empty() {
            continue;
        }
        let mut parts = pair.splitn(2, '=');
        if let Some(key) = parts.next() {
            let value = parts.next().unwrap_or("");
            let decoded_key = percent_decode(key);
            let decoded_value = percent_decode(value);
            match params.iter_mut().find(|(k, _)| *k == decoded_key) {
                Some(entry) => entry.1 = decoded_value,
                None => params.push((decoded_key, decoded_value)),
            }
        }
    }

    params
}

/// Cookieヘッダーを名前と値のペアに分解する
pub fn parse_cookie_header(header: &str) -> Vec<(String, String)> {
    let mut cookies = Vec::new();
    for cookie_pair in header.split(';') {
        let parts: Vec<&str> = cookie_pair.trim().splitn(2, '=').collect();
        if parts.len() == 2 && !parts[0].is_empty() {
            cookies.push((parts[0].to_string(), parts[1].to_string()));
        }
    }
    cookies
}

/// `host[:port]` を分割する（`[::1]:8080` のようなIPv6表記にも対応）
pub fn split_host_port(value: &str) -> (String, Option<u16>) {
    let (host, port) = if value.starts_with('[') {
        match value.find("]:") {
            Some(idx) => (&value[..=idx], Some(&value[idx + 2..])),
            None => (value, None),
        }
    } else {
        match value.rsplit_once(':') {
            Some((h, p)) => (h, Some(p)),
            None => (value, None),
        }
    };
    match port.map(str::parse::<u16>) {
        Some(Ok(port)) => (host.to_string(), Some(port)),
        Some(Err(_)) => (value.to_string(), None),
        None => (host.to_string(), None),
    }
}

/// リクエストボディの最大サイズ（バイト）を取得する
/// 優先順位: 環境変数 `HOSTBRIDGE_MAX_BODY_SIZE` -> デフォルト 5MB
pub fn get_max_body_size() -> usize {
    const DEFAULT_MAX_SIZE: usize = 5 * 1024 * 1024; // 5MB
    env::var("HOSTBRIDGE_MAX_BODY_SIZE")
        .ok()
        .and_then(|s| s.parse::<usize>().ok())
        .unwrap_or(DEFAULT_MAX_SIZE)
}

/// セッション暗号化用のシークレットを取得する（`HOSTBRIDGE_SESSION_SECRET`、空は未設定扱い）
pub fn get_session_secret() -> Option<String> {
    env::var("HOSTBRIDGE_SESSION_SECRET")
        .ok()
        .filter(|s| !s.is_empty())
}

/// セッションIDを保持するクッキー名を取得する
pub fn get_session_cookie_name() -> String {
    env::var("HOSTBRIDGE_SESSION_COOKIE")
        .ok()
        .filter(|s| is_cookie_name_valid(s))
        .unwrap_or_else(|| DEFAULT_SESSION_COOKIE.to_string())
}

/// エラーログファイルのパスを取得する
pub fn get_error_log_path() -> String {
    env::var("HOSTBRIDGE_ERROR_LOG").unwrap_or_else(|_| "hostbridge_error.log".to_string())
}

/// ヘッダー値に使用可能な文字かを判定（CRLF・制御文字を拒否）
pub fn is_header_value_valid(value: &str) -> bool {
    // obs-textは考慮せず、制御文字(0x00-0x1F, 0x7F)およびCR/LFを拒否する
    if value.is_empty() {
        return true;
    }
    value.chars().all(|c| {
        let code = c as u32;
        code >= 0x20 && code != 0x7F && c != '\r' && c != '\n'
    })
}

/// ヘッダー名が安全なトークンかを判定
pub fn is_header_name_valid(name: &str) -> bool {
    if name.is_empty() { return false; }
    // token = 1*tchar, tchar = "!#$%&'*+-.^_`|~" or DIGIT or ALPHA
    name.chars().all(|c| c.is_ascii_alphanumeric() || matches!(c, '!'|'#'|'$'|'%'|'&'|'\''|'*'|'+'|'-'|'.'|'^'|'_'|'`'|'|'|'~'))
}

/// Cookie名が安全なトークンか（RFC6265準拠の簡易版）
pub fn is_cookie_name_valid(name: &str) -> bool {
    if name.is_empty() { return false; }
    const FORBIDDEN: &[char] = &['(',')','<','>','@',',',';',':','\\','"','/','[',']','?','{','}',' ','\t','\r','\n','='];
    name.chars().all(|c| c.is_ascii() && !c.is_ascii_control() && !FORBIDDEN.contains(&c))
}

/// Cookie値が安全か（RFC6265 cookie-octetの簡易版）
/// 許容: 0x21, 0x23-0x2B, 0x2D-0x3A, 0x3C-0x5B, 0x5D-0x7E
pub fn is_cookie_value_valid(value: &str) -> bool {
    value.chars().all(|c| {
        let b = c as u32;
        matches!(b,
            0x21 |
            0x23..=0x2B |
            0x2D..=0x3A |
            0x3C..=0x5B |
            0x5D..=0x7E
        )
    })
}

/// ヘルパー: 無効なヘッダー名/値ならErrorを返す
pub fn validate_header(name: &str, value: &str) -> Result<(), Error> {
    if !is_header_name_valid(name) {
        return Err(Error::InvalidHeader(format!("header name '{}' contains invalid characters", name)));
    }
    if !is_header_value_valid(value) {
        return Err(Error::InvalidHeader("header value contains control/CRLF or invalid chars".into()));
    }
    Ok(())
}

/// ヘルパー: 無効なCookie名/値ならErrorを返す
pub fn validate_cookie_name_value(name: &str, value: &str) -> Result<(), Error> {
    if !is_cookie_name_valid(name) {
        return Err(Error::InvalidCookie("cookie name contains invalid characters".into()));
    }
    if !is_cookie_value_valid(value) {
        return Err(Error::InvalidCookie("cookie value contains invalid characters".into()));
    }
    Ok(())
}


#[cfg(test)]
mod sec_tests {
    use super::*;

    #[test]
    fn header_value_rejects_crlf_and_ctl() {
        assert!(is_header_value_valid("normal-Value_123"));
        assert!(!is_header_value_valid("bad\rvalue"));
        assert!(!is_header_value_valid("bad\nvalue"));
        assert!(!is_header_value_valid("bad\x07bell"));
    }

    #[test]
    fn header_name_validation() {
        assert!(validate_header("X-Test", "ok").is_ok());
        assert!(validate_header("Bad Name", "ok").is_err());
        assert!(validate_header("", "ok").is_err());
        assert!(validate_header("X-Test", "a\r\nb").is_err());
    }

    #[test]
    fn cookie_name_and_value_validation() {
        assert!(is_cookie_name_valid("SESSIONID"));
        assert!(!is_cookie_name_valid("bad name"));
        assert!(!is_cookie_name_valid("bad;name"));

        assert!(is_cookie_value_valid("abcDEF123-_.:~"));
        assert!(!is_cookie_value_valid("bad;value"));
        assert!(!is_cookie_value_valid("bad,value"));
        assert!(!is_cookie_value_valid("bad\nvalue"));
    }
}
