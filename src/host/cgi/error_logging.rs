//! CGIエラーのファイル記録と機密値のマスク

use std::env;
use std::fs::OpenOptions;
use std::io::Write;
use chrono::{Local, Utc};
use log::warn;

use crate::common::get_error_log_path;

/// マスク対象とみなすキーの断片
const SENSITIVE_PATTERNS: &[&str] = &[
    "authorization",
    "cookie",
    "token",
    "secret",
    "password",
    "pass",
    "api-key",
    "api_key",
    "apikey",
    "jwt",
    "auth",
    "session",
    "csrf",
    "signature",
    "private",
    "key",
    "credential",
    "bearer",
];

/// ログに残す値の最大文字数
const MAX_LOGGED_VALUE_CHARS: usize = 200;

/// エラー内容をログファイル（`HOSTBRIDGE_ERROR_LOG`）に追記する
pub fn log_error_to_file(message: &str) {
    let path = get_error_log_path();
    let file = OpenOptions::new().create(true).append(true).open(&path);
    let mut file = match file {
        Ok(f) => f,
        Err(e) => {
            warn!("Failed to open error log {:?}: {}", path, e);
            return;
        }
    };

    let separator = "=".repeat(80);
    let entry = format!(
        "{sep}\nHOSTBRIDGE CGI ERROR\nTimestamp (UTC): {utc}\nTimestamp (Local): {local}\nProcess ID: {pid}\n{dash}\n{message}\n{sep}\n\n",
        sep = separator,
        dash = "-".repeat(80),
        utc = Utc::now().format("%Y-%m-%d %H:%M:%S%.3f UTC"),
        local = Local::now().format("%Y-%m-%d %H:%M:%S%.3f %Z"),
        pid = std::process::id(),
        message = message,
    );
    if let Err(e) = file.write_all(entry.as_bytes()) {
        warn!("Failed to write error log {:?}: {}", path, e);
    }
}

/// panic時に記録するCGI環境の詳細（機密値はマスク）を構築する
pub fn gather_cgi_panic_context(method: &str, path: &str) -> String {
    let mut lines = vec![
        "CGI panic context:".to_string(),
        format!("  REQUEST_METHOD={}", method),
        format!("  PATH_INFO={}", path),
    ];

    let basic_vars = [
        "SCRIPT_NAME",
        "QUERY_STRING",
        "CONTENT_TYPE",
        "CONTENT_LENGTH",
        "SERVER_PROTOCOL",
        "SERVER_NAME",
        "SERVER_PORT",
        "REMOTE_ADDR",
        "HTTPS",
    ];
    for key in basic_vars {
        if let Ok(val) = env::var(key) {
            lines.push(format!("  {}={}", key, redact_value_for_log(key, &val)));
        }
    }

    lines.push("  HTTP headers:".to_string());
    let mut http_vars: Vec<(String, String)> = env::vars()
        .filter(|(k, _)| k.starts_with("HTTP_"))
        .collect();
    http_vars.sort();
    if http_vars.is_empty() {
        lines.push("    (none)".to_string());
    }
    for (key, val) in http_vars {
        lines.push(format!("    {}={}", key, redact_value_for_log(&key, &val)));
    }

    lines.join("\n")
}

/// ログ出力用に値をマスク・切り詰める
pub fn redact_value_for_log(key: &str, value: &str) -> String {
    let key_l = key.to_ascii_lowercase();
    if key_l == "query_string" {
        return redact_query_string(value);
    }
    if is_sensitive_key_like(&key_l) {
        return "***redacted***".to_string();
    }
    if value.chars().count() > MAX_LOGGED_VALUE_CHARS {
        let head: String = value.chars().take(MAX_LOGGED_VALUE_CHARS).collect();
        format!("{}...[truncated]", head)
    } else {
        value.to_string()
    }
}

/// 機密情報を含みそうなキーか（小文字で渡す）
pub fn is_sensitive_key_like(lower_key: &str) -> bool {
    SENSITIVE_PATTERNS.iter().any(|p| lower_key.contains(p))
}

/// クエリ文字列中の機密パラメータをマスクする
pub fn redact_query_string(qs: &str) -> String {
    qs.split('&')
        .filter(|part| !part.is_empty())
        .map(|part| {
            let (k, v) = part.split_once('=').unwrap_or((part, ""));
            if is_sensitive_key_like(&k.to_ascii_lowercase()) {
                format!("{}=***redacted***", k)
            } else {
                format!("{}={}", k, v)
            }
        })
        .collect::<Vec<_>>()
        .join("&")
}
