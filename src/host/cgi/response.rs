//! CGIレスポンスの出力機能

use std::io::{self, Write};
use log::error;

use crate::common::{reason_phrase_for, Response};
use crate::error::Error;
use super::error_logging::log_error_to_file;

/// CGI出力用のヘッダー名か（ASCII英数字とハイフンのみ）
fn is_cgi_header_name(name: &str) -> bool {
    !name.is_empty() && name.bytes().all(|c| c.is_ascii_alphanumeric() || c == b'-')
}

/// CGI出力用のヘッダー値か（HTAB・SP・可視ASCIIのみ）
fn is_cgi_header_value(value: &str) -> bool {
    value
        .bytes()
        .all(|c| c == b'\t' || c == b' ' || (0x21..=0x7e).contains(&c))
}

fn write_line<W: Write>(out: &mut W, line: &str, what: &str) -> Result<(), Error> {
    out.write_all(line.as_bytes())
        .and_then(|_| out.write_all(b"\r\n"))
        .map_err(|e| Error::InternalServerError(format!("Failed to write {}: {}", what, e)))
}

/// 出力前に全ヘッダーを検証する（不正があれば400に差し替える）
fn sanitize(response: &Response) -> Response {
    let lines = response.header_lines();
    let invalid = lines.iter().find(|(name, value)| {
        !is_cgi_header_name(name) || !is_cgi_header_value(value)
    });

    match invalid {
        Some((name, value)) => {
            error!("Invalid header detected - name: {:?}, value: {:?}", name, value);
            log_error_to_file(&format!(
                "CRLF injection attempt detected in header: {:?}: {:?}",
                name, value
            ));
            Response::new(400)
                .with_content_type("text/plain; charset=utf-8")
                .with_body(b"Bad Request: Invalid header".to_vec())
        }
        None => response.clone(),
    }
}

/// レスポンスを任意のライターへ書き出す
///
/// `Status:` 行、ヘッダー、Cookieごとの `Set-Cookie` 行、`Content-Length`、空行、ボディの順に出力する。
pub fn write_response_to<W: Write>(response: &Response, out: &mut W) -> Result<(), Error> {
    let response = sanitize(response);

    write_line(
        out,
        &format!("Status: {} {}", response.status, reason_phrase_for(response.status)),
        "status line",
    )?;

    for (name, value) in &response.headers {
        // 予約ヘッダーはフレームワーク側で出力する
        if name.eq_ignore_ascii_case("Status") || name.eq_ignore_ascii_case("Content-Length") {
            continue;
        }
        write_line(out, &format!("{}: {}", name, value), "header")?;
    }

    if let Some(content_type) = &response.content_type {
        write_line(out, &format!("Content-Type: {}", content_type), "Content-Type")?;
    }

    for cookie in &response.cookies {
        write_line(out, &format!("Set-Cookie: {}", cookie), "Set-Cookie header")?;
    }

    if !response.body.is_empty() {
        write_line(out, &format!("Content-Length: {}", response.body.len()), "Content-Length")?;
    }

    out.write_all(b"\r\n").map_err(|e| {
        Error::InternalServerError(format!("Failed to write header/body separator: {}", e))
    })?;

    out.write_all(&response.body).map_err(|e| {
        Error::InternalServerError(format!("Failed to write response body: {}", e))
    })?;

    Ok(())
}

/// レスポンスを標準出力に書き出す
pub fn write_response(response: &Response) -> Result<(), Error> {
    let mut out = io::stdout().lock();
    let res = write_response_to(response, &mut out);
    out.flush().map_err(|e| Error::InternalServerError(format!("Failed to flush stdout: {}", e)))?;
    res
}
