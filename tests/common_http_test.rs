// ホスト非依存のリクエスト/レスポンス表現と共通ユーティリティの統合テスト
use hostbridge::common::http::{reason_phrase_for, Method, Request, Response, StatusCode};
use hostbridge::common::{get_max_body_size, parse_cookie_header, parse_query_string, percent_decode, Cookie};
use hostbridge::error::Error;
use serde::Deserialize;

#[test]
fn test_method_from_str() {
    assert_eq!(Method::from_str("GET"), Some(Method::GET));
    assert_eq!(Method::from_str("get"), Some(Method::GET));
    assert_eq!(Method::from_str("POST"), Some(Method::POST));
    assert_eq!(Method::from_str("PUT"), Some(Method::PUT));
    assert_eq!(Method::from_str("DELETE"), Some(Method::DELETE));
    assert_eq!(Method::from_str("PATCH"), Some(Method::PATCH));
    assert_eq!(Method::from_str("HEAD"), Some(Method::HEAD));
    assert_eq!(Method::from_str("OPTIONS"), Some(Method::OPTIONS));
    assert_eq!(Method::from_str("INVALID"), None);
    assert_eq!(Method::PATCH.to_string(), "PATCH");
}

#[test]
fn test_request_builder() {
    let req = Request::new("GET", "/test")
        .with_query("?key1=value1&key2=value2")
        .with_header("Content-Type", "application/json")
        .with_scheme("https")
        .with_host("example.com", Some(8443))
        .with_route_value("id", "1")
        .with_route_value("id", "2")
        .with_body(b"test body".to_vec());

    assert_eq!(req.method, "GET");
    assert_eq!(req.path, "/test");
    assert_eq!(req.raw_query, "key1=value1&key2=value2");
    assert_eq!(req.header("content-type").as_deref(), Some("application/json"));
    assert_eq!(req.header("CONTENT-TYPE").as_deref(), Some("application/json"));
    assert_eq!(req.scheme, "https");
    assert_eq!(req.port, Some(8443));
    assert_eq!(req.route_values, vec![("id".to_string(), "2".to_string())]);
    assert_eq!(&req.body[..], b"test body");
}

#[test]
fn test_request_header_rejects_crlf() {
    let req = Request::new("GET", "/")
        .with_header("X-Test", "ok-value")
        .with_header("X-Bad", "bad\r\ninjected: 1")
        .with_header("Bad Name", "v");
    assert_eq!(req.header("x-test").as_deref(), Some("ok-value"));
    assert!(req.header("x-bad").is_none());
    assert_eq!(req.headers.len(), 1);
}

#[test]
fn test_request_multi_value_header() {
    let req = Request::new("GET", "/")
        .with_header("Accept", "text/html")
        .with_header("accept", "application/json");
    assert_eq!(req.header("Accept").as_deref(), Some("text/html,application/json"));
}

#[derive(Debug, Deserialize, PartialEq)]
struct Payload {
    name: String,
    value: i32,
}

#[test]
fn test_request_json() {
    let req = Request::new("POST", "/").with_body(r#"{"name":"test","value":42}"#);
    let payload: Payload = req.json().unwrap();
    assert_eq!(payload, Payload { name: "test".into(), value: 42 });

    let empty = Request::new("POST", "/");
    assert!(matches!(empty.json::<Payload>(), Err(Error::InvalidRequestBody(_))));

    let broken = Request::new("POST", "/").with_body("{oops");
    assert!(matches!(broken.json::<Payload>(), Err(Error::InvalidRequestBody(_))));
}

#[test]
fn test_response_headers() {
    let mut res = Response::ok()
        .with_header("X-Test", "1")
        .with_header("X-Evil", "evil\nvalue")
        .with_content_type("text/plain")
        .with_body(b"Hello, world!".to_vec());
    res.set_header("x-test", "2");
    res.set_header("Set-Cookie", "a=1");

    assert_eq!(res.status, 200);
    assert_eq!(res.header("X-TEST"), Some("2"));
    assert!(res.header("X-Evil").is_none());
    assert_eq!(res.header("content-type"), Some("text/plain"));
    assert_eq!(res.body_text(), "Hello, world!");
    assert_eq!(
        res.header_lines(),
        vec![
            ("X-Test".to_string(), "2".to_string()),
            ("Content-Type".to_string(), "text/plain".to_string()),
            ("Set-Cookie".to_string(), "a=1".to_string()),
        ]
    );
}

#[test]
fn test_response_from_error_hides_details() {
    let res = Response::from_error(&Error::InvalidHeader("secret detail".into()));
    assert_eq!(res.status, 400);
    assert_eq!(res.body_text(), "Bad Request");

    let res = Response::from_error(&Error::ConfigurationError("no context".into()));
    assert_eq!(res.status, 500);
    assert_eq!(res.body_text(), "Internal Server Error");
    assert_eq!(res.content_type.as_deref(), Some("text/plain"));

    let res = Response::from_error(&Error::PayloadTooLarge("too big".into()));
    assert_eq!(res.status, 413);
    assert_eq!(res.body_text(), "Payload Too Large");
}

#[test]
fn test_status_code() {
    assert_eq!(StatusCode::Found.as_u16(), 302);
    assert_eq!(StatusCode::from_u16(404), Some(StatusCode::NotFound));
    assert_eq!(StatusCode::from_u16(299), None);
    assert!(StatusCode::Created.is_success());
    assert!(StatusCode::TemporaryRedirect.is_redirection());
    assert!(StatusCode::TooManyRequests.is_client_error());
    assert!(StatusCode::BadGateway.is_server_error());
    assert_eq!(reason_phrase_for(413), "Payload Too Large");
    assert_eq!(reason_phrase_for(299), "Unknown");
}

#[test]
fn test_cookie_header_value() {
    let cookie = Cookie::try_new("sid", "abc").unwrap().with_path("/").http_only(true);
    assert_eq!(cookie.to_header_value(), "sid=abc; Path=/; HttpOnly");

    assert!(matches!(Cookie::try_new("bad name", "v"), Err(Error::InvalidCookie(_))));
    assert!(matches!(Cookie::try_new("n", "v;x"), Err(Error::InvalidCookie(_))));
}

#[test]
fn test_parse_helpers() {
    assert_eq!(percent_decode("a%20b+c%zz"), "a b c%zz");
    assert_eq!(
        parse_query_string("?a=1&b=&c&a=3"),
        vec![
            ("a".to_string(), "3".to_string()),
            ("b".to_string(), String::new()),
            ("c".to_string(), String::new()),
        ]
    );
    assert_eq!(
        parse_cookie_header("a=1; b=x=y; broken; =v"),
        vec![("a".to_string(), "1".to_string()), ("b".to_string(), "x=y".to_string())]
    );
}

#[test]
fn test_max_body_size_from_env() {
    temp_env::with_var("HOSTBRIDGE_MAX_BODY_SIZE", Some("1024"), || {
        assert_eq!(get_max_body_size(), 1024);
    });
    temp_env::with_var("HOSTBRIDGE_MAX_BODY_SIZE", Some("not-a-number"), || {
        assert_eq!(get_max_body_size(), 5 * 1024 * 1024);
    });
    temp_env::with_var_unset("HOSTBRIDGE_MAX_BODY_SIZE", || {
        assert_eq!(get_max_body_size(), 5 * 1024 * 1024);
    });
}
