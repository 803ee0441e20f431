//! インテグレーションテスト（インメモリホスト上でのファサードの組み合わせ）

use std::sync::Arc;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use hostbridge::host::{MemoryContext, MemorySession, RouteTable};
use hostbridge::{
    ContextSlot, Error, Handler, HostContext, QueryStore, RequestView, ResponseView, RouteView, SessionBag,
    SessionStore,
};

#[derive(Serialize, Deserialize, Debug, PartialEq)]
struct ItemRequest {
    name: String,
    description: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, PartialEq)]
struct ItemResponse {
    id: String,
    name: String,
    page: i32,
}

/// ルート値・クエリ・ボディ・セッションを使うハンドラー
struct ItemsHandler;

#[async_trait]
impl Handler for ItemsHandler {
    async fn handle(&self, ctx: Arc<dyn HostContext>) -> Result<(), Error> {
        let req = RequestView::new(&ctx)?;
        let route = RouteView::new(&ctx)?;
        let query = QueryStore::new(&ctx)?;
        let session = SessionStore::new(&ctx)?;
        let res = ResponseView::new(&ctx)?;

        if session.get_string("user").is_none() {
            return res.redirect("/login");
        }

        let item: ItemRequest = req.try_body_as_json()?;
        let body = ItemResponse {
            id: route.route_value("id").unwrap_or("new").to_string(),
            name: item.name,
            page: query.get_as("page", 1),
        };
        session.set("last_item", &body)?;
        res.set_status_code(201)?;
        res.write(&serde_json::to_string(&body)?, Some("application/json"))
    }
}

fn routes() -> RouteTable {
    RouteTable::new()
        .route(r"^/items/(?P<id>[^/]+)$", &[("controller", "items")])
        .unwrap()
}

fn context(session: Arc<dyn SessionBag>, body: &str) -> Arc<dyn HostContext> {
    let mut builder = MemoryContext::builder()
        .method("POST")
        .path("/items/42")
        .query("page=3")
        .header("Content-Type", "application/json")
        .body(body.to_string())
        .with_shared_session(session);
    for (k, v) in routes().resolve("/items/42").unwrap() {
        builder = builder.route_value(k, v);
    }
    builder.build()
}

#[tokio::test]
async fn test_handler_workflow() {
    let session: Arc<dyn SessionBag> = Arc::new(MemorySession::new());
    let body = r#"{"name":"Widget","description":null}"#;

    // 未ログイン
    let ctx = context(Arc::clone(&session), body);
    ItemsHandler.handle(Arc::clone(&ctx)).await.unwrap();
    let res = ctx.response().snapshot();
    assert_eq!(res.status, 302);
    assert_eq!(res.header("Location"), Some("/login"));

    // ログイン後
    session.set("user", "alice".to_string());
    let ctx = context(Arc::clone(&session), body);
    ItemsHandler.handle(Arc::clone(&ctx)).await.unwrap();
    let res = ctx.response().snapshot();
    assert_eq!(res.status, 201);
    let item: ItemResponse = serde_json::from_slice(&res.body).unwrap();
    assert_eq!(item, ItemResponse { id: "42".into(), name: "Widget".into(), page: 3 });

    let store = SessionStore::from_bag(session);
    assert_eq!(store.try_get::<ItemResponse>("last_item").unwrap(), Some(item));
}

#[tokio::test]
async fn test_handler_error_for_invalid_body() {
    let session: Arc<dyn SessionBag> = Arc::new(MemorySession::new());
    session.set("user", "alice".to_string());
    let ctx = context(session, "{not json");
    let err = ItemsHandler.handle(ctx).await.unwrap_err();
    assert!(matches!(err, Error::InvalidRequestBody(_)));
    assert_eq!(err.status_code(), 400);
}

#[test]
fn test_facades_require_context() {
    let empty = ContextSlot::empty();
    assert!(matches!(RequestView::new(&empty), Err(Error::ConfigurationError(_))));
    assert!(matches!(ResponseView::new(&empty), Err(Error::ConfigurationError(_))));
    assert!(matches!(RouteView::new(&empty), Err(Error::ConfigurationError(_))));
    assert!(matches!(QueryStore::new(&empty), Err(Error::ConfigurationError(_))));
    assert!(matches!(SessionStore::new(&empty), Err(Error::ConfigurationError(_))));

    let mut slot = ContextSlot::empty();
    slot.set(MemoryContext::builder().query("a=1").build());
    assert_eq!(QueryStore::new(&slot).unwrap().get("a"), Some("1"));
}

#[test]
fn test_views_share_one_response() {
    let ctx = MemoryContext::builder().build();
    let first = ResponseView::new(&ctx).unwrap();
    let second = ResponseView::new(&ctx).unwrap();

    first.write("a", None).unwrap();
    second.write("b", None).unwrap();
    first.set_header("X-One", "1").unwrap();
    second.set_header("x-one", "2").unwrap();

    let res = ctx.response().snapshot();
    assert_eq!(res.body_text(), "ab");
    assert_eq!(res.header("X-One"), Some("2"));
}

/// 大文字小文字の組み合わせ
fn casings(name: &str) -> Vec<String> {
    let chars: Vec<char> = name.chars().collect();
    (0..(1u32 << chars.len().min(10)))
        .map(|mask| {
            chars
                .iter()
                .enumerate()
                .map(|(i, c)| if mask & (1 << i) != 0 { c.to_ascii_uppercase() } else { c.to_ascii_lowercase() })
                .collect()
        })
        .collect()
}

#[test]
fn test_header_lookup_ignores_case_for_every_casing() {
    for name in ["Content-Type", "X-Api-Key", "accept"] {
        let ctx = MemoryContext::builder().header(name, "value").build();
        let req = RequestView::new(&ctx).unwrap();
        for variant in casings(name) {
            assert!(req.has_header(&variant), "has_header({:?})", variant);
            assert_eq!(req.header(&variant).as_deref(), Some("value"), "header({:?})", variant);
        }
    }
}
