//! hostbridge: CGI・actix-web・インメモリのホストをまたいで
//! リクエスト、レスポンス、クエリ、セッション、ルート情報に同じAPIでアクセスするためのライブラリ
//!
//! ハンドラは [`HostContext`] を受け取り、各ビューを通して読み書きする。
//!
//! ```
//! use hostbridge::host::MemoryContext;
//! use hostbridge::{QueryStore, RequestView, ResponseView};
//!
//! let ctx = MemoryContext::builder()
//!     .method("GET")
//!     .path("/hello")
//!     .query("name=world")
//!     .build();
//!
//! let name = QueryStore::new(&ctx).unwrap().get_or("name", "anonymous");
//! assert_eq!(RequestView::new(&ctx).unwrap().http_method(), "GET");
//!
//! let res = ResponseView::new(&ctx).unwrap();
//! res.write(&format!("Hello, {}!", name), None).unwrap();
//! assert_eq!(ctx.response().snapshot().body_text(), "Hello, world!");
//! ```

pub mod common;
pub mod error;
pub mod convert;
pub mod cipher;
pub mod query;
pub mod session;
pub mod request;
pub mod response;
pub mod route;
pub mod host;

pub use common::*;
pub use error::*;
pub use convert::{ConvertError, Convertible};
pub use query::QueryStore;
pub use session::SessionStore;
pub use request::RequestView;
pub use response::ResponseView;
pub use route::RouteView;
