//! 共通の抽象化レイヤーとトレイト定義

pub mod context;
pub mod cookie;
pub mod http;
pub mod traits;
pub mod utils;

pub use context::{ContextSlot, ResponseSlot};
pub use cookie::Cookie;
pub use http::{reason_phrase_for, Method, Request, Response, StatusCode};
pub use traits::{require_context, ContextAccessor, Handler, HostContext, HostResponse, SessionBag};
pub use utils::*;
