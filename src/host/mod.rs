//! ホスト実装（プラットフォーム固有のリクエスト/レスポンス/セッションの変換）

pub mod memory;
pub mod route;

#[cfg(feature = "cgi")]
pub mod cgi;

#[cfg(feature = "cloud_run")]
pub mod actix;

pub use memory::{MemoryContext, MemoryContextBuilder, MemorySession};
pub use route::RouteTable;
