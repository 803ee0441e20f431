//! エラー型の定義

use thiserror::Error;

/// アプリケーションのエラー型
#[derive(Error, Debug)]
pub enum Error {
    /// 設定エラー（ホストコンテキストやセッションが利用できない）
    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    /// 空の平文・暗号文・キーなど、処理前に拒否する引数
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Base64などのデコードエラー
    #[error("Decode error: {0}")]
    Decode(String),

    /// 復号エラー（パディング不正、鍵の不一致など）
    #[error("Crypto error: {0}")]
    Crypto(String),

    /// JSONのシリアライズ・デシリアライズエラー
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// 無効なリクエストボディ
    #[error("Invalid request body: {0}")]
    InvalidRequestBody(String),

    /// 無効なヘッダー
    #[error("Invalid header: {0}")]
    InvalidHeader(String),

    /// 無効なクッキー
    #[error("Invalid cookie: {0}")]
    InvalidCookie(String),

    /// リクエストボディが上限を超えている
    #[error("Payload too large: {0}")]
    PayloadTooLarge(String),

    /// 内部サーバーエラー
    #[error("Internal server error: {0}")]
    InternalServerError(String),
}

impl Error {
    /// エラーからHTTPステータスコードを取得
    pub fn status_code(&self) -> u16 {
        match self {
            Error::ConfigurationError(_) => 500,
            Error::InvalidArgument(_) => 400,
            Error::Decode(_) => 400,
            Error::Crypto(_) => 400,
            Error::Serialization(_) => 500,
            Error::InvalidRequestBody(_) => 400,
            Error::InvalidHeader(_) => 400,
            Error::InvalidCookie(_) => 400,
            Error::PayloadTooLarge(_) => 413,
            Error::InternalServerError(_) => 500,
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}

impl From<base64::DecodeError> for Error {
    fn from(e: base64::DecodeError) -> Self {
        Error::Decode(e.to_string())
    }
}
