//! セッション値の読み書き（JSON、暗号化）

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use log::{debug, warn};
use serde::{de::DeserializeOwned, Serialize};
use crate::cipher;
use crate::common::{get_session_secret, require_context, ContextAccessor, SessionBag};
use crate::error::Error;

/// ホストのセッション領域に対するキー/値ストア
///
/// 変更はその場でホストのセッションに反映される。
pub struct SessionStore {
    bag: Arc<dyn SessionBag>,
    secret: Option<String>,
    fallback_warned: AtomicBool,
}

impl fmt::Debug for SessionStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionStore")
            .field("keys", &self.bag.keys())
            .field("has_secret", &self.secret.is_some())
            .finish()
    }
}

impl SessionStore {
    /// ホストコンテキストのセッションから作成
    ///
    /// 暗号化用のシークレットは `HOSTBRIDGE_SESSION_SECRET` から読み込む。
    pub fn new(accessor: &dyn ContextAccessor) -> Result<Self, Error> {
        let ctx = require_context(accessor, "SessionStore")?;
        let bag = ctx.session().ok_or_else(|| {
            log::error!("SessionStore: host '{}' does not provide a session", ctx.host_name());
            Error::ConfigurationError(format!(
                "SessionStore: session is not available on host '{}'",
                ctx.host_name()
            ))
        })?;
        let mut store = Self::from_bag(bag);
        store.secret = get_session_secret();
        Ok(store)
    }

    /// セッション領域から直接作成
    pub fn from_bag(bag: Arc<dyn SessionBag>) -> Self {
        Self {
            bag,
            secret: None,
            fallback_warned: AtomicBool::new(false),
        }
    }

    /// 暗号化用のシークレットを設定
    pub fn with_secret(mut self, secret: impl Into<String>) -> Self {
        let secret = secret.into();
        self.secret = if secret.is_empty() { None } else { Some(secret) };
        self
    }

    /// 暗号化のパスフレーズ（シークレットが無ければキー名）
    fn passphrase<'a>(&'a self, key: &'a str) -> &'a str {
        match &self.secret {
            Some(secret) => secret,
            None => {
                if !self.fallback_warned.swap(true, Ordering::Relaxed) {
                    warn!("SessionStore: no session secret configured, using the key name as passphrase");
                }
                key
            }
        }
    }

    /// 文字列を保存
    pub fn set_string(&self, key: &str, value: impl Into<String>) {
        self.bag.set(key, value.into());
    }

    /// 文字列を取得
    pub fn get_string(&self, key: &str) -> Option<String> {
        self.bag.get(key)
    }

    /// 値をJSONとして保存
    pub fn set<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<(), Error> {
        let json = serde_json::to_string(value)?;
        self.bag.set(key, json);
        Ok(())
    }

    /// JSONの値を取得（無い・空はNone、解析失敗はエラー）
    pub fn try_get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, Error> {
        match self.bag.get(key) {
            Some(json) if !json.trim().is_empty() => Ok(Some(serde_json::from_str(&json)?)),
            _ => Ok(None),
        }
    }

    /// JSONの値を取得（失敗時はデフォルト）
    pub fn get<T: DeserializeOwned>(&self, key: &str, default: T) -> T {
        match self.try_get(key) {
            Ok(Some(value)) => value,
            Ok(None) => default,
            Err(e) => {
                debug!("SessionStore::get fell back to default for {:?}: {}", key, e);
                default
            }
        }
    }

    /// 値をJSONにして暗号化して保存
    pub fn set_encrypted<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<(), Error> {
        let json = serde_json::to_string(value)?;
        let encrypted = cipher::encrypt(&json, self.passphrase(key))?;
        self.bag.set(key, encrypted);
        Ok(())
    }

    /// 暗号化された値を取得（無い・空はNone、復号や解析の失敗はエラー）
    pub fn try_get_encrypted<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, Error> {
        match self.bag.get(key) {
            Some(encrypted) if !encrypted.is_empty() => {
                let json = cipher::decrypt(&encrypted, self.passphrase(key))?;
                Ok(Some(serde_json::from_str(&json)?))
            }
            _ => Ok(None),
        }
    }

    /// 暗号化された値を取得（失敗時はデフォルト）
    pub fn get_encrypted<T: DeserializeOwned>(&self, key: &str, default: T) -> T {
        match self.try_get_encrypted(key) {
            Ok(Some(value)) => value,
            Ok(None) => default,
            Err(e) => {
                debug!("SessionStore::get_encrypted fell back to default for {:?}: {}", key, e);
                default
            }
        }
    }

    /// キーが存在するか
    pub fn has_key(&self, key: &str) -> bool {
        self.bag.get(key).is_some()
    }

    /// キーを削除
    pub fn remove(&self, key: &str) {
        self.bag.remove(key);
    }

    /// 全て削除
    pub fn clear(&self) {
        self.bag.clear();
    }

    /// 全てのキー
    pub fn keys(&self) -> Vec<String> {
        self.bag.keys()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use crate::common::traits::MockSessionBag;
    use crate::host::memory::{MemoryContext, MemorySession};

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Cart {
        user: String,
        items: Vec<u32>,
    }

    fn cart() -> Cart {
        Cart { user: "alice".into(), items: vec![1, 2, 3] }
    }

    fn store() -> SessionStore {
        SessionStore::from_bag(Arc::new(MemorySession::new()))
    }

    #[test]
    fn test_string_roundtrip() {
        let s = store();
        s.set_string("name", "alice");
        assert_eq!(s.get_string("name"), Some("alice".to_string()));
        assert_eq!(s.get_string("missing"), None);
        assert!(s.has_key("name"));
        assert!(!s.has_key("missing"));
    }

    #[test]
    fn test_json_roundtrip() {
        let s = store();
        s.set("cart", &cart()).unwrap();
        assert_eq!(s.get_string("cart").unwrap(), r#"{"user":"alice","items":[1,2,3]}"#);
        assert_eq!(s.get::<Option<Cart>>("cart", None), Some(cart()));
    }

    #[test]
    fn test_get_defaults_on_missing_or_invalid() {
        let s = store();
        assert_eq!(s.get("missing", 5), 5);
        s.set_string("bad", "not json");
        assert_eq!(s.get("bad", 7), 7);
        s.set_string("blank", "  ");
        assert_eq!(s.get("blank", 9), 9);
    }

    #[test]
    fn test_try_get_distinguishes_absent_and_invalid() {
        let s = store();
        s.set_string("bad", "not json");
        s.set("ok", &42).unwrap();

        assert_eq!(s.try_get::<i32>("ok").unwrap(), Some(42));
        assert_eq!(s.try_get::<i32>("missing").unwrap(), None);
        assert!(matches!(s.try_get::<i32>("bad"), Err(Error::Serialization(_))));
    }

    #[test]
    fn test_encrypted_roundtrip_with_key_name_fallback() {
        let s = store();
        s.set_encrypted("cart", &cart()).unwrap();

        let stored = s.get_string("cart").unwrap();
        assert!(!stored.contains("alice"));
        assert!(base64::decode(&stored).is_ok());

        assert_eq!(s.get_encrypted::<Option<Cart>>("cart", None), Some(cart()));
        // キー名がそのままパスフレーズになっている
        let json = cipher::decrypt(&stored, "cart").unwrap();
        assert_eq!(serde_json::from_str::<Cart>(&json).unwrap(), cart());
    }

    #[test]
    fn test_encrypted_with_secret_is_not_readable_with_key_name() {
        let bag: Arc<dyn SessionBag> = Arc::new(MemorySession::new());
        let s = SessionStore::from_bag(Arc::clone(&bag)).with_secret("a-long-random-secret");
        s.set_encrypted("token", &"value").unwrap();

        assert_eq!(s.get_encrypted("token", String::new()), "value");

        let without_secret = SessionStore::from_bag(bag);
        assert_eq!(without_secret.get_encrypted("token", "default".to_string()), "default");
    }

    #[test]
    fn test_get_encrypted_tampered_returns_default() {
        let s = store();
        s.set_encrypted("secret", &"payload").unwrap();

        let stored = s.get_string("secret").unwrap();
        let mut raw = base64::decode(&stored).unwrap();
        let last = raw.len() - 1;
        raw[last] ^= 0xFF;
        s.set_string("secret", base64::encode(&raw));
        assert_eq!(s.get_encrypted("secret", "default".to_string()), "default");

        s.set_string("secret", "%%% not base64 %%%");
        assert_eq!(s.get_encrypted("secret", "default".to_string()), "default");
        assert!(matches!(s.try_get_encrypted::<String>("secret"), Err(Error::Decode(_))));
    }

    #[test]
    fn test_remove_clear_keys() {
        let s = store();
        s.set_string("a", "1");
        s.set_string("b", "2");
        let mut keys = s.keys();
        keys.sort();
        assert_eq!(keys, vec!["a".to_string(), "b".to_string()]);

        s.remove("a");
        assert!(!s.has_key("a"));
        s.clear();
        assert!(s.keys().is_empty());
    }

    #[test]
    fn test_writes_go_straight_to_bag() {
        let mut bag = MockSessionBag::new();
        bag.expect_set()
            .withf(|key, value| key == "k" && value == "\"v\"")
            .times(1)
            .return_const(());
        let s = SessionStore::from_bag(Arc::new(bag));
        s.set("k", "v").unwrap();
    }

    #[test]
    fn test_new_requires_session() {
        let without_session = MemoryContext::builder().build();
        assert!(matches!(SessionStore::new(&without_session), Err(Error::ConfigurationError(_))));

        let with_session = MemoryContext::builder().with_session(MemorySession::new()).build();
        temp_env::with_var("HOSTBRIDGE_SESSION_SECRET", Some("env-secret"), || {
            let s = SessionStore::new(&with_session).unwrap();
            s.set_encrypted("k", &1).unwrap();
            let stored = s.get_string("k").unwrap();
            assert!(cipher::decrypt(&stored, "env-secret").is_ok());
        });
    }
}
