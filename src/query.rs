//! クエリ文字列の読み書き

use std::fmt;
use std::collections::HashMap;
use log::debug;
use crate::common::{parse_query_string, form_encode, require_context, ContextAccessor};
use crate::convert::{self, Convertible, ConvertError};
use crate::error::Error;

/// リクエストのクエリ文字列を保持する順序付きキー/値ストア
///
/// 構築時に一度だけ解析し、以降の変更はこのインスタンス内でのみ有効。
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryStore {
    params: Vec<(String, String)>,
}

impl QueryStore {
    /// ホストコンテキストのクエリ文字列から作成
    pub fn new(accessor: &dyn ContextAccessor) -> Result<Self, Error> {
        let ctx = require_context(accessor, "QueryStore")?;
        Ok(Self::parse(&ctx.request().raw_query))
    }

    /// 生のクエリ文字列から作成（先頭の `?` は省略可）
    pub fn parse(raw: &str) -> Self {
        Self {
            params: parse_query_string(raw),
        }
    }

    /// 値を取得
    pub fn get(&self, key: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// 値を取得（無ければデフォルト）
    pub fn get_or(&self, key: &str, default: &str) -> String {
        self.get(key).unwrap_or(default).to_string()
    }

    /// 値を設定（既存のキーは位置を保ったまま上書き）
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        match self.params.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = value,
            None => self.params.push((key, value)),
        }
    }

    /// 複数の値をまとめて設定
    pub fn add_range<I, K, V>(&mut self, items: I)
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        for (k, v) in items {
            self.set(k, v);
        }
    }

    /// キーが存在するか
    pub fn has_key(&self, key: &str) -> bool {
        self.params.iter().any(|(k, _)| k == key)
    }

    /// キーを削除
    pub fn remove(&mut self, key: &str) {
        self.params.retain(|(k, _)| k != key);
    }

    /// 型付きで取得（キーなし・空値・変換失敗はデフォルト）
    pub fn get_as<T: Convertible>(&self, key: &str, default: T) -> T {
        match self.get(key) {
            Some(value) => convert::convert_to(value, default),
            None => default,
        }
    }

    /// 型付きで取得（キーなしはNone、変換失敗はエラー）
    pub fn try_get_as<T: Convertible>(&self, key: &str) -> Result<Option<T>, ConvertError> {
        match self.get(key) {
            None => Ok(None),
            Some(value) => match convert::convert(value) {
                Ok(v) => Ok(Some(v)),
                Err(ConvertError::Empty) => Ok(None),
                Err(e) => {
                    debug!("QueryStore::try_get_as failed for key {:?}: {}", key, e);
                    Err(e)
                }
            },
        }
    }

    /// 型付きで設定
    pub fn set_as<T: Convertible>(&mut self, key: impl Into<String>, value: &T) {
        self.set(key, convert::convert_from(value));
    }

    /// 全てのキー（出現順）
    pub fn all_keys(&self) -> Vec<&str> {
        self.params.iter().map(|(k, _)| k.as_str()).collect()
    }

    /// キー/値のマップに変換
    pub fn to_map(&self) -> HashMap<String, String> {
        self.params.iter().cloned().collect()
    }

    /// キー/値のペアを出現順に走査
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.params.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// クエリ文字列を再構築（キーと値をエンコードし `&` で連結）
    pub fn to_query_string(&self) -> String {
        self.params
            .iter()
            .map(|(k, v)| format!("{}={}", form_encode(k), form_encode(v)))
            .collect::<Vec<_>>()
            .join("&")
    }

    /// 再構築したクエリ文字列全体をさらにエンコードする
    ///
    /// `to_query_string` の結果を再度エンコードするため、各値は二重にエンコードされる。
    pub fn to_encoded_string(&self) -> String {
        urlencoding::encode(&self.to_query_string()).into_owned()
    }

    /// パラメータ数
    pub fn len(&self) -> usize {
        self.params.len()
    }

    /// 空かどうか
    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }
}

impl fmt::Display for QueryStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_query_string())
    }
}
