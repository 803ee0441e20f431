//! 正規表現によるルートテーブル（リクエストパスからルート値を取り出す）

use log::{debug, warn};
use regex::Regex;

use crate::error::Error;

/// パターンの前後にアンカーを付ける
fn anchored(pattern: &str) -> Result<String, Error> {
    if pattern.is_empty() {
        return Err(Error::ConfigurationError("Empty route pattern is not allowed".to_string()));
    }
    if pattern.starts_with('^') && pattern.ends_with('$') {
        return Ok(pattern.to_string());
    }
    let safe = format!("^{}$", pattern.trim_start_matches('^').trim_end_matches('$'));
    warn!("Route pattern {:?} lacks anchors, converted to {:?}", pattern, safe);
    Ok(safe)
}

struct Route {
    regex: Regex,
    defaults: Vec<(String, String)>,
}

/// 名前付きキャプチャを持つルートの一覧
///
/// 最初に一致したルートのキャプチャとデフォルト値がルート値になる。
#[derive(Default)]
pub struct RouteTable {
    routes: Vec<Route>,
}

impl RouteTable {
    /// 空のテーブルを作成
    pub fn new() -> Self {
        Self::default()
    }

    /// ルートを追加する
    ///
    /// `pattern` は名前付きキャプチャ（`(?P<controller>[^/]+)`）を含む正規表現。
    /// 一致しなかったキャプチャは `defaults` の値で補う。
    pub fn route(mut self, pattern: &str, defaults: &[(&str, &str)]) -> Result<Self, Error> {
        let safe = anchored(pattern)?;
        let regex = Regex::new(&safe).map_err(|e| {
            Error::ConfigurationError(format!("Invalid route pattern {:?}: {}", pattern, e))
        })?;
        self.routes.push(Route {
            regex,
            defaults: defaults
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        });
        Ok(self)
    }

    /// 登録されたルート数
    pub fn len(&self) -> usize {
        self.routes.len()
    }

    /// 空かどうか
    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    /// パスに一致するルートのルート値を返す（一致しなければNone）
    pub fn resolve(&self, path: &str) -> Option<Vec<(String, String)>> {
        for route in &self.routes {
            let Some(caps) = route.regex.captures(path) else { continue };

            let mut values = route.defaults.clone();
            for name in route.regex.capture_names().flatten() {
                let Some(m) = caps.name(name).filter(|m| !m.as_str().is_empty()) else { continue };
                match values.iter_mut().find(|(k, _)| k == name) {
                    Some(entry) => entry.1 = m.as_str().to_string(),
                    None => values.push((name.to_string(), m.as_str().to_string())),
                }
            }
            debug!("Route {} matched {:?}", route.regex.as_str(), path);
            return Some(values);
        }
        None
    }
}
