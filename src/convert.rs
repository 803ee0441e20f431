//! 文字列と型付き値の相互変換
//!
//! クエリ文字列やルート値などの文字列を型付きの値へ変換する。
//! 変換に失敗した場合は呼び出し側が指定したデフォルト値を返すのが基本で、
//! 失敗理由が必要な場合は [`convert`] を使う。

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, SecondsFormat, Utc};
use log::debug;
use thiserror::Error;
use uuid::Uuid;

/// 変換エラー
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConvertError {
    /// 入力が空（空白のみを含む）
    #[error("input is empty")]
    Empty,

    /// 対象の型として解釈できない
    #[error("cannot convert {input:?} to {type_name}")]
    Invalid {
        type_name: &'static str,
        input: String,
    },
}

/// 文字列表現と相互変換できる型
///
/// `parse_value` には空でない入力のみが渡される。
pub trait Convertible: Sized {
    /// 文字列から値を解釈する（失敗時はNone）
    fn parse_value(input: &str) -> Option<Self>;

    /// 値を文字列表現に変換する
    fn format_value(&self) -> String;
}

/// 文字列を変換する（空入力と解釈失敗を区別する）
pub fn convert<T: Convertible>(input: &str) -> Result<T, ConvertError> {
    if input.trim().is_empty() {
        return Err(ConvertError::Empty);
    }
    T::parse_value(input).ok_or_else(|| ConvertError::Invalid {
        type_name: std::any::type_name::<T>(),
        input: input.to_string(),
    })
}

/// 文字列を変換する（失敗時はNone）
pub fn try_convert<T: Convertible>(input: &str) -> Option<T> {
    convert(input).ok()
}

/// 文字列を変換する（失敗時はデフォルト値）
pub fn convert_to<T: Convertible>(input: &str, default: T) -> T {
    match convert(input) {
        Ok(value) => value,
        Err(ConvertError::Empty) => default,
        Err(e) => {
            debug!("convert_to fell back to default: {}", e);
            default
        }
    }
}

/// 値を文字列表現に変換する
pub fn convert_from<T: Convertible>(value: &T) -> String {
    value.format_value()
}

/// `FromStr + Display` を実装した型を変換可能にする
///
/// ```
/// use std::fmt;
/// use std::str::FromStr;
///
/// struct Sku(String);
///
/// impl FromStr for Sku {
///     type Err = ();
///     fn from_str(s: &str) -> Result<Self, ()> {
///         s.starts_with("SKU-").then(|| Sku(s.to_string())).ok_or(())
///     }
/// }
///
/// impl fmt::Display for Sku {
///     fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
///         f.write_str(&self.0)
///     }
/// }
///
/// hostbridge::convertible_from_str!(Sku);
///
/// assert!(hostbridge::convert::try_convert::<Sku>("SKU-1").is_some());
/// assert!(hostbridge::convert::try_convert::<Sku>("1").is_none());
/// ```
#[macro_export]
macro_rules! convertible_from_str {
    ($($ty:ty),+ $(,)?) => {
        $(
            impl $crate::convert::Convertible for $ty {
                fn parse_value(input: &str) -> Option<Self> {
                    input.trim().parse::<$ty>().ok()
                }

                fn format_value(&self) -> String {
                    self.to_string()
                }
            }
        )+
    };
}

/// フィールドを持たない列挙型を変換可能にする（メンバー名は大文字小文字を区別しない）
///
/// ```
/// #[derive(Debug, PartialEq)]
/// enum Color { Red, Green }
/// hostbridge::convertible_enum!(Color { Red, Green });
///
/// assert_eq!(hostbridge::convert::convert_to("green", Color::Red), Color::Green);
/// ```
#[macro_export]
macro_rules! convertible_enum {
    ($ty:ident { $($variant:ident),+ $(,)? }) => {
        impl $crate::convert::Convertible for $ty {
            fn parse_value(input: &str) -> Option<Self> {
                let name = input.trim();
                $(
                    if name.eq_ignore_ascii_case(stringify!($variant)) {
                        return Some($ty::$variant);
                    }
                )+
                None
            }

            fn format_value(&self) -> String {
                match self {
                    $( $ty::$variant => stringify!($variant).to_string(), )+
                }
            }
        }
    };
}

convertible_from_str!(
    i8, i16, i32, i64, i128, isize,
    u8, u16, u32, u64, u128, usize,
    f32, f64,
    std::net::IpAddr,
);

impl Convertible for String {
    fn parse_value(input: &str) -> Option<Self> {
        Some(input.to_string())
    }

    fn format_value(&self) -> String {
        self.clone()
    }
}

impl Convertible for bool {
    fn parse_value(input: &str) -> Option<Self> {
        let s = input.trim();
        if s.eq_ignore_ascii_case("true") {
            Some(true)
        } else if s.eq_ignore_ascii_case("false") {
            Some(false)
        } else {
            None
        }
    }

    fn format_value(&self) -> String {
        self.to_string()
    }
}

impl Convertible for char {
    fn parse_value(input: &str) -> Option<Self> {
        let mut chars = input.trim().chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) => Some(c),
            _ => None,
        }
    }

    fn format_value(&self) -> String {
        self.to_string()
    }
}

impl Convertible for Uuid {
    fn parse_value(input: &str) -> Option<Self> {
        Uuid::parse_str(input.trim()).ok()
    }

    fn format_value(&self) -> String {
        self.hyphenated().to_string()
    }
}

/// タイムゾーンを含まない日時の書式（先頭から順に試す）
const NAIVE_DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
    "%Y/%m/%d %H:%M:%S",
];

const NAIVE_DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d"];

fn parse_naive_datetime(s: &str) -> Option<NaiveDateTime> {
    NAIVE_DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
        .or_else(|| parse_naive_date(s).and_then(|d| d.and_hms_opt(0, 0, 0)))
}

fn parse_naive_date(s: &str) -> Option<NaiveDate> {
    NAIVE_DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(s, fmt).ok())
}

impl Convertible for DateTime<FixedOffset> {
    fn parse_value(input: &str) -> Option<Self> {
        let s = input.trim();
        DateTime::parse_from_rfc3339(s)
            .ok()
            .or_else(|| DateTime::parse_from_rfc2822(s).ok())
            .or_else(|| {
                // オフセット指定なしはUTCとして扱う
                parse_naive_datetime(s).map(|naive| naive.and_utc().fixed_offset())
            })
    }

    fn format_value(&self) -> String {
        self.to_rfc3339_opts(SecondsFormat::AutoSi, true)
    }
}

impl Convertible for DateTime<Utc> {
    fn parse_value(input: &str) -> Option<Self> {
        DateTime::<FixedOffset>::parse_value(input).map(|dt| dt.with_timezone(&Utc))
    }

    fn format_value(&self) -> String {
        self.to_rfc3339_opts(SecondsFormat::AutoSi, true)
    }
}

impl Convertible for NaiveDateTime {
    fn parse_value(input: &str) -> Option<Self> {
        let s = input.trim();
        parse_naive_datetime(s)
            .or_else(|| DateTime::parse_from_rfc3339(s).ok().map(|dt| dt.naive_utc()))
    }

    fn format_value(&self) -> String {
        self.format("%Y-%m-%dT%H:%M:%S%.f").to_string()
    }
}

impl Convertible for NaiveDate {
    fn parse_value(input: &str) -> Option<Self> {
        let s = input.trim();
        parse_naive_date(s).or_else(|| NaiveDateTime::parse_value(s).map(|dt| dt.date()))
    }

    fn format_value(&self) -> String {
        self.format("%Y-%m-%d").to_string()
    }
}

impl<T: Convertible> Convertible for Option<T> {
    fn parse_value(input: &str) -> Option<Self> {
        T::parse_value(input).map(Some)
    }

    fn format_value(&self) -> String {
        match self {
            Some(value) => value.format_value(),
            None => String::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveTime, TimeZone};

    #[derive(Debug, Clone, Copy, PartialEq)]
    enum Status {
        Active,
        Suspended,
    }
    convertible_enum!(Status { Active, Suspended });

    #[test]
    fn test_convert_to_int() {
        assert_eq!(convert_to::<i32>("42", 0), 42);
        assert_eq!(convert_to::<i32>("abc", 0), 0);
        assert_eq!(convert_to::<i32>(" -7 ", 0), -7);
        assert_eq!(convert_to::<u8>("256", 1), 1);
        assert_eq!(convert_to::<i64>("+15", 0), 15);
    }

    #[test]
    fn test_convert_to_bool() {
        assert!(convert_to::<bool>("true", false));
        assert!(convert_to::<bool>("TRUE", false));
        assert!(!convert_to::<bool>(" False ", true));
        assert!(convert_to::<bool>("yes", true));
    }

    #[test]
    fn test_empty_input_fails_for_every_type() {
        for input in ["", "   ", "\t\n"] {
            assert_eq!(try_convert::<String>(input), None);
            assert_eq!(try_convert::<i32>(input), None);
            assert_eq!(try_convert::<bool>(input), None);
            assert_eq!(try_convert::<f64>(input), None);
            assert_eq!(try_convert::<Uuid>(input), None);
            assert_eq!(try_convert::<DateTime<Utc>>(input), None);
            assert_eq!(try_convert::<Status>(input), None);
            assert_eq!(try_convert::<Option<i32>>(input), None);
            assert_eq!(convert::<i32>(input), Err(ConvertError::Empty));
        }
        assert_eq!(convert_to::<String>("", "fallback".to_string()), "fallback");
    }

    #[test]
    fn test_string_passthrough() {
        assert_eq!(convert_to::<String>(" keep spaces ", String::new()), " keep spaces ");
    }

    #[test]
    fn test_enum_case_insensitive() {
        assert_eq!(convert_to("active", Status::Suspended), Status::Active);
        assert_eq!(convert_to("SUSPENDED", Status::Active), Status::Suspended);
        assert_eq!(convert_from(&Status::Suspended), "Suspended");
    }

    #[test]
    fn test_enum_unknown_member_fails() {
        assert_eq!(try_convert::<Status>("deleted"), None);
        assert_eq!(convert_to("deleted", Status::Active), Status::Active);
        match convert::<Status>("deleted") {
            Err(ConvertError::Invalid { input, .. }) => assert_eq!(input, "deleted"),
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_uuid() {
        let canonical = "67e55044-10b1-426f-9247-bb680e5fe0c8";
        let expected = Uuid::parse_str(canonical).unwrap();

        assert_eq!(try_convert::<Uuid>(canonical), Some(expected));
        assert_eq!(try_convert::<Uuid>("67E5504410B1426F9247BB680E5FE0C8"), Some(expected));
        assert_eq!(try_convert::<Uuid>("{67e55044-10b1-426f-9247-bb680e5fe0c8}"), Some(expected));
        assert_eq!(try_convert::<Uuid>("not-a-uuid"), None);
        assert_eq!(convert_from(&expected), canonical);
    }

    #[test]
    fn test_datetime_utc() {
        let expected = Utc.with_ymd_and_hms(2024, 3, 1, 12, 30, 0).unwrap();

        assert_eq!(try_convert::<DateTime<Utc>>("2024-03-01T12:30:00Z"), Some(expected));
        assert_eq!(try_convert::<DateTime<Utc>>("2024-03-01T21:30:00+09:00"), Some(expected));
        assert_eq!(try_convert::<DateTime<Utc>>("2024-03-01 12:30:00"), Some(expected));
        assert_eq!(try_convert::<DateTime<Utc>>("2024-03-01 12:30"), Some(expected));
        assert_eq!(try_convert::<DateTime<Utc>>("yesterday"), None);

        assert_eq!(convert_from(&expected), "2024-03-01T12:30:00Z");
    }

    #[test]
    fn test_datetime_roundtrip_keeps_fraction() {
        let dt = Utc.with_ymd_and_hms(2024, 3, 1, 12, 30, 0).unwrap()
            + chrono::Duration::milliseconds(250);
        let text = convert_from(&dt);
        assert_eq!(text, "2024-03-01T12:30:00.250Z");
        assert_eq!(try_convert::<DateTime<Utc>>(&text), Some(dt));
    }

    #[test]
    fn test_datetime_fixed_offset_keeps_offset() {
        let dt = try_convert::<DateTime<FixedOffset>>("2024-03-01T21:30:00+09:00").unwrap();
        assert_eq!(dt.offset().local_minus_utc(), 9 * 3600);
        assert_eq!(convert_from(&dt), "2024-03-01T21:30:00+09:00");
    }

    #[test]
    fn test_naive_date_and_datetime() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        assert_eq!(try_convert::<NaiveDate>("2024-03-01"), Some(date));
        assert_eq!(try_convert::<NaiveDate>("2024/03/01"), Some(date));
        assert_eq!(try_convert::<NaiveDate>("2024-03-01T10:00:00"), Some(date));
        assert_eq!(try_convert::<NaiveDate>("2024-13-01"), None);
        assert_eq!(convert_from(&date), "2024-03-01");

        let midnight = date.and_time(NaiveTime::MIN);
        assert_eq!(try_convert::<NaiveDateTime>("2024-03-01"), Some(midnight));
        assert_eq!(convert_from(&midnight), "2024-03-01T00:00:00");
    }

    #[test]
    fn test_floats_and_char() {
        assert_eq!(convert_to::<f64>("3.5", 0.0), 3.5);
        assert_eq!(convert_to::<f32>("x", 1.5), 1.5);
        assert_eq!(try_convert::<char>(" a "), Some('a'));
        assert_eq!(try_convert::<char>("ab"), None);
    }

    #[test]
    fn test_option_is_nullable_form() {
        assert_eq!(convert_to::<Option<i32>>("5", None), Some(5));
        assert_eq!(convert_to::<Option<i32>>("", None), None);
        assert_eq!(convert_to::<Option<i32>>("x", Some(1)), Some(1));
        assert_eq!(convert_from::<Option<i32>>(&None), "");
        assert_eq!(convert_from(&Some(5)), "5");
    }

    #[test]
    fn test_from_str_fallback() {
        let ip = try_convert::<std::net::IpAddr>("192.168.0.1").unwrap();
        assert_eq!(convert_from(&ip), "192.168.0.1");
        assert_eq!(try_convert::<std::net::IpAddr>("999.0.0.1"), None);
    }
}
