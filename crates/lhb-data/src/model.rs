//! 용호방(LHB) 레코드 모델.
//!
//! - [`RawRecord`]: API가 반환한 원본 행 (필드명은 API 컬럼명 그대로)
//! - [`OverviewRecord`]: 정규화된 개요 행 (거래일 + 종목코드 당 1건)
//! - [`MarketGroup`]: 거래소/증권유형 코드로 분류한 시장 그룹

use std::fmt;
use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};

/// API 원본 컬럼 목록 (요청 `columns` 파라미터 및 원본 CSV 헤더 순서).
pub const RAW_COLUMNS: [&str; 8] = [
    "SECURITY_CODE",
    "SECUCODE",
    "SECURITY_NAME_ABBR",
    "TRADE_DATE",
    "CHANGE_RATE",
    "TRADE_MARKET_CODE",
    "SECURITY_TYPE_CODE",
    "EXPLAIN",
];

/// 개요 CSV 헤더 순서.
pub const OVERVIEW_COLUMNS: [&str; 9] = [
    "trade_date",
    "market_group",
    "security_code",
    "security_name",
    "change_rate",
    "trade_market_code",
    "security_type_code",
    "detail_link",
    "quote_link",
];

/// 용호방 원본 레코드.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawRecord {
    /// 종목코드 (6자리)
    #[serde(rename = "SECURITY_CODE", default, deserialize_with = "null_as_empty")]
    pub security_code: String,
    /// 거래소 접미사 포함 코드 (예: 600000.SH)
    #[serde(rename = "SECUCODE", default, deserialize_with = "null_as_empty")]
    pub secucode: String,
    /// 종목 약칭
    #[serde(
        rename = "SECURITY_NAME_ABBR",
        default,
        deserialize_with = "null_as_empty"
    )]
    pub security_name: String,
    /// 거래일 (예: "2024-01-05 00:00:00")
    #[serde(rename = "TRADE_DATE", default, deserialize_with = "null_as_empty")]
    pub trade_date: String,
    /// 등락률 (%). 숫자가 아닌 값(`"-"`, `""`)은 `None`
    #[serde(rename = "CHANGE_RATE", default, deserialize_with = "lenient_decimal")]
    pub change_rate: Option<Decimal>,
    /// 거래시장 분류 코드
    #[serde(
        rename = "TRADE_MARKET_CODE",
        default,
        deserialize_with = "null_as_empty"
    )]
    pub trade_market_code: String,
    /// 증권유형 코드 ("060" = 전환사채)
    #[serde(
        rename = "SECURITY_TYPE_CODE",
        default,
        deserialize_with = "null_as_empty"
    )]
    pub security_type_code: String,
    /// 등재 사유
    #[serde(rename = "EXPLAIN", default, deserialize_with = "null_as_empty")]
    pub explain: String,
}

/// JSON `null`을 빈 문자열로 취급.
fn null_as_empty<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

/// 숫자 또는 숫자 문자열을 Decimal로 해석. 해석할 수 없는 값은 `None`.
fn lenient_decimal<'de, D>(deserializer: D) -> std::result::Result<Option<Decimal>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RateField {
        Number(Decimal),
        Text(String),
    }

    Ok(match Option::<RateField>::deserialize(deserializer)? {
        Some(RateField::Number(value)) => Some(value),
        Some(RateField::Text(text)) => Decimal::from_str(text.trim()).ok(),
        None => None,
    })
}

/// 시장 그룹.
///
/// 선언 순서가 곧 정렬 우선순위입니다 (HS < KCB < SZ < BJ < KZZ < OTHER).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum MarketGroup {
    /// 상하이 메인보드
    #[serde(rename = "HS")]
    Hs,
    /// 과창판 (STAR Market)
    #[serde(rename = "KCB")]
    Kcb,
    /// 선전
    #[serde(rename = "SZ")]
    Sz,
    /// 베이징
    #[serde(rename = "BJ")]
    Bj,
    /// 전환사채
    #[serde(rename = "KZZ")]
    Kzz,
    /// 기타
    #[serde(rename = "OTHER")]
    Other,
}

impl MarketGroup {
    /// 우선순위 순서의 전체 그룹.
    pub const ALL: [MarketGroup; 6] = [
        MarketGroup::Hs,
        MarketGroup::Kcb,
        MarketGroup::Sz,
        MarketGroup::Bj,
        MarketGroup::Kzz,
        MarketGroup::Other,
    ];

    /// 태그 문자열.
    pub fn as_str(&self) -> &'static str {
        match self {
            MarketGroup::Hs => "HS",
            MarketGroup::Kcb => "KCB",
            MarketGroup::Sz => "SZ",
            MarketGroup::Bj => "BJ",
            MarketGroup::Kzz => "KZZ",
            MarketGroup::Other => "OTHER",
        }
    }

    /// 정렬 우선순위 (1부터 시작).
    pub fn priority(&self) -> u8 {
        match self {
            MarketGroup::Hs => 1,
            MarketGroup::Kcb => 2,
            MarketGroup::Sz => 3,
            MarketGroup::Bj => 4,
            MarketGroup::Kzz => 5,
            MarketGroup::Other => 6,
        }
    }
}

impl fmt::Display for MarketGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 정규화된 개요 레코드.
///
/// (trade_date, security_code) 조합이 유일 키입니다.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OverviewRecord {
    /// 거래일 (YYYY-MM-DD)
    pub trade_date: String,
    pub security_code: String,
    pub security_name: String,
    /// 등락률 (%)
    #[serde(with = "rust_decimal::serde::float_option", default)]
    pub change_rate: Option<Decimal>,
    pub trade_market_code: String,
    pub security_type_code: String,
    pub market_group: MarketGroup,
    /// 용호방 상세 페이지 링크
    pub detail_link: String,
    /// 시세 페이지 링크
    pub quote_link: String,
}
