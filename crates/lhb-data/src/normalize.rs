//! 원본 행 정규화.
//!
//! 순수 함수이며 I/O가 없습니다. 처리 순서:
//!
//! 1. 거래일의 시간 접미사 제거 (`"2024-01-05 00:00:00"` → `"2024-01-05"`)
//! 2. 거래일 또는 종목코드가 비어 있으면 건너뜀
//! 3. (거래일, 종목코드) 기준 중복 제거 - 먼저 나온 행 유지
//! 4. 시장 그룹 분류 및 링크 생성
//! 5. 정렬: 거래일 내림차순 → 시장 그룹 우선순위 → 종목코드 오름차순

use std::collections::HashSet;

use crate::model::{MarketGroup, OverviewRecord, RawRecord};

/// 전환사채 증권유형 코드.
pub const CONVERTIBLE_BOND_TYPE_CODE: &str = "060";

/// 거래시장 코드 → 시장 그룹 분류표.
///
/// 전환사채 판정이 먼저 적용되고, 그 다음 이 표를 순서대로 확인합니다.
pub const MARKET_CODE_TABLE: [(MarketGroup, &[&str]); 4] = [
    (MarketGroup::Hs, &["069001001001", "069001001003"]),
    (MarketGroup::Kcb, &["069001001006"]),
    (
        MarketGroup::Sz,
        &["069001002001", "069001002002", "069001002005"],
    ),
    (MarketGroup::Bj, &["069001017"]),
];

const QUOTE_LINK_BASE: &str = "https://quote.eastmoney.com/unify/r";
const DETAIL_LINK_BASE: &str = "https://data.eastmoney.com/stock/lhb";

/// 거래일 문자열에서 시간 부분 제거.
pub fn normalize_trade_date(value: &str) -> &str {
    value.split(' ').next().unwrap_or_default()
}

/// 시장 그룹 분류.
pub fn classify_market(trade_market_code: &str, security_type_code: &str) -> MarketGroup {
    if security_type_code == CONVERTIBLE_BOND_TYPE_CODE {
        return MarketGroup::Kzz;
    }

    MARKET_CODE_TABLE
        .iter()
        .find(|(_, codes)| codes.contains(&trade_market_code))
        .map_or(MarketGroup::Other, |(group, _)| *group)
}

/// 시세 페이지 링크.
///
/// 거래소 접미사가 `SH`이면 접두어 `1`, 그 외는 `0`.
pub fn quote_link(security_code: &str, secucode: &str) -> String {
    let suffix = secucode
        .split_once('.')
        .map(|(_, rest)| rest.split('.').next().unwrap_or_default().to_uppercase())
        .unwrap_or_default();
    let prefix = if suffix == "SH" { "1" } else { "0" };
    format!("{}/{}.{}", QUOTE_LINK_BASE, prefix, security_code)
}

/// 용호방 상세 페이지 링크.
pub fn detail_link(security_code: &str, trade_date: &str) -> String {
    format!("{},{},{}.html", DETAIL_LINK_BASE, trade_date, security_code)
}

/// 거래일의 숫자 정렬 키 (구분자 제거 후 정수 비교).
fn trade_date_key(trade_date: &str) -> u64 {
    trade_date
        .chars()
        .filter(char::is_ascii_digit)
        .collect::<String>()
        .parse()
        .unwrap_or(0)
}

/// 원본 행을 개요 행으로 정규화.
pub fn normalize(raw_rows: &[RawRecord]) -> Vec<OverviewRecord> {
    let mut seen: HashSet<(String, String)> = HashSet::new();
    let mut rows = Vec::new();

    for raw in raw_rows {
        let trade_date = normalize_trade_date(&raw.trade_date);
        let security_code = raw.security_code.as_str();
        if trade_date.is_empty() || security_code.is_empty() {
            continue;
        }
        if !seen.insert((trade_date.to_string(), security_code.to_string())) {
            continue;
        }

        rows.push(OverviewRecord {
            trade_date: trade_date.to_string(),
            security_code: security_code.to_string(),
            security_name: raw.security_name.clone(),
            change_rate: raw.change_rate,
            trade_market_code: raw.trade_market_code.clone(),
            security_type_code: raw.security_type_code.clone(),
            market_group: classify_market(&raw.trade_market_code, &raw.security_type_code),
            detail_link: detail_link(security_code, trade_date),
            quote_link: quote_link(security_code, &raw.secucode),
        });
    }

    rows.sort_by(|a, b| {
        trade_date_key(&b.trade_date)
            .cmp(&trade_date_key(&a.trade_date))
            .then(a.market_group.priority().cmp(&b.market_group.priority()))
            .then_with(|| a.security_code.cmp(&b.security_code))
    });
    rows
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn raw(code: &str, secucode: &str, date: &str, market: &str, sec_type: &str) -> RawRecord {
        RawRecord {
            security_code: code.to_string(),
            secucode: secucode.to_string(),
            security_name: format!("name-{}", code),
            trade_date: date.to_string(),
            change_rate: None,
            trade_market_code: market.to_string(),
            security_type_code: sec_type.to_string(),
            explain: String::new(),
        }
    }

    #[test]
    fn test_normalize_trade_date() {
        assert_eq!(normalize_trade_date("2024-01-05 00:00:00"), "2024-01-05");
        assert_eq!(normalize_trade_date("2024-01-05"), "2024-01-05");
        assert_eq!(normalize_trade_date(""), "");
    }

    #[test]
    fn test_classify_market() {
        assert_eq!(classify_market("069001001001", "058001001"), MarketGroup::Hs);
        assert_eq!(classify_market("069001001003", ""), MarketGroup::Hs);
        assert_eq!(classify_market("069001001006", ""), MarketGroup::Kcb);
        assert_eq!(classify_market("069001002005", ""), MarketGroup::Sz);
        assert_eq!(classify_market("069001017", ""), MarketGroup::Bj);
        assert_eq!(classify_market("999", ""), MarketGroup::Other);
        // 전환사채 판정이 거래시장 코드보다 우선
        assert_eq!(classify_market("069001001001", "060"), MarketGroup::Kzz);
    }

    #[test]
    fn test_links() {
        assert_eq!(
            quote_link("600000", "600000.SH"),
            "https://quote.eastmoney.com/unify/r/1.600000"
        );
        assert_eq!(
            quote_link("600000", "600000.sh"),
            "https://quote.eastmoney.com/unify/r/1.600000"
        );
        assert_eq!(
            quote_link("000001", "000001.SZ"),
            "https://quote.eastmoney.com/unify/r/0.000001"
        );
        assert_eq!(
            quote_link("830799", ""),
            "https://quote.eastmoney.com/unify/r/0.830799"
        );
        assert_eq!(
            detail_link("600000", "2024-01-05"),
            "https://data.eastmoney.com/stock/lhb,2024-01-05,600000.html"
        );
    }

    #[test]
    fn test_normalize_dedup_keeps_first() {
        let mut first = raw("600000", "600000.SH", "2024-01-05 00:00:00", "069001001001", "");
        first.security_name = "first".to_string();
        let mut second = raw("600000", "600000.SH", "2024-01-05", "069001001001", "");
        second.security_name = "second".to_string();

        let rows = normalize(&[first, second]);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].security_name, "first");
        assert_eq!(rows[0].trade_date, "2024-01-05");
    }

    #[test]
    fn test_normalize_skips_incomplete_rows() {
        let rows = normalize(&[
            raw("", "", "2024-01-05", "069001001001", ""),
            raw("600000", "600000.SH", "", "069001001001", ""),
            raw("600001", "600001.SH", "2024-01-05", "069001001001", ""),
        ]);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].security_code, "600001");
    }

    #[test]
    fn test_normalize_ordering() {
        let rows = normalize(&[
            raw("113001", "113001.SH", "2024-01-04", "069001001001", "060"),
            raw("000002", "000002.SZ", "2024-01-05", "069001002001", ""),
            raw("688001", "688001.SH", "2024-01-05", "069001001006", ""),
            raw("600002", "600002.SH", "2024-01-05", "069001001001", ""),
            raw("600001", "600001.SH", "2024-01-05", "069001001001", ""),
            raw("830001", "830001.BJ", "2024-01-04", "069001017", ""),
        ]);

        let order: Vec<(&str, &str)> = rows
            .iter()
            .map(|r| (r.trade_date.as_str(), r.security_code.as_str()))
            .collect();
        assert_eq!(
            order,
            vec![
                ("2024-01-05", "600001"),
                ("2024-01-05", "600002"),
                ("2024-01-05", "688001"),
                ("2024-01-05", "000002"),
                ("2024-01-04", "830001"),
                ("2024-01-04", "113001"),
            ]
        );
        assert_eq!(rows[5].market_group, MarketGroup::Kzz);
    }

    fn arb_raw() -> impl Strategy<Value = RawRecord> {
        (
            prop::sample::select(vec!["600000", "600001", "000001", "688001", "113001", ""]),
            prop::sample::select(vec![
                "2024-01-03",
                "2024-01-04 00:00:00",
                "2024-01-05 00:00:00",
                "2023-12-29",
                "",
            ]),
            prop::sample::select(vec![
                "069001001001",
                "069001001006",
                "069001002002",
                "069001017",
                "000",
            ]),
            prop::sample::select(vec!["058001001", "060", ""]),
            prop::sample::select(vec!["SH", "SZ", "BJ"]),
            0u32..1000,
        )
            .prop_map(|(code, date, market, sec_type, suffix, tag)| RawRecord {
                security_code: code.to_string(),
                secucode: format!("{}.{}", code, suffix),
                security_name: format!("row-{}", tag),
                trade_date: date.to_string(),
                change_rate: None,
                trade_market_code: market.to_string(),
                security_type_code: sec_type.to_string(),
                explain: String::new(),
            })
    }

    proptest! {
        #[test]
        fn prop_normalize_is_idempotent(rows in prop::collection::vec(arb_raw(), 0..40)) {
            prop_assert_eq!(normalize(&rows), normalize(&rows));
        }

        #[test]
        fn prop_first_seen_wins(rows in prop::collection::vec(arb_raw(), 0..40)) {
            let overview = normalize(&rows);
            let keys: HashSet<(String, String)> = rows
                .iter()
                .filter(|r| !r.security_code.is_empty())
                .map(|r| (normalize_trade_date(&r.trade_date).to_string(), r.security_code.clone()))
                .filter(|(d, _)| !d.is_empty())
                .collect();
            prop_assert!(overview.len() <= keys.len());

            for record in &overview {
                let first = rows
                    .iter()
                    .find(|r| {
                        normalize_trade_date(&r.trade_date) == record.trade_date
                            && r.security_code == record.security_code
                    })
                    .unwrap();
                prop_assert_eq!(&first.security_name, &record.security_name);
            }
        }

        #[test]
        fn prop_output_is_ordered(rows in prop::collection::vec(arb_raw(), 0..40)) {
            let overview = normalize(&rows);
            for pair in overview.windows(2) {
                let (a, b) = (&pair[0], &pair[1]);
                let (da, db) = (trade_date_key(&a.trade_date), trade_date_key(&b.trade_date));
                prop_assert!(da >= db);
                if da == db {
                    prop_assert!(a.market_group <= b.market_group);
                    if a.market_group == b.market_group {
                        prop_assert!(a.security_code < b.security_code);
                    }
                }
            }
        }

        #[test]
        fn prop_convertible_bonds_are_kzz(rows in prop::collection::vec(arb_raw(), 0..40)) {
            for record in normalize(&rows) {
                if record.security_type_code == CONVERTIBLE_BOND_TYPE_CODE {
                    prop_assert_eq!(record.market_group, MarketGroup::Kzz);
                }
            }
        }
    }
}
