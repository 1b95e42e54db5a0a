//! 펀딩비 순위 계산.
//!
//! 네트워크 접근 없이 이미 조회된 펀딩비 목록을 정렬/필터링/제한합니다.
//! 입력 목록은 절대값 내림차순으로 정렬되어 있다고 가정합니다
//! ([`sort_by_abs_rate`] 참고).

use crate::types::{FundingRecord, RateSign};

/// `/funding` 기본 표시 개수.
pub const FUNDING_DEFAULT_LIMIT: usize = 20;
/// `/funding` 최대 표시 개수.
pub const FUNDING_MAX_LIMIT: usize = 50;
/// `/top`, `/bottom` 기본 표시 개수.
pub const SIGNED_DEFAULT_LIMIT: usize = 10;
/// `/top`, `/bottom` 최대 표시 개수.
pub const SIGNED_MAX_LIMIT: usize = 30;
/// `/top`, `/bottom` 필터링 전에 조회하는 레코드 수.
pub const SIGNED_FETCH_LIMIT: usize = 200;

/// 절대 펀딩비 내림차순으로 정렬합니다.
///
/// 안정 정렬이므로 절대값이 같은 레코드는 입력 순서를 유지합니다.
pub fn sort_by_abs_rate(records: &mut [FundingRecord]) {
    records.sort_by(|a, b| b.abs_rate.cmp(&a.abs_rate));
}

/// 상위 `limit`개를 반환합니다 (최대 [`FUNDING_MAX_LIMIT`]).
pub fn top_n(mut records: Vec<FundingRecord>, limit: usize) -> Vec<FundingRecord> {
    records.truncate(limit.min(FUNDING_MAX_LIMIT));
    records
}

/// 지정한 부호의 레코드만 남기고 `limit`개로 자릅니다 (최대 [`SIGNED_MAX_LIMIT`]).
///
/// 펀딩비가 0인 레코드는 양쪽 모두에서 제외됩니다.
pub fn filter_sign(records: Vec<FundingRecord>, sign: RateSign, limit: usize) -> Vec<FundingRecord> {
    records
        .into_iter()
        .filter(|r| r.sign() == Some(sign))
        .take(limit.min(SIGNED_MAX_LIMIT))
        .collect()
}

/// 표시된 목록의 양수/나머지 개수.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SignSplit {
    /// 양수 펀딩비 개수
    pub positive: usize,
    /// `limit - positive`
    pub remainder: usize,
}

/// 표시된 목록에서 양수 개수와 나머지(`limit - 양수`)를 계산합니다.
///
/// 시장 전체가 아니라 화면에 표시된 목록 기준의 통계입니다.
pub fn sign_split(records: &[FundingRecord], limit: usize) -> SignSplit {
    let positive = records
        .iter()
        .filter(|r| r.sign() == Some(RateSign::Positive))
        .count();

    SignSplit {
        positive,
        remainder: limit.saturating_sub(positive),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    fn snapshot() -> Vec<FundingRecord> {
        let mut records = vec![
            FundingRecord::new("BTCUSDT", dec!(0.0001)),
            FundingRecord::new("ETHUSDT", dec!(-0.0050)),
            FundingRecord::new("SOLUSDT", dec!(0.0200)),
        ];
        sort_by_abs_rate(&mut records);
        records
    }

    fn symbols(records: &[FundingRecord]) -> Vec<&str> {
        records.iter().map(|r| r.symbol.as_str()).collect()
    }

    #[test]
    fn test_sort_by_abs_rate_descending() {
        assert_eq!(symbols(&snapshot()), vec!["SOLUSDT", "ETHUSDT", "BTCUSDT"]);
    }

    #[test]
    fn test_sort_is_stable_for_equal_abs_rate() {
        let mut records = vec![
            FundingRecord::new("AAAUSDT", dec!(-0.001)),
            FundingRecord::new("BBBUSDT", dec!(0.001)),
            FundingRecord::new("CCCUSDT", dec!(0.002)),
        ];
        sort_by_abs_rate(&mut records);
        assert_eq!(symbols(&records), vec!["CCCUSDT", "AAAUSDT", "BBBUSDT"]);
    }

    #[test]
    fn test_top_n_hard_cap() {
        let records: Vec<_> = (0..80)
            .map(|i| FundingRecord::new(format!("C{i}USDT"), Decimal::new(i, 4)))
            .collect();
        assert_eq!(top_n(records.clone(), 999).len(), FUNDING_MAX_LIMIT);
        assert_eq!(top_n(records, 5).len(), 5);
    }

    #[test]
    fn test_filter_sign_scenario() {
        let top = filter_sign(snapshot(), RateSign::Positive, 2);
        assert_eq!(symbols(&top), vec!["SOLUSDT", "BTCUSDT"]);

        // 요청보다 적어도 채우지 않음
        let bottom = filter_sign(snapshot(), RateSign::Negative, 2);
        assert_eq!(symbols(&bottom), vec!["ETHUSDT"]);
    }

    #[test]
    fn test_filter_sign_excludes_zero() {
        let records = vec![
            FundingRecord::new("ZEROUSDT", Decimal::ZERO),
            FundingRecord::new("NEGUSDT", dec!(-0.0001)),
        ];
        assert!(filter_sign(records.clone(), RateSign::Positive, 10).is_empty());
        assert_eq!(filter_sign(records, RateSign::Negative, 10).len(), 1);
    }

    #[test]
    fn test_sign_split_uses_limit() {
        let split = sign_split(&snapshot(), 20);
        assert_eq!(split, SignSplit { positive: 2, remainder: 18 });
    }

    fn arb_records() -> impl Strategy<Value = Vec<FundingRecord>> {
        prop::collection::vec(-10_000i64..10_000, 0..120).prop_map(|rates| {
            let mut records: Vec<_> = rates
                .into_iter()
                .enumerate()
                .map(|(i, r)| FundingRecord::new(format!("S{i}USDT"), Decimal::new(r, 6)))
                .collect();
            sort_by_abs_rate(&mut records);
            records
        })
    }

    proptest! {
        #[test]
        fn prop_sorted_and_bounded(records in arb_records(), limit in 0usize..200) {
            let total = records.len();
            let result = top_n(records, limit);
            prop_assert!(result.len() <= limit.min(total).min(FUNDING_MAX_LIMIT));
            prop_assert!(result.windows(2).all(|w| w[0].abs_rate >= w[1].abs_rate));
        }

        #[test]
        fn prop_filter_sign_keeps_strict_sign(records in arb_records(), limit in 0usize..100) {
            let positive = filter_sign(records.clone(), RateSign::Positive, limit);
            let negative = filter_sign(records, RateSign::Negative, limit);

            prop_assert!(positive.iter().all(|r| r.rate > Decimal::ZERO));
            prop_assert!(negative.iter().all(|r| r.rate < Decimal::ZERO));
            prop_assert!(positive.len() <= limit.min(SIGNED_MAX_LIMIT));
            prop_assert!(negative.len() <= limit.min(SIGNED_MAX_LIMIT));
        }
    }
}
