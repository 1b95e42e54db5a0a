//! 거래소 데이터 조회 trait.

use async_trait::async_trait;
use funding_core::{CoinBalance, FundingRecord, PositionRecord};

use crate::error::ExchangeResult;

/// 공개 시세에서 펀딩비를 조회하는 인터페이스.
#[async_trait]
pub trait MarketDataProvider: Send + Sync {
    /// 펀딩비 레코드를 절대값 내림차순으로 최대 `limit`개 반환합니다.
    ///
    /// 펀딩비가 없거나 비어 있는 종목은 제외됩니다.
    async fn fetch_funding_rates(&self, limit: usize) -> ExchangeResult<Vec<FundingRecord>>;
}

/// 서명된 계정 API 인터페이스.
#[async_trait]
pub trait AccountProvider: Send + Sync {
    /// 통합 계정에서 지정 코인의 잔고를 조회합니다.
    ///
    /// 해당 코인 항목이 없으면 `Ok(None)`.
    async fn fetch_wallet_balance(&self, coin: &str) -> ExchangeResult<Option<CoinBalance>>;

    /// 선물(linear) 포지션 목록을 조회합니다.
    async fn fetch_positions(&self) -> ExchangeResult<Vec<PositionRecord>>;
}
