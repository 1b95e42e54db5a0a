//! 펀딩비/계정 도메인 타입.

use rust_decimal::Decimal;

/// 단일 무기한 계약의 펀딩비 레코드.
///
/// 시세 스냅샷에서 매번 새로 생성되며 생성 후 변경되지 않습니다.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FundingRecord {
    /// 심볼 (예: `BTCUSDT`)
    pub symbol: String,
    /// 원본 펀딩비
    pub rate: Decimal,
    /// 퍼센트 단위 펀딩비 (`rate * 100`)
    pub rate_pct: Decimal,
    /// 펀딩비 절대값
    pub abs_rate: Decimal,
}

impl FundingRecord {
    /// 심볼과 펀딩비로 레코드를 생성합니다.
    pub fn new(symbol: impl Into<String>, rate: Decimal) -> Self {
        Self {
            symbol: symbol.into(),
            rate,
            rate_pct: rate * Decimal::ONE_HUNDRED,
            abs_rate: rate.abs(),
        }
    }

    /// 펀딩비의 부호 방향.
    ///
    /// 0은 어느 쪽에도 속하지 않습니다.
    pub fn sign(&self) -> Option<RateSign> {
        if self.rate > Decimal::ZERO {
            Some(RateSign::Positive)
        } else if self.rate < Decimal::ZERO {
            Some(RateSign::Negative)
        } else {
            None
        }
    }
}

/// 펀딩비 부호.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RateSign {
    /// 양수 (롱 과열)
    Positive,
    /// 음수 (숏 과열)
    Negative,
}

/// 포지션 방향.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PositionSide {
    Long,
    Short,
}

impl PositionSide {
    /// 거래소 `side` 필드에서 변환합니다. `Buy`만 롱이고 나머지는 숏입니다.
    pub fn from_exchange_side(side: &str) -> Self {
        if side == "Buy" {
            Self::Long
        } else {
            Self::Short
        }
    }
}

/// 보유 포지션 스냅샷.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PositionRecord {
    pub symbol: String,
    pub side: PositionSide,
    /// 포지션 수량
    pub size: Decimal,
    /// 레버리지 (거래소 문자열 그대로)
    pub leverage: String,
    /// 미실현 손익
    pub unrealised_pnl: Decimal,
}

impl PositionRecord {
    /// 수량이 0보다 큰 활성 포지션인지 확인.
    pub fn is_active(&self) -> bool {
        self.size > Decimal::ZERO
    }
}

/// 단일 코인 잔고.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoinBalance {
    /// 코인 이름 (예: `USDT`)
    pub coin: String,
    /// 총자산
    pub equity: Decimal,
    /// 출금 가능 금액
    pub available_to_withdraw: Decimal,
}
