//! 거래소 연결.
//!
//! 이 크레이트는 다음을 제공합니다:
//! - `MarketDataProvider` / `AccountProvider` trait: 펀딩비/계정 조회 인터페이스
//! - Bybit v5 REST 커넥터 (공개 시세 + 서명된 계정 API)

pub mod connector;
pub mod error;
pub mod traits;

pub use connector::{BybitClient, BybitConfig};
pub use error::*;
pub use traits::*;
