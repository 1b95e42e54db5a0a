//! # Funding Core
//!
//! 펀딩비 봇의 핵심 도메인 타입.
//!
//! - 펀딩비/포지션/잔고 레코드
//! - 펀딩비 순위 계산 (`ranking`)
//! - tracing 기반 로깅 초기화 (`logging`)

pub mod logging;
pub mod ranking;
pub mod types;

pub use ranking::*;
pub use types::*;
