//! Bybit 펀딩비 텔레그램 봇.
//!
//! 환경변수 설정 로드와 시작 시 필수 설정 검사를 제공합니다.

pub mod config;
pub mod error;

pub use config::BotConfig;
pub use error::ConfigError;
