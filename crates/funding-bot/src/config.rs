//! 환경변수 기반 설정 모듈.

use std::time::Duration;

use funding_exchange::BybitConfig;
use funding_notification::TelegramConfig;

use crate::error::ConfigError;

/// 봇 전체 설정
#[derive(Debug)]
pub struct BotConfig {
    /// 텔레그램 설정
    pub telegram: TelegramConfig,
    /// Bybit 설정 (자격증명은 선택)
    pub bybit: BybitConfig,
    /// 루프 수준 실패 후 대기 시간 (초)
    pub error_backoff_secs: u64,
}

impl BotConfig {
    /// `.env`와 환경변수에서 설정 로드
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// 주어진 조회 함수로 설정 로드
    ///
    /// `TELEGRAM_BOT_TOKEN`이 없거나 비어 있으면 실패합니다.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let bot_token = lookup("TELEGRAM_BOT_TOKEN")
            .filter(|t| !t.trim().is_empty())
            .ok_or(ConfigError::MissingBotToken)?;

        let http_timeout = parse_or(&lookup, "HTTP_TIMEOUT_SECS", 10);

        let mut telegram = TelegramConfig::new(bot_token)
            .with_poll_timeout_secs(parse_or(&lookup, "TELEGRAM_POLL_TIMEOUT_SECS", 30))
            .with_request_timeout_secs(http_timeout);
        if let Some(url) = lookup("TELEGRAM_API_URL") {
            telegram = telegram.with_api_url(url);
        }

        let mut bybit = BybitConfig::new(lookup("BYBIT_API_KEY"), lookup("BYBIT_API_SECRET"))
            .with_testnet(parse_bool(&lookup, "BYBIT_TESTNET", false))
            .with_timeout_secs(http_timeout);
        if let Some(url) = lookup("BYBIT_BASE_URL") {
            bybit = bybit.with_base_url(url);
        }

        Ok(Self {
            telegram,
            bybit,
            error_backoff_secs: parse_or(&lookup, "POLL_ERROR_BACKOFF_SECS", 5),
        })
    }

    /// 루프 수준 실패 후 대기 시간을 Duration으로 반환
    pub fn error_backoff(&self) -> Duration {
        Duration::from_secs(self.error_backoff_secs)
    }
}

/// 값을 파싱 (실패 시 기본값 사용)
fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> T
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    lookup(key)
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

/// bool 값 파싱
fn parse_bool<F>(lookup: &F, key: &str, default: bool) -> bool
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key)
        .map(|v| v == "true" || v == "1")
        .unwrap_or(default)
}
