//! 에러 타입 정의.

use thiserror::Error;

/// 시작 설정 에러.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// 봇 토큰이 없으면 폴링 루프를 시작하지 않습니다.
    #[error("TELEGRAM_BOT_TOKEN 환경변수 필요")]
    MissingBotToken,
}
