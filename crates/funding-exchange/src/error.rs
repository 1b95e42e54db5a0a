//! 거래소 에러 타입.

use thiserror::Error;

/// 거래소 관련 에러.
#[derive(Debug, Error)]
pub enum ExchangeError {
    /// API 키/시크릿 미설정
    #[error("API 키 미설정: {0}")]
    Configuration(String),

    /// HTTP 상태 코드 또는 API `retCode` 실패 (거래소 메시지 그대로)
    #[error("{0}")]
    Upstream(String),

    /// 네트워크/연결 에러
    #[error("네트워크 에러: {0}")]
    Network(String),

    /// 파싱/역직렬화 에러
    #[error("응답 파싱 실패: {0}")]
    Parse(String),
}

impl From<reqwest::Error> for ExchangeError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            ExchangeError::Parse(err.to_string())
        } else {
            ExchangeError::Network(err.to_string())
        }
    }
}

impl From<serde_json::Error> for ExchangeError {
    fn from(err: serde_json::Error) -> Self {
        ExchangeError::Parse(err.to_string())
    }
}

/// 거래소 작업용 Result 타입.
pub type ExchangeResult<T> = Result<T, ExchangeError>;
