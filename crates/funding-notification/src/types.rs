//! 메시징 타입 및 trait 정의.

use async_trait::async_trait;
use funding_exchange::ExchangeError;

/// 알림 작업용 Result 타입.
pub type NotificationResult<T> = Result<T, NotificationError>;

/// 알림/봇 에러.
#[derive(Debug, thiserror::Error)]
pub enum NotificationError {
    #[error("메시지 전송 실패: {0}")]
    SendFailed(String),

    /// 텔레그램 API가 `ok: false`를 반환
    #[error("텔레그램 API 실패: {0}")]
    Upstream(String),

    #[error("잘못된 설정: {0}")]
    InvalidConfig(String),

    #[error("네트워크 에러: {0}")]
    NetworkError(#[from] reqwest::Error),

    #[error("직렬화 에러: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error(transparent)]
    Exchange(#[from] ExchangeError),
}

impl NotificationError {
    /// long polling 중 조용히 무시할 일시적 네트워크 에러인지 확인.
    pub fn is_transient(&self) -> bool {
        matches!(self, NotificationError::NetworkError(_))
    }
}

/// 수신 메시지.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundMessage {
    pub chat_id: i64,
    /// 메시지 텍스트 (텍스트가 없는 메시지는 빈 문자열)
    pub text: String,
}

/// 개별 업데이트.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Update {
    pub update_id: i64,
    /// 메시지가 아닌 업데이트는 `None`
    pub message: Option<InboundMessage>,
}

/// 명령어 응답 데이터.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandResponse {
    /// 응답 텍스트 (HTML 형식)
    pub text: String,
    /// 파싱 모드
    pub parse_mode: String,
}

impl CommandResponse {
    /// HTML 형식 응답 생성.
    pub fn html(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            parse_mode: "HTML".to_string(),
        }
    }

    /// `오류: {message}` 한 줄 응답 생성.
    pub fn error(message: &str) -> Self {
        Self::html(crate::format::error_text(message))
    }
}

/// 메시징 플랫폼 전송 계층.
#[async_trait]
pub trait MessagingTransport: Send + Sync {
    /// `offset` 이상의 업데이트를 long polling으로 가져옵니다.
    ///
    /// 새 데이터가 없으면 서버 측 타임아웃 후 빈 목록을 반환합니다.
    async fn get_updates(&self, offset: i64) -> NotificationResult<Vec<Update>>;

    /// 채팅에 응답을 전송합니다.
    async fn send_message(&self, chat_id: i64, response: &CommandResponse) -> NotificationResult<()>;
}
