//! 텔레그램 Bot API 전송 계층.
//!
//! `getUpdates` long polling과 `sendMessage`를 구현합니다.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, error, warn};

use crate::types::{
    CommandResponse, InboundMessage, MessagingTransport, NotificationError, NotificationResult,
    Update,
};

const TELEGRAM_API_URL: &str = "https://api.telegram.org";

/// long polling 요청에 서버 대기 시간 외로 더하는 클라이언트 여유 시간.
const POLL_GRACE_SECS: u64 = 10;

/// 텔레그램 설정.
#[derive(Clone)]
pub struct TelegramConfig {
    /// @BotFather에서 받은 봇 토큰
    pub bot_token: String,
    /// Bot API 기본 URL
    pub api_url: String,
    /// `getUpdates` 서버 측 대기 시간 (초)
    pub poll_timeout_secs: u64,
    /// 일반 요청 타임아웃 (초)
    pub request_timeout_secs: u64,
}

impl fmt::Debug for TelegramConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TelegramConfig")
            .field("bot_token", &"***REDACTED***")
            .field("api_url", &self.api_url)
            .field("poll_timeout_secs", &self.poll_timeout_secs)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .finish()
    }
}

impl TelegramConfig {
    /// 새 텔레그램 설정을 생성합니다.
    pub fn new(bot_token: impl Into<String>) -> Self {
        Self {
            bot_token: bot_token.into(),
            api_url: TELEGRAM_API_URL.to_string(),
            poll_timeout_secs: 30,
            request_timeout_secs: 10,
        }
    }

    pub fn with_api_url(mut self, api_url: impl Into<String>) -> Self {
        self.api_url = api_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_poll_timeout_secs(mut self, secs: u64) -> Self {
        self.poll_timeout_secs = secs;
        self
    }

    pub fn with_request_timeout_secs(mut self, secs: u64) -> Self {
        self.request_timeout_secs = secs;
        self
    }

    fn method_url(&self, method: &str) -> String {
        format!("{}/bot{}/{}", self.api_url, self.bot_token, method)
    }
}

/// Bot API 응답 봉투.
#[derive(Debug, Deserialize)]
struct TelegramResponse<T> {
    ok: bool,
    #[serde(default)]
    description: Option<String>,
    result: Option<T>,
}

#[derive(Debug, Deserialize)]
struct TelegramMessage {
    chat: TelegramChat,
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TelegramChat {
    id: i64,
}

/// 업데이트 하나를 해석합니다.
///
/// 메시지 형태가 맞지 않으면 `message: None`으로 두어 offset은 계속 전진합니다.
/// `update_id`가 없는 항목은 건너뜁니다.
fn parse_update(raw: serde_json::Value) -> Option<Update> {
    let Some(update_id) = raw.get("update_id").and_then(serde_json::Value::as_i64) else {
        warn!("update_id 없는 업데이트 무시");
        return None;
    };

    let message = raw
        .get("message")
        .cloned()
        .and_then(|m| match serde_json::from_value::<TelegramMessage>(m) {
            Ok(m) => Some(InboundMessage {
                chat_id: m.chat.id,
                text: m.text.unwrap_or_default(),
            }),
            Err(e) => {
                warn!(update_id, "메시지 해석 실패: {}", e);
                None
            }
        });

    Some(Update { update_id, message })
}

/// 텔레그램 전송기.
pub struct TelegramTransport {
    config: TelegramConfig,
    client: reqwest::Client,
}

impl TelegramTransport {
    /// 새 전송기를 생성합니다.
    pub fn new(config: TelegramConfig) -> NotificationResult<Self> {
        if config.bot_token.is_empty() {
            return Err(NotificationError::InvalidConfig(
                "TELEGRAM_BOT_TOKEN".to_string(),
            ));
        }

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()?;

        Ok(Self { config, client })
    }

    /// 응답 본문을 봉투로 해석하고 `ok`를 확인합니다.
    async fn read_envelope<T: for<'de> Deserialize<'de>>(
        response: reqwest::Response,
    ) -> NotificationResult<Option<T>> {
        let status = response.status();
        let body = response.text().await?;

        match serde_json::from_str::<TelegramResponse<T>>(&body) {
            Ok(envelope) if envelope.ok => Ok(envelope.result),
            Ok(envelope) => Err(NotificationError::Upstream(
                envelope
                    .description
                    .unwrap_or_else(|| format!("HTTP {}", status)),
            )),
            Err(_) if !status.is_success() => {
                Err(NotificationError::Upstream(format!("HTTP {}: {}", status, body)))
            }
            Err(e) => Err(e.into()),
        }
    }
}

#[async_trait]
impl MessagingTransport for TelegramTransport {
    async fn get_updates(&self, offset: i64) -> NotificationResult<Vec<Update>> {
        let params = serde_json::json!({
            "offset": offset,
            "timeout": self.config.poll_timeout_secs,
            "allowed_updates": ["message"],
        });

        let response = self
            .client
            .post(self.config.method_url("getUpdates"))
            .json(&params)
            .timeout(Duration::from_secs(
                self.config.poll_timeout_secs + POLL_GRACE_SECS,
            ))
            .send()
            .await?;

        let raw: Vec<serde_json::Value> = Self::read_envelope(response).await?.unwrap_or_default();
        Ok(raw.into_iter().filter_map(parse_update).collect())
    }

    async fn send_message(&self, chat_id: i64, response: &CommandResponse) -> NotificationResult<()> {
        let params = serde_json::json!({
            "chat_id": chat_id,
            "text": response.text,
            "parse_mode": response.parse_mode,
            "disable_web_page_preview": true,
        });

        let api_response = self
            .client
            .post(self.config.method_url("sendMessage"))
            .json(&params)
            .send()
            .await?;

        match Self::read_envelope::<serde_json::Value>(api_response).await {
            Ok(_) => {
                debug!(chat_id, "응답 전송 완료");
                Ok(())
            }
            Err(e) => {
                error!(chat_id, "응답 전송 실패: {}", e);
                Err(NotificationError::SendFailed(e.to_string()))
            }
        }
    }
}
