//! 텔레그램 봇 명령어 파싱과 long polling 루프.
//!
//! 업데이트 offset을 소유하고, 수신 메시지를 명령어로 파싱해 핸들러에 전달한 뒤
//! 응답을 전송합니다. 핸들러 실패는 `오류: ...` 응답으로 바뀌고, 루프 수준 실패는
//! 로그 후 잠시 대기했다가 폴링을 재개합니다.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use funding_core::{
    RateSign, FUNDING_DEFAULT_LIMIT, FUNDING_MAX_LIMIT, SIGNED_DEFAULT_LIMIT, SIGNED_MAX_LIMIT,
};
use tracing::{debug, error, info, warn};

use crate::format::HELP_TEXT;
use crate::types::{
    CommandResponse, InboundMessage, MessagingTransport, NotificationResult, Update,
};

/// 루프 수준 실패 후 기본 대기 시간.
const DEFAULT_ERROR_BACKOFF: Duration = Duration::from_secs(5);

/// 정규화된 명령어 토큰과 인자.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandText {
    /// 소문자, `@봇이름` 제거된 명령어 (예: `/funding`)
    pub name: String,
    /// 첫 공백 이후 나머지 텍스트
    pub args: String,
}

impl CommandText {
    /// 첫 공백 구간에서 명령어와 인자로 나눕니다. 빈 텍스트는 `None`.
    pub fn parse(text: &str) -> Option<Self> {
        let text = text.trim();
        if text.is_empty() {
            return None;
        }

        let (token, rest) = match text.split_once(char::is_whitespace) {
            Some((token, rest)) => (token, rest.trim()),
            None => (text, ""),
        };

        let mut name = token.to_lowercase();
        if let Some(at) = name.find('@') {
            name.truncate(at);
        }

        Some(Self {
            name,
            args: rest.to_string(),
        })
    }
}

/// 개수 인자 파싱.
///
/// ASCII 숫자로만 이루어진 경우에만 유효하며, 그 외에는 `default`를 사용합니다.
/// 결과는 `max`를 넘지 않습니다.
pub fn parse_limit(args: &str, default: usize, max: usize) -> usize {
    if args.is_empty() || !args.bytes().all(|b| b.is_ascii_digit()) {
        return default;
    }

    // 숫자만으로 usize 범위를 넘으면 상한으로 취급
    args.parse::<usize>().unwrap_or(max).min(max)
}

/// 봇 명령어 타입.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BotCommand {
    /// 도움말 (`/help`, `/start`)
    Help,
    /// 펀딩비 절대값 순위 (`/funding`, `/f`)
    Funding { limit: usize },
    /// 양수 펀딩비 순위
    Top { limit: usize },
    /// 음수 펀딩비 순위
    Bottom { limit: usize },
    /// 잔고/포지션 (`/portfolio`, `/p`)
    Portfolio,
    /// 알 수 없는 명령어 (응답하지 않음)
    Unknown(String),
}

impl BotCommand {
    /// 텍스트에서 명령어 파싱.
    pub fn parse(text: &str) -> Self {
        match CommandText::parse(text) {
            Some(command) => Self::from_command_text(&command),
            None => BotCommand::Unknown(text.to_string()),
        }
    }

    /// 정규화된 명령어를 변환합니다.
    pub fn from_command_text(command: &CommandText) -> Self {
        let args = command.args.as_str();

        match command.name.as_str() {
            "/start" | "/help" => BotCommand::Help,
            "/funding" | "/f" => BotCommand::Funding {
                limit: parse_limit(args, FUNDING_DEFAULT_LIMIT, FUNDING_MAX_LIMIT),
            },
            "/top" => BotCommand::Top {
                limit: parse_limit(args, SIGNED_DEFAULT_LIMIT, SIGNED_MAX_LIMIT),
            },
            "/bottom" => BotCommand::Bottom {
                limit: parse_limit(args, SIGNED_DEFAULT_LIMIT, SIGNED_MAX_LIMIT),
            },
            "/portfolio" | "/p" => BotCommand::Portfolio,
            other => BotCommand::Unknown(other.to_string()),
        }
    }
}

/// 봇 명령어 핸들러 trait.
///
/// 각 명령어의 데이터 조회와 응답 생성을 구현합니다.
#[async_trait]
pub trait BotCommandHandler: Send + Sync {
    /// 펀딩비 절대값 상위 `limit`개.
    async fn handle_funding(&self, limit: usize) -> NotificationResult<CommandResponse>;

    /// 지정 부호의 펀딩비 상위 `limit`개.
    async fn handle_signed_ranking(
        &self,
        sign: RateSign,
        limit: usize,
    ) -> NotificationResult<CommandResponse>;

    /// 잔고 및 포지션 조회.
    async fn handle_portfolio(&self) -> NotificationResult<CommandResponse>;
}

/// 텔레그램 봇 핸들러.
///
/// Long polling으로 업데이트를 수신하고 명령어를 처리합니다.
/// 단일 태스크에서 순차적으로 동작합니다.
pub struct TelegramBotHandler<T: MessagingTransport, H: BotCommandHandler> {
    transport: T,
    handler: Arc<H>,
    /// 다음에 요청할 업데이트 ID
    offset: i64,
    error_backoff: Duration,
}

impl<T: MessagingTransport, H: BotCommandHandler> TelegramBotHandler<T, H> {
    /// 새 봇 핸들러 생성.
    pub fn new(transport: T, handler: Arc<H>) -> Self {
        Self {
            transport,
            handler,
            offset: 0,
            error_backoff: DEFAULT_ERROR_BACKOFF,
        }
    }

    /// 루프 수준 실패 후 대기 시간 설정.
    pub fn with_error_backoff(mut self, backoff: Duration) -> Self {
        self.error_backoff = backoff;
        self
    }

    /// 다음에 요청할 업데이트 ID.
    pub fn offset(&self) -> i64 {
        self.offset
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// `shutdown`이 완료될 때까지 폴링합니다.
    pub async fn run_until<F: Future>(&mut self, shutdown: F) {
        info!(offset = self.offset, "텔레그램 봇 폴링 시작");
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                biased;
                _ = &mut shutdown => break,
                result = self.poll_once() => {
                    let Err(e) = result else { continue };

                    error!("업데이트 처리 실패: {}", e);
                    let stopped = tokio::select! {
                        biased;
                        _ = &mut shutdown => true,
                        _ = tokio::time::sleep(self.error_backoff) => false,
                    };
                    if stopped {
                        break;
                    }
                }
            }
        }

        info!(offset = self.offset, "텔레그램 봇 폴링 종료");
    }

    /// 업데이트 한 묶음을 가져와 처리합니다.
    ///
    /// 일시적 네트워크 에러는 업데이트 없음으로 취급합니다.
    /// 반환값은 가져온 업데이트 수입니다.
    pub async fn poll_once(&mut self) -> NotificationResult<usize> {
        let updates = match self.transport.get_updates(self.offset).await {
            Ok(updates) => updates,
            Err(e) if e.is_transient() => {
                debug!("long polling 네트워크 에러 무시: {}", e);
                return Ok(0);
            }
            Err(e) => return Err(e),
        };

        let count = updates.len();
        self.process_updates(updates).await;
        Ok(count)
    }

    /// offset을 먼저 갱신한 뒤 각 업데이트를 처리합니다.
    async fn process_updates(&mut self, updates: Vec<Update>) {
        for update in updates {
            self.offset = self.offset.max(update.update_id + 1);

            if let Some(message) = update.message {
                self.dispatch(&message).await;
            }
        }
    }

    /// 메시지 하나를 처리합니다. 에러는 이 경계 밖으로 전파되지 않습니다.
    pub async fn dispatch(&self, message: &InboundMessage) {
        if message.text.is_empty() {
            return;
        }

        let chat_id = message.chat_id;
        info!(chat_id, text = %message.text, "메시지 수신");

        let command = BotCommand::parse(&message.text);
        let Some(result) = self.execute_command(command).await else {
            return;
        };

        let (response, is_error) = match result {
            Ok(response) => (response, false),
            Err(e) => {
                warn!(chat_id, "명령어 처리 실패: {}", e);
                (CommandResponse::error(&e.to_string()), true)
            }
        };

        if let Err(e) = self.transport.send_message(chat_id, &response).await {
            error!(chat_id, "응답 전송 실패: {}", e);
            if is_error {
                return;
            }
            if let Err(e) = self
                .transport
                .send_message(chat_id, &CommandResponse::error(&e.to_string()))
                .await
            {
                error!(chat_id, "오류 응답 전송 실패: {}", e);
            }
        }
    }

    /// 명령어 실행. 알 수 없는 명령어는 `None` (응답하지 않음).
    async fn execute_command(
        &self,
        command: BotCommand,
    ) -> Option<NotificationResult<CommandResponse>> {
        let result = match command {
            BotCommand::Help => Ok(CommandResponse::html(HELP_TEXT)),
            BotCommand::Funding { limit } => self.handler.handle_funding(limit).await,
            BotCommand::Top { limit } => {
                self.handler
                    .handle_signed_ranking(RateSign::Positive, limit)
                    .await
            }
            BotCommand::Bottom { limit } => {
                self.handler
                    .handle_signed_ranking(RateSign::Negative, limit)
                    .await
            }
            BotCommand::Portfolio => self.handler.handle_portfolio().await,
            BotCommand::Unknown(name) => {
                debug!(command = %name, "알 수 없는 명령어 무시");
                return None;
            }
        };

        Some(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::NotificationError;
    use funding_exchange::ExchangeError;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// 준비된 응답을 순서대로 돌려주는 전송기. 준비된 응답이 없으면 대기합니다.
    #[derive(Default)]
    struct FakeTransport {
        batches: Mutex<VecDeque<NotificationResult<Vec<Update>>>>,
        requested_offsets: Mutex<Vec<i64>>,
        sent: Mutex<Vec<(i64, String)>>,
        failing_sends: Mutex<usize>,
    }

    impl FakeTransport {
        fn with_batches(batches: Vec<NotificationResult<Vec<Update>>>) -> Self {
            Self {
                batches: Mutex::new(batches.into()),
                ..Default::default()
            }
        }

        fn sent(&self) -> Vec<(i64, String)> {
            self.sent.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl MessagingTransport for FakeTransport {
        async fn get_updates(&self, offset: i64) -> NotificationResult<Vec<Update>> {
            self.requested_offsets.lock().unwrap().push(offset);
            let next = self.batches.lock().unwrap().pop_front();
            match next {
                Some(batch) => batch,
                None => std::future::pending().await,
            }
        }

        async fn send_message(
            &self,
            chat_id: i64,
            response: &CommandResponse,
        ) -> NotificationResult<()> {
            {
                let mut failing = self.failing_sends.lock().unwrap();
                if *failing > 0 {
                    *failing -= 1;
                    return Err(NotificationError::SendFailed("HTTP 400".to_string()));
                }
            }
            self.sent
                .lock()
                .unwrap()
                .push((chat_id, response.text.clone()));
            Ok(())
        }
    }

    struct FakeHandler;

    #[async_trait]
    impl BotCommandHandler for FakeHandler {
        async fn handle_funding(&self, limit: usize) -> NotificationResult<CommandResponse> {
            Ok(CommandResponse::html(format!("funding {}", limit)))
        }

        async fn handle_signed_ranking(
            &self,
            _sign: RateSign,
            _limit: usize,
        ) -> NotificationResult<CommandResponse> {
            Err(ExchangeError::Upstream("params error".to_string()).into())
        }

        async fn handle_portfolio(&self) -> NotificationResult<CommandResponse> {
            Err(ExchangeError::Configuration("BYBIT_API_KEY".to_string()).into())
        }
    }

    fn message_update(update_id: i64, text: &str) -> Update {
        Update {
            update_id,
            message: Some(InboundMessage {
                chat_id: 42,
                text: text.to_string(),
            }),
        }
    }

    fn bot(transport: FakeTransport) -> TelegramBotHandler<FakeTransport, FakeHandler> {
        TelegramBotHandler::new(transport, Arc::new(FakeHandler))
    }

    #[test]
    fn test_command_text_normalization() {
        assert_eq!(
            CommandText::parse("/Funding@MyBot 15"),
            Some(CommandText {
                name: "/funding".to_string(),
                args: "15".to_string()
            })
        );
        assert_eq!(
            CommandText::parse("  /TOP   7  "),
            Some(CommandText {
                name: "/top".to_string(),
                args: "7".to_string()
            })
        );
        assert_eq!(CommandText::parse("   "), None);
    }

    #[test]
    fn test_parse_limit() {
        assert_eq!(parse_limit("20", 20, 50), 20);
        assert_eq!(parse_limit("abc", 20, 50), 20);
        assert_eq!(parse_limit("-5", 20, 50), 20);
        assert_eq!(parse_limit("1.5", 20, 50), 20);
        assert_eq!(parse_limit("", 20, 50), 20);
        assert_eq!(parse_limit("999", 20, 50), 50);
        assert_eq!(parse_limit("99999999999999999999999", 10, 30), 30);
    }

    #[test]
    fn test_parse_funding_command() {
        assert_eq!(BotCommand::parse("/funding"), BotCommand::Funding { limit: 20 });
        assert_eq!(BotCommand::parse("/f 5"), BotCommand::Funding { limit: 5 });
        assert_eq!(BotCommand::parse("/funding 999"), BotCommand::Funding { limit: 50 });
        assert_eq!(
            BotCommand::parse("/Funding@MyBot 15"),
            BotCommand::Funding { limit: 15 }
        );
    }

    #[test]
    fn test_parse_top_bottom_command() {
        assert_eq!(BotCommand::parse("/top"), BotCommand::Top { limit: 10 });
        assert_eq!(BotCommand::parse("/top 999"), BotCommand::Top { limit: 30 });
        assert_eq!(BotCommand::parse("/bottom abc"), BotCommand::Bottom { limit: 10 });
        assert_eq!(BotCommand::parse("/bottom 2"), BotCommand::Bottom { limit: 2 });
    }

    #[test]
    fn test_parse_help_and_portfolio_command() {
        assert_eq!(BotCommand::parse("/help"), BotCommand::Help);
        assert_eq!(BotCommand::parse("/start"), BotCommand::Help);
        assert_eq!(BotCommand::parse("/p"), BotCommand::Portfolio);
        assert_eq!(BotCommand::parse("/PORTFOLIO@bot"), BotCommand::Portfolio);
    }

    #[test]
    fn test_parse_unknown_command() {
        assert!(matches!(BotCommand::parse("/status"), BotCommand::Unknown(_)));
        assert!(matches!(BotCommand::parse("hello there"), BotCommand::Unknown(_)));
        assert!(matches!(BotCommand::parse(""), BotCommand::Unknown(_)));
    }

    #[tokio::test]
    async fn test_offset_advances_regardless_of_handler_errors() {
        let transport = FakeTransport::with_batches(vec![Ok(vec![
            message_update(5, "/top"),
            message_update(6, "/portfolio"),
            message_update(7, "/funding 3"),
        ])]);
        *transport.failing_sends.lock().unwrap() = 3;

        let mut bot = bot(transport);
        let count = bot.poll_once().await.unwrap();

        assert_eq!(count, 3);
        assert_eq!(bot.offset(), 8);
    }

    #[tokio::test]
    async fn test_update_without_message_advances_offset() {
        let transport = FakeTransport::with_batches(vec![Ok(vec![Update {
            update_id: 11,
            message: None,
        }])]);

        let mut bot = bot(transport);
        bot.poll_once().await.unwrap();

        assert_eq!(bot.offset(), 12);
        assert!(bot.transport.sent().is_empty());
    }

    #[tokio::test]
    async fn test_requests_use_current_offset() {
        let transport = FakeTransport::with_batches(vec![
            Ok(vec![message_update(3, "/help")]),
            Ok(vec![]),
        ]);

        let mut bot = bot(transport);
        bot.poll_once().await.unwrap();
        bot.poll_once().await.unwrap();

        assert_eq!(*bot.transport.requested_offsets.lock().unwrap(), vec![0, 4]);
    }

    #[tokio::test]
    async fn test_transient_network_error_is_swallowed() {
        let network_error = reqwest::Client::new()
            .get("not a url")
            .send()
            .await
            .unwrap_err();
        let transport = FakeTransport::with_batches(vec![Err(network_error.into())]);

        let mut bot = bot(transport);
        assert_eq!(bot.poll_once().await.unwrap(), 0);
        assert_eq!(bot.offset(), 0);
    }

    #[tokio::test]
    async fn test_upstream_poll_error_surfaces() {
        let transport = FakeTransport::with_batches(vec![Err(NotificationError::Upstream(
            "Unauthorized".to_string(),
        ))]);

        let mut bot = bot(transport);
        assert!(bot.poll_once().await.is_err());
    }

    #[tokio::test]
    async fn test_unknown_command_is_silent() {
        let bot = bot(FakeTransport::default());
        bot.dispatch(&InboundMessage {
            chat_id: 42,
            text: "/status".to_string(),
        })
        .await;
        bot.dispatch(&InboundMessage {
            chat_id: 42,
            text: "just chatting".to_string(),
        })
        .await;

        assert!(bot.transport.sent().is_empty());
    }

    #[tokio::test]
    async fn test_handler_error_becomes_reply() {
        let bot = bot(FakeTransport::default());
        bot.dispatch(&InboundMessage {
            chat_id: 42,
            text: "/bottom".to_string(),
        })
        .await;

        assert_eq!(bot.transport.sent(), vec![(42, "오류: params error".to_string())]);
    }

    #[tokio::test]
    async fn test_send_failure_falls_back_to_error_reply() {
        let transport = FakeTransport::default();
        *transport.failing_sends.lock().unwrap() = 1;

        let bot = bot(transport);
        bot.dispatch(&InboundMessage {
            chat_id: 7,
            text: "/f 2".to_string(),
        })
        .await;

        let sent = bot.transport.sent();
        assert_eq!(sent.len(), 1);
        assert!(sent[0].1.starts_with("오류: 메시지 전송 실패"));
    }

    #[tokio::test]
    async fn test_help_reply() {
        let bot = bot(FakeTransport::default());
        bot.dispatch(&InboundMessage {
            chat_id: 1,
            text: "/start".to_string(),
        })
        .await;

        assert_eq!(bot.transport.sent(), vec![(1, HELP_TEXT.to_string())]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_until_processes_then_stops() {
        let transport =
            FakeTransport::with_batches(vec![Ok(vec![message_update(5, "/f 1"), message_update(6, "/x")])]);

        let mut bot = bot(transport);
        bot.run_until(tokio::time::sleep(Duration::from_secs(1))).await;

        assert_eq!(bot.offset(), 7);
        assert_eq!(bot.transport.sent(), vec![(42, "funding 1".to_string())]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_until_backs_off_after_failure() {
        let transport = FakeTransport::with_batches(vec![
            Err(NotificationError::Upstream("Conflict".to_string())),
            Ok(vec![message_update(1, "/help")]),
        ]);

        let mut bot = bot(transport).with_error_backoff(Duration::from_secs(5));
        let started = tokio::time::Instant::now();
        bot.run_until(tokio::time::sleep(Duration::from_secs(3))).await;

        // 대기 중 종료되어 두 번째 요청은 없음
        assert!(started.elapsed() >= Duration::from_secs(3));
        assert_eq!(bot.transport.requested_offsets.lock().unwrap().len(), 1);
        assert_eq!(bot.offset(), 0);
    }
}
