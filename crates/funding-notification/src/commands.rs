//! 거래소 데이터를 조회해 명령어 응답을 생성하는 핸들러.

use std::sync::Arc;

use async_trait::async_trait;
use funding_core::{filter_sign, top_n, RateSign, SIGNED_FETCH_LIMIT};
use funding_exchange::{AccountProvider, MarketDataProvider};
use tracing::debug;

use crate::bot_handler::BotCommandHandler;
use crate::format::{format_funding_ranking, format_portfolio, format_signed_ranking};
use crate::types::{CommandResponse, NotificationResult};

/// 포트폴리오에 표시할 잔고 코인.
pub const PORTFOLIO_COIN: &str = "USDT";

/// 펀딩비/계정 명령어 핸들러.
pub struct FundingCommandHandler {
    market: Arc<dyn MarketDataProvider>,
    account: Arc<dyn AccountProvider>,
}

impl FundingCommandHandler {
    /// 새 핸들러 생성.
    pub fn new(market: Arc<dyn MarketDataProvider>, account: Arc<dyn AccountProvider>) -> Self {
        Self { market, account }
    }
}

#[async_trait]
impl BotCommandHandler for FundingCommandHandler {
    async fn handle_funding(&self, limit: usize) -> NotificationResult<CommandResponse> {
        let records = top_n(self.market.fetch_funding_rates(limit).await?, limit);
        debug!(limit, count = records.len(), "펀딩비 순위 생성");

        Ok(CommandResponse::html(format_funding_ranking(&records, limit)))
    }

    async fn handle_signed_ranking(
        &self,
        sign: RateSign,
        limit: usize,
    ) -> NotificationResult<CommandResponse> {
        let records = self.market.fetch_funding_rates(SIGNED_FETCH_LIMIT).await?;
        let filtered = filter_sign(records, sign, limit);
        debug!(?sign, limit, count = filtered.len(), "부호별 펀딩비 순위 생성");

        Ok(CommandResponse::html(format_signed_ranking(
            &filtered, sign, limit,
        )))
    }

    async fn handle_portfolio(&self) -> NotificationResult<CommandResponse> {
        let balance = self.account.fetch_wallet_balance(PORTFOLIO_COIN).await?;
        let positions = self.account.fetch_positions().await?;
        debug!(
            has_balance = balance.is_some(),
            positions = positions.len(),
            "포트폴리오 조회 완료"
        );

        Ok(CommandResponse::html(format_portfolio(
            balance.as_ref(),
            &positions,
        )))
    }
}
