//! Bybit 거래소 커넥터.
//!
//! Bybit v5 REST API 구현.
//! - 공개: `linear` 카테고리 티커 (펀딩비)
//! - 서명: 통합 계정 잔고, 포지션 목록

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use funding_core::{sort_by_abs_rate, CoinBalance, FundingRecord, PositionRecord, PositionSide};
use hmac::{Hmac, Mac};
use reqwest::Client;
use rust_decimal::Decimal;
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use sha2::Sha256;
use tracing::{debug, info, warn};

use crate::error::{ExchangeError, ExchangeResult};
use crate::traits::{AccountProvider, MarketDataProvider};

type HmacSha256 = Hmac<Sha256>;

const MAINNET_URL: &str = "https://api.bybit.com";
const TESTNET_URL: &str = "https://api-testnet.bybit.com";

const TICKERS_ENDPOINT: &str = "/v5/market/tickers";
const WALLET_BALANCE_ENDPOINT: &str = "/v5/account/wallet-balance";
const POSITION_LIST_ENDPOINT: &str = "/v5/position/list";

/// 에러 메시지에 포함할 응답 본문 최대 길이.
const ERROR_BODY_LIMIT: usize = 200;

// ============================================================================
// 설정
// ============================================================================

/// Bybit 클라이언트 설정.
///
/// `Debug` 출력에서 API 키는 마스킹되고 시크릿은 숨겨집니다.
pub struct BybitConfig {
    /// API 키 (계정 명령어에만 필요)
    pub api_key: Option<String>,
    /// API 시크릿
    pub api_secret: Option<SecretString>,
    /// REST API 기본 URL
    pub base_url: String,
    /// 요청 타임아웃 (초)
    pub timeout_secs: u64,
    /// 수신 윈도우 (밀리초)
    pub recv_window: u64,
}

impl fmt::Debug for BybitConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let masked_key = match &self.api_key {
            Some(key) if key.chars().count() > 8 => {
                let chars: Vec<char> = key.chars().collect();
                let head: String = chars[..4].iter().collect();
                let tail: String = chars[chars.len() - 4..].iter().collect();
                format!("{}...{}", head, tail)
            }
            Some(_) => "***REDACTED***".to_string(),
            None => "<unset>".to_string(),
        };
        let secret = if self.api_secret.is_some() {
            "***REDACTED***"
        } else {
            "<unset>"
        };

        f.debug_struct("BybitConfig")
            .field("api_key", &masked_key)
            .field("api_secret", &secret)
            .field("base_url", &self.base_url)
            .field("timeout_secs", &self.timeout_secs)
            .field("recv_window", &self.recv_window)
            .finish()
    }
}

impl BybitConfig {
    /// 새 설정 생성. 빈 문자열 자격증명은 미설정으로 취급합니다.
    pub fn new(api_key: Option<String>, api_secret: Option<String>) -> Self {
        Self {
            api_key: api_key.filter(|k| !k.is_empty()),
            api_secret: api_secret
                .filter(|s| !s.is_empty())
                .map(|s| SecretString::new(s.into())),
            base_url: MAINNET_URL.to_string(),
            timeout_secs: 10,
            recv_window: 5000,
        }
    }

    /// 테스트넷 사용.
    pub fn with_testnet(mut self, testnet: bool) -> Self {
        self.base_url = if testnet { TESTNET_URL } else { MAINNET_URL }.to_string();
        self
    }

    /// 기본 URL 지정.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// 요청 타임아웃 지정.
    pub fn with_timeout_secs(mut self, timeout_secs: u64) -> Self {
        self.timeout_secs = timeout_secs;
        self
    }

    /// 서명 요청에 필요한 자격증명이 모두 있는지 확인.
    pub fn has_credentials(&self) -> bool {
        self.api_key.is_some() && self.api_secret.is_some()
    }
}

// ============================================================================
// API 응답 타입
// ============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BybitResponse {
    ret_code: i64,
    #[serde(default)]
    ret_msg: String,
    #[serde(default)]
    result: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct BybitList<T> {
    #[serde(default = "Vec::new")]
    list: Vec<T>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BybitTicker {
    #[serde(default)]
    symbol: String,
    #[serde(default)]
    funding_rate: Option<String>,
}

#[derive(Debug, Deserialize)]
struct BybitWalletAccount {
    #[serde(default)]
    coin: Vec<BybitWalletCoin>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BybitWalletCoin {
    coin: String,
    #[serde(default)]
    equity: String,
    #[serde(default)]
    available_to_withdraw: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BybitPosition {
    symbol: String,
    #[serde(default)]
    side: String,
    #[serde(default)]
    size: String,
    #[serde(default)]
    leverage: String,
    #[serde(default)]
    unrealised_pnl: String,
}

// ============================================================================
// Bybit 클라이언트
// ============================================================================

/// Bybit 거래소 클라이언트.
pub struct BybitClient {
    config: BybitConfig,
    client: Client,
}

impl BybitClient {
    /// 새 Bybit 클라이언트 생성.
    ///
    /// # Errors
    /// HTTP 클라이언트 생성에 실패하면 `ExchangeError::Network`를 반환합니다.
    pub fn new(config: BybitConfig) -> ExchangeResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| ExchangeError::Network(format!("HTTP 클라이언트 생성 실패: {}", e)))?;

        Ok(Self { config, client })
    }

    /// 파라미터 이름 오름차순으로 쿼리 문자열 생성.
    fn build_query(params: &[(&str, &str)]) -> String {
        let mut sorted = params.to_vec();
        sorted.sort_by(|a, b| a.0.cmp(b.0));
        sorted
            .iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect::<Vec<_>>()
            .join("&")
    }

    /// `{timestamp}{api_key}{recv_window}{query}`를 HMAC-SHA256으로 서명.
    fn sign(
        secret: &str,
        timestamp: i64,
        api_key: &str,
        recv_window: u64,
        query: &str,
    ) -> ExchangeResult<String> {
        let payload = format!("{}{}{}{}", timestamp, api_key, recv_window, query);
        let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
            .map_err(|e| ExchangeError::Configuration(e.to_string()))?;
        mac.update(payload.as_bytes());
        Ok(hex::encode(mac.finalize().into_bytes()))
    }

    /// 공개 API 요청 (인증 불필요).
    async fn public_get<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        params: &[(&str, &str)],
    ) -> ExchangeResult<T> {
        let url = format!(
            "{}{}?{}",
            self.config.base_url,
            endpoint,
            Self::build_query(params)
        );

        debug!("GET {}", url);

        let response = self.client.get(&url).send().await?;
        info!(status = response.status().as_u16(), endpoint, "Bybit 응답");

        Self::handle_response(response).await
    }

    /// 서명된 API 요청.
    ///
    /// 자격증명이 없으면 서명 전에 `ExchangeError::Configuration`으로 실패합니다.
    async fn signed_get<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        params: &[(&str, &str)],
    ) -> ExchangeResult<T> {
        let (Some(api_key), Some(api_secret)) = (&self.config.api_key, &self.config.api_secret)
        else {
            return Err(ExchangeError::Configuration(
                "BYBIT_API_KEY / BYBIT_API_SECRET".to_string(),
            ));
        };

        let query = Self::build_query(params);
        let timestamp = chrono::Utc::now().timestamp_millis();
        let recv_window = self.config.recv_window;
        let signature = Self::sign(
            api_secret.expose_secret(),
            timestamp,
            api_key,
            recv_window,
            &query,
        )?;

        let url = format!("{}{}?{}", self.config.base_url, endpoint, query);

        debug!("GET (signed) {}", endpoint);

        let response = self
            .client
            .get(&url)
            .header("X-BAPI-API-KEY", api_key.as_str())
            .header("X-BAPI-SIGN", signature)
            .header("X-BAPI-TIMESTAMP", timestamp.to_string())
            .header("X-BAPI-RECV-WINDOW", recv_window.to_string())
            .send()
            .await?;

        Self::handle_response(response).await
    }

    /// HTTP 상태와 `retCode`를 확인하고 `result`를 역직렬화합니다.
    async fn handle_response<T: DeserializeOwned>(response: reqwest::Response) -> ExchangeResult<T> {
        let status = response.status();
        let body = response.text().await?;

        if status != reqwest::StatusCode::OK {
            let snippet: String = body.chars().take(ERROR_BODY_LIMIT).collect();
            return Err(ExchangeError::Upstream(format!(
                "HTTP {}: {}",
                status.as_u16(),
                snippet
            )));
        }

        let envelope: BybitResponse = serde_json::from_str(&body)?;
        if envelope.ret_code != 0 {
            warn!(ret_code = envelope.ret_code, ret_msg = %envelope.ret_msg, "Bybit API 실패");
            return Err(ExchangeError::Upstream(envelope.ret_msg));
        }

        Ok(serde_json::from_value(envelope.result)?)
    }

    /// 잔고/포지션 숫자 필드 파싱. 빈 문자열은 0으로 취급합니다.
    fn parse_decimal(field: &str, raw: &str) -> ExchangeResult<Decimal> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Ok(Decimal::ZERO);
        }

        Decimal::from_str(raw)
            .or_else(|_| Decimal::from_scientific(raw))
            .map_err(|e| ExchangeError::Parse(format!("{}={}: {}", field, raw, e)))
    }

    /// 티커 하나를 펀딩비 레코드로 변환합니다.
    ///
    /// 펀딩비가 없거나 비어 있으면 `None`.
    fn ticker_to_record(ticker: BybitTicker) -> Option<FundingRecord> {
        let raw = ticker.funding_rate.as_deref().map(str::trim)?;
        if raw.is_empty() {
            return None;
        }

        match Decimal::from_str(raw).or_else(|_| Decimal::from_scientific(raw)) {
            Ok(rate) => Some(FundingRecord::new(ticker.symbol, rate)),
            Err(e) => {
                warn!(symbol = %ticker.symbol, funding_rate = raw, "펀딩비 파싱 실패: {}", e);
                None
            }
        }
    }
}

#[async_trait]
impl MarketDataProvider for BybitClient {
    async fn fetch_funding_rates(&self, limit: usize) -> ExchangeResult<Vec<FundingRecord>> {
        let tickers: BybitList<BybitTicker> = self
            .public_get(TICKERS_ENDPOINT, &[("category", "linear")])
            .await?;

        let total = tickers.list.len();
        let mut records: Vec<FundingRecord> = tickers
            .list
            .into_iter()
            .filter_map(Self::ticker_to_record)
            .collect();

        debug!(total, with_rate = records.len(), "펀딩비 조회 완료");

        sort_by_abs_rate(&mut records);
        records.truncate(limit);
        Ok(records)
    }
}

#[async_trait]
impl AccountProvider for BybitClient {
    async fn fetch_wallet_balance(&self, coin: &str) -> ExchangeResult<Option<CoinBalance>> {
        let wallet: BybitList<BybitWalletAccount> = self
            .signed_get(WALLET_BALANCE_ENDPOINT, &[("accountType", "UNIFIED")])
            .await?;

        let Some(account) = wallet.list.into_iter().next() else {
            return Ok(None);
        };

        account
            .coin
            .into_iter()
            .find(|c| c.coin == coin)
            .map(|c| -> ExchangeResult<CoinBalance> {
                Ok(CoinBalance {
                    equity: Self::parse_decimal("equity", &c.equity)?,
                    available_to_withdraw: Self::parse_decimal(
                        "availableToWithdraw",
                        &c.available_to_withdraw,
                    )?,
                    coin: c.coin,
                })
            })
            .transpose()
    }

    async fn fetch_positions(&self) -> ExchangeResult<Vec<PositionRecord>> {
        let positions: BybitList<BybitPosition> = self
            .signed_get(
                POSITION_LIST_ENDPOINT,
                &[("category", "linear"), ("settleCoin", "USDT")],
            )
            .await?;

        positions
            .list
            .into_iter()
            .map(|p| -> ExchangeResult<PositionRecord> {
                Ok(PositionRecord {
                    side: PositionSide::from_exchange_side(&p.side),
                    size: Self::parse_decimal("size", &p.size)?,
                    leverage: if p.leverage.is_empty() {
                        "1".to_string()
                    } else {
                        p.leverage
                    },
                    unrealised_pnl: Self::parse_decimal("unrealisedPnl", &p.unrealised_pnl)?,
                    symbol: p.symbol,
                })
            })
            .collect()
    }
}
