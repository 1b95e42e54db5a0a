//! Bybit 펀딩비 텔레그램 봇 실행 파일.

use std::sync::Arc;

use clap::Parser;
use funding_bot::BotConfig;
use funding_core::logging::{init_logging, LogConfig, LogFormat};
use funding_exchange::BybitClient;
use funding_notification::{FundingCommandHandler, TelegramBotHandler, TelegramTransport};

#[derive(Parser)]
#[command(name = "funding-bot")]
#[command(about = "Bybit 펀딩비 텔레그램 봇", long_about = None)]
#[command(version)]
struct Cli {
    /// 로그 레벨 (trace, debug, info, warn, error). 미지정 시 `RUST_LOG`
    #[arg(long)]
    log_level: Option<String>,

    /// 로그 형식 (pretty, json, compact). 미지정 시 `LOG_FORMAT`
    #[arg(long)]
    log_format: Option<LogFormat>,
}

impl Cli {
    /// CLI 플래그가 우선하고, 없으면 환경 변수 설정을 사용합니다.
    fn log_config(&self) -> LogConfig {
        let mut config = LogConfig::from_env();
        if let Some(level) = &self.log_level {
            config.level = level.clone();
        }
        if let Some(format) = self.log_format {
            config = config.with_format(format);
        }
        config
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    dotenvy::dotenv().ok();

    init_logging(&cli.log_config())?;

    // 봇 토큰이 없으면 네트워크 호출 없이 종료
    let config = match BotConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("{}", e);
            eprintln!("{}", e);
            std::process::exit(1);
        }
    };
    tracing::debug!(?config, "설정 로드 완료");

    if !config.bybit.has_credentials() {
        tracing::warn!("Bybit API 키 미설정: /portfolio 명령어는 오류를 응답합니다");
    }

    let error_backoff = config.error_backoff();
    let bybit = Arc::new(BybitClient::new(config.bybit)?);
    let handler = Arc::new(FundingCommandHandler::new(bybit.clone(), bybit));
    let transport = TelegramTransport::new(config.telegram)?;

    let mut bot = TelegramBotHandler::new(transport, handler).with_error_backoff(error_backoff);

    tracing::info!("봇 시작...");
    bot.run_until(tokio::signal::ctrl_c()).await;
    tracing::info!("봇 종료");

    Ok(())
}
