//! 응답 텍스트 포맷팅.
//!
//! 모든 함수는 순수 함수이며 텔레그램 HTML 파싱 모드용 문자열을 생성합니다.

use funding_core::{sign_split, CoinBalance, FundingRecord, PositionRecord, PositionSide, RateSign};
use rust_decimal::{Decimal, RoundingStrategy};

/// 순위 목록의 심볼 컬럼 폭.
pub const SYMBOL_COLUMN_WIDTH: usize = 12;

/// 도움말 텍스트.
pub const HELP_TEXT: &str = "<b>Bybit 펀딩비 봇</b>\n\n\
     /funding [N] - 펀딩비 상위 N개 (기본 20)\n\
     /f [N] - /funding 단축어\n\
     /top [N] - 양수 펀딩비 (롱 과열)\n\
     /bottom [N] - 음수 펀딩비 (숏 과열)\n\
     /portfolio - 포트폴리오 조회\n\
     /p - /portfolio 단축어\n\
     /help - 도움말";

/// HTML 특수문자 이스케이프.
pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

/// 고정 폭 왼쪽 정렬. 폭보다 긴 심볼은 잘립니다.
pub fn format_symbol(symbol: &str, width: usize) -> String {
    let truncated: String = symbol.chars().take(width).collect();
    format!("{:<width$}", escape_html(&truncated), width = width)
}

/// 소수점 `dp`자리로 반올림하고 음수 0을 제거합니다.
fn round_fixed(value: Decimal, dp: u32) -> Decimal {
    let rounded = value.round_dp_with_strategy(dp, RoundingStrategy::MidpointAwayFromZero);
    if rounded.is_zero() {
        Decimal::ZERO
    } else {
        rounded
    }
}

/// 퍼센트 값을 부호 포함 소수 4자리로 포맷합니다 (예: `+0.0100%`).
pub fn format_rate_pct(rate_pct: Decimal) -> String {
    let rounded = round_fixed(rate_pct, 4);
    let sign = if rounded.is_sign_negative() { "" } else { "+" };
    format!("{}{:.4}%", sign, rounded)
}

/// 금액을 소수 2자리로 포맷합니다.
pub fn format_amount(value: Decimal) -> String {
    format!("{:.2}", round_fixed(value, 2))
}

/// 손익을 부호 포함 소수 2자리로 포맷합니다.
pub fn format_signed_amount(value: Decimal) -> String {
    let rounded = round_fixed(value, 2);
    let sign = if rounded.is_sign_negative() { "" } else { "+" };
    format!("{}{:.2}", sign, rounded)
}

/// `오류: {message}` 텍스트.
pub fn error_text(message: &str) -> String {
    format!("오류: {}", escape_html(message))
}

/// `/funding` 응답: 방향 표시가 붙은 절대값 순위와 양수/나머지 개수.
pub fn format_funding_ranking(records: &[FundingRecord], limit: usize) -> String {
    let mut lines = vec![format!("<b>펀딩비 상위 {}개</b>\n", limit)];

    for (i, record) in records.iter().enumerate() {
        let marker = if record.rate < Decimal::ZERO {
            "🔴"
        } else {
            "🟢"
        };
        lines.push(format!(
            "{}. {} <code>{}</code> {}",
            i + 1,
            marker,
            format_symbol(&record.symbol, SYMBOL_COLUMN_WIDTH),
            format_rate_pct(record.rate_pct)
        ));
    }

    let split = sign_split(records, limit);
    lines.push(format!(
        "\n🟢 롱과열: {}개 | 🔴 숏과열: {}개",
        split.positive, split.remainder
    ));

    lines.join("\n")
}

/// `/top`, `/bottom` 응답: 방향 표시 없는 단순 목록.
pub fn format_signed_ranking(records: &[FundingRecord], sign: RateSign, limit: usize) -> String {
    let title = match sign {
        RateSign::Positive => format!("🟢 <b>양수 펀딩비 상위 {}개</b>\n", limit),
        RateSign::Negative => format!("🔴 <b>음수 펀딩비 상위 {}개</b>\n", limit),
    };

    let mut lines = vec![title];
    lines.extend(records.iter().enumerate().map(|(i, record)| {
        format!(
            "{}. <code>{}</code> {}",
            i + 1,
            format_symbol(&record.symbol, SYMBOL_COLUMN_WIDTH),
            format_rate_pct(record.rate_pct)
        )
    }));

    lines.join("\n")
}

/// `/portfolio` 응답.
///
/// 잔고가 없으면 자산 줄을 생략하고, 수량 0인 포지션은 제외합니다.
pub fn format_portfolio(balance: Option<&CoinBalance>, positions: &[PositionRecord]) -> String {
    let mut lines = vec!["<b>📊 포트폴리오</b>\n".to_string()];

    if let Some(balance) = balance {
        lines.push(format!(
            "💵 총자산: {} {}",
            format_amount(balance.equity),
            balance.coin
        ));
        lines.push(format!(
            "💵 가용: {} {}\n",
            format_amount(balance.available_to_withdraw),
            balance.coin
        ));
    }

    let active: Vec<&PositionRecord> = positions.iter().filter(|p| p.is_active()).collect();
    if active.is_empty() {
        lines.push("포지션 없음".to_string());
        return lines.join("\n");
    }

    lines.push(format!("<b>포지션 ({}개)</b>", active.len()));
    for position in active {
        let side = match position.side {
            PositionSide::Long => "🟢L",
            PositionSide::Short => "🔴S",
        };
        lines.push(format!(
            "<code>{}</code> {} x{} | {}",
            escape_html(&position.symbol),
            side,
            escape_html(&position.leverage),
            format_signed_amount(position.unrealised_pnl)
        ));
    }

    lines.join("\n")
}
