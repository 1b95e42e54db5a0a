//! # Funding Notification
//!
//! 텔레그램 long polling 명령어 봇.
//!
//! # 텔레그램 봇 명령어
//!
//! - `/funding [N]` (`/f`) - 펀딩비 절대값 상위 N개
//! - `/top [N]` - 양수 펀딩비 상위 N개
//! - `/bottom [N]` - 음수 펀딩비 상위 N개
//! - `/portfolio` (`/p`) - 잔고 및 포지션
//! - `/help` (`/start`) - 도움말

pub mod bot_handler;
pub mod commands;
pub mod format;
pub mod telegram;
pub mod types;

pub use bot_handler::*;
pub use commands::*;
pub use telegram::*;
pub use types::*;
