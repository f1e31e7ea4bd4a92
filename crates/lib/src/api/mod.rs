//! Telegram Bot API transport.
//!
//! One generic call shape (method name + parameters + body encoding) behind
//! thin per-method wrappers. Calls never raise: every outcome, including
//! wire-level failures, comes back as an [`ApiResponse`] value.

mod client;
mod types;

pub use client::{telegram_api_base, ApiResponse, BotApi, Encoding, InputFile};
pub use types::{BotCommand, BotIdentity, WebhookInfo};
