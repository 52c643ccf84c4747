//! Notification Adapters
//!
//! `MilestoneNotifier` implementations and the shared alert text renderer.

mod console;
mod format;
mod telegram;

pub use console::ConsoleNotifier;
pub use format::{format_alert, format_money, format_price};
pub use telegram::{TelegramNotifier, TELEGRAM_API};
