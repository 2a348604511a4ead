//! Message delivery channels for analytic results.
//!
//! This crate provides:
//! - `Notifier` trait for pluggable delivery channels
//! - SMS gateway and chat-space webhook notifiers, plus a tracing-only notifier
//! - `Dispatcher` that routes a message to every notifier of a channel

pub mod chat;
pub mod dispatcher;
mod env;
pub mod log;
pub mod sms;
pub mod traits;

pub use chat::ChatNotifier;
pub use dispatcher::Dispatcher;
pub use log::LogNotifier;
pub use sms::SmsNotifier;
pub use traits::{Card, Channel, DispatchResult, Message, MessageBody, Notifier, NotifyError};
