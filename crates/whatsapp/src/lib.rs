//! WhatsApp Cloud API channel for comanda
//!
//! - **Events** (`events`) - webhook delivery payload model and parser
//! - **Webhook** (`webhook`) - subscription verification handshake
//! - **Messages** (`messages`) - outbound text / button / list payloads
//! - **Sender** (`sender`) - `ChannelSender` trait, Cloud API and log-only senders
//! - **Worker** (`worker`) - background dispatch, one ordered lane per counterparty
//!
//! # Architecture
//!
//! ```text
//! POST /webhook → parse_delivery → InboundWorker ─┐
//!        ↓ (200 immediately)                      ↓
//!                                   InboundHandler (load → step → save)
//!                                                 ↓
//!                                   ChannelSender ← Reply
//! ```

pub mod events;
pub mod messages;
pub mod sender;
pub mod webhook;
pub mod worker;

pub use events::{parse_delivery, InboundEvent};
pub use messages::OutboundMessage;
pub use sender::{ChannelSender, CloudApiSender, LogOnlySender, SendError};
pub use webhook::{verify, WebhookError};
pub use worker::{InboundHandler, InboundWorker, WorkerError, DEFAULT_QUEUE_CAPACITY};
