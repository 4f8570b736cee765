//! Bluetooth Module
//!
//! Connection lifecycle for the Rpi peripheral.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │                  ConnectionController                    │
//! │   (state machine - public API for the application)       │
//! └─────────────────────┬───────────────────────────────────┘
//!                       │
//!      ┌────────────────┼────────────────┬──────────────┐
//!      │                │                │              │
//!      ▼                ▼                ▼              ▼
//! ┌───────────┐  ┌────────────┐  ┌──────────────┐  ┌──────────┐
//! │  Scanner  │  │ Connection │  │ Transactions │  │ Protocol │
//! │           │  │            │  │              │  │          │
//! │ - timed   │  │ - connect  │  │ - ip-read    │  │ - UUIDs  │
//! │   name    │  │ - discover │  │ - label-     │  │ - text   │
//! │   match   │  │            │  │   subscribe  │  │   decode │
//! └───────────┘  └────────────┘  └──────────────┘  └──────────┘
//!                       │
//!                       ▼
//!               ┌───────────────┐
//!               │  BleBackend   │  btleplug / mock
//!               └───────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`backend`] - Traits over the platform Bluetooth stack
//! - [`protocol`] - GATT identifiers, transaction names and payload decoding
//! - [`scanner`] - Time-bounded discovery by advertised name
//! - [`connection`] - Connect/discover handshake and connection config
//! - [`transactions`] - Cancellable named read/subscribe tasks
//! - [`service`] - Connection controller

pub mod backend;
#[cfg(feature = "btleplug")]
pub mod btleplug_backend;
pub mod connection;
#[cfg(test)]
pub(crate) mod mock;
pub mod protocol;
pub mod scanner;
pub mod service;
pub mod transactions;

// Re-export main controller for convenience
pub use service::{ConnectionController, ControllerError};
