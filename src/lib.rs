//! Front-end for the Rpi traffic-sign peripheral.
//!
//! Finds the peripheral advertising as `Rpi`, reads its IP address once and
//! mirrors its label notifications as user-visible notifications.

pub mod domain;
pub mod infrastructure;
#[cfg(feature = "gui")]
pub mod presentation;
