//! RoveComm-Serial protocol engine
//!
//! Point-to-point messaging between boards over a UART. Messages are typed
//! by a 16-bit data id, carry up to 255 bytes of payload, and are protected
//! by a 16-bit checksum. The engine recovers from line noise, partial
//! delivery and lost alignment using only the transport's fixed receive
//! buffer, and never blocks.
//!
//! # Protocol Overview
//!
//! Canonical ([`Mode::Full`]) frame layout:
//! ```text
//! ┌───────┬────────┬───────┬─────────┬─────────┬─────┬─────────────┐
//! │ START │ LENGTH │ FLAGS │ DATA ID │ CRC     │ END │ PAYLOAD     │
//! │ 0xFE  │ 1B     │ 1B    │ 2B (BE) │ 2B (BE) │0xEF │ 0–255B      │
//! └───────┴────────┴───────┴─────────┴─────────┴─────┴─────────────┘
//! ```
//! Three reduced layouts drop the end byte, the start byte or the checksum;
//! see [`Mode`].
//!
//! Receive path: transport → [`StreamAssembler`] (resync and buffering) →
//! [`Message::decode`] (checksum) → [`SystemDispatcher`] (ping, acknowledge,
//! subscribe) → application. [`Session`] ties them together.
//!
//! # Features
//!
//! - **`defmt`**: defmt formatting and logging (on target)
//! - **`log`**: logging through the `log` facade (host tools)
//! - **`serde`**: serialize [`SessionConfig`] and [`Mode`]

#![cfg_attr(not(test), no_std)]
#![deny(unsafe_code)]

// This mod MUST go first, so that the others see its macros.
mod fmt;

pub mod assembler;
pub mod config;
pub mod crc;
pub mod error;
pub mod frame;
pub mod mode;
pub mod session;
pub mod stats;
pub mod system;

pub use assembler::{AssemblerState, FrameLimits, StreamAssembler};
pub use config::SessionConfig;
pub use crc::crc16;
pub use error::{ConfigError, Error};
pub use frame::{
    encode_frame, FrameError, Message, FLAG_ACK_REQUESTED, MAX_FRAME_SIZE, MAX_PAYLOAD_SIZE,
};
pub use mode::{Mode, END_BYTE, START_BYTE};
pub use session::Session;
pub use stats::SessionStats;
pub use system::{SystemDispatcher, SystemMessage};
