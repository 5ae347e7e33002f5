//! RoveComm Serial Hardware Abstraction Layer
//!
//! This crate defines the byte-transport boundary the RoveComm-Serial
//! protocol engine runs on. Chip-specific UART drivers implement
//! [`SerialTransport`] on top of their own receive ring buffer; the protocol
//! engine only ever peeks, reads and writes through it.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │  Application (rovecomm-firmware, etc.)  │
//! └─────────────────────────────────────────┘
//!                     │
//!                     ▼
//! ┌─────────────────────────────────────────┐
//! │  rovecomm-protocol (Session)            │
//! └─────────────────────────────────────────┘
//!                     │
//!                     ▼
//! ┌─────────────────────────────────────────┐
//! │  rovecomm-hal (this crate - traits)     │
//! └─────────────────────────────────────────┘
//!                     │
//!         ┌───────────┴───────────┐
//!         ▼                       ▼
//! ┌───────────────┐       ┌───────────────┐
//! │  RP2040 UART  │       │  RingSerial   │
//! │   adapter     │       │  (host/tests) │
//! └───────────────┘       └───────────────┘
//! ```
//!
//! # Contents
//!
//! - [`uart::SerialTransport`] - Non-blocking, peekable byte transport
//! - [`uart::UartConfig`] - Line settings for the underlying UART
//! - [`ring::RingSerial`] - In-memory transport backed by fixed ring buffers

#![no_std]
#![deny(unsafe_code)]

pub mod ring;
pub mod uart;

// Re-export key items at crate root for convenience
pub use ring::{RingError, RingSerial};
pub use uart::{DataBits, Parity, SerialTransport, StopBits, UartConfig};
