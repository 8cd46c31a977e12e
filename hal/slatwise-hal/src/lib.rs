//! Slatwise Hardware Abstraction Layer
//!
//! This crate defines the hardware abstraction traits that the board-agnostic
//! motion core is written against. Chip-specific crates implement them.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │  slatwise-core / slatwise-firmware      │
//! └─────────────────────────────────────────┘
//!                     │
//!                     ▼
//! ┌─────────────────────────────────────────┐
//! │  slatwise-hal (this crate - traits)     │
//! └─────────────────────────────────────────┘
//!                     │
//!                     ▼
//!             ┌───────────────┐
//!             │ slatwise-hal- │
//!             │    rp2040     │
//!             └───────────────┘
//! ```
//!
//! Motor outputs are expressed with `embedded-hal` traits directly; only
//! persistent storage needs an abstraction of its own.

#![no_std]
#![deny(unsafe_code)]

pub mod flash;

pub use flash::{FlashError, FlashStorage, StorageKey};
