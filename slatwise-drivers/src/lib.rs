//! Hardware driver implementations
//!
//! Concrete implementations of the traits defined in slatwise-core,
//! written against `embedded-hal` so they work on any board:
//!
//! - Motor drivers (continuous-rotation servo)

#![no_std]
#![deny(unsafe_code)]

pub mod motor;
