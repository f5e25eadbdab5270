#![allow(missing_docs)]
//! Wire types for the TLS handshake: every message is parsed fully and
//! strictly before the state machine sees it.
//!
//! <https://langsec.org/ForWantOfANail-h2hc2014.pdf>

#[macro_use]
mod macros;

pub mod alert;
pub mod base;
pub mod ccs;
pub mod codec;
pub mod deframer;
pub mod enums;
pub mod handshake;
pub mod hsjoiner;
pub mod message;
